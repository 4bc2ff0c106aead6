use clap::Parser;
use log::{error, info};
use server::config::{ServerConfig, DEFAULT_MAP_PATH};
use server::error::ServerError;
use server::game::GameState;
use server::game_loop::run_game_loop;
use server::network::Server;
use server::observer::ScoreboardObserver;
use server::world::World;
use shared::{PORT, TIME_STEP_MSEC};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tokio::sync::mpsc;

/// Ticks between scoreboard reports (10 seconds at the default rate).
const SCOREBOARD_INTERVAL: u64 = 250;

/// Command line arguments
#[derive(Parser, Debug)]
#[clap(author, version, about = "Authoritative AntWorld game server")]
struct Args {
    /// Run without the console scoreboard
    #[clap(long, alias = "nogui")]
    headless: bool,
    /// Server IP address to bind to
    #[clap(short = 'H', long, default_value = "0.0.0.0")]
    host: String,
    /// Server port to listen on
    #[clap(short, long, default_value_t = PORT)]
    port: u16,
    /// PNG map to load
    #[clap(short, long, default_value = DEFAULT_MAP_PATH)]
    map: PathBuf,
    /// Milliseconds per simulation tick
    #[clap(long, default_value_t = TIME_STEP_MSEC)]
    tick_ms: u64,
    /// Seed for every random source, for repeatable games
    #[clap(long)]
    seed: Option<u64>,
    /// Seconds a socket read may block before the connection is dropped
    #[clap(long, default_value = "120")]
    read_timeout_secs: u64,
    /// Seconds of silence before a nest's ants are sent underground
    #[clap(long, default_value = "300")]
    underground_timeout_secs: u64,
}

impl Args {
    fn into_config(self) -> ServerConfig {
        ServerConfig {
            host: self.host,
            port: self.port,
            map_path: self.map,
            tick_duration: Duration::from_millis(self.tick_ms.max(1)),
            read_timeout: Duration::from_secs(self.read_timeout_secs),
            underground_timeout: Duration::from_secs(self.underground_timeout_secs),
            headless: self.headless,
            seed: self.seed,
            ..ServerConfig::default()
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init();
    let config = Args::parse().into_config();

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Server failed: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(config: ServerConfig) -> Result<(), ServerError> {
    let world = World::load(&config.map_path)?;
    let mut game = GameState::new(world, &config);
    if !config.headless {
        game.add_observer(Box::new(ScoreboardObserver::new(SCOREBOARD_INTERVAL)));
    }

    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let server = Server::bind(
        &config.bind_address(),
        event_tx,
        game.tick_counter(),
        config.read_timeout,
    )
    .await?;

    let server_handle = tokio::spawn(server.run());
    let game_handle = tokio::spawn(run_game_loop(game, event_rx, config.tick_duration));

    // Handle shutdown gracefully
    tokio::select! {
        result = server_handle => {
            match result {
                Ok(Ok(())) => info!("Network task finished"),
                Ok(Err(e)) => return Err(e),
                Err(e) => error!("Network task panicked: {}", e),
            }
        }
        result = game_handle => {
            if let Err(e) = result {
                error!("Game loop task panicked: {}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down gracefully...");
        }
    }

    Ok(())
}
