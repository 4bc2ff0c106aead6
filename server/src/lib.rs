//! # AntWorld Server Library
//!
//! This library provides the authoritative server for AntWorld, a tick-based
//! colony simulation in which each connected client commands a nest of ants
//! competing for food and water on a shared map. The server owns every fact
//! about the world; clients only send intents, which the server validates
//! and applies.
//!
//! ## Core Responsibilities
//!
//! ### Authoritative Simulation
//! Terrain, resource piles, ant positions, health and scores live only here.
//! Each tick the server applies automatic upkeep, resolves the commands each
//! nest sent, scores the nests and tells every connected client what its
//! ants can see.
//!
//! ### Nest Assignment
//! A client opens with a handshake naming its team. New teams are given a
//! free nest near the teams already playing; returning teams get their old
//! nest back with its ants and stockpiles intact.
//!
//! ### Fog of War
//! Outbound packets carry only what a nest's ants can see: enemy ants and
//! resource piles within each ant's vision radius, plus the nest's own
//! territory while any ant is underground.
//!
//! ## Architecture Design
//!
//! ### Single Owner Simulation
//! One task owns the [`game::GameState`] and runs the tick loop. It never
//! waits on a socket. Everything it needs from the network arrives through
//! non-blocking pops.
//!
//! ### One Worker per Connection
//! Each accepted TCP socket gets its own task. The worker reads one packet,
//! publishes it into a latest-value slot, waits for the next outbound packet
//! and writes it back. Slow clients only ever see the newest state.
//!
//! ### Framing
//! Every packet is a 4-byte big-endian length followed by a bincode payload.
//! Frames over 4 MiB are refused.
//!
//! ## Module Organization
//!
//! ### World Model (`grid`, `nest`, `world`)
//! - Map loading from PNG and per-cell terrain, ownership and occupants
//! - Nest lifecycle: empty, connected, disconnected, underground
//! - Ant roster, stockpiles and scoring
//!
//! ### Rules (`actions`, `visibility`, `spawner`)
//! - Validation and effects of every ant action
//! - Per-nest visibility with a per-tick cache
//! - Food spawn sites that keep the map supplied
//!
//! ### Orchestration (`game`, `game_loop`, `observer`)
//! - The ordered tick phases
//! - Fixed-rate driver with missed-tick skipping
//! - Observer hooks for the scoreboard and for auditing
//!
//! ### Networking (`network`, `client_manager`)
//! - TCP accept loop and connection workers
//! - Exchange slots, connection ids and the shared tick counter
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::config::ServerConfig;
//! use server::game::GameState;
//! use server::game_loop::run_game_loop;
//! use server::network::Server;
//! use server::world::World;
//! use tokio::sync::mpsc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ServerConfig::default();
//!     let world = World::load(&config.map_path)?;
//!     let game = GameState::new(world, &config);
//!
//!     let (events_tx, events_rx) = mpsc::unbounded_channel();
//!     let server = Server::bind(
//!         &config.bind_address(),
//!         events_tx,
//!         game.tick_counter(),
//!         config.read_timeout,
//!     )
//!     .await?;
//!
//!     tokio::spawn(run_game_loop(game, events_rx, config.tick_duration));
//!     server.run().await?;
//!     Ok(())
//! }
//! ```

pub mod actions;
pub mod client_manager;
pub mod config;
pub mod error;
pub mod game;
pub mod game_loop;
pub mod grid;
pub mod nest;
pub mod network;
pub mod observer;
pub mod spawner;
pub mod visibility;
pub mod world;
