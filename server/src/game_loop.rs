use crate::game::GameState;
use crate::network::ServerEvent;
use log::{debug, warn};
use std::time::Instant;
use tokio::sync::mpsc;
use tokio::time::{interval, Duration, MissedTickBehavior};

/// Drives `game` at a fixed rate. Owns the game for as long as the server
/// runs; the only inputs are the events drained at the start of each tick
/// and whatever the workers left in their exchange slots.
pub async fn run_game_loop(
    mut game: GameState,
    mut events: mpsc::UnboundedReceiver<ServerEvent>,
    tick_duration: Duration,
) {
    let mut interval_timer = interval(tick_duration);
    interval_timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

    // Skip the first tick since it fires immediately
    interval_timer.tick().await;

    loop {
        interval_timer.tick().await;
        let now = Instant::now();

        while let Ok(event) = events.try_recv() {
            game.handle_event(event, now);
        }

        let summary = game.tick(now);

        let elapsed = now.elapsed();
        if elapsed > tick_duration {
            warn!(
                "Tick {} took {:.1}ms, longer than the {:.1}ms budget",
                summary.tick,
                elapsed.as_secs_f64() * 1000.0,
                tick_duration.as_secs_f64() * 1000.0
            );
        }

        // Periodic performance monitoring
        if summary.tick % 250 == 0 {
            debug!(
                "Tick {}: {} connections, {} packets sent, {:.2}ms",
                summary.tick,
                game.clients().len(),
                summary.packets_sent,
                elapsed.as_secs_f64() * 1000.0
            );
        }
    }
}
