//! Hooks that watch the simulation without touching it.
//!
//! The tick loop reports every resolved command and a summary of every tick
//! to each registered [`GameObserver`]. The console scoreboard is one such
//! observer; tests register recording observers to audit rejected actions.

use crate::actions::Rejection;
use log::info;
use shared::{AntAction, AntId, NestData, NestName, NestStatus};

/// What one command asked for and what the ant ended up doing.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionRecord {
    pub tick: u64,
    pub nest: NestName,
    /// `None` for a birth request, which names no ant yet.
    pub ant: Option<AntId>,
    pub requested: AntAction,
    /// The action taken, or why the request fell back to `Noop`.
    pub outcome: Result<AntAction, Rejection>,
}

/// State of the game after one tick.
#[derive(Debug, Clone, PartialEq)]
pub struct TickSummary {
    pub tick: u64,
    /// Seconds since the game started.
    pub tick_time: f64,
    pub nests: Vec<NestData>,
    pub births: usize,
    pub deaths: usize,
    /// Number of nests that were sent a packet this tick.
    pub packets_sent: usize,
}

/// Sink for simulation events. Runs on the simulation task, so it must not
/// block.
pub trait GameObserver: Send {
    fn on_action(&mut self, _record: &ActionRecord) {}

    fn on_tick(&mut self, summary: &TickSummary);
}

/// Logs a scoreboard of every claimed nest every `interval` ticks.
#[derive(Debug)]
pub struct ScoreboardObserver {
    interval: u64,
    last_lines: Vec<String>,
}

impl ScoreboardObserver {
    pub fn new(interval: u64) -> Self {
        Self {
            interval: interval.max(1),
            last_lines: Vec::new(),
        }
    }

    /// Scoreboard lines from the most recent report, best score first.
    pub fn last_report(&self) -> &[String] {
        &self.last_lines
    }

    fn format_lines(nests: &[NestData]) -> Vec<String> {
        let mut claimed: Vec<&NestData> = nests
            .iter()
            .filter(|nest| nest.status != NestStatus::Empty)
            .collect();
        claimed.sort_by(|a, b| b.score.cmp(&a.score).then(a.name.cmp(&b.name)));
        claimed
            .into_iter()
            .map(|nest| {
                let team = nest
                    .team
                    .map_or_else(|| "-".to_string(), |team| team.to_string());
                format!(
                    "{:<12} {:<16} {:>6} score {:>5} food {:>5} water {:?}",
                    nest.name.to_string(),
                    team,
                    nest.score,
                    nest.food,
                    nest.water,
                    nest.status
                )
            })
            .collect()
    }
}

impl GameObserver for ScoreboardObserver {
    fn on_tick(&mut self, summary: &TickSummary) {
        if summary.tick % self.interval != 0 {
            return;
        }
        self.last_lines = Self::format_lines(&summary.nests);
        if self.last_lines.is_empty() {
            return;
        }
        info!(
            "Scoreboard at tick {} ({:.1}s):",
            summary.tick, summary.tick_time
        );
        for line in &self.last_lines {
            info!("  {}", line);
        }
    }
}
