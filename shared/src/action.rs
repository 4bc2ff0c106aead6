use crate::Direction;
use serde::{Deserialize, Serialize};

/// The one thing an ant does in a tick.
///
/// Clients send these as requests; the server answers with the action each
/// ant actually took. `ticks_remaining` is ignored on requests. On responses
/// it counts the ticks the ant stays busy after this one.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum AntAction {
    Move {
        direction: Direction,
        ticks_remaining: u32,
    },
    /// `None` targets the ant's own cell.
    Attack { direction: Option<Direction> },
    PickUp {
        direction: Option<Direction>,
        quantity: u32,
    },
    Drop {
        direction: Option<Direction>,
        quantity: u32,
    },
    Heal { direction: Option<Direction> },
    EnterNest,
    ExitNest { x: i32, y: i32 },
    Birth,
    Died,
    Busy { ticks_remaining: u32 },
    /// Busy, and hit by an attack this tick.
    BusyAttacked { ticks_remaining: u32 },
    Noop,
}

impl AntAction {
    pub fn move_to(direction: Direction) -> Self {
        AntAction::Move {
            direction,
            ticks_remaining: 0,
        }
    }

    pub fn attack(direction: Direction) -> Self {
        AntAction::Attack {
            direction: Some(direction),
        }
    }

    pub fn pick_up(direction: Option<Direction>, quantity: u32) -> Self {
        AntAction::PickUp {
            direction,
            quantity,
        }
    }

    pub fn drop_at(direction: Option<Direction>, quantity: u32) -> Self {
        AntAction::Drop {
            direction,
            quantity,
        }
    }

    pub fn heal_self() -> Self {
        AntAction::Heal { direction: None }
    }

    pub fn exit_nest(x: i32, y: i32) -> Self {
        AntAction::ExitNest { x, y }
    }

    /// True for the two countdown states that block new orders.
    pub fn is_busy(&self) -> bool {
        matches!(
            self,
            AntAction::Busy { .. } | AntAction::BusyAttacked { .. }
        )
    }

    /// Ticks left on a countdown action, 0 for everything else.
    pub fn ticks_remaining(&self) -> u32 {
        match *self {
            AntAction::Move {
                ticks_remaining, ..
            }
            | AntAction::Busy { ticks_remaining }
            | AntAction::BusyAttacked { ticks_remaining } => ticks_remaining,
            _ => 0,
        }
    }
}

impl Default for AntAction {
    fn default() -> Self {
        AntAction::Noop
    }
}
