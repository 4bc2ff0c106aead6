use crate::action::AntAction;
use crate::names::{NestName, TeamName};
use crate::ResourceKind;
use serde::{Deserialize, Serialize};

pub type AntId = i32;

/// Id clients put on ants they ask the server to birth.
pub const UNKNOWN_ANT_ID: AntId = -1;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AntType {
    /// Carries twice as much and heals twice as fast.
    Worker,
    /// Moves at least twice as fast and sees twice as far.
    Explorer,
    /// Twice the health and twice the attack dice.
    Warrior,
}

/// Per-type capability numbers. Every ant type reads its values from one of
/// the constant tables below.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AntStats {
    pub max_health: i32,
    /// Number of d4 rolled and summed for one attack.
    pub attack_dice: u32,
    /// Chance per tick outside the nest of losing 1 health.
    pub attrition_probability: f64,
    /// Ticks to move one cell, unencumbered, on flat ground.
    pub base_move_ticks: u32,
    pub uphill_multiplier: u32,
    /// Applies while carrying more than half the carry capacity.
    pub encumbrance_multiplier: u32,
    /// Manhattan distance this ant reveals around itself.
    pub vision_radius: i32,
    pub carry_capacity: u32,
    pub heal_units_out_and_about: u32,
    pub heal_units_underground: u32,
}

const BASE_STATS: AntStats = AntStats {
    max_health: 25,
    attack_dice: 2,
    attrition_probability: 0.005,
    base_move_ticks: 2,
    uphill_multiplier: 2,
    encumbrance_multiplier: 2,
    vision_radius: 10,
    carry_capacity: 7,
    heal_units_out_and_about: 1,
    heal_units_underground: 4,
};

const WORKER_STATS: AntStats = AntStats {
    carry_capacity: BASE_STATS.carry_capacity * 2,
    heal_units_out_and_about: BASE_STATS.heal_units_out_and_about * 2,
    heal_units_underground: BASE_STATS.heal_units_underground * 2,
    ..BASE_STATS
};

const EXPLORER_STATS: AntStats = AntStats {
    base_move_ticks: if BASE_STATS.base_move_ticks / 3 > 1 {
        BASE_STATS.base_move_ticks / 3
    } else {
        1
    },
    vision_radius: BASE_STATS.vision_radius * 2,
    ..BASE_STATS
};

const WARRIOR_STATS: AntStats = AntStats {
    max_health: BASE_STATS.max_health * 2,
    attack_dice: BASE_STATS.attack_dice * 2,
    ..BASE_STATS
};

impl AntType {
    pub const ALL: [AntType; 3] = [AntType::Worker, AntType::Explorer, AntType::Warrior];

    pub const fn stats(self) -> &'static AntStats {
        match self {
            AntType::Worker => &WORKER_STATS,
            AntType::Explorer => &EXPLORER_STATS,
            AntType::Warrior => &WARRIOR_STATS,
        }
    }

    /// Units of water (or nest food) this type may spend healing in one tick.
    /// The dead cannot heal.
    pub const fn heal_units_per_tick(self, state: AntState) -> u32 {
        match state {
            AntState::OutAndAbout => self.stats().heal_units_out_and_about,
            AntState::Underground => self.stats().heal_units_underground,
            AntState::Dead => 0,
        }
    }
}

/// An ant underground is safe: it cannot be attacked and takes no attrition.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AntState {
    Underground,
    OutAndAbout,
    Dead,
}

/// Everything about an ant that server and client exchange.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct AntData {
    pub id: AntId,
    pub nest: NestName,
    pub team: TeamName,
    pub ant_type: AntType,
    pub state: AntState,
    pub x: i32,
    pub y: i32,
    pub health: i32,
    /// `None` exactly when `carry_units` is 0.
    pub carry_type: Option<ResourceKind>,
    pub carry_units: u32,
    /// Set by the server to the action the ant actually took this tick.
    pub action: AntAction,
}

impl AntData {
    /// A freshly born ant: underground at `(x, y)`, full health, action `Birth`.
    pub fn new(id: AntId, ant_type: AntType, nest: NestName, team: TeamName, x: i32, y: i32) -> Self {
        Self {
            id,
            nest,
            team,
            ant_type,
            state: AntState::Underground,
            x,
            y,
            health: ant_type.stats().max_health,
            carry_type: None,
            carry_units: 0,
            action: AntAction::Birth,
        }
    }

    pub fn stats(&self) -> &'static AntStats {
        self.ant_type.stats()
    }

    pub fn is_alive(&self) -> bool {
        self.state != AntState::Dead
    }

    pub fn is_busy(&self) -> bool {
        self.action.is_busy()
    }

    pub fn remaining_capacity(&self) -> u32 {
        self.stats().carry_capacity.saturating_sub(self.carry_units)
    }

    pub fn is_encumbered(&self) -> bool {
        self.carry_units > self.stats().carry_capacity / 2
    }

    pub fn health_deficit(&self) -> i32 {
        (self.stats().max_health - self.health).max(0)
    }

    /// Adds cargo of `kind`, clamped to the remaining capacity.
    /// Returns the units actually loaded; 0 when the ant carries a different kind.
    pub fn load(&mut self, kind: ResourceKind, units: u32) -> u32 {
        if self.carry_units > 0 && self.carry_type != Some(kind) {
            return 0;
        }
        let loaded = units.min(self.remaining_capacity());
        if loaded > 0 {
            self.carry_units += loaded;
            self.carry_type = Some(kind);
        }
        loaded
    }

    /// Removes up to `units` of cargo, returning what was removed.
    pub fn unload(&mut self, units: u32) -> u32 {
        let removed = units.min(self.carry_units);
        self.carry_units -= removed;
        if self.carry_units == 0 {
            self.carry_type = None;
        }
        removed
    }

    /// Applies damage, killing the ant when health reaches 0.
    pub fn take_damage(&mut self, damage: i32) {
        self.health = (self.health - damage).max(0);
        if self.health == 0 {
            self.state = AntState::Dead;
        }
    }
}
