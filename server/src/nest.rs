//! Per-nest state and its lifecycle.
//!
//! A nest starts `Empty`, becomes `Connected` when a team's client is
//! assigned to it, drops to `Disconnected` when that client's socket fails,
//! and is forced `Underground` after a long silence. The owning team may
//! reconnect from either of the last two states and finds its ants and
//! stockpiles as it left them.

use crate::error::AssignError;
use crate::grid::{Grid, NestSite, Occupant};
use log::{debug, info};
use rand::Rng;
use shared::{
    manhattan_distance, AntAction, AntData, AntId, AntState, AntType, NestData, NestName,
    NestStatus, ResourceKind, TeamName, DEAD_ANT_FOOD_UNITS, INITIAL_FOOD_UNITS,
    INITIAL_NEST_WATER_UNITS, NEST_RADIUS, SCORE_PER_ANT,
};
use std::collections::BTreeMap;
use std::time::Instant;

#[derive(Debug, Clone)]
pub struct Nest {
    pub name: NestName,
    pub center_x: i32,
    pub center_y: i32,
    pub team: Option<TeamName>,
    pub status: NestStatus,
    /// Keyed by id so every pass over the roster runs in the same order.
    pub ants: BTreeMap<AntId, AntData>,
    pub food: u32,
    pub water: u32,
    pub score: u32,
    pub last_message_at: Option<Instant>,
    /// Set when the client asked for every ant, busy or not, in its next packet.
    pub roster_requested: bool,
}

impl Nest {
    pub fn new(site: NestSite) -> Self {
        Self {
            name: site.name,
            center_x: site.x,
            center_y: site.y,
            team: None,
            status: NestStatus::Empty,
            ants: BTreeMap::new(),
            food: 0,
            water: 0,
            score: 0,
            last_message_at: None,
            roster_requested: false,
        }
    }

    /// True when `(x, y)` lies inside this nest's territory.
    pub fn contains(&self, x: i32, y: i32) -> bool {
        manhattan_distance(self.center_x, self.center_y, x, y) <= NEST_RADIUS
    }

    pub fn is_active(&self) -> bool {
        !matches!(self.status, NestStatus::Empty | NestStatus::Underground)
    }

    /// Hands the nest to `team`. A fresh assignment resets the roster and
    /// stockpiles; a reconnection keeps them.
    pub fn assign_or_reconnect(&mut self, team: TeamName, now: Instant) -> Result<(), AssignError> {
        if self.status == NestStatus::Connected {
            return Err(AssignError::AlreadyConnected(team));
        }

        if self.status == NestStatus::Empty {
            self.ants.clear();
            self.food = INITIAL_FOOD_UNITS;
            self.water = INITIAL_NEST_WATER_UNITS;
            info!("Nest {} assigned to team {}", self.name, team);
        } else {
            info!(
                "Team {} reconnected to nest {} ({} ants, {} food, {} water)",
                team,
                self.name,
                self.ants.len(),
                self.food,
                self.water
            );
        }

        self.team = Some(team);
        self.status = NestStatus::Connected;
        self.last_message_at = Some(now);
        Ok(())
    }

    /// Connected becomes Disconnected. Other states are left alone.
    pub fn disconnect(&mut self) {
        if self.status == NestStatus::Connected {
            self.status = NestStatus::Disconnected;
            info!("Nest {} disconnected", self.name);
        }
    }

    /// Pulls every living ant off the map and parks it at the nest center.
    /// Returns false when the nest was Empty or already Underground.
    pub fn force_underground(&mut self, grid: &mut Grid) -> bool {
        if !self.is_active() {
            return false;
        }

        self.status = NestStatus::Underground;
        for ant in self.ants.values_mut() {
            if !ant.is_alive() {
                continue;
            }
            if ant.state == AntState::OutAndAbout {
                remove_ant_from_grid(grid, ant);
            }
            ant.state = AntState::Underground;
            ant.x = self.center_x;
            ant.y = self.center_y;
        }
        info!("Nest {} sent underground", self.name);
        true
    }

    /// Start-of-tick bookkeeping: drops ants that died last tick, counts
    /// down moves and busy spells, resets everything else to `Noop`, and
    /// rolls attrition for ants outside. Returns the ids that died of
    /// attrition.
    pub fn apply_automatic_upkeep<R: Rng>(&mut self, rng: &mut R) -> Vec<AntId> {
        self.ants.retain(|_, ant| ant.is_alive());

        let mut died = Vec::new();
        for ant in self.ants.values_mut() {
            ant.action = match ant.action {
                AntAction::Move {
                    ticks_remaining, ..
                }
                | AntAction::Busy { ticks_remaining }
                | AntAction::BusyAttacked { ticks_remaining } => {
                    let left = ticks_remaining.saturating_sub(1);
                    if left > 0 {
                        AntAction::Busy {
                            ticks_remaining: left,
                        }
                    } else {
                        AntAction::Noop
                    }
                }
                _ => AntAction::Noop,
            };

            if ant.state == AntState::OutAndAbout
                && rng.gen_bool(ant.stats().attrition_probability)
            {
                ant.take_damage(1);
                if !ant.is_alive() {
                    debug!("Ant {} of {} died of attrition", ant.id, self.name);
                    died.push(ant.id);
                }
            }
        }
        died
    }

    /// Score is the nest's food plus a bonus for every living ant.
    pub fn calculate_score(&mut self) -> u32 {
        self.score = if self.status == NestStatus::Empty {
            0
        } else {
            let living = self.ants.values().filter(|ant| ant.is_alive()).count() as u32;
            self.food + living * SCORE_PER_ANT
        };
        self.score
    }

    /// Replaces each dead ant still standing on the map with a food pile.
    /// The ant stays in the roster, marked `Died`, until the next upkeep.
    pub fn remove_dead_from_grid(&mut self, grid: &mut Grid) {
        for ant in self.ants.values_mut().filter(|ant| !ant.is_alive()) {
            ant.action = AntAction::Died;
            if !remove_ant_from_grid(grid, ant) {
                continue;
            }
            let mut food = DEAD_ANT_FOOD_UNITS;
            if ant.carry_type == Some(ResourceKind::Food) {
                food += ant.carry_units;
            }
            grid.add_resource(ant.x, ant.y, ResourceKind::Food, food);
            debug!(
                "Ant {} of {} died at ({}, {}), leaving {} food",
                ant.id, self.name, ant.x, ant.y, food
            );
        }
    }

    pub fn snapshot(&self) -> NestData {
        NestData {
            name: self.name,
            team: self.team,
            center_x: self.center_x,
            center_y: self.center_y,
            food: self.food,
            water: self.water,
            score: self.score,
            status: self.status,
        }
    }

    /// Adds a newborn ant, underground at the nest center. Paying for it
    /// is the caller's job.
    pub fn spawn_ant(&mut self, ant_type: AntType, id: AntId) -> &AntData {
        let team = self.team.unwrap_or(TeamName::RandomWalkers);
        let ant = AntData::new(id, ant_type, self.name, team, self.center_x, self.center_y);
        self.ants.entry(id).or_insert(ant)
    }

    pub fn add_resource(&mut self, kind: ResourceKind, units: u32) {
        match kind {
            ResourceKind::Food => self.food += units,
            ResourceKind::Water => self.water += units,
        }
    }

    pub fn living_ants(&self) -> impl Iterator<Item = &AntData> {
        self.ants.values().filter(|ant| ant.is_alive())
    }
}

/// Clears the ant's cell if the ant is what stands there.
fn remove_ant_from_grid(grid: &mut Grid, ant: &AntData) -> bool {
    let here = grid.get(ant.x, ant.y).and_then(|cell| cell.ant());
    if here == Some((ant.nest, ant.id)) {
        grid.remove_occupant(ant.x, ant.y);
        true
    } else {
        false
    }
}

/// The grid occupant that stands for `ant`.
pub fn ant_occupant(ant: &AntData) -> Occupant {
    Occupant::Ant {
        nest: ant.nest,
        id: ant.id,
    }
}
