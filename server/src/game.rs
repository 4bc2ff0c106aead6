//! The authoritative simulation: one [`GameState`] owned by the tick loop.

use crate::actions::ActionResolver;
use crate::client_manager::{ClientLink, ClientManager};
use crate::config::ServerConfig;
use crate::error::AssignError;
use crate::grid::NestSite;
use crate::network::ServerEvent;
use crate::observer::{ActionRecord, GameObserver, TickSummary};
use crate::spawner::FoodSpawner;
use crate::visibility::visible_objects;
use crate::world::World;
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use shared::{
    manhattan_distance, AntAction, NestData, NestName, NestStatus, PacketToClient,
    PacketToServer, TeamName, UNKNOWN_ANT_ID,
};
use std::sync::atomic::AtomicU64;
use std::sync::Arc;
use std::time::{Duration, Instant};

pub struct GameState {
    pub world: World,
    pub tick: u64,
    started: Instant,
    rng: StdRng,
    resolver: ActionResolver,
    spawner: FoodSpawner,
    clients: ClientManager,
    observers: Vec<Box<dyn GameObserver>>,
    underground_timeout: Duration,
    spawn_probability: f64,
}

impl GameState {
    /// Sets up a game on `world`: seeds the random sources, places the food
    /// spawn sites and gives each of them a first pile.
    pub fn new(mut world: World, config: &ServerConfig) -> Self {
        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let resolver = ActionResolver::seeded(rng.gen());

        let sites: Vec<NestSite> = world
            .nests
            .iter()
            .map(|nest| NestSite {
                name: nest.name,
                x: nest.center_x,
                y: nest.center_y,
            })
            .collect();
        let mut spawner = FoodSpawner::place(&world.grid, &sites, &config.spawner, &mut rng);
        spawner.spawn_all(&mut world.grid, &mut rng);
        info!(
            "Game ready: {} nests, {} food spawn sites",
            world.nests.len(),
            spawner.sites().len()
        );

        Self {
            world,
            tick: 0,
            started: Instant::now(),
            rng,
            resolver,
            spawner,
            clients: ClientManager::new(),
            observers: Vec::new(),
            underground_timeout: config.underground_timeout,
            spawn_probability: config.spawner.spawn_probability,
        }
    }

    pub fn add_observer(&mut self, observer: Box<dyn GameObserver>) {
        self.observers.push(observer);
    }

    /// Counter workers read to tell which tick the simulation is on.
    pub fn tick_counter(&self) -> Arc<AtomicU64> {
        self.clients.tick_counter()
    }

    pub fn clients(&self) -> &ClientManager {
        &self.clients
    }

    pub fn spawner(&self) -> &FoodSpawner {
        &self.spawner
    }

    pub fn handle_event(&mut self, event: ServerEvent, now: Instant) {
        match event {
            ServerEvent::Handshake {
                packet,
                link,
                reply,
            } => {
                let verdict = self.handle_handshake(&packet, link, now);
                if let Err(e) = &verdict {
                    warn!("Handshake from team {:?} refused: {}", packet.team, e);
                }
                // A worker that gave up waiting shows up as a closed link.
                let _ = reply.send(verdict);
            }
            ServerEvent::Disconnected {
                nest,
                connection_id,
                reason,
            } => {
                self.disconnect(nest, connection_id, &reason);
            }
        }
    }

    /// Assigns the handshaking team a nest and makes `link` its connection.
    ///
    /// A team that already owns a nest gets it back. Otherwise the first
    /// team lands on a random nest and later teams on one of the two free
    /// nests closest to the middle of the teams already playing.
    pub fn handle_handshake(
        &mut self,
        packet: &PacketToServer,
        link: ClientLink,
        now: Instant,
    ) -> Result<NestName, AssignError> {
        let team: TeamName = packet.team.parse()?;
        let name = match self.world.nest_of_team(team) {
            Some(nest) => nest.name,
            None => self.pick_free_nest().ok_or(AssignError::NoFreeNest(team))?,
        };
        self.world
            .nest_mut(name)
            .ok_or(AssignError::NoFreeNest(team))?
            .assign_or_reconnect(team, now)?;
        self.clients.attach(name, link);
        Ok(name)
    }

    fn pick_free_nest(&mut self) -> Option<NestName> {
        let empty: Vec<(NestName, i32, i32)> = self
            .world
            .nests
            .iter()
            .filter(|nest| nest.status == NestStatus::Empty)
            .map(|nest| (nest.name, nest.center_x, nest.center_y))
            .collect();
        if empty.is_empty() {
            return None;
        }

        let claimed: Vec<(i32, i32)> = self
            .world
            .nests
            .iter()
            .filter(|nest| nest.team.is_some())
            .map(|nest| (nest.center_x, nest.center_y))
            .collect();
        if claimed.is_empty() {
            let (name, _, _) = empty[self.rng.gen_range(0..empty.len())];
            return Some(name);
        }

        let count = claimed.len() as i32;
        let cx = claimed.iter().map(|(x, _)| x).sum::<i32>() / count;
        let cy = claimed.iter().map(|(_, y)| y).sum::<i32>() / count;

        let mut candidates = empty;
        candidates.sort_by_key(|(_, x, y)| manhattan_distance(*x, *y, cx, cy));
        candidates.truncate(2);
        let (name, _, _) = candidates[self.rng.gen_range(0..candidates.len())];
        Some(name)
    }

    /// Drops the nest's connection if `connection_id` is still the one
    /// serving it. Returns false for a stale report.
    pub fn disconnect(&mut self, nest: NestName, connection_id: u64, reason: &str) -> bool {
        if !self.clients.detach(nest, connection_id) {
            debug!(
                "Ignoring disconnect of replaced connection {} on {}",
                connection_id, nest
            );
            return false;
        }
        warn!(
            "Nest {} lost connection {}: {}",
            nest, connection_id, reason
        );
        if let Some(home) = self.world.nest_mut(nest) {
            home.disconnect();
        }
        true
    }

    /// Seconds of game time at `now`.
    pub fn tick_time(&self, now: Instant) -> f64 {
        now.saturating_duration_since(self.started).as_secs_f64()
    }

    /// Advances the game by one tick.
    pub fn tick(&mut self, now: Instant) -> TickSummary {
        self.tick += 1;
        self.clients.publish_tick(self.tick);
        let tick_time = self.tick_time(now);

        for (nest, connection_id) in self.clients.closed_links() {
            self.disconnect(nest, connection_id, "worker exited");
        }

        for nest in &mut self.world.nests {
            if !nest.is_active() {
                continue;
            }
            let died = nest.apply_automatic_upkeep(&mut self.rng);
            if !died.is_empty() {
                debug!("{} ants of {} died of attrition", died.len(), nest.name);
            }
        }

        let mut births = 0;
        for index in 0..self.world.nests.len() {
            births += self.process_nest(index, now);
        }

        let mut deaths = 0;
        for nest in &mut self.world.nests {
            deaths += nest.ants.values().filter(|ant| !ant.is_alive()).count();
            nest.calculate_score();
            nest.remove_dead_from_grid(&mut self.world.grid);
        }

        let snapshots: Vec<NestData> = self.world.nests.iter().map(|nest| nest.snapshot()).collect();
        let packets_sent = self.send_updates(&snapshots, tick_time);

        if let Some((x, y)) =
            self.spawner
                .maybe_spawn(&mut self.world.grid, &mut self.rng, self.spawn_probability)
        {
            debug!("Food spawned at ({}, {})", x, y);
        }

        let summary = TickSummary {
            tick: self.tick,
            tick_time,
            nests: snapshots,
            births,
            deaths,
            packets_sent,
        };
        for observer in &mut self.observers {
            observer.on_tick(&summary);
        }
        summary
    }

    /// Checks one nest for silence and applies its latest commands.
    /// Returns the number of ants born.
    fn process_nest(&mut self, index: usize, now: Instant) -> usize {
        let Some(nest) = self.world.nests.get_mut(index) else {
            return 0;
        };
        if !nest.is_active() {
            return 0;
        }
        let name = nest.name;

        let mut packet = None;
        if nest.status == NestStatus::Connected {
            if let Some(inbound) = self.clients.pop_inbound(name) {
                nest.last_message_at = Some(inbound.received_at);
                packet = Some(inbound.packet);
            }
        }

        let silent = nest
            .last_message_at
            .map_or(false, |at| now.saturating_duration_since(at) > self.underground_timeout);
        if silent {
            nest.force_underground(&mut self.world.grid);
            return 0;
        }

        match packet {
            Some(packet) => self.apply_commands(name, packet),
            None => 0,
        }
    }

    fn apply_commands(&mut self, name: NestName, packet: PacketToServer) -> usize {
        let Some(commands) = packet.ants else {
            if let Some(nest) = self.world.nest_mut(name) {
                nest.roster_requested = true;
            }
            return 0;
        };

        let mut births = 0;
        for command in commands {
            let record = if command.id == UNKNOWN_ANT_ID {
                if command.action != AntAction::Birth {
                    continue;
                }
                let born = self.resolver.birth(&mut self.world, name, command.ant_type);
                births += born.is_ok() as usize;
                ActionRecord {
                    tick: self.tick,
                    nest: name,
                    ant: born.ok(),
                    requested: command.action,
                    outcome: born.map(|_| AntAction::Birth),
                }
            } else {
                if self.world.ant(name, command.id).is_none() {
                    continue;
                }
                let outcome =
                    self.resolver
                        .try_resolve(&mut self.world, name, command.id, &command.action);
                let action = *outcome.as_ref().unwrap_or(&AntAction::Noop);
                self.world.set_action(name, command.id, action);
                ActionRecord {
                    tick: self.tick,
                    nest: name,
                    ant: Some(command.id),
                    requested: command.action,
                    outcome,
                }
            };
            for observer in &mut self.observers {
                observer.on_action(&record);
            }
        }
        births
    }

    /// Builds and publishes the packet of every connected nest. Returns
    /// how many were handed to a live worker.
    fn send_updates(&mut self, snapshots: &[NestData], tick_time: f64) -> usize {
        let mut sent = 0;
        for index in 0..self.world.nests.len() {
            let name = self.world.nests[index].name;
            if self.world.nests[index].status != NestStatus::Connected {
                continue;
            }

            let sighting = visible_objects(&mut self.world, name, self.tick);
            let nest = &mut self.world.nests[index];
            let full_roster = std::mem::take(&mut nest.roster_requested);

            let mut packet = PacketToClient::new(name, self.tick, tick_time);
            packet.my_ants = nest
                .ants
                .values()
                .filter(|ant| full_roster || !matches!(ant.action, AntAction::Busy { .. }))
                .cloned()
                .collect();
            packet.nests = snapshots.to_vec();
            packet.enemy_ants = sighting.enemy_ants;
            packet.resources = sighting.resources;

            if self.clients.push_outbound(name, packet) {
                sent += 1;
            }
        }
        sent
    }
}
