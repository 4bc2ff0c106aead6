//! Food spawn sites: fixed spots on the map that keep dropping food piles
//! nearby.

use crate::config::SpawnerConfig;
use crate::grid::{Grid, LandType, NestSite};
use log::{info, warn};
use rand::Rng;
use shared::ResourceKind;

const SPAWN_RADIUS: i32 = 30;
const MAX_PILES_PER_SITE: usize = 5;
const MIN_PILE_UNITS: u32 = 20;
const MAX_PILE_UNITS: u32 = 200;
const PILE_PLACEMENT_ATTEMPTS: u32 = 100;

#[derive(Debug, Clone, PartialEq)]
pub struct FoodSpawnSite {
    pub x: i32,
    pub y: i32,
    /// Where each of this site's piles was placed, if any.
    piles: [Option<(i32, i32)>; MAX_PILES_PER_SITE],
}

impl FoodSpawnSite {
    pub fn new(x: i32, y: i32) -> Self {
        Self {
            x,
            y,
            piles: [None; MAX_PILES_PER_SITE],
        }
    }

    /// Picks one of the site's pile slots. If that slot's pile has been
    /// eaten, tries a few random grass cells nearby for a fresh one.
    /// Returns where a pile was placed.
    pub fn spawn<R: Rng>(&mut self, grid: &mut Grid, rng: &mut R) -> Option<(i32, i32)> {
        let slot = rng.gen_range(0..MAX_PILES_PER_SITE);
        if let Some((px, py)) = self.piles[slot] {
            let still_there = grid
                .get(px, py)
                .and_then(|cell| cell.resource())
                .map_or(false, |pile| pile.kind == ResourceKind::Food);
            if still_there {
                return None;
            }
        }

        let units = MIN_PILE_UNITS + rng.gen_range(0..MAX_PILE_UNITS - MIN_PILE_UNITS);
        for _ in 0..PILE_PLACEMENT_ATTEMPTS {
            let x = self.x + rng.gen_range(0..SPAWN_RADIUS) - rng.gen_range(0..SPAWN_RADIUS);
            let y = self.y + rng.gen_range(0..SPAWN_RADIUS) - rng.gen_range(0..SPAWN_RADIUS);
            let open_grass = grid
                .get(x, y)
                .map_or(false, |cell| cell.land == LandType::Grass && cell.is_empty());
            if open_grass && grid.add_resource(x, y, ResourceKind::Food, units) {
                self.piles[slot] = Some((x, y));
                return Some((x, y));
            }
        }
        None
    }
}

#[derive(Debug, Clone, Default)]
pub struct FoodSpawner {
    sites: Vec<FoodSpawnSite>,
}

impl FoodSpawner {
    pub fn new(sites: Vec<FoodSpawnSite>) -> Self {
        Self { sites }
    }

    /// Chooses 3 to 6 grass sites far from every nest and from each other.
    /// Gives up early, with fewer sites, if the map is too crowded.
    pub fn place<R: Rng>(
        grid: &Grid,
        nests: &[NestSite],
        config: &SpawnerConfig,
        rng: &mut R,
    ) -> Self {
        let wanted = 3 + rng.gen_range(0..4);
        let mut sites: Vec<FoodSpawnSite> = Vec::with_capacity(wanted);
        if grid.width() < 5 || grid.height() < 5 {
            return Self::new(sites);
        }

        let too_close = |ax: i32, ay: i32, bx: i32, by: i32, limit: i32| {
            (ax - bx).abs() < limit && (ay - by).abs() < limit
        };

        let mut attempts = 0;
        while sites.len() < wanted && attempts < config.max_placement_attempts {
            attempts += 1;
            let x = rng.gen_range(0..grid.width() - 4) + 2;
            let y = rng.gen_range(0..grid.height() - 4) + 2;
            if grid.get(x, y).map(|cell| cell.land) != Some(LandType::Grass) {
                continue;
            }
            if nests
                .iter()
                .any(|nest| too_close(nest.x, nest.y, x, y, config.min_distance_to_nest))
            {
                continue;
            }
            if sites
                .iter()
                .any(|site| too_close(site.x, site.y, x, y, config.min_distance_between_sites))
            {
                continue;
            }
            info!("Food spawn site at ({}, {}) after {} attempts", x, y, attempts);
            sites.push(FoodSpawnSite::new(x, y));
            attempts = 0;
        }

        if sites.len() < wanted {
            warn!(
                "Placed only {} of {} food spawn sites; the map is too crowded",
                sites.len(),
                wanted
            );
        }
        Self::new(sites)
    }

    pub fn sites(&self) -> &[FoodSpawnSite] {
        &self.sites
    }

    /// Gives every site one chance to spawn. Run once at startup.
    pub fn spawn_all<R: Rng>(&mut self, grid: &mut Grid, rng: &mut R) {
        for site in &mut self.sites {
            site.spawn(grid, rng);
        }
    }

    /// With the given probability, one random site tries to spawn a pile.
    pub fn maybe_spawn<R: Rng>(
        &mut self,
        grid: &mut Grid,
        rng: &mut R,
        probability: f64,
    ) -> Option<(i32, i32)> {
        if self.sites.is_empty() || !rng.gen_bool(probability.clamp(0.0, 1.0)) {
            return None;
        }
        let index = rng.gen_range(0..self.sites.len());
        self.sites[index].spawn(grid, rng)
    }
}
