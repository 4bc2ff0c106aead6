use crate::error::MapError;
use crate::grid::{Grid, NestSite};
use crate::nest::Nest;
use shared::{AntAction, AntData, AntId, NestName, TeamName};
use std::path::Path;

/// The grid plus every nest on it. Only the simulation task touches this.
#[derive(Debug, Clone)]
pub struct World {
    pub grid: Grid,
    /// In the order the sites were given, which is map scan order for loaded maps.
    pub nests: Vec<Nest>,
    next_ant_id: AntId,
}

impl World {
    pub fn new(mut grid: Grid, sites: &[NestSite]) -> Self {
        for site in sites {
            grid.claim_territory(*site);
        }
        Self {
            grid,
            nests: sites.iter().copied().map(Nest::new).collect(),
            next_ant_id: 0,
        }
    }

    pub fn load(path: &Path) -> Result<Self, MapError> {
        let (grid, sites) = Grid::load(path)?;
        Ok(Self::new(grid, &sites))
    }

    pub fn nest(&self, name: NestName) -> Option<&Nest> {
        self.nests.iter().find(|nest| nest.name == name)
    }

    pub fn nest_mut(&mut self, name: NestName) -> Option<&mut Nest> {
        self.nests.iter_mut().find(|nest| nest.name == name)
    }

    pub fn nest_of_team(&self, team: TeamName) -> Option<&Nest> {
        self.nests.iter().find(|nest| nest.team == Some(team))
    }

    pub fn ant(&self, nest: NestName, id: AntId) -> Option<&AntData> {
        self.nest(nest).and_then(|n| n.ants.get(&id))
    }

    pub fn ant_mut(&mut self, nest: NestName, id: AntId) -> Option<&mut AntData> {
        self.nest_mut(nest).and_then(|n| n.ants.get_mut(&id))
    }

    /// The ant standing on `(x, y)`, if any.
    pub fn ant_at(&self, x: i32, y: i32) -> Option<&AntData> {
        let (nest, id) = self.grid.get(x, y)?.ant()?;
        self.ant(nest, id)
    }

    pub fn set_action(&mut self, nest: NestName, id: AntId, action: AntAction) {
        if let Some(ant) = self.ant_mut(nest, id) {
            ant.action = action;
        }
    }

    /// Ids are handed out in increasing order and never reused.
    pub fn allocate_ant_id(&mut self) -> AntId {
        let id = self.next_ant_id;
        self.next_ant_id += 1;
        id
    }

    pub fn next_ant_id(&self) -> AntId {
        self.next_ant_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::AntType;

    fn two_nest_world() -> World {
        let sites = [
            NestSite {
                name: NestName::Gulfloss,
                x: 20,
                y: 20,
            },
            NestSite {
                name: NestName::Ireland,
                x: 60,
                y: 20,
            },
        ];
        World::new(Grid::bordered(80, 40), &sites)
    }

    #[test]
    fn test_nests_indexed_by_name() {
        let world = two_nest_world();
        assert_eq!(world.nest(NestName::Ireland).unwrap().center_x, 60);
        assert!(world.nest(NestName::Iceland).is_none());
        assert_eq!(
            world.grid.get(60, 30).unwrap().nest,
            Some(NestName::Ireland)
        );
    }

    #[test]
    fn test_nest_lookup_ignores_site_order() {
        let sites = [
            NestSite {
                name: NestName::Ireland,
                x: 60,
                y: 20,
            },
            NestSite {
                name: NestName::Fjords,
                x: 20,
                y: 20,
            },
        ];
        let mut world = World::new(Grid::bordered(80, 40), &sites);

        assert!(world.nest(NestName::Gulfloss).is_none());
        assert_eq!(world.nest(NestName::Ireland).unwrap().center_x, 60);
        assert_eq!(world.nest(NestName::Fjords).unwrap().center_x, 20);
        world.nest_mut(NestName::Fjords).unwrap().food = 9;
        assert_eq!(world.nests[1].food, 9);
    }

    #[test]
    fn test_ant_ids_increase() {
        let mut world = two_nest_world();
        let a = world.allocate_ant_id();
        let b = world.allocate_ant_id();
        assert!(b > a);
        assert_eq!(world.next_ant_id(), b + 1);
    }

    #[test]
    fn test_ant_at_follows_grid_reference() {
        let mut world = two_nest_world();
        let id = world.allocate_ant_id();
        let nest = world.nest_mut(NestName::Gulfloss).unwrap();
        nest.spawn_ant(AntType::Worker, id);
        world
            .grid
            .add_occupant(21, 20, crate::grid::Occupant::Ant {
                nest: NestName::Gulfloss,
                id,
            });

        assert_eq!(world.ant_at(21, 20).map(|ant| ant.id), Some(id));
        assert!(world.ant_at(22, 20).is_none());
    }
}
