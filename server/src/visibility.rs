//! Fog of war: what one nest can see this tick.

use crate::grid::{Grid, Occupant};
use crate::nest::Nest;
use crate::world::World;
use shared::{manhattan_distance, AntData, NestName, ResourceData};

/// Enemy ants and resource piles visible to one nest.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Sighting {
    pub enemy_ants: Vec<AntData>,
    pub resources: Vec<ResourceData>,
}

/// Collects everything `viewer`'s ants can see at `tick`.
///
/// Every living ant reveals the cells within its vision radius (Manhattan)
/// of where it stands. Underground ants stand at the nest center. Each cell
/// remembers the last `(nest, tick)` that reported it, so overlapping views
/// never report an object twice.
pub fn visible_objects(world: &mut World, viewer: NestName, tick: u64) -> Sighting {
    let mut sighting = Sighting::default();
    let Some(home) = world.nest(viewer) else {
        return sighting;
    };

    let views: Vec<(i32, i32, i32)> = home
        .living_ants()
        .map(|ant| (ant.x, ant.y, ant.stats().vision_radius))
        .collect();

    let grid = &mut world.grid;
    let nests = &world.nests;
    for (x, y, radius) in views {
        scan(grid, nests, viewer, (x, y), radius, tick, &mut sighting);
    }
    sighting
}

fn scan(
    grid: &mut Grid,
    nests: &[Nest],
    viewer: NestName,
    (cx, cy): (i32, i32),
    radius: i32,
    tick: u64,
    sighting: &mut Sighting,
) {
    let xmin = (cx - radius).max(1);
    let ymin = (cy - radius).max(1);
    let xmax = (cx + radius).min(grid.width() - 2);
    let ymax = (cy + radius).min(grid.height() - 2);

    for y in ymin..=ymax {
        for x in xmin..=xmax {
            if manhattan_distance(x, y, cx, cy) > radius {
                continue;
            }
            let Some(cell) = grid.get_mut(x, y) else {
                continue;
            };
            let Some(occupant) = cell.occupant else {
                continue;
            };
            if cell.seen_by == Some((viewer, tick)) {
                continue;
            }
            cell.seen_by = Some((viewer, tick));

            match occupant {
                Occupant::Ant { nest, id } => {
                    if nest == viewer {
                        continue;
                    }
                    let owner = nests.iter().find(|n| n.name == nest);
                    if let Some(ant) = owner.and_then(|n| n.ants.get(&id)) {
                        sighting.enemy_ants.push(ant.clone());
                    }
                }
                Occupant::Resource(pile) => sighting.resources.push(ResourceData {
                    kind: pile.kind,
                    x,
                    y,
                    quantity: pile.quantity,
                }),
            }
        }
    }
}
