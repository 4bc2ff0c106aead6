//! The terrain grid and what stands on it.
//!
//! A [`Grid`] is built once from a map image and never changes shape. Each
//! [`Cell`] holds at most one [`Occupant`]: an ant (by reference into its
//! nest's roster) or a resource pile.

use crate::error::MapError;
use image::RgbImage;
use log::info;
use shared::{manhattan_distance, AntId, NestName, ResourceKind, NEST_RADIUS};
use std::path::Path;

const NEST_CENTER_COLOR: u32 = 0x000000;
const NEST_TERRITORY_COLOR: u32 = 0xF0E68C;
const WATER_COLOR: u32 = 0x329FFF;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LandType {
    Grass,
    Water,
    Nest,
}

impl LandType {
    pub fn is_passable(self) -> bool {
        self != LandType::Water
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourcePile {
    pub kind: ResourceKind,
    pub quantity: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Occupant {
    /// The ant itself lives in its nest's roster.
    Ant { nest: NestName, id: AntId },
    Resource(ResourcePile),
}

#[derive(Debug, Clone)]
pub struct Cell {
    pub land: LandType,
    pub height: i32,
    /// Nest whose territory covers this cell.
    pub nest: Option<NestName>,
    pub occupant: Option<Occupant>,
    /// Last nest (and tick) whose visibility scan reported this cell's occupant.
    pub seen_by: Option<(NestName, u64)>,
}

impl Cell {
    fn new(land: LandType, height: i32) -> Self {
        Self {
            land,
            height,
            nest: None,
            occupant: None,
            seen_by: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.occupant.is_none()
    }

    pub fn ant(&self) -> Option<(NestName, AntId)> {
        match self.occupant {
            Some(Occupant::Ant { nest, id }) => Some((nest, id)),
            _ => None,
        }
    }

    pub fn resource(&self) -> Option<ResourcePile> {
        match self.occupant {
            Some(Occupant::Resource(pile)) => Some(pile),
            _ => None,
        }
    }
}

/// A nest center found while reading the map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NestSite {
    pub name: NestName,
    pub x: i32,
    pub y: i32,
}

#[derive(Debug, Clone)]
pub struct Grid {
    width: i32,
    height: i32,
    /// Column-major: index = x * height + y.
    cells: Vec<Cell>,
}

impl Grid {
    /// An all-grass grid of flat ground ringed by water.
    pub fn bordered(width: i32, height: i32) -> Self {
        let mut cells = Vec::with_capacity((width * height).max(0) as usize);
        for x in 0..width {
            for y in 0..height {
                let border = x == 0 || y == 0 || x == width - 1 || y == height - 1;
                let land = if border { LandType::Water } else { LandType::Grass };
                cells.push(Cell::new(land, 0));
            }
        }
        Self {
            width,
            height,
            cells,
        }
    }

    /// Reads a map image. Pixels are scanned column by column; each black
    /// pixel becomes the next nest center in [`NestName`] order. Territory
    /// is claimed separately, see [`Grid::claim_territory`].
    pub fn from_image(image: &RgbImage) -> Result<(Grid, Vec<NestSite>), MapError> {
        let (width, height) = image.dimensions();
        if width < 3 || height < 3 {
            return Err(MapError::TooSmall { width, height });
        }

        let mut cells = Vec::with_capacity((width * height) as usize);
        let mut sites = Vec::new();
        for x in 0..width {
            for y in 0..height {
                let [r, g, b] = image.get_pixel(x, y).0;
                let rgb = (u32::from(r) << 16) | (u32::from(g) << 8) | u32::from(b);
                let border = x == 0 || y == 0 || x == width - 1 || y == height - 1;
                if border && rgb != WATER_COLOR {
                    return Err(MapError::MissingWaterBorder { x, y });
                }

                let cell = match rgb {
                    NEST_CENTER_COLOR => {
                        let name =
                            NestName::from_index(sites.len()).ok_or(MapError::TooManyNests)?;
                        sites.push(NestSite {
                            name,
                            x: x as i32,
                            y: y as i32,
                        });
                        Cell::new(LandType::Nest, 0)
                    }
                    NEST_TERRITORY_COLOR => Cell::new(LandType::Nest, 0),
                    WATER_COLOR => Cell::new(LandType::Water, 0),
                    _ => Cell::new(LandType::Grass, (i32::from(g) - 55).max(0)),
                };
                cells.push(cell);
            }
        }

        if sites.is_empty() {
            return Err(MapError::NoNests);
        }

        let grid = Grid {
            width: width as i32,
            height: height as i32,
            cells,
        };
        Ok((grid, sites))
    }

    pub fn load(path: &Path) -> Result<(Grid, Vec<NestSite>), MapError> {
        let image = image::open(path)
            .map_err(|source| MapError::Unreadable {
                path: path.to_path_buf(),
                source,
            })?
            .to_rgb8();
        let (grid, sites) = Self::from_image(&image)?;
        info!(
            "Loaded map {} ({}x{}, {} nests)",
            path.display(),
            grid.width,
            grid.height,
            sites.len()
        );
        Ok((grid, sites))
    }

    /// Marks every dry cell within `NEST_RADIUS` of the site as that nest's land.
    pub fn claim_territory(&mut self, site: NestSite) {
        for x in site.x - NEST_RADIUS..=site.x + NEST_RADIUS {
            for y in site.y - NEST_RADIUS..=site.y + NEST_RADIUS {
                if manhattan_distance(x, y, site.x, site.y) > NEST_RADIUS {
                    continue;
                }
                if let Some(cell) = self.get_mut(x, y) {
                    cell.nest = Some(site.name);
                    if cell.land != LandType::Water {
                        cell.land = LandType::Nest;
                        cell.height = 0;
                    }
                }
            }
        }
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn in_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && x < self.width && y < self.height
    }

    fn index(&self, x: i32, y: i32) -> Option<usize> {
        if self.in_bounds(x, y) {
            Some((x * self.height + y) as usize)
        } else {
            None
        }
    }

    pub fn get(&self, x: i32, y: i32) -> Option<&Cell> {
        self.index(x, y).map(|i| &self.cells[i])
    }

    pub fn get_mut(&mut self, x: i32, y: i32) -> Option<&mut Cell> {
        self.index(x, y).map(move |i| &mut self.cells[i])
    }

    pub fn set_land(&mut self, x: i32, y: i32, land: LandType, height: i32) {
        if let Some(cell) = self.get_mut(x, y) {
            cell.land = land;
            cell.height = height;
        }
    }

    pub fn is_empty(&self, x: i32, y: i32) -> bool {
        self.get(x, y).map_or(false, Cell::is_empty)
    }

    /// Places an occupant. Fails when the cell is out of bounds or taken.
    pub fn add_occupant(&mut self, x: i32, y: i32, occupant: Occupant) -> bool {
        match self.get_mut(x, y) {
            Some(cell) if cell.is_empty() => {
                cell.occupant = Some(occupant);
                true
            }
            _ => false,
        }
    }

    pub fn remove_occupant(&mut self, x: i32, y: i32) -> Option<Occupant> {
        self.get_mut(x, y).and_then(|cell| cell.occupant.take())
    }

    /// Moves whatever occupies `from` onto the empty cell `to`.
    pub fn move_occupant(&mut self, from: (i32, i32), to: (i32, i32)) -> bool {
        if !self.is_empty(to.0, to.1) {
            return false;
        }
        match self.remove_occupant(from.0, from.1) {
            Some(occupant) => self.add_occupant(to.0, to.1, occupant),
            None => false,
        }
    }

    /// Adds `quantity` of `kind` to the pile at a cell, creating it if the
    /// cell is empty. Fails if something else is there.
    pub fn add_resource(&mut self, x: i32, y: i32, kind: ResourceKind, quantity: u32) -> bool {
        let Some(cell) = self.get_mut(x, y) else {
            return false;
        };
        match cell.occupant.as_mut() {
            None => {
                cell.occupant = Some(Occupant::Resource(ResourcePile { kind, quantity }));
                true
            }
            Some(Occupant::Resource(pile)) if pile.kind == kind => {
                pile.quantity += quantity;
                true
            }
            _ => false,
        }
    }

    /// Takes up to `quantity` from the pile at a cell, removing the pile when
    /// it runs out. Returns the units taken.
    pub fn take_resource(&mut self, x: i32, y: i32, quantity: u32) -> u32 {
        let Some(cell) = self.get_mut(x, y) else {
            return 0;
        };
        let Some(Occupant::Resource(pile)) = cell.occupant.as_mut() else {
            return 0;
        };
        let taken = quantity.min(pile.quantity);
        pile.quantity -= taken;
        if pile.quantity == 0 {
            cell.occupant = None;
        }
        taken
    }

    /// Every resource pile on the map with its position.
    pub fn resources(&self) -> impl Iterator<Item = (i32, i32, ResourcePile)> + '_ {
        self.cells.iter().enumerate().filter_map(move |(i, cell)| {
            cell.resource().map(|pile| {
                let i = i as i32;
                (i / self.height, i % self.height, pile)
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    const WATER: Rgb<u8> = Rgb([0x32, 0x9F, 0xFF]);

    fn map_with_nests(width: u32, height: u32, nests: &[(u32, u32)]) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| {
            if x == 0 || y == 0 || x == width - 1 || y == height - 1 {
                WATER
            } else if nests.contains(&(x, y)) {
                Rgb([0, 0, 0])
            } else {
                Rgb([20, 100, 20])
            }
        })
    }

    #[test]
    fn test_get_outside_bounds() {
        let grid = Grid::bordered(10, 8);
        assert!(grid.get(-1, 0).is_none());
        assert!(grid.get(10, 0).is_none());
        assert!(grid.get(0, 8).is_none());
        assert!(grid.get(9, 7).is_some());
    }

    #[test]
    fn test_bordered_grid_has_water_edges() {
        let grid = Grid::bordered(5, 5);
        assert_eq!(grid.get(0, 2).unwrap().land, LandType::Water);
        assert_eq!(grid.get(4, 4).unwrap().land, LandType::Water);
        assert_eq!(grid.get(2, 2).unwrap().land, LandType::Grass);
    }

    #[test]
    fn test_single_occupant_per_cell() {
        let mut grid = Grid::bordered(10, 10);
        let ant = Occupant::Ant {
            nest: NestName::Gulfloss,
            id: 0,
        };
        assert!(grid.add_occupant(3, 3, ant));
        assert!(!grid.add_occupant(3, 3, ant));
        assert_eq!(grid.get(3, 3).unwrap().ant(), Some((NestName::Gulfloss, 0)));
        assert_eq!(grid.remove_occupant(3, 3), Some(ant));
        assert!(grid.is_empty(3, 3));
    }

    #[test]
    fn test_move_occupant_requires_empty_target() {
        let mut grid = Grid::bordered(10, 10);
        let ant = Occupant::Ant {
            nest: NestName::Ireland,
            id: 4,
        };
        grid.add_occupant(2, 2, ant);
        grid.add_resource(3, 2, ResourceKind::Food, 5);

        assert!(!grid.move_occupant((2, 2), (3, 2)));
        assert_eq!(grid.get(2, 2).unwrap().occupant, Some(ant));

        assert!(grid.move_occupant((2, 2), (2, 3)));
        assert!(grid.is_empty(2, 2));
        assert_eq!(grid.get(2, 3).unwrap().occupant, Some(ant));
    }

    #[test]
    fn test_take_resource_removes_empty_pile() {
        let mut grid = Grid::bordered(10, 10);
        grid.add_resource(4, 4, ResourceKind::Food, 6);
        assert_eq!(grid.take_resource(4, 4, 4), 4);
        assert_eq!(grid.get(4, 4).unwrap().resource().unwrap().quantity, 2);
        assert_eq!(grid.take_resource(4, 4, 10), 2);
        assert!(grid.is_empty(4, 4));
    }

    #[test]
    fn test_add_resource_merges_same_kind_only() {
        let mut grid = Grid::bordered(10, 10);
        assert!(grid.add_resource(5, 5, ResourceKind::Water, 3));
        assert!(grid.add_resource(5, 5, ResourceKind::Water, 2));
        assert!(!grid.add_resource(5, 5, ResourceKind::Food, 1));
        assert_eq!(grid.get(5, 5).unwrap().resource().unwrap().quantity, 5);
        assert_eq!(grid.resources().count(), 1);
    }

    #[test]
    fn test_map_decoding() {
        let mut image = map_with_nests(60, 50, &[(20, 20), (45, 30)]);
        image.put_pixel(5, 5, WATER);
        image.put_pixel(6, 5, Rgb([0, 155, 0]));

        let (mut grid, sites) = Grid::from_image(&image).unwrap();
        for site in &sites {
            grid.claim_territory(*site);
        }
        assert_eq!(sites.len(), 2);
        assert_eq!(sites[0].name, NestName::Gulfloss);
        assert_eq!((sites[0].x, sites[0].y), (20, 20));
        assert_eq!(sites[1].name, NestName::Ireland);

        assert_eq!(grid.get(5, 5).unwrap().land, LandType::Water);
        assert_eq!(grid.get(6, 5).unwrap().height, 100);
        assert_eq!(grid.get(2, 2).unwrap().height, 45);

        let inside = grid.get(20 + NEST_RADIUS, 20).unwrap();
        assert_eq!(inside.nest, Some(NestName::Gulfloss));
        assert_eq!(inside.land, LandType::Nest);
        let outside = grid.get(20 + NEST_RADIUS, 21).unwrap();
        assert_eq!(outside.nest, None);
    }

    #[test]
    fn test_nests_named_in_column_order() {
        let image = map_with_nests(40, 40, &[(30, 5), (10, 35)]);
        let (_, sites) = Grid::from_image(&image).unwrap();
        assert_eq!(sites[0].name, NestName::Gulfloss);
        assert_eq!((sites[0].x, sites[0].y), (10, 35));
        assert_eq!((sites[1].x, sites[1].y), (30, 5));
    }

    #[test]
    fn test_map_without_border_is_rejected() {
        let mut image = map_with_nests(20, 20, &[(10, 10)]);
        image.put_pixel(0, 7, Rgb([20, 100, 20]));
        assert!(matches!(
            Grid::from_image(&image),
            Err(MapError::MissingWaterBorder { x: 0, y: 7 })
        ));
    }

    #[test]
    fn test_map_without_nests_is_rejected() {
        let image = map_with_nests(20, 20, &[]);
        assert!(matches!(Grid::from_image(&image), Err(MapError::NoNests)));
    }

    #[test]
    fn test_too_many_nests_is_rejected() {
        let nests: Vec<(u32, u32)> = (0..13).map(|i| (2 + i * 2, 5)).collect();
        let image = map_with_nests(40, 10, &nests);
        assert!(matches!(Grid::from_image(&image), Err(MapError::TooManyNests)));
    }
}
