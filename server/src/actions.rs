//! Validates and applies the action a client requests for one ant.
//!
//! Every rule checks all of its preconditions before it touches the world,
//! so a rejected request leaves everything as it was. Rejections never
//! reach the client as errors: the ant simply does nothing (`Noop`) that
//! tick. The reason is still returned so the tick loop can report it to
//! observers.

use crate::grid::{LandType, Occupant, ResourcePile};
use crate::nest::ant_occupant;
use crate::world::World;
use log::error;
use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;
use shared::{
    AntAction, AntData, AntId, AntState, AntType, Direction, NestName, ResourceKind,
    FOOD_UNITS_TO_SPAWN,
};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("no such ant in this nest")]
    UnknownAnt,
    #[error("ant must be out of the nest")]
    NotOutside,
    #[error("ant must be underground")]
    NotUnderground,
    #[error("target is off the map")]
    OutOfBounds,
    #[error("target cell is water")]
    Water,
    #[error("target cell is occupied")]
    Occupied,
    #[error("cell is not this nest's territory")]
    NotOwnTerritory,
    #[error("no living ant at the target")]
    NoTarget,
    #[error("target belongs to another nest")]
    NotNestmate,
    #[error("target is already at full health")]
    FullHealth,
    #[error("nothing to heal with")]
    NoHealingSupply,
    #[error("quantity must be positive")]
    ZeroQuantity,
    #[error("ant is not carrying anything")]
    NothingCarried,
    #[error("nothing to pick up there")]
    NothingToPickUp,
    #[error("ant already carries another resource")]
    MixedCargo,
    #[error("ant cannot carry any more")]
    CarryFull,
    #[error("nest has too little food to birth an ant")]
    InsufficientFood,
    #[error("birth and death cannot be ordered for an existing ant")]
    UnexpectedBirth,
}

/// Applies ant actions with its own random source, so a seeded resolver
/// replays combat identically.
#[derive(Debug, Clone)]
pub struct ActionResolver {
    rng: StdRng,
}

impl ActionResolver {
    pub fn new(rng: StdRng) -> Self {
        Self { rng }
    }

    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }

    /// Resolves `request` and records the result as the ant's action.
    /// Rejected requests are recorded as `Noop`.
    pub fn resolve(
        &mut self,
        world: &mut World,
        nest: NestName,
        id: AntId,
        request: &AntAction,
    ) -> AntAction {
        let action = self
            .try_resolve(world, nest, id, request)
            .unwrap_or(AntAction::Noop);
        world.set_action(nest, id, action);
        action
    }

    /// Works out the action the ant actually takes and applies its effects.
    /// Does not store the result on the ant; see [`ActionResolver::resolve`].
    pub fn try_resolve(
        &mut self,
        world: &mut World,
        nest: NestName,
        id: AntId,
        request: &AntAction,
    ) -> Result<AntAction, Rejection> {
        let ant = world.ant(nest, id).ok_or(Rejection::UnknownAnt)?;
        if !ant.is_alive() {
            return Ok(AntAction::Died);
        }
        if ant.action == AntAction::Birth || ant.is_busy() {
            return Ok(ant.action);
        }

        match *request {
            AntAction::Noop | AntAction::Busy { .. } | AntAction::BusyAttacked { .. } => {
                Ok(AntAction::Noop)
            }
            AntAction::ExitNest { x, y } => exit_nest(world, nest, id, x, y),
            AntAction::EnterNest => enter_nest(world, nest, id),
            AntAction::Move { direction, .. } => move_ant(world, nest, id, direction),
            AntAction::Attack { direction } => self.attack(world, nest, id, direction),
            AntAction::PickUp {
                direction,
                quantity,
            } => pick_up(world, nest, id, direction, quantity),
            AntAction::Drop {
                direction,
                quantity,
            } => drop_cargo(world, nest, id, direction, quantity),
            AntAction::Heal { direction } => heal(world, nest, id, direction),
            AntAction::Birth | AntAction::Died => Err(Rejection::UnexpectedBirth),
        }
    }

    /// Births a new ant if the nest can pay for it.
    pub fn birth(
        &mut self,
        world: &mut World,
        nest: NestName,
        ant_type: AntType,
    ) -> Result<AntId, Rejection> {
        let food = world.nest(nest).ok_or(Rejection::UnknownAnt)?.food;
        if food < FOOD_UNITS_TO_SPAWN {
            return Err(Rejection::InsufficientFood);
        }

        let id = world.allocate_ant_id();
        let home = world.nest_mut(nest).ok_or(Rejection::UnknownAnt)?;
        home.food -= FOOD_UNITS_TO_SPAWN;
        home.spawn_ant(ant_type, id);
        Ok(id)
    }

    /// Sum of `dice` rolls of a d4.
    pub fn roll_damage(&mut self, dice: u32) -> i32 {
        (0..dice).map(|_| self.rng.gen_range(1..=4)).sum()
    }

    fn attack(
        &mut self,
        world: &mut World,
        nest: NestName,
        id: AntId,
        direction: Option<Direction>,
    ) -> Result<AntAction, Rejection> {
        let attacker = outside_ant(world, nest, id)?;
        let dice = attacker.stats().attack_dice;
        let (tx, ty) = Direction::offset(direction, attacker.x, attacker.y);
        if !world.grid.in_bounds(tx, ty) {
            return Err(Rejection::OutOfBounds);
        }
        let (target_nest, target_id) = world
            .ant_at(tx, ty)
            .filter(|target| target.is_alive())
            .map(|target| (target.nest, target.id))
            .ok_or(Rejection::NoTarget)?;

        let damage = self.roll_damage(dice);
        if let Some(target) = world.ant_mut(target_nest, target_id) {
            target.take_damage(damage);
            if let AntAction::Busy { ticks_remaining } = target.action {
                target.action = AntAction::BusyAttacked { ticks_remaining };
            }
        }
        Ok(AntAction::Attack { direction })
    }
}

fn outside_ant(world: &World, nest: NestName, id: AntId) -> Result<&AntData, Rejection> {
    let ant = world.ant(nest, id).ok_or(Rejection::UnknownAnt)?;
    if ant.state != AntState::OutAndAbout {
        return Err(Rejection::NotOutside);
    }
    Ok(ant)
}

fn exit_nest(
    world: &mut World,
    nest: NestName,
    id: AntId,
    x: i32,
    y: i32,
) -> Result<AntAction, Rejection> {
    let ant = world.ant(nest, id).ok_or(Rejection::UnknownAnt)?;
    if ant.state != AntState::Underground {
        return Err(Rejection::NotUnderground);
    }
    let cell = world.grid.get(x, y).ok_or(Rejection::OutOfBounds)?;
    if cell.nest != Some(nest) {
        return Err(Rejection::NotOwnTerritory);
    }
    if !cell.land.is_passable() {
        return Err(Rejection::Water);
    }
    if !cell.is_empty() {
        return Err(Rejection::Occupied);
    }

    let ant = world.ant_mut(nest, id).ok_or(Rejection::UnknownAnt)?;
    ant.state = AntState::OutAndAbout;
    ant.x = x;
    ant.y = y;
    let occupant = ant_occupant(ant);
    if !world.grid.add_occupant(x, y, occupant) {
        error!("Exit cell ({}, {}) filled up under ant {} of {}", x, y, id, nest);
    }
    Ok(AntAction::ExitNest { x, y })
}

fn enter_nest(world: &mut World, nest: NestName, id: AntId) -> Result<AntAction, Rejection> {
    let ant = outside_ant(world, nest, id)?;
    let (x, y) = (ant.x, ant.y);
    let on_own_land = world
        .grid
        .get(x, y)
        .map_or(false, |cell| cell.nest == Some(nest));
    if !on_own_land {
        return Err(Rejection::NotOwnTerritory);
    }
    let home = world.nest(nest).ok_or(Rejection::UnknownAnt)?;
    let center = (home.center_x, home.center_y);

    world.grid.remove_occupant(x, y);
    let ant = world.ant_mut(nest, id).ok_or(Rejection::UnknownAnt)?;
    ant.state = AntState::Underground;
    ant.x = center.0;
    ant.y = center.1;
    Ok(AntAction::EnterNest)
}

fn move_ant(
    world: &mut World,
    nest: NestName,
    id: AntId,
    direction: Direction,
) -> Result<AntAction, Rejection> {
    let ant = outside_ant(world, nest, id)?;
    let from = (ant.x, ant.y);
    let to = Direction::offset(Some(direction), ant.x, ant.y);

    let to_cell = world.grid.get(to.0, to.1).ok_or(Rejection::OutOfBounds)?;
    if !to_cell.land.is_passable() {
        return Err(Rejection::Water);
    }
    if !to_cell.is_empty() {
        return Err(Rejection::Occupied);
    }
    let from_cell = world.grid.get(from.0, from.1).ok_or(Rejection::OutOfBounds)?;

    let stats = ant.stats();
    let mut cost = stats.base_move_ticks;
    let on_nest_land = from_cell.land == LandType::Nest || to_cell.land == LandType::Nest;
    if !on_nest_land && to_cell.height > from_cell.height {
        cost *= stats.uphill_multiplier;
    }
    if ant.is_encumbered() {
        cost *= stats.encumbrance_multiplier;
    }

    if !world.grid.move_occupant(from, to) {
        error!("Ant {} of {} was missing from its cell {:?}", id, nest, from);
    }
    let ant = world.ant_mut(nest, id).ok_or(Rejection::UnknownAnt)?;
    ant.x = to.0;
    ant.y = to.1;
    Ok(AntAction::Move {
        direction,
        ticks_remaining: cost - 1,
    })
}

fn pick_up(
    world: &mut World,
    nest: NestName,
    id: AntId,
    direction: Option<Direction>,
    quantity: u32,
) -> Result<AntAction, Rejection> {
    let ant = outside_ant(world, nest, id)?;
    if quantity == 0 {
        return Err(Rejection::ZeroQuantity);
    }
    let (tx, ty) = Direction::offset(direction, ant.x, ant.y);
    let cell = world.grid.get(tx, ty).ok_or(Rejection::OutOfBounds)?;
    let from_water = cell.land == LandType::Water;

    let (kind, available) = if from_water {
        (ResourceKind::Water, u32::MAX)
    } else {
        let pile = cell.resource().ok_or(Rejection::NothingToPickUp)?;
        (pile.kind, pile.quantity)
    };
    if ant.carry_units > 0 && ant.carry_type != Some(kind) {
        return Err(Rejection::MixedCargo);
    }
    let amount = quantity.min(available).min(ant.remaining_capacity());
    if amount == 0 {
        return Err(Rejection::CarryFull);
    }

    if !from_water {
        world.grid.take_resource(tx, ty, amount);
    }
    let ant = world.ant_mut(nest, id).ok_or(Rejection::UnknownAnt)?;
    ant.load(kind, amount);
    Ok(AntAction::PickUp {
        direction,
        quantity: amount,
    })
}

fn drop_cargo(
    world: &mut World,
    nest: NestName,
    id: AntId,
    direction: Option<Direction>,
    quantity: u32,
) -> Result<AntAction, Rejection> {
    let ant = world.ant(nest, id).ok_or(Rejection::UnknownAnt)?;
    let kind = match ant.carry_type {
        Some(kind) if ant.carry_units > 0 => kind,
        _ => return Err(Rejection::NothingCarried),
    };
    if quantity == 0 {
        return Err(Rejection::ZeroQuantity);
    }
    let amount = quantity.min(ant.carry_units);
    let (state, x, y) = (ant.state, ant.x, ant.y);

    match state {
        AntState::Underground => {
            world
                .nest_mut(nest)
                .ok_or(Rejection::UnknownAnt)?
                .add_resource(kind, amount);
        }
        AntState::OutAndAbout => {
            let (tx, ty) = Direction::offset(direction, x, y);
            let cell = world.grid.get(tx, ty).ok_or(Rejection::OutOfBounds)?;
            if !cell.land.is_passable() {
                return Err(Rejection::Water);
            }
            if !cell.is_empty() {
                return Err(Rejection::Occupied);
            }
            world.grid.add_occupant(
                tx,
                ty,
                Occupant::Resource(ResourcePile {
                    kind,
                    quantity: amount,
                }),
            );
        }
        AntState::Dead => return Err(Rejection::UnknownAnt),
    }

    let ant = world.ant_mut(nest, id).ok_or(Rejection::UnknownAnt)?;
    ant.unload(amount);
    Ok(AntAction::Drop {
        direction,
        quantity: amount,
    })
}

fn heal(
    world: &mut World,
    nest: NestName,
    id: AntId,
    direction: Option<Direction>,
) -> Result<AntAction, Rejection> {
    let state = world.ant(nest, id).ok_or(Rejection::UnknownAnt)?.state;
    match state {
        AntState::Underground => heal_underground(world, nest, id),
        AntState::OutAndAbout => heal_outside(world, nest, id, direction),
        AntState::Dead => Ok(AntAction::Died),
    }
}

/// Self-heal inside the nest, paid from the nest's water, or its food when
/// the water has run out.
fn heal_underground(world: &mut World, nest: NestName, id: AntId) -> Result<AntAction, Rejection> {
    let ant = world.ant(nest, id).ok_or(Rejection::UnknownAnt)?;
    let deficit = ant.health_deficit() as u32;
    if deficit == 0 {
        return Err(Rejection::FullHealth);
    }
    let cap = ant.ant_type.heal_units_per_tick(AntState::Underground);

    let home = world.nest_mut(nest).ok_or(Rejection::UnknownAnt)?;
    let units = if home.water > 0 {
        let units = cap.min(home.water).min(deficit);
        home.water -= units;
        units
    } else if home.food > 0 {
        let units = cap.min(home.food).min(deficit);
        home.food -= units;
        units
    } else {
        return Err(Rejection::NoHealingSupply);
    };

    let ant = world.ant_mut(nest, id).ok_or(Rejection::UnknownAnt)?;
    ant.health += units as i32;
    Ok(AntAction::Heal { direction: None })
}

/// Heal self or an adjacent nestmate with carried water.
fn heal_outside(
    world: &mut World,
    nest: NestName,
    id: AntId,
    direction: Option<Direction>,
) -> Result<AntAction, Rejection> {
    let healer = world.ant(nest, id).ok_or(Rejection::UnknownAnt)?;
    if healer.carry_type != Some(ResourceKind::Water) || healer.carry_units == 0 {
        return Err(Rejection::NoHealingSupply);
    }
    let cap = healer
        .ant_type
        .heal_units_per_tick(AntState::OutAndAbout)
        .min(healer.carry_units);

    let (tx, ty) = Direction::offset(direction, healer.x, healer.y);
    if !world.grid.in_bounds(tx, ty) {
        return Err(Rejection::OutOfBounds);
    }
    let target = world
        .ant_at(tx, ty)
        .filter(|target| target.is_alive())
        .ok_or(Rejection::NoTarget)?;
    if target.nest != nest {
        return Err(Rejection::NotNestmate);
    }
    let deficit = target.health_deficit() as u32;
    if deficit == 0 {
        return Err(Rejection::FullHealth);
    }
    let target_id = target.id;
    let units = cap.min(deficit);

    if let Some(healer) = world.ant_mut(nest, id) {
        healer.unload(units);
    }
    if let Some(target) = world.ant_mut(nest, target_id) {
        target.health += units as i32;
    }
    Ok(AntAction::Heal { direction })
}
