//! Reference client that plays one nest with no strategy beyond grabbing
//! whatever food lands next to an ant. Useful for load testing the server
//! and for watching the rules play out.

use clap::Parser;
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use server::network::{read_packet, write_packet};
use shared::{
    manhattan_distance, AntAction, AntCommand, AntData, AntState, AntType, Direction, NestName,
    PacketToClient, PacketToServer, ResourceData, TeamName, FOOD_UNITS_TO_SPAWN, NEST_RADIUS, PORT,
};
use std::str::FromStr;
use std::time::Duration;
use tokio::net::TcpStream;

/// Command line arguments
#[derive(Parser, Debug)]
#[clap(author, version, about = "AntWorld random-walk client")]
struct Args {
    /// Server IP address to connect to
    #[clap(short = 'H', long, default_value = "127.0.0.1")]
    host: String,
    /// Server port to connect to
    #[clap(short, long, default_value_t = PORT)]
    port: u16,
    /// Team to play as
    #[clap(short, long, default_value = "RandomWalkers")]
    team: String,
    /// Rejoin an existing nest instead of birthing a new colony
    #[clap(long)]
    reconnect: bool,
    /// Number of ants to birth with the handshake and keep alive afterwards
    #[clap(long, default_value = "30")]
    colony_size: usize,
    /// Seed for the walker's choices
    #[clap(long)]
    seed: Option<u64>,
}

/// Seconds to wait for the server's next packet before giving up
const READ_TIMEOUT_SECS: u64 = 120;

struct Walker {
    team: TeamName,
    nest: Option<NestName>,
    center: (i32, i32),
    colony_size: usize,
    rng: StdRng,
}

impl Walker {
    fn handshake(&mut self, reconnect: bool) -> PacketToServer {
        if reconnect {
            return PacketToServer::reconnect(self.team.as_str());
        }
        let births = (0..self.colony_size)
            .map(|_| AntCommand::birth(AntType::ALL[self.rng.gen_range(0..AntType::ALL.len())]))
            .collect();
        PacketToServer::new(self.team, births)
    }

    fn respond(&mut self, packet: &PacketToClient) -> PacketToServer {
        if self.nest.is_none() {
            if let Some(nest) = packet.nest {
                if let Some(data) = packet.nest_data(nest) {
                    self.center = (data.center_x, data.center_y);
                }
                info!("Nest assigned: {:?} at {:?}", nest, self.center);
                self.nest = Some(nest);
            }
        }

        let mut commands: Vec<AntCommand> = packet
            .my_ants
            .iter()
            .filter_map(|ant| {
                let action = self.choose(ant, &packet.resources);
                (action != AntAction::Noop).then(|| AntCommand::new(ant.id, ant.ant_type, action))
            })
            .collect();

        // Busy ants are missing from the packet, so this only tops up
        // after real losses once the roster settles.
        let food = self
            .nest
            .and_then(|nest| packet.nest_data(nest))
            .map_or(0, |data| data.food);
        let affordable = (food / FOOD_UNITS_TO_SPAWN) as usize;
        let missing = self.colony_size.saturating_sub(packet.my_ants.len());
        for _ in 0..missing.min(affordable) {
            commands.push(AntCommand::birth(AntType::Worker));
        }

        PacketToServer::new(self.team, commands)
    }

    fn choose(&mut self, ant: &AntData, resources: &[ResourceData]) -> AntAction {
        if ant.is_busy() || !ant.is_alive() {
            return AntAction::Noop;
        }

        if ant.state == AntState::Underground {
            if ant.health_deficit() > 0 {
                return AntAction::heal_self();
            }
            if ant.carry_units > 0 {
                return AntAction::drop_at(None, ant.carry_units);
            }
            let reach = NEST_RADIUS - 1;
            let x = self.center.0 + self.rng.gen_range(-reach..=reach);
            let y = self.center.1 + self.rng.gen_range(-reach..=reach);
            return AntAction::exit_nest(x, y);
        }

        if ant.carry_units > 0 || ant.health_deficit() > ant.stats().max_health / 2 {
            return self.go_home(ant);
        }

        if let Some(action) = pick_up_adjacent(ant, resources) {
            return action;
        }

        AntAction::move_to(Direction::ALL[self.rng.gen_range(0..Direction::ALL.len())])
    }

    fn go_home(&mut self, ant: &AntData) -> AntAction {
        let (cx, cy) = self.center;
        if manhattan_distance(ant.x, ant.y, cx, cy) <= NEST_RADIUS {
            return AntAction::EnterNest;
        }
        match step_toward(ant.x, ant.y, cx, cy) {
            Some(dir) => AntAction::move_to(dir),
            None => AntAction::EnterNest,
        }
    }
}

/// Direction of the single step from `(x, y)` that closes on `(tx, ty)`.
fn step_toward(x: i32, y: i32, tx: i32, ty: i32) -> Option<Direction> {
    let delta = ((tx - x).signum(), (ty - y).signum());
    Direction::ALL.into_iter().find(|dir| dir.delta() == delta)
}

fn pick_up_adjacent(ant: &AntData, resources: &[ResourceData]) -> Option<AntAction> {
    let capacity = ant.remaining_capacity();
    if capacity == 0 {
        return None;
    }
    resources
        .iter()
        .filter(|pile| (pile.x - ant.x).abs() <= 1 && (pile.y - ant.y).abs() <= 1)
        .filter(|pile| pile.x != ant.x || pile.y != ant.y)
        .find_map(|pile| step_toward(ant.x, ant.y, pile.x, pile.y))
        .map(|dir| AntAction::pick_up(Some(dir), capacity))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    let team = TeamName::from_str(&args.team)?;
    let mut walker = Walker {
        team,
        nest: None,
        center: (0, 0),
        colony_size: args.colony_size,
        rng: match args.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        },
    };

    let addr = format!("{}:{}", args.host, args.port);
    info!("Connecting to {} as {}", addr, team);
    let mut stream = TcpStream::connect(&addr).await?;
    stream.set_nodelay(true)?;

    let handshake = walker.handshake(args.reconnect);
    write_packet(&mut stream, &handshake).await?;

    let limit = Duration::from_secs(READ_TIMEOUT_SECS);
    loop {
        let packet: PacketToClient = read_packet(&mut stream, limit).await?;
        if let Some(message) = &packet.error {
            warn!("Server closed the connection: {}", message);
            return Ok(());
        }
        if walker.nest.is_some() && packet.nest != walker.nest {
            warn!("Packet for {:?} while playing {:?}", packet.nest, walker.nest);
        }

        let reply = walker.respond(&packet);
        debug!(
            "Tick {}: {} ants visible, {} commands",
            packet.tick,
            packet.my_ants.len(),
            reply.ants.as_ref().map_or(0, Vec::len)
        );
        write_packet(&mut stream, &reply).await?;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn walker() -> Walker {
        Walker {
            team: TeamName::RandomWalkers,
            nest: Some(NestName::Gulfloss),
            center: (50, 50),
            colony_size: 3,
            rng: StdRng::seed_from_u64(1),
        }
    }

    fn outside_ant(x: i32, y: i32) -> AntData {
        let mut ant = AntData::new(1, AntType::Worker, NestName::Gulfloss, TeamName::RandomWalkers, x, y);
        ant.state = AntState::OutAndAbout;
        ant.action = AntAction::Noop;
        ant
    }

    #[test]
    fn test_step_toward() {
        assert_eq!(step_toward(5, 5, 9, 5), Some(Direction::East));
        assert_eq!(step_toward(5, 5, 1, 1), Some(Direction::NorthWest));
        assert_eq!(step_toward(5, 5, 5, 5), None);
    }

    #[test]
    fn test_underground_ant_exits_inside_territory() {
        let mut walker = walker();
        let mut ant = outside_ant(50, 50);
        ant.state = AntState::Underground;
        match walker.choose(&ant, &[]) {
            AntAction::ExitNest { x, y } => {
                assert!((x - 50).abs() < NEST_RADIUS && (y - 50).abs() < NEST_RADIUS)
            }
            other => panic!("expected ExitNest, got {:?}", other),
        }
    }

    #[test]
    fn test_adjacent_food_is_picked_up() {
        let mut walker = walker();
        let ant = outside_ant(90, 90);
        let pile = ResourceData {
            kind: shared::ResourceKind::Food,
            x: 91,
            y: 90,
            quantity: 40,
        };
        assert_eq!(
            walker.choose(&ant, &[pile]),
            AntAction::pick_up(Some(Direction::East), ant.remaining_capacity())
        );
    }

    #[test]
    fn test_loaded_ant_heads_home() {
        let mut walker = walker();
        let mut ant = outside_ant(90, 50);
        ant.load(shared::ResourceKind::Food, 5);
        assert_eq!(walker.choose(&ant, &[]), AntAction::move_to(Direction::West));

        let mut near = outside_ant(55, 50);
        near.load(shared::ResourceKind::Food, 5);
        assert_eq!(walker.choose(&near, &[]), AntAction::EnterNest);
    }

    #[test]
    fn test_busy_ants_get_no_orders() {
        let mut walker = walker();
        let mut ant = outside_ant(70, 70);
        ant.action = AntAction::Busy { ticks_remaining: 2 };
        assert_eq!(walker.choose(&ant, &[]), AntAction::Noop);
    }

    #[test]
    fn test_births_limited_by_food() {
        let mut walker = walker();
        let mut packet = PacketToClient::new(NestName::Gulfloss, 5, 0.2);
        packet.nests.push(shared::NestData {
            name: NestName::Gulfloss,
            team: Some(TeamName::RandomWalkers),
            center_x: 50,
            center_y: 50,
            food: FOOD_UNITS_TO_SPAWN * 2,
            water: 10,
            score: 0,
            status: shared::NestStatus::Connected,
        });
        let reply = walker.respond(&packet);
        let births = reply
            .ants
            .unwrap()
            .iter()
            .filter(|cmd| cmd.action == AntAction::Birth)
            .count();
        assert_eq!(births, 2);
    }
}
