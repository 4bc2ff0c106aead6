//! Performance benchmarks for critical game systems

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use server::client_manager::{exchange, WorkerEndpoint};
use server::config::ServerConfig;
use server::game::GameState;
use server::grid::{Grid, NestSite, Occupant};
use server::visibility::visible_objects;
use server::world::World;
use shared::{
    decode_payload, encode_frame, AntAction, AntCommand, AntState, AntType, Direction, NestName,
    PacketToClient, PacketToServer, ResourceKind, TeamName,
};
use std::time::{Duration, Instant};

const WIDTH: i32 = 400;
const HEIGHT: i32 = 300;

fn crowded_world(ants_per_nest: usize, seed: u64) -> World {
    let sites: Vec<NestSite> = NestName::ALL[..4]
        .iter()
        .enumerate()
        .map(|(i, &name)| NestSite {
            name,
            x: 60 + (i as i32 % 2) * 280,
            y: 60 + (i as i32 / 2) * 180,
        })
        .collect();
    let mut world = World::new(Grid::bordered(WIDTH, HEIGHT), &sites);
    let mut rng = StdRng::seed_from_u64(seed);

    for index in 0..world.nests.len() {
        let name = world.nests[index].name;
        for _ in 0..ants_per_nest {
            let id = world.allocate_ant_id();
            let (x, y) = loop {
                let x = rng.gen_range(1..WIDTH - 1);
                let y = rng.gen_range(1..HEIGHT - 1);
                if world.grid.is_empty(x, y) {
                    break (x, y);
                }
            };
            let Some(nest) = world.nest_mut(name) else {
                continue;
            };
            nest.spawn_ant(AntType::ALL[id as usize % 3], id);
            if let Some(ant) = nest.ants.get_mut(&id) {
                ant.state = AntState::OutAndAbout;
                ant.action = AntAction::Noop;
                ant.x = x;
                ant.y = y;
            }
            world.grid.add_occupant(x, y, Occupant::Ant { nest: name, id });
        }
    }

    for _ in 0..500 {
        let x = rng.gen_range(1..WIDTH - 1);
        let y = rng.gen_range(1..HEIGHT - 1);
        world.grid.add_resource(x, y, ResourceKind::Food, 20);
    }
    world
}

/// Benchmarks fog-of-war scans for one nest
#[test]
fn benchmark_visibility_scan() {
    let mut world = crowded_world(250, 1);
    let iterations = 200;
    let start = Instant::now();

    let mut seen = 0;
    for tick in 1..=iterations {
        seen += visible_objects(&mut world, NestName::Gulfloss, tick).resources.len();
    }

    let duration = start.elapsed();
    println!(
        "Visibility: {} scans of 250 ants in {:?} ({:.2} μs/scan, {} piles seen)",
        iterations,
        duration,
        duration.as_micros() as f64 / iterations as f64,
        seen
    );

    // Generous enough for unoptimized test builds
    assert!(duration < Duration::from_millis(50) * iterations as u32);
}

/// Benchmarks full ticks with four busy nests
#[test]
fn benchmark_tick_throughput() {
    let config = ServerConfig {
        seed: Some(5),
        ..ServerConfig::default()
    };
    let mut game = GameState::new(crowded_world(0, 2), &config);

    let mut workers: Vec<(TeamName, WorkerEndpoint)> = Vec::new();
    for (index, team) in [TeamName::Army, TeamName::Bullet, TeamName::Fire, TeamName::Weaver]
        .into_iter()
        .enumerate()
    {
        let (link, worker) = exchange(index as u64 + 1, game.tick_counter());
        game.handle_handshake(&PacketToServer::reconnect(team.as_str()), link, Instant::now())
            .unwrap();
        let births = (0..100).map(|_| AntCommand::birth(AntType::Worker)).collect();
        worker
            .push_inbound(PacketToServer::new(team, births))
            .unwrap();
        workers.push((team, worker));
    }
    game.tick(Instant::now());

    let mut rng = StdRng::seed_from_u64(9);
    let iterations: u32 = 100;
    let start = Instant::now();

    for _ in 0..iterations {
        for (team, worker) in &workers {
            let nest = game.world.nest_of_team(*team).unwrap();
            let commands = nest
                .ants
                .values()
                .map(|ant| {
                    let action = if ant.state == AntState::Underground {
                        AntAction::exit_nest(
                            nest.center_x + rng.gen_range(-10..=10),
                            nest.center_y + rng.gen_range(-4..=4),
                        )
                    } else {
                        AntAction::move_to(Direction::ALL[rng.gen_range(0..8)])
                    };
                    AntCommand::new(ant.id, ant.ant_type, action)
                })
                .collect();
            worker
                .push_inbound(PacketToServer::new(*team, commands))
                .unwrap();
        }
        game.tick(Instant::now());
    }

    let duration = start.elapsed();
    println!(
        "Ticks: {} ticks of 400 ants in {:?} ({:.2} ms/tick)",
        iterations,
        duration,
        duration.as_secs_f64() * 1000.0 / iterations as f64
    );

    // Release builds average far below the 40ms budget; debug builds get slack
    assert!(duration < Duration::from_millis(100) * iterations);
}

/// Benchmarks encoding and decoding a full outbound packet
#[test]
fn benchmark_packet_codec() {
    let world = crowded_world(400, 3);
    let mut packet = PacketToClient::new(NestName::Gulfloss, 1, 0.04);
    packet.my_ants = world.nests[0].ants.values().cloned().collect();
    packet.enemy_ants = world.nests[1].ants.values().cloned().collect();
    packet.nests = world.nests.iter().map(|nest| nest.snapshot()).collect();

    let iterations = 1_000;
    let start = Instant::now();

    let mut bytes = 0;
    for _ in 0..iterations {
        let frame = encode_frame(&packet).unwrap();
        let decoded: PacketToClient = decode_payload(&frame[4..]).unwrap();
        bytes += frame.len();
        assert_eq!(decoded.my_ants.len(), 400);
    }

    let duration = start.elapsed();
    println!(
        "Codec: {} round trips of {} bytes in {:?} ({:.2} μs/iter)",
        iterations,
        bytes / iterations,
        duration,
        duration.as_micros() as f64 / iterations as f64
    );

    // Should complete in under 5 seconds
    assert!(duration.as_secs() < 5);
}
