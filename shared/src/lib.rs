use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

pub mod action;
pub mod ant;
pub mod names;
pub mod packet;

pub use action::AntAction;
pub use ant::{AntData, AntId, AntState, AntStats, AntType, UNKNOWN_ANT_ID};
pub use names::{NestName, TeamName, UnknownTeam};
pub use packet::{AntCommand, NestData, NestStatus, PacketToClient, PacketToServer, ResourceData};

/// Manhattan radius around a nest center that belongs to the nest.
pub const NEST_RADIUS: i32 = 15;
/// Food it costs a nest to birth one ant.
pub const FOOD_UNITS_TO_SPAWN: u32 = 4;
pub const INITIAL_FOOD_UNITS: u32 = 100 * FOOD_UNITS_TO_SPAWN;
pub const INITIAL_NEST_WATER_UNITS: u32 = 100;
/// Score contributed by each living ant.
pub const SCORE_PER_ANT: u32 = 3;
/// Food left behind by a dead ant, on top of any food it carried.
pub const DEAD_ANT_FOOD_UNITS: u32 = 2;
pub const TIME_STEP_MSEC: u64 = 40;
pub const PORT: u16 = 5555;

/// Largest frame either side accepts.
pub const MAX_FRAME_LEN: usize = 4 * 1024 * 1024;

/// One of the 8 neighbouring directions on the grid. North is `dy = -1`.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    North,
    NorthEast,
    East,
    SouthEast,
    South,
    SouthWest,
    West,
    NorthWest,
}

impl Direction {
    pub const ALL: [Direction; 8] = [
        Direction::North,
        Direction::NorthEast,
        Direction::East,
        Direction::SouthEast,
        Direction::South,
        Direction::SouthWest,
        Direction::West,
        Direction::NorthWest,
    ];

    pub const fn delta(self) -> (i32, i32) {
        match self {
            Direction::North => (0, -1),
            Direction::NorthEast => (1, -1),
            Direction::East => (1, 0),
            Direction::SouthEast => (1, 1),
            Direction::South => (0, 1),
            Direction::SouthWest => (-1, 1),
            Direction::West => (-1, 0),
            Direction::NorthWest => (-1, -1),
        }
    }

    /// Applies an optional direction to a position. `None` stays in place.
    pub fn offset(direction: Option<Direction>, x: i32, y: i32) -> (i32, i32) {
        match direction {
            Some(dir) => {
                let (dx, dy) = dir.delta();
                (x + dx, y + dy)
            }
            None => (x, y),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Food,
    Water,
}

pub fn manhattan_distance(x1: i32, y1: i32, x2: i32, y2: i32) -> i32 {
    (x1 - x2).abs() + (y1 - y2).abs()
}

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("frame of {0} bytes exceeds the 4 MiB limit")]
    FrameTooLarge(usize),
    #[error("malformed packet: {0}")]
    Malformed(#[from] bincode::Error),
}

/// Serializes a packet into a length-prefixed frame (4-byte big-endian length).
pub fn encode_frame<T: Serialize>(packet: &T) -> Result<Vec<u8>, CodecError> {
    let payload = bincode::serialize(packet)?;
    if payload.len() > MAX_FRAME_LEN {
        return Err(CodecError::FrameTooLarge(payload.len()));
    }
    let mut frame = Vec::with_capacity(payload.len() + 4);
    frame.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    frame.extend_from_slice(&payload);
    Ok(frame)
}

/// Deserializes a frame payload (without its length prefix).
pub fn decode_payload<T: DeserializeOwned>(payload: &[u8]) -> Result<T, CodecError> {
    if payload.len() > MAX_FRAME_LEN {
        return Err(CodecError::FrameTooLarge(payload.len()));
    }
    Ok(bincode::deserialize(payload)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn test_direction_deltas_are_unit_steps() {
        for dir in Direction::ALL {
            let (dx, dy) = dir.delta();
            assert!(dx.abs() <= 1 && dy.abs() <= 1);
            assert!(dx != 0 || dy != 0);
        }
        assert_eq!(Direction::North.delta(), (0, -1));
        assert_eq!(Direction::SouthWest.delta(), (-1, 1));
    }

    #[test]
    fn test_offset_without_direction_stays_put() {
        assert_eq!(Direction::offset(None, 4, 9), (4, 9));
        assert_eq!(Direction::offset(Some(Direction::East), 4, 9), (5, 9));
    }

    #[test]
    fn test_manhattan_distance() {
        assert_eq!(manhattan_distance(0, 0, 3, 4), 7);
        assert_eq!(manhattan_distance(-2, 5, 2, 5), 4);
        assert_eq!(manhattan_distance(1, 1, 1, 1), 0);
    }

    #[test]
    fn test_frame_layout() {
        let packet = PacketToServer::reconnect("Army");
        let frame = encode_frame(&packet).unwrap();
        let len = u32::from_be_bytes([frame[0], frame[1], frame[2], frame[3]]) as usize;
        assert_eq!(len, frame.len() - 4);

        let decoded: PacketToServer = decode_payload(&frame[4..]).unwrap();
        assert_eq!(decoded, packet);
    }

    #[test]
    fn test_truncated_payload_is_rejected() {
        let packet = PacketToClient::error_packet(Some(NestName::Ireland), 9, "bye");
        let frame = encode_frame(&packet).unwrap();
        let truncated = &frame[4..frame.len() / 2];
        let result: Result<PacketToClient, _> = decode_payload(truncated);
        assert!(matches!(result, Err(CodecError::Malformed(_))));
    }

    #[test]
    fn test_tick_time_survives_encoding() {
        let mut packet = PacketToClient::new(NestName::Fjords, 12, 0.48);
        packet.tick_time = 1.234_567;
        let frame = encode_frame(&packet).unwrap();
        let decoded: PacketToClient = decode_payload(&frame[4..]).unwrap();
        assert_eq!(decoded.tick, 12);
        assert_approx_eq!(decoded.tick_time, 1.234_567, 1e-9);
    }
}
