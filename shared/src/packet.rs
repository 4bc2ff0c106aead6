//! Packets exchanged between the server and a nest's client.
//!
//! Every message travels as one length-prefixed bincode frame (see
//! [`crate::encode_frame`]). A client opens with a handshake
//! `PacketToServer`, then the two sides alternate: one `PacketToClient` per
//! server tick, answered by at most one `PacketToServer`.

use crate::action::AntAction;
use crate::ant::{AntData, AntId, AntType};
use crate::names::{NestName, TeamName};
use crate::ResourceKind;
use serde::{Deserialize, Serialize};

/// One order for one ant. Birth requests carry [`crate::UNKNOWN_ANT_ID`].
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct AntCommand {
    pub id: AntId,
    pub ant_type: AntType,
    pub action: AntAction,
}

impl AntCommand {
    pub fn new(id: AntId, ant_type: AntType, action: AntAction) -> Self {
        Self {
            id,
            ant_type,
            action,
        }
    }

    pub fn birth(ant_type: AntType) -> Self {
        Self::new(crate::UNKNOWN_ANT_ID, ant_type, AntAction::Birth)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PacketToServer {
    /// Team name as text; the server validates it against [`TeamName`].
    pub team: String,
    /// Commands in execution order. `None` asks for the full roster on the
    /// next packet, which is what a reconnecting client sends.
    pub ants: Option<Vec<AntCommand>>,
}

impl PacketToServer {
    pub fn new(team: TeamName, ants: Vec<AntCommand>) -> Self {
        Self {
            team: team.as_str().to_string(),
            ants: Some(ants),
        }
    }

    pub fn reconnect(team: &str) -> Self {
        Self {
            team: team.to_string(),
            ants: None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NestStatus {
    Empty,
    Connected,
    Disconnected,
    Underground,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct NestData {
    pub name: NestName,
    pub team: Option<TeamName>,
    pub center_x: i32,
    pub center_y: i32,
    pub food: u32,
    pub water: u32,
    pub score: u32,
    pub status: NestStatus,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct ResourceData {
    pub kind: ResourceKind,
    pub x: i32,
    pub y: i32,
    pub quantity: u32,
}

/// Per-tick update for one nest.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PacketToClient {
    pub nest: Option<NestName>,
    pub tick: u64,
    /// Seconds since the game started.
    pub tick_time: f64,
    /// Present only when the server is about to close the connection.
    pub error: Option<String>,
    /// The nest's own ants. Busy ants are left out unless the full roster
    /// was requested.
    pub my_ants: Vec<AntData>,
    pub nests: Vec<NestData>,
    pub enemy_ants: Vec<AntData>,
    pub resources: Vec<ResourceData>,
}

impl PacketToClient {
    pub fn new(nest: NestName, tick: u64, tick_time: f64) -> Self {
        Self {
            nest: Some(nest),
            tick,
            tick_time,
            error: None,
            my_ants: Vec::new(),
            nests: Vec::new(),
            enemy_ants: Vec::new(),
            resources: Vec::new(),
        }
    }

    /// Final packet before the server hangs up.
    pub fn error_packet(nest: Option<NestName>, tick: u64, message: &str) -> Self {
        Self {
            nest,
            tick,
            tick_time: 0.0,
            error: Some(message.to_string()),
            my_ants: Vec::new(),
            nests: Vec::new(),
            enemy_ants: Vec::new(),
            resources: Vec::new(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    pub fn nest_data(&self, name: NestName) -> Option<&NestData> {
        self.nests.iter().find(|nest| nest.name == name)
    }
}
