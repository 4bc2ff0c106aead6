use shared::{CodecError, NestName, TeamName, UnknownTeam};
use std::path::PathBuf;
use thiserror::Error;

/// Fatal errors that stop the server.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Map(#[from] MapError),
}

#[derive(Debug, Error)]
pub enum MapError {
    #[error("could not read map {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("map is {width}x{height}, too small to hold a water border")]
    TooSmall { width: u32, height: u32 },
    #[error("map border at ({x}, {y}) is not water")]
    MissingWaterBorder { x: u32, y: u32 },
    #[error("map has no nests")]
    NoNests,
    #[error("map has more than {max} nests", max = NestName::ALL.len())]
    TooManyNests,
}

/// A connection-level failure. Ends that client's session only.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("read timed out")]
    Timeout,
    #[error("connection closed by peer")]
    Closed,
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error("simulation is no longer running")]
    SimulationGone,
}

/// Why a handshake was refused. The message goes back to the client.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssignError {
    #[error(transparent)]
    UnknownTeam(#[from] UnknownTeam),
    #[error("team {0} is already connected")]
    AlreadyConnected(TeamName),
    #[error("no free nest for team {0}")]
    NoFreeNest(TeamName),
}
