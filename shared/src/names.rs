use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Nest names, handed out to nest centers in the order the map scan finds them.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NestName {
    Gulfloss,
    Ireland,
    Iceland,
    Fjords,
    England,
    Norway,
    Scotland,
    Finland,
    Copenhagen,
    Odense,
    Aalborg,
    Esbjerg,
}

impl NestName {
    pub const ALL: [NestName; 12] = [
        NestName::Gulfloss,
        NestName::Ireland,
        NestName::Iceland,
        NestName::Fjords,
        NestName::England,
        NestName::Norway,
        NestName::Scotland,
        NestName::Finland,
        NestName::Copenhagen,
        NestName::Odense,
        NestName::Aalborg,
        NestName::Esbjerg,
    ];

    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<NestName> {
        Self::ALL.get(index).copied()
    }
}

impl fmt::Display for NestName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Teams allowed to connect. A handshake naming anything else is refused.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TeamName {
    RandomWalkers,
    Army,
    Bullet,
    Carpenter,
    Fire,
    Formica,
    Harvester,
    Pharaoh,
    Weaver,
    SimpleSolid0,
    SimpleSolid1,
    SimpleSolid2,
    SimpleSolid3,
    SimpleSolid4,
    SimpleSolid5,
    SimpleSolid6,
    SimpleSolid7,
    SimpleSolid8,
    SimpleSolid9,
    SimpleSolid10,
    SimpleSolid11,
}

impl TeamName {
    pub const ALL: [TeamName; 21] = [
        TeamName::RandomWalkers,
        TeamName::Army,
        TeamName::Bullet,
        TeamName::Carpenter,
        TeamName::Fire,
        TeamName::Formica,
        TeamName::Harvester,
        TeamName::Pharaoh,
        TeamName::Weaver,
        TeamName::SimpleSolid0,
        TeamName::SimpleSolid1,
        TeamName::SimpleSolid2,
        TeamName::SimpleSolid3,
        TeamName::SimpleSolid4,
        TeamName::SimpleSolid5,
        TeamName::SimpleSolid6,
        TeamName::SimpleSolid7,
        TeamName::SimpleSolid8,
        TeamName::SimpleSolid9,
        TeamName::SimpleSolid10,
        TeamName::SimpleSolid11,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            TeamName::RandomWalkers => "RandomWalkers",
            TeamName::Army => "Army",
            TeamName::Bullet => "Bullet",
            TeamName::Carpenter => "Carpenter",
            TeamName::Fire => "Fire",
            TeamName::Formica => "Formica",
            TeamName::Harvester => "Harvester",
            TeamName::Pharaoh => "Pharaoh",
            TeamName::Weaver => "Weaver",
            TeamName::SimpleSolid0 => "SimpleSolid_0",
            TeamName::SimpleSolid1 => "SimpleSolid_1",
            TeamName::SimpleSolid2 => "SimpleSolid_2",
            TeamName::SimpleSolid3 => "SimpleSolid_3",
            TeamName::SimpleSolid4 => "SimpleSolid_4",
            TeamName::SimpleSolid5 => "SimpleSolid_5",
            TeamName::SimpleSolid6 => "SimpleSolid_6",
            TeamName::SimpleSolid7 => "SimpleSolid_7",
            TeamName::SimpleSolid8 => "SimpleSolid_8",
            TeamName::SimpleSolid9 => "SimpleSolid_9",
            TeamName::SimpleSolid10 => "SimpleSolid_10",
            TeamName::SimpleSolid11 => "SimpleSolid_11",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown team: {0}")]
pub struct UnknownTeam(pub String);

impl FromStr for TeamName {
    type Err = UnknownTeam;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TeamName::ALL
            .iter()
            .copied()
            .find(|team| team.as_str() == s)
            .ok_or_else(|| UnknownTeam(s.to_string()))
    }
}

impl fmt::Display for TeamName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_team_names_parse_back() {
        for team in TeamName::ALL {
            assert_eq!(team.as_str().parse::<TeamName>(), Ok(team));
        }
    }

    #[test]
    fn test_unknown_team_is_rejected() {
        let err = "Termites".parse::<TeamName>().unwrap_err();
        assert_eq!(err, UnknownTeam("Termites".to_string()));
        assert_eq!(err.to_string(), "unknown team: Termites");
    }

    #[test]
    fn test_nest_index_roundtrip() {
        for (i, nest) in NestName::ALL.iter().enumerate() {
            assert_eq!(nest.index(), i);
            assert_eq!(NestName::from_index(i), Some(*nest));
        }
        assert_eq!(NestName::from_index(NestName::ALL.len()), None);
    }
}
