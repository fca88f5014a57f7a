use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The two game families a league can route packets for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GameType {
    #[serde(rename = "B")]
    B,
    #[serde(rename = "F")]
    F,
}

impl GameType {
    pub fn as_char(&self) -> char {
        match self {
            GameType::B => 'B',
            GameType::F => 'F',
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GameType::B => "B",
            GameType::F => "F",
        }
    }

    /// Lowercase config-key form, matching the dosemu TOML tables
    /// (`[dosemu.555.b]`, `[dosemu.555.f]`).
    pub fn as_config_key(&self) -> &'static str {
        match self {
            GameType::B => "b",
            GameType::F => "f",
        }
    }
}

impl fmt::Display for GameType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

impl FromStr for GameType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "B" => Ok(GameType::B),
            "F" => Ok(GameType::F),
            _ => Err(()),
        }
    }
}

/// Parsed parts of a packet filename (see `nova-hub-codec`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PacketName {
    pub league_number: String,
    pub game: GameType,
    pub source_bbs_index: String,
    pub dest_bbs_index: String,
    pub sequence_number: u16,
}

/// Processing-run lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Running,
    Completed,
    Error,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Running => "running",
            RunStatus::Completed => "completed",
            RunStatus::Error => "error",
        }
    }
}

impl FromStr for RunStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "running" => Ok(RunStatus::Running),
            "completed" => Ok(RunStatus::Completed),
            "error" => Ok(RunStatus::Error),
            _ => Err(()),
        }
    }
}

/// Kinds of artifacts collected by the batch processor's ingest phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    Score,
    Routes,
    BbsInfo,
}

impl ArtifactKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactKind::Score => "score",
            ArtifactKind::Routes => "routes",
            ArtifactKind::BbsInfo => "bbsinfo",
        }
    }
}
