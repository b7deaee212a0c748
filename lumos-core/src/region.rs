///! Service regions
///!
///! Each region has its own schedule source with its own wire format, but
///! queue identifiers and timezone are shared. The enum is closed: adding
///! a region means adding a source implementation.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Region {
    Prykarpattia,
    Chernivtsi,
}

impl Region {
    pub const ALL: [Region; 2] = [Region::Prykarpattia, Region::Chernivtsi];

    /// Stable identifier used in state keys and configuration.
    pub fn as_str(&self) -> &'static str {
        match self {
            Region::Prykarpattia => "prykarpattia",
            Region::Chernivtsi => "chernivtsi",
        }
    }

    /// Human-readable label shown in messages.
    pub fn label(&self) -> &'static str {
        match self {
            Region::Prykarpattia => "Прикарпаття",
            Region::Chernivtsi => "Чернівецька область",
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Region {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "prykarpattia" => Ok(Region::Prykarpattia),
            "chernivtsi" => Ok(Region::Chernivtsi),
            other => Err(format!("unknown region: {}", other)),
        }
    }
}
