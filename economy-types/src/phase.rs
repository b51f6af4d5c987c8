// SPDX-License-Identifier: Apache-2.0, MIT
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Season phase. Server-authoritative; never client-defined.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Alpha,
    Beta,
    Release,
}

impl Default for Phase {
    fn default() -> Self {
        Phase::Alpha
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Phase::Alpha => "alpha",
            Phase::Beta => "beta",
            Phase::Release => "release",
        };
        f.write_str(s)
    }
}

impl FromStr for Phase {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "alpha" => Ok(Phase::Alpha),
            "beta" => Ok(Phase::Beta),
            "release" => Ok(Phase::Release),
            _ => Err(()),
        }
    }
}
