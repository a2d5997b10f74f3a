//! Topology revisions
//!
//! Each revision is a complete alternative of the same template, not a
//! delta on top of the previous one.

use crate::model::{Sku, Storage};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Revision {
    /// Burstable server on PostgreSQL 14
    V1,
    /// General purpose server pinned to a zone, with explicit storage
    V2,
    /// PostgreSQL 15 with an allow-all firewall rule
    #[default]
    V3,
}

impl Revision {
    pub fn all() -> [Revision; 3] {
        [Revision::V1, Revision::V2, Revision::V3]
    }

    pub fn postgres_version(&self) -> &'static str {
        match self {
            Revision::V1 | Revision::V2 => "14",
            Revision::V3 => "15",
        }
    }

    pub fn sku(&self) -> Sku {
        match self {
            Revision::V1 => Sku::new("Burstable", "Standard_B1ms"),
            Revision::V2 | Revision::V3 => Sku::new("GeneralPurpose", "Standard_D2ds_v4"),
        }
    }

    /// Explicit storage; `None` leaves the platform default
    pub fn storage(&self) -> Option<Storage> {
        match self {
            Revision::V1 => None,
            Revision::V2 | Revision::V3 => Some(Storage { storage_size_gb: 32 }),
        }
    }

    pub fn pins_zone(&self) -> bool {
        !matches!(self, Revision::V1)
    }

    pub fn has_firewall_rule(&self) -> bool {
        matches!(self, Revision::V3)
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Revision::V1 => write!(f, "v1"),
            Revision::V2 => write!(f, "v2"),
            Revision::V3 => write!(f, "v3"),
        }
    }
}

impl FromStr for Revision {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "v1" | "1" => Ok(Revision::V1),
            "v2" | "2" => Ok(Revision::V2),
            "v3" | "3" => Ok(Revision::V3),
            other => Err(format!("unknown revision '{}' (expected v1, v2 or v3)", other)),
        }
    }
}
