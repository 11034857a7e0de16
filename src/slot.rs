//! Attendance period derivation.
//!
//! The client only ever *guesses* a slot for display in kiosk mode; a slot
//! returned by the server always wins (see [`Slot::resolve`]).

use std::fmt;
use std::str::FromStr;

use chrono::{Local, Timelike};
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Coarse attendance period of the day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Slot {
    Morning,
    Noon,
    Afternoon,
    Evening,
}

impl Slot {
    /// All slots in day order.
    pub const ALL: [Self; 4] = [Self::Morning, Self::Noon, Self::Afternoon, Self::Evening];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Morning => "morning",
            Self::Noon => "noon",
            Self::Afternoon => "afternoon",
            Self::Evening => "evening",
        }
    }

    /// Pick the slot to display: the server's value if it sent one,
    /// otherwise the client-side default.
    #[must_use]
    pub fn resolve(server: Option<Self>, client_default: Option<Self>) -> Option<Self> {
        server.or(client_default)
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Slot {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "morning" => Ok(Self::Morning),
            "noon" => Ok(Self::Noon),
            "afternoon" => Ok(Self::Afternoon),
            "evening" => Ok(Self::Evening),
            other => Err(format!(
                "unknown slot '{other}' (use: morning|noon|afternoon|evening)"
            )),
        }
    }
}

/// Map a local hour (0-23) to its slot.
///
/// Boundaries: before 10 is morning, before 13 noon, before 17 afternoon,
/// everything after is evening.
#[must_use]
pub const fn derive_slot(local_hour: u32) -> Slot {
    if local_hour < 10 {
        Slot::Morning
    } else if local_hour < 13 {
        Slot::Noon
    } else if local_hour < 17 {
        Slot::Afternoon
    } else {
        Slot::Evening
    }
}

/// Slot for the current local wall-clock time.
#[must_use]
pub fn current_slot() -> Slot {
    let hour = Local::now().hour();
    let slot = derive_slot(hour);
    trace!(hour, %slot, "Derived client-side slot");
    slot
}
