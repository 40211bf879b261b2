//! Newtyped identifiers for every entity in the control-plane data model.
//!
//! Satellite and ground-station ids are operator-assigned strings (they come
//! from mission configuration, not this system); everything else is minted
//! by [`stellarops_clock`](../stellarops_clock/index.html) and carried as a
//! UUID under the hood.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! string_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }
    };
}

macro_rules! uuid_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn new(id: Uuid) -> Self {
                Self(id)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }
    };
}

string_id!(SatelliteId, "Operator-assigned satellite identifier.");
string_id!(GroundStationId, "Operator-assigned ground station identifier.");
string_id!(TrackedObjectId, "Catalog id of a tracked (non-owned) space object.");

uuid_id!(AlarmId, "Globally unique alarm id, minted on raise.");
uuid_id!(ConjunctionId, "Globally unique conjunction record id.");
uuid_id!(CoaId, "Globally unique Course-of-Action id.");
uuid_id!(MissionId, "Globally unique mission id.");
