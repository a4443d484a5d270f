//! Non-owning handles for simulation entities.
//!
//! Tiles refer to the building that occupies them, and agents refer to the
//! building that spawned them, through these handles rather than through
//! references. A handle whose entity has been removed simply fails to
//! resolve; every holder must check before use.
//!
//! Handles are allocated sequentially by their owning collection and are
//! never reused within a session, so a stale handle can never alias a
//! newer entity.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Generates a newtype handle around `u64` with standard derives.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
        #[ts(export, export_to = "bindings/")]
        pub struct $name(pub u64);

        impl $name {
            /// Wrap a raw handle value.
            pub const fn new(raw: u64) -> Self {
                Self(raw)
            }

            /// Return the raw handle value.
            pub const fn into_inner(self) -> u64 {
                self.0
            }

            /// Return the handle that follows this one.
            pub const fn next(self) -> Self {
                Self(self.0.saturating_add(1))
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u64> for $name {
            fn from(raw: u64) -> Self {
                Self(raw)
            }
        }

        impl From<$name> for u64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id! {
    /// Handle to a placed building.
    BuildingId
}

define_id! {
    /// Handle to a mobile agent (walker, cart, enemy, projectile).
    AgentId
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_is_monotonic() {
        let id = BuildingId::new(7);
        assert_eq!(id.next(), BuildingId::new(8));
        assert!(id < id.next());
    }

    #[test]
    fn next_saturates() {
        assert_eq!(AgentId::new(u64::MAX).next(), AgentId::new(u64::MAX));
    }

    #[test]
    fn id_serializes_as_bare_number() {
        let json = serde_json::to_string(&BuildingId::new(42)).ok();
        assert_eq!(json.as_deref(), Some("42"));
    }

    #[test]
    fn id_display_matches_raw() {
        assert_eq!(AgentId::new(3).to_string(), "3");
    }
}
