//! Strongly-typed identifiers used across the client.

use core::str::FromStr;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;

/// Identifier of one running client context.
///
/// Several contexts (processes, windows) can share one durable session store.
/// Store change notifications carry the writer's `ContextId` so a context can
/// tell its own writes apart from somebody else's.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContextId(Uuid);

impl ContextId {
    /// Create a new identifier.
    ///
    /// Uses UUIDv7 (time-ordered). Prefer passing IDs explicitly in tests
    /// for determinism.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for ContextId {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Display for ContextId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for ContextId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let uuid =
            Uuid::from_str(s).map_err(|e| DomainError::invalid_id(format!("ContextId: {e}")))?;
        Ok(Self(uuid))
    }
}

/// Backend-assigned customer identifier (database sequence).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CustomerId(i64);

impl CustomerId {
    pub const fn new(value: i64) -> Self {
        Self(value)
    }
}

impl core::fmt::Display for CustomerId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for CustomerId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s
            .parse::<i64>()
            .map_err(|e| DomainError::invalid_id(format!("CustomerId: {e}")))?;
        if value <= 0 {
            return Err(DomainError::invalid_id("CustomerId: must be positive"));
        }
        Ok(Self(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_ids_are_unique() {
        assert_ne!(ContextId::new(), ContextId::new());
    }

    #[test]
    fn context_id_round_trips_through_display() {
        let id = ContextId::new();
        let parsed: ContextId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn customer_id_rejects_non_positive_and_garbage() {
        assert!("0".parse::<CustomerId>().is_err());
        assert!("-4".parse::<CustomerId>().is_err());
        assert!("abc".parse::<CustomerId>().is_err());
        assert_eq!("42".parse::<CustomerId>().unwrap(), CustomerId::new(42));
    }
}
