use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Role name as issued by the backend (e.g. `ADMIN`).
///
/// Roles are opaque strings at this layer; the backend owns the mapping from
/// role to what the user may do. The client only needs the name for display
/// and for the few admin-only screens.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Role(Cow<'static, str>);

impl Role {
    pub const ADMIN: Role = Role(Cow::Borrowed("ADMIN"));

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_admin(&self) -> bool {
        self.as_str().eq_ignore_ascii_case("ADMIN")
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}
