//! Integer identifier newtypes for users, sites, networks and index rows.
//!
//! The hosting platform hands out monotonically increasing integer
//! identifiers; `0` is never a valid user but is a meaningful sentinel for
//! sites (global scope) and networks (single-tenant mode).

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

/// Identifier of a platform user account.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct UserId(i64);

impl UserId {
    /// Smallest identifier the platform hands out to a real user.
    pub const MIN_VALID: i64 = 1;

    /// Wraps a raw platform user identifier.
    #[must_use]
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    /// Returns the raw identifier value.
    #[must_use]
    pub fn as_i64(&self) -> i64 {
        self.0
    }

    /// Whether the identifier can refer to a real user account.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.0 >= Self::MIN_VALID
    }
}

impl Display for UserId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Identifier of a site; `0` means "global / not site-scoped".
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct SiteId(i64);

impl SiteId {
    /// Sentinel scope for network-wide role assignments.
    pub const GLOBAL: Self = Self(0);

    /// Wraps a raw platform site identifier.
    #[must_use]
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    /// Returns the raw identifier value.
    #[must_use]
    pub fn as_i64(&self) -> i64 {
        self.0
    }

    /// Whether this is the global (not site-scoped) sentinel.
    #[must_use]
    pub fn is_global(&self) -> bool {
        *self == Self::GLOBAL
    }
}

impl Display for SiteId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Identifier of a tenant group (network); `0` is valid in single-tenant mode.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct NetworkId(i64);

impl NetworkId {
    /// Wraps a raw platform network identifier.
    #[must_use]
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    /// Returns the raw identifier value.
    #[must_use]
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl Display for NetworkId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Surrogate identity of a stored role assignment row.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct AssignmentId(i64);

impl AssignmentId {
    /// Wraps a surrogate row identifier assigned by the store.
    #[must_use]
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    /// Returns the raw identifier value.
    #[must_use]
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl Display for AssignmentId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}
