//! Identifier Resolver
//!
//! Maps an opaque identifier onto exactly one DAO lookup:
//! integer (or all-digit text) → id, canonical UUID text → uuid,
//! anything else → slug when the resource supports slugs.
//! Once a form matches no other lookup is attempted, even on a miss.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;
use uuid::Uuid;

use crate::dao::{DaoError, ModelDao};

static CANONICAL_UUID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$")
        .expect("UUID pattern is valid")
});

/// Identifier as sent by a client.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Identifier {
    Int(i64),
    Text(String),
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identifier::Int(id) => write!(f, "{}", id),
            Identifier::Text(text) => f.write_str(text),
        }
    }
}

impl From<i64> for Identifier {
    fn from(id: i64) -> Self {
        Identifier::Int(id)
    }
}

impl From<&str> for Identifier {
    fn from(text: &str) -> Self {
        Identifier::Text(text.to_string())
    }
}

/// Which lookups a resource offers beyond id and uuid.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IdentifierPolicy {
    pub slugs: bool,
}

impl IdentifierPolicy {
    pub const ID_OR_UUID: Self = Self { slugs: false };
    pub const ID_UUID_OR_SLUG: Self = Self { slugs: true };
}

/// The single lookup an identifier dispatches to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    Id(i64),
    Uuid(Uuid),
    Slug(String),
    /// Text with no matching form; resolves to nothing.
    Unresolvable,
}

/// Decide which lookup an identifier maps to.
pub fn classify(identifier: &Identifier, policy: IdentifierPolicy) -> Lookup {
    let text = match identifier {
        Identifier::Int(id) => return Lookup::Id(*id),
        Identifier::Text(text) => text.trim(),
    };

    if !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit()) {
        if let Ok(id) = text.parse::<i64>() {
            if id > 0 {
                return Lookup::Id(id);
            }
        }
    }

    if CANONICAL_UUID.is_match(text) {
        if let Ok(uuid) = Uuid::parse_str(text) {
            return Lookup::Uuid(uuid);
        }
    }

    if policy.slugs && !text.is_empty() {
        Lookup::Slug(text.to_string())
    } else {
        Lookup::Unresolvable
    }
}

/// Resolve an identifier to an entity.
///
/// DAO-level "not found" becomes `Ok(None)`; any other DAO failure is
/// returned for the caller to surface as an internal error.
pub async fn resolve<E>(
    dao: &dyn ModelDao<E>,
    identifier: &Identifier,
    policy: IdentifierPolicy,
) -> Result<Option<E>, DaoError> {
    let lookup = classify(identifier, policy);
    debug!(identifier = %identifier, ?lookup, "Resolving identifier");

    let result = match lookup {
        Lookup::Id(id) => dao.find_by_id(id).await,
        Lookup::Uuid(uuid) => dao.find_by_uuid(uuid).await,
        Lookup::Slug(slug) => dao.find_by_slug(&slug).await,
        Lookup::Unresolvable => Ok(None),
    };

    match result {
        Err(DaoError::NotFound(_)) => Ok(None),
        other => other,
    }
}

// =============================================================================
// Tests
// =============================================================================
