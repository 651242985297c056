//! Resource binding
//!
//! A resource ties together everything the generic engines need to expose
//! one entity kind: its DAO entity type, projection defaults, search
//! columns, identifier policy, filter vocabulary and serializers.

use serde_json::Value;

use crate::filters::FilterVocabulary;
use crate::identifier::IdentifierPolicy;

/// Response shape of a resource's get-info tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetailShape {
    /// Detail object returned as-is
    Flat,
    /// Detail nested under the resource name: `{ "<name>": detail }`
    Wrapped,
}

/// One exposed entity kind.
pub trait Resource: Send + Sync + 'static {
    type Entity: Send + Sync + 'static;

    /// Singular name used in tool names, e.g. `dashboard`
    const NAME: &'static str;

    /// Plural name used in tool names, e.g. `dashboards`
    const PLURAL: &'static str;

    /// Human-readable label for messages, e.g. `Dashboard`
    const LABEL: &'static str;

    /// Columns loaded when a request does not select any
    const DEFAULT_COLUMNS: &'static [&'static str];

    /// Columns the free-text search runs over
    const SEARCH_COLUMNS: &'static [&'static str];

    const IDENTIFIERS: IdentifierPolicy;

    const DETAIL_SHAPE: DetailShape = DetailShape::Flat;

    /// Static vocabulary, built once per process.
    fn vocabulary() -> &'static FilterVocabulary;

    /// Project an entity onto `columns`. `None` drops the entity from a list.
    fn serialize_list(entity: &Self::Entity, columns: &[String]) -> Option<Value>;

    /// Full detail view including one level of related summaries.
    fn serialize_detail(entity: &Self::Entity) -> Result<Value, serde_json::Error>;
}

pub(crate) fn default_columns<R: Resource>() -> Vec<String> {
    R::DEFAULT_COLUMNS.iter().map(|c| c.to_string()).collect()
}

pub(crate) fn search_columns<R: Resource>() -> Vec<String> {
    R::SEARCH_COLUMNS.iter().map(|c| c.to_string()).collect()
}
