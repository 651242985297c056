//! Resource serializers and entity types
//!
//! Entities reference each other (dashboards → charts → datasets →
//! databases). Serializers emit one level of flat summaries for related
//! entities and never recurse further.

pub mod chart;
pub mod dashboard;
pub mod dataset;

pub use chart::{Chart, ChartResource};
pub use dashboard::{Dashboard, DashboardResource};
pub use dataset::{Dataset, DatasetResource};

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Owner / modifier summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: i64,
    pub username: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagSummary {
    pub id: i64,
    pub name: String,
    #[serde(rename = "type", default)]
    pub tag_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleSummary {
    pub id: i64,
    pub name: String,
}

/// Restrict a serialized object to `columns`, in the order requested.
///
/// Columns absent from the object are skipped; non-objects project to `None`.
pub fn project(full: Value, columns: &[String]) -> Option<Value> {
    let Value::Object(mut map) = full else {
        return None;
    };
    let mut projected = Map::new();
    for column in columns {
        if let Some(value) = map.remove(column) {
            projected.insert(column.clone(), value);
        }
    }
    Some(Value::Object(projected))
}

/// RFC 3339 with an explicit offset (`+00:00`).
pub fn iso8601(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::AutoSi, false)
}

/// Serde adapter for optional timestamps.
pub mod iso8601_opt {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(ts: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match ts {
            Some(ts) => serializer.serialize_str(&super::iso8601(ts)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<DateTime<Utc>>::deserialize(deserializer)
    }
}

/// Attribute value for an optional timestamp, as compared by DAOs.
pub(crate) fn timestamp_value(ts: &Option<DateTime<Utc>>) -> Value {
    ts.as_ref().map(|t| Value::String(iso8601(t))).unwrap_or(Value::Null)
}

pub(crate) fn opt_str(value: &Option<String>) -> Value {
    value.as_ref().map(|s| Value::String(s.clone())).unwrap_or(Value::Null)
}
