//! Charts

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use super::dashboard::DashboardSummary;
use super::{iso8601_opt, opt_str, project, timestamp_value, TagSummary, UserSummary};
use crate::filters::{ops, ColumnType, FilterVocabulary};
use crate::identifier::IdentifierPolicy;
use crate::memory::Record;
use crate::resource::Resource;

/// Chart entity as held by a DAO.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chart {
    pub id: i64,
    #[serde(default)]
    pub uuid: Option<Uuid>,
    #[serde(default)]
    pub slice_name: Option<String>,
    #[serde(default)]
    pub viz_type: Option<String>,
    #[serde(default)]
    pub datasource_id: Option<i64>,
    #[serde(default)]
    pub datasource_name: Option<String>,
    #[serde(default)]
    pub datasource_type: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub cache_timeout: Option<i64>,
    #[serde(default)]
    pub form_data: Option<Value>,
    #[serde(default)]
    pub query_context: Option<Value>,
    #[serde(default)]
    pub changed_by_name: Option<String>,
    #[serde(default, with = "iso8601_opt")]
    pub changed_on: Option<DateTime<Utc>>,
    #[serde(default)]
    pub created_by_name: Option<String>,
    #[serde(default, with = "iso8601_opt")]
    pub created_on: Option<DateTime<Utc>>,
    #[serde(default)]
    pub owners: Vec<UserSummary>,
    #[serde(default)]
    pub tags: Vec<TagSummary>,
    #[serde(default)]
    pub dashboards: Vec<DashboardSummary>,
}

impl Chart {
    pub fn new(id: i64, slice_name: &str, viz_type: &str) -> Self {
        Self {
            id,
            uuid: None,
            slice_name: Some(slice_name.to_string()),
            viz_type: Some(viz_type.to_string()),
            datasource_id: None,
            datasource_name: None,
            datasource_type: None,
            url: Some(format!("/explore/?slice_id={}", id)),
            description: None,
            cache_timeout: None,
            form_data: None,
            query_context: None,
            changed_by_name: None,
            changed_on: None,
            created_by_name: None,
            created_on: None,
            owners: Vec::new(),
            tags: Vec::new(),
            dashboards: Vec::new(),
        }
    }
}

/// One-level summary embedded in dashboard details.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSummary {
    pub id: i64,
    #[serde(default)]
    pub slice_name: Option<String>,
    #[serde(default)]
    pub viz_type: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub uuid: Option<Uuid>,
}

#[derive(Serialize)]
struct ChartListItem<'a> {
    id: i64,
    slice_name: &'a str,
    viz_type: Option<&'a str>,
    datasource_id: Option<i64>,
    datasource_name: Option<&'a str>,
    datasource_type: Option<&'a str>,
    url: Option<&'a str>,
    description: Option<&'a str>,
    cache_timeout: Option<i64>,
    changed_by: Option<&'a str>,
    changed_by_name: Option<&'a str>,
    #[serde(with = "iso8601_opt")]
    changed_on: Option<DateTime<Utc>>,
    created_by_name: Option<&'a str>,
    #[serde(with = "iso8601_opt")]
    created_on: Option<DateTime<Utc>>,
    uuid: Option<Uuid>,
    tags: &'a [TagSummary],
    owners: &'a [UserSummary],
}

#[derive(Serialize)]
struct ChartInfo<'a> {
    id: i64,
    slice_name: &'a str,
    viz_type: Option<&'a str>,
    datasource_id: Option<i64>,
    datasource_name: Option<&'a str>,
    datasource_type: Option<&'a str>,
    url: Option<&'a str>,
    description: Option<&'a str>,
    cache_timeout: Option<i64>,
    form_data: Option<&'a Value>,
    query_context: Option<&'a Value>,
    changed_by: Option<&'a str>,
    changed_by_name: Option<&'a str>,
    #[serde(with = "iso8601_opt")]
    changed_on: Option<DateTime<Utc>>,
    created_by: Option<&'a str>,
    #[serde(with = "iso8601_opt")]
    created_on: Option<DateTime<Utc>>,
    uuid: Option<Uuid>,
    tags: &'a [TagSummary],
    owners: &'a [UserSummary],
    dashboards: &'a [DashboardSummary],
}

/// Binding for the chart tools.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChartResource;

const PROJECTABLE: &[&str] = &[
    "id",
    "slice_name",
    "viz_type",
    "datasource_id",
    "datasource_name",
    "datasource_type",
    "url",
    "description",
    "cache_timeout",
    "changed_by",
    "changed_by_name",
    "changed_on",
    "created_by_name",
    "created_on",
    "uuid",
    "tags",
    "owners",
];

static VOCABULARY: Lazy<FilterVocabulary> = Lazy::new(|| {
    FilterVocabulary::new()
        .column("id", ColumnType::Integer, "Chart id", ops::NUMBER)
        .column("uuid", ColumnType::Uuid, "Chart UUID", ops::IDENTITY)
        .column("slice_name", ColumnType::Text, "Chart name", ops::TEXT)
        .column("viz_type", ColumnType::Text, "Visualization type", ops::TEXT)
        .column("datasource_name", ColumnType::Text, "Backing dataset name", ops::TEXT)
        .enumerated(
            "datasource_type",
            "Kind of datasource",
            ops::ENUM_TEXT,
            &["table", "query", "saved_query", "view"],
        )
        .column("description", ColumnType::Text, "Chart description", ops::TEXT)
        .column("changed_by_name", ColumnType::Text, "Last modifier", ops::TEXT)
        .column("changed_on", ColumnType::Datetime, "Last modification time", ops::DATETIME)
        .column("created_by_name", ColumnType::Text, "Creator", ops::TEXT)
        .column("created_on", ColumnType::Datetime, "Creation time", ops::DATETIME)
        .projectable(PROJECTABLE)
});

impl Resource for ChartResource {
    type Entity = Chart;

    const NAME: &'static str = "chart";
    const PLURAL: &'static str = "charts";
    const LABEL: &'static str = "Chart";
    const DEFAULT_COLUMNS: &'static [&'static str] = &[
        "id",
        "slice_name",
        "viz_type",
        "datasource_name",
        "datasource_type",
        "url",
        "description",
        "changed_by_name",
        "changed_on",
        "uuid",
    ];
    const SEARCH_COLUMNS: &'static [&'static str] =
        &["slice_name", "description", "viz_type", "datasource_name"];
    const IDENTIFIERS: IdentifierPolicy = IdentifierPolicy::ID_OR_UUID;

    fn vocabulary() -> &'static FilterVocabulary {
        &VOCABULARY
    }

    /// Charts without a name cannot be shown in a list and are dropped.
    fn serialize_list(entity: &Chart, columns: &[String]) -> Option<Value> {
        let slice_name = entity.slice_name.as_deref()?;
        let item = ChartListItem {
            id: entity.id,
            slice_name,
            viz_type: entity.viz_type.as_deref(),
            datasource_id: entity.datasource_id,
            datasource_name: entity.datasource_name.as_deref(),
            datasource_type: entity.datasource_type.as_deref(),
            url: entity.url.as_deref(),
            description: entity.description.as_deref(),
            cache_timeout: entity.cache_timeout,
            changed_by: entity.changed_by_name.as_deref(),
            changed_by_name: entity.changed_by_name.as_deref(),
            changed_on: entity.changed_on,
            created_by_name: entity.created_by_name.as_deref(),
            created_on: entity.created_on,
            uuid: entity.uuid,
            tags: &entity.tags,
            owners: &entity.owners,
        };
        project(serde_json::to_value(item).ok()?, columns)
    }

    fn serialize_detail(entity: &Chart) -> Result<Value, serde_json::Error> {
        serde_json::to_value(ChartInfo {
            id: entity.id,
            slice_name: entity.slice_name.as_deref().unwrap_or(""),
            viz_type: entity.viz_type.as_deref(),
            datasource_id: entity.datasource_id,
            datasource_name: entity.datasource_name.as_deref(),
            datasource_type: entity.datasource_type.as_deref(),
            url: entity.url.as_deref(),
            description: entity.description.as_deref(),
            cache_timeout: entity.cache_timeout,
            form_data: entity.form_data.as_ref(),
            query_context: entity.query_context.as_ref(),
            changed_by: entity.changed_by_name.as_deref(),
            changed_by_name: entity.changed_by_name.as_deref(),
            changed_on: entity.changed_on,
            created_by: entity.created_by_name.as_deref(),
            created_on: entity.created_on,
            uuid: entity.uuid,
            tags: &entity.tags,
            owners: &entity.owners,
            dashboards: &entity.dashboards,
        })
    }
}

impl Record for Chart {
    fn id(&self) -> i64 {
        self.id
    }

    fn uuid(&self) -> Option<Uuid> {
        self.uuid
    }

    fn attribute(&self, column: &str) -> Option<Value> {
        let value = match column {
            "id" => json!(self.id),
            "uuid" => self.uuid.map(|u| json!(u)).unwrap_or(Value::Null),
            "slice_name" => opt_str(&self.slice_name),
            "viz_type" => opt_str(&self.viz_type),
            "datasource_name" => opt_str(&self.datasource_name),
            "datasource_type" => opt_str(&self.datasource_type),
            "description" => opt_str(&self.description),
            "url" => opt_str(&self.url),
            "changed_by_name" => opt_str(&self.changed_by_name),
            "changed_on" => timestamp_value(&self.changed_on),
            "created_by_name" => opt_str(&self.created_by_name),
            "created_on" => timestamp_value(&self.created_on),
            _ => return None,
        };
        Some(value)
    }
}
