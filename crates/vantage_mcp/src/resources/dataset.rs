//! Datasets
//!
//! Dataset detail is nested under a `dataset` key; list items are flat.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use super::{iso8601_opt, opt_str, project, timestamp_value, TagSummary, UserSummary};
use crate::filters::{ops, ColumnType, FilterVocabulary};
use crate::identifier::IdentifierPolicy;
use crate::memory::Record;
use crate::resource::{DetailShape, Resource};

/// Dataset entity as held by a DAO.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub id: i64,
    #[serde(default)]
    pub uuid: Option<Uuid>,
    pub table_name: String,
    #[serde(default)]
    pub schema: Option<String>,
    #[serde(default)]
    pub database_id: Option<i64>,
    #[serde(default)]
    pub database_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// Present for virtual (SQL-defined) datasets
    #[serde(default)]
    pub sql: Option<String>,
    #[serde(default)]
    pub main_dttm_col: Option<String>,
    #[serde(default)]
    pub cache_timeout: Option<i64>,
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
    pub columns: Vec<DatasetColumn>,
    #[serde(default)]
    pub metrics: Vec<Metric>,
}

impl Dataset {
    pub fn new(id: i64, table_name: &str) -> Self {
        Self {
            id,
            uuid: None,
            table_name: table_name.to_string(),
            schema: None,
            database_id: None,
            database_name: None,
            description: None,
            sql: None,
            main_dttm_col: None,
            cache_timeout: None,
            changed_by_name: None,
            changed_on: None,
            created_by_name: None,
            created_on: None,
            owners: Vec::new(),
            tags: Vec::new(),
            columns: Vec::new(),
            metrics: Vec::new(),
        }
    }

    /// `virtual` when defined by SQL, `physical` otherwise.
    pub fn kind(&self) -> &'static str {
        if self.sql.as_deref().map_or(false, |s| !s.trim().is_empty()) {
            "virtual"
        } else {
            "physical"
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetColumn {
    pub column_name: String,
    #[serde(rename = "type", default)]
    pub column_type: Option<String>,
    #[serde(default)]
    pub verbose_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub is_dttm: bool,
    #[serde(default = "default_true")]
    pub groupby: bool,
    #[serde(default = "default_true")]
    pub filterable: bool,
    /// SQL expression for calculated columns
    #[serde(default)]
    pub expression: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    pub metric_name: String,
    pub expression: String,
    #[serde(default)]
    pub verbose_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub d3format: Option<String>,
}

fn default_true() -> bool {
    true
}

#[derive(Serialize)]
struct DatasetListItem<'a> {
    id: i64,
    table_name: &'a str,
    schema: Option<&'a str>,
    database_id: Option<i64>,
    database_name: Option<&'a str>,
    description: Option<&'a str>,
    kind: &'static str,
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
struct DatasetInfo<'a> {
    id: i64,
    table_name: &'a str,
    schema: Option<&'a str>,
    database_id: Option<i64>,
    database_name: Option<&'a str>,
    description: Option<&'a str>,
    kind: &'static str,
    sql: Option<&'a str>,
    main_dttm_col: Option<&'a str>,
    cache_timeout: Option<i64>,
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
    columns: &'a [DatasetColumn],
    metrics: &'a [Metric],
}

/// Binding for the dataset tools.
#[derive(Debug, Clone, Copy, Default)]
pub struct DatasetResource;

const PROJECTABLE: &[&str] = &[
    "id",
    "table_name",
    "schema",
    "database_id",
    "database_name",
    "description",
    "kind",
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
        .column("id", ColumnType::Integer, "Dataset id", ops::NUMBER)
        .column("uuid", ColumnType::Uuid, "Dataset UUID", ops::IDENTITY)
        .column("table_name", ColumnType::Text, "Table name", ops::TEXT)
        .column("schema", ColumnType::Text, "Schema name", ops::TEXT)
        .column("database_id", ColumnType::Integer, "Owning database id", ops::NUMBER)
        .column("database_name", ColumnType::Text, "Owning database name", ops::TEXT)
        .column("description", ColumnType::Text, "Dataset description", ops::TEXT)
        .enumerated("kind", "Physical table or SQL-defined view", ops::ENUM_TEXT, &["physical", "virtual"])
        .column("changed_by_name", ColumnType::Text, "Last modifier", ops::TEXT)
        .column("changed_on", ColumnType::Datetime, "Last modification time", ops::DATETIME)
        .column("created_by_name", ColumnType::Text, "Creator", ops::TEXT)
        .column("created_on", ColumnType::Datetime, "Creation time", ops::DATETIME)
        .projectable(PROJECTABLE)
});

impl Resource for DatasetResource {
    type Entity = Dataset;

    const NAME: &'static str = "dataset";
    const PLURAL: &'static str = "datasets";
    const LABEL: &'static str = "Dataset";
    const DEFAULT_COLUMNS: &'static [&'static str] = &[
        "id",
        "table_name",
        "schema",
        "database_name",
        "description",
        "changed_by_name",
        "changed_on",
        "uuid",
    ];
    const SEARCH_COLUMNS: &'static [&'static str] = &["table_name", "schema", "description"];
    const IDENTIFIERS: IdentifierPolicy = IdentifierPolicy::ID_OR_UUID;
    const DETAIL_SHAPE: DetailShape = DetailShape::Wrapped;

    fn vocabulary() -> &'static FilterVocabulary {
        &VOCABULARY
    }

    fn serialize_list(entity: &Dataset, columns: &[String]) -> Option<Value> {
        let item = DatasetListItem {
            id: entity.id,
            table_name: &entity.table_name,
            schema: entity.schema.as_deref(),
            database_id: entity.database_id,
            database_name: entity.database_name.as_deref(),
            description: entity.description.as_deref(),
            kind: entity.kind(),
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

    fn serialize_detail(entity: &Dataset) -> Result<Value, serde_json::Error> {
        serde_json::to_value(DatasetInfo {
            id: entity.id,
            table_name: &entity.table_name,
            schema: entity.schema.as_deref(),
            database_id: entity.database_id,
            database_name: entity.database_name.as_deref(),
            description: entity.description.as_deref(),
            kind: entity.kind(),
            sql: entity.sql.as_deref(),
            main_dttm_col: entity.main_dttm_col.as_deref(),
            cache_timeout: entity.cache_timeout,
            changed_by: entity.changed_by_name.as_deref(),
            changed_by_name: entity.changed_by_name.as_deref(),
            changed_on: entity.changed_on,
            created_by: entity.created_by_name.as_deref(),
            created_on: entity.created_on,
            uuid: entity.uuid,
            tags: &entity.tags,
            owners: &entity.owners,
            columns: &entity.columns,
            metrics: &entity.metrics,
        })
    }
}

impl Record for Dataset {
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
            "table_name" => json!(self.table_name),
            "schema" => opt_str(&self.schema),
            "database_id" => self.database_id.map(|id| json!(id)).unwrap_or(Value::Null),
            "database_name" => opt_str(&self.database_name),
            "description" => opt_str(&self.description),
            "kind" => json!(self.kind()),
            "changed_by_name" => opt_str(&self.changed_by_name),
            "changed_on" => timestamp_value(&self.changed_on),
            "created_by_name" => opt_str(&self.created_by_name),
            "created_on" => timestamp_value(&self.created_on),
            _ => return None,
        };
        Some(value)
    }
}
