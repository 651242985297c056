//! Dashboards

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use super::chart::ChartSummary;
use super::{iso8601_opt, opt_str, project, timestamp_value, RoleSummary, TagSummary, UserSummary};
use crate::filters::{ops, ColumnType, FilterVocabulary};
use crate::identifier::IdentifierPolicy;
use crate::memory::Record;
use crate::resource::Resource;

const UNTITLED: &str = "Untitled";

/// Dashboard entity as held by a DAO.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dashboard {
    pub id: i64,
    #[serde(default)]
    pub uuid: Option<Uuid>,
    #[serde(default)]
    pub dashboard_title: Option<String>,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub published: bool,
    #[serde(default)]
    pub certified_by: Option<String>,
    #[serde(default)]
    pub certification_details: Option<String>,
    #[serde(default)]
    pub css: Option<String>,
    #[serde(default)]
    pub json_metadata: Option<String>,
    #[serde(default)]
    pub position_json: Option<String>,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    #[serde(default)]
    pub is_managed_externally: bool,
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
    pub roles: Vec<RoleSummary>,
    #[serde(default)]
    pub charts: Vec<ChartSummary>,
}

impl Dashboard {
    pub fn new(id: i64, title: &str) -> Self {
        Self {
            id,
            uuid: None,
            dashboard_title: Some(title.to_string()),
            slug: None,
            url: Some(format!("/dashboard/{}/", id)),
            published: false,
            certified_by: None,
            certification_details: None,
            css: None,
            json_metadata: None,
            position_json: None,
            thumbnail_url: None,
            is_managed_externally: false,
            changed_by_name: None,
            changed_on: None,
            created_by_name: None,
            created_on: None,
            owners: Vec::new(),
            tags: Vec::new(),
            roles: Vec::new(),
            charts: Vec::new(),
        }
    }

    fn title(&self) -> &str {
        self.dashboard_title.as_deref().unwrap_or(UNTITLED)
    }
}

/// One-level summary embedded in chart details.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardSummary {
    pub id: i64,
    #[serde(default)]
    pub dashboard_title: Option<String>,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub uuid: Option<Uuid>,
}

/// Every column a list item can carry before projection.
#[derive(Serialize)]
struct DashboardListItem<'a> {
    id: i64,
    dashboard_title: &'a str,
    slug: &'a str,
    url: Option<&'a str>,
    published: bool,
    changed_by: Option<&'a str>,
    changed_by_name: Option<&'a str>,
    #[serde(with = "iso8601_opt")]
    changed_on: Option<DateTime<Utc>>,
    created_by_name: Option<&'a str>,
    #[serde(with = "iso8601_opt")]
    created_on: Option<DateTime<Utc>>,
    uuid: Option<Uuid>,
    certified_by: Option<&'a str>,
    chart_count: usize,
    tags: &'a [TagSummary],
    owners: &'a [UserSummary],
}

/// Detail view returned by `get_dashboard_info`.
#[derive(Serialize)]
struct DashboardInfo<'a> {
    id: i64,
    dashboard_title: &'a str,
    slug: &'a str,
    url: Option<&'a str>,
    uuid: Option<Uuid>,
    published: bool,
    changed_by: Option<&'a str>,
    changed_by_name: Option<&'a str>,
    #[serde(with = "iso8601_opt")]
    changed_on: Option<DateTime<Utc>>,
    created_by: Option<&'a str>,
    #[serde(with = "iso8601_opt")]
    created_on: Option<DateTime<Utc>>,
    certified_by: Option<&'a str>,
    certification_details: Option<&'a str>,
    css: Option<&'a str>,
    json_metadata: Option<&'a str>,
    position_json: Option<&'a str>,
    thumbnail_url: Option<&'a str>,
    is_managed_externally: bool,
    tags: &'a [TagSummary],
    owners: &'a [UserSummary],
    roles: &'a [RoleSummary],
    chart_count: usize,
    charts: &'a [ChartSummary],
}

/// Binding for the dashboard tools.
#[derive(Debug, Clone, Copy, Default)]
pub struct DashboardResource;

const PROJECTABLE: &[&str] = &[
    "id",
    "dashboard_title",
    "slug",
    "url",
    "published",
    "changed_by",
    "changed_by_name",
    "changed_on",
    "created_by_name",
    "created_on",
    "uuid",
    "certified_by",
    "chart_count",
    "tags",
    "owners",
];

static VOCABULARY: Lazy<FilterVocabulary> = Lazy::new(|| {
    FilterVocabulary::new()
        .column("id", ColumnType::Integer, "Dashboard id", ops::NUMBER)
        .column("uuid", ColumnType::Uuid, "Dashboard UUID", ops::IDENTITY)
        .column("dashboard_title", ColumnType::Text, "Dashboard title", ops::TEXT)
        .column("slug", ColumnType::Text, "URL slug", ops::TEXT)
        .column("published", ColumnType::Boolean, "Whether the dashboard is published", ops::BOOLEAN)
        .column("certified_by", ColumnType::Text, "Certifying party", ops::TEXT)
        .column("changed_by_name", ColumnType::Text, "Last modifier", ops::TEXT)
        .column("changed_on", ColumnType::Datetime, "Last modification time", ops::DATETIME)
        .column("created_by_name", ColumnType::Text, "Creator", ops::TEXT)
        .column("created_on", ColumnType::Datetime, "Creation time", ops::DATETIME)
        .projectable(PROJECTABLE)
});

impl Resource for DashboardResource {
    type Entity = Dashboard;

    const NAME: &'static str = "dashboard";
    const PLURAL: &'static str = "dashboards";
    const LABEL: &'static str = "Dashboard";
    const DEFAULT_COLUMNS: &'static [&'static str] = &[
        "id",
        "dashboard_title",
        "slug",
        "url",
        "published",
        "changed_by_name",
        "changed_on",
        "created_by_name",
        "created_on",
    ];
    const SEARCH_COLUMNS: &'static [&'static str] = &["dashboard_title", "slug"];
    const IDENTIFIERS: IdentifierPolicy = IdentifierPolicy::ID_UUID_OR_SLUG;

    fn vocabulary() -> &'static FilterVocabulary {
        &VOCABULARY
    }

    fn serialize_list(entity: &Dashboard, columns: &[String]) -> Option<Value> {
        let item = DashboardListItem {
            id: entity.id,
            dashboard_title: entity.title(),
            slug: entity.slug.as_deref().unwrap_or(""),
            url: entity.url.as_deref(),
            published: entity.published,
            changed_by: entity.changed_by_name.as_deref(),
            changed_by_name: entity.changed_by_name.as_deref(),
            changed_on: entity.changed_on,
            created_by_name: entity.created_by_name.as_deref(),
            created_on: entity.created_on,
            uuid: entity.uuid,
            certified_by: entity.certified_by.as_deref(),
            chart_count: entity.charts.len(),
            tags: &entity.tags,
            owners: &entity.owners,
        };
        project(serde_json::to_value(item).ok()?, columns)
    }

    fn serialize_detail(entity: &Dashboard) -> Result<Value, serde_json::Error> {
        serde_json::to_value(DashboardInfo {
            id: entity.id,
            dashboard_title: entity.title(),
            slug: entity.slug.as_deref().unwrap_or(""),
            url: entity.url.as_deref(),
            uuid: entity.uuid,
            published: entity.published,
            changed_by: entity.changed_by_name.as_deref(),
            changed_by_name: entity.changed_by_name.as_deref(),
            changed_on: entity.changed_on,
            created_by: entity.created_by_name.as_deref(),
            created_on: entity.created_on,
            certified_by: entity.certified_by.as_deref(),
            certification_details: entity.certification_details.as_deref(),
            css: entity.css.as_deref(),
            json_metadata: entity.json_metadata.as_deref(),
            position_json: entity.position_json.as_deref(),
            thumbnail_url: entity.thumbnail_url.as_deref(),
            is_managed_externally: entity.is_managed_externally,
            tags: &entity.tags,
            owners: &entity.owners,
            roles: &entity.roles,
            chart_count: entity.charts.len(),
            charts: &entity.charts,
        })
    }
}

impl Record for Dashboard {
    fn id(&self) -> i64 {
        self.id
    }

    fn uuid(&self) -> Option<Uuid> {
        self.uuid
    }

    fn slug(&self) -> Option<&str> {
        self.slug.as_deref()
    }

    fn attribute(&self, column: &str) -> Option<Value> {
        let value = match column {
            "id" => json!(self.id),
            "uuid" => self.uuid.map(|u| json!(u)).unwrap_or(Value::Null),
            "dashboard_title" => opt_str(&self.dashboard_title),
            "slug" => opt_str(&self.slug),
            "url" => opt_str(&self.url),
            "published" => json!(self.published),
            "certified_by" => opt_str(&self.certified_by),
            "changed_by_name" => opt_str(&self.changed_by_name),
            "changed_on" => timestamp_value(&self.changed_on),
            "created_by_name" => opt_str(&self.created_by_name),
            "created_on" => timestamp_value(&self.created_on),
            _ => return None,
        };
        Some(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::default_columns;
    use chrono::TimeZone;

    fn sample() -> Dashboard {
        let mut d = Dashboard::new(7, "Sales");
        d.slug = Some("sales".into());
        d.published = true;
        d.changed_on = Some(Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap());
        d.charts = vec![ChartSummary {
            id: 11,
            slice_name: Some("Revenue".into()),
            viz_type: Some("line".into()),
            url: None,
            uuid: None,
        }];
        d
    }

    #[test]
    fn test_list_projection_uses_requested_columns() {
        let cols = vec!["id".to_string(), "slug".to_string()];
        let item = DashboardResource::serialize_list(&sample(), &cols).unwrap();
        assert_eq!(item, json!({"id": 7, "slug": "sales"}));
    }

    #[test]
    fn test_default_projection() {
        let item = DashboardResource::serialize_list(&sample(), &default_columns::<DashboardResource>()).unwrap();
        let obj = item.as_object().unwrap();
        assert_eq!(obj.len(), DashboardResource::DEFAULT_COLUMNS.len());
        assert_eq!(obj["changed_on"], json!("2024-05-01T08:00:00+00:00"));
        assert_eq!(obj["created_on"], Value::Null);
    }

    #[test]
    fn test_missing_title_serializes_as_untitled() {
        let mut d = sample();
        d.dashboard_title = None;
        let item = DashboardResource::serialize_list(&d, &["dashboard_title".to_string()]).unwrap();
        assert_eq!(item["dashboard_title"], "Untitled");
    }

    #[test]
    fn test_detail_includes_chart_summaries() {
        let detail = DashboardResource::serialize_detail(&sample()).unwrap();
        assert_eq!(detail["chart_count"], 1);
        assert_eq!(detail["charts"][0]["slice_name"], "Revenue");
        assert_eq!(detail["roles"], json!([]));
    }

    #[test]
    fn test_vocabulary_covers_projection_defaults() {
        for column in DashboardResource::DEFAULT_COLUMNS {
            assert!(DashboardResource::vocabulary().is_projectable(column), "{}", column);
        }
    }
}
