//! Filter Vocabulary - Allowed Columns and Operators per Resource
//!
//! Each resource publishes which columns may be filtered, which operators
//! each column accepts, and which columns may be projected into list items.
//! Filter clauses coming from clients are validated against the vocabulary
//! before a DAO ever sees them.
//!
//! # Wire shape
//!
//! ```json
//! {"column": "dashboard_title", "operator": "sw", "value": "Sales"}
//! ```
//!
//! The legacy `{"col", "opr", "value"}` spelling is accepted on input and
//! always echoed back in the canonical form.

use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

// =============================================================================
// Operators
// =============================================================================

/// Filter operators (closed enumeration).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    In,
    #[serde(alias = "not_in")]
    Nin,
    Sw,
    Ew,
    Like,
    Ilike,
    IsNull,
    IsNotNull,
}

impl Operator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Eq => "eq",
            Operator::Ne => "ne",
            Operator::Gt => "gt",
            Operator::Gte => "gte",
            Operator::Lt => "lt",
            Operator::Lte => "lte",
            Operator::In => "in",
            Operator::Nin => "nin",
            Operator::Sw => "sw",
            Operator::Ew => "ew",
            Operator::Like => "like",
            Operator::Ilike => "ilike",
            Operator::IsNull => "is_null",
            Operator::IsNotNull => "is_not_null",
        }
    }

    /// Ordered comparisons, valid only on ordered column types.
    pub fn is_ordering(&self) -> bool {
        matches!(self, Operator::Gt | Operator::Gte | Operator::Lt | Operator::Lte)
    }

    pub fn is_membership(&self) -> bool {
        matches!(self, Operator::In | Operator::Nin)
    }

    /// Text-only pattern operators.
    pub fn is_text_match(&self) -> bool {
        matches!(self, Operator::Sw | Operator::Ew | Operator::Like | Operator::Ilike)
    }

    pub fn is_null_test(&self) -> bool {
        matches!(self, Operator::IsNull | Operator::IsNotNull)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operator sets shared by the resource vocabularies.
pub mod ops {
    use super::Operator::{self, *};

    pub const TEXT: &[Operator] = &[Eq, Ne, In, Nin, Sw, Ew, Like, Ilike, IsNull, IsNotNull];
    pub const ENUM_TEXT: &[Operator] = &[Eq, Ne, In, Nin];
    pub const NUMBER: &[Operator] = &[Eq, Ne, Gt, Gte, Lt, Lte, In, Nin];
    pub const DATETIME: &[Operator] = &[Gt, Gte, Lt, Lte, IsNull, IsNotNull];
    pub const BOOLEAN: &[Operator] = &[Eq, Ne];
    pub const IDENTITY: &[Operator] = &[Eq, Ne, In, Nin];
}

// =============================================================================
// Column Types
// =============================================================================

/// Value type of a filterable column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    Text,
    Integer,
    Float,
    Boolean,
    Datetime,
    Uuid,
}

impl ColumnType {
    pub fn is_ordered(&self) -> bool {
        matches!(self, ColumnType::Integer | ColumnType::Float | ColumnType::Datetime)
    }

    /// Whether a single scalar JSON value is acceptable for this type.
    fn accepts(&self, value: &Value) -> bool {
        match (self, value) {
            (ColumnType::Text, Value::String(_)) => true,
            (ColumnType::Integer, Value::Number(n)) => n.is_i64() || n.is_u64(),
            (ColumnType::Float, Value::Number(_)) => true,
            (ColumnType::Boolean, Value::Bool(_)) => true,
            (ColumnType::Datetime, Value::String(s)) => parse_datetime_literal(s),
            (ColumnType::Uuid, Value::String(s)) => Uuid::parse_str(s).is_ok(),
            _ => false,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            ColumnType::Text => "text",
            ColumnType::Integer => "integer",
            ColumnType::Float => "number",
            ColumnType::Boolean => "boolean",
            ColumnType::Datetime => "RFC 3339 timestamp or YYYY-MM-DD date",
            ColumnType::Uuid => "UUID",
        }
    }
}

fn canonical_uuid(value: Value) -> Value {
    match value {
        Value::String(text) => match Uuid::parse_str(&text) {
            Ok(uuid) => Value::String(uuid.hyphenated().to_string()),
            Err(_) => Value::String(text),
        },
        Value::Array(items) => Value::Array(items.into_iter().map(canonical_uuid).collect()),
        other => other,
    }
}

fn parse_datetime_literal(s: &str) -> bool {
    DateTime::parse_from_rfc3339(s).is_ok() || NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok()
}

// =============================================================================
// Filter Clauses
// =============================================================================

/// One `(column, operator, value)` triple.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FilterClause {
    #[serde(alias = "col")]
    pub column: String,

    #[serde(alias = "opr")]
    pub operator: Operator,

    #[serde(default)]
    pub value: Value,
}

impl FilterClause {
    pub fn new(column: impl Into<String>, operator: Operator, value: Value) -> Self {
        Self {
            column: column.into(),
            operator,
            value,
        }
    }
}

/// Filters as supplied by a client: a JSON-encoded string or a sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FiltersInput {
    Text(String),
    Clauses(Vec<FilterClause>),
}

impl FiltersInput {
    /// Decode text input into clauses. Does not validate against a vocabulary.
    pub fn into_clauses(self) -> Result<Vec<FilterClause>, FilterError> {
        match self {
            FiltersInput::Clauses(clauses) => Ok(clauses),
            FiltersInput::Text(text) => serde_json::from_str::<Vec<FilterClause>>(text.trim())
                .map_err(|e| FilterError::Malformed(format!("filters is not a valid JSON filter list: {}", e))),
        }
    }
}

// =============================================================================
// Vocabulary
// =============================================================================

/// Published description of one filterable column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSpec {
    #[serde(rename = "type")]
    pub column_type: ColumnType,

    pub description: String,

    pub operators: Vec<Operator>,

    /// Fixed set of admissible values, when the column is enumerated
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<Value>>,
}

/// Filterable columns and projectable columns for one resource.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterVocabulary {
    columns: BTreeMap<String, ColumnSpec>,
    projectable: Vec<String>,
}

impl FilterVocabulary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a filterable column.
    pub fn column(
        mut self,
        name: &str,
        column_type: ColumnType,
        description: &str,
        operators: &[Operator],
    ) -> Self {
        self.columns.insert(
            name.to_string(),
            ColumnSpec {
                column_type,
                description: description.to_string(),
                operators: operators.to_vec(),
                values: None,
            },
        );
        self
    }

    /// Declare an enumerated column with a fixed value set.
    pub fn enumerated(
        mut self,
        name: &str,
        description: &str,
        operators: &[Operator],
        values: &[&str],
    ) -> Self {
        self.columns.insert(
            name.to_string(),
            ColumnSpec {
                column_type: ColumnType::Text,
                description: description.to_string(),
                operators: operators.to_vec(),
                values: Some(values.iter().map(|v| Value::String(v.to_string())).collect()),
            },
        );
        self
    }

    /// Declare the columns a client may select into list items.
    pub fn projectable(mut self, columns: &[&str]) -> Self {
        self.projectable = columns.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn get(&self, column: &str) -> Option<&ColumnSpec> {
        self.columns.get(column)
    }

    pub fn columns(&self) -> &BTreeMap<String, ColumnSpec> {
        &self.columns
    }

    pub fn projectable_columns(&self) -> &[String] {
        &self.projectable
    }

    pub fn is_projectable(&self, column: &str) -> bool {
        self.projectable.iter().any(|c| c == column)
    }

    /// Union of all column-specific operators.
    pub fn operators(&self) -> BTreeSet<Operator> {
        self.columns
            .values()
            .flat_map(|spec| spec.operators.iter().copied())
            .collect()
    }

    /// Validate one clause: known column, allowed operator, well-typed value.
    pub fn validate(&self, clause: &FilterClause) -> Result<(), FilterError> {
        let spec = self
            .columns
            .get(&clause.column)
            .ok_or_else(|| FilterError::UnknownColumn {
                column: clause.column.clone(),
            })?;

        let op = clause.operator;
        if !spec.operators.contains(&op) {
            return Err(FilterError::OperatorNotAllowed {
                column: clause.column.clone(),
                operator: op,
            });
        }
        if op.is_ordering() && !spec.column_type.is_ordered() {
            return Err(FilterError::OperatorNotAllowed {
                column: clause.column.clone(),
                operator: op,
            });
        }
        if op.is_text_match() && spec.column_type != ColumnType::Text {
            return Err(FilterError::OperatorNotAllowed {
                column: clause.column.clone(),
                operator: op,
            });
        }

        if op.is_null_test() {
            return Ok(());
        }

        let invalid = |reason: String| FilterError::InvalidValue {
            column: clause.column.clone(),
            operator: op,
            reason,
        };

        if op.is_membership() {
            let items = clause
                .value
                .as_array()
                .ok_or_else(|| invalid("expected a list of values".to_string()))?;
            if items.is_empty() {
                return Err(invalid("value list must not be empty".to_string()));
            }
            for item in items {
                self.check_scalar(spec, item).map_err(&invalid)?;
            }
            return Ok(());
        }

        if op.is_text_match() {
            // Patterns are free text; fixed value sets do not apply.
            return match clause.value {
                Value::String(_) => Ok(()),
                _ => Err(invalid("expected a text pattern".to_string())),
            };
        }

        self.check_scalar(spec, &clause.value).map_err(invalid)
    }

    /// Validate every clause, failing on the first invalid one.
    pub fn validate_all(&self, clauses: &[FilterClause]) -> Result<(), FilterError> {
        clauses.iter().try_for_each(|clause| self.validate(clause))
    }

    /// Validate every clause and rewrite values into the spelling stored
    /// entities use: UUIDs become lowercase hyphenated text.
    pub fn normalize_all(&self, clauses: Vec<FilterClause>) -> Result<Vec<FilterClause>, FilterError> {
        self.validate_all(&clauses)?;
        Ok(clauses
            .into_iter()
            .map(|mut clause| {
                if let Some(ColumnType::Uuid) = self.columns.get(&clause.column).map(|s| s.column_type) {
                    clause.value = canonical_uuid(clause.value);
                }
                clause
            })
            .collect())
    }

    fn check_scalar(&self, spec: &ColumnSpec, value: &Value) -> Result<(), String> {
        if !spec.column_type.accepts(value) {
            return Err(format!("expected {}, got {}", spec.column_type.label(), value));
        }
        if let Some(allowed) = &spec.values {
            if !allowed.contains(value) {
                return Err(format!("{} is not one of the allowed values", value));
            }
        }
        Ok(())
    }

    /// Payload of the available-filters tools.
    pub fn describe(&self) -> AvailableFilters {
        AvailableFilters {
            filters: self.columns.clone(),
            operators: self.operators().into_iter().collect(),
            columns: self.projectable.clone(),
        }
    }
}

/// `{ filters, operators, columns }` as returned to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvailableFilters {
    pub filters: BTreeMap<String, ColumnSpec>,
    pub operators: Vec<Operator>,
    pub columns: Vec<String>,
}

// =============================================================================
// Errors
// =============================================================================

/// Filter validation failures. Always surfaced as `validation_error`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FilterError {
    #[error("unknown filter column '{column}'")]
    UnknownColumn { column: String },

    #[error("operator '{operator}' is not allowed on column '{column}'")]
    OperatorNotAllowed { column: String, operator: Operator },

    #[error("invalid value for '{column}' {operator}: {reason}")]
    InvalidValue {
        column: String,
        operator: Operator,
        reason: String,
    },

    #[error("{0}")]
    Malformed(String),
}

// =============================================================================
// Tests
// =============================================================================
