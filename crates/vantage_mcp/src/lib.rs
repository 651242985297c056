//! MCP (Model Context Protocol) tool dispatcher for dashboards, charts and datasets
//!
//! Exposes a BI application's core entities to model clients as a fixed set
//! of read-only tools. Three generic engines (list, get-info,
//! available-filters) are parameterized per resource with a DAO, a filter
//! vocabulary and serializers, so adding a resource is a matter of
//! declaring one [`resource::Resource`] impl.
//!
//! # Architecture
//!
//! ```text
//!   model client
//!        │  JSON-RPC over stdio
//!        ▼
//!   server ──► registry ──► tool (validate ► auth hook ► engine)
//!                                                      │
//!                                   DAO ◄──────────────┘
//!                                    │
//!                      serializer ► envelope ► output budget ► client
//! ```
//!
//! # Guarantees
//!
//! - Every request is validated before the auth hook runs, and the auth hook
//!   runs before any DAO call. Engines take an [`auth::Authorized`] proof.
//! - Every failure a client sees is either a success payload or an
//!   [`error::ErrorEnvelope`] with a type from a closed set. The one
//!   exception is an unknown tool name, rejected at the protocol layer.
//! - The registry and vocabularies are built once at startup and are
//!   read-only afterwards.

pub mod auth;
pub mod config;
pub mod dao;
pub mod envelope;
pub mod error;
pub mod filters;
pub mod identifier;
pub mod memory;
pub mod protocol;
pub mod resource;
pub mod resources;
pub mod security;
pub mod server;
pub mod tools;

pub use auth::{AllowAll, ApiKeyAuth, AuthDecision, AuthHook, CallerIdentity};
pub use config::McpServerConfig;
pub use dao::{DaoError, ListQuery, ModelDao};
pub use envelope::ListEnvelope;
pub use error::{ErrorEnvelope, ErrorType, ToolError};
pub use memory::{Catalog, MemoryDao};
pub use server::McpServer;
pub use tools::{create_default_registry, ListLimits, ResourceDaos, ToolRegistry, ToolResponse};
