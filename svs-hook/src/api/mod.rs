//! HTTP API handlers for svs-hook

pub mod admin;
pub mod auth;
pub mod health;
pub mod webhook;

pub use admin::{classify_preview, import_workbook, list_audit, snapshot_summary};
pub use auth::admin_auth;
pub use health::health_routes;
pub use webhook::process_message;
