//! svs-hook library - SMS serial validation service
//!
//! Receives inbound SMS webhooks, classifies the serial number in the message
//! body against the published range table, records an audit entry and replies
//! through the configured notifier. Admin routes import new workbooks and
//! inspect the current state.

use std::sync::Arc;

use axum::Router;
use svs_common::config::ServiceConfig;
use svs_common::{Classifier, ImportPipeline, SerialStore, SnapshotCell};
use tower_http::trace::TraceLayer;

pub mod api;
pub mod cli;
pub mod error;
pub mod notifier;

use notifier::Notifier;

/// Largest accepted workbook upload
pub const IMPORT_BODY_LIMIT: usize = 32 * 1024 * 1024;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub classifier: Classifier,
    pub pipeline: Arc<ImportPipeline>,
    pub store: Arc<dyn SerialStore>,
    pub notifier: Arc<dyn Notifier>,
    /// Webhook path secret; empty disables the webhook
    pub callback_token: Arc<str>,
    /// Admin bearer token; empty disables admin auth
    pub admin_token: Arc<str>,
}

impl AppState {
    /// Wire the classifier and import pipeline around one shared snapshot
    pub fn new(
        config: &ServiceConfig,
        snapshot: SnapshotCell,
        store: Arc<dyn SerialStore>,
        notifier: Arc<dyn Notifier>,
    ) -> svs_common::Result<Self> {
        let normalizer = Arc::new(config.normalizer()?);

        Ok(Self {
            classifier: Classifier::new(normalizer.clone(), snapshot.clone()),
            pipeline: Arc::new(ImportPipeline::new(normalizer, snapshot, store.clone())),
            store,
            notifier,
            callback_token: Arc::from(config.callback_token.as_str()),
            admin_token: Arc::from(config.admin_token.as_str()),
        })
    }
}

/// Build application router
///
/// Health and webhook routes are public (the webhook is guarded by its path
/// token). Everything under `/api` requires the admin bearer token.
pub fn build_router(state: AppState) -> Router {
    use axum::extract::DefaultBodyLimit;
    use axum::middleware;
    use axum::routing::{get, post};

    let admin = Router::new()
        .route(
            "/api/import",
            post(api::import_workbook).layer(DefaultBodyLimit::max(IMPORT_BODY_LIMIT)),
        )
        .route("/api/audit", get(api::list_audit))
        .route("/api/classify", get(api::classify_preview))
        .route("/api/snapshot", get(api::snapshot_summary))
        .layer(middleware::from_fn_with_state(state.clone(), api::admin_auth));

    let public = Router::new()
        .route("/v1/:token/process", post(api::process_message))
        .merge(api::health_routes());

    Router::new()
        .merge(admin)
        .merge(public)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
