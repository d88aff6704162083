/**
 * API REST DEVWATCH - Routes HTTP du kernel
 *
 * RÔLE :
 * Point d'entrée des snapshots envoyés par les agents et lecture des partitions.
 *
 * ROUTES :
 * - POST /api/device-info        : validation identité → résolution partition → upsert
 * - GET  /getCollections         : liste brute des partitions du backend
 * - GET  /fetchData?collection=  : contenu complet d'une partition
 * - GET  /config                 : section `server` de la config
 * - GET  /health, /system/health : sondes
 *
 * ERREURS :
 * Toutes les erreurs backend sont loggées ici puis converties en réponse JSON
 * générique `{ "error": ... }`. Aucun retry.
 */

use crate::config::{KernelConfig, ServerConf};
use crate::health::{HealthTracker, KernelHealth};
use crate::store::{Storage, StoreError};
use crate::validator::{self, ValidationError};
use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, error, info};

#[derive(Clone)]
pub struct AppState {
    pub cfg: Arc<KernelConfig>,
    pub storage: Storage,
    pub health: HealthTracker,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Username is required")]
    MissingIdentity,
    #[error("invalid JSON payload: {0}")]
    InvalidPayload(String),
    #[error("{0} is required")]
    MissingQueryParameter(&'static str),
    #[error("write failed: {0}")]
    WriteFailed(#[source] StoreError),
    #[error("{context}: {source}")]
    ReadFailed {
        context: &'static str,
        #[source]
        source: StoreError,
    },
}

impl From<ValidationError> for ApiError {
    fn from(e: ValidationError) -> Self {
        match e {
            ValidationError::MissingIdentity => ApiError::MissingIdentity,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::MissingIdentity => (StatusCode::BAD_REQUEST, self.to_string()),
            ApiError::InvalidPayload(_) => (StatusCode::BAD_REQUEST, "Invalid JSON payload".to_string()),
            ApiError::MissingQueryParameter(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            ApiError::WriteFailed(e) => {
                error!("Error saving metrics: {e}");
                (StatusCode::INTERNAL_SERVER_ERROR, "Failed to save metrics".to_string())
            }
            ApiError::ReadFailed { context, source } => {
                error!("{context}: {source}");
                (StatusCode::INTERNAL_SERVER_ERROR, context.to_string())
            }
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[derive(Debug, Deserialize)]
struct FetchParams {
    collection: Option<String>,
}

pub fn build_router(app_state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/system/health", get(get_system_health))
        .route("/config", get(get_config))
        .route("/api/device-info", post(ingest_snapshot))
        .route("/getCollections", get(list_collections))
        .route("/fetchData", get(fetch_data))
        .with_state(app_state)
}

// POST /api/device-info
async fn ingest_snapshot(
    State(app): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let Json(payload) = payload.map_err(|e| ApiError::InvalidPayload(e.body_text()))?;
    let identity = validator::validate(&payload)?;

    info!("Received real-time metrics for user: {identity}");

    let handle = app.storage.resolver.resolve(&identity);
    let stored = app
        .storage
        .snapshots
        .upsert(&handle, &identity, payload)
        .await
        .map_err(ApiError::WriteFailed)?;
    app.health.record_ingest();
    debug!("snapshot {} stored in {}", stored.id, handle.name());

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Metrics updated successfully" })),
    ))
}

// GET /getCollections
async fn list_collections(State(app): State<AppState>) -> Result<Json<Vec<String>>, ApiError> {
    let names = app
        .storage
        .catalog
        .list_partitions()
        .await
        .map_err(|source| ApiError::ReadFailed { context: "Error fetching collections", source })?;
    debug!("Collections fetched: {names:?}");
    Ok(Json(names))
}

// GET /fetchData?collection=<name>
async fn fetch_data(
    State(app): State<AppState>,
    Query(params): Query<FetchParams>,
) -> Result<Json<Vec<Value>>, ApiError> {
    let collection = params
        .collection
        .filter(|c| !c.is_empty())
        .ok_or(ApiError::MissingQueryParameter("Collection name"))?;

    let records = app
        .storage
        .partitions
        .read_partition(&collection)
        .await
        .map_err(|source| ApiError::ReadFailed { context: "Error fetching data", source })?;
    Ok(Json(records))
}

// GET /config
async fn get_config(State(app): State<AppState>) -> Json<ServerConf> {
    Json(app.cfg.server.clone())
}

// GET /system/health
async fn get_system_health(State(app): State<AppState>) -> Json<KernelHealth> {
    Json(app.health.get_health(&app.storage).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::test_support::temp_storage;
    use crate::store::{with_connection, DbPool};
    use devwatch_devkit::{KernelClient, SnapshotBuilder};
    use tempfile::TempDir;
    use tokio::net::TcpListener;

    struct TestKernel {
        client: KernelClient,
        pool: DbPool,
        _dir: TempDir,
    }

    async fn spawn_kernel() -> TestKernel {
        let (storage, pool, dir) = temp_storage();
        let state = AppState {
            cfg: Arc::new(KernelConfig::default()),
            storage,
            health: HealthTracker::new(),
        };
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, build_router(state)).await.unwrap();
        });
        TestKernel {
            client: KernelClient::new(format!("http://{addr}")).unwrap(),
            pool,
            _dir: dir,
        }
    }

    #[tokio::test]
    async fn test_concrete_scenario() {
        let kernel = spawn_kernel().await;

        let resp = kernel.client.ingest(&SnapshotBuilder::alice().build()).await.unwrap();
        assert_eq!(resp.status, 201);
        assert_eq!(resp.body, json!({"message": "Metrics updated successfully"}));

        let names = kernel.client.partition_names().await.unwrap();
        assert!(names.contains(&"alice_metrics".to_string()));

        let resp = kernel.client.fetch_data(Some("alice_metrics")).await.unwrap();
        assert_eq!(resp.status, 200);
        let records = resp.body.as_array().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["FirewallStatus"], json!("on"));
        assert_eq!(records[0]["Username"], json!("alice"));
    }

    #[tokio::test]
    async fn test_missing_identity_is_400_and_writes_nothing() {
        let kernel = spawn_kernel().await;

        for payload in [
            SnapshotBuilder::alice().without("Username").build(),
            SnapshotBuilder::alice().set_field("Username", json!("")).build(),
        ] {
            let resp = kernel.client.ingest(&payload).await.unwrap();
            assert_eq!(resp.status, 400);
            assert_eq!(resp.body, json!({"error": "Username is required"}));
        }

        let names = kernel.client.partition_names().await.unwrap();
        assert!(names.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_json_is_400() {
        let kernel = spawn_kernel().await;
        let resp = kernel.client.ingest_raw("{not json").await.unwrap();
        assert_eq!(resp.status, 400);
        assert_eq!(resp.body, json!({"error": "Invalid JSON payload"}));
    }

    #[tokio::test]
    async fn test_schema_violation_is_500() {
        let kernel = spawn_kernel().await;
        let payload = SnapshotBuilder::new("frank").without("MemoryUsage").build();

        let resp = kernel.client.ingest(&payload).await.unwrap();
        assert_eq!(resp.status, 500);
        assert_eq!(resp.body, json!({"error": "Failed to save metrics"}));
    }

    #[tokio::test]
    async fn test_backend_rejection_is_500() {
        let kernel = spawn_kernel().await;
        let resp = kernel.client.ingest(&SnapshotBuilder::new("sqlite_x").build()).await.unwrap();
        assert_eq!(resp.status, 500);
        assert_eq!(resp.body, json!({"error": "Failed to save metrics"}));
    }

    #[tokio::test]
    async fn test_case_variant_identity_is_500() {
        let kernel = spawn_kernel().await;
        assert_eq!(kernel.client.ingest(&SnapshotBuilder::alice().build()).await.unwrap().status, 201);

        let resp = kernel.client.ingest(&SnapshotBuilder::new("Alice").build()).await.unwrap();
        assert_eq!(resp.status, 500);
        assert_eq!(resp.body, json!({"error": "Failed to save metrics"}));

        let names = kernel.client.partition_names().await.unwrap();
        assert_eq!(names, vec!["alice_metrics".to_string()]);
        let resp = kernel.client.fetch_data(Some("alice_metrics")).await.unwrap();
        assert_eq!(resp.body.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_repeat_ingest_keeps_single_record() {
        let kernel = spawn_kernel().await;
        let first = SnapshotBuilder::new("gina").set_field("FirewallStatus", json!("Active")).build();
        let second = SnapshotBuilder::new("gina").set_field("FirewallStatus", json!("Inactive")).build();

        assert_eq!(kernel.client.ingest(&first).await.unwrap().status, 201);
        assert_eq!(kernel.client.ingest(&second).await.unwrap().status, 201);

        let resp = kernel.client.fetch_data(Some("gina_metrics")).await.unwrap();
        let records = resp.body.as_array().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["FirewallStatus"], json!("Inactive"));
    }

    #[tokio::test]
    async fn test_fetch_requires_collection() {
        let kernel = spawn_kernel().await;
        for collection in [None, Some("")] {
            let resp = kernel.client.fetch_data(collection).await.unwrap();
            assert_eq!(resp.status, 400);
            assert_eq!(resp.body, json!({"error": "Collection name is required"}));
        }
    }

    #[tokio::test]
    async fn test_fetch_unknown_collection_is_empty() {
        let kernel = spawn_kernel().await;
        let resp = kernel.client.fetch_data(Some("nobody_metrics")).await.unwrap();
        assert_eq!(resp.status, 200);
        assert_eq!(resp.body, json!([]));
    }

    #[tokio::test]
    async fn test_unreadable_collection_is_500() {
        let kernel = spawn_kernel().await;
        with_connection(&kernel.pool, |conn| {
            conn.execute_batch("CREATE TABLE legacy (x INTEGER)")?;
            Ok(())
        })
        .await
        .unwrap();

        let resp = kernel.client.fetch_data(Some("legacy")).await.unwrap();
        assert_eq!(resp.status, 500);
        assert_eq!(resp.body, json!({"error": "Error fetching data"}));
    }

    #[tokio::test]
    async fn test_config_and_health_endpoints() {
        let kernel = spawn_kernel().await;

        let resp = kernel.client.config().await.unwrap();
        assert_eq!(resp.status, 200);
        assert_eq!(resp.body, json!({"ip": "0.0.0.0", "port": 3000}));

        let resp = kernel.client.health().await.unwrap();
        assert_eq!(resp.status, 200);
        assert_eq!(resp.body, json!("ok"));

        kernel.client.ingest(&SnapshotBuilder::new("hugo").build()).await.unwrap();
        let resp = kernel.client.system_health().await.unwrap();
        assert_eq!(resp.status, 200);
        assert_eq!(resp.body["partitions_tracked"], json!(1));
        assert_eq!(resp.body["snapshots_received"], json!(1));
        assert_eq!(resp.body["storage_status"], json!("ok"));
    }
}
