//! Read-only REST API

use std::sync::Arc;

use aegis_common::{AccountId, AegisError, ErrorKind};
use aegis_identity::IdentityOracle;
use axum::{
    extract::{Path, State},
    http::{header, Method, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde_json::{json, Value};
use tower_http::cors::{Any, CorsLayer};

use crate::coordinator::AegisCore;

/// Error body: `{"error": CODE, "kind": KIND, "message": ...}`
#[derive(Debug)]
pub struct ApiError(AegisError);

impl From<AegisError> for ApiError {
    fn from(err: AegisError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.0.kind() {
            ErrorKind::Authorization => StatusCode::FORBIDDEN,
            ErrorKind::Verification | ErrorKind::Input => StatusCode::BAD_REQUEST,
            ErrorKind::Precondition | ErrorKind::State | ErrorKind::TemporalGate => StatusCode::CONFLICT,
            ErrorKind::Infrastructure => StatusCode::SERVICE_UNAVAILABLE,
        };
        let body = json!({
            "error": self.0.code(),
            "kind": self.0.kind().to_string(),
            "message": self.0.to_string(),
        });
        (status, Json(body)).into_response()
    }
}

type ApiResult = std::result::Result<Json<Value>, ApiError>;

/// Build the router
pub fn create_rest_api(core: Arc<AegisCore>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT]);

    Router::new()
        .route("/health", get(health))
        .route("/api/v1/state", get(risk_state))
        .route("/api/v1/accounts/:id/position", get(position))
        .route("/api/v1/accounts/:id/health", get(health_factor))
        .route("/api/v1/accounts/:id/badge", get(badge))
        .route("/api/v1/backstop", get(backstop))
        .layer(cors)
        .with_state(core)
}

async fn health() -> Json<Value> {
    Json(json!({"status": "healthy", "version": crate::NODE_VERSION}))
}

pub async fn risk_state(State(core): State<Arc<AegisCore>>) -> Json<Value> {
    let record = core.sentinel().record();
    Json(json!({
        "state": record.state,
        "version": record.version,
        "last_update_proof": record.last_update_proof,
    }))
}

pub async fn position(State(core): State<Arc<AegisCore>>, Path(id): Path<String>) -> ApiResult {
    let account = AccountId::new(id);
    let summary = core.market().position_summary(&account)?;
    let status = core.backstop().position_status(&account);
    Ok(Json(json!({
        "position": summary,
        "status": status,
    })))
}

pub async fn health_factor(State(core): State<Arc<AegisCore>>, Path(id): Path<String>) -> ApiResult {
    let account = AccountId::new(id);
    let hf = core.market().health_factor(&account)?;
    let position = core.market().position(&account);
    Ok(Json(json!({
        "account": account,
        "health_factor": if position.has_debt() { Some(hf) } else { None },
        "liquidatable": hf < aegis_common::MIN_HEALTH_FACTOR,
    })))
}

pub async fn badge(State(core): State<Arc<AegisCore>>, Path(id): Path<String>) -> Json<Value> {
    let account = AccountId::new(id);
    let badge = core.identity().badge_of(&account);
    Json(json!({
        "account": account,
        "badge": badge,
        "label": badge.label(),
        "parameters": core.identity().risk_parameters_of(&account),
    }))
}

pub async fn backstop(State(core): State<Arc<AegisCore>>) -> Json<Value> {
    let routed: Vec<Value> = core
        .backstop()
        .routed_orders()
        .into_iter()
        .map(|(account, order_id)| json!({"account": account, "order_id": order_id}))
        .collect();
    Json(json!({
        "stats": core.backstop().stats(),
        "pool": core.market().pool_stats(),
        "routed_orders": routed,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AegisConfig;
    use crate::coordinator::CoreDeps;
    use aegis_backstop::RecordingVenue;
    use aegis_common::{Badge, ManualClock};
    use aegis_sentinel::{AcceptAllVerifier, MemoryStateStore};
    use rust_decimal_macros::dec;

    fn core() -> Arc<AegisCore> {
        let mut config = AegisConfig::default();
        config.sentinel.accept_all_proofs = true;
        let deps = CoreDeps {
            clock: Arc::new(ManualClock::new(0)),
            verifier: Arc::new(AcceptAllVerifier),
            store: Arc::new(MemoryStateStore::new()),
            venue: Arc::new(RecordingVenue::new()),
        };
        Arc::new(AegisCore::new(&config, deps).unwrap())
    }

    #[tokio::test]
    async fn test_state_endpoint() {
        let Json(body) = risk_state(State(core())).await;
        assert_eq!(body["state"], "NORMAL");
        assert_eq!(body["version"], 0);
    }

    #[tokio::test]
    async fn test_badge_endpoint() {
        let core = core();
        core.identity().assign_badge(AccountId::from("0xwhale"), Badge::Whale);
        let Json(body) = badge(State(core), Path("0xwhale".to_string())).await;
        assert_eq!(body["badge"], "WHALE");
        assert_eq!(body["parameters"]["grace_period_secs"], 1800);
    }

    #[tokio::test]
    async fn test_health_endpoint_without_debt() {
        let core = core();
        core.market().deposit_collateral(&AccountId::from("0xuser"), dec!(1)).unwrap();
        let Json(body) = health_factor(State(core), Path("0xuser".to_string())).await.unwrap();
        assert!(body["health_factor"].is_null());
        assert_eq!(body["liquidatable"], false);
    }

    #[test]
    fn test_error_status_mapping() {
        let response = ApiError(AegisError::Oracle("down".to_string())).into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let response = ApiError(AegisError::InvalidAmount).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
