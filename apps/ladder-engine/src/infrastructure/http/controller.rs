//! HTTP Controller (Driver Adapter)
//!
//! Axum-based REST API that delegates to application use cases.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use chrono::Utc;

use crate::application::dto::AddInstrumentDto;
use crate::application::ports::{AdvisorPort, BrokerGateway, InstrumentStore};
use crate::application::use_cases::{AskAdvisorUseCase, LadderEngine, ManageInstrumentsUseCase};
use crate::domain::ladder::LadderError;

use super::request::{AddInstrumentRequest, AdvisorRequest, SelectionRequest};
use super::response::{AdvisorResponse, ErrorResponse, HealthResponse};

/// Application state shared across handlers.
pub struct AppState<B, S, A>
where
    B: BrokerGateway,
    S: InstrumentStore,
    A: AdvisorPort,
{
    /// Engine, for on-demand reconciliation and tick counts.
    pub engine: Arc<LadderEngine<B, S>>,
    /// Use case for adding, toggling and removing instruments.
    pub manage: Arc<ManageInstrumentsUseCase<B, S>>,
    /// Use case for the advisory chat.
    pub advisor: Arc<AskAdvisorUseCase<A>>,
    /// Application version.
    pub version: String,
}

impl<B, S, A> AppState<B, S, A>
where
    B: BrokerGateway,
    S: InstrumentStore,
    A: AdvisorPort,
{
    /// Wire the use cases around a shared engine.
    pub fn new(engine: Arc<LadderEngine<B, S>>, advisor: Arc<A>, version: impl Into<String>) -> Self {
        Self {
            manage: Arc::new(ManageInstrumentsUseCase::new(Arc::clone(&engine))),
            advisor: Arc::new(AskAdvisorUseCase::new(advisor)),
            engine,
            version: version.into(),
        }
    }
}

impl<B, S, A> Clone for AppState<B, S, A>
where
    B: BrokerGateway,
    S: InstrumentStore,
    A: AdvisorPort,
{
    fn clone(&self) -> Self {
        Self {
            engine: Arc::clone(&self.engine),
            manage: Arc::clone(&self.manage),
            advisor: Arc::clone(&self.advisor),
            version: self.version.clone(),
        }
    }
}

/// Create the HTTP router with all endpoints.
pub fn create_router<B, S, A>(state: AppState<B, S, A>) -> Router
where
    B: BrokerGateway + 'static,
    S: InstrumentStore + 'static,
    A: AdvisorPort + 'static,
{
    Router::new()
        .route("/health", get(health_check))
        .route("/api/v1/instruments", get(list_instruments).post(add_instrument))
        .route("/api/v1/instruments/toggle", post(toggle_instruments))
        .route("/api/v1/instruments/remove", post(remove_instruments))
        .route("/api/v1/reconcile", post(reconcile))
        .route("/api/v1/advisor", post(ask_advisor))
        .with_state(state)
}

/// Health check endpoint.
async fn health_check<B, S, A>(State(state): State<AppState<B, S, A>>) -> impl IntoResponse
where
    B: BrokerGateway,
    S: InstrumentStore,
    A: AdvisorPort,
{
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: state.version.clone(),
        ticks: state.engine.tick_count(),
    })
}

/// Current ladder snapshot.
async fn list_instruments<B, S, A>(State(state): State<AppState<B, S, A>>) -> impl IntoResponse
where
    B: BrokerGateway,
    S: InstrumentStore,
    A: AdvisorPort,
{
    Json(state.manage.list())
}

/// Start tracking an instrument.
async fn add_instrument<B, S, A>(
    State(state): State<AppState<B, S, A>>,
    Json(request): Json<AddInstrumentRequest>,
) -> impl IntoResponse
where
    B: BrokerGateway,
    S: InstrumentStore,
    A: AdvisorPort,
{
    let dto = AddInstrumentDto::from(request);
    match state.manage.add(&dto).await {
        Ok(view) => (StatusCode::CREATED, Json(view)).into_response(),
        Err(e) => {
            tracing::info!(symbol = %dto.symbol, error = %e, "Add instrument rejected");
            (StatusCode::BAD_REQUEST, Json(error_response(&e))).into_response()
        }
    }
}

/// Flip active/inactive for the selected instruments.
async fn toggle_instruments<B, S, A>(
    State(state): State<AppState<B, S, A>>,
    Json(request): Json<SelectionRequest>,
) -> impl IntoResponse
where
    B: BrokerGateway,
    S: InstrumentStore,
    A: AdvisorPort,
{
    Json(state.manage.toggle(&request.symbols).await)
}

/// Stop tracking the selected instruments.
async fn remove_instruments<B, S, A>(
    State(state): State<AppState<B, S, A>>,
    Json(request): Json<SelectionRequest>,
) -> impl IntoResponse
where
    B: BrokerGateway,
    S: InstrumentStore,
    A: AdvisorPort,
{
    Json(state.manage.remove(&request.symbols).await)
}

/// Run one reconciliation tick now.
async fn reconcile<B, S, A>(State(state): State<AppState<B, S, A>>) -> impl IntoResponse
where
    B: BrokerGateway,
    S: InstrumentStore,
    A: AdvisorPort,
{
    Json(state.engine.reconcile(Utc::now()).await)
}

/// Advisory chat endpoint.
async fn ask_advisor<B, S, A>(
    State(state): State<AppState<B, S, A>>,
    Json(request): Json<AdvisorRequest>,
) -> impl IntoResponse
where
    B: BrokerGateway,
    S: InstrumentStore,
    A: AdvisorPort,
{
    Json(AdvisorResponse {
        reply: state.advisor.execute(&request.message).await,
    })
}

fn error_response(error: &LadderError) -> ErrorResponse {
    let field = match error {
        LadderError::Validation { field, .. } => Some(field.clone()),
        LadderError::InvalidParameter { parameter, .. } => Some(parameter.clone()),
    };
    ErrorResponse {
        error: error.to_string(),
        field,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::dto::{LadderSnapshot, SelectionResult, TickReport};
    use crate::application::ports::InstrumentBook;
    use crate::application::use_cases::LadderEngineConfig;
    use crate::infrastructure::advisor::EchoAdvisor;
    use crate::infrastructure::broker::PaperBroker;
    use crate::infrastructure::persistence::InMemoryInstrumentStore;
    use axum::body::Body;
    use axum::http::Request;
    use serde::de::DeserializeOwned;
    use std::time::Duration;
    use tower::ServiceExt;

    type TestState = AppState<PaperBroker, InMemoryInstrumentStore, EchoAdvisor>;

    fn create_test_state() -> (TestState, Arc<InMemoryInstrumentStore>) {
        let store = Arc::new(InMemoryInstrumentStore::new());
        let config = LadderEngineConfig {
            entry_fill_wait: Duration::ZERO,
            ..LadderEngineConfig::default()
        };
        let engine = Arc::new(LadderEngine::new(
            Arc::new(PaperBroker::new()),
            Arc::clone(&store),
            config,
            InstrumentBook::new(),
        ));
        (
            AppState::new(engine, Arc::new(EchoAdvisor::new()), "1.0.0-test"),
            store,
        )
    }

    async fn send(
        state: &TestState,
        method: &str,
        uri: &str,
        body: Option<serde_json::Value>,
    ) -> axum::response::Response {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_vec(&body).unwrap()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        create_router(state.clone()).oneshot(request).await.unwrap()
    }

    async fn read_json<T: DeserializeOwned>(response: axum::response::Response) -> T {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn health_check_returns_ok() {
        let (state, _) = create_test_state();

        let response = send(&state, "GET", "/health", None).await;

        assert_eq!(response.status(), StatusCode::OK);
        let health: HealthResponse = read_json(response).await;
        assert_eq!(health.version, "1.0.0-test");
        assert_eq!(health.ticks, 0);
    }

    #[tokio::test]
    async fn add_instrument_returns_created_view() {
        let (state, store) = create_test_state();

        let response = send(
            &state,
            "POST",
            "/api/v1/instruments",
            Some(serde_json::json!({"symbol": "aapl", "levels": 3, "drawdown": "5"})),
        )
        .await;

        assert_eq!(response.status(), StatusCode::CREATED);
        let view: serde_json::Value = read_json(response).await;
        assert_eq!(view["symbol"], "AAPL");
        assert_eq!(view["level_count"], 3);
        assert_eq!(store.save_count(), 1);
    }

    #[tokio::test]
    async fn add_instrument_with_bad_levels_is_bad_request() {
        let (state, store) = create_test_state();

        let response = send(
            &state,
            "POST",
            "/api/v1/instruments",
            Some(serde_json::json!({"symbol": "AAPL", "levels": "abc", "drawdown": "5"})),
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let error: ErrorResponse = read_json(response).await;
        assert_eq!(error.field.as_deref(), Some("levels"));
        assert_eq!(store.save_count(), 0);
        assert!(state.manage.list().instruments.is_empty());
    }

    #[tokio::test]
    async fn list_toggle_and_remove() {
        let (state, _) = create_test_state();
        send(
            &state,
            "POST",
            "/api/v1/instruments",
            Some(serde_json::json!({"symbol": "MSFT", "levels": "2", "drawdown": "10"})),
        )
        .await;

        let toggled: SelectionResult = read_json(
            send(
                &state,
                "POST",
                "/api/v1/instruments/toggle",
                Some(serde_json::json!({"symbols": ["MSFT", "NOPE"]})),
            )
            .await,
        )
        .await;
        assert_eq!(toggled.applied_count(), 1);

        let snapshot: LadderSnapshot =
            read_json(send(&state, "GET", "/api/v1/instruments", None).await).await;
        assert_eq!(snapshot.instruments.len(), 1);
        assert_eq!(snapshot.instruments[0].status.to_string(), "inactive");

        let removed: SelectionResult = read_json(
            send(
                &state,
                "POST",
                "/api/v1/instruments/remove",
                Some(serde_json::json!({"symbols": ["MSFT"]})),
            )
            .await,
        )
        .await;
        assert_eq!(removed.applied_count(), 1);
        assert!(state.manage.list().instruments.is_empty());
    }

    #[tokio::test]
    async fn empty_selection_warns() {
        let (state, _) = create_test_state();

        let result: SelectionResult = read_json(
            send(
                &state,
                "POST",
                "/api/v1/instruments/toggle",
                Some(serde_json::json!({"symbols": []})),
            )
            .await,
        )
        .await;

        assert!(result.warning.is_some());
        assert!(result.results.is_empty());
    }

    #[tokio::test]
    async fn reconcile_runs_one_tick() {
        let (state, _) = create_test_state();
        send(
            &state,
            "POST",
            "/api/v1/instruments",
            Some(serde_json::json!({"symbol": "AAPL", "levels": 3, "drawdown": 5})),
        )
        .await;

        let response = send(&state, "POST", "/api/v1/reconcile", None).await;

        assert_eq!(response.status(), StatusCode::OK);
        let report: TickReport = read_json(response).await;
        assert_eq!(report.tick, 1);
        assert_eq!(report.submitted_count(), 3);
    }

    #[tokio::test]
    async fn advisor_replies_with_text() {
        let (state, _) = create_test_state();

        let reply: AdvisorResponse = read_json(
            send(
                &state,
                "POST",
                "/api/v1/advisor",
                Some(serde_json::json!({"message": "hello"})),
            )
            .await,
        )
        .await;

        assert_eq!(reply.reply, "Mock response to: hello");
    }
}
