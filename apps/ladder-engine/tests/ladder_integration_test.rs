//! Ladder Integration Tests
//!
//! Drives the engine end to end: paper broker, JSON file store, restarts.

// Allow unwrap in tests - tests should panic on unexpected errors
#![allow(clippy::unwrap_used, clippy::float_cmp)]

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tokio_util::sync::CancellationToken;

use ladder_engine::application::dto::AddInstrumentDto;
use ladder_engine::application::ports::{
    BrokerError, BrokerGateway, InstrumentStore, OrderAck, SubmitOrderRequest,
};
use ladder_engine::application::services::{LadderDriver, LadderDriverConfig};
use ladder_engine::application::use_cases::{
    LadderEngine, LadderEngineConfig, ManageInstrumentsUseCase,
};
use ladder_engine::domain::ladder::{LadderPhase, LevelState, PositionState};
use ladder_engine::domain::shared::Symbol;
use ladder_engine::infrastructure::broker::PaperBroker;
use ladder_engine::infrastructure::persistence::JsonFileInstrumentStore;

// =============================================================================
// Helpers
// =============================================================================

fn engine_config() -> LadderEngineConfig {
    LadderEngineConfig {
        entry_fill_wait: Duration::ZERO,
        ..LadderEngineConfig::default()
    }
}

async fn boot<B: BrokerGateway>(
    broker: Arc<B>,
    path: &Path,
) -> Arc<LadderEngine<B, JsonFileInstrumentStore>> {
    let store = Arc::new(JsonFileInstrumentStore::new(path));
    Arc::new(LadderEngine::bootstrap(broker, store, engine_config()).await)
}

fn add_request(symbol: &str, levels: &str, drawdown: &str) -> AddInstrumentDto {
    AddInstrumentDto {
        symbol: symbol.to_string(),
        levels: levels.to_string(),
        drawdown: drawdown.to_string(),
    }
}

fn read_document(path: &Path) -> serde_json::Value {
    serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
}

/// Paper broker that refuses every order for one symbol.
struct RejectingBroker {
    inner: PaperBroker,
    rejected: Symbol,
}

#[async_trait]
impl BrokerGateway for RejectingBroker {
    async fn get_current_price(&self, symbol: &Symbol) -> Result<Decimal, BrokerError> {
        self.inner.get_current_price(symbol).await
    }

    async fn get_position(&self, symbol: &Symbol) -> Result<Option<Decimal>, BrokerError> {
        self.inner.get_position(symbol).await
    }

    async fn get_max_filled_price(&self, symbol: &Symbol) -> Result<Option<Decimal>, BrokerError> {
        self.inner.get_max_filled_price(symbol).await
    }

    async fn list_open_orders(&self, symbol: &Symbol) -> Result<Vec<Decimal>, BrokerError> {
        self.inner.list_open_orders(symbol).await
    }

    async fn submit_order(&self, request: SubmitOrderRequest) -> Result<OrderAck, BrokerError> {
        if request.symbol == self.rejected {
            return Err(BrokerError::ConnectionError {
                message: "connection reset".to_string(),
            });
        }
        self.inner.submit_order(request).await
    }
}

// =============================================================================
// Scenarios
// =============================================================================

#[tokio::test]
async fn first_tick_enters_and_places_every_level() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("instruments.json");
    let broker = Arc::new(PaperBroker::new());
    let engine = boot(Arc::clone(&broker), &path).await;
    let manage = ManageInstrumentsUseCase::new(Arc::clone(&engine));
    let aapl = Symbol::new("AAPL");

    manage.add(&add_request("AAPL", "3", "5")).await.unwrap();
    let report = engine.reconcile(Utc::now()).await;

    let outcome = report.outcome("AAPL").unwrap();
    assert_eq!(outcome.entry_price, Some(dec!(100)));
    assert_eq!(outcome.submitted, vec![1, 2, 3]);
    assert!(report.persisted);
    assert_eq!(broker.position(&aapl), dec!(1));
    assert_eq!(
        broker.resting_orders(&aapl),
        vec![dec!(95), dec!(90), dec!(85)]
    );

    let view = engine.view(&aapl).unwrap();
    assert_eq!(view.phase, LadderPhase::Idle);
    assert_eq!(view.position_state, PositionState::Entered);
    assert!(view.levels.iter().all(|l| l.state == LevelState::Placed));

    let document = read_document(&path);
    let stored = &document["AAPL"];
    assert_eq!(stored["position"], 1);
    assert_eq!(stored["status"], "on");
    assert_eq!(stored["entry_price"].as_f64(), Some(100.0));
    assert_eq!(stored["levels"]["-1"].as_f64(), Some(95.0));
    assert_eq!(stored["levels"]["-2"].as_f64(), Some(90.0));
    assert_eq!(stored["levels"]["-3"].as_f64(), Some(85.0));
}

#[tokio::test]
async fn second_tick_submits_nothing_new() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("instruments.json");
    let broker = Arc::new(PaperBroker::new());
    let engine = boot(Arc::clone(&broker), &path).await;
    let manage = ManageInstrumentsUseCase::new(Arc::clone(&engine));

    manage.add(&add_request("MSFT", "2", "10")).await.unwrap();
    engine.reconcile(Utc::now()).await;
    let report = engine.reconcile(Utc::now()).await;

    assert_eq!(report.tick, 2);
    assert_eq!(report.submitted_count(), 0);
    assert_eq!(broker.resting_orders(&Symbol::new("MSFT")).len(), 2);
}

#[tokio::test]
async fn restart_only_submits_pending_levels() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("instruments.json");
    std::fs::write(
        &path,
        r#"{
            "AAPL": {
                "position": 1,
                "entry_price": 100.0,
                "levels": { "-1": 95.0, "2": 90.0, "3": 85.0 },
                "drawdown": 0.05,
                "status": "on"
            }
        }"#,
    )
    .unwrap();

    let broker = Arc::new(PaperBroker::new());
    let engine = boot(Arc::clone(&broker), &path).await;
    let report = engine.reconcile(Utc::now()).await;

    let outcome = report.outcome("AAPL").unwrap();
    assert_eq!(outcome.submitted, vec![2, 3]);
    assert_eq!(
        broker.resting_orders(&Symbol::new("AAPL")),
        vec![dec!(90), dec!(85)]
    );
    // Stored entry: no market buy was sent.
    assert_eq!(broker.position(&Symbol::new("AAPL")), Decimal::ZERO);
}

#[tokio::test]
async fn restart_reloads_placed_levels_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("instruments.json");
    let broker = Arc::new(PaperBroker::new());

    {
        let engine = boot(Arc::clone(&broker), &path).await;
        ManageInstrumentsUseCase::new(Arc::clone(&engine))
            .add(&add_request("AAPL", "3", "5"))
            .await
            .unwrap();
        engine.reconcile(Utc::now()).await;
    }

    let engine = boot(Arc::clone(&broker), &path).await;
    let report = engine.reconcile(Utc::now()).await;

    assert_eq!(report.submitted_count(), 0);
    assert_eq!(broker.resting_orders(&Symbol::new("AAPL")).len(), 3);
    let record = engine.record(&Symbol::new("AAPL")).unwrap();
    assert_eq!(record.placed_levels().count(), 3);
}

#[tokio::test]
async fn invalid_levels_leave_book_and_file_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("instruments.json");
    let engine = boot(Arc::new(PaperBroker::new()), &path).await;
    let manage = ManageInstrumentsUseCase::new(Arc::clone(&engine));

    let result = manage.add(&add_request("AAPL", "abc", "5")).await;

    assert!(result.is_err());
    assert!(engine.book().is_empty());
    assert!(!path.exists());
}

#[tokio::test]
async fn broker_failure_isolated_to_one_symbol() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("instruments.json");
    let broker = Arc::new(RejectingBroker {
        inner: PaperBroker::new(),
        rejected: Symbol::new("BAD"),
    });
    let engine = boot(Arc::clone(&broker), &path).await;
    let manage = ManageInstrumentsUseCase::new(Arc::clone(&engine));
    manage.add(&add_request("BAD", "2", "5")).await.unwrap();
    manage.add(&add_request("GOOD", "2", "5")).await.unwrap();

    let report = engine.reconcile(Utc::now()).await;

    let bad = report.outcome("BAD").unwrap();
    assert!(bad.submitted.is_empty());
    assert!(bad.error.is_some());
    assert_eq!(
        engine.view(&Symbol::new("BAD")).unwrap().phase,
        LadderPhase::Uninitialized
    );

    let good = report.outcome("GOOD").unwrap();
    assert_eq!(good.submitted, vec![1, 2]);
    assert_eq!(
        engine.view(&Symbol::new("GOOD")).unwrap().phase,
        LadderPhase::Idle
    );
}

#[tokio::test]
async fn toggled_off_instrument_is_not_reconciled() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("instruments.json");
    let broker = Arc::new(PaperBroker::new());
    let engine = boot(Arc::clone(&broker), &path).await;
    let manage = ManageInstrumentsUseCase::new(Arc::clone(&engine));
    manage.add(&add_request("AAPL", "3", "5")).await.unwrap();

    manage.toggle(&["AAPL".to_string()]).await;
    let report = engine.reconcile(Utc::now()).await;

    assert!(report.outcome("AAPL").is_none());
    assert_eq!(broker.position(&Symbol::new("AAPL")), Decimal::ZERO);
    assert_eq!(read_document(&path)["AAPL"]["status"], "off");
}

#[tokio::test]
async fn driver_ticks_until_cancelled_then_persists() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("instruments.json");
    let broker = Arc::new(PaperBroker::new());
    let engine = boot(Arc::clone(&broker), &path).await;
    ManageInstrumentsUseCase::new(Arc::clone(&engine))
        .add(&add_request("AAPL", "2", "5"))
        .await
        .unwrap();

    let shutdown = CancellationToken::new();
    let handle = LadderDriver::new(
        Arc::clone(&engine),
        LadderDriverConfig {
            interval: Duration::from_millis(10),
        },
        shutdown.clone(),
    )
    .spawn();

    tokio::time::timeout(Duration::from_secs(5), async {
        while engine.tick_count() == 0 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap();
    shutdown.cancel();
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(broker.resting_orders(&Symbol::new("AAPL")).len(), 2);
    let reloaded = JsonFileInstrumentStore::new(&path).load().await.unwrap();
    assert_eq!(
        reloaded[&Symbol::new("AAPL")].placed_levels().count(),
        2
    );
}
