#![allow(dead_code)]

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use fraud_scoring_api::{
    app::{self, envy::Envy},
    classifier::{errors::ModelError, Classifier, Inference},
    scoring::service::ScoringService,
    transactions::{
        errors::SinkError,
        models::transaction::Transaction,
        sink::{PersistenceSink, TransactionSink},
    },
    AppState,
};
use futures::future::{BoxFuture, FutureExt};
use serde_json::Value;
use tokio::sync::mpsc;
use tower::ServiceExt;

pub const DRAINED_TRANSFER: &str = r#"{
    "step": 1,
    "type": "TRANSFER",
    "amount": 9000.0,
    "oldbalanceOrg": 9000.0,
    "newbalanceOrig": 0.0,
    "oldbalanceDest": 0.0,
    "newbalanceDest": 9000.0
}"#;

pub struct StubClassifier {
    inference: Option<Inference>,
    pub calls: AtomicUsize,
}

impl StubClassifier {
    pub fn returning(probability: f64, class: bool) -> Arc<Self> {
        Arc::new(Self {
            inference: Some(Inference { probability, class }),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            inference: None,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Classifier for StubClassifier {
    fn name(&self) -> &str {
        "stub"
    }

    fn infer(&self, _transaction: &Transaction) -> Result<Inference, ModelError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inference.ok_or(ModelError::NonFiniteScore)
    }
}

pub type Row = (Transaction, f64, bool);

pub struct ChannelSink(pub mpsc::UnboundedSender<Row>);

impl TransactionSink for ChannelSink {
    fn describe(&self) -> String {
        "channel".to_string()
    }

    fn create_schema(&self) -> BoxFuture<'_, Result<(), SinkError>> {
        async { Ok(()) }.boxed()
    }

    fn insert<'a>(
        &'a self,
        tx: &'a Transaction,
        probability: f64,
        flagged: bool,
    ) -> BoxFuture<'a, Result<(), SinkError>> {
        let _ = self.0.send((tx.clone(), probability, flagged));
        async { Ok(()) }.boxed()
    }
}

pub struct FailingSink;

impl TransactionSink for FailingSink {
    fn describe(&self) -> String {
        "failing".to_string()
    }

    fn create_schema(&self) -> BoxFuture<'_, Result<(), SinkError>> {
        async { Err(SinkError::Database(sqlx::Error::PoolClosed)) }.boxed()
    }

    fn insert<'a>(
        &'a self,
        _tx: &'a Transaction,
        _probability: f64,
        _flagged: bool,
    ) -> BoxFuture<'a, Result<(), SinkError>> {
        async { Err(SinkError::Database(sqlx::Error::PoolClosed)) }.boxed()
    }
}

pub fn app_with(classifier: Arc<dyn Classifier>, sink: Arc<dyn TransactionSink>, envy: &Envy) -> Router {
    let state = AppState {
        scoring: ScoringService::new(classifier, PersistenceSink::new(sink)),
    };

    app::router::build(state, envy)
}

pub fn channel_app(
    classifier: Arc<dyn Classifier>,
) -> (Router, mpsc::UnboundedReceiver<Row>) {
    let (sender, receiver) = mpsc::unbounded_channel();
    let app = app_with(classifier, Arc::new(ChannelSink(sender)), &Envy::default());

    (app, receiver)
}

pub fn score_request(body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/score-transaction")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

    (status, body)
}
