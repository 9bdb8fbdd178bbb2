//! Scripted data gateway double.
//!
//! Each [`ScriptStep`] pairs a request predicate with a canned outcome. The
//! first step whose predicate matches answers the call; `once` steps are
//! consumed by their first use. Gated steps park the call until the test
//! releases the gate, which lets tests settle fetches in any order.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Notify;

use crate::domain::ports::{DataGateway, GatewayError, GatewayResponse, Record, RemoteErrorBody};
use crate::domain::request::TableRequest;

type RequestMatcher = Box<dyn Fn(&TableRequest) -> bool + Send + Sync>;

/// One scripted answer.
pub struct ScriptStep {
    matcher: RequestMatcher,
    outcome: Result<GatewayResponse, GatewayError>,
    once: bool,
    gate: Option<Arc<Notify>>,
}

impl ScriptStep {
    /// Answer every request with `outcome`.
    pub fn respond(outcome: Result<GatewayResponse, GatewayError>) -> Self {
        Self {
            matcher: Box::new(|_| true),
            outcome,
            once: false,
            gate: None,
        }
    }

    /// Answer with the given rows.
    pub fn rows(values: Value) -> Self {
        Self::respond(Ok(GatewayResponse::ok(records(values))))
    }

    /// Answer with a structured API error and null rows.
    pub fn remote_error(message: &str) -> Self {
        Self::respond(Ok(GatewayResponse::failed(RemoteErrorBody::message(
            message,
        ))))
    }

    /// Fail at the transport level.
    pub fn network_error(message: &str) -> Self {
        Self::respond(Err(GatewayError::network(message)))
    }

    /// Only answer requests accepted by `matcher`.
    #[must_use]
    pub fn when<F>(mut self, matcher: F) -> Self
    where
        F: Fn(&TableRequest) -> bool + Send + Sync + 'static,
    {
        self.matcher = Box::new(matcher);
        self
    }

    /// Consume the step after its first use.
    #[must_use]
    pub fn once(mut self) -> Self {
        self.once = true;
        self
    }

    /// Park each matching call until `gate` is notified.
    #[must_use]
    pub fn gated(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }
}

/// Gateway double answering from a script and logging every request.
#[derive(Default)]
pub struct ScriptedGateway {
    steps: Mutex<Vec<ScriptStep>>,
    calls: Mutex<Vec<TableRequest>>,
    completed: AtomicUsize,
    progress: Notify,
}

impl ScriptedGateway {
    /// Gateway answering with `steps` in order.
    pub fn new(steps: impl IntoIterator<Item = ScriptStep>) -> Self {
        Self {
            steps: Mutex::new(steps.into_iter().collect()),
            ..Self::default()
        }
    }

    /// Append a step after the existing ones.
    pub fn push(&self, step: ScriptStep) {
        lock(&self.steps, "steps mutex").push(step);
    }

    /// Requests received so far, in arrival order.
    pub fn calls(&self) -> Vec<TableRequest> {
        lock(&self.calls, "calls mutex").clone()
    }

    /// Number of requests received so far.
    pub fn call_count(&self) -> usize {
        lock(&self.calls, "calls mutex").len()
    }

    /// Calls that have returned to the caller.
    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    /// Wait until at least `count` calls have arrived.
    pub async fn wait_for_calls(&self, count: usize) {
        loop {
            let progressed = self.progress.notified();
            if self.call_count() >= count {
                return;
            }
            progressed.await;
        }
    }

    /// Wait until at least `count` calls have returned.
    pub async fn wait_for_completed(&self, count: usize) {
        loop {
            let progressed = self.progress.notified();
            if self.completed() >= count {
                return;
            }
            progressed.await;
        }
    }

    fn take_answer(
        &self,
        request: &TableRequest,
    ) -> (Result<GatewayResponse, GatewayError>, Option<Arc<Notify>>) {
        let mut steps = lock(&self.steps, "steps mutex");
        let position = steps.iter().position(|step| (step.matcher)(request));
        match position {
            Some(index) if steps.get(index).is_some_and(|step| step.once) => {
                let step = steps.remove(index);
                (step.outcome, step.gate)
            }
            Some(index) => steps.get(index).map_or_else(
                || unmatched(request),
                |step| (step.outcome.clone(), step.gate.clone()),
            ),
            None => unmatched(request),
        }
    }
}

fn unmatched(request: &TableRequest) -> (Result<GatewayResponse, GatewayError>, Option<Arc<Notify>>) {
    (
        Err(GatewayError::network(format!(
            "no scripted answer for table `{}`",
            request.table
        ))),
        None,
    )
}

#[async_trait]
impl DataGateway for ScriptedGateway {
    async fn execute(&self, request: &TableRequest) -> Result<GatewayResponse, GatewayError> {
        lock(&self.calls, "calls mutex").push(request.clone());
        let (outcome, gate) = self.take_answer(request);
        self.progress.notify_waiters();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        self.completed.fetch_add(1, Ordering::SeqCst);
        self.progress.notify_waiters();
        outcome
    }
}

/// Convert a JSON object into a gateway record.
///
/// # Panics
///
/// Panics when `value` is not an object.
pub fn record(value: Value) -> Record {
    match value {
        Value::Object(map) => map,
        other => panic!("expected a JSON object, got {other}"),
    }
}

/// Convert a JSON array of objects into gateway records.
///
/// # Panics
///
/// Panics when `values` is not an array of objects.
pub fn records(values: Value) -> Vec<Record> {
    match values {
        Value::Array(items) => items.into_iter().map(record).collect(),
        other => panic!("expected a JSON array, got {other}"),
    }
}

fn lock<'a, T>(mutex: &'a Mutex<T>, label: &str) -> MutexGuard<'a, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(_) => panic!("{label}"),
    }
}
