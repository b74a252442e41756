//! Hand-written doubles shared by the unit tests.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use lanepool_core::{FailureStatus, Metrics, TokenProperty, TokenSet};

use crate::item::WorkItem;
use crate::sink::{DiagnosticLog, EventType, LogLevel, MetricCollector, ResultSink};
use crate::worker::{Fault, Worker};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    RunStarted(String, usize),
    RunFailed(String, String, FailureStatus),
    RunEnded(Metrics),
}

#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<Event>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    pub fn started(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::RunStarted(name, _) => Some(name),
                _ => None,
            })
            .collect()
    }

    pub fn ended(&self) -> usize {
        self.events().iter().filter(|e| matches!(e, Event::RunEnded(_))).count()
    }

    pub fn failed_with(&self, status: FailureStatus) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::RunFailed(id, _, s) if s == status => Some(id),
                _ => None,
            })
            .collect()
    }
}

impl ResultSink for RecordingSink {
    fn on_run_started(&self, name: &str, item_count: usize) {
        self.events.lock().unwrap().push(Event::RunStarted(name.to_string(), item_count));
    }

    fn on_run_failed(&self, id: &str, reason: &str, status: FailureStatus) {
        self.events
            .lock()
            .unwrap()
            .push(Event::RunFailed(id.to_string(), reason.to_string(), status));
    }

    fn on_run_ended(&self, _duration_ms: u64, metrics: &Metrics) {
        self.events.lock().unwrap().push(Event::RunEnded(metrics.clone()));
    }
}

#[derive(Default)]
pub struct RecordingDiagnostics {
    pub events: Mutex<Vec<(LogLevel, EventType, BTreeMap<String, String>)>>,
}

impl DiagnosticLog for RecordingDiagnostics {
    fn log_event(&self, level: LogLevel, event_type: EventType, metadata: &BTreeMap<String, String>) {
        self.events.lock().unwrap().push((level, event_type, metadata.clone()));
    }
}

/// Adds `collector.seen` = running count of items it observed.
#[derive(Default)]
pub struct CountingCollector {
    seen: AtomicUsize,
}

impl MetricCollector for CountingCollector {
    fn name(&self) -> &str {
        "counting"
    }

    fn on_item_ended(&self, _id: &str, metrics: &mut Metrics) {
        let seen = self.seen.fetch_add(1, Ordering::SeqCst) + 1;
        metrics.insert("collector.seen".to_string(), seen.to_string());
    }
}

pub struct TestItem {
    pub id: String,
    pub tokens: TokenSet,
    pub sub_units: Option<Vec<String>>,
}

impl TestItem {
    pub fn plain(id: &str) -> Box<dyn WorkItem> {
        Box::new(Self { id: id.to_string(), tokens: TokenSet::new(), sub_units: None })
    }

    pub fn gated(id: &str, tokens: &[TokenProperty]) -> Box<dyn WorkItem> {
        Box::new(Self {
            id: id.to_string(),
            tokens: tokens.iter().copied().collect(),
            sub_units: None,
        })
    }

    pub fn composite(id: &str, members: &[&str]) -> Box<dyn WorkItem> {
        Box::new(Self {
            id: id.to_string(),
            tokens: TokenSet::new(),
            sub_units: Some(members.iter().map(|m| m.to_string()).collect()),
        })
    }
}

impl WorkItem for TestItem {
    fn id(&self) -> &str {
        &self.id
    }

    fn required_tokens(&self) -> TokenSet {
        self.tokens.clone()
    }

    fn split_for_reporting(&self) -> Option<Vec<String>> {
        self.sub_units.clone()
    }
}

pub fn plain_items(n: usize) -> Vec<Box<dyn WorkItem>> {
    (0..n).map(|i| TestItem::plain(&format!("item-{i}"))).collect()
}

/// Observation handle that outlives the boxed worker.
#[derive(Clone, Default)]
pub struct WorkerCalls {
    pub runs: Arc<Mutex<Vec<String>>>,
    pub recovery_calls: Arc<AtomicUsize>,
}

impl WorkerCalls {
    pub fn runs(&self) -> Vec<String> {
        self.runs.lock().unwrap().clone()
    }

    pub fn recovery_calls(&self) -> usize {
        self.recovery_calls.load(Ordering::SeqCst)
    }
}

/// Worker whose faults are scripted per run.
pub struct ScriptedWorker {
    serial: String,
    capabilities: TokenSet,
    /// Faults for the next runs, in order; `None` runs cleanly.
    upcoming: VecDeque<Option<Fault>>,
    /// Fault raised by every run once `upcoming` is exhausted.
    every_run: Option<Fault>,
    by_item: HashMap<String, Fault>,
    recovers: bool,
    available: bool,
    delay: Duration,
    calls: WorkerCalls,
}

impl ScriptedWorker {
    pub fn new(serial: &str) -> Self {
        Self {
            serial: serial.to_string(),
            capabilities: TokenSet::new(),
            upcoming: VecDeque::new(),
            every_run: None,
            by_item: HashMap::new(),
            recovers: false,
            available: true,
            delay: Duration::ZERO,
            calls: WorkerCalls::default(),
        }
    }

    pub fn with_tokens(mut self, tokens: &[TokenProperty]) -> Self {
        self.capabilities = tokens.iter().copied().collect();
        self
    }

    pub fn then(mut self, fault: Option<Fault>) -> Self {
        self.upcoming.push_back(fault);
        self
    }

    pub fn always(mut self, fault: Fault) -> Self {
        self.every_run = Some(fault);
        self
    }

    pub fn failing_item(mut self, id: &str, fault: Fault) -> Self {
        self.by_item.insert(id.to_string(), fault);
        self
    }

    pub fn recovers(mut self, recovers: bool) -> Self {
        self.recovers = recovers;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> WorkerCalls {
        self.calls.clone()
    }
}

impl Worker for ScriptedWorker {
    fn serial(&self) -> &str {
        &self.serial
    }

    fn capabilities(&self) -> TokenSet {
        self.capabilities.clone()
    }

    fn run(&mut self, item: &dyn WorkItem, _sink: &dyn ResultSink) -> Result<(), Fault> {
        self.calls.runs.lock().unwrap().push(item.id().to_string());
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        let fault = match self.upcoming.pop_front() {
            Some(scripted) => scripted,
            None => self
                .by_item
                .get(item.id())
                .cloned()
                .or_else(|| self.every_run.clone()),
        };
        match fault {
            Some(fault) => {
                if fault.is_fatal() {
                    self.available = false;
                }
                Err(fault)
            }
            None => Ok(()),
        }
    }

    fn attempt_recovery(&mut self) -> bool {
        self.calls.recovery_calls.fetch_add(1, Ordering::SeqCst);
        if self.recovers {
            self.available = true;
        }
        self.recovers
    }

    fn is_available(&self) -> bool {
        self.available
    }
}

pub fn unavailable() -> Fault {
    Fault::WorkerUnavailable("device offline".to_string())
}
