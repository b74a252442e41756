use std::collections::{HashMap, HashSet, VecDeque};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use tracing::debug;

use lanepool_core::{Metrics, TokenProperty, TokenSet};
use lanepool_scheduler::{Fault, ResultSink, WorkItem, Worker};

/// A run plan: the simulated fleet plus the work to schedule on it.
#[derive(Debug, Clone, Deserialize)]
pub struct RunPlan {
    #[serde(default, rename = "worker")]
    pub workers: Vec<WorkerPlan>,
    #[serde(default, rename = "item")]
    pub items: Vec<ItemPlan>,
}

/// Scripted behavior of one run on a simulated worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Step {
    Ok,
    Fail,
    Unresponsive,
    Unavailable,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WorkerPlan {
    pub serial: String,
    #[serde(default)]
    pub tokens: Vec<String>,
    /// Outcomes of the first runs, in order; later runs follow the item's outcome.
    #[serde(default)]
    pub script: Vec<Step>,
    #[serde(default)]
    pub recovers: bool,
    #[serde(default)]
    pub delay_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ItemPlan {
    pub id: String,
    #[serde(default)]
    pub tokens: Vec<String>,
    #[serde(default)]
    pub sub_units: Vec<String>,
    #[serde(default = "default_test_count")]
    pub test_count: usize,
    #[serde(default = "default_outcome")]
    pub outcome: Step,
}

fn default_test_count() -> usize { 1 }
fn default_outcome() -> Step { Step::Ok }

fn parse_tokens(raw: &[String]) -> Result<TokenSet> {
    raw.iter()
        .map(|t| t.parse::<TokenProperty>().map_err(anyhow::Error::from))
        .collect()
}

impl RunPlan {
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let plan: Self = toml::from_str(toml_str).context("failed to parse run plan")?;
        plan.validate()?;
        Ok(plan)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!(?path, "Loading run plan");
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read plan: {}", path.display()))?;
        Self::from_toml(&content).with_context(|| format!("invalid plan: {}", path.display()))
    }

    fn validate(&self) -> Result<()> {
        let mut serials = HashSet::new();
        for worker in &self.workers {
            if !serials.insert(worker.serial.as_str()) {
                bail!("duplicate worker serial '{}'", worker.serial);
            }
            parse_tokens(&worker.tokens)
                .with_context(|| format!("worker '{}'", worker.serial))?;
        }
        let mut ids = HashSet::new();
        for item in &self.items {
            if !ids.insert(item.id.as_str()) {
                bail!("duplicate item id '{}'", item.id);
            }
            parse_tokens(&item.tokens).with_context(|| format!("item '{}'", item.id))?;
        }
        Ok(())
    }

    /// Build the work items. Tokens were checked by `validate`.
    pub fn build_items(&self) -> Result<Vec<Box<dyn WorkItem>>> {
        self.items
            .iter()
            .map(|plan| {
                Ok(Box::new(PlannedItem {
                    id: plan.id.clone(),
                    tokens: parse_tokens(&plan.tokens)?,
                    sub_units: plan.sub_units.clone(),
                    test_count: plan.test_count,
                }) as Box<dyn WorkItem>)
            })
            .collect()
    }

    pub fn build_workers(&self) -> Result<Vec<Box<dyn Worker>>> {
        let outcomes: Arc<HashMap<String, Step>> = Arc::new(
            self.items
                .iter()
                .map(|item| (item.id.clone(), item.outcome))
                .collect(),
        );
        self.workers
            .iter()
            .map(|plan| {
                Ok(Box::new(SimulatedWorker {
                    serial: plan.serial.clone(),
                    tokens: parse_tokens(&plan.tokens)?,
                    script: plan.script.iter().copied().collect(),
                    recovers: plan.recovers,
                    delay: Duration::from_millis(plan.delay_ms),
                    online: true,
                    outcomes: Arc::clone(&outcomes),
                }) as Box<dyn Worker>)
            })
            .collect()
    }
}

/// Work item described by the plan. Its outcome is applied by the worker that runs it.
struct PlannedItem {
    id: String,
    tokens: TokenSet,
    sub_units: Vec<String>,
    test_count: usize,
}

impl WorkItem for PlannedItem {
    fn id(&self) -> &str {
        &self.id
    }

    fn required_tokens(&self) -> TokenSet {
        self.tokens.clone()
    }

    fn test_count(&self) -> usize {
        self.test_count
    }

    fn split_for_reporting(&self) -> Option<Vec<String>> {
        (!self.sub_units.is_empty()).then(|| self.sub_units.clone())
    }
}

struct SimulatedWorker {
    serial: String,
    tokens: TokenSet,
    script: VecDeque<Step>,
    recovers: bool,
    delay: Duration,
    online: bool,
    /// Planned outcome per item id, shared by the whole fleet.
    outcomes: Arc<HashMap<String, Step>>,
}

impl Worker for SimulatedWorker {
    fn serial(&self) -> &str {
        &self.serial
    }

    fn capabilities(&self) -> TokenSet {
        self.tokens.clone()
    }

    fn run(&mut self, item: &dyn WorkItem, sink: &dyn ResultSink) -> Result<(), Fault> {
        sink.on_item_started(item.id());
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        let step = match self.script.pop_front() {
            Some(step) => step,
            None => self.outcomes.get(item.id()).copied().unwrap_or(Step::Ok),
        };
        let id = item.id();
        sink.on_item_ended(id, &Metrics::new());
        match step {
            Step::Ok => Ok(()),
            Step::Fail => Err(Fault::Recoverable(format!("{id} failed"))),
            Step::Unresponsive => Err(Fault::WorkerUnresponsive(format!(
                "{} stopped responding during {id}",
                self.serial
            ))),
            Step::Unavailable => {
                self.online = false;
                Err(Fault::WorkerUnavailable(format!("{} went offline", self.serial)))
            }
        }
    }

    fn attempt_recovery(&mut self) -> bool {
        debug!(serial = %self.serial, recovers = self.recovers, "simulated recovery");
        self.online = self.recovers;
        self.recovers
    }

    fn is_available(&self) -> bool {
        self.online
    }
}
