//! Batch filling and statistics

use crate::config::{ConfigError, FillConfig};
use crate::error::{FillError, FillResult, HarnessDefect};
use crate::scenario::{Scenario, ScenarioRecord};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tessera_fixtures::{FixtureWriter, Provenance};
use tessera_forks::ForkSpec;
use tessera_t8n::TransitionTool;
use tokio::sync::{watch, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// One scenario to fill under one fork
#[derive(Clone, Debug)]
pub struct FillCase {
    /// Scenario id; names the fixture and its file
    pub id: String,
    /// Fork or transition to fill under
    pub fork: ForkSpec,
    /// The scenario
    pub scenario: Scenario,
}

impl FillCase {
    /// Create a case
    pub fn new(id: impl Into<String>, fork: impl Into<ForkSpec>, scenario: impl Into<Scenario>) -> Self {
        FillCase {
            id: id.into(),
            fork: fork.into(),
            scenario: scenario.into(),
        }
    }
}

/// Aggregated fill statistics
#[derive(Debug, Default, Clone)]
pub struct FillStats {
    /// Fixtures written
    pub filled: usize,
    /// Scenarios the engine disagreed with
    pub failed: usize,
    /// Scenarios that hit a tooling or scenario defect
    pub harness_defects: usize,
    /// Scenarios stopped or never started because the run was cancelled
    pub cancelled: usize,
    /// Wall time of the run
    pub duration: Duration,
    /// Failed scenario ids with reasons
    pub failures: Vec<(String, String)>,
    /// Defective scenario ids with reasons
    pub defects: Vec<(String, String)>,
}

impl FillStats {
    /// Create empty stats
    pub fn new() -> Self {
        Self::default()
    }

    /// Scenarios that ran to a verdict or defect
    pub fn total(&self) -> usize {
        self.filled + self.failed + self.harness_defects
    }

    /// True if every started scenario was filled
    pub fn is_success(&self) -> bool {
        self.failed == 0 && self.harness_defects == 0
    }

    fn add_error(&mut self, id: String, err: &FillError) {
        if err.is_harness_defect() {
            self.harness_defects += 1;
            self.defects.push((id, err.to_string()));
        } else {
            self.failed += 1;
            self.failures.push((id, err.to_string()));
        }
    }

    /// Print summary
    pub fn print_summary(&self) {
        println!("{}", self);
    }
}

impl fmt::Display for FillStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "\n========================================")?;
        writeln!(f, "Fill Summary")?;
        writeln!(f, "========================================")?;
        writeln!(f, "Filled:          {}", self.filled)?;
        writeln!(f, "Failed:          {}", self.failed)?;
        writeln!(f, "Harness defects: {}", self.harness_defects)?;
        writeln!(f, "Cancelled:       {}", self.cancelled)?;
        write!(f, "Duration: {:.2}s", self.duration.as_secs_f64())?;

        if !self.failures.is_empty() {
            write!(f, "\n\nFailed scenarios:")?;
            for (id, reason) in &self.failures {
                write!(f, "\n  - {}: {}", id, reason)?;
            }
        }
        if !self.defects.is_empty() {
            write!(f, "\n\nHarness defects:")?;
            for (id, reason) in &self.defects {
                write!(f, "\n  - {}: {}", id, reason)?;
            }
        }
        Ok(())
    }
}

/// Result of a batch
#[derive(Debug, Default)]
pub struct FillReport {
    /// Counts and reasons
    pub stats: FillStats,
    /// One record per written fixture, in completion order
    pub records: Vec<ScenarioRecord>,
}

enum Outcome {
    Filled(ScenarioRecord),
    Failed(FillError),
    Cancelled,
}

/// Resolves once `cancel` reads true. A dropped sender never cancels.
async fn cancelled(cancel: &mut watch::Receiver<bool>) {
    loop {
        let requested = *cancel.borrow_and_update();
        if requested {
            return;
        }
        if cancel.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

/// Fills scenarios through one transition tool and writes the fixtures
#[derive(Clone)]
pub struct Filler {
    tool: Arc<dyn TransitionTool>,
    writer: Arc<FixtureWriter>,
    provenance: Provenance,
    workers: usize,
    chain_id: Option<u64>,
}

impl fmt::Debug for Filler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Filler")
            .field("tool", &self.tool.name())
            .field("output", &self.writer.root())
            .field("workers", &self.workers)
            .field("chain_id", &self.chain_id)
            .finish()
    }
}

impl Filler {
    /// Filler writing under `output_dir`, one scenario at a time, any chain id
    pub fn new(tool: Arc<dyn TransitionTool>, output_dir: impl Into<PathBuf>) -> Self {
        let provenance = Provenance::new(tool.name());
        Filler {
            tool,
            writer: Arc::new(FixtureWriter::new(output_dir)),
            provenance,
            workers: 1,
            chain_id: None,
        }
    }

    /// Filler for a loaded configuration, driving the configured engine
    pub fn from_config(config: &FillConfig) -> Result<Self, ConfigError> {
        let tool = config.transition_tool()?;
        Ok(Filler::new(Arc::new(tool), &config.output_dir)
            .workers(config.workers)
            .chain_id(config.chain_id))
    }

    /// Number of scenarios filled concurrently
    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Require every scenario to be signed for `chain_id`
    pub fn chain_id(mut self, chain_id: u64) -> Self {
        self.chain_id = Some(chain_id);
        self
    }

    /// Replace the fixture provenance
    pub fn provenance(mut self, provenance: Provenance) -> Self {
        self.provenance = provenance;
        self
    }

    /// Fill one case and write its fixture
    pub async fn fill_one(&self, case: &FillCase) -> FillResult<ScenarioRecord> {
        if let Some(expected) = self.chain_id {
            let actual = case.scenario.chain_id()?;
            if actual != expected {
                return Err(HarnessDefect::MalformedScenario(format!(
                    "signed for chain {actual}, run is configured for chain {expected}"
                ))
                .into());
            }
        }
        let verified = case.scenario.fill(&case.fork, self.tool.as_ref()).await?;
        let written = self
            .writer
            .write(&case.id, &verified.to_fixture(), &self.provenance)?;
        Ok(verified.record(&written))
    }

    /// Fill every case, `workers` at a time. Once `cancel` turns true no
    /// further case starts and in-flight fills are dropped, which kills
    /// their engine subprocesses.
    pub async fn fill_all(&self, cases: Vec<FillCase>, cancel: watch::Receiver<bool>) -> FillReport {
        let start = Instant::now();
        let semaphore = Arc::new(Semaphore::new(self.workers));
        let mut set = JoinSet::new();
        info!(cases = cases.len(), workers = self.workers, engine = self.tool.name(), "filling");

        for case in cases {
            let filler = self.clone();
            let semaphore = semaphore.clone();
            let mut cancel = cancel.clone();
            set.spawn(async move {
                let outcome = tokio::select! {
                    biased;
                    _ = cancelled(&mut cancel) => Outcome::Cancelled,
                    outcome = async {
                        let Ok(_permit) = semaphore.clone().acquire_owned().await else {
                            return Outcome::Cancelled;
                        };
                        match filler.fill_one(&case).await {
                            Ok(record) => Outcome::Filled(record),
                            Err(e) => Outcome::Failed(e),
                        }
                    } => outcome,
                };
                (case.id, outcome)
            });
        }

        let mut report = FillReport::default();
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((id, Outcome::Filled(record))) => {
                    debug!(%id, hash = %record.hash, "filled");
                    report.stats.filled += 1;
                    report.records.push(record);
                }
                Ok((id, Outcome::Failed(e))) => {
                    if e.is_harness_defect() {
                        error!(%id, error = %e, "harness defect");
                    } else {
                        warn!(%id, error = %e, "scenario failed");
                    }
                    report.stats.add_error(id, &e);
                }
                Ok((id, Outcome::Cancelled)) => {
                    debug!(%id, "cancelled");
                    report.stats.cancelled += 1;
                }
                Err(e) => {
                    error!(error = %e, "fill task aborted");
                    report.stats.harness_defects += 1;
                    report.stats.defects.push(("<unknown>".to_string(), e.to_string()));
                }
            }
        }

        report.stats.duration = start.elapsed();
        info!(
            filled = report.stats.filled,
            failed = report.stats.failed,
            harness_defects = report.stats.harness_defects,
            cancelled = report.stats.cancelled,
            "fill finished"
        );
        report
    }
}
