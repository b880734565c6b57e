// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::Duration;
use tracing::{error, info};

use crate::ParameterValues;

/// The external rendering engine. Called off the UI thread.
pub trait ReportRenderer: Send + Sync {
    fn render(&self, artifact: &Path, values: &ParameterValues) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderJob {
    pub id: u64,
    pub report_code: String,
    pub artifact: PathBuf,
    pub values: ParameterValues,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderOutcome {
    Completed { job: u64, report_code: String },
    Failed { job: u64, report_code: String, error: String },
}

impl RenderOutcome {
    pub fn job(&self) -> u64 {
        match self {
            Self::Completed { job, .. } | Self::Failed { job, .. } => *job,
        }
    }

    /// Writes the outcome to the log; nothing else observes viewer failures.
    pub fn log(&self) {
        match self {
            Self::Completed { job, report_code } => {
                info!(job, report_code = %report_code, "report viewer finished");
            }
            Self::Failed {
                job,
                report_code,
                error,
            } => {
                error!(job, report_code = %report_code, error = %error, "report viewer failed");
            }
        }
    }
}

/// Runs each render on its own thread and collects outcomes on a channel.
pub struct ViewerLauncher {
    renderer: Arc<dyn ReportRenderer>,
    outcome_tx: Sender<RenderOutcome>,
    outcome_rx: Receiver<RenderOutcome>,
    next_job: u64,
}

impl ViewerLauncher {
    pub fn new(renderer: Arc<dyn ReportRenderer>) -> Self {
        let (outcome_tx, outcome_rx) = mpsc::channel();
        Self {
            renderer,
            outcome_tx,
            outcome_rx,
            next_job: 1,
        }
    }

    /// Fire and forget. The returned id matches the eventual outcome.
    pub fn launch(
        &mut self,
        report_code: &str,
        artifact: PathBuf,
        values: ParameterValues,
    ) -> Result<u64> {
        let job = RenderJob {
            id: self.next_job,
            report_code: report_code.to_owned(),
            artifact,
            values,
        };
        self.next_job += 1;

        let id = job.id;
        let renderer = Arc::clone(&self.renderer);
        let tx = self.outcome_tx.clone();
        thread::Builder::new()
            .name(format!("report-viewer-{id}"))
            .spawn(move || {
                let _ = tx.send(run_job(renderer.as_ref(), job));
            })
            .with_context(|| format!("spawn viewer for report {report_code}"))?;

        info!(job = id, report_code, "launched report viewer");
        Ok(id)
    }

    /// Outcomes that arrived since the last call, without blocking.
    pub fn drain(&self) -> Vec<RenderOutcome> {
        self.outcome_rx.try_iter().collect()
    }

    /// Blocks up to `timeout` for the next outcome.
    pub fn wait_next(&self, timeout: Duration) -> Option<RenderOutcome> {
        match self.outcome_rx.recv_timeout(timeout) {
            Ok(outcome) => Some(outcome),
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => None,
        }
    }
}

fn run_job(renderer: &dyn ReportRenderer, job: RenderJob) -> RenderOutcome {
    let result = catch_unwind(AssertUnwindSafe(|| {
        renderer.render(&job.artifact, &job.values)
    }));
    match result {
        Ok(Ok(())) => RenderOutcome::Completed {
            job: job.id,
            report_code: job.report_code,
        },
        Ok(Err(error)) => RenderOutcome::Failed {
            job: job.id,
            report_code: job.report_code,
            error: format!("{error:#}"),
        },
        Err(_) => RenderOutcome::Failed {
            job: job.id,
            report_code: job.report_code,
            error: "renderer panicked".to_owned(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::{RenderOutcome, ReportRenderer, ViewerLauncher};
    use crate::{ParamValue, ParameterValues};
    use anyhow::{Result, bail};
    use std::path::{Path, PathBuf};
    use std::sync::Arc;
    use std::time::Duration;

    struct Refuses;

    impl ReportRenderer for Refuses {
        fn render(&self, artifact: &Path, _values: &ParameterValues) -> Result<()> {
            bail!("cannot open {}", artifact.display())
        }
    }

    struct Panics;

    impl ReportRenderer for Panics {
        fn render(&self, _artifact: &Path, _values: &ParameterValues) -> Result<()> {
            panic!("viewer crashed")
        }
    }

    struct Accepts;

    impl ReportRenderer for Accepts {
        fn render(&self, _artifact: &Path, values: &ParameterValues) -> Result<()> {
            assert_eq!(values.get("P1"), Some(&ParamValue::Bool(true)));
            Ok(())
        }
    }

    fn values() -> ParameterValues {
        let mut values = ParameterValues::new();
        values.insert("P1".to_owned(), ParamValue::Bool(true));
        values
    }

    #[test]
    fn failures_come_back_on_the_channel() -> Result<()> {
        let mut launcher = ViewerLauncher::new(Arc::new(Refuses));
        let job = launcher.launch("R1", PathBuf::from("R1 - Sales.rpt"), values())?;

        let outcome = launcher
            .wait_next(Duration::from_secs(5))
            .expect("viewer outcome");
        assert_eq!(outcome.job(), job);
        assert!(matches!(
            outcome,
            RenderOutcome::Failed { ref error, .. } if error.contains("R1 - Sales.rpt")
        ));
        Ok(())
    }

    #[test]
    fn panics_are_reported_as_failures() -> Result<()> {
        let mut launcher = ViewerLauncher::new(Arc::new(Panics));
        launcher.launch("R1", PathBuf::from("x.rpt"), values())?;

        let outcome = launcher
            .wait_next(Duration::from_secs(5))
            .expect("viewer outcome");
        assert!(matches!(outcome, RenderOutcome::Failed { ref error, .. } if error == "renderer panicked"));
        Ok(())
    }

    #[test]
    fn job_ids_increase_per_launch() -> Result<()> {
        let mut launcher = ViewerLauncher::new(Arc::new(Accepts));
        let first = launcher.launch("R1", PathBuf::from("a.rpt"), values())?;
        let second = launcher.launch("R1", PathBuf::from("a.rpt"), values())?;
        assert!(second > first);

        let mut outcomes = Vec::new();
        while outcomes.len() < 2 {
            let outcome = launcher
                .wait_next(Duration::from_secs(5))
                .expect("viewer outcome");
            outcomes.push(outcome);
        }
        assert!(
            outcomes
                .iter()
                .all(|outcome| matches!(outcome, RenderOutcome::Completed { .. }))
        );
        assert!(launcher.drain().is_empty());
        Ok(())
    }
}
