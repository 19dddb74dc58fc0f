//! Structured text reports of a pipeline and its last run.
//!
//! Reports are plain text so failing scenarios can print them directly.

use std::fmt;

use inspect_types::{FitResult, Primitive};
use pipeline_engine::stages::keys;
use pipeline_engine::{Completion, RunMode, StageOutcome};

use crate::workflow::PipelineBuilder;

/// One stage line in execution order.
pub struct StageEntry {
    pub index: usize,
    pub name: String,
    pub kind: String,
    pub manual: bool,
    /// `None` when the last run never reached the stage.
    pub outcome: Option<StageOutcome>,
}

/// Summary of one published fit.
pub struct FitEntry {
    pub name: String,
    pub detail: String,
    pub inlier_count: usize,
    pub fit_error: f64,
}

/// A complete pipeline report.
pub struct RunReport {
    pub status: Option<String>,
    pub stages: Vec<StageEntry>,
    pub fits: Vec<FitEntry>,
    pub context_keys: Vec<String>,
    pub message: Option<String>,
}

impl RunReport {
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        out.push_str("=== Inspection Pipeline Report ===\n\n");
        match &self.status {
            Some(status) => out.push_str(&format!("Run: {status}\n\n")),
            None => out.push_str("Run: not started\n\n"),
        }

        let failed = self
            .stages
            .iter()
            .filter(|e| e.outcome.as_ref().is_some_and(StageOutcome::is_failure))
            .count();
        out.push_str(&format!(
            "Stages ({} stages, {} failed):\n",
            self.stages.len(),
            failed,
        ));
        for entry in &self.stages {
            let manual = if entry.manual { " [MANUAL]" } else { "" };
            out.push_str(&format!(
                "  [{}] {} \"{}\"{}: {}\n",
                entry.index,
                entry.kind,
                entry.name,
                manual,
                describe_outcome(entry.outcome.as_ref()),
            ));
        }

        if !self.fits.is_empty() {
            out.push_str(&format!("\nFits ({}):\n", self.fits.len()));
            for fit in &self.fits {
                out.push_str(&format!(
                    "  \"{}\": {} | inliers={} error={:.4}\n",
                    fit.name, fit.detail, fit.inlier_count, fit.fit_error,
                ));
            }
        }

        out.push_str(&format!("\nContext ({} keys):\n", self.context_keys.len()));
        for key in &self.context_keys {
            out.push_str(&format!("  {key}\n"));
        }

        match &self.message {
            None => out.push_str("\nErrors: none\n"),
            Some(msg) => out.push_str(&format!("\nErrors:\n  {msg}\n")),
        }
        out
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_text())
    }
}

impl PipelineBuilder {
    /// Snapshot the graph, the last run and the published fits.
    pub fn report(&self) -> RunReport {
        let run = self.last_run();
        let mut stages = Vec::new();
        let mut fits = Vec::new();

        for (index, id) in self.graph().execution_order().into_iter().enumerate() {
            let Some(stage) = self.graph().stage(id) else {
                continue;
            };
            stages.push(StageEntry {
                index,
                name: stage.name().to_string(),
                kind: stage.kind().to_string(),
                manual: stage.run_mode() == RunMode::Manual,
                outcome: run.and_then(|r| r.outcome(id)).cloned(),
            });

            if let Some(shape) = self.shape_of(id) {
                if let Some(result) = self.context().get(&keys::fit_result(shape, id)) {
                    fits.push(FitEntry {
                        name: stage.name().to_string(),
                        detail: describe_fit(&result),
                        inlier_count: result.inlier_count,
                        fit_error: result.fit_error,
                    });
                }
            }
        }

        RunReport {
            status: run.map(|r| format!("{:?}", r.status)),
            stages,
            fits,
            context_keys: self.context().keys().into_iter().map(String::from).collect(),
            message: run.and_then(|r| r.message.clone()),
        }
    }
}

fn describe_outcome(outcome: Option<&StageOutcome>) -> String {
    match outcome {
        None => "not run".to_string(),
        Some(StageOutcome::Skipped) => "skipped".to_string(),
        Some(StageOutcome::Completed {
            completion: Completion::Produced,
        }) => "ok".to_string(),
        Some(StageOutcome::Completed {
            completion: Completion::Sentinel { kind },
        }) => format!("no fit ({kind:?})"),
        Some(StageOutcome::Failed { kind, message }) => format!("FAILED {kind:?}: {message}"),
    }
}

fn describe_fit(result: &FitResult) -> String {
    match &result.model {
        None => format!("{} sentinel", result.shape),
        Some(Primitive::Circle { center, radius, .. }) => format!(
            "Circle r={:.3} at ({:.2}, {:.2}, {:.2})",
            radius, center.x, center.y, center.z,
        ),
        Some(Primitive::Line { length, direction, .. }) => format!(
            "Line length={:.3} dir=({:.2}, {:.2}, {:.2})",
            length, direction.x, direction.y, direction.z,
        ),
        Some(Primitive::Plane { normal, offset, .. }) => format!(
            "Plane n=({:.2}, {:.2}, {:.2}) d={:.3}",
            normal.x, normal.y, normal.z, offset,
        ),
        Some(Primitive::Sphere { center, radius }) => format!(
            "Sphere r={:.3} at ({:.2}, {:.2}, {:.2})",
            radius, center.x, center.y, center.z,
        ),
        Some(Primitive::Cylinder { radius, height, .. }) => {
            format!("Cylinder r={radius:.3} h={height:.3}")
        }
    }
}
