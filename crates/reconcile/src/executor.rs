//! Execution engine - previews or applies a plan, one step at a time
//!
//! A dry run renders every step (recursing into meta steps) and never calls
//! an execute routine. Apply runs steps in order and stops at the first
//! failure; steps already applied stay applied.

use crate::context::ExecContext;
use crate::error::{Error, Result};
use crate::operation::Operation;
use crate::planner::OperationPlan;
use std::io::Write;

/// Options for execution
#[derive(Debug, Clone, Copy, Default)]
pub struct ExecuteOptions {
    /// Don't make changes, just show what would happen
    pub dry_run: bool,
    /// Render full step descriptions instead of the top line only
    pub verbose: bool,
}

/// How a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Applied,
    Previewed,
}

/// Summary of a successful run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecuteSummary {
    pub outcome: Outcome,
    /// Top-level steps that ran to completion
    pub completed: usize,
}

/// Progress callback for plan execution
///
/// Implement this trait to receive updates while a plan is previewed or
/// applied.
pub trait Reporter {
    /// Called once before the first step
    fn on_plan_start(&mut self, plan: &OperationPlan, dry_run: bool);

    /// Called for every rendered step during a dry run
    fn on_preview(&mut self, rendered: &str);

    /// Called before a step executes
    fn on_step_start(&mut self, index: usize, total: usize, rendered: &str);

    /// Called after a step succeeded, with the step's message
    fn on_step_success(&mut self, message: &str);

    /// Called when a step failed; `skipped` steps will not be attempted
    fn on_step_failure(&mut self, error: &Error, skipped: usize);

    /// Called once after the last step of a successful run
    fn on_plan_complete(&mut self, summary: &ExecuteSummary);
}

/// No-op reporter
pub struct NoReporter;

impl Reporter for NoReporter {
    fn on_plan_start(&mut self, _plan: &OperationPlan, _dry_run: bool) {}
    fn on_preview(&mut self, _rendered: &str) {}
    fn on_step_start(&mut self, _index: usize, _total: usize, _rendered: &str) {}
    fn on_step_success(&mut self, _message: &str) {}
    fn on_step_failure(&mut self, _error: &Error, _skipped: usize) {}
    fn on_plan_complete(&mut self, _summary: &ExecuteSummary) {}
}

/// Plain-text reporter writing to any [`Write`]
///
/// Suited to logs and pipes, where colors and spinners get in the way.
pub struct TextReporter<W: Write> {
    out: W,
}

impl<W: Write> TextReporter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn line(&mut self, text: &str) {
        let _ = writeln!(self.out, "{text}");
    }
}

impl<W: Write> Reporter for TextReporter<W> {
    fn on_plan_start(&mut self, plan: &OperationPlan, dry_run: bool) {
        let mode = if dry_run { "Would run" } else { "Running" };
        self.line(&format!(
            "{mode} {} for {} ({} step(s))",
            plan.verb,
            plan.app,
            plan.len()
        ));
    }

    fn on_preview(&mut self, rendered: &str) {
        self.line(rendered);
    }

    fn on_step_start(&mut self, index: usize, total: usize, rendered: &str) {
        self.line(&format!("[{index}/{total}] {rendered}"));
    }

    fn on_step_success(&mut self, message: &str) {
        self.line(&format!("    ok: {message}"));
    }

    fn on_step_failure(&mut self, error: &Error, skipped: usize) {
        self.line(&format!("    failed: {error}"));
        if skipped > 0 {
            self.line(&format!("    {skipped} remaining step(s) not attempted"));
        }
    }

    fn on_plan_complete(&mut self, summary: &ExecuteSummary) {
        match summary.outcome {
            Outcome::Previewed => self.line("Dry run, nothing was changed"),
            Outcome::Applied => self.line(&format!("Done, {} step(s) applied", summary.completed)),
        }
    }
}

/// Preview or apply a plan
///
/// # Arguments
/// * `plan` - The plan to run; consumed
/// * `opts` - Execution options (dry_run, verbose)
/// * `ctx` - Collaborators the steps execute through
/// * `reporter` - Progress callback
///
/// # Returns
/// Summary of the run, or the first step error
pub fn execute<R: Reporter>(
    plan: OperationPlan,
    opts: ExecuteOptions,
    ctx: &ExecContext<'_>,
    reporter: &mut R,
) -> Result<ExecuteSummary> {
    reporter.on_plan_start(&plan, opts.dry_run);

    if opts.dry_run {
        for op in &plan.operations {
            preview(op, opts.verbose, 0, reporter);
        }
        let summary = ExecuteSummary {
            outcome: Outcome::Previewed,
            completed: 0,
        };
        reporter.on_plan_complete(&summary);
        return Ok(summary);
    }

    let total = plan.len();
    let mut completed = 0;

    for (i, op) in plan.operations.iter().enumerate() {
        reporter.on_step_start(i + 1, total, &op.describe().render(opts.verbose, 0));
        log::info!("{} {}: step {}/{total} ({})", plan.verb, plan.app, i + 1, op.label());

        match op.execute(ctx) {
            Ok(message) => {
                reporter.on_step_success(&message);
                completed += 1;
            }
            Err(e) => {
                log::debug!("{} {} stopped at step {}: {e}", plan.verb, plan.app, i + 1);
                reporter.on_step_failure(&e, total - i - 1);
                return Err(e);
            }
        }
    }

    let summary = ExecuteSummary {
        outcome: Outcome::Applied,
        completed,
    };
    reporter.on_plan_complete(&summary);
    Ok(summary)
}

fn preview<R: Reporter>(op: &Operation, verbose: bool, depth: usize, reporter: &mut R) {
    reporter.on_preview(&op.describe().render(verbose, depth));
    for inner in op.inner() {
        preview(inner, verbose, depth + 1, reporter);
    }
}
