//! Execution engine for selfman
//!
//! The engine ties the collaborators together:
//! 1. Loading - system settings and app definitions
//! 2. Probing - observed state from disk
//! 3. Running - plan preview or apply through the console reporter

pub mod reporter;

use anyhow::{Context as _, Result};
use reconcile::{
    AppSet, AppSpec, AppStatus, ExecContext, ExecuteOptions, ExecuteSummary, LocalFs,
    OperationPlan, StatusProbe, TextReporter,
};
use std::io::{self, IsTerminal};

use crate::Context;
use crate::config::Settings;
use crate::probe::DiskProbe;
use crate::runner::SystemRunner;

pub use reporter::ConsoleReporter;

/// Loaded configuration plus the collaborators that act on it
pub struct Session {
    pub settings: Settings,
    pub apps: AppSet,
    runner: SystemRunner,
}

impl Session {
    /// Load settings and every app definition.
    pub fn load() -> Result<Self> {
        let settings = Settings::load()?;
        let apps = settings.load_apps()?;
        if let Some(origin) = &settings.origin {
            log::debug!("Using system config {}", origin.display());
        }
        log::debug!(
            "Loaded {} app(s) from {}",
            apps.len(),
            settings.app_config_dir.display()
        );
        let runner = SystemRunner::new(settings.timeouts);
        Ok(Self {
            settings,
            apps,
            runner,
        })
    }

    /// Look up a configured app.
    pub fn app(&self, name: &str) -> Result<&AppSpec> {
        Ok(self.apps.require(name)?)
    }

    pub fn probe(&self) -> DiskProbe<'_> {
        DiskProbe::new(&self.runner)
    }

    /// Probe the current state of an app.
    pub fn status(&self, app: &AppSpec) -> Result<AppStatus> {
        self.probe()
            .probe(app)
            .with_context(|| format!("Failed to probe {}", app.name()))
    }

    /// Preview or apply a plan on the real system.
    pub fn run(&self, ctx: &Context, plan: OperationPlan) -> Result<ExecuteSummary> {
        log::debug!("{} {}: {} step(s) planned", plan.verb, plan.app, plan.len());

        let fs = LocalFs;
        let exec = ExecContext::new(&self.runner, &fs);
        let opts = ExecuteOptions {
            dry_run: ctx.dry_run,
            verbose: ctx.verbose > 0,
        };
        let summary = if ctx.quiet || io::stdout().is_terminal() {
            reconcile::execute(plan, opts, &exec, &mut ConsoleReporter::new(ctx.quiet))?
        } else {
            // Piped output gets plain lines
            reconcile::execute(plan, opts, &exec, &mut TextReporter::new(io::stdout()))?
        };
        Ok(summary)
    }
}

/// Ask the user to confirm a destructive step
pub fn confirm(prompt: &str) -> Result<bool> {
    use dialoguer::Confirm;

    let confirmed = Confirm::new()
        .with_prompt(prompt)
        .default(false)
        .interact()?;

    Ok(confirmed)
}
