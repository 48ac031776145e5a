//! Command handlers, one module per verb

pub mod check;
pub mod install;
pub mod list;
pub mod make_it_so;
pub mod remove;
pub mod update;

use anyhow::Result;
use reconcile::{AppSpec, Flavor, Verb};

use crate::Context;
use crate::engine::Session;
use crate::runner;

/// Fail early when a tool the app's steps need is not installed
fn require_tools(app: &AppSpec) -> Result<()> {
    if app.flavor() == Flavor::Git {
        runner::require_executable("git")?;
    }
    Ok(())
}

/// Probe, plan and run one verb against one app
fn plan_and_run(ctx: &Context, session: &Session, name: &str, verb: Verb) -> Result<()> {
    let app = session.app(name)?;
    require_tools(app)?;

    let status = session.status(app)?;
    log::debug!("{name} is {}", status.label());

    let plan = verb.plan(app, &status)?;
    session.run(ctx, plan)?;
    Ok(())
}
