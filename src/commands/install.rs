//! `selfman install <app>`: obtain, build and link an app that is not present

use anyhow::Result;
use reconcile::Verb;

use crate::Context;
use crate::engine::Session;

pub fn run(ctx: &Context, app: &str) -> Result<()> {
    let session = Session::load()?;
    super::plan_and_run(ctx, &session, app, Verb::Install)
}
