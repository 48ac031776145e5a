//! `selfman make-it-so <app>`
//!
//! Works from whatever state the app is in: installs what is missing,
//! relinks, and rebuilds only when fetch and checkout moved HEAD.

use anyhow::Result;
use reconcile::Verb;

use crate::Context;
use crate::engine::Session;

pub fn run(ctx: &Context, app: &str) -> Result<()> {
    let session = Session::load()?;
    super::plan_and_run(ctx, &session, app, Verb::MakeItSo)
}
