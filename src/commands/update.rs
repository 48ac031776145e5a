//! `selfman update <app>`

use anyhow::Result;
use reconcile::Verb;

use crate::Context;
use crate::engine::Session;

/// Fetch, check out the declared version and rebuild, whether or not
/// anything changed.
pub fn run(ctx: &Context, app: &str) -> Result<()> {
    let session = Session::load()?;
    super::plan_and_run(ctx, &session, app, Verb::Update)
}
