//! `selfman remove <app> [--remove-source]`

use anyhow::Result;
use reconcile::Verb;

use crate::Context;
use crate::cli::RemoveArgs;
use crate::engine::{self, Session};
use crate::ui;

pub fn run(ctx: &Context, args: RemoveArgs) -> Result<()> {
    let session = Session::load()?;
    let app = session.app(&args.app)?;
    super::require_tools(app)?;

    let status = session.status(app)?;
    let plan = Verb::Remove {
        remove_source: args.remove_source,
    }
    .plan(app, &status)?;

    if needs_confirmation(&args, ctx.dry_run) {
        let prompt = format!(
            "Delete the source of {} at {}?",
            app.name(),
            app.source_path().display()
        );
        if !engine::confirm(&prompt)? {
            ui::warn("Aborted, nothing was removed");
            return Ok(());
        }
    }

    session.run(ctx, plan)?;
    Ok(())
}

/// Deleting a source tree asks first, unless told not to or only previewing
fn needs_confirmation(args: &RemoveArgs, dry_run: bool) -> bool {
    args.remove_source && !args.yes && !dry_run
}
