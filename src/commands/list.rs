//! `selfman list`

use anyhow::Result;
use reconcile::{AppSpec, StatusProbe};

use super::check::StatusReport;
use crate::engine::Session;
use crate::ui;

pub fn run(json: bool) -> Result<()> {
    let session = Session::load()?;
    let probe = session.probe();

    let mut statuses = Vec::with_capacity(session.apps.len());
    for app in session.apps.iter() {
        match probe.probe(app) {
            Ok(status) => statuses.push((app, status)),
            Err(e) => ui::warn(&format!("{}: {e}", app.name())),
        }
    }

    if json {
        let reports: Vec<_> = statuses
            .iter()
            .map(|(app, status)| StatusReport::new(&session.apps, app.name(), status))
            .collect();
        println!("{}", serde_json::to_string_pretty(&reports)?);
        return Ok(());
    }

    if session.apps.is_empty() {
        ui::info(&format!(
            "No apps configured in {}",
            session.settings.app_config_dir.display()
        ));
        return Ok(());
    }

    for (app, status) in &statuses {
        println!("{}", line(app, &ui::status_label(status.label())));
    }
    Ok(())
}

/// `name @ version (label)`
fn line(app: &AppSpec, label: &str) -> String {
    format!("{} @ {} ({label})", app.name(), app.version())
}

#[cfg(test)]
mod tests {
    use super::*;
    use reconcile::{AppDefinition, AppSet, Flavor, Layout, StatusLabel};
    use std::path::Path;
    use std::sync::Arc;

    fn def(name: &str, version: &str) -> AppDefinition {
        AppDefinition {
            name: name.to_string(),
            flavor: Some(Flavor::Git),
            version: version.to_string(),
            remote_repo: Some(format!("https://example.com/{name}.git")),
            ..Default::default()
        }
    }

    #[test]
    fn test_lines_sorted_by_name() {
        let layout = Arc::new(Layout::under(
            Path::new("/tmp/selfman-list/data"),
            Path::new("/tmp/selfman-list/bin"),
            Path::new("/tmp/selfman-list/lib"),
            "/bin/sh",
        ));
        let apps =
            AppSet::from_definitions(vec![def("zoxide", "v0.9.4"), def("bat", "master")], layout)
                .unwrap();

        let lines: Vec<_> = apps
            .iter()
            .map(|app| line(app, StatusLabel::NotPresent.as_str()))
            .collect();

        assert_eq!(
            lines,
            vec!["bat @ master (not present)", "zoxide @ v0.9.4 (not present)"]
        );
    }
}
