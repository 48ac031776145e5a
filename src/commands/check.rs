//! `selfman check <app>`: show every probed fact for one app

use anyhow::Result;
use reconcile::{AppSet, AppStatus, StatusProbe};
use serde::Serialize;

use crate::engine::Session;
use crate::ui;

/// One app's state, as printed by `check --json` and `list --json`
#[derive(Debug, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct StatusReport<'a> {
    pub name: &'a str,
    pub version: Option<&'a str>,
    pub flavor: Option<String>,
    pub label: &'static str,
    #[serde(flatten)]
    pub status: &'a AppStatus,
}

impl<'a> StatusReport<'a> {
    pub fn new(apps: &'a AppSet, name: &'a str, status: &'a AppStatus) -> Self {
        let app = apps.get(name);
        Self {
            name,
            version: app.map(|a| a.version()),
            flavor: app.map(|a| a.flavor().to_string()),
            label: status.label().as_str(),
            status,
        }
    }
}

pub fn run(app: &str, json: bool) -> Result<()> {
    let session = Session::load()?;
    let status = session.probe().probe_named(&session.apps, app)?;
    let report = StatusReport::new(&session.apps, app, &status);

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    ui::header(app);
    ui::kv("Status", &ui::status_label(status.label()));
    let Some(spec) = session.apps.get(app) else {
        return Ok(());
    };

    ui::kv("Version", spec.version());
    ui::kv("Flavor", &spec.flavor().to_string());
    ui::kv("Source", &spec.source_path().display().to_string());
    ui::kv("Artifact", &spec.artifact_path().display().to_string());
    ui::kv("Binary link", &spec.binary_path().display().to_string());
    println!();
    ui::kv("Source present", &ui::flag(status.source_present));
    ui::kv("Version present", &ui::flag(status.version_present));
    ui::kv("Target present", &ui::flag(status.target_present));
    ui::kv("Link present", &ui::flag(status.link_present));
    if spec.link_as_library() {
        ui::kv("Library link present", &ui::flag(status.lib_link_present));
    }
    if let Some(commit) = &status.current_commit {
        ui::kv("Current commit", commit);
    }
    if !status.available_versions.is_empty() {
        ui::kv("Available versions", &status.available_versions.join(", "));
    }
    println!();
    Ok(())
}
