//! Observed state
//!
//! An [`AppStatus`] is a snapshot of what exists on disk for one app. It is
//! produced fresh by a [`StatusProbe`] before every planning call and never
//! persisted.

use crate::error::Result;
use crate::spec::{AppSet, AppSpec};
use serde::Serialize;
use std::fmt;

/// Facts probed for one application
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct AppStatus {
    /// A spec with this name is loaded.
    pub is_configured: bool,
    /// The source directory (or checkout) exists.
    pub source_present: bool,
    /// The desired version resolves within the source.
    pub version_present: bool,
    /// The artifact exists and is executable.
    pub target_present: bool,
    /// The binary symlink exists.
    pub link_present: bool,
    /// The library symlink exists.
    pub lib_link_present: bool,
    /// Versions known to the source, informational only.
    pub available_versions: Vec<String>,
    /// HEAD at probe time (git apps with a checkout only).
    pub current_commit: Option<String>,
}

impl AppStatus {
    /// Status reported for a name with no loaded spec.
    pub fn unconfigured() -> Self {
        Self::default()
    }

    /// Classify the overall state.
    pub fn label(&self) -> StatusLabel {
        if !self.is_configured {
            return StatusLabel::NotConfigured;
        }
        let flags = [
            self.source_present,
            self.version_present,
            self.target_present,
            self.link_present,
        ];
        if flags.iter().all(|f| *f) {
            StatusLabel::InstalledAndLinked
        } else if flags.iter().all(|f| !*f) {
            StatusLabel::NotPresent
        } else {
            StatusLabel::Inconsistent
        }
    }
}

/// Overall classification of an [`AppStatus`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusLabel {
    InstalledAndLinked,
    NotPresent,
    Inconsistent,
    NotConfigured,
}

impl StatusLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InstalledAndLinked => "installed & linked",
            Self::NotPresent => "not present",
            Self::Inconsistent => "partially present — inconsistent state",
            Self::NotConfigured => "unknown app — not configured",
        }
    }
}

impl fmt::Display for StatusLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Source of observed state
pub trait StatusProbe {
    /// Probe the on-disk state of a configured app.
    fn probe(&self, app: &AppSpec) -> Result<AppStatus>;

    /// Probe by name; unknown names report an unconfigured status.
    fn probe_named(&self, apps: &AppSet, name: &str) -> Result<AppStatus> {
        match apps.get(name) {
            Some(app) => self.probe(app),
            None => Ok(AppStatus::unconfigured()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(source: bool, version: bool, target: bool, link: bool) -> AppStatus {
        AppStatus {
            is_configured: true,
            source_present: source,
            version_present: version,
            target_present: target,
            link_present: link,
            ..Default::default()
        }
    }

    #[test]
    fn test_label_over_all_flag_combinations() {
        for bits in 0u8..16 {
            let flags = [bits & 1 != 0, bits & 2 != 0, bits & 4 != 0, bits & 8 != 0];
            let s = status(flags[0], flags[1], flags[2], flags[3]);
            let expected = match bits {
                15 => StatusLabel::InstalledAndLinked,
                0 => StatusLabel::NotPresent,
                _ => StatusLabel::Inconsistent,
            };
            assert_eq!(s.label(), expected, "flags {flags:?}");

            let unconfigured = AppStatus {
                is_configured: false,
                ..s
            };
            assert_eq!(unconfigured.label(), StatusLabel::NotConfigured);
        }
    }

    #[test]
    fn test_lib_link_does_not_affect_label() {
        let mut s = status(true, true, true, true);
        s.lib_link_present = false;
        assert_eq!(s.label(), StatusLabel::InstalledAndLinked);
    }

    #[test]
    fn test_label_text() {
        assert_eq!(
            status(true, true, true, true).label().to_string(),
            "installed & linked"
        );
        assert_eq!(status(false, false, false, false).label().to_string(), "not present");
        assert_eq!(
            status(true, false, false, false).label().to_string(),
            "partially present — inconsistent state"
        );
        assert_eq!(
            AppStatus::unconfigured().label().to_string(),
            "unknown app — not configured"
        );
    }

    struct FixedProbe;

    impl StatusProbe for FixedProbe {
        fn probe(&self, _app: &AppSpec) -> Result<AppStatus> {
            Ok(status(true, true, true, true))
        }
    }

    #[test]
    fn test_probe_named_unknown_app() {
        let apps = AppSet::from_definitions(
            vec![crate::spec::tests::git_def("known", "main")],
            crate::spec::tests::test_layout(),
        )
        .unwrap();

        let known = FixedProbe.probe_named(&apps, "known").unwrap();
        assert_eq!(known.label(), StatusLabel::InstalledAndLinked);

        let unknown = FixedProbe.probe_named(&apps, "nope").unwrap();
        assert_eq!(unknown.label(), StatusLabel::NotConfigured);
    }
}
