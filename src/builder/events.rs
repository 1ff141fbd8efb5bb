//! Packaging events for `--message-format json`.
//!
//! Each event is serialized as one JSON object per line, tagged by
//! `reason`. Fields may be added; existing ones are not renamed.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

/// A coarse step of a packaging run, as shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Fetching,
    Configuring,
    Compiling,
    Installing,
    Packaged,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Fetching => "Fetching",
            Stage::Configuring => "Configuring",
            Stage::Compiling => "Compiling",
            Stage::Installing => "Installing",
            Stage::Packaged => "Packaged",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Receives stage transitions from the pipeline.
pub trait StageListener {
    fn stage(&self, stage: Stage, detail: &str);
}

/// Listener that drops every notification.
#[derive(Debug, Clone, Copy, Default)]
pub struct Silent;

impl StageListener for Silent {
    fn stage(&self, _stage: Stage, _detail: &str) {}
}

/// A packaging event.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "reason")]
pub enum BuildEvent {
    /// A stage started.
    #[serde(rename = "stage-started")]
    StageStarted { stage: Stage, detail: String },

    /// The package tree and metadata were written.
    #[serde(rename = "package-finished")]
    PackageFinished {
        package_id: String,
        package_dir: PathBuf,
        /// Number of files collected into the tree
        files: usize,
        duration_ms: u64,
    },

    /// The run failed.
    #[serde(rename = "package-failed")]
    PackageFailed {
        message: String,
        /// Diagnostic code, e.g. `dockyard::build::stage_failed`
        #[serde(skip_serializing_if = "Option::is_none")]
        code: Option<String>,
    },
}

impl BuildEvent {
    pub fn stage(stage: Stage, detail: impl Into<String>) -> Self {
        BuildEvent::StageStarted {
            stage,
            detail: detail.into(),
        }
    }

    /// Serialize to a single JSON line.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_event_json() {
        let json = BuildEvent::stage(Stage::Configuring, "libpq 10.4").to_json();
        assert_eq!(
            json,
            r#"{"reason":"stage-started","stage":"configuring","detail":"libpq 10.4"}"#
        );
    }

    #[test]
    fn test_failed_event_skips_missing_code() {
        let json = BuildEvent::PackageFailed {
            message: "boom".to_string(),
            code: None,
        }
        .to_json();
        assert!(!json.contains("code"));
        assert!(json.contains(r#""reason":"package-failed""#));
    }
}
