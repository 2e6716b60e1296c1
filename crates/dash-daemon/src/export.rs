//! Report and metrics files on disk

use anyhow::{Context, Result};
use chrono::TimeZone;
use dash_core::{CardConfig, CurrentConditions, Reading, Timestamp};
use dash_history::{json_report, text_report, ReportFormat};
use std::fmt::Display;
use std::fs::{self, create_dir_all};
use std::path::{Path, PathBuf};

/// Writes dated text and JSON reports into one directory.
///
/// Reports for the same day overwrite each other, so the directory holds
/// one pair of files per day.
pub struct ReportWriter {
    dir: PathBuf,
}

impl ReportWriter {
    pub fn new<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        create_dir_all(&dir)
            .with_context(|| format!("Failed to create report directory {}", dir.display()))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write both reports, returning their paths
    pub fn write<Tz: TimeZone>(
        &self,
        current: Option<&CurrentConditions>,
        history: &[Reading],
        cards: &[CardConfig],
        generated_at: Timestamp,
        tz: &Tz,
    ) -> Result<Vec<PathBuf>>
    where
        Tz::Offset: Display,
    {
        let text_path = self.dir.join(ReportFormat::Text.file_name(generated_at, tz));
        write_atomic(&text_path, &text_report(current, history, generated_at, tz))?;

        let json = json_report(current, history, cards, generated_at, tz);
        let json_path = self.dir.join(ReportFormat::Json.file_name(generated_at, tz));
        write_atomic(&json_path, &serde_json::to_string_pretty(&json)?)?;

        Ok(vec![text_path, json_path])
    }
}

/// Replace a file's content through a temporary sibling and a rename
pub fn write_atomic(path: &Path, content: &str) -> Result<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    fs::write(&tmp, content).with_context(|| format!("Failed to write {}", tmp.display()))?;
    fs::rename(&tmp, path).with_context(|| format!("Failed to replace {}", path.display()))?;
    Ok(())
}
