//! Snapshot Persistence Module
//!
//! Writes the price snapshot as pretty JSON and as a `name,price` CSV.
//! Both files are staged next to their targets and renamed into place only
//! after both serialized, so a failed run never replaces a good snapshot.

use anyhow::{Context, Result};
use csv::WriterBuilder;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::types::PriceSnapshot;

/// CSV row for one market
#[derive(Debug, Clone, Serialize)]
pub struct PriceRow<'a> {
    pub name: &'a str,
    pub price: String,
}

/// Where the two output files go
#[derive(Debug, Clone)]
pub struct SnapshotWriter {
    dir: PathBuf,
    json_file: String,
    csv_file: String,
}

/// Paths written by [`SnapshotWriter::write`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenFiles {
    pub json: PathBuf,
    pub csv: PathBuf,
}

impl SnapshotWriter {
    pub fn new(dir: impl Into<PathBuf>, json_file: &str, csv_file: &str) -> Self {
        Self {
            dir: dir.into(),
            json_file: json_file.to_string(),
            csv_file: csv_file.to_string(),
        }
    }

    /// Render the JSON document
    pub fn render_json(snapshot: &PriceSnapshot) -> Result<String> {
        serde_json::to_string_pretty(snapshot).context("Failed to serialize snapshot JSON")
    }

    /// Render the CSV table, one row per market in snapshot order
    pub fn render_csv(snapshot: &PriceSnapshot) -> Result<Vec<u8>> {
        let mut writer = WriterBuilder::new().has_headers(true).from_writer(Vec::new());
        for market in &snapshot.markets {
            writer
                .serialize(PriceRow {
                    name: &market.name,
                    price: market.price.to_string(),
                })
                .context("Failed to write price row")?;
        }
        writer
            .into_inner()
            .map_err(|e| anyhow::anyhow!("Failed to flush CSV buffer: {}", e))
    }

    fn stage(path: &Path, contents: &[u8]) -> Result<PathBuf> {
        let mut staged = path.as_os_str().to_owned();
        staged.push(".tmp");
        let staged = PathBuf::from(staged);
        if let Err(e) = fs::write(&staged, contents) {
            Self::discard(&[staged.as_path()]);
            return Err(e).with_context(|| format!("Failed writing {}", staged.display()));
        }
        Ok(staged)
    }

    /// Best-effort removal of staged files after a failed write
    fn discard(staged: &[&Path]) {
        for path in staged {
            match fs::remove_file(path) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!(path = %path.display(), error = %e, "Failed removing staged file"),
            }
        }
    }

    /// Write both files. Nothing at the final paths changes unless both
    /// documents rendered and staged successfully.
    pub fn write(&self, snapshot: &PriceSnapshot) -> Result<WrittenFiles> {
        let json = Self::render_json(snapshot)?;
        let csv = Self::render_csv(snapshot)?;

        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed creating {}", self.dir.display()))?;

        let json_path = self.dir.join(&self.json_file);
        let csv_path = self.dir.join(&self.csv_file);

        let json_staged = Self::stage(&json_path, json.as_bytes())?;
        let csv_staged = match Self::stage(&csv_path, &csv) {
            Ok(staged) => staged,
            Err(e) => {
                Self::discard(&[json_staged.as_path()]);
                return Err(e);
            }
        };

        if let Err(e) = fs::rename(&json_staged, &json_path) {
            Self::discard(&[json_staged.as_path(), csv_staged.as_path()]);
            return Err(e)
                .with_context(|| format!("Failed moving {} into place", json_path.display()));
        }
        if let Err(e) = fs::rename(&csv_staged, &csv_path) {
            Self::discard(&[csv_staged.as_path()]);
            return Err(e)
                .with_context(|| format!("Failed moving {} into place", csv_path.display()));
        }

        info!(
            json = %json_path.display(),
            csv = %csv_path.display(),
            markets = snapshot.markets.len(),
            "Snapshot written"
        );

        Ok(WrittenFiles {
            json: json_path,
            csv: csv_path,
        })
    }
}
