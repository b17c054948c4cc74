//! Output artifacts for the static site
//!
//! One CSV of display names per tier plus `patrons.json`. Everything is
//! rendered in memory first; files are only touched once every artifact has
//! rendered, and each file is replaced via temp file + rename so readers
//! never see a partial write.

use crate::classifier::{ClassifiedSupporter, Tier};
use patron_common::{Error, Result};
use serde::Serialize;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info};

/// Consolidated record file
pub const PATRONS_JSON_FILE: &str = "patrons.json";

/// Header of the per-tier CSVs
pub const CSV_HEADER: &str = "displayed_name";

/// CSV file holding one tier's names
pub fn tier_csv_file_name(tier: Tier) -> &'static str {
    match tier {
        Tier::Notus => "one_month_mentions.csv",
        Tier::Zephyrus => "six_month_mentions.csv",
        Tier::Boreas => "one_year_mentions.csv",
    }
}

/// One element of patrons.json
#[derive(Debug, Serialize)]
pub struct PatronRecord<'a> {
    pub member_id: &'a str,
    pub displayed_name: &'a str,
    pub tier: Tier,
    pub last_payment_timestamp: Option<&'a str>,
}

impl<'a> From<&'a ClassifiedSupporter> for PatronRecord<'a> {
    fn from(entry: &'a ClassifiedSupporter) -> Self {
        Self {
            member_id: &entry.supporter.member_id,
            displayed_name: &entry.supporter.displayed_name,
            tier: entry.tier,
            last_payment_timestamp: entry.supporter.last_payment_timestamp.as_deref(),
        }
    }
}

/// Render one tier's CSV: header row, then names in the given order
pub fn render_tier_csv<'a, I>(names: I) -> Result<Vec<u8>>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    writer.write_record([CSV_HEADER])?;
    for name in names {
        writer.write_record([name])?;
    }

    writer.into_inner().map_err(|e| Error::Io(e.into_error()))
}

/// Render patrons.json (pretty printed, trailing newline)
pub fn render_patrons_json(classified: &[ClassifiedSupporter]) -> Result<Vec<u8>> {
    let records: Vec<PatronRecord<'_>> = classified.iter().map(PatronRecord::from).collect();
    let mut bytes = serde_json::to_vec_pretty(&records)?;
    bytes.push(b'\n');
    Ok(bytes)
}

/// Render every artifact as (file name, contents)
pub fn render_outputs(classified: &[ClassifiedSupporter]) -> Result<Vec<(&'static str, Vec<u8>)>> {
    let mut outputs = Vec::with_capacity(Tier::ALL.len() + 1);

    for tier in Tier::ALL {
        let names = classified
            .iter()
            .filter(|entry| entry.tier == tier)
            .map(|entry| entry.supporter.displayed_name.as_str());
        outputs.push((tier_csv_file_name(tier), render_tier_csv(names)?));
    }

    outputs.push((PATRONS_JSON_FILE, render_patrons_json(classified)?));
    Ok(outputs)
}

/// Files written by one run
#[derive(Debug, Clone, Default)]
pub struct WriteReport {
    pub files: Vec<PathBuf>,
}

/// Writes the artifacts into a data directory
pub struct OutputWriter {
    data_dir: PathBuf,
}

impl OutputWriter {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Regenerate all artifacts from the classified set
    ///
    /// Every artifact is written to a synced temp file and every target is
    /// checked before the first rename, so a failure while writing leaves
    /// all previous outputs in place.
    pub fn write_all(&self, classified: &[ClassifiedSupporter]) -> Result<WriteReport> {
        let outputs = render_outputs(classified)?;

        fs::create_dir_all(&self.data_dir)?;

        let mut staged = Vec::with_capacity(outputs.len());
        for (file_name, contents) in &outputs {
            staged.push(self.stage_file(file_name, contents)?);
        }

        for (target, _) in &staged {
            check_replaceable(target)?;
        }

        let mut report = WriteReport::default();
        for (target, temp) in staged {
            debug!(temp = %temp.path().display(), target = %target.display(), "Renaming temp file into place");

            temp.persist(&target).map_err(|e| Error::Persist {
                path: target.display().to_string(),
                source: e.error,
            })?;

            info!(path = %target.display(), "Wrote output file");
            report.files.push(target);
        }

        Ok(report)
    }

    /// Write `contents` to a synced temp file next to `data_dir/file_name`
    fn stage_file(&self, file_name: &str, contents: &[u8]) -> Result<(PathBuf, NamedTempFile)> {
        let target = self.data_dir.join(file_name);

        let mut temp = tempfile::Builder::new()
            .prefix(".patron-sync-")
            .suffix(".tmp")
            .tempfile_in(&self.data_dir)?;
        temp.write_all(contents)?;
        temp.as_file().sync_all()?;

        debug!(target = %target.display(), bytes = contents.len(), "Staged output file");
        Ok((target, temp))
    }
}

/// A rename onto `target` can only succeed if nothing or a plain file is there
fn check_replaceable(target: &Path) -> Result<()> {
    match fs::symlink_metadata(target) {
        Ok(metadata) if metadata.is_dir() => Err(Error::Persist {
            path: target.display().to_string(),
            source: io::Error::new(io::ErrorKind::Other, "target is a directory"),
        }),
        Ok(_) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(Error::Persist {
            path: target.display().to_string(),
            source: e,
        }),
    }
}
