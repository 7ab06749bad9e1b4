//! Run accounting. `examples_written` is the authoritative per-subset count.

use crate::error::UnitFailure;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

#[derive(Clone, Debug, Serialize)]
pub struct FailureRecord {
    pub path: PathBuf,
    pub reason: String,
}

impl From<UnitFailure> for FailureRecord {
    fn from(f: UnitFailure) -> Self {
        Self { path: f.path, reason: f.reason }
    }
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct SubsetReport {
    pub subset: String,
    pub destination: PathBuf,
    pub files_scanned: u64,
    pub files_failed: u64,
    pub files_without_matches: u64,
    pub batches: u64,
    pub examples_extracted: u64,
    pub examples_sampled_out: u64,
    pub examples_written: u64,
    pub writes_failed: u64,
    pub failures: Vec<FailureRecord>,
}

impl SubsetReport {
    pub fn new(subset: impl Into<String>, destination: impl Into<PathBuf>) -> Self {
        Self { subset: subset.into(), destination: destination.into(), ..Default::default() }
    }

    /// Every extracted example is either written, sampled out, or a failed write.
    pub fn is_balanced(&self) -> bool {
        self.examples_extracted == self.examples_written + self.examples_sampled_out + self.writes_failed
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct RunReport {
    pub corpus: PathBuf,
    pub destination_dir: PathBuf,
    pub xpath: String,
    pub started_at: String,
    pub finished_at: String,
    pub subsets: Vec<SubsetReport>,
}

impl RunReport {
    /// Destination file -> number of examples written.
    pub fn counts(&self) -> BTreeMap<PathBuf, u64> {
        self.subsets
            .iter()
            .map(|s| (s.destination.clone(), s.examples_written))
            .collect()
    }

    pub fn total_written(&self) -> u64 {
        self.subsets.iter().map(|s| s.examples_written).sum()
    }

    pub fn total_failures(&self) -> u64 {
        self.subsets.iter().map(|s| s.files_failed + s.writes_failed).sum()
    }

    pub fn subset(&self, name: &str) -> Option<&SubsetReport> {
        self.subsets.iter().find(|s| s.subset == name)
    }
}

pub(crate) fn now_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| String::from("unknown"))
}
