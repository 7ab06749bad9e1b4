//! Error types callers may want to match on. Everything else travels as `anyhow::Error`.

use std::fmt;
use std::path::PathBuf;

/// Fatal layout/option problems detected before a run touches the filesystem.
#[derive(Debug)]
pub enum PreconditionError {
    DestinationExists(PathBuf),
    ParentMissing(PathBuf),
    DestinationFilesExist(Vec<PathBuf>),
    MissingSubsets { corpus: PathBuf, missing: Vec<String> },
    InvalidOptions(Vec<String>),
}

impl fmt::Display for PreconditionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DestinationExists(p) => write!(
                f,
                "{} already exists! Will not overwrite pre-existing dataset.",
                p.display()
            ),
            Self::ParentMissing(p) => write!(f, "{} does not exist, cannot proceed", p.display()),
            Self::DestinationFilesExist(paths) => {
                let list: Vec<String> = paths.iter().map(|p| p.display().to_string()).collect();
                write!(f, "{} already exist. Cannot proceed.", list.join(", "))
            }
            Self::MissingSubsets { corpus, missing } => write!(
                f,
                "The source {} is missing the {} sub-directories. Cannot proceed.",
                corpus.display(),
                missing.join(" & ")
            ),
            Self::InvalidOptions(problems) => write!(f, "invalid options: {}", problems.join("; ")),
        }
    }
}

impl std::error::Error for PreconditionError {}

/// Failure of one unit of work (one file extraction or one line append).
#[derive(Debug, Clone)]
pub struct UnitFailure {
    pub path: PathBuf,
    pub reason: String,
}

impl UnitFailure {
    pub fn new(path: impl Into<PathBuf>, err: &anyhow::Error) -> Self {
        // alternate formatting keeps the context chain on one line
        Self { path: path.into(), reason: format!("{:#}", err) }
    }
}

impl fmt::Display for UnitFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path.display(), self.reason)
    }
}

impl std::error::Error for UnitFailure {}

/// Result of one unit of work as collected by the scheduler.
pub type UnitOutcome<T> = Result<T, UnitFailure>;
