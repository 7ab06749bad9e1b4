//! Corpus scanning and the on-disk layout of a destination dataset.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Extensions eligible for extraction (exact, case-sensitive match).
pub const ALLOWED_EXTENSIONS: [&str; 3] = ["xml", "XML", "nxml"];

pub fn has_allowed_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| ALLOWED_EXTENSIONS.contains(&e))
        .unwrap_or(false)
}

/// List the eligible source files directly inside `dir` (no recursion), in
/// directory-iteration order. A subset with no matching file yields an empty list.
pub fn scan_subset(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        anyhow::bail!("{} is not a directory", dir.display());
    }
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let ent = match entry {
            Ok(ent) => ent,
            Err(e) => {
                tracing::warn!(dir=%dir.display(), error=%e, "Skipping unreadable directory entry");
                continue;
            }
        };
        if !ent.file_type().is_file() && !is_file_symlink(ent.path()) {
            continue;
        }
        if has_allowed_extension(ent.path()) {
            files.push(ent.path().to_path_buf());
        }
    }
    Ok(files)
}

fn is_file_symlink(path: &Path) -> bool {
    std::fs::metadata(path).map(|m| m.is_file()).unwrap_or(false)
}

/// Source directory and destination file of one subset.
#[derive(Clone, Debug)]
pub struct SubsetPaths {
    pub name: String,
    pub source_dir: PathBuf,
    pub destination_file: PathBuf,
}

/// Corpus root, destination directory, and the per-subset pairs between them.
#[derive(Clone, Debug)]
pub struct DatasetLayout {
    pub corpus: PathBuf,
    pub destination_dir: PathBuf,
    pub subsets: Vec<SubsetPaths>,
}

impl DatasetLayout {
    pub fn new(corpus: &Path, destination_dir: &Path, subsets: &[String]) -> Self {
        let subsets = subsets
            .iter()
            .map(|name| SubsetPaths {
                name: name.clone(),
                source_dir: corpus.join(name),
                destination_file: destination_dir.join(format!("{}.txt", name)),
            })
            .collect();
        Self {
            corpus: corpus.to_path_buf(),
            destination_dir: destination_dir.to_path_buf(),
            subsets,
        }
    }

    /// Parent of the destination directory; `.` for a bare relative name.
    pub fn destination_parent(&self) -> PathBuf {
        match self.destination_dir.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }

    pub fn existing_destination_files(&self) -> Vec<PathBuf> {
        self.subsets
            .iter()
            .filter(|s| s.destination_file.exists())
            .map(|s| s.destination_file.clone())
            .collect()
    }

    pub fn missing_subsets(&self) -> Vec<String> {
        self.subsets
            .iter()
            .filter(|s| !s.source_dir.is_dir())
            .map(|s| s.name.clone())
            .collect()
    }

    pub fn create_destination(&self) -> Result<()> {
        std::fs::create_dir(&self.destination_dir)
            .with_context(|| format!("create {}", self.destination_dir.display()))
    }
}
