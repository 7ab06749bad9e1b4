use crate::util::open_append_with_backoff;
use anyhow::{Context, Result};
use parking_lot::Mutex;
use std::borrow::Cow;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Append target for one subset's destination file.
///
/// Every `append` opens the file in append mode and writes one complete line
/// with a single `write_all`, under a lock, so concurrent write units never
/// interleave bytes and never rewrite earlier content.
#[derive(Debug)]
pub struct AppendWriter {
    path: PathBuf,
    lock: Mutex<()>,
}

impl AppendWriter {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self { path: path.as_ref().to_path_buf(), lock: Mutex::new(()) }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create the file if it does not exist yet; existing content is left alone.
    pub fn touch(&self) -> Result<()> {
        open_append_with_backoff(&self.path, 16, 50)
            .with_context(|| format!("create {}", self.path.display()))?;
        Ok(())
    }

    pub fn append(&self, example: &str) -> Result<()> {
        let line = as_single_line(example);
        let mut buf = String::with_capacity(line.len() + 1);
        buf.push_str(&line);
        buf.push('\n');

        let mut f = open_append_with_backoff(&self.path, 16, 50)
            .with_context(|| format!("open {} for append", self.path.display()))?;
        let _guard = self.lock.lock();
        f.write_all(buf.as_bytes())
            .with_context(|| format!("append to {}", self.path.display()))?;
        Ok(())
    }
}

/// Strip surrounding line breaks and turn any remaining one into a space.
fn as_single_line(s: &str) -> Cow<'_, str> {
    let trimmed = s.trim_matches(|c: char| c == '\n' || c == '\r');
    if trimmed.contains(['\n', '\r']) {
        Cow::Owned(trimmed.replace(['\n', '\r'], " "))
    } else {
        Cow::Borrowed(trimmed)
    }
}
