#![allow(dead_code)]

use std::fs::{self, File};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Exactly 50 characters.
pub const LONG_ABSTRACT: &str = "The cortex responds to stimuli in seventy cases ok";
/// Exactly 5 characters.
pub const SHORT_ABSTRACT: &str = "Tiny.";

/// Scratch area holding a corpus root and a parent for destinations.
/// The temp directory is removed when the fixture is dropped.
pub struct Fixture {
    _tmp: TempDir,
    pub corpus: PathBuf,
    pub out_root: PathBuf,
}

impl Fixture {
    /// Corpus with empty `train`, `eval`, `test` sub-directories.
    pub fn new() -> Self {
        Self::with_subsets(&["train", "eval", "test"])
    }

    pub fn with_subsets(subsets: &[&str]) -> Self {
        let tmp = tempfile::tempdir().unwrap();
        let corpus = tmp.path().join("corpus");
        for s in subsets {
            fs::create_dir_all(corpus.join(s)).unwrap();
        }
        let out_root = tmp.path().join("out");
        fs::create_dir_all(&out_root).unwrap();
        Self { _tmp: tmp, corpus, out_root }
    }

    /// Write a source document under `<corpus>/<subset>/<name>`.
    pub fn add_file(&self, subset: &str, name: &str, content: &str) -> PathBuf {
        let path = self.corpus.join(subset).join(name);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        let mut f = File::create(&path).unwrap();
        f.write_all(content.as_bytes()).unwrap();
        path
    }

    /// A destination path that does not exist yet.
    pub fn dest(&self, name: &str) -> PathBuf {
        self.out_root.join(name)
    }
}

/// `<article>` with one `<abstract>` per entry.
pub fn article_with_abstracts(abstracts: &[&str]) -> String {
    let mut s = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<article>\n  <front>\n");
    for a in abstracts {
        s.push_str(&format!("    <abstract>{}</abstract>\n", a));
    }
    s.push_str("  </front>\n</article>\n");
    s
}

/// Read a text file line-by-line, keeping empty lines.
pub fn read_lines(path: &Path) -> Vec<String> {
    let f = File::open(path).unwrap();
    BufReader::new(f).lines().map(|l| l.unwrap()).collect()
}

pub fn sorted(mut v: Vec<String>) -> Vec<String> {
    v.sort();
    v
}
