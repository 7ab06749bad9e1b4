use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default XPath selector: every `<abstract>` below the root element.
pub const DEFAULT_XPATH: &str = ".//abstract";
/// Default subset directory names, processed in this order.
pub const DEFAULT_SUBSETS: [&str; 3] = ["train", "eval", "test"];
/// Root under which a destination is derived when none is configured.
/// Overridable through the `XETL_DEST_ROOT` environment variable.
pub const DEFAULT_DESTINATION_ROOT: &str = "/data/text";

/// What to do when a single extraction or write unit fails.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Stop the whole run on the first failed unit.
    Abort,
    /// Log the failure, account for it in the report, keep going.
    Continue,
}

/// How a matched element becomes example text.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextMode {
    /// Flattened, tag-stripped text; optionally split into sentences.
    InnerText { sentence_level: bool },
    /// Serialized markup of the element itself.
    KeepMarkup,
}

/// User-facing options with sensible defaults and builder chaining.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractOptions {
    pub corpus: PathBuf,
    pub destination_dir: Option<PathBuf>, // None: derived from the corpus name
    pub sentence_level: bool,
    pub xpath: String,
    pub keep_xml: bool,
    pub remove_tail: bool,
    pub inclusion_probability: f64,
    pub subsets: Vec<String>,
    pub min_char_length: usize,
    pub batch_size: usize,           // files per synchronization barrier
    pub parallelism: Option<usize>,  // Some(N) for a dedicated N-thread pool, None for rayon's default
    pub failure_policy: FailurePolicy,
    pub seed: Option<u64>,           // fixes the sampling draws
    pub progress: bool,              // show progress bar
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            corpus: PathBuf::new(),
            destination_dir: None,
            sentence_level: false,
            xpath: DEFAULT_XPATH.to_string(),
            keep_xml: false,
            remove_tail: true,
            inclusion_probability: 1.0,
            subsets: DEFAULT_SUBSETS.iter().map(|s| s.to_string()).collect(),
            min_char_length: 120,
            batch_size: 1000,
            parallelism: None,
            failure_policy: FailurePolicy::Continue,
            seed: None,
            progress: true,
        }
    }
}

impl ExtractOptions {
    pub fn new(corpus: impl AsRef<Path>) -> Self {
        Self::default().with_corpus(corpus)
    }

    pub fn with_corpus(mut self, corpus: impl AsRef<Path>) -> Self {
        self.corpus = corpus.as_ref().to_path_buf();
        self
    }
    pub fn with_destination_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.destination_dir = Some(dir.as_ref().to_path_buf());
        self
    }
    pub fn with_sentence_level(mut self, yes: bool) -> Self {
        self.sentence_level = yes;
        self
    }
    pub fn with_xpath(mut self, xpath: impl Into<String>) -> Self {
        self.xpath = xpath.into();
        self
    }
    pub fn with_keep_xml(mut self, yes: bool) -> Self {
        self.keep_xml = yes;
        self
    }
    pub fn with_remove_tail(mut self, yes: bool) -> Self {
        self.remove_tail = yes;
        self
    }
    pub fn with_inclusion_probability(mut self, p: f64) -> Self {
        self.inclusion_probability = p;
        self
    }
    pub fn with_subsets<I, S>(mut self, subsets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.subsets = subsets.into_iter().map(Into::into).collect();
        self
    }
    pub fn with_min_char_length(mut self, n: usize) -> Self {
        self.min_char_length = n;
        self
    }
    pub fn with_batch_size(mut self, n: usize) -> Self {
        self.batch_size = n;
        self
    }
    pub fn with_parallelism(mut self, threads: usize) -> Self {
        self.parallelism = Some(threads);
        self
    }
    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
    pub fn with_progress(mut self, yes: bool) -> Self {
        self.progress = yes;
        self
    }

    /// Markup wins over sentence splitting when both are requested.
    pub fn text_mode(&self) -> TextMode {
        if self.keep_xml {
            TextMode::KeepMarkup
        } else {
            TextMode::InnerText { sentence_level: self.sentence_level }
        }
    }

    /// Configured destination, or `<root>/<corpus basename>`.
    pub fn resolved_destination(&self) -> PathBuf {
        if let Some(dir) = &self.destination_dir {
            if !dir.as_os_str().is_empty() {
                return dir.clone();
            }
        }
        let root = std::env::var("XETL_DEST_ROOT")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DESTINATION_ROOT));
        match self.corpus.file_name() {
            Some(name) => root.join(name),
            None => root.join("corpus"),
        }
    }

    /// Collect option problems that would make a run meaningless.
    pub(crate) fn problems(&self) -> Vec<String> {
        let mut out = Vec::new();
        let p = self.inclusion_probability;
        if !(0.0..=1.0).contains(&p) {
            out.push(format!("inclusion_probability must be within [0, 1], got {}", p));
        }
        if self.batch_size == 0 {
            out.push("batch_size must be at least 1".to_string());
        }
        if self.parallelism == Some(0) {
            out.push("parallelism must be at least 1".to_string());
        }
        if self.subsets.is_empty() {
            out.push("at least one subset is required".to_string());
        }
        let mut seen = std::collections::BTreeSet::new();
        for s in &self.subsets {
            let t = s.trim();
            if t.is_empty() || t.contains('/') || t.contains('\\') || t == "." || t == ".." {
                out.push(format!("invalid subset name {:?}", s));
            } else if !seen.insert(t) {
                out.push(format!("duplicate subset name {:?}", s));
            }
        }
        out
    }
}
