mod config;
mod error;
mod paths;
mod util;
mod progress;

mod xml;
mod selector;
mod segment;
mod filters;
mod extract;

mod sampling;
mod writer;
mod concurrency;
mod scheduler;
mod report;
mod pipeline;

pub use crate::config::{ExtractOptions, FailurePolicy, TextMode, DEFAULT_SUBSETS, DEFAULT_XPATH};
pub use crate::error::{PreconditionError, UnitFailure, UnitOutcome};
pub use crate::pipeline::CorpusExtractor;
pub use crate::report::{FailureRecord, RunReport, SubsetReport};

// corpus layout and scanning
pub use crate::paths::{scan_subset, has_allowed_extension, DatasetLayout, SubsetPaths, ALLOWED_EXTENSIONS};

// XML tree, selector, and per-file extraction
pub use crate::xml::{NodeId, XmlDocument};
pub use crate::selector::{Selector, SelectorError};
pub use crate::extract::{extract_file, extract_from_str, extract_from_document, ExtractSpec, FileExamples};

// sentence splitting adapter
pub use crate::segment::{NoSegmenter, RuleSegmenter, SentenceSegmenter};

// cleanup and length filter
pub use crate::filters::{accept, cleanup, exceeds_min_length};

// sampling, writing, scheduling
pub use crate::sampling::SamplingGate;
pub use crate::writer::AppendWriter;
pub use crate::concurrency::{AnyPool, InlinePool, RayonPool, WorkerPool};
pub use crate::scheduler::BatchScheduler;

// logging setup for binaries
pub use crate::util::{init_tracing_once, init_tracing_with_default};
