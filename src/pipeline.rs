use crate::concurrency::{AnyPool, WorkerPool};
use crate::config::ExtractOptions;
use crate::error::PreconditionError;
use crate::extract::ExtractSpec;
use crate::paths::{scan_subset, DatasetLayout};
use crate::report::{now_rfc3339, RunReport};
use crate::sampling::SamplingGate;
use crate::scheduler::BatchScheduler;
use crate::segment::{RuleSegmenter, SentenceSegmenter};
use crate::selector::Selector;
use crate::util::init_tracing_once;
use crate::writer::AppendWriter;
use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;

/// Extract examples from a `train`/`eval`/`test`-style XML corpus into one
/// line-per-example `<subset>.txt` file per subset.
///
/// Construction validates the layout and creates the (new) destination
/// directory; nothing is written until [`CorpusExtractor::extract_from_corpus`].
pub struct CorpusExtractor {
    opts: ExtractOptions,
    layout: DatasetLayout,
    spec: ExtractSpec,
}

impl CorpusExtractor {
    pub fn new(opts: ExtractOptions) -> Result<Self> {
        Self::with_segmenter(opts, Arc::new(RuleSegmenter::default()))
    }

    /// Same as [`CorpusExtractor::new`] with a caller-supplied sentence splitter.
    pub fn with_segmenter(opts: ExtractOptions, segmenter: Arc<dyn SentenceSegmenter>) -> Result<Self> {
        init_tracing_once();
        let destination = opts.resolved_destination();
        let layout = DatasetLayout::new(&opts.corpus, &destination, &opts.subsets);

        validate(&opts, &layout)?;
        let spec = ExtractSpec::from_options(&opts, segmenter)?;

        layout.create_destination()?;
        tracing::info!(destination=%layout.destination_dir.display(), "Destination created");
        Ok(Self { opts, layout, spec })
    }

    pub fn options(&self) -> &ExtractOptions {
        &self.opts
    }

    pub fn layout(&self) -> &DatasetLayout {
        &self.layout
    }

    pub fn destination_dir(&self) -> &Path {
        &self.layout.destination_dir
    }

    /// Run every subset, in configured order, on a pool sized by `parallelism`.
    pub fn extract_from_corpus(&self) -> Result<RunReport> {
        let pool = AnyPool::for_parallelism(self.opts.parallelism)?;
        self.extract_with_pool(&pool)
    }

    /// Run every subset on the given worker pool.
    pub fn extract_with_pool<P: WorkerPool>(&self, pool: &P) -> Result<RunReport> {
        let mut gate = match self.opts.seed {
            Some(seed) => SamplingGate::seeded(self.opts.inclusion_probability, seed),
            None => SamplingGate::from_entropy(self.opts.inclusion_probability),
        };
        self.extract_with(pool, &mut gate)
    }

    /// Run every subset with an explicit pool and sampling gate.
    pub fn extract_with<P: WorkerPool>(&self, pool: &P, gate: &mut SamplingGate) -> Result<RunReport> {
        let started_at = now_rfc3339();
        tracing::info!(
            corpus=%self.layout.corpus.display(),
            xpath=%self.spec.selector,
            batch_size=self.opts.batch_size,
            workers=pool.width(),
            "Extraction started"
        );

        let scheduler = BatchScheduler::new(pool, &self.spec, self.opts.batch_size)
            .failure_policy(self.opts.failure_policy)
            .progress(self.opts.progress);

        let mut subsets = Vec::with_capacity(self.layout.subsets.len());
        for subset in &self.layout.subsets {
            let files = scan_subset(&subset.source_dir)
                .with_context(|| format!("scan subset {}", subset.name))?;
            tracing::info!(subset=%subset.name, files = files.len(), "Planned files for processing.");
            let writer = AppendWriter::new(&subset.destination_file);
            let report = scheduler
                .run_subset(&subset.name, &files, &writer, gate)
                .with_context(|| format!("extract subset {}", subset.name))?;
            subsets.push(report);
        }

        Ok(RunReport {
            corpus: self.layout.corpus.clone(),
            destination_dir: self.layout.destination_dir.clone(),
            xpath: self.spec.selector.as_str().to_string(),
            started_at,
            finished_at: now_rfc3339(),
            subsets,
        })
    }
}

/// All precondition checks; none of them touches the filesystem.
fn validate(opts: &ExtractOptions, layout: &DatasetLayout) -> Result<()> {
    if layout.destination_dir.exists() {
        return Err(PreconditionError::DestinationExists(layout.destination_dir.clone()).into());
    }
    let parent = layout.destination_parent();
    if !parent.is_dir() {
        return Err(PreconditionError::ParentMissing(parent).into());
    }
    let existing = layout.existing_destination_files();
    if !existing.is_empty() {
        return Err(PreconditionError::DestinationFilesExist(existing).into());
    }
    let missing = layout.missing_subsets();
    if !missing.is_empty() {
        return Err(PreconditionError::MissingSubsets { corpus: layout.corpus.clone(), missing }.into());
    }

    let mut problems = opts.problems();
    if let Err(e) = Selector::compile(&opts.xpath) {
        problems.push(e.to_string());
    }
    if !problems.is_empty() {
        return Err(PreconditionError::InvalidOptions(problems).into());
    }
    Ok(())
}
