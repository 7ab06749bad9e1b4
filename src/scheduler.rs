//! Batch scheduler: bounded fan-out/fan-in over one subset's files.
//!
//! Per batch of at most `batch_size` files:
//!   1. one extraction unit per file, then wait for all of them;
//!   2. sampling gate per example (control thread, file order), one append unit
//!      per admitted example, then wait for all of them.
//! A batch's lines are on disk before the next batch starts extracting.

use crate::concurrency::WorkerPool;
use crate::config::FailurePolicy;
use crate::error::{UnitFailure, UnitOutcome};
use crate::extract::{extract_file, ExtractSpec, FileExamples};
use crate::progress::ProgressScope;
use crate::report::SubsetReport;
use crate::sampling::SamplingGate;
use crate::writer::AppendWriter;
use anyhow::Result;
use std::path::PathBuf;

pub struct BatchScheduler<'a, P: WorkerPool> {
    pool: &'a P,
    spec: &'a ExtractSpec,
    batch_size: usize,
    policy: FailurePolicy,
    progress: bool,
}

#[derive(Clone, Copy, Debug)]
enum Phase {
    Extract,
    Write,
}

impl<'a, P: WorkerPool> BatchScheduler<'a, P> {
    pub fn new(pool: &'a P, spec: &'a ExtractSpec, batch_size: usize) -> Self {
        Self {
            pool,
            spec,
            batch_size: batch_size.max(1),
            policy: FailurePolicy::Continue,
            progress: false,
        }
    }

    pub fn failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn progress(mut self, yes: bool) -> Self {
        self.progress = yes;
        self
    }

    /// Extract every file of one subset and append the admitted examples to `writer`.
    pub fn run_subset(
        &self,
        subset: &str,
        files: &[PathBuf],
        writer: &AppendWriter,
        gate: &mut SamplingGate,
    ) -> Result<SubsetReport> {
        let mut report = SubsetReport::new(subset, writer.path());
        report.files_scanned = files.len() as u64;
        // every subset gets its file, even when nothing ends up in it;
        // if this fails the appends fail too and are accounted there
        if let Err(e) = writer.touch() {
            tracing::warn!(subset, error=%format!("{:#}", e), "Could not create destination file");
        }
        if files.is_empty() {
            tracing::warn!(subset, "No eligible source files; nothing to extract.");
            return Ok(report);
        }

        let progress = ProgressScope::count_if(self.progress, format!("Extracting {}", subset), files.len() as u64);
        let spec = self.spec;

        for (batch_no, batch) in files.chunks(self.batch_size).enumerate() {
            let outcomes: Vec<UnitOutcome<FileExamples>> = self.pool.submit_batch(batch, |path| {
                extract_file(path, spec).map_err(|e| UnitFailure::new(path.as_path(), &e))
            });
            progress.inc_items(batch.len() as u64);

            let mut admitted: Vec<String> = Vec::new();
            for (path, outcome) in batch.iter().zip(outcomes) {
                match outcome {
                    Ok(found) => {
                        if found.matched_elements == 0 {
                            report.files_without_matches += 1;
                            tracing::debug!(path=%path.display(), selector=%spec.selector, "No element matched");
                        }
                        report.examples_extracted += found.examples.len() as u64;
                        for example in found.examples {
                            if gate.admit() {
                                admitted.push(example);
                            } else {
                                report.examples_sampled_out += 1;
                            }
                        }
                    }
                    Err(failure) => {
                        report.files_failed += 1;
                        self.handle_failure(&mut report, failure, Phase::Extract)?;
                    }
                }
            }

            let acks: Vec<UnitOutcome<()>> = self.pool.submit_batch(&admitted, |example| {
                writer
                    .append(example)
                    .map_err(|e| UnitFailure::new(writer.path(), &e))
            });

            let mut written = 0u64;
            for ack in acks {
                match ack {
                    Ok(()) => written += 1,
                    Err(failure) => {
                        report.writes_failed += 1;
                        self.handle_failure(&mut report, failure, Phase::Write)?;
                    }
                }
            }
            report.examples_written += written;
            report.batches += 1;
            tracing::debug!(subset, batch = batch_no, files = batch.len(), written, "Batch flushed");
        }

        progress.finish(format!("{}: {} examples", subset, report.examples_written));
        tracing::info!(
            subset,
            files = report.files_scanned,
            failed = report.files_failed,
            written = report.examples_written,
            sampled_out = report.examples_sampled_out,
            destination = %writer.path().display(),
            "Subset done"
        );
        Ok(report)
    }

    fn handle_failure(&self, report: &mut SubsetReport, failure: UnitFailure, phase: Phase) -> Result<()> {
        match self.policy {
            FailurePolicy::Abort => Err(anyhow::Error::new(failure)
                .context(format!("{:?} unit failed in subset {}", phase, report.subset))),
            FailurePolicy::Continue => {
                match phase {
                    Phase::Extract => {
                        tracing::warn!(path=%failure.path.display(), reason=%failure.reason, "Skipping file: extraction failed")
                    }
                    Phase::Write => {
                        tracing::warn!(path=%failure.path.display(), reason=%failure.reason, "Dropping example: append failed")
                    }
                }
                report.failures.push(failure.into());
                Ok(())
            }
        }
    }
}
