//! xetl - extract line-per-example text datasets from XML corpora.

use anyhow::{Context, Result};
use clap::Parser;
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use xetl::{init_tracing_with_default, CorpusExtractor, ExtractOptions, FailurePolicy};

#[derive(Parser)]
#[command(name = "xetl")]
#[command(about = "Extract train/eval/test text examples from an XML corpus")]
#[command(version)]
struct Cli {
    /// Corpus root with one sub-directory per subset
    corpus: Option<PathBuf>,

    /// Destination directory (must not exist; default: $XETL_DEST_ROOT or /data/text, plus the corpus name)
    destination: Option<PathBuf>,

    /// XPath selector for the elements to extract
    #[arg(long)]
    xpath: Option<String>,

    /// Split inner text into sentences, one example each
    #[arg(long)]
    sentence_level: bool,

    /// Keep the element markup instead of its inner text
    #[arg(long)]
    keep_xml: bool,

    /// Keep the text following each selected element
    #[arg(long)]
    keep_tail: bool,

    /// Probability of keeping each example (random subsample)
    #[arg(long)]
    inclusion_probability: Option<f64>,

    /// Comma-separated subset names, in processing order
    #[arg(long, value_delimiter = ',')]
    subsets: Option<Vec<String>>,

    /// Examples must be strictly longer than this many characters
    #[arg(long)]
    min_char_length: Option<usize>,

    /// Files per batch
    #[arg(long)]
    batch_size: Option<usize>,

    /// Worker threads (1 = sequential)
    #[arg(long)]
    parallelism: Option<usize>,

    /// Seed for the sampling draws
    #[arg(long)]
    seed: Option<u64>,

    /// Abort on the first failed file or write instead of skipping it
    #[arg(long)]
    fail_fast: bool,

    /// JSON file with extraction options; flags override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Write the run report as JSON to this path
    #[arg(long)]
    report: Option<PathBuf>,

    /// Disable progress bars
    #[arg(long)]
    no_progress: bool,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,
}

fn load_options(cli: &Cli) -> Result<ExtractOptions> {
    let mut opts = match &cli.config {
        Some(path) => {
            let f = File::open(path).with_context(|| format!("open config {}", path.display()))?;
            serde_json::from_reader(f).with_context(|| format!("parse config {}", path.display()))?
        }
        None => ExtractOptions::default(),
    };

    if let Some(corpus) = &cli.corpus {
        opts = opts.with_corpus(corpus);
    }
    if opts.corpus.as_os_str().is_empty() {
        anyhow::bail!("a corpus path is required (positional argument or \"corpus\" in --config)");
    }
    if let Some(dest) = &cli.destination {
        opts = opts.with_destination_dir(dest);
    }
    if let Some(xpath) = &cli.xpath {
        opts = opts.with_xpath(xpath.clone());
    }
    if cli.sentence_level {
        opts = opts.with_sentence_level(true);
    }
    if cli.keep_xml {
        opts = opts.with_keep_xml(true);
    }
    if cli.keep_tail {
        opts = opts.with_remove_tail(false);
    }
    if let Some(p) = cli.inclusion_probability {
        opts = opts.with_inclusion_probability(p);
    }
    if let Some(subsets) = &cli.subsets {
        opts = opts.with_subsets(subsets.iter().map(|s| s.trim().to_string()));
    }
    if let Some(n) = cli.min_char_length {
        opts = opts.with_min_char_length(n);
    }
    if let Some(n) = cli.batch_size {
        opts = opts.with_batch_size(n);
    }
    if let Some(n) = cli.parallelism {
        opts = opts.with_parallelism(n);
    }
    if let Some(seed) = cli.seed {
        opts = opts.with_seed(seed);
    }
    if cli.fail_fast {
        opts = opts.with_failure_policy(FailurePolicy::Abort);
    }
    if cli.no_progress {
        opts = opts.with_progress(false);
    }
    Ok(opts)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing_with_default(if cli.debug { "debug" } else { "info" });

    let opts = load_options(&cli)?;
    let extractor = CorpusExtractor::new(opts)?;
    println!("{} created", extractor.destination_dir().display());

    let report = extractor.extract_from_corpus()?;

    for s in &report.subsets {
        println!(
            "{}: {} examples written to {} ({} files, {} failed, {} sampled out)",
            s.subset,
            s.examples_written,
            s.destination.display(),
            s.files_scanned,
            s.files_failed + s.writes_failed,
            s.examples_sampled_out
        );
    }

    if let Some(path) = &cli.report {
        let f = File::create(path).with_context(|| format!("create {}", path.display()))?;
        serde_json::to_writer_pretty(BufWriter::new(f), &report)
            .with_context(|| format!("write report {}", path.display()))?;
    }

    Ok(())
}
