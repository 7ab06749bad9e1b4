#[path = "common/mod.rs"]
mod common;

use common::*;
use std::fs;
use xetl::{CorpusExtractor, ExtractOptions, PreconditionError};

fn precondition(err: &anyhow::Error) -> &PreconditionError {
    err.downcast_ref::<PreconditionError>()
        .unwrap_or_else(|| panic!("expected a precondition error, got {:#}", err))
}

fn options(fx: &Fixture, dest: &str) -> ExtractOptions {
    ExtractOptions::new(&fx.corpus)
        .with_destination_dir(fx.dest(dest))
        .with_progress(false)
}

/// An existing destination is never reused, and nothing inside it is touched.
#[test]
fn existing_destination_is_rejected_without_mutation() {
    let fx = Fixture::new();
    fx.add_file("train", "a.xml", &article_with_abstracts(&[LONG_ABSTRACT]));
    let dest = fx.dest("ds");
    fs::create_dir(&dest).unwrap();
    fs::write(dest.join("keep.me"), "previous dataset\n").unwrap();

    let err = CorpusExtractor::new(options(&fx, "ds")).err().unwrap();
    assert!(matches!(precondition(&err), PreconditionError::DestinationExists(_)));
    assert!(err.to_string().contains("already exists"));

    let entries: Vec<_> = fs::read_dir(&dest).unwrap().map(|e| e.unwrap().file_name()).collect();
    assert_eq!(entries.len(), 1);
    assert_eq!(fs::read_to_string(dest.join("keep.me")).unwrap(), "previous dataset\n");
}

/// The destination's parent must already exist.
#[test]
fn missing_destination_parent_is_rejected() {
    let fx = Fixture::new();
    let opts = ExtractOptions::new(&fx.corpus)
        .with_destination_dir(fx.out_root.join("no").join("such").join("ds"))
        .with_progress(false);

    let err = CorpusExtractor::new(opts).err().unwrap();
    assert!(matches!(precondition(&err), PreconditionError::ParentMissing(_)));
    assert!(err.to_string().contains("does not exist"));
    assert!(!fx.out_root.join("no").exists());
}

/// A corpus without one of the configured subset directories fails before
/// the destination directory is created, and the error names the subset.
#[test]
fn missing_subset_is_rejected_before_destination_is_created() {
    let fx = Fixture::with_subsets(&["train", "test"]);

    let err = CorpusExtractor::new(options(&fx, "ds")).err().unwrap();
    match precondition(&err) {
        PreconditionError::MissingSubsets { missing, .. } => assert_eq!(missing, &vec!["eval".to_string()]),
        other => panic!("unexpected error: {}", other),
    }
    assert!(err.to_string().contains("eval"));
    assert!(!fx.dest("ds").exists());
}

/// Out-of-range probability and a zero batch size are reported together.
#[test]
fn invalid_options_are_rejected() {
    let fx = Fixture::new();
    let opts = options(&fx, "ds").with_inclusion_probability(1.5).with_batch_size(0);

    let err = CorpusExtractor::new(opts).err().unwrap();
    match precondition(&err) {
        PreconditionError::InvalidOptions(problems) => {
            assert_eq!(problems.len(), 2, "{:?}", problems);
            assert!(problems.iter().any(|p| p.contains("inclusion_probability")));
            assert!(problems.iter().any(|p| p.contains("batch_size")));
        }
        other => panic!("unexpected error: {}", other),
    }
    assert!(!fx.dest("ds").exists());
}

/// A selector that does not parse is a configuration error, not a per-file one.
#[test]
fn invalid_selector_is_rejected() {
    let fx = Fixture::new();
    let opts = options(&fx, "ds").with_xpath(".//abstract[@id='x'");

    let err = CorpusExtractor::new(opts).err().unwrap();
    assert!(matches!(precondition(&err), PreconditionError::InvalidOptions(_)));
    assert!(err.to_string().contains("invalid selector"));
    assert!(!fx.dest("ds").exists());
}

/// Valid layout: the destination exists right after construction, before any extraction.
#[test]
fn destination_is_created_eagerly() {
    let fx = Fixture::new();
    let extractor = CorpusExtractor::new(options(&fx, "ds")).unwrap();
    assert!(fx.dest("ds").is_dir());
    assert_eq!(extractor.destination_dir(), fx.dest("ds").as_path());
    assert_eq!(fs::read_dir(fx.dest("ds")).unwrap().count(), 0);

    let report = extractor.extract_from_corpus().unwrap();
    assert_eq!(report.total_written(), 0);
}

/// Without a configured destination, `<XETL_DEST_ROOT>/<corpus name>` is used.
#[test]
fn default_destination_is_derived_from_corpus_name() {
    let fx = Fixture::new();
    std::env::set_var("XETL_DEST_ROOT", &fx.out_root);
    let opts = ExtractOptions::new(&fx.corpus).with_progress(false);
    assert_eq!(opts.resolved_destination(), fx.out_root.join("corpus"));
    std::env::remove_var("XETL_DEST_ROOT");
}
