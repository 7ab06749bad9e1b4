//! Per-file extraction: parse, select, detach tails, turn matches into cleaned examples.

use crate::config::{ExtractOptions, TextMode};
use crate::filters::{accept, cleanup, exceeds_min_length};
use crate::segment::SentenceSegmenter;
use crate::selector::Selector;
use crate::xml::XmlDocument;
use anyhow::Result;
use std::path::Path;
use std::sync::Arc;

/// Everything an extraction unit needs, shared read-only across workers.
#[derive(Clone)]
pub struct ExtractSpec {
    pub selector: Selector,
    pub mode: TextMode,
    pub remove_tail: bool,
    pub min_char_length: usize,
    pub segmenter: Arc<dyn SentenceSegmenter>,
}

impl ExtractSpec {
    pub fn from_options(opts: &ExtractOptions, segmenter: Arc<dyn SentenceSegmenter>) -> Result<Self> {
        let selector = Selector::compile(&opts.xpath)?;
        if opts.keep_xml && opts.sentence_level {
            tracing::warn!("keep_xml is set: sentence_level is ignored, whole elements are kept");
        }
        Ok(Self {
            selector,
            mode: opts.text_mode(),
            remove_tail: opts.remove_tail,
            min_char_length: opts.min_char_length,
            segmenter,
        })
    }
}

impl std::fmt::Debug for ExtractSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtractSpec")
            .field("selector", &self.selector.as_str())
            .field("mode", &self.mode)
            .field("remove_tail", &self.remove_tail)
            .field("min_char_length", &self.min_char_length)
            .finish()
    }
}

/// Examples produced by one source document.
#[derive(Clone, Debug, Default)]
pub struct FileExamples {
    pub matched_elements: usize,
    pub examples: Vec<String>,
}

pub fn extract_file(path: &Path, spec: &ExtractSpec) -> Result<FileExamples> {
    let doc = XmlDocument::open(path)?;
    Ok(extract_from_document(doc, spec))
}

pub fn extract_from_str(xml: &str, spec: &ExtractSpec) -> Result<FileExamples> {
    let doc = XmlDocument::parse(xml)?;
    Ok(extract_from_document(doc, spec))
}

pub fn extract_from_document(mut doc: XmlDocument, spec: &ExtractSpec) -> FileExamples {
    let matches = spec.selector.select(&doc);
    // tails go first so no extracted text ever sees them, nested matches included
    if spec.remove_tail {
        for &id in &matches {
            doc.clear_tail(id);
        }
    }

    let mut examples = Vec::new();
    for &id in &matches {
        match spec.mode {
            TextMode::KeepMarkup => {
                if exceeds_min_length(&cleanup(&doc.inner_text(id)), spec.min_char_length) {
                    examples.push(cleanup(&doc.to_markup(id)));
                }
            }
            TextMode::InnerText { sentence_level: true } => {
                let text = doc.inner_text(id);
                for sentence in spec.segmenter.segment(&text) {
                    if let Some(s) = accept(&sentence, spec.min_char_length) {
                        examples.push(s);
                    }
                }
            }
            TextMode::InnerText { sentence_level: false } => {
                if let Some(s) = accept(&doc.inner_text(id), spec.min_char_length) {
                    examples.push(s);
                }
            }
        }
    }
    FileExamples { matched_elements: matches.len(), examples }
}
