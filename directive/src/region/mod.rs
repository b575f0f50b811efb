//! Region filter: separates story prose from authoring instructions.
//!
//! Outside a region every line is prose and is kept. Inside a region only
//! lines carrying the comment marker survive; everything else is a private
//! note and is dropped. Regions do not nest: a start marker seen inside an
//! open region is kept as a line but does not open anything, and the first
//! end marker closes the region. A region left open runs to the end of the
//! document.

mod marker;

use std::ops::Range;

use tracing::debug;

use crate::diagnostic::{Finding, Issue};
use crate::grammar::RegionGrammar;
use marker::Marker;

/// How a single document line was classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    /// Outside any region. Kept verbatim.
    Prose,
    /// A start marker. Kept, including nested (ignored) ones.
    RegionStart,
    /// An end marker closing the open region. Kept.
    RegionEnd,
    /// A comment-marked line inside a region. Kept.
    Instruction,
    /// Any other line inside a region. Dropped.
    Note,
}

impl LineKind {
    pub fn is_kept(self) -> bool {
        !matches!(self, LineKind::Note)
    }
}

/// One line of the input, without its line break.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line<'a> {
    /// 1-based line number.
    pub number: usize,
    /// Byte range of `text` within the document.
    pub span: Range<usize>,
    pub text: &'a str,
    pub kind: LineKind,
}

#[derive(Debug, Clone, Default)]
pub struct RegionFilter {
    grammar: RegionGrammar,
}

/// Filter `document` with the default markers.
pub fn filter(document: &str) -> String {
    RegionFilter::default().filter(document)
}

impl RegionFilter {
    pub fn new(grammar: RegionGrammar) -> Self {
        RegionFilter { grammar }
    }

    /// Drop the non-instruction lines inside regions and rejoin with `\n`.
    pub fn filter(&self, document: &str) -> String {
        let lines = self.classify(document);
        let total = lines.len();
        let kept: Vec<&str> = lines
            .into_iter()
            .filter(|line| line.kind.is_kept())
            .map(|line| line.text)
            .collect();
        debug!(total, kept = kept.len(), "filtered document");
        kept.join("\n")
    }

    /// Classify every line of `document`. Lines are split on `\n` only, so a
    /// trailing `\r` stays part of the line text.
    pub fn classify<'a>(&self, document: &'a str) -> Vec<Line<'a>> {
        let mut inside = false;
        let mut offset = 0;
        document
            .split('\n')
            .enumerate()
            .map(|(index, text)| {
                let span = offset..offset + text.len();
                offset = span.end + 1;
                let kind = self.step(&mut inside, text);
                Line {
                    number: index + 1,
                    span,
                    text,
                    kind,
                }
            })
            .collect()
    }

    /// Report marker misuse. Never affects what `filter` returns.
    pub fn analyze(&self, document: &str, file_id: usize) -> Vec<Finding> {
        let mut findings = Vec::new();
        let mut open: Option<Range<usize>> = None;

        for line in self.classify(document) {
            match line.kind {
                LineKind::RegionStart => {
                    if let Some(outer) = &open {
                        findings.push(
                            Finding::warning(Issue::NestedRegion, line.span, file_id).with_note(
                                format!("enclosing region opened at byte {}", outer.start),
                            ),
                        );
                    } else {
                        open = Some(line.span);
                    }
                }
                LineKind::RegionEnd => open = None,
                LineKind::Prose => {
                    if marker::recognize(&self.grammar, line.text) == Some(Marker::End) {
                        findings.push(Finding::warning(Issue::StrayRegionEnd, line.span, file_id));
                    }
                }
                LineKind::Instruction | LineKind::Note => {}
            }
        }

        if let Some(span) = open {
            findings.push(
                Finding::warning(Issue::UnterminatedRegion, span, file_id).with_note(format!(
                    "only `{}` lines after this marker are kept",
                    self.grammar.comment_marker
                )),
            );
        }
        findings
    }

    fn step(&self, inside: &mut bool, text: &str) -> LineKind {
        match (*inside, marker::recognize(&self.grammar, text)) {
            (false, Some(Marker::Start)) => {
                *inside = true;
                LineKind::RegionStart
            }
            (false, _) => LineKind::Prose,
            (true, Some(Marker::End)) => {
                *inside = false;
                LineKind::RegionEnd
            }
            (true, Some(Marker::Start)) => LineKind::RegionStart,
            (true, None) if marker::is_instruction(&self.grammar, text) => LineKind::Instruction,
            (true, None) => LineKind::Note,
        }
    }
}
