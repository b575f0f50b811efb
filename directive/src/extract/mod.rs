//! Directive extractor: finds a delimited JSON call in a growing stream of
//! generated text and splits the stream into prose prefix and call.
//!
//! Scanning is stateless. A streaming caller re-runs it on the whole buffer
//! after every update; an incomplete or malformed block reads as "nothing
//! yet", so the next update gets another chance.

mod call;

use std::ops::Range;

use serde_json::Value;
use tracing::{debug, warn};

use crate::diagnostic::{Finding, Issue};
use crate::grammar::Delimiters;
use crate::normalize::normalize;

pub use call::{DirectiveCall, ScanResult};

/// Detailed outcome of [`Extractor::scan`].
#[derive(Debug, Clone, PartialEq)]
pub enum Scan {
    /// Delimiters missing or unclosed.
    Incomplete,
    /// A closed block whose payload is not a usable call.
    Malformed(Finding),
    /// `call` and `block` are always set. The finding, a warning, notes
    /// arguments that had to be dropped.
    Found(ScanResult, Option<Finding>),
}

#[derive(Debug, Clone, Default)]
pub struct Extractor {
    delimiters: Delimiters,
}

/// Extract with the default delimiters.
pub fn extract(buffer: &str) -> ScanResult {
    Extractor::default().extract(buffer)
}

impl Extractor {
    pub fn new(delimiters: Delimiters) -> Self {
        Extractor { delimiters }
    }

    pub fn delimiters(&self) -> &Delimiters {
        &self.delimiters
    }

    /// Scan `buffer` and return the first complete call, if any. Malformed
    /// blocks are logged and reported as empty.
    pub fn extract(&self, buffer: &str) -> ScanResult {
        match self.scan(buffer, 0) {
            Scan::Found(result, warning) => {
                if let Some(finding) = warning {
                    warn!(
                        issue = %finding.issue,
                        at = finding.span.start,
                        "directive arguments replaced by an empty map"
                    );
                }
                result
            }
            Scan::Incomplete => ScanResult::default(),
            Scan::Malformed(finding) => {
                warn!(
                    issue = %finding.issue,
                    at = finding.span.start,
                    "ignoring malformed directive block"
                );
                ScanResult::default()
            }
        }
    }

    /// Like [`Extractor::extract`], but keeps the reason a delimited block was
    /// rejected. `file_id` only labels the finding.
    pub fn scan(&self, buffer: &str, file_id: usize) -> Scan {
        let Some(payload) = self.locate(buffer) else {
            return Scan::Incomplete;
        };

        let normalized = normalize(&buffer[payload.body.clone()]);
        let value = match serde_json::from_str::<Value>(&normalized) {
            Ok(value) => value,
            Err(err) => {
                return Scan::Malformed(
                    Finding::error(Issue::InvalidJson(err.to_string()), payload.body, file_id)
                        .with_note("line and column refer to the trimmed, normalized payload"),
                );
            }
        };

        let (call, warning) = match DirectiveCall::from_value(value) {
            Ok(parsed) => parsed,
            Err(issue) => return Scan::Malformed(Finding::error(issue, payload.body, file_id)),
        };
        let warning = warning.map(|issue| {
            Finding::warning(issue, payload.body.clone(), file_id)
                .with_note("the call is kept with no arguments")
        });

        let prefix = buffer[..payload.block.start].trim();
        debug!(name = %call.name, block = ?payload.block, "directive block found");

        Scan::Found(
            ScanResult {
                call: Some(call),
                prefix: (!prefix.is_empty()).then(|| prefix.to_string()),
                block: Some(payload.block),
            },
            warning,
        )
    }

    /// First begin delimiter, then the first end delimiter after it.
    fn locate(&self, buffer: &str) -> Option<Payload> {
        let Delimiters { begin, end } = &self.delimiters;
        if !buffer.contains(end.as_str()) {
            return None;
        }
        let start = buffer.find(begin.as_str())?;
        let body_start = start + begin.len();
        let body_end = body_start + buffer[body_start..].find(end.as_str())?;
        Some(Payload {
            block: start..body_end + end.len(),
            body: body_start..body_end,
        })
    }
}

struct Payload {
    block: Range<usize>,
    body: Range<usize>,
}
