//! Streaming caller for the directive extractor.
//!
//! A session owns the accumulated response of one generation request. Every
//! pushed chunk triggers a full re-scan; the first complete call is
//! dispatched exactly once, after which the session is closed and further
//! chunks only accumulate as remainder.

use directive::{DirectiveCall, Extractor, Finding, Issue, Scan};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::dispatcher::Dispatcher;
use crate::error::DispatchError;

/// A call that was handed to the dispatcher.
#[derive(Debug, Clone, PartialEq)]
pub struct Dispatch {
    pub call: DirectiveCall,
    pub prefix: Option<String>,
    pub output: Value,
    /// 1-based number of the push that completed the call.
    pub update: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Progress {
    /// Nothing dispatchable yet.
    Pending,
    /// This push completed a call and it was dispatched.
    Dispatched(Dispatch),
    /// A call was already dispatched earlier in this session.
    Closed,
}

/// What a finished session saw.
#[derive(Debug, Clone, PartialEq)]
pub struct Transcript {
    /// Text before the dispatched block, or the whole buffer if nothing was
    /// dispatched.
    pub prose: String,
    pub call: Option<DirectiveCall>,
    /// Text received after the dispatched block.
    pub remainder: String,
    pub findings: Vec<Finding>,
}

pub struct StreamSession {
    extractor: Extractor,
    buffer: String,
    remainder: String,
    dispatched: Option<DirectiveCall>,
    updates: usize,
}

impl Default for StreamSession {
    fn default() -> Self {
        Self::new(Extractor::default())
    }
}

impl StreamSession {
    pub fn new(extractor: Extractor) -> Self {
        StreamSession {
            extractor,
            buffer: String::new(),
            remainder: String::new(),
            dispatched: None,
            updates: 0,
        }
    }

    /// Text accumulated so far. After a dispatch this is only the text that
    /// preceded the block.
    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    pub fn is_closed(&self) -> bool {
        self.dispatched.is_some()
    }

    pub fn updates(&self) -> usize {
        self.updates
    }

    /// Append `chunk` and dispatch the call if it is now complete.
    ///
    /// The session closes before the dispatcher runs, so a failing dispatch
    /// is not retried by later pushes.
    pub fn push<D: Dispatcher + ?Sized>(
        &mut self,
        chunk: &str,
        dispatcher: &mut D,
    ) -> Result<Progress, DispatchError> {
        self.updates += 1;
        if self.dispatched.is_some() {
            self.remainder.push_str(chunk);
            return Ok(Progress::Closed);
        }

        self.buffer.push_str(chunk);
        let result = self.extractor.extract(&self.buffer);
        let (Some(call), Some(block)) = (result.call, result.block) else {
            debug!(update = self.updates, len = self.buffer.len(), "no directive yet");
            return Ok(Progress::Pending);
        };

        self.remainder = self.buffer[block.end..].to_string();
        self.buffer.truncate(block.start);
        self.dispatched = Some(call.clone());

        info!(name = %call.name, update = self.updates, "dispatching directive");
        let output = dispatcher.dispatch(&call).inspect_err(|err| {
            warn!(name = %call.name, error = %err, "directive dispatch failed");
        })?;

        Ok(Progress::Dispatched(Dispatch {
            call,
            prefix: result.prefix,
            output,
            update: self.updates,
        }))
    }

    /// End the stream. Reports a block that was still open, or one that was
    /// closed but never parsed, as findings labelled with `file_id`.
    pub fn finish(self, file_id: usize) -> Transcript {
        let mut findings = Vec::new();

        if self.dispatched.is_none() {
            match self.extractor.scan(&self.buffer, file_id) {
                Scan::Malformed(finding) => findings.push(finding),
                Scan::Incomplete => {
                    let begin = &self.extractor.delimiters().begin;
                    if let Some(start) = self.buffer.find(begin.as_str()) {
                        findings.push(
                            Finding::warning(
                                Issue::UnterminatedDirective,
                                start..self.buffer.len(),
                                file_id,
                            )
                            .with_note("the stream ended before the end delimiter"),
                        );
                    }
                }
                Scan::Found(..) => {}
            }
        }

        Transcript {
            prose: self.buffer,
            call: self.dispatched,
            remainder: self.remainder,
            findings,
        }
    }
}
