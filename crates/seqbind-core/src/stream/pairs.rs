//! Pair iteration over a shared parser.

use std::fmt;
use std::sync::Arc;

use super::parser::ParserHandle;
use crate::errors::ParseError;
use crate::traits::{suspended, HostLock, NoHostLock};
use crate::types::{PairingPolicy, RecordPair, SequenceRecord};

/// Groups records from a parser into mate pairs.
///
/// Holds a strong reference to the parser for its whole lifetime and keeps
/// at most one record of lookahead. The policy is fixed at creation.
pub struct RecordPairIterator {
    source: ParserHandle,
    policy: PairingPolicy,
    lookahead: Option<SequenceRecord>,
    host: Arc<dyn HostLock>,
    finished: bool,
}

impl RecordPairIterator {
    pub fn open(source: &ParserHandle, policy: PairingPolicy) -> Self {
        Self {
            source: source.clone(),
            policy,
            lookahead: None,
            host: Arc::new(NoHostLock),
            finished: false,
        }
    }

    /// Open with a policy given by name, validated before any record is read.
    pub fn open_named(source: &ParserHandle, mode: &str) -> Result<Self, ParseError> {
        Ok(Self::open(source, mode.parse()?))
    }

    /// Open with a numeric policy code (0 allow, 1 ignore, 2 error).
    pub fn open_code(source: &ParserHandle, code: i64) -> Result<Self, ParseError> {
        Ok(Self::open(source, PairingPolicy::from_code(code)?))
    }

    pub fn with_host_lock(mut self, host: Arc<dyn HostLock>) -> Self {
        self.host = host;
        self
    }

    pub fn policy(&self) -> PairingPolicy {
        self.policy
    }

    pub fn source(&self) -> &ParserHandle {
        &self.source
    }

    fn pull(&mut self) -> Result<Option<SequenceRecord>, ParseError> {
        if let Some(record) = self.lookahead.take() {
            return Ok(Some(record));
        }
        let source = &self.source;
        suspended(self.host.as_ref(), || source.pull())
    }

    /// Pull the record after `first`. On failure `first` goes back into the
    /// lookahead so a busy retry does not lose it.
    fn pull_mate(
        &mut self,
        first: SequenceRecord,
    ) -> Result<(SequenceRecord, Option<SequenceRecord>), ParseError> {
        match self.pull() {
            Ok(second) => Ok((first, second)),
            Err(e) => {
                self.lookahead = Some(first);
                Err(e)
            }
        }
    }

    pub fn next_pair(&mut self) -> Result<Option<RecordPair>, ParseError> {
        if self.finished {
            return Ok(None);
        }
        let result = match self.policy {
            PairingPolicy::ErrorOnUnpaired => self.next_strict(),
            PairingPolicy::IgnoreUnpaired => self.next_ignoring(),
            PairingPolicy::AllowUnpaired => self.next_allowing(),
        };
        match &result {
            Err(ParseError::Busy) | Ok(Some(_)) => {}
            Ok(None) | Err(_) => self.finished = true,
        }
        result
    }

    fn next_strict(&mut self) -> Result<Option<RecordPair>, ParseError> {
        let Some(first) = self.pull()? else {
            return Ok(None);
        };
        let (first, second) = self.pull_mate(first)?;
        let Some(second) = second else {
            return Err(ParseError::InvalidReadPair {
                first: first.name,
                second: "<end of input>".to_string(),
            });
        };
        if !first.pairs_with(&second) {
            return Err(ParseError::InvalidReadPair {
                first: first.name,
                second: second.name,
            });
        }
        Ok(Some(RecordPair::new(first, second)))
    }

    fn next_ignoring(&mut self) -> Result<Option<RecordPair>, ParseError> {
        loop {
            let Some(first) = self.pull()? else {
                return Ok(None);
            };
            let (first, second) = self.pull_mate(first)?;
            let Some(second) = second else {
                return Ok(None);
            };
            if first.pairs_with(&second) {
                return Ok(Some(RecordPair::new(first, second)));
            }
            tracing::trace!(dropped = %first.name, "unpaired record skipped");
            self.lookahead = Some(second);
        }
    }

    fn next_allowing(&mut self) -> Result<Option<RecordPair>, ParseError> {
        let Some(first) = self.pull()? else {
            return Ok(None);
        };
        if first.mate() == Some(2) {
            return Ok(Some(RecordPair::new(SequenceRecord::placeholder(), first)));
        }
        let (first, second) = self.pull_mate(first)?;
        let Some(second) = second else {
            return Ok(Some(RecordPair::new(first, SequenceRecord::placeholder())));
        };
        if first.pairs_with(&second) {
            return Ok(Some(RecordPair::new(first, second)));
        }
        self.lookahead = Some(second);
        Ok(Some(RecordPair::new(first, SequenceRecord::placeholder())))
    }
}

impl Iterator for RecordPairIterator {
    type Item = Result<RecordPair, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_pair().transpose()
    }
}

impl fmt::Debug for RecordPairIterator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordPairIterator")
            .field("policy", &self.policy)
            .field("lookahead", &self.lookahead.is_some())
            .field("finished", &self.finished)
            .finish()
    }
}
