//! Shared parser handle and the streaming record iterator.

use std::fmt;
use std::path::Path;
use std::sync::{Arc, Mutex, TryLockError};

use super::fastx::FastxReader;
use super::pairs::RecordPairIterator;
use super::reader::RecordReader;
use crate::errors::ParseError;
use crate::traits::{suspended, HostLock, NoHostLock};
use crate::types::{PairingPolicy, SequenceRecord};

/// Reference-counted ownership of one reader.
///
/// Held by a `StreamingParser` and by every pair iterator derived from it,
/// so the reader lives as long as its longest consumer. Only one consumer
/// may pull at a time: a pull that finds the reader busy fails with
/// `ParseError::Busy` instead of blocking.
#[derive(Clone)]
pub struct ParserHandle {
    reader: Arc<Mutex<Box<dyn RecordReader>>>,
}

impl ParserHandle {
    pub fn new(reader: impl RecordReader + 'static) -> Self {
        Self {
            reader: Arc::new(Mutex::new(Box::new(reader))),
        }
    }

    /// Open a FASTA/FASTQ file (gzip when it ends in `.gz`).
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ParseError> {
        let path = path.as_ref();
        let reader = FastxReader::open(path)?;
        tracing::debug!(path = %path.display(), format = ?reader.format(), "parser opened");
        Ok(Self::new(reader))
    }

    /// Blocking pull of the next record.
    pub fn pull(&self) -> Result<Option<SequenceRecord>, ParseError> {
        let mut reader = match self.reader.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::WouldBlock) => return Err(ParseError::Busy),
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
        };
        reader.read_record()
    }

    /// True once the reader has reached its end. A reader that is busy
    /// with another consumer is not complete.
    pub fn is_complete(&self) -> bool {
        match self.reader.try_lock() {
            Ok(reader) => reader.is_complete(),
            Err(TryLockError::WouldBlock) => false,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner().is_complete(),
        }
    }

    pub fn records_read(&self) -> u64 {
        let reader = self.reader.lock().unwrap_or_else(|e| e.into_inner());
        reader.records_read()
    }

    /// Number of live owners of the underlying reader.
    pub fn owners(&self) -> usize {
        Arc::strong_count(&self.reader)
    }
}

impl fmt::Debug for ParserHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParserHandle")
            .field("owners", &self.owners())
            .finish()
    }
}

/// Lazy, finite, non-restartable sequence of records.
///
/// Each pull releases the host lock around the blocking read. Once the end
/// is reached every further pull returns `None`.
pub struct StreamingParser {
    handle: ParserHandle,
    host: Arc<dyn HostLock>,
}

impl StreamingParser {
    pub fn new(handle: ParserHandle) -> Self {
        Self {
            handle,
            host: Arc::new(NoHostLock),
        }
    }

    pub fn open(path: impl AsRef<Path>) -> Result<Self, ParseError> {
        ParserHandle::open(path).map(Self::new)
    }

    pub fn with_host_lock(mut self, host: Arc<dyn HostLock>) -> Self {
        self.host = host;
        self
    }

    pub fn handle(&self) -> &ParserHandle {
        &self.handle
    }

    pub fn is_complete(&self) -> bool {
        self.handle.is_complete()
    }

    pub fn records_read(&self) -> u64 {
        self.handle.records_read()
    }

    pub fn next_record(&mut self) -> Result<Option<SequenceRecord>, ParseError> {
        let handle = &self.handle;
        suspended(self.host.as_ref(), || handle.pull())
    }

    /// Pair iterator over the same reader.
    pub fn pairs(&self, policy: PairingPolicy) -> RecordPairIterator {
        RecordPairIterator::open(&self.handle, policy).with_host_lock(Arc::clone(&self.host))
    }
}

impl Iterator for StreamingParser {
    type Item = Result<SequenceRecord, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_record().transpose()
    }
}

impl fmt::Debug for StreamingParser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamingParser")
            .field("handle", &self.handle)
            .finish()
    }
}
