//! Blocking record reader abstraction.

use crate::errors::ParseError;
use crate::types::SequenceRecord;

/// A blocking source of sequence records.
///
/// `Ok(None)` is end of stream and must be returned again on every later
/// call. After an `Err` the reader is complete.
pub trait RecordReader: Send {
    fn read_record(&mut self) -> Result<Option<SequenceRecord>, ParseError>;

    fn is_complete(&self) -> bool;

    /// Records successfully produced so far.
    fn records_read(&self) -> u64;
}

impl RecordReader for Box<dyn RecordReader> {
    fn read_record(&mut self) -> Result<Option<SequenceRecord>, ParseError> {
        (**self).read_record()
    }

    fn is_complete(&self) -> bool {
        (**self).is_complete()
    }

    fn records_read(&self) -> u64 {
        (**self).records_read()
    }
}
