//! Record streams: the FASTA/FASTQ reader, the shared parser handle, and
//! the record and pair iterators built over it.

pub mod fastx;
pub mod pairs;
pub mod parser;
pub mod reader;

pub use fastx::{write_record, FastxFormat, FastxReader};
pub use pairs::RecordPairIterator;
pub use parser::{ParserHandle, StreamingParser};
pub use reader::RecordReader;
