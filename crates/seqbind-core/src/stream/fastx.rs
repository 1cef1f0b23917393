//! FASTA / FASTQ reader over `bio::io`, with gzip and BGZF support.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::{Path, PathBuf};

use bio::io::{fasta, fastq};
use flate2::read::MultiGzDecoder;

use super::reader::RecordReader;
use crate::errors::ParseError;
use crate::types::SequenceRecord;

const BUFFER_SIZE: usize = 1024 * 1024;

/// Record layout detected from the first header byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FastxFormat {
    Fasta,
    Fastq,
}

type Input = Box<dyn BufRead + Send>;

enum Records {
    Fasta(fasta::Records<Input>),
    Fastq(fastq::Records<Input>),
    Empty,
}

/// FASTA/FASTQ record reader.
///
/// FASTA sequences may span lines; FASTQ records are four lines each.
/// `.gz` input is decoded member by member, so BGZF files read as one
/// stream.
pub struct FastxReader {
    source: PathBuf,
    records: Records,
    records_read: u64,
    complete: bool,
}

impl FastxReader {
    /// Open `path`, decompressing when it ends in `.gz`.
    ///
    /// Fails with `InvalidStream` when the file cannot be opened or does not
    /// start with a FASTA or FASTQ header. An empty file is an empty stream.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ParseError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| ParseError::InvalidStream {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        let input: Box<dyn Read + Send> =
            if path.extension().and_then(|s| s.to_str()) == Some("gz") {
                Box::new(MultiGzDecoder::new(file))
            } else {
                Box::new(file)
            };

        Self::from_reader(path, input)
    }

    /// Wrap an already opened byte stream. `source` is only used in errors.
    pub fn from_reader(
        source: impl Into<PathBuf>,
        input: Box<dyn Read + Send>,
    ) -> Result<Self, ParseError> {
        let source = source.into();
        let mut input: Input = Box::new(BufReader::with_capacity(BUFFER_SIZE, input));

        let first = skip_blank(&mut input).map_err(|e| ParseError::InvalidStream {
            path: source.clone(),
            message: e.to_string(),
        })?;

        let (records, complete) = match first {
            None => (Records::Empty, true),
            Some(b'>') => (
                Records::Fasta(fasta::Reader::from_bufread(input).records()),
                false,
            ),
            Some(b'@') => (
                Records::Fastq(fastq::Reader::from_bufread(input).records()),
                false,
            ),
            Some(byte) => {
                return Err(ParseError::InvalidStream {
                    path: source,
                    message: format!(
                        "expected a FASTA or FASTQ header, found {:?}",
                        char::from(byte)
                    ),
                })
            }
        };

        Ok(Self {
            source,
            records,
            records_read: 0,
            complete,
        })
    }

    pub fn format(&self) -> Option<FastxFormat> {
        match self.records {
            Records::Fasta(_) => Some(FastxFormat::Fasta),
            Records::Fastq(_) => Some(FastxFormat::Fastq),
            Records::Empty => None,
        }
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    fn read_error(&self, error: io::Error) -> ParseError {
        match error.kind() {
            io::ErrorKind::Other | io::ErrorKind::InvalidData => {
                ParseError::stream_read(self.records_read, error.to_string())
            }
            _ => ParseError::Io {
                records_read: self.records_read,
                source: error,
            },
        }
    }

    fn read_next(&mut self) -> Result<Option<SequenceRecord>, ParseError> {
        let record = match &mut self.records {
            Records::Empty => None,
            Records::Fasta(records) => match records.next() {
                None => None,
                Some(Err(e)) => return Err(self.read_error(e)),
                Some(Ok(record)) => Some(SequenceRecord {
                    name: record.id().to_string(),
                    sequence: String::from_utf8_lossy(record.seq()).into_owned(),
                    quality: String::new(),
                    annotations: record.desc().unwrap_or_default().to_string(),
                }),
            },
            Records::Fastq(records) => match records.next() {
                None => None,
                Some(Err(e)) => {
                    return Err(ParseError::stream_read(self.records_read, e.to_string()))
                }
                Some(Ok(record)) => Some(SequenceRecord {
                    name: record.id().to_string(),
                    sequence: String::from_utf8_lossy(record.seq()).into_owned(),
                    quality: String::from_utf8_lossy(record.qual()).into_owned(),
                    annotations: record.desc().unwrap_or_default().to_string(),
                }),
            },
        };

        let Some(record) = record else {
            return Ok(None);
        };
        self.check(&record)?;
        self.records_read += 1;
        Ok(Some(record))
    }

    fn check(&self, record: &SequenceRecord) -> Result<(), ParseError> {
        if record.sequence.is_empty() {
            return Err(ParseError::stream_read(
                self.records_read,
                format!("record {:?} has no sequence", record.name),
            ));
        }
        if record.has_quality() && record.quality.len() != record.sequence.len() {
            return Err(ParseError::stream_read(
                self.records_read,
                format!(
                    "record {:?}: quality length {} differs from sequence length {}",
                    record.name,
                    record.quality.len(),
                    record.sequence.len()
                ),
            ));
        }
        Ok(())
    }
}

/// Consume leading whitespace and return the first content byte, if any.
fn skip_blank(input: &mut Input) -> io::Result<Option<u8>> {
    loop {
        let (skip, first) = {
            let buf = input.fill_buf()?;
            if buf.is_empty() {
                return Ok(None);
            }
            match buf.iter().position(|b| !b.is_ascii_whitespace()) {
                Some(pos) => (pos, Some(buf[pos])),
                None => (buf.len(), None),
            }
        };
        input.consume(skip);
        if first.is_some() {
            return Ok(first);
        }
    }
}

impl RecordReader for FastxReader {
    fn read_record(&mut self) -> Result<Option<SequenceRecord>, ParseError> {
        if self.complete {
            return Ok(None);
        }
        let result = self.read_next();
        if !matches!(result, Ok(Some(_))) {
            self.complete = true;
        }
        result
    }

    fn is_complete(&self) -> bool {
        self.complete
    }

    fn records_read(&self) -> u64 {
        self.records_read
    }
}

impl std::fmt::Debug for FastxReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FastxReader")
            .field("source", &self.source)
            .field("format", &self.format())
            .field("records_read", &self.records_read)
            .field("complete", &self.complete)
            .finish()
    }
}

/// Write `record` as FASTQ when it has quality, FASTA otherwise.
pub fn write_record<W: Write>(out: &mut W, record: &SequenceRecord) -> io::Result<()> {
    let header = if record.has_quality() { '@' } else { '>' };
    if record.annotations.is_empty() {
        writeln!(out, "{header}{}", record.name)?;
    } else {
        writeln!(out, "{header}{} {}", record.name, record.annotations)?;
    }
    writeln!(out, "{}", record.sequence)?;
    if record.has_quality() {
        writeln!(out, "+")?;
        writeln!(out, "{}", record.quality)?;
    }
    Ok(())
}
