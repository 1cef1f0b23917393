//! JSON persistence for tables, tag sets and partition maps.
//!
//! Each file is a `{format, version, body}` document so a file of one kind
//! is rejected when loaded as another.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use seqbind_core::errors::{EngineError, EngineResult};

const FORMAT_VERSION: u32 = 1;

#[derive(Serialize)]
struct Envelope<'a, T> {
    format: &'a str,
    version: u32,
    body: &'a T,
}

#[derive(Deserialize)]
struct OwnedEnvelope<T> {
    format: String,
    version: u32,
    body: T,
}

pub fn save<T: Serialize>(path: &Path, format: &str, body: &T) -> EngineResult<()> {
    let file = File::create(path).map_err(|e| EngineError::file(path, e))?;
    let mut writer = BufWriter::new(file);
    let envelope = Envelope {
        format,
        version: FORMAT_VERSION,
        body,
    };
    serde_json::to_writer(&mut writer, &envelope).map_err(|e| EngineError::file(path, e))?;
    writer.flush().map_err(|e| EngineError::file(path, e))?;
    tracing::debug!(path = %path.display(), format, "saved");
    Ok(())
}

pub fn load<T: DeserializeOwned>(path: &Path, format: &str) -> EngineResult<T> {
    let file = File::open(path).map_err(|e| EngineError::file(path, e))?;
    let envelope: OwnedEnvelope<T> = serde_json::from_reader(BufReader::new(file))
        .map_err(|e| EngineError::file(path, e))?;
    if envelope.format != format {
        return Err(EngineError::file(
            path,
            format!("expected a {format} file, found {}", envelope.format),
        ));
    }
    if envelope.version != FORMAT_VERSION {
        return Err(EngineError::file(
            path,
            format!("unsupported {format} version {}", envelope.version),
        ));
    }
    tracing::debug!(path = %path.display(), format, "loaded");
    Ok(envelope.body)
}
