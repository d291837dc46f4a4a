//! Versioned JSON artifacts for the fitted vectorizer and classifier
//!
//! Each artifact is a JSON envelope:
//!
//! ```text
//! { "format": "protox-vectorizer", "version": 1, "payload": { ... } }
//! ```
//!
//! Paths ending in `.gz` are written gzip-compressed; reading detects
//! compression automatically. Every failure while loading (missing file,
//! malformed JSON, wrong format tag, unsupported version, payload that fails
//! validation) surfaces as [`ProtoxError::Load`] naming the path.

use crate::error::{ProtoxError, Result};
use crate::io::compression::{CompressedReader, CompressedWriter, DataSource};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Current artifact layout version
pub const ARTIFACT_VERSION: u32 = 1;

/// Kind of persisted state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    /// Fitted [`crate::features::KmerVectorizer`]
    Vectorizer,
    /// Fitted [`crate::model::RandomForest`]
    Classifier,
}

impl ArtifactKind {
    /// Format tag stored in the envelope
    pub fn tag(self) -> &'static str {
        match self {
            ArtifactKind::Vectorizer => "protox-vectorizer",
            ArtifactKind::Classifier => "protox-classifier",
        }
    }
}

#[derive(Serialize)]
struct EnvelopeRef<'a, T> {
    format: &'a str,
    version: u32,
    payload: &'a T,
}

#[derive(Deserialize)]
struct EnvelopeHeader {
    format: String,
    version: u32,
}

#[derive(Deserialize)]
struct Envelope<T> {
    payload: T,
}

/// Write `payload` to `path` as an artifact of `kind`
pub fn save<T: Serialize, P: AsRef<Path>>(path: P, kind: ArtifactKind, payload: &T) -> Result<()> {
    let path = path.as_ref();
    let mut writer = CompressedWriter::create(path)?;
    serde_json::to_writer(
        &mut writer,
        &EnvelopeRef {
            format: kind.tag(),
            version: ARTIFACT_VERSION,
            payload,
        },
    )?;
    writer.finish()?;

    tracing::debug!(path = %path.display(), format = kind.tag(), "saved artifact");
    Ok(())
}

/// Read an artifact of `kind` from `path`
///
/// The envelope header is checked before the payload is decoded, so a
/// mismatched file reports the format problem rather than a payload error.
pub fn load<T: DeserializeOwned, P: AsRef<Path>>(path: P, kind: ArtifactKind) -> Result<T> {
    let path = path.as_ref();
    let load_error = |msg: String| ProtoxError::load(path, msg);

    if !path.exists() {
        return Err(load_error("file not found".to_string()));
    }

    let reader = CompressedReader::new(DataSource::from_path(path))
        .map_err(|e| load_error(e.to_string()))?;
    let value: serde_json::Value =
        serde_json::from_reader(reader).map_err(|e| load_error(format!("malformed JSON: {}", e)))?;

    let header = EnvelopeHeader::deserialize(&value)
        .map_err(|e| load_error(format!("not a protox artifact: {}", e)))?;
    if header.format != kind.tag() {
        return Err(load_error(format!(
            "expected a {} artifact, found {}",
            kind.tag(),
            header.format
        )));
    }
    if header.version != ARTIFACT_VERSION {
        return Err(load_error(format!(
            "unsupported artifact version {} (expected {})",
            header.version, ARTIFACT_VERSION
        )));
    }

    let envelope: Envelope<T> = serde_json::from_value(value)
        .map_err(|e| load_error(format!("incompatible {}: {}", kind.tag(), e)))?;

    tracing::debug!(path = %path.display(), format = kind.tag(), "loaded artifact");
    Ok(envelope.payload)
}
