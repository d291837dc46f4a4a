//! Rendering predictions and training runs for the command line
//!
//! Every writer takes a generic [`Write`], so the same code prints to stdout
//! and into a buffer under test.
//!
//! # Batch output
//!
//! Text mode prints a tab-separated table:
//!
//! ```text
//! id        label      probability  confidence
//! toxin_01  Toxic      0.9333       0.9333
//! #2        error      Invalid FASTA format at line 3: ...
//! ```
//!
//! JSON mode prints one object per line, `{"id","label","probability","confidence"}`
//! for predictions and `{"record","error"}` for records that failed. A failed
//! record never stops the batch.

use crate::error::Result;
use crate::predictor::{ArtifactPaths, ToxicityPredictor};
use crate::training::TrainingSummary;
use crate::types::{FastaRecord, Prediction};
use serde::Serialize;
use serde_json::json;
use std::io::Write;

/// How results are written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Human-readable text
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

impl OutputFormat {
    /// [`OutputFormat::Json`] when `json` is set
    pub fn from_json_flag(json: bool) -> Self {
        if json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

/// Counts for a finished batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    /// Records seen, failed ones included
    pub total: usize,
    /// Records labelled toxic
    pub toxic: usize,
    /// Records that could not be parsed or classified
    pub failed: usize,
}

/// JSON object for one prediction; `id` is null for a bare sequence
pub fn prediction_json(id: Option<&str>, prediction: &Prediction) -> serde_json::Value {
    json!({
        "id": id,
        "label": prediction.label,
        "probability": prediction.probability,
        "confidence": prediction.confidence(),
    })
}

/// Write the result of classifying a single sequence
pub fn write_prediction<W: Write>(
    out: &mut W,
    prediction: &Prediction,
    format: OutputFormat,
) -> Result<()> {
    match format {
        OutputFormat::Json => writeln!(out, "{}", prediction_json(None, prediction))?,
        OutputFormat::Text => {
            writeln!(out, "Prediction: {}", prediction.label)?;
            writeln!(
                out,
                "Probability of being toxic: {:.2}%",
                prediction.probability * 100.0
            )?;
            writeln!(out, "Confidence: {:.2}%", prediction.confidence() * 100.0)?;
        }
    }
    Ok(())
}

/// Write a training summary and where the artifacts went
pub fn write_training<W: Write>(
    out: &mut W,
    summary: &TrainingSummary,
    paths: &ArtifactPaths,
    format: OutputFormat,
) -> Result<()> {
    match format {
        OutputFormat::Json => {
            let report = json!({
                "summary": summary,
                "vectorizer": paths.vectorizer,
                "classifier": paths.classifier,
            });
            writeln!(out, "{}", report)?;
        }
        OutputFormat::Text => {
            writeln!(out, "Toxic sequences:     {}", summary.toxic)?;
            writeln!(out, "Non-toxic sequences: {}", summary.non_toxic)?;
            writeln!(out, "Vocabulary size:     {}", summary.vocabulary)?;
            writeln!(out, "Trees:               {}", summary.trees)?;
            writeln!(
                out,
                "Training accuracy:   {:.2}%",
                summary.training_accuracy * 100.0
            )?;
            writeln!(out, "Vectorizer saved to  {}", paths.vectorizer.display())?;
            writeln!(out, "Model saved to       {}", paths.classifier.display())?;
        }
    }
    Ok(())
}

/// Classify every record and write one line per record
///
/// Records that fail to parse or classify are written inline as errors and
/// counted in [`BatchSummary::failed`]; the batch goes on with the next one.
///
/// # Errors
///
/// Only failures to write to `out`.
pub fn write_batch<I, W>(
    predictor: &ToxicityPredictor,
    records: I,
    out: &mut W,
    format: OutputFormat,
) -> Result<BatchSummary>
where
    I: IntoIterator<Item = Result<FastaRecord>>,
    W: Write,
{
    if format == OutputFormat::Text {
        writeln!(out, "id\tlabel\tprobability\tconfidence")?;
    }

    let mut summary = BatchSummary::default();
    for record in records {
        summary.total += 1;
        let outcome = record.and_then(|record| {
            let prediction = predictor.predict(&record.sequence)?;
            Ok((record.id, prediction))
        });

        match outcome {
            Ok((id, prediction)) => {
                if prediction.is_toxic() {
                    summary.toxic += 1;
                }
                match format {
                    OutputFormat::Json => {
                        writeln!(out, "{}", prediction_json(Some(&id), &prediction))?
                    }
                    OutputFormat::Text => writeln!(
                        out,
                        "{}\t{}\t{:.4}\t{:.4}",
                        id,
                        prediction.label,
                        prediction.probability,
                        prediction.confidence()
                    )?,
                }
            }
            Err(e) => {
                summary.failed += 1;
                tracing::warn!(record = summary.total, error = %e, "skipped record");
                match format {
                    OutputFormat::Json => writeln!(
                        out,
                        "{}",
                        json!({ "record": summary.total, "error": e.to_string() })
                    )?,
                    OutputFormat::Text => writeln!(out, "#{}\terror\t{}", summary.total, e)?,
                }
            }
        }
    }

    tracing::info!(
        total = summary.total,
        toxic = summary.toxic,
        failed = summary.failed,
        "batch complete"
    );
    Ok(summary)
}
