//! Batch conversion of Scorer results files
//!
//! Each input is converted independently. A failure is logged with a hint
//! about what to do next, recorded in the summary and the batch moves on.

use anyhow::{Context, Result};
use log::{debug, error, info, warn};
use serde::Serialize;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use usebio_core::{convert_file, Conversion, ConvertError, ConvertOptions, WriteOptions};

/// Where and how converted documents are written
#[derive(Debug, Clone, Default)]
pub struct BatchOptions {
    pub convert: ConvertOptions,
    pub write: WriteOptions,
    /// Write each result to `<dir>/<default filename>` instead of stdout
    pub output_dir: Option<PathBuf>,
}

/// Outcome of converting one input file
#[derive(Debug, Clone, Serialize)]
pub struct ConversionSummary {
    pub input: PathBuf,
    /// `None` when written to stdout or when the conversion failed
    pub output: Option<PathBuf>,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    pub sections: usize,
    pub pairs: usize,
    pub boards_played: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ConversionSummary {
    fn converted(input: &Path, output: Option<PathBuf>, conversion: &Conversion) -> Self {
        let event = &conversion.event;
        Self {
            input: input.to_path_buf(),
            output,
            success: true,
            event: Some(event.name.clone()),
            date: Some(event.date.clone()),
            sections: event.session.sections.len(),
            pairs: event.session.pairs.len(),
            boards_played: event.boards_played(),
            error: None,
        }
    }

    fn failed(input: &Path, err: &anyhow::Error) -> Self {
        Self {
            input: input.to_path_buf(),
            output: None,
            success: false,
            event: None,
            date: None,
            sections: 0,
            pairs: 0,
            boards_played: 0,
            error: Some(format!("{:#}", err)),
        }
    }
}

/// Statistics from batch processing
#[derive(Debug, Default)]
pub struct ProcessingStats {
    pub converted: usize,
    pub failed: usize,
    /// Stdout was closed by its reader; remaining files were skipped
    pub output_closed: bool,
    pub summaries: Vec<ConversionSummary>,
}

/// Convert every file in `inputs`, continuing past failures
pub fn process_files(inputs: &[PathBuf], options: &BatchOptions) -> ProcessingStats {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    process_files_to(inputs, options, &mut out)
}

/// As [`process_files`], with results that have no output directory
/// written to `out`
fn process_files_to<W: Write>(
    inputs: &[PathBuf],
    options: &BatchOptions,
    out: &mut W,
) -> ProcessingStats {
    let mut stats = ProcessingStats::default();

    for input in inputs {
        match process_file(input, options, out) {
            Ok(summary) => {
                stats.converted += 1;
                stats.summaries.push(summary);
            }
            Err(err) if is_broken_pipe(&err) => {
                info!("Output closed; skipping remaining files after {:?}", input);
                stats.output_closed = true;
                break;
            }
            Err(err) => {
                stats.failed += 1;
                error!("{:?}: {:#}", input, err);
                if let Some(hint) = guidance(&err) {
                    warn!("{}", hint);
                }
                stats.summaries.push(ConversionSummary::failed(input, &err));
            }
        }
    }

    stats
}

fn process_file<W: Write>(
    input: &Path,
    options: &BatchOptions,
    out: &mut W,
) -> Result<ConversionSummary> {
    let conversion = convert_file(input, &options.convert)
        .with_context(|| format!("Failed to convert {:?}", input))?;

    let output = match &options.output_dir {
        Some(dir) => {
            let path = dir.join(conversion.event.default_filename());
            write_to_file(&conversion, &path, &options.write)?;
            info!("Wrote {:?}", path);
            Some(path)
        }
        None => {
            conversion
                .document
                .write(&mut *out, &options.write)
                .context("Failed to write USEBIO to stdout")?;
            writeln!(out)?;
            out.flush()?;
            None
        }
    };

    debug!(
        "{:?}: {} pairs, {} boards played",
        input,
        conversion.event.session.pairs.len(),
        conversion.event.boards_played()
    );
    Ok(ConversionSummary::converted(input, output, &conversion))
}

fn write_to_file(conversion: &Conversion, path: &Path, write: &WriteOptions) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create output directory {:?}", parent))?;
    }
    let file = File::create(path).with_context(|| format!("Failed to create {:?}", path))?;
    let mut writer = BufWriter::new(file);
    conversion
        .document
        .write(&mut writer, write)
        .with_context(|| format!("Failed to write {:?}", path))?;
    writer.flush()?;
    Ok(())
}

fn is_broken_pipe(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        cause
            .downcast_ref::<ConvertError>()
            .map_or(false, ConvertError::is_broken_pipe)
            || cause
                .downcast_ref::<io::Error>()
                .map_or(false, |e| e.kind() == io::ErrorKind::BrokenPipe)
    })
}

/// What the user should do about a failed conversion
fn guidance(err: &anyhow::Error) -> Option<&'static str> {
    let err = err.downcast_ref::<ConvertError>()?;
    if err.is_unsupported_event() {
        Some("Only match point scored pairs events can be converted")
    } else if err.is_invalid_results() {
        Some("The results look inconsistent; please raise a support ticket including the results file")
    } else {
        None
    }
}

/// Write the per-file summaries as a JSON array
pub fn write_summary(path: &Path, summaries: &[ConversionSummary]) -> Result<()> {
    let file = File::create(path).with_context(|| format!("Failed to create {:?}", path))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, summaries).context("Failed to write summary")?;
    writer.flush()?;
    Ok(())
}
