//! Scorer to USEBIO: results upload converter
//!
//! Converts Scorer pairs results files to USEBIO 1.2 XML.

use anyhow::{Context, Result};
use clap::Parser;
use log::{debug, error, info};
use std::path::PathBuf;
use usebio_core::{ConvertOptions, WriteOptions, XmlCapabilities};

mod batch;

use batch::{process_files, write_summary, BatchOptions};

/// Scorer to USEBIO converter
///
/// Converts each Scorer results file to USEBIO 1.2 XML, written to stdout
/// or to a file named after the event date and name.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Args {
    /// Scorer results files to convert
    #[arg(value_name = "FILE", required = true)]
    files: Vec<PathBuf>,

    /// Indent the USEBIO output
    #[arg(short, long, default_value_t = false)]
    pretty: bool,

    /// Include the USEBIO 1.2 DOCTYPE declaration
    #[arg(short, long, default_value_t = false)]
    dtd: bool,

    /// Write each result to DIR/<date>-<event>.xml instead of stdout
    #[arg(short, long = "output-dir", value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// Write a JSON summary of every conversion to FILE
    #[arg(long, value_name = "FILE")]
    summary: Option<PathBuf>,

    /// Enable verbose logging (use -vv for trace output)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging based on verbosity level
    let log_level = match args.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp_millis()
        .init();

    info!("Scorer to USEBIO v{}", env!("CARGO_PKG_VERSION"));
    debug!("Files: {:?}", args.files);
    debug!("Output directory: {:?}", args.output_dir);

    let options = BatchOptions {
        convert: ConvertOptions {
            include_dtd: args.dtd,
            capabilities: XmlCapabilities::detect(),
        },
        write: WriteOptions {
            pretty: args.pretty,
        },
        output_dir: args.output_dir,
    };
    options
        .convert
        .validate()
        .context("Unsupported output options")?;

    let stats = process_files(&args.files, &options);

    if let Some(path) = &args.summary {
        write_summary(path, &stats.summaries)
            .with_context(|| format!("Failed to write summary {:?}", path))?;
        info!("Summary written to {:?}", path);
    }

    info!("Converted {} of {} files", stats.converted, args.files.len());

    if stats.failed > 0 {
        error!("{} files failed to convert", stats.failed);
        anyhow::bail!("{} of {} files failed to convert", stats.failed, args.files.len());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_args_are_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_parse_flags() {
        let args = Args::try_parse_from([
            "scorer_to_usebio",
            "-p",
            "-d",
            "-vv",
            "--output-dir",
            "out",
            "--summary",
            "summary.json",
            "a.xml",
            "b.xml",
        ])
        .unwrap();
        assert!(args.pretty);
        assert!(args.dtd);
        assert_eq!(args.verbose, 2);
        assert_eq!(args.output_dir, Some(PathBuf::from("out")));
        assert_eq!(args.summary, Some(PathBuf::from("summary.json")));
        assert_eq!(args.files, vec![PathBuf::from("a.xml"), PathBuf::from("b.xml")]);
    }

    #[test]
    fn test_requires_a_file() {
        assert!(Args::try_parse_from(["scorer_to_usebio"]).is_err());
    }
}
