#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! `carelink`: converts CareLink therapy profiles and event exports to JSON.
//!
//! Uses `indicatif-log-bridge` (via [`carelink_cli_utils::init_logger`])
//! to route `log` output through `indicatif::MultiProgress` so that log
//! lines and the per-file progress bar never fight for the terminal.

use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use carelink_cli_utils::{IndicatifProgress, MultiProgress, ProgressCallback, null_progress};
use carelink_export::{ExportError, ExportParser};
use carelink_parsing::Tz;
use carelink_profile::ProfileParser;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "carelink", about = "CareLink export parser")]
struct Cli {
    /// IANA time zone the exports were recorded in
    #[arg(long, global = true, default_value = "Europe/Vienna")]
    timezone: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract therapy profiles (one JSON object per file)
    Profile {
        /// Profile documents (`.json` page dumps, or `.pdf` with the `pdf` feature)
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Report language
        #[arg(long, default_value = "de")]
        locale: String,
        /// Pretty-print the JSON output
        #[arg(long)]
        pretty: bool,
    },
    /// Convert delimited event exports (one JSON line per row)
    Export {
        /// Semicolon-separated export files
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Include each row's section divider and unprocessed columns
        #[arg(long)]
        raw: bool,
    },
    /// List the supported profile report languages
    Locales,
}

fn progress_for(multi: &MultiProgress, message: &str, files: usize) -> Arc<dyn ProgressCallback> {
    if files > 1 {
        IndicatifProgress::files_bar(multi, message, u64::try_from(files).unwrap_or(u64::MAX))
    } else {
        null_progress()
    }
}

/// Runs `work` for each file, logging failures instead of aborting the
/// batch. Returns the number of files that failed.
fn for_each_file<E: std::fmt::Display>(
    files: &[PathBuf],
    progress: &dyn ProgressCallback,
    mut work: impl FnMut(&Path) -> Result<(), E>,
) -> usize {
    let mut failed = 0;

    for path in files {
        progress.set_message(path.display().to_string());
        if let Err(e) = work(path.as_path()) {
            log::error!("Failed to parse {}: {e}", path.display());
            failed += 1;
        }
        progress.inc(1);
    }

    progress.finish(format!("Parsed {} file(s)", files.len() - failed));
    failed
}

fn run_profiles(
    multi: &MultiProgress,
    files: &[PathBuf],
    locale: &str,
    timezone: Tz,
    pretty: bool,
) -> Result<usize, Box<dyn std::error::Error>> {
    let parser = ProfileParser::new(locale, timezone)?;
    let progress = progress_for(multi, "Profiles", files.len());
    let mut stdout = std::io::stdout().lock();

    Ok(for_each_file(files, progress.as_ref(), |path| {
        let source = carelink_profile::source::open(path)?;
        let profile = parser.parse_source(source.as_ref())?;
        let json = if pretty {
            serde_json::to_string_pretty(&profile)?
        } else {
            serde_json::to_string(&profile)?
        };
        writeln!(stdout, "{json}")?;
        Ok::<_, Box<dyn std::error::Error>>(())
    }))
}

fn run_exports(
    multi: &MultiProgress,
    files: &[PathBuf],
    timezone: Tz,
    raw: bool,
) -> usize {
    let parser = ExportParser::new(timezone);
    let progress = progress_for(multi, "Exports", files.len());
    let mut stdout = std::io::BufWriter::new(std::io::stdout().lock());

    let failed = for_each_file(files, progress.as_ref(), |path| {
        let mut write_error = None;

        parser.parse_file(path, |record, row| {
            if write_error.is_some() {
                return;
            }
            let line = if raw {
                serde_json::to_value(&record).and_then(|mut value| {
                    value["marker"] = row.marker.into();
                    value["raw"] = serde_json::to_value(row.values)?;
                    Ok(value.to_string())
                })
            } else {
                serde_json::to_string(&record)
            };
            let written = line
                .map_err(std::io::Error::from)
                .and_then(|line| writeln!(stdout, "{line}"));
            if let Err(e) = written {
                write_error = Some(e);
            }
        })?;

        write_error.map_or(Ok(()), |e| Err(ExportError::Io(e)))
    });

    if let Err(e) = stdout.flush() {
        log::error!("Failed to flush output: {e}");
    }

    failed
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = carelink_cli_utils::init_logger();
    let cli = Cli::parse();

    let failed = match cli.command {
        Commands::Locales => {
            for locale in carelink_profile::locale::available_locales() {
                println!("{locale}");
            }
            0
        }
        Commands::Profile {
            files,
            locale,
            pretty,
        } => {
            let timezone = carelink_parsing::resolve_timezone(&cli.timezone)?;
            run_profiles(&multi, &files, &locale, timezone, pretty)?
        }
        Commands::Export { files, raw } => {
            let timezone = carelink_parsing::resolve_timezone(&cli.timezone)?;
            run_exports(&multi, &files, timezone, raw)
        }
    };

    if failed > 0 {
        return Err(format!("{failed} file(s) could not be parsed").into());
    }

    Ok(())
}
