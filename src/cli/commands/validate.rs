//! The `validate` command.
//!
//! Loads each named configuration file through the normal loader and
//! reports the outcome without starting the engine.

use serde::Serialize;

use crate::cli::args::{OutputFormat, ValidateArgs};
use crate::config::load_config;
use crate::error::{ConfigError, GuildhallError};

#[derive(Debug, Serialize)]
struct FileReport {
    file: String,
    valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Validates configuration files.
///
/// # Errors
///
/// Returns a [`ConfigError`] summary when any file fails, so the
/// process exits with the configuration exit code.
pub fn run(args: &ValidateArgs) -> Result<(), GuildhallError> {
    let mut reports = Vec::with_capacity(args.files.len());
    for path in &args.files {
        let report = match load_config(path) {
            Ok(_) => FileReport {
                file: path.display().to_string(),
                valid: true,
                error: None,
            },
            Err(error) => FileReport {
                file: path.display().to_string(),
                valid: false,
                error: Some(error.to_string()),
            },
        };
        reports.push(report);
    }

    match args.format {
        OutputFormat::Human => {
            for report in &reports {
                if report.valid {
                    println!("{}: OK", report.file);
                } else if let Some(error) = &report.error {
                    println!("{}: {error}", report.file);
                }
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&reports)?);
        }
    }

    let failed = reports.iter().filter(|r| !r.valid).count();
    if failed > 0 {
        return Err(GuildhallError::Config(ConfigError::Invalid(format!(
            "{failed} of {} file(s) failed validation",
            reports.len()
        ))));
    }
    Ok(())
}
