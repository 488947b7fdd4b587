//! Output formatting: JSON or plain lines.

use std::io::{self, Write};

use serde::Serialize;

use crate::cli::OutputFormat;
use crate::error::CliError;

/// Render `data` in the chosen format. `plain_fn` produces the line-per-item
/// view.
pub fn render<T>(
    format: OutputFormat,
    data: &T,
    plain_fn: impl Fn(&T) -> Vec<String>,
) -> Result<String, CliError>
where
    T: Serialize,
{
    match format {
        OutputFormat::Json => render_json(data, false),
        OutputFormat::JsonCompact => render_json(data, true),
        OutputFormat::Plain => Ok(plain_fn(data).join("\n")),
    }
}

pub fn render_json<T: Serialize>(data: &T, compact: bool) -> Result<String, CliError> {
    let rendered = if compact {
        serde_json::to_string(data)
    } else {
        serde_json::to_string_pretty(data)
    };
    rendered.map_err(|e| CliError::Render(e.to_string()))
}

/// Print the rendered output to stdout, respecting quiet mode.
pub fn print_output(output: &str, quiet: bool) {
    if quiet || output.is_empty() {
        return;
    }
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{output}");
}
