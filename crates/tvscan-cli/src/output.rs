use std::io::{self, Write};

use serde::Serialize;
use serde_json::Value;
use tvscan_core::UtcDateTime;

use crate::cli::OutputFormat;
use crate::error::CliError;

/// Report metadata written beside the command payload.
#[derive(Debug, Clone, Serialize)]
pub struct ReportMeta {
    pub run_id: String,
    pub generated_at: UtcDateTime,
    pub command: &'static str,
    pub outcome: &'static str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub meta: ReportMeta,
    pub data: Value,
}

/// Rows for `--format table`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    pub headers: Vec<&'static str>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(headers: Vec<&'static str>) -> Self {
        Self {
            headers,
            rows: Vec::new(),
        }
    }

    pub fn push(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }

    fn widths(&self) -> Vec<usize> {
        let mut widths: Vec<usize> = self.headers.iter().map(|h| h.len()).collect();
        for row in &self.rows {
            for (index, cell) in row.iter().enumerate() {
                if let Some(width) = widths.get_mut(index) {
                    *width = (*width).max(cell.chars().count());
                }
            }
        }
        widths
    }

    fn write_to<W: Write>(&self, out: &mut W) -> io::Result<()> {
        let widths = self.widths();
        let line = |cells: Vec<&str>| -> String {
            cells
                .iter()
                .zip(&widths)
                .map(|(cell, width)| format!("{cell:<width$}"))
                .collect::<Vec<_>>()
                .join("  ")
                .trim_end()
                .to_owned()
        };

        writeln!(out, "{}", line(self.headers.clone()))?;
        writeln!(
            out,
            "{}",
            widths.iter().map(|w| "-".repeat(*w)).collect::<Vec<_>>().join("  ")
        )?;
        for row in &self.rows {
            writeln!(out, "{}", line(row.iter().map(String::as_str).collect()))?;
        }
        Ok(())
    }
}

/// Everything a command produced, renderable in each output format.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub report: Report,
    pub table: Table,
    pub lines: Vec<String>,
    pub failed: bool,
}

pub fn render(output: &CommandOutput, format: OutputFormat, pretty: bool) -> Result<(), CliError> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    render_to(&mut out, output, format, pretty)
}

pub fn render_to<W: Write>(
    out: &mut W,
    output: &CommandOutput,
    format: OutputFormat,
    pretty: bool,
) -> Result<(), CliError> {
    match format {
        OutputFormat::Json => {
            let payload = if pretty {
                serde_json::to_string_pretty(&output.report)?
            } else {
                serde_json::to_string(&output.report)?
            };
            writeln!(out, "{payload}")?;
        }
        OutputFormat::Table => render_table(out, output)?,
        OutputFormat::Text => {
            for line in &output.lines {
                writeln!(out, "{line}")?;
            }
        }
    }

    Ok(())
}

fn render_table<W: Write>(out: &mut W, output: &CommandOutput) -> Result<(), CliError> {
    let meta = &output.report.meta;
    writeln!(out, "run_id      : {}", meta.run_id)?;
    writeln!(out, "generated_at: {}", meta.generated_at)?;
    writeln!(out, "outcome     : {}", meta.outcome)?;

    if !meta.warnings.is_empty() {
        writeln!(out, "warnings:")?;
        for warning in &meta.warnings {
            writeln!(out, "  - {warning}")?;
        }
    }

    writeln!(out)?;
    output.table.write_to(out)?;
    Ok(())
}
