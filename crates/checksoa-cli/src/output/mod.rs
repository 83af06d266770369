//! Rendering results as text or JSON.

pub mod json;

use std::io::Write;

use checksoa_client::{CheckError, Report, ResultSink};
use checksoa_core::{MasterResult, SerialResult};
use chrono::{DateTime, Utc};
use colored::Colorize;
use tracing::warn;

use self::json::JsonOutput;

/// Timestamp format of the report header
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%Z";

/// Header timestamp, in UTC so `%Z` renders as a zone name
#[must_use]
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

/// Available output formats.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// One line per server
    #[default]
    Pretty,
    /// A single JSON object at the end of the run
    Json,
}

impl OutputFormat {
    /// Select from the `--json` flag
    #[must_use]
    pub const fn from_json_flag(json: bool) -> Self {
        if json {
            Self::Json
        } else {
            Self::Pretty
        }
    }

    /// JSON needs the full result set before printing anything
    #[must_use]
    pub const fn is_buffered(self) -> bool {
        matches!(self, Self::Json)
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pretty => write!(f, "pretty"),
            Self::Json => write!(f, "json"),
        }
    }
}

/// Master line: serial, the `MASTER` tag, name, address and response time
#[must_use]
pub fn master_line(master: &MasterResult, show_nsid: bool) -> String {
    let mut line = format!(
        "{:>15} [{:>8}] {} {} {:.2}ms",
        master.serial,
        "MASTER".bold(),
        master.name,
        master.address,
        master.elapsed_ms()
    );
    append_nsid(&mut line, master.nsid.as_deref(), show_nsid);
    line
}

/// One result line; failures become `Error:` lines
#[must_use]
pub fn result_line(result: &SerialResult, show_nsid: bool) -> String {
    let address = result
        .address
        .map_or_else(|| "-".to_string(), |ip| ip.to_string());

    let serial = match &result.outcome {
        Ok(serial) => *serial,
        Err(err) => {
            return format!(
                "{} {} {}: couldn't obtain serial: {}",
                "Error:".red().bold(),
                result.server_name,
                address,
                err
            );
        }
    };

    let mut line = match result.delta {
        Some(0) => format!("{serial:>15} [{:>8}] ", 0),
        Some(delta) => format!("{serial:>15} [{}] ", format!("{delta:>8}").yellow()),
        None => format!("{serial:>15} "),
    };
    line.push_str(&format!(
        "{} {} {:.2}ms",
        result.server_name,
        address,
        result.elapsed_ms()
    ));
    append_nsid(&mut line, result.nsid.as_deref(), show_nsid);
    line
}

fn append_nsid(line: &mut String, nsid: Option<&str>, show_nsid: bool) {
    if let (true, Some(nsid)) = (show_nsid, nsid) {
        line.push(' ');
        line.push_str(nsid);
    }
}

/// Writes a run to `out` in the selected format.
///
/// In immediate mode (pretty and unsorted) the header is written by
/// [`Reporter::begin`] and lines are written as results arrive; otherwise
/// everything is written by [`Reporter::finish`].
pub struct Reporter<W: Write> {
    out: W,
    format: OutputFormat,
    zone: String,
    timestamp: String,
    show_nsid: bool,
    immediate: bool,
    header_written: bool,
}

impl<W: Write> Reporter<W> {
    /// Create a reporter for one zone
    pub fn new(out: W, format: OutputFormat, zone: &str, timestamp: &str, show_nsid: bool, sort: bool) -> Self {
        Self {
            out,
            format,
            zone: zone.to_string(),
            timestamp: timestamp.to_string(),
            show_nsid,
            immediate: !sort && !format.is_buffered(),
            header_written: false,
        }
    }

    /// Whether results should be relayed as they arrive
    #[must_use]
    pub const fn is_immediate(&self) -> bool {
        self.immediate
    }

    /// Start of the run
    pub fn begin(&mut self) -> std::io::Result<()> {
        if self.immediate {
            self.write_header()?;
        }
        Ok(())
    }

    /// Write a completed run
    pub fn finish(&mut self, report: &Report) -> std::io::Result<()> {
        match self.format {
            OutputFormat::Json => {
                let doc = JsonOutput::from_report(report, &self.timestamp);
                write_json(&mut self.out, &doc)
            }
            OutputFormat::Pretty => {
                if !self.immediate {
                    self.write_header()?;
                    if let Some(master) = &report.master {
                        writeln!(self.out, "{}", master_line(master, self.show_nsid))?;
                    }
                    for result in &report.responses {
                        writeln!(self.out, "{}", result_line(result, self.show_nsid))?;
                    }
                }
                if let Some(message) = report.error_message() {
                    self.write_error(&message)?;
                }
                self.out.flush()
            }
        }
    }

    /// Write a run that ended with a fatal error
    pub fn fatal(&mut self, err: &CheckError) -> std::io::Result<()> {
        match self.format {
            OutputFormat::Json => {
                let doc = JsonOutput::from_error(err, &self.zone, &self.timestamp);
                write_json(&mut self.out, &doc)
            }
            OutputFormat::Pretty => {
                self.write_error(&err.to_string())?;
                self.out.flush()
            }
        }
    }

    /// Give back the writer
    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_header(&mut self) -> std::io::Result<()> {
        if !self.header_written {
            writeln!(self.out, "## {} {}", self.zone, self.timestamp)?;
            self.header_written = true;
        }
        Ok(())
    }

    fn write_error(&mut self, message: &str) -> std::io::Result<()> {
        writeln!(self.out, "{} {}", "Error:".red().bold(), message)
    }
}

fn write_json<W: Write>(out: &mut W, doc: &JsonOutput<'_>) -> std::io::Result<()> {
    serde_json::to_writer(&mut *out, doc)?;
    writeln!(out)?;
    out.flush()
}

impl<W: Write> ResultSink for Reporter<W> {
    fn on_master(&mut self, master: &MasterResult) {
        let line = master_line(master, self.show_nsid);
        if let Err(err) = writeln!(self.out, "{line}") {
            warn!(error = %err, "failed to write master line");
        }
    }

    fn on_result(&mut self, result: &SerialResult) {
        let line = result_line(result, self.show_nsid);
        if let Err(err) = writeln!(self.out, "{line}") {
            warn!(error = %err, "failed to write result line");
        }
    }
}
