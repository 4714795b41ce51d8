//! Output formatting abstraction for text vs JSON rendering
//!
//! All subcommand output flows through [`OutputWriter`] which handles format switching.
//! The live report stream of a run is separate: it is written by the report sink
//! while facts are reconciled, see [`OutputWriter::report_stream`].

use std::io::{IsTerminal, Write};

use colored::Colorize;
use serde::Serialize;

use bulwark_core::report::PlainTags;
use bulwark_core::{Status, TagStyle};

use crate::cli::OutputFormat;
use crate::error::CliError;

/// Abstraction for writing CLI output in different formats.
///
/// Subcommand handlers call `writer.render(&payload)` where `payload`
/// implements both `Serialize` (for JSON) and `Render` (for text).
pub struct OutputWriter {
    format: OutputFormat,
}

impl OutputWriter {
    /// Create a new output writer with the specified format.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use bulwark_cli::output::OutputWriter;
    /// use bulwark_cli::cli::OutputFormat;
    ///
    /// let writer = OutputWriter::new(OutputFormat::Text);
    /// ```
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Selected output format.
    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Render a payload to stdout.
    ///
    /// For `Text` format, delegates to `Render::render_text()`.
    /// For `Json` format, serialises via `serde_json`.
    pub fn render<T: Render + Serialize>(&self, payload: &T) -> Result<(), CliError> {
        let stdout = std::io::stdout();
        let mut handle = stdout.lock();
        match self.format {
            OutputFormat::Text => {
                payload.render_text(&mut handle)?;
            }
            OutputFormat::Json => {
                serde_json::to_writer_pretty(&mut handle, payload)?;
                writeln!(handle)?;
            }
        }
        Ok(())
    }

    /// Interactive stream for the report sink.
    ///
    /// Text output mirrors report lines to stdout as they are produced,
    /// colored when stdout is a terminal. JSON output keeps stdout clean
    /// for the final document.
    pub fn report_stream(&self) -> (Box<dyn Write + Send>, Box<dyn TagStyle>) {
        match self.format {
            OutputFormat::Text => {
                let stdout = std::io::stdout();
                let style: Box<dyn TagStyle> = if stdout.is_terminal() {
                    Box::new(ColorTags)
                } else {
                    Box::new(PlainTags)
                };
                (Box::new(stdout), style)
            }
            OutputFormat::Json => (Box::new(std::io::sink()), Box::new(PlainTags)),
        }
    }
}

/// Trait for human-readable text rendering.
///
/// Implemented by every CLI output payload alongside `serde::Serialize`.
pub trait Render {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()>;
}

/// Terminal tag colors for the live report stream.
#[derive(Debug, Clone, Copy, Default)]
pub struct ColorTags;

impl TagStyle for ColorTags {
    fn paint(&self, status: Status, tag: &str) -> String {
        match status {
            Status::Pass | Status::Ok => tag.green().bold().to_string(),
            Status::Fail => tag.red().bold().to_string(),
            Status::Warn => tag.yellow().bold().to_string(),
            Status::Info => tag.blue().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct TestPayload {
        field1: String,
        field2: u32,
    }

    impl Render for TestPayload {
        fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
            writeln!(w, "Field1: {}", self.field1)?;
            writeln!(w, "Field2: {}", self.field2)?;
            Ok(())
        }
    }

    #[test]
    fn test_render_text_to_buffer() {
        let payload = TestPayload {
            field1: "host".to_owned(),
            field2: 3,
        };
        let mut buffer = Vec::new();
        payload
            .render_text(&mut buffer)
            .expect("text rendering should succeed");
        let output = String::from_utf8(buffer).expect("valid UTF-8");
        assert!(output.contains("Field1: host"));
        assert!(output.contains("Field2: 3"));
    }

    #[test]
    fn test_color_tags_keep_tag_text() {
        colored::control::set_override(true);
        let painted = ColorTags.paint(Status::Fail, "[FAIL]");
        colored::control::unset_override();
        assert!(painted.contains("[FAIL]"));
        assert_ne!(painted, "[FAIL]", "tag should carry ANSI codes");
    }

    #[test]
    fn test_json_stream_is_plain() {
        let writer = OutputWriter::new(OutputFormat::Json);
        let (_stream, style) = writer.report_stream();
        assert_eq!(style.paint(Status::Pass, "[PASS]"), "[PASS]");
        assert_eq!(writer.format(), OutputFormat::Json);
    }
}
