//! Rendering of dataset previews

mod json;
mod terminal;

use std::io::Write;

use anyhow::Result;

use crate::config::OutputFormat;
use crate::model::Table;

pub use json::JsonOutput;
pub use terminal::TerminalOutput;

/// Trait for preview formatters
pub trait PreviewFormatter {
    /// Render a titled table preview to a writer
    fn render(&self, title: &str, table: &Table, writer: &mut dyn Write) -> Result<()>;
}

/// Pick a formatter for `format`; `None` disables previews
pub fn formatter_for(format: OutputFormat) -> Option<Box<dyn PreviewFormatter>> {
    match format {
        OutputFormat::Terminal => Some(Box::new(TerminalOutput::new())),
        OutputFormat::Json => Some(Box::new(JsonOutput::new())),
        OutputFormat::None => None,
    }
}
