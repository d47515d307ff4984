//! Output formatting for the CLI.

use crate::config::OutputFormat;
use crate::error::{CliError, Result};
use chrono::{DateTime, Local};
use colored::*;
use needle_domain::{Record, RecordSchema, SchemaRegistry};
use needle_extractor::ExtractionMetadata;
use std::fs;
use std::path::{Path, PathBuf};
use tabled::{
    builder::Builder,
    settings::{object::Rows, Alignment, Modify, Style},
};

/// Needles shown in the post-run sample
pub const SAMPLE_SIZE: usize = 3;

/// Output formatter.
pub struct Formatter {
    format: OutputFormat,
    color_enabled: bool,
}

impl Formatter {
    /// Create a new formatter.
    pub fn new(format: OutputFormat, color_enabled: bool) -> Self {
        Self {
            format,
            color_enabled,
        }
    }

    /// Selected output format.
    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Extension of the file written for the selected format.
    pub fn file_extension(&self) -> &'static str {
        match self.format {
            OutputFormat::Json => "json",
            OutputFormat::Csv | OutputFormat::Table => "csv",
        }
    }

    /// Render needles as the file contents for the selected format.
    pub fn render_file(&self, schema: &RecordSchema, needles: &[Record]) -> Result<String> {
        match self.format {
            OutputFormat::Json => format_needles_json(needles),
            OutputFormat::Csv | OutputFormat::Table => format_needles_csv(schema, needles),
        }
    }

    /// Render everything in memory, then write it to `dir` in one go.
    ///
    /// Returns the path written.
    pub fn write_needles(
        &self,
        dir: &Path,
        schema: &RecordSchema,
        needles: &[Record],
        timestamp: &DateTime<Local>,
    ) -> Result<PathBuf> {
        let contents = self.render_file(schema, needles)?;
        fs::create_dir_all(dir)?;
        let path = dir.join(output_file_name(schema.name(), timestamp, self.file_extension()));
        fs::write(&path, contents)?;
        Ok(path)
    }

    /// Format needles as a table.
    pub fn format_needles_table(&self, schema: &RecordSchema, needles: &[Record]) -> String {
        if needles.is_empty() {
            return self.colorize("No needles found.", "yellow");
        }

        let mut builder = Builder::default();
        builder.push_record(schema.field_names());
        for needle in needles {
            builder.push_record(needle.values().map(|v| v.to_string()));
        }

        let mut table = builder.build();
        table
            .with(Style::rounded())
            .with(Modify::new(Rows::first()).with(Alignment::center()));

        table.to_string()
    }

    /// Format the known schemas.
    pub fn format_schemas(&self, registry: &SchemaRegistry) -> Result<String> {
        if self.format == OutputFormat::Json {
            let schemas: Vec<&RecordSchema> = registry.iter().collect();
            return Ok(serde_json::to_string_pretty(&schemas)?);
        }

        let mut builder = Builder::default();
        builder.push_record(["Schema", "Field", "Type", "Description"]);
        for schema in registry.iter() {
            for (i, field) in schema.fields().iter().enumerate() {
                let name = if i == 0 { schema.name() } else { "" };
                builder.push_record([
                    name,
                    field.name.as_str(),
                    field.kind.as_str(),
                    field.description.as_deref().unwrap_or(""),
                ]);
            }
        }

        let mut table = builder.build();
        table
            .with(Style::rounded())
            .with(Modify::new(Rows::first()).with(Alignment::center()));

        Ok(table.to_string())
    }

    /// One-line run summary.
    pub fn run_summary(&self, metadata: &ExtractionMetadata) -> String {
        let mut line = format!(
            "{} chunks ({} failed), {} candidates, {} filtered, {} duplicates",
            metadata.chunks_total,
            metadata.chunks_failed,
            metadata.candidates_total,
            metadata.filtered_out,
            metadata.duplicates_removed
        );
        if metadata.rejected_by_verification > 0 {
            line.push_str(&format!(
                ", {} rejected by verification",
                metadata.rejected_by_verification
            ));
        }
        line.push_str(&format!(" in {} ms", metadata.processing_time_ms));

        if metadata.chunks_failed > 0 {
            self.warning(&line)
        } else {
            self.info(&line)
        }
    }

    /// Format a success message.
    pub fn success(&self, message: &str) -> String {
        self.colorize(&format!("✓ {}", message), "green")
    }

    /// Format an info message.
    pub fn info(&self, message: &str) -> String {
        self.colorize(&format!("ℹ {}", message), "blue")
    }

    /// Format a warning message.
    pub fn warning(&self, message: &str) -> String {
        self.colorize(&format!("⚠ {}", message), "yellow")
    }

    /// Colorize text if color is enabled.
    fn colorize(&self, text: &str, color: &str) -> String {
        if !self.color_enabled {
            return text.to_string();
        }

        match color {
            "green" => text.green().to_string(),
            "blue" => text.blue().to_string(),
            "yellow" => text.yellow().to_string(),
            _ => text.to_string(),
        }
    }
}

/// `extracted_needles_<schema>_<YYYYmmdd_HHMMSS>.<ext>`
pub fn output_file_name(schema_name: &str, timestamp: &DateTime<Local>, extension: &str) -> String {
    format!(
        "extracted_needles_{}_{}.{}",
        schema_name,
        timestamp.format("%Y%m%d_%H%M%S"),
        extension
    )
}

/// CSV with a header row of schema fields; nulls become empty cells.
pub fn format_needles_csv(schema: &RecordSchema, needles: &[Record]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(schema.field_names())?;
    for needle in needles {
        writer.write_record(needle.values().map(|v| v.to_string()))?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| CliError::Io(e.into_error()))?;
    String::from_utf8(bytes).map_err(|e| CliError::InvalidInput(e.to_string()))
}

/// Pretty JSON array of objects in schema field order.
pub fn format_needles_json(needles: &[Record]) -> Result<String> {
    Ok(serde_json::to_string_pretty(needles)?)
}
