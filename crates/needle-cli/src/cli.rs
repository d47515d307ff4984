//! CLI command definitions and argument parsing.

use crate::config::{OutputFormat, ProviderKind};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Needle - Find structured needles hidden in a text haystack.
#[derive(Debug, Parser)]
#[command(name = "needle")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Output format
    #[arg(short, long, value_enum, global = true)]
    pub format: Option<CliFormat>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Configuration file path
    #[arg(short, long, global = true, env = "NEEDLE_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum CliFormat {
    /// CSV file (default)
    Csv,
    /// JSON file
    Json,
    /// CSV file plus a table on stdout
    Table,
}

/// Model provider options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ProviderArg {
    /// OpenAI-compatible chat completions
    Openai,
    /// Local Ollama server
    Ollama,
}

/// CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Extract needles from a text file
    Extract(ExtractArgs),

    /// List known schemas
    Schemas,

    /// Show the effective configuration
    Config(ConfigArgs),
}

/// Arguments for the extract command.
#[derive(Debug, Parser)]
pub struct ExtractArgs {
    /// Path to the text file to process
    #[arg(short, long, default_value = "data/haystack.txt")]
    pub text_file: PathBuf,

    /// Name of the schema to extract
    #[arg(short, long, default_value = "TechCompany")]
    pub schema: String,

    /// Example needles shown to the model
    #[arg(short, long, num_args = 1..)]
    pub examples: Vec<String>,

    /// Remove quoted dialogue before searching
    #[arg(long)]
    pub remove_dialogue: bool,

    /// Confirm each needle with a second model call
    #[arg(long)]
    pub verify: bool,

    /// Directory for the output file
    #[arg(short, long, default_value = "data")]
    pub output_dir: PathBuf,

    /// Model provider (overrides config)
    #[arg(long, value_enum)]
    pub provider: Option<ProviderArg>,

    /// Extraction model (overrides config)
    #[arg(short, long)]
    pub model: Option<String>,

    /// Token budget per chunk (overrides config)
    #[arg(long)]
    pub max_chunk_tokens: Option<usize>,
}

/// Arguments for the config command.
#[derive(Debug, Parser)]
pub struct ConfigArgs {
    /// Write the effective configuration to the config file
    #[arg(long)]
    pub write: bool,
}

impl From<CliFormat> for OutputFormat {
    fn from(format: CliFormat) -> Self {
        match format {
            CliFormat::Csv => OutputFormat::Csv,
            CliFormat::Json => OutputFormat::Json,
            CliFormat::Table => OutputFormat::Table,
        }
    }
}

impl From<ProviderArg> for ProviderKind {
    fn from(provider: ProviderArg) -> Self {
        match provider {
            ProviderArg::Openai => ProviderKind::OpenAi,
            ProviderArg::Ollama => ProviderKind::Ollama,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_defaults() {
        let cli = Cli::parse_from(["needle", "extract"]);
        match cli.command {
            Command::Extract(args) => {
                assert_eq!(args.text_file, PathBuf::from("data/haystack.txt"));
                assert_eq!(args.schema, "TechCompany");
                assert_eq!(args.output_dir, PathBuf::from("data"));
                assert!(args.examples.is_empty());
                assert!(!args.verify);
                assert!(!args.remove_dialogue);
                assert!(args.provider.is_none());
            }
            _ => panic!("Expected Extract command"),
        }
    }

    #[test]
    fn test_extract_flags() {
        let cli = Cli::parse_from([
            "needle",
            "--format",
            "json",
            "extract",
            "--text-file",
            "book.txt",
            "--examples",
            "Acme Corp is in Springfield.",
            "Globex is in Cypress Creek.",
            "--remove-dialogue",
            "--verify",
            "--provider",
            "ollama",
            "--max-chunk-tokens",
            "8000",
        ]);
        assert_eq!(cli.format, Some(CliFormat::Json));
        match cli.command {
            Command::Extract(args) => {
                assert_eq!(args.text_file, PathBuf::from("book.txt"));
                assert_eq!(args.examples.len(), 2);
                assert!(args.verify);
                assert!(args.remove_dialogue);
                assert_eq!(args.provider, Some(ProviderArg::Ollama));
                assert_eq!(args.max_chunk_tokens, Some(8000));
            }
            _ => panic!("Expected Extract command"),
        }
    }

    #[test]
    fn test_schemas_command() {
        let cli = Cli::parse_from(["needle", "schemas", "--no-color"]);
        assert!(matches!(cli.command, Command::Schemas));
        assert!(cli.no_color);
    }

    #[test]
    fn test_conversions() {
        assert_eq!(OutputFormat::from(CliFormat::Table), OutputFormat::Table);
        assert_eq!(ProviderKind::from(ProviderArg::Openai), ProviderKind::OpenAi);
    }
}
