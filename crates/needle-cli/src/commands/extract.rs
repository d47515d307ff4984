//! Extract command implementation.

use crate::cli::ExtractArgs;
use crate::config::{Config, OutputFormat, ProviderKind};
use crate::error::{CliError, Result};
use crate::output::{format_needles_json, Formatter, SAMPLE_SIZE};
use crate::progress::ChunkProgressBar;
use chrono::Local;
use needle_domain::{ChatBackend, RecordSchema};
use needle_extractor::{
    ExtractionRequest, ExtractionResult, Extractor, ExtractorConfig, ProgressReporter,
};
use needle_llm::{OllamaProvider, OpenAiProvider};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Execute the extract command.
///
/// Schema lookup, input reading and backend setup all happen before the
/// pipeline starts, so configuration mistakes fail fast.
pub async fn execute_extract(
    args: ExtractArgs,
    config: &Config,
    formatter: &Formatter,
) -> Result<()> {
    let mut config = config.clone();
    if let Some(provider) = args.provider {
        config.use_provider(provider.into());
    }
    if let Some(model) = &args.model {
        config.provider.model = model.clone();
        config.extractor.gateway.extraction_model = Some(model.clone());
    }
    if let Some(max_chunk_tokens) = args.max_chunk_tokens {
        config.extractor.max_chunk_tokens = max_chunk_tokens;
    }
    config.validate()?;

    let schema = config.registry().get(&args.schema)?.clone();
    let haystack = read_haystack(&args.text_file)?;
    let request = ExtractionRequest::new(haystack, schema.clone())
        .with_examples(args.examples)
        .with_dialogue_removed(args.remove_dialogue)
        .with_verification(args.verify);
    let extractor_config = config.extractor_config();

    info!(
        "Extracting {} needles from {}",
        schema.name(),
        args.text_file.display()
    );

    let progress: Arc<dyn ProgressReporter> = Arc::new(ChunkProgressBar::new());
    let provider = &config.provider;
    let result = match provider.kind {
        ProviderKind::OpenAi => {
            let mut backend =
                OpenAiProvider::from_env(&provider.api_key_env, provider.model.clone())?;
            if let Some(endpoint) = &provider.endpoint {
                backend = backend.with_endpoint(endpoint.clone());
            }
            run_pipeline(backend, extractor_config, request, progress).await?
        }
        ProviderKind::Ollama => {
            let endpoint = provider
                .endpoint
                .as_deref()
                .unwrap_or(needle_llm::ollama::DEFAULT_ENDPOINT);
            let backend = OllamaProvider::new(endpoint, provider.model.clone());
            run_pipeline(backend, extractor_config, request, progress).await?
        }
    };

    report(&result, &schema, &args.output_dir, formatter)?;
    Ok(())
}

fn read_haystack(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|e| {
        CliError::InvalidInput(format!("Cannot read text file {}: {}", path.display(), e))
    })
}

/// Build an extractor for `backend` and run one request, reporting chunk progress.
pub async fn run_pipeline<B>(
    backend: B,
    config: ExtractorConfig,
    request: ExtractionRequest,
    progress: Arc<dyn ProgressReporter>,
) -> Result<ExtractionResult>
where
    B: ChatBackend + 'static,
{
    let extractor = Extractor::new(backend, config)?.with_progress(progress);
    Ok(extractor.extract(request).await)
}

/// Write the output file and print the sample, path and count.
pub fn report(
    result: &ExtractionResult,
    schema: &RecordSchema,
    output_dir: &Path,
    formatter: &Formatter,
) -> Result<PathBuf> {
    let path = formatter.write_needles(output_dir, schema, &result.needles, &Local::now())?;

    if formatter.format() == OutputFormat::Table {
        println!("{}", formatter.format_needles_table(schema, &result.needles));
    }

    let sample = &result.needles[..result.needles.len().min(SAMPLE_SIZE)];
    println!("\nSample of extracted needles:");
    println!("{}", format_needles_json(sample)?);
    println!(
        "{}",
        formatter.success(&format!("Extracted needles saved to: {}", path.display()))
    );
    println!("Number of needles extracted: {}", result.needles.len());
    println!("{}", formatter.run_summary(&result.metadata));

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use needle_domain::SchemaRegistry;
    use needle_llm::MockProvider;

    fn args(text_file: PathBuf, schema: &str, output_dir: PathBuf) -> ExtractArgs {
        ExtractArgs {
            text_file,
            schema: schema.to_string(),
            examples: Vec::new(),
            remove_dialogue: false,
            verify: false,
            output_dir,
            provider: None,
            model: None,
            max_chunk_tokens: None,
        }
    }

    #[tokio::test]
    async fn test_unknown_schema_fails_before_pipeline() {
        let dir = tempfile::tempdir().unwrap();
        let formatter = Formatter::new(OutputFormat::Csv, false);
        let args = args(dir.path().join("missing.txt"), "Unicorn", dir.path().join("out"));

        let result = execute_extract(args, &Config::default(), &formatter).await;
        assert!(matches!(result, Err(CliError::Schema(_))));
        assert!(!dir.path().join("out").exists());
    }

    #[tokio::test]
    async fn test_missing_text_file() {
        let dir = tempfile::tempdir().unwrap();
        let formatter = Formatter::new(OutputFormat::Csv, false);
        let args = args(dir.path().join("missing.txt"), "TechCompany", dir.path().join("out"));

        let result = execute_extract(args, &Config::default(), &formatter).await;
        assert!(matches!(result, Err(CliError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_invalid_override_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let formatter = Formatter::new(OutputFormat::Csv, false);
        let mut args = args(dir.path().join("missing.txt"), "TechCompany", dir.path().join("out"));
        args.max_chunk_tokens = Some(0);

        let result = execute_extract(args, &Config::default(), &formatter).await;
        assert!(matches!(result, Err(CliError::Config(_))));
    }

    #[tokio::test]
    async fn test_pipeline_and_report() {
        let dir = tempfile::tempdir().unwrap();
        let schema = SchemaRegistry::with_builtins()
            .get("TechCompany")
            .unwrap()
            .clone();
        let provider = MockProvider::new(
            r#"{"items": [{"name": "Acme Corp", "location": "Springfield", "employee_count": null, "founding_year": null}]}"#,
        );
        let request = ExtractionRequest::new(
            "Acme Corp is a tech company located in Springfield.",
            schema.clone(),
        );

        let progress = Arc::new(ChunkProgressBar::hidden());
        let result = run_pipeline(provider, ExtractorConfig::default(), request, progress.clone())
            .await
            .unwrap();
        assert_eq!(result.needles.len(), 1);
        assert_eq!(progress.position(), 1);

        let formatter = Formatter::new(OutputFormat::Csv, false);
        let path = report(&result, &schema, dir.path(), &formatter).unwrap();

        let file_name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(file_name.starts_with("extracted_needles_TechCompany_"));
        assert!(file_name.ends_with(".csv"));

        let written = fs::read_to_string(&path).unwrap();
        assert_eq!(
            written,
            "name,location,employee_count,founding_year\nAcme Corp,Springfield,,\n"
        );
    }
}
