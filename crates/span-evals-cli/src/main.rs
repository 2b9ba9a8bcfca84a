//! span-evals - evaluate generated text and annotate its trace spans
//!
//! ## Commands
//!
//! - `evaluate`: generate for each test case, run every evaluator, annotate spans
//! - `experiment`: compare model variants over a set of prompts
//! - `haiku`: check 5-7-5 structure of a text file or stdin, offline
//! - `generate`: one completion, printed as-is

use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::{info, Level};

use span_evals_core::config::{
    DEFAULT_COLLECTOR_ENDPOINT, DEFAULT_DATASET_NAME, DEFAULT_MODEL, DEFAULT_OPENAI_BASE_URL,
};
use span_evals_core::experiment::{DEFAULT_EXPERIMENT_NAME, DEFAULT_EXPERIMENT_PROMPTS};
use span_evals_core::{
    init_tracing, render_batch, render_experiment, AnnotationConfig, AnnotationSink,
    ExperimentRunner, GenerationConfig, GenerationService, HaikuAnalysis, HaikuStructureEvaluator,
    HttpAnnotationClient, LogFormat, LogSpanBackend, OpenAiGenerator, Orchestrator,
    OrchestratorConfig, SpanBackend, TestCase, Variant, METRICS,
};

#[derive(Parser)]
#[command(name = "span-evals")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Span-level evaluation of generated text", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(flatten)]
    services: ServiceArgs,

    #[command(subcommand)]
    command: Commands,
}

/// Endpoints and credentials of the external services.
#[derive(Args, Debug, Clone)]
struct ServiceArgs {
    /// Base URL of the OpenAI-compatible completion API
    #[arg(
        long,
        global = true,
        env = "OPENAI_BASE_URL",
        default_value = DEFAULT_OPENAI_BASE_URL
    )]
    openai_base_url: String,

    /// API key for the completion API
    #[arg(long, global = true, env = "OPENAI_API_KEY", hide_env_values = true)]
    openai_api_key: Option<String>,

    /// Trace collector endpoint receiving span annotations
    #[arg(
        long,
        global = true,
        env = "PHOENIX_COLLECTOR_ENDPOINT",
        default_value = DEFAULT_COLLECTOR_ENDPOINT
    )]
    collector_endpoint: String,

    /// API key for the trace collector
    #[arg(long, global = true, env = "PHOENIX_API_KEY", hide_env_values = true)]
    collector_api_key: Option<String>,

    /// Per-request timeout in seconds (default: none)
    #[arg(long, global = true)]
    timeout_secs: Option<u64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate, evaluate and annotate each test case concurrently
    Evaluate {
        /// Test case as THEME=PROMPT (repeatable; default: the built-in cases)
        #[arg(long = "case", value_parser = parse_case)]
        cases: Vec<TestCase>,

        /// Model used for generation
        #[arg(long, env = "SPAN_EVALS_MODEL", default_value = DEFAULT_MODEL)]
        model: String,

        /// Dataset name recorded on every span
        #[arg(long, default_value = DEFAULT_DATASET_NAME)]
        dataset: String,

        /// Skip the human judgment batch
        #[arg(long)]
        no_human: bool,

        /// Also write the batch report as JSON to this file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Compare model variants over a set of prompts
    Experiment {
        /// Prompt (repeatable; default: the built-in prompts)
        #[arg(long = "prompt")]
        prompts: Vec<String>,

        /// Model variant (repeatable; default: gpt-4o and gpt-3.5-turbo)
        #[arg(long = "model")]
        models: Vec<String>,

        /// Experiment name
        #[arg(long, default_value = DEFAULT_EXPERIMENT_NAME)]
        name: String,
    },

    /// Check the 5-7-5 structure of a haiku without calling any service
    Haiku {
        /// File to read (default: stdin)
        file: Option<PathBuf>,
    },

    /// Request a single completion and print it
    Generate {
        #[arg(short, long, default_value = "Write a haiku.")]
        prompt: String,

        #[arg(long, env = "SPAN_EVALS_MODEL", default_value = DEFAULT_MODEL)]
        model: String,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let format = if cli.json {
        LogFormat::Json
    } else {
        LogFormat::Text
    };
    init_tracing(format, level);

    let backend = Arc::new(LogSpanBackend::new());

    let result = match cli.command {
        Commands::Evaluate {
            cases,
            model,
            dataset,
            no_human,
            output,
        } => {
            let mut config = OrchestratorConfig::default()
                .with_model(&model)
                .with_dataset(&dataset);
            if no_human {
                config = config.without_human_judgments();
            }
            cmd_evaluate(
                &cli.services,
                backend.clone(),
                cases,
                config,
                output.as_deref(),
            )
            .await
        }
        Commands::Experiment {
            prompts,
            models,
            name,
        } => cmd_experiment(&cli.services, backend.clone(), &name, prompts, models).await,
        Commands::Haiku { file } => cmd_haiku(file.as_deref()),
        Commands::Generate { prompt, model } => cmd_generate(&cli.services, &prompt, &model).await,
    };

    backend.flush().await;
    backend.shutdown().await;
    METRICS.flush();

    result
}

fn parse_case(raw: &str) -> std::result::Result<TestCase, String> {
    match raw.split_once('=') {
        Some((theme, prompt)) if !theme.trim().is_empty() && !prompt.trim().is_empty() => {
            Ok(TestCase::new(theme.trim(), prompt.trim()))
        }
        _ => Err(format!("expected THEME=PROMPT, got {:?}", raw)),
    }
}

fn generator(services: &ServiceArgs) -> Result<Arc<OpenAiGenerator>> {
    let mut config = GenerationConfig::new(&services.openai_base_url);
    if let Some(key) = &services.openai_api_key {
        config = config.with_api_key(key);
    }
    if let Some(secs) = services.timeout_secs {
        config = config.with_timeout(Duration::from_secs(secs));
    }
    let generator = OpenAiGenerator::new(config).context("Failed to build completion client")?;
    Ok(Arc::new(generator))
}

fn annotation_client(services: &ServiceArgs) -> Result<Arc<HttpAnnotationClient>> {
    let mut config = AnnotationConfig::new(&services.collector_endpoint);
    if let Some(key) = &services.collector_api_key {
        config = config.with_api_key(key);
    }
    if let Some(secs) = services.timeout_secs {
        config = config.with_timeout(Duration::from_secs(secs));
    }
    let client = HttpAnnotationClient::new(config).context("Failed to build annotation client")?;
    Ok(Arc::new(client))
}

async fn cmd_evaluate(
    services: &ServiceArgs,
    backend: Arc<LogSpanBackend>,
    cases: Vec<TestCase>,
    config: OrchestratorConfig,
    output: Option<&Path>,
) -> Result<()> {
    let cases = if cases.is_empty() {
        TestCase::defaults()
    } else {
        cases
    };

    let sink = Arc::new(AnnotationSink::new(annotation_client(services)?, backend.clone()));
    let orchestrator = Orchestrator::new(generator(services)?, backend, sink, config);

    info!(cases = cases.len(), model = %orchestrator.config().model, "starting evaluation batch");
    let report = orchestrator.run_batch(&cases).await;

    print!("{}", render_batch(&report));
    if !orchestrator.sink().is_primary_healthy() {
        println!("Note: annotations were written as eval.* span attributes");
    }

    if let Some(path) = output {
        write_json(path, &report)?;
        println!("Report written to {:?}", path);
    }

    if report.runs.is_empty() && !report.failures.is_empty() {
        bail!("all {} test cases failed", report.failures.len());
    }
    Ok(())
}

async fn cmd_experiment(
    services: &ServiceArgs,
    backend: Arc<LogSpanBackend>,
    name: &str,
    prompts: Vec<String>,
    models: Vec<String>,
) -> Result<()> {
    let prompts = if prompts.is_empty() {
        DEFAULT_EXPERIMENT_PROMPTS.iter().map(|p| p.to_string()).collect()
    } else {
        prompts
    };
    let variants = if models.is_empty() {
        Variant::defaults()
    } else {
        models.iter().map(|m| Variant::model(m)).collect()
    };

    let runner = ExperimentRunner::new(generator(services)?, backend);
    let outcomes = runner.run(name, &prompts, &variants).await;

    let mut results = Vec::new();
    for outcome in outcomes {
        match outcome {
            Ok(result) => results.push(result),
            Err(e) => eprintln!("❌ {}", e),
        }
    }
    print!("{}", render_experiment(&results));

    if results.is_empty() {
        bail!("every experiment request failed");
    }
    Ok(())
}

fn read_input(file: Option<&Path>) -> Result<String> {
    match file {
        Some(path) => {
            std::fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))
        }
        None => {
            let mut text = String::new();
            std::io::stdin().read_to_string(&mut text).context("Failed to read stdin")?;
            Ok(text)
        }
    }
}

fn haiku_report(text: &str) -> (bool, String) {
    let analysis = HaikuAnalysis::of(text);
    let judgment = HaikuStructureEvaluator::new().judge(text);

    let mut out = String::new();
    for (line, count) in analysis.lines.iter().zip(&analysis.syllables) {
        out.push_str(&format!("{:>2}  {}\n", count, line));
    }
    let mark = if analysis.is_valid() { "✅" } else { "❌" };
    out.push_str(&format!(
        "{} {}: {} - {}\n",
        mark,
        judgment.name,
        judgment.label.as_deref().unwrap_or("-"),
        judgment.explanation
    ));
    (analysis.is_valid(), out)
}

fn cmd_haiku(file: Option<&Path>) -> Result<()> {
    let text = read_input(file)?;
    let (valid, report) = haiku_report(&text);
    print!("{}", report);
    if !valid {
        bail!("not a 5-7-5 haiku");
    }
    Ok(())
}

async fn cmd_generate(services: &ServiceArgs, prompt: &str, model: &str) -> Result<()> {
    let completion = generator(services)?
        .complete(prompt, model)
        .await
        .context("Completion request failed")?;

    match completion.usable_text() {
        Some(text) => println!("{}", text),
        None => bail!("model {} returned no content", model),
    }
    if let Some(usage) = completion.usage {
        info!(
            prompt_tokens = usage.prompt_tokens,
            completion_tokens = usage.completion_tokens,
            total_tokens = usage.total_tokens,
            "token usage"
        );
    }
    Ok(())
}

fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    std::fs::write(path, json).with_context(|| format!("Failed to write {:?}", path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use span_evals_core::BatchReport;

    const HAIKU: &str = "An old silent pond\nA frog jumps into the pond\nSplash! Silence again.";

    #[test]
    fn test_parse_case_splits_on_first_equals() {
        let case = parse_case("nature=Write about a=b").unwrap();
        assert_eq!(case.theme, "nature");
        assert_eq!(case.prompt, "Write about a=b");
    }

    #[test]
    fn test_parse_case_rejects_missing_parts() {
        assert!(parse_case("nature").is_err());
        assert!(parse_case("=prompt").is_err());
        assert!(parse_case("nature=  ").is_err());
    }

    #[test]
    fn test_cli_parses_repeated_cases() {
        let cli = Cli::try_parse_from([
            "span-evals",
            "evaluate",
            "--case",
            "nature=Write a haiku.",
            "--case",
            "ocean=Write about waves.",
            "--no-human",
        ])
        .unwrap();
        match cli.command {
            Commands::Evaluate {
                cases, no_human, ..
            } => {
                assert_eq!(cases.len(), 2);
                assert_eq!(cases[1].theme, "ocean");
                assert!(no_human);
            }
            _ => panic!("expected evaluate"),
        }
    }

    #[test]
    fn test_haiku_file_is_read_and_judged() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pond.txt");
        std::fs::write(&path, HAIKU).unwrap();

        let text = read_input(Some(&path)).unwrap();
        let (valid, report) = haiku_report(&text);

        assert!(valid);
        assert!(report.contains(" 7  A frog jumps into the pond"));
        assert!(report.contains("haiku_structure: valid"));
        assert!(cmd_haiku(Some(&path)).is_ok());
    }

    #[test]
    fn test_invalid_haiku_fails_command() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("short.txt");
        std::fs::write(&path, "just one line").unwrap();

        let (valid, report) = haiku_report("just one line");
        assert!(!valid);
        assert!(report.contains("invalid"));
        assert!(cmd_haiku(Some(&path)).is_err());
    }

    #[test]
    fn test_missing_file_reports_path() {
        let err = read_input(Some(Path::new("/nonexistent/haiku.txt"))).unwrap_err();
        assert!(err.to_string().contains("haiku.txt"));
    }

    #[test]
    fn test_write_json_report() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        let report = BatchReport::new(Vec::new(), Vec::new());

        write_json(&path, &report).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert!(value["runs"].as_array().unwrap().is_empty());
    }
}
