use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use code_runner::analyse::analyze_result;
use code_runner::playground::{self, TestCase};
use code_runner::stream::{AnalysisRequest, AnalysisStreamConsumer, AnalysisView, HttpAnalysisTransport};
use code_runner::{AppConfig, Code, ExecutionResult, Executor, Language};

#[derive(Parser)]
#[command(name = "code-runner")]
#[command(about = "Run code locally or on the remote judge")]
#[command(version)]
struct Cli {
    /// TOML config file (defaults to $CODE_RUNNER_CONFIG)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a source file once
    Run {
        source: PathBuf,

        /// Language (guessed from the file extension when omitted)
        #[arg(short, long)]
        language: Option<Language>,

        /// File whose contents become stdin
        #[arg(short, long)]
        input: Option<PathBuf>,
    },
    /// Run a source file against a set of test cases
    Batch {
        source: PathBuf,

        /// JSON array of {input, output} or a zip of N.in/N.out pairs
        #[arg(long)]
        cases: PathBuf,

        #[arg(short, long)]
        language: Option<Language>,

        /// Write the results as a test case zip
        #[arg(long)]
        export: Option<PathBuf>,
    },
    /// Stream an AI analysis of a failed run
    Analyse {
        source: PathBuf,

        #[arg(short, long)]
        language: Option<Language>,

        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Error text to analyse instead of running the code first
        #[arg(long)]
        error_info: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("code_runner=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref()).context("Failed to load config")?;
    info!(
        "Judge at {}, analysis at {}",
        config.judge_url, config.analysis_url
    );
    let executor = Executor::from_config(&config);

    match cli.command {
        Commands::Run {
            source,
            language,
            input,
        } => {
            let code = load_code(&source, language)?;
            let stdin = read_optional(input.as_deref())?;
            let result = executor
                .submit(&code, &stdin)
                .await
                .context("Execution failed")?;
            print_result(&code, &result);
        }
        Commands::Batch {
            source,
            cases,
            language,
            export,
        } => {
            let code = load_code(&source, language)?;
            let cases = load_cases(&cases)?;
            let results = playground::run_all(&executor, &code, cases)
                .await
                .context("Batch run failed")?;

            for (i, case) in results.iter().enumerate() {
                let mark = if case.error { "✗" } else { "✓" };
                println!("#{} {}\n{}\n", i + 1, mark, case.output);
            }

            if let Some(path) = export {
                if playground::export_zip(&results, &path)
                    .with_context(|| format!("Failed to write {}", path.display()))?
                {
                    println!("Exported {} test cases to {}", results.len(), path.display());
                } else {
                    bail!("Some test cases failed or produced no output; nothing exported");
                }
            }
        }
        Commands::Analyse {
            source,
            language,
            input,
            error_info,
        } => {
            let code = load_code(&source, language)?;
            let error_info = match error_info {
                Some(text) => text,
                None => {
                    let stdin = read_optional(input.as_deref())?;
                    let result = executor
                        .submit(&code, &stdin)
                        .await
                        .context("Execution failed")?;
                    print_result(&code, &result);
                    if !result.status.needs_attention() {
                        return Ok(());
                    }
                    result.output
                }
            };

            let consumer =
                AnalysisStreamConsumer::new(HttpAnalysisTransport::new(&config.analysis_url));
            let request = AnalysisRequest::new(code.source, code.language, error_info);
            stream_analysis(&consumer, &request).await?;
        }
    }

    Ok(())
}

fn load_code(path: &Path, language: Option<Language>) -> Result<Code> {
    let language = match language {
        Some(language) => language,
        None => match Language::from_path(&path.to_string_lossy()) {
            Some(language) => language,
            None => bail!("Cannot tell the language of {}; pass --language", path.display()),
        },
    };
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(Code::new(source, language))
}

fn read_optional(path: Option<&Path>) -> Result<String> {
    match path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display())),
        None => Ok(String::new()),
    }
}

fn load_cases(path: &Path) -> Result<Vec<TestCase>> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;

    if path.extension().is_some_and(|ext| ext == "zip") {
        return playground::read_zip(file)
            .with_context(|| format!("Invalid test case archive {}", path.display()));
    }
    serde_json::from_reader(std::io::BufReader::new(file))
        .with_context(|| format!("Invalid test case list {}", path.display()))
}

fn print_result(code: &Code, result: &ExecutionResult) {
    println!("[{}]\n{}", result.status, result.output);

    if result.status.needs_attention() {
        let hint = analyze_result(result, code.language);
        if let Some(line) = hint.line {
            println!("line {}", line);
        }
        if !hint.message.is_empty() {
            println!("hint: {}", hint.message);
        }
    }
}

/// Print analysis text as it arrives
async fn stream_analysis(consumer: &AnalysisStreamConsumer, request: &AnalysisRequest) -> Result<()> {
    let mut updates = consumer.subscribe();
    let mut printed = 0;

    let analysis = consumer.start(request);
    tokio::pin!(analysis);

    let end = loop {
        tokio::select! {
            end = &mut analysis => break end.context("Analysis stream failed")?,
            changed = updates.changed() => {
                if changed.is_ok() {
                    print_new(&updates.borrow_and_update(), &mut printed)?;
                }
            }
        }
    };

    print_new(&consumer.view(), &mut printed)?;
    println!();
    info!("Analysis finished: {:?}", end);
    Ok(())
}

fn print_new(view: &AnalysisView, printed: &mut usize) -> Result<()> {
    if let Some(new) = view.text.get(*printed..) {
        let mut stdout = std::io::stdout().lock();
        stdout.write_all(new.as_bytes())?;
        stdout.flush()?;
        *printed = view.text.len();
    }
    Ok(())
}
