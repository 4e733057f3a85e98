use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use remedy::analysis::EngineeringResponse;
use remedy::analysis::prompt::{SAMPLE_KNOWLEDGE, response_schema};
use remedy::error::AssistError;
use remedy::llm::LlmClient;
use remedy::payload::{ImageError, ImagePayload};
use remedy::render::Report;
use remedy::workbench::{LoadingState, SubmitError, Workbench};

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Image(#[from] ImageError),
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Assist(#[from] AssistError),
    #[error("{0}")]
    Failed(String),
    #[error("cannot submit: {0}")]
    Submit(#[from] SubmitError),
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

impl CliError {
    fn user_message(&self) -> String {
        match self {
            Self::Assist(err) => err.user_message(),
            other => other.to_string(),
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "remedy", about = "Turn an equipment photo and a knowledge excerpt into a remediation plan")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Analyze one image with the configured model.
    Analyze(AnalyzeArgs),
    /// Validate a saved response and print the report.
    Render {
        /// Response JSON file.
        path: PathBuf,
    },
    /// Print the response schema sent to the model.
    Schema,
}

#[derive(Args, Debug)]
struct AnalyzeArgs {
    #[arg(long, value_name = "PATH")]
    image: PathBuf,

    #[command(flatten)]
    knowledge: KnowledgeArgs,

    /// Print the validated response as JSON instead of the report.
    #[arg(long, default_value_t = false)]
    json: bool,
}

#[derive(Args, Debug)]
#[group(multiple = false)]
struct KnowledgeArgs {
    /// Read the knowledge excerpt from a file.
    #[arg(long, value_name = "FILE")]
    knowledge: Option<PathBuf>,

    /// Knowledge excerpt given inline.
    #[arg(long, value_name = "TEXT")]
    knowledge_text: Option<String>,

    /// Use the built-in sample excerpt.
    #[arg(long, default_value_t = false)]
    sample_knowledge: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let dotenv = dotenvy::dotenv();
    init_tracing();
    if let Err(e) = dotenv {
        debug!(error = %e, "no .env loaded");
    }

    let cli = Cli::parse();
    let result = match cli.command {
        Command::Analyze(args) => run_analyze(args).await,
        Command::Render { path } => run_render(&path),
        Command::Schema => run_schema(),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{}", err.user_message());
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

fn read_text(path: &Path) -> Result<String, CliError> {
    std::fs::read_to_string(path).map_err(|source| CliError::Read { path: path.display().to_string(), source })
}

fn load_knowledge(args: &KnowledgeArgs) -> Result<String, CliError> {
    if let Some(path) = &args.knowledge {
        return read_text(path);
    }
    if let Some(text) = &args.knowledge_text {
        return Ok(text.clone());
    }
    if args.sample_knowledge {
        return Ok(SAMPLE_KNOWLEDGE.to_string());
    }
    Ok(String::new())
}

async fn run_analyze(args: AnalyzeArgs) -> Result<(), CliError> {
    let image = ImagePayload::from_path(&args.image)?;
    let mut bench = Workbench::with_knowledge(load_knowledge(&args.knowledge)?);
    bench.select_image(image);

    let client = LlmClient::from_env().map_err(AssistError::from)?;
    info!(model = client.model(), "LLM client initialized");

    if bench.run(&client).await? != LoadingState::Success {
        let message = bench.error_message().unwrap_or_default().to_string();
        return Err(CliError::Failed(message));
    }
    let Some(response) = bench.result() else {
        return Err(CliError::Failed(remedy::error::GENERIC_FAILURE_MESSAGE.to_string()));
    };
    print_response(response, args.json)
}

fn run_render(path: &Path) -> Result<(), CliError> {
    // Offline render reports the validation detail, not the generic notice.
    let response =
        EngineeringResponse::from_json(&read_text(path)?).map_err(|e| CliError::Failed(e.to_string()))?;
    print_response(&response, false)
}

fn run_schema() -> Result<(), CliError> {
    println!("{}", serde_json::to_string_pretty(&response_schema())?);
    Ok(())
}

fn print_response(response: &EngineeringResponse, json: bool) -> Result<(), CliError> {
    if json {
        println!("{}", serde_json::to_string_pretty(response)?);
    } else {
        print!("{}", Report::from_response(response));
    }
    Ok(())
}
