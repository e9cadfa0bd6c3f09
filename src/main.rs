use ai_microservices::api::ApiService;
use ai_microservices::cli::{self, TextSource};
use ai_microservices::config::ServerConfig;
use ai_microservices::http::{ClientConfig, DEFAULT_BASE_URL, LoggingObserver};
use ai_microservices::models::{PathDuration, SkillLevel, SummaryStyle};
use ai_microservices::server;
use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// ai-microservices - text summarization, document Q&A and learning paths
///
/// `serve` runs the HTTP backend on top of OpenRouter. The other commands
/// are a client for a running backend.
///
/// Examples:
///   ai-microservices serve --port 8000
///   ai-microservices summarize --file notes.txt --style bullet-points
///   ai-microservices ask "What is FastAPI?" --file docs.txt
#[derive(Parser, Debug)]
#[command(author, version = env!("AI_MICROSERVICES_BUILD_VERSION"), about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Backend base URL used by the client commands
    #[arg(
        long = "api-url",
        env = "AI_API_URL",
        value_name = "URL",
        default_value = DEFAULT_BASE_URL,
        global = true
    )]
    pub api_url: String,

    /// Per-attempt request timeout in seconds
    #[arg(long, value_name = "SECS", global = true)]
    pub timeout: Option<u64>,

    /// Retries after the first attempt for transient failures
    #[arg(long, value_name = "N", global = true)]
    pub retries: Option<u32>,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Run the HTTP backend
    Serve(ServerConfig),

    /// Summarize text
    Summarize(SummarizeArgs),

    /// Answer a question about a document
    Ask(AskArgs),

    /// Generate a learning path
    LearningPath(LearningPathArgs),

    /// List the accepted skill levels and durations
    Options,

    /// Check that the backend is reachable
    Health,
}

#[derive(clap::Args, Debug)]
pub struct SummarizeArgs {
    /// Text to summarize
    #[arg(value_name = "TEXT", required_unless_present = "file")]
    pub text: Option<String>,

    /// Read the text from a file
    #[arg(long, short = 'f', value_name = "PATH", conflicts_with = "text")]
    pub file: Option<PathBuf>,

    /// Maximum summary length in words (50-500)
    #[arg(long, value_name = "WORDS")]
    pub max_length: Option<u32>,

    /// concise, detailed or bullet-points
    #[arg(long)]
    pub style: Option<SummaryStyle>,
}

#[derive(clap::Args, Debug)]
pub struct AskArgs {
    /// The question to answer
    #[arg(value_name = "QUESTION")]
    pub question: String,

    /// Document text to answer from
    #[arg(long, value_name = "TEXT", required_unless_present = "file")]
    pub document_text: Option<String>,

    /// Upload a plain-text document instead
    #[arg(long, short = 'f', value_name = "PATH", conflicts_with = "document_text")]
    pub file: Option<PathBuf>,
}

#[derive(clap::Args, Debug)]
pub struct LearningPathArgs {
    /// What you want to learn
    #[arg(value_name = "GOALS")]
    pub goals: String,

    /// beginner, intermediate or advanced
    #[arg(long, default_value = "beginner")]
    pub skill_level: SkillLevel,

    /// 1-week, 1-month, 3-months or 6-months
    #[arg(long, default_value = "1-month")]
    pub duration: PathDuration,

    /// Areas to emphasize; repeatable
    #[arg(long = "focus", value_name = "AREA")]
    pub focus_areas: Vec<String>,
}

impl Cli {
    fn client_config(&self) -> ClientConfig {
        let mut config = ClientConfig::new(&self.api_url);
        if let Some(secs) = self.timeout {
            config = config.with_timeout(Duration::from_secs(secs));
        }
        if let Some(retries) = self.retries {
            config = config.with_retries(retries);
        }
        config
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let default_filter = match cli.command {
        Commands::Serve(_) => "info",
        _ => "warn",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    let api = ApiService::from_client(
        ai_microservices::http::ApiClient::new(cli.client_config())
            .with_observer(Arc::new(LoggingObserver)),
    );

    match cli.command {
        Commands::Serve(config) => server::serve(config).await?,
        Commands::Summarize(args) => {
            let source = TextSource::from_args(args.text, args.file)
                .ok_or_else(|| anyhow::anyhow!("Provide TEXT or --file"))?;
            cli::summarize(&api, &source, args.max_length, args.style).await?
        }
        Commands::Ask(args) => {
            let document = TextSource::from_args(args.document_text, args.file)
                .ok_or_else(|| anyhow::anyhow!("Provide --document-text or --file"))?;
            cli::ask(&api, &args.question, &document).await?
        }
        Commands::LearningPath(args) => {
            cli::learning_path(
                &api,
                &args.goals,
                args.skill_level,
                args.duration,
                args.focus_areas,
            )
            .await?
        }
        Commands::Options => cli::learning_path_options(&api).await?,
        Commands::Health => cli::health(&api).await?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_cli_summarize_parsing() {
        let cli = Cli::try_parse_from([
            "ai-microservices",
            "summarize",
            "Some text",
            "--style",
            "bullet-points",
            "--max-length",
            "80",
        ])
        .unwrap();
        match cli.command {
            Commands::Summarize(args) => {
                assert_eq!(args.text.as_deref(), Some("Some text"));
                assert_eq!(args.style, Some(SummaryStyle::BulletPoints));
                assert_eq!(args.max_length, Some(80));
            }
            _ => panic!("Expected Summarize command"),
        }
    }

    #[test]
    fn test_cli_summarize_requires_input() {
        assert!(Cli::try_parse_from(["ai-microservices", "summarize"]).is_err());
    }

    #[test]
    fn test_cli_summarize_rejects_text_and_file() {
        let result = Cli::try_parse_from([
            "ai-microservices",
            "summarize",
            "Some text",
            "--file",
            "notes.txt",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_ask_with_file() {
        let cli =
            Cli::try_parse_from(["ai-microservices", "ask", "What is it?", "-f", "doc.txt"])
                .unwrap();
        match cli.command {
            Commands::Ask(args) => {
                assert_eq!(args.question, "What is it?");
                assert_eq!(args.file, Some(PathBuf::from("doc.txt")));
                assert_eq!(args.document_text, None);
            }
            _ => panic!("Expected Ask command"),
        }
    }

    #[test]
    fn test_cli_learning_path_defaults_and_focus() {
        let cli = Cli::try_parse_from([
            "ai-microservices",
            "learning-path",
            "Learn Rust for systems work",
            "--focus",
            "async",
            "--focus",
            "ffi",
        ])
        .unwrap();
        match cli.command {
            Commands::LearningPath(args) => {
                assert_eq!(args.skill_level, SkillLevel::Beginner);
                assert_eq!(args.duration, PathDuration::OneMonth);
                assert_eq!(args.focus_areas, vec!["async", "ffi"]);
            }
            _ => panic!("Expected LearningPath command"),
        }
    }

    #[test]
    fn test_cli_invalid_duration_fails() {
        let result = Cli::try_parse_from([
            "ai-microservices",
            "learning-path",
            "Learn Rust for systems work",
            "--duration",
            "2-weeks",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_global_client_options() {
        let cli = Cli::try_parse_from([
            "ai-microservices",
            "health",
            "--api-url",
            "http://api.test/",
            "--timeout",
            "5",
            "--retries",
            "0",
        ])
        .unwrap();
        let config = cli.client_config();
        assert_eq!(config.base_url, "http://api.test");
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.retries, 0);
    }

    #[test]
    fn test_cli_serve_parsing() {
        let cli = Cli::try_parse_from(["ai-microservices", "serve", "--port", "9000"]).unwrap();
        match cli.command {
            Commands::Serve(config) => assert_eq!(config.port, 9000),
            _ => panic!("Expected Serve command"),
        }
    }

    #[test]
    fn test_cli_no_subcommand_fails() {
        assert!(Cli::try_parse_from(["ai-microservices"]).is_err());
    }
}
