//! A terminal front end for the TechFlow Assist demo.

#[macro_use]
extern crate tracing;

use std::env;
use std::io::Write as _;
use std::time::Duration;

use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use techflow::core::{AnalysisResult, Error, LogRecord, Message, Role};
use techflow::{ChatSession, Dashboard, FALLBACK_REPLY};
use techflow_gemini_model::{
    GeminiConfig, GeminiConfigBuilder, GeminiProvider,
};
use tokio::io::{self, AsyncBufRead, AsyncBufReadExt};

const BAR_CHAR: &str = "▎";
const TOPIC_BAR_WIDTH: u32 = 24;

#[derive(Parser)]
#[command(name = "techflow", version, about = "TechFlow Assist demo")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Chat with the X-2000 support assistant.
    Chat {
        /// Retry failed turns for up to this many seconds.
        #[arg(long, value_name = "SECS")]
        retry: Option<u64>,
    },
    /// Analyze the demo support logs.
    Analyze,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let provider = GeminiProvider::new(load_config());

    match cli.command {
        Command::Chat { retry } => run_chat(provider, retry).await,
        Command::Analyze => run_analyze(provider).await,
    }
}

fn load_config() -> GeminiConfig {
    let api_key = env::var("GEMINI_API_KEY")
        .or_else(|_| env::var("API_KEY"))
        .unwrap_or_else(|_| {
            warn!("GEMINI_API_KEY is not set, requests will be rejected");
            String::new()
        });

    let mut builder = GeminiConfigBuilder::with_api_key(api_key);
    if let Ok(model) = env::var("GEMINI_MODEL") {
        builder = builder.with_model(model);
    }
    if let Ok(base_url) = env::var("GEMINI_BASE_URL") {
        builder = builder.with_base_url(base_url);
    }
    let config = builder.build();
    debug!("using config: {config:?}");
    config
}

async fn run_chat(provider: GeminiProvider, retry: Option<u64>) {
    let mut session = ChatSession::with_model_provider(provider);
    if let Some(secs) = retry {
        session = session.with_retry(Duration::from_secs(secs));
    }

    for msg in session.conversation().messages() {
        print_message(msg);
    }

    // One reader for the whole session, so buffered lines are not lost.
    let mut stdin = io::BufReader::new(io::stdin());
    loop {
        print!("> ");
        std::io::stdout().flush().ok();

        let Some(line) = read_line(&mut stdin).await else {
            break;
        };

        let spinner = spinner("🤔 Thinking...");
        let reply = session.send_message(line.trim_end()).await;
        spinner.finish_and_clear();

        match reply {
            Some(Ok(msg)) => print_message(msg),
            Some(Err(err)) => print_fallback(&err),
            None => continue,
        }
        println!();
    }
}

async fn run_analyze(provider: GeminiProvider) {
    let mut dashboard = Dashboard::with_model_provider(provider);

    println!("{}", "Support logs".bold());
    for log in dashboard.logs() {
        print_log(log);
    }
    println!();

    let spinner = spinner("📊 Analyzing logs...");
    let result = dashboard.analyze().await;
    spinner.finish_and_clear();

    match result {
        Ok(result) => print_analysis(result),
        Err(err) => {
            eprintln!(
                "{}{} {}",
                BAR_CHAR.bright_red(),
                "Analysis failed:".bright_red().bold(),
                err.reason()
            );
        }
    }
}

fn spinner(message: &'static str) -> ProgressBar {
    let style = ProgressStyle::with_template("{spinner} {wide_msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏");
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(style);
    spinner.set_message(message);
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

fn print_message(msg: &Message) {
    match msg.role() {
        // Already on screen, the user typed it.
        Role::User => {}
        Role::Assistant if msg.is_error() => {
            println!(
                "{}⚠️  {}",
                BAR_CHAR.bright_red(),
                msg.text().bright_red()
            );
        }
        Role::Assistant => {
            println!(
                "{}🤖 {}",
                BAR_CHAR.bright_cyan(),
                msg.text().bright_white()
            );
        }
    }
}

fn print_fallback(err: &Error) {
    println!(
        "{}⚠️  {}",
        BAR_CHAR.bright_red(),
        FALLBACK_REPLY.bright_red()
    );
    println!("{}{}", BAR_CHAR.bright_red(), err.reason().dimmed());
}

fn print_log(log: &LogRecord) {
    println!(
        "{} {} {}",
        format!("[{}]", log.timestamp).dimmed(),
        format!("{}:", log.customer).bright_white().bold(),
        log.message
    );
}

fn print_analysis(result: &AnalysisResult) {
    let score = result.sentiment_score;
    let score_text = format!("{score:.0}/100");
    let score_text = match sentiment_level(score) {
        SentimentLevel::Positive => {
            score_text.bright_green().bold().to_string()
        }
        SentimentLevel::Neutral => {
            score_text.bright_yellow().bold().to_string()
        }
        SentimentLevel::Negative => score_text.bright_red().bold().to_string(),
    };
    println!("{} {score_text}", "Sentiment".bold());
    println!();

    println!("{}", "Topics".bold());
    let max_count = result.topics.iter().map(|t| t.count).max().unwrap_or(0);
    let name_width = result
        .topics
        .iter()
        .map(|t| t.name.chars().count())
        .max()
        .unwrap_or(0);
    for topic in &result.topics {
        let width = if max_count == 0 {
            0
        } else {
            (topic.count * TOPIC_BAR_WIDTH).div_ceil(max_count)
        };
        println!(
            "  {:<name_width$} {} {}",
            topic.name,
            "█".repeat(width as usize).bright_cyan(),
            topic.count
        );
    }
    println!();

    println!("{}", "Summary".bold());
    println!("  {}", result.summary);
    println!();

    println!("{}", "Urgent issues".bold());
    if result.urgent_issues.is_empty() {
        println!("  {}", "None".dimmed());
    }
    for issue in &result.urgent_issues {
        println!("{}{}", BAR_CHAR.bright_red(), issue.bright_red());
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum SentimentLevel {
    Positive,
    Neutral,
    Negative,
}

fn sentiment_level(score: f64) -> SentimentLevel {
    if score > 60.0 {
        SentimentLevel::Positive
    } else if score < 40.0 {
        SentimentLevel::Negative
    } else {
        SentimentLevel::Neutral
    }
}

async fn read_line<R: AsyncBufRead + Unpin>(input: &mut R) -> Option<String> {
    let mut line = String::new();

    match input.read_line(&mut line).await {
        Ok(count) => {
            if count == 0 {
                return None;
            }
            Some(line)
        }
        Err(err) => {
            error!("error reading input: {}", err);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_read_line_keeps_buffered_lines() {
        let mut input: &[u8] = b"hi\nrestart?\nbye";
        assert_eq!(read_line(&mut input).await.as_deref(), Some("hi\n"));
        assert_eq!(
            read_line(&mut input).await.as_deref(),
            Some("restart?\n")
        );
        assert_eq!(read_line(&mut input).await.as_deref(), Some("bye"));
        assert_eq!(read_line(&mut input).await, None);
    }

    #[test]
    fn test_sentiment_level() {
        assert_eq!(sentiment_level(100.0), SentimentLevel::Positive);
        assert_eq!(sentiment_level(60.5), SentimentLevel::Positive);
        assert_eq!(sentiment_level(60.0), SentimentLevel::Neutral);
        assert_eq!(sentiment_level(40.0), SentimentLevel::Neutral);
        assert_eq!(sentiment_level(39.9), SentimentLevel::Negative);
        assert_eq!(sentiment_level(0.0), SentimentLevel::Negative);
    }
}
