//! Command-line entrypoint for working with a single document.
//!
//! `extract` runs locally; the other commands call the configured model backend.
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use docnav::{
    config,
    extraction::{self, MIME_DOCX, MIME_PDF},
    logging,
    pipeline::{DocumentPipeline, PipelineApi, PipelineError, RawDocument},
    session::{SessionError, SessionHandle},
};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

#[derive(Parser)]
#[command(
    name = "docnav-cli",
    about = "Extract, summarize, and ask questions about PDF and DOCX documents"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the plain text extracted from a document.
    Extract { file: PathBuf },
    /// Print a summary of a document.
    Summarize { file: PathBuf },
    /// Answer one question about a document.
    Ask {
        file: PathBuf,
        #[arg(short, long)]
        question: String,
    },
    /// Chat about a document interactively.
    Chat { file: PathBuf },
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    logging::init_tracing_file_only();
    match cli.command {
        Command::Extract { file } => extract(&file),
        Command::Summarize { file } => summarize(&file).await,
        Command::Ask { file, question } => ask(&file, &question).await,
        Command::Chat { file } => chat(&file).await,
    }
}

fn read_document(path: &Path) -> Result<RawDocument> {
    let bytes = std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    Ok(RawDocument::new(name, mime_for(path), bytes))
}

fn mime_for(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase());
    match extension.as_deref() {
        Some("pdf") => MIME_PDF,
        Some("docx") => MIME_DOCX,
        _ => "",
    }
}

fn build_pipeline() -> Result<DocumentPipeline> {
    let config = config::init_config().context("failed to load configuration")?;
    DocumentPipeline::from_config(config).context("failed to initialize model backend")
}

fn extract(path: &Path) -> Result<()> {
    let document = read_document(path)?;
    let extracted = extraction::extract(&document.bytes, &document.mime_type, &document.name)?;
    println!("{}", extracted.text);
    Ok(())
}

async fn summarize(path: &Path) -> Result<()> {
    let pipeline = build_pipeline()?;
    let outcome = pipeline
        .ingest(read_document(path)?)
        .await
        .map_err(user_facing)?;
    if outcome.truncated {
        eprintln!("note: document was truncated before summarization");
    }
    println!("{}", outcome.context.summary);
    Ok(())
}

async fn ask(path: &Path, question: &str) -> Result<()> {
    let pipeline = build_pipeline()?;
    if question.trim().is_empty() {
        bail!("please provide a question");
    }
    let outcome = pipeline
        .ingest(read_document(path)?)
        .await
        .map_err(user_facing)?;
    let answer = pipeline
        .ask(&outcome.context.summary, question)
        .await
        .map_err(user_facing)?;
    println!("{answer}");
    Ok(())
}

fn user_facing(error: PipelineError) -> anyhow::Error {
    let message = error.user_message();
    anyhow::Error::new(error).context(message)
}

fn describe(error: &SessionError) -> String {
    match error {
        SessionError::Busy(operation) => format!("A {operation} is already in progress."),
        SessionError::Pipeline(inner) => inner.user_message(),
    }
}

async fn load(session: &SessionHandle, pipeline: &DocumentPipeline, path: &Path) -> Result<()> {
    let document = read_document(path)?;
    println!("Processing {}...", document.name);
    match session.upload(pipeline, document).await {
        Ok(outcome) => {
            if outcome.truncated {
                println!("(document truncated before summarization)");
            }
            println!("\nSummary:\n{}\n", outcome.context.summary);
        }
        Err(err) => println!("{}", describe(&err)),
    }
    Ok(())
}

async fn chat(path: &Path) -> Result<()> {
    let pipeline = build_pipeline()?;
    let session = SessionHandle::new();
    load(&session, &pipeline, path).await?;
    println!("Ask a question, `:load <file>` to switch documents, `:clear` to reset, `:quit` to exit.");

    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        match line {
            "" => continue,
            ":quit" | ":q" => break,
            ":clear" => {
                session.clear().await;
                println!("Session cleared. Use `:load <file>` to start again.");
            }
            _ if line.starts_with(":load ") => {
                let next = PathBuf::from(line.trim_start_matches(":load ").trim());
                if let Err(err) = load(&session, &pipeline, &next).await {
                    println!("{err:#}");
                }
            }
            question => match session.send_message(&pipeline, question).await {
                Ok(answer) => println!("{}\n", answer.text),
                Err(err) => println!("{}", describe(&err)),
            },
        }
    }
    Ok(())
}
