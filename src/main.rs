//! # examset CLI
//!
//! Usage:
//!   examset questions.json -o PracticeSet.pdf
//!   curl -s "$API/get-questions" | examset --title "Calculus Revision"
//!   examset --example > questions.json

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use log::{error, info};
use tokio::io::AsyncReadExt;

use examset::{CancelFlag, Error, LayoutConfig, QuestionSet};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Question set JSON. Reads stdin when omitted.
    input: Option<PathBuf>,

    /// Where to write the PDF
    #[arg(short, long, default_value = "PracticeSet.pdf")]
    output: PathBuf,

    /// Layout config JSON (partial; unnamed fields keep their defaults)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the set's title
    #[arg(long)]
    title: Option<String>,

    /// Override the set's subtitle
    #[arg(long)]
    subtitle: Option<String>,

    /// Add a "Page N of M" footer
    #[arg(long)]
    page_numbers: bool,

    /// Prefix each question with a "Question N" heading
    #[arg(long)]
    number_questions: bool,

    /// Print a sample input and exit
    #[arg(long)]
    example: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    if cli.example {
        print!("{}", example_json());
        return ExitCode::SUCCESS;
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            eprintln!("✗ {e}");
            let mut source = std::error::Error::source(&e);
            while let Some(cause) = source {
                eprintln!("  caused by: {cause}");
                source = std::error::Error::source(cause);
            }
            if let Some(hint) = e.hint() {
                eprintln!("  hint: {hint}");
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> examset::Result<()> {
    let mut config = match &cli.config {
        Some(path) => LayoutConfig::from_json_file(path)?,
        None => LayoutConfig::default(),
    };
    config.page_numbers |= cli.page_numbers;
    config.number_questions |= cli.number_questions;

    let input = match &cli.input {
        Some(path) => tokio::fs::read_to_string(path).await?,
        None => {
            let mut buf = String::new();
            tokio::io::stdin().read_to_string(&mut buf).await?;
            buf
        }
    };

    let mut set = QuestionSet::from_json(&input)?;
    if let Some(title) = cli.title {
        set.title = title;
    }
    if let Some(subtitle) = cli.subtitle {
        set.subtitle = subtitle;
    }
    info!("read {} question(s)", set.questions.len());

    let cancel = CancelFlag::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    let pdf_bytes = examset::render_async(&set, &config, &cancel).await?;
    if cancel.is_cancelled() {
        return Err(Error::Cancelled);
    }

    tokio::fs::write(&cli.output, &pdf_bytes).await?;
    eprintln!(
        "✓ Written {} bytes to {}",
        pdf_bytes.len(),
        cli.output.display()
    );
    Ok(())
}

fn example_json() -> &'static str {
    r##"{
  "title": "Practice Set",
  "subtitle": "Year 12 Mathematics Advanced",
  "questions": [
    {
      "id": 1,
      "imageData": "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAIAAACQd1PeAAAADElEQVR4nGNgYGAAAAAEAAH2FzhVAAAAAElFTkSuQmCC",
      "topics": ["MA-C1: Introduction to Differentiation (Year 11)"],
      "text": "Differentiate y = x^2 sin x."
    },
    {
      "id": 2,
      "topics": []
    }
  ]
}
"##
}
