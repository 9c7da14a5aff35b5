use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use rand::SeedableRng;
use rand::rngs::StdRng;
use services::{Clock, Messages, SessionEvent, VotingConfig, VotingError, VotingService};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use url::Url;
use vote_core::model::{Phrase, Progress, Rating};

/// Rate phrases from a published spreadsheet.
#[derive(Parser, Debug)]
#[command(name = "phrase-vote")]
#[command(about = "Rate phrases from a published spreadsheet")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Local SQLite database holding the client id and votes
    #[arg(long, global = true, env = "VOTE_DB_URL", default_value = "sqlite://votes.sqlite3")]
    db: String,

    /// Published spreadsheet to read phrases from
    #[arg(long, global = true, env = "VOTE_SPREADSHEET_ID")]
    spreadsheet_id: Option<String>,

    /// Sheet gids to try, in order, before the gid-less export
    #[arg(
        long = "gid",
        global = true,
        env = "VOTE_SHEET_GIDS",
        value_delimiter = ',',
        default_values = ["0", "98642087"]
    )]
    gids: Vec<String>,

    /// Explicit CSV endpoints; replaces the spreadsheet exports when given
    #[arg(long = "dataset-url", global = true, env = "VOTE_DATASET_URLS", value_delimiter = ',')]
    dataset_urls: Vec<Url>,

    /// Collector web app receiving votes
    #[arg(long, global = true, env = "VOTE_COLLECTOR_URL")]
    collector_url: Option<Url>,

    /// Milliseconds after which a pending submission is assumed delivered
    #[arg(long, global = true, env = "VOTE_SUBMIT_TIMEOUT_MS", default_value_t = 3000)]
    timeout_ms: u64,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
enum Command {
    /// Rate phrases one at a time (default)
    Vote,
    /// Show how many visible phrases have been rated
    Progress,
    /// Suggest a new phrase
    Add {
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },
    /// Forget this client on the collector and locally
    Clear,
}

impl Args {
    fn voting_config(&self) -> Result<VotingConfig> {
        let config = if !self.dataset_urls.is_empty() {
            VotingConfig::new(self.dataset_urls.clone())?
        } else if let Some(id) = &self.spreadsheet_id {
            VotingConfig::for_spreadsheet(id, &self.gids)?
        } else {
            bail!("either --spreadsheet-id or --dataset-url is required");
        };

        Ok(config
            .with_collector_url(self.collector_url.clone())
            .with_submit_timeout(Duration::from_millis(self.timeout_ms)))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "app=info,services=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();
    let config = args.voting_config()?;
    let db_url = normalize_sqlite_url(&args.db);
    prepare_sqlite_file(&db_url).context("failed to prepare the local database file")?;

    let service = VotingService::new_sqlite(&config, &db_url, Clock::default_clock())
        .await
        .with_context(|| format!("failed to open local storage at {db_url}"))?;
    info!(db = %db_url, endpoints = config.dataset_urls().len(), "voting service ready");

    let messages = config.messages();
    let mut rng = StdRng::from_os_rng();

    let outcome = match args.command.unwrap_or(Command::Vote) {
        Command::Vote => vote_loop(&service, messages, &mut rng).await,
        Command::Progress => show_progress(&service, &mut rng).await,
        Command::Add { text } => add_phrase(&service, &text.join(" ")).await,
        Command::Clear => clear(&service).await,
    };

    // Operational failures are reported, not turned into an exit code.
    if let Err(err) = outcome {
        match err.downcast_ref::<VotingError>() {
            Some(voting) => report(messages, voting),
            None => return Err(err),
        }
    }
    Ok(())
}

async fn vote_loop(service: &VotingService, messages: &Messages, rng: &mut StdRng) -> Result<()> {
    let mut session = service.start(rng).await?;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut next = session.present_next(rng);

    while let Some(phrase) = next.take() {
        prompt(&phrase, session.progress())?;
        let Some(line) = lines.next_line().await.context("failed to read stdin")? else {
            break;
        };
        let input = line.trim();
        if input.eq_ignore_ascii_case("q") {
            break;
        }
        let Some(rating) = parse_rating(input) else {
            eprintln!("Enter a number from 0 to {}, or q to quit.", Rating::MAX);
            next = Some(phrase);
            continue;
        };

        match service.cast_vote(&mut session, phrase.index(), rating, rng).await {
            Ok(receipt) => {
                if receipt.submission.is_err() {
                    eprintln!("{}", messages.submission_warning);
                }
                if let Some(upcoming) = &receipt.next {
                    session.apply(SessionEvent::Presented(upcoming.index()))?;
                }
                next = receipt.next;
            }
            Err(err) => {
                report(messages, &err);
                next = session.present_next(rng);
            }
        }
    }

    if session.progress().is_complete() {
        println!("{}", messages.completed);
    }
    Ok(())
}

async fn show_progress(service: &VotingService, rng: &mut StdRng) -> Result<()> {
    let session = service.start(rng).await?;
    let progress = session.progress();
    println!("Rated {}", progress_label(progress));
    Ok(())
}

async fn add_phrase(service: &VotingService, text: &str) -> Result<()> {
    let outcome = service.append_phrase(text).await?;
    debug!(?outcome, "append finished");
    println!("Phrase submitted. It will appear after the next reload.");
    Ok(())
}

async fn clear(service: &VotingService) -> Result<()> {
    let Some(client_id) = service.stored_client_id().await? else {
        println!("No local session to clear.");
        return Ok(());
    };
    service.clear_user(&client_id).await?;
    println!("Cleared votes for {client_id}.");
    Ok(())
}

fn prompt(phrase: &Phrase, progress: Progress) -> Result<()> {
    let mut out = std::io::stdout().lock();
    writeln!(out)?;
    writeln!(out, "[{}] {}", progress_label(progress), phrase.text())?;
    write!(out, "Rating 0-{} (q to quit): ", Rating::MAX)?;
    out.flush()?;
    Ok(())
}

fn progress_label(progress: Progress) -> String {
    format!(
        "{}/{} · {:.0}%",
        progress.voted,
        progress.total,
        progress.percentage()
    )
}

fn report(messages: &Messages, err: &VotingError) {
    match messages.for_error(err) {
        Some(text) => eprintln!("{text}"),
        None => eprintln!("{err}"),
    }
}

fn parse_rating(input: &str) -> Option<Rating> {
    input.parse::<u8>().ok().and_then(|value| Rating::new(value).ok())
}

fn normalize_sqlite_url(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed == "sqlite::memory:" || trimmed.starts_with("sqlite://") {
        return trimmed.to_owned();
    }

    let path = Path::new(trimmed.strip_prefix("sqlite:").unwrap_or(trimmed));
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

fn prepare_sqlite_file(db_url: &str) -> Result<()> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let Some(path) = db_url.strip_prefix("sqlite://") else {
        bail!("invalid --db value: {db_url}");
    };
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        bail!("invalid --db value: {db_url}");
    }

    let path = Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }
    Ok(())
}
