//! # Web Page Summaries
//!
//! Queue web pages, summarize them extractively, and read the summaries aloud
//! one after another, deleting each once it has been heard.
//!
//! ## Usage
//!
//! ```sh
//! web_page_summaries submit https://example.com/article
//! web_page_summaries read
//! ```
//!
//! ## Architecture
//!
//! 1. **Submission**: a URL is stored as a pending record, its page fetched
//!    and summarized with a TextRank ranking of its sentences
//! 2. **Queue**: records live in SQLite and can be served over HTTP
//! 3. **Delivery**: ready summaries are spoken in insertion order; the
//!    listener may stop between summaries, and every spoken summary is
//!    deleted (retrying failed deletions on the next flush)

use clap::Parser;
use std::error::Error;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::{fmt as tfmt, EnvFilter};

mod api;
mod cli;
mod config;
mod delivery;
mod errors;
mod intent;
mod models;
mod queue;
mod speech;
mod summarizer;
mod utils;

#[cfg(test)]
mod test_support;

use api::{ApiState, WebpageResource};
use cli::{Cli, Command};
use config::Config;
use delivery::{ContinuePrompt, DeliveryDriver, DeliveryReport, Speaker};
use errors::SummaryError;
use intent::Intent;
use models::{Ratio, WebpageRecord};
use queue::remote::RemoteQueue;
use queue::store::WebpageStore;
use queue::{ReadyQueue, SummaryQueue};
use speech::{AlwaysContinue, ConsoleSpeaker, LinePrompt};
use summarizer::PageSummarizer;
use utils::{ensure_parent_writable, expand_home};

const NOTHING_TO_READ: &str = "There are no web page summaries to read.";
const DELIVERY_FAILED: &str = "Sorry, something went wrong while reading your web page summaries.";
const LISTEN_HELP: &str = "Say \"read web page summaries\" to start, or \"stop\" to finish.";

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("web_page_summaries starting up");

    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");

    let mut config = Config::load(args.config.as_deref())?;
    if let Some(db) = args.database {
        config.database_path = expand_home(&db);
    }
    if args.remote_url.is_some() {
        config.remote_url = args.remote_url;
    }
    debug!(?config, "Effective configuration");

    let result = run(args.command, &config).await;
    if let Err(e) = &result {
        error!(error = %e, "Command failed");
    }
    info!(elapsed = ?start_time.elapsed(), "web_page_summaries finished");
    result
}

async fn run(command: Command, config: &Config) -> Result<(), Box<dyn Error>> {
    if config.remote_url.is_some()
        && !matches!(command, Command::Read { .. } | Command::Listen)
    {
        warn!("remote_url only applies to read and listen; using the local database");
    }

    match command {
        Command::Submit { url, ratio } => {
            let queue = open_local_queue(config).await?;
            let ratio = match ratio {
                Some(r) => Ratio::new(r)?,
                None => queue.ratio(),
            };
            let record = queue.submit(&url, ratio).await?;
            print_records(&[record])?;
        }
        Command::Enqueue { url } => {
            let queue = open_local_queue(config).await?;
            let record = queue.enqueue(&url)?;
            print_records(&[record])?;
        }
        Command::Process => {
            let queue = open_local_queue(config).await?;
            let ready = queue.process_pending().await?;
            let still_pending = queue.list_pending()?.len();
            println!("Summarized {ready} page(s); {still_pending} still pending.");
        }
        Command::List { ready } => {
            let queue = open_local_queue(config).await?;
            let records = if ready {
                queue.list_ready().await?
            } else {
                queue.list_all()?
            };
            print_records(&records)?;
        }
        Command::Delete { url } => {
            let queue = open_local_queue(config).await?;
            if queue.get_by_url(&url)?.is_none() {
                println!("{} is not queued", url.trim());
                return Ok(());
            }
            queue.delete(&url).await?;
            println!("Deleted {}", url.trim());
        }
        Command::Read { yes } => {
            let mut input = BufReader::new(tokio::io::stdin());
            match &config.remote_url {
                Some(remote) => {
                    let mut driver = DeliveryDriver::new(RemoteQueue::new(remote, config.fetch_timeout())?);
                    let report = read_once(&mut driver, config, &mut input, yes).await?;
                    check_deletions(&report)?;
                }
                None => {
                    let mut driver = DeliveryDriver::new(open_ready_local_queue(config).await?);
                    let report = read_once(&mut driver, config, &mut input, yes).await?;
                    check_deletions(&report)?;
                }
            }
        }
        Command::Listen => match &config.remote_url {
            Some(remote) => {
                let queue = RemoteQueue::new(remote, config.fetch_timeout())?;
                listen(DeliveryDriver::new(queue), config).await?;
            }
            None => {
                let queue = open_ready_local_queue(config).await?;
                listen(DeliveryDriver::new(queue), config).await?;
            }
        },
        Command::Serve { bind } => {
            let queue = open_local_queue(config).await?;
            let state = ApiState {
                queue: Arc::new(queue),
                page_size: config.page_size,
            };
            let bind = bind.unwrap_or_else(|| config.bind_addr.clone());
            api::serve(state, &bind).await?;
        }
    }
    Ok(())
}

async fn open_local_queue(config: &Config) -> Result<SummaryQueue<PageSummarizer>, SummaryError> {
    ensure_parent_writable(&config.database_path).await?;
    let store = WebpageStore::open(&config.database_path)?;
    let summarizer = PageSummarizer::new(&config.user_agent, config.fetch_timeout())?;
    Ok(SummaryQueue::new(store, summarizer, config.ratio()))
}

/// Local queue with the pending backlog summarized, ready for delivery.
async fn open_ready_local_queue(config: &Config) -> Result<SummaryQueue<PageSummarizer>, SummaryError> {
    let queue = open_local_queue(config).await?;
    queue.process_pending().await?;
    Ok(queue)
}

fn print_records(records: &[WebpageRecord]) -> Result<(), serde_json::Error> {
    let resources: Vec<WebpageResource> = records.iter().cloned().map(WebpageResource::from).collect();
    println!("{}", serde_json::to_string_pretty(&resources)?);
    Ok(())
}

/// One delivery pass through the console, asking before each next summary
/// unless `yes` is set.
async fn read_once<Q, R>(
    driver: &mut DeliveryDriver<Q>,
    config: &Config,
    input: &mut R,
    yes: bool,
) -> Result<DeliveryReport, SummaryError>
where
    Q: ReadyQueue,
    R: AsyncBufRead + Unpin,
{
    let mut speaker = ConsoleSpeaker::new(tokio::io::stdout(), config.speech_words_per_minute);
    if yes {
        deliver_announced(driver, &mut speaker, &mut AlwaysContinue).await
    } else {
        let mut prompt = LinePrompt::new(input, tokio::io::stdout());
        deliver_announced(driver, &mut speaker, &mut prompt).await
    }
}

/// Run a delivery pass, then tell the listener when there was nothing to read
/// or when delivery failed.
async fn deliver_announced<Q, S, P>(
    driver: &mut DeliveryDriver<Q>,
    speaker: &mut S,
    prompt: &mut P,
) -> Result<DeliveryReport, SummaryError>
where
    Q: ReadyQueue,
    S: Speaker,
    P: ContinuePrompt,
{
    let result = driver.deliver_all(speaker, prompt).await;
    let notice = match &result {
        Ok(report) if report.spoken == 0 => Some(NOTHING_TO_READ),
        Ok(report) => {
            info!(?report, "Read summaries");
            None
        }
        Err(e) => {
            error!(error = %e, "Delivery failed");
            Some(DELIVERY_FAILED)
        }
    };
    if let Some(notice) = notice {
        if let Err(e) = speaker.speak(notice).await {
            warn!(error = %e, "Could not speak notice");
        }
    }
    result
}

/// A pass that leaves read summaries undeleted is a failure of `read`.
fn check_deletions(report: &DeliveryReport) -> Result<(), Box<dyn Error>> {
    if report.awaiting_deletion == 0 {
        return Ok(());
    }
    warn!(
        awaiting = report.awaiting_deletion,
        "Read summaries could not be deleted; deletion is retried on the next run"
    );
    Err(format!("{} read summaries could not be deleted", report.awaiting_deletion).into())
}

/// Answer spoken commands from standard input until it closes.
async fn listen<Q: ReadyQueue>(mut driver: DeliveryDriver<Q>, config: &Config) -> Result<(), Box<dyn Error>> {
    let mut input = BufReader::new(tokio::io::stdin());
    let mut line = String::new();
    println!("{LISTEN_HELP}");

    loop {
        line.clear();
        if input.read_line(&mut line).await? == 0 {
            break;
        }
        match intent::parse(&line) {
            Intent::ReadSummaries => {
                match read_once(&mut driver, config, &mut input, false).await {
                    Ok(report) => debug!(?report, "Delivery pass finished"),
                    // Already announced and logged; keep listening.
                    Err(e) => debug!(error = %e, "Delivery pass failed"),
                }
            }
            Intent::Stop => {
                let deleted = driver.stop().await;
                info!(deleted, awaiting = driver.pending_deletions().len(), "Stopped");
                println!("Goodbye.");
                return Ok(());
            }
            Intent::Continue => {}
            Intent::Unknown => {
                debug!(utterance = %line.trim(), "Unrecognised command");
                println!("{LISTEN_HELP}");
            }
        }
    }

    let deleted = driver.stop().await;
    info!(deleted, awaiting = driver.pending_deletions().len(), "Input closed");
    Ok(())
}
