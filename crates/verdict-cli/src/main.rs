use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use verdict_client::case::CaseParser;
use verdict_client::{ExtractionConfig, Extractor, HttpFetcher, LinkQuery, ReqwestTransport};
use verdict_core::config::FetchConfig;
use verdict_core::events::TracingReporter;
use verdict_core::models::{FetchOutcome, RetryPolicy};
use verdict_core::traits::PageFetcher;
use verdict_core::CorpusRecord;

/// Fields flattened into a corpus record by `case --corpus`.
const CORPUS_FIELDS: [&str; 2] = ["case_text", "opinions"];

const INDEX_HEADER: [&str; 3] = ["case_url", "docket", "year"];

#[derive(Parser)]
#[command(name = "verdict", version, about = "Court case scraper and HTML extractor")]
struct Cli {
    /// Request timeout in seconds
    #[arg(long, global = true, env = "VERDICT_TIMEOUT_SECS")]
    timeout: Option<u64>,

    /// User-Agent header
    #[arg(long, global = true, env = "VERDICT_USER_AGENT")]
    user_agent: Option<String>,

    /// Attempts per URL
    #[arg(long, global = true, env = "VERDICT_MAX_RETRIES")]
    max_retries: Option<u32>,

    /// Base backoff in seconds, doubled per retry
    #[arg(long, global = true, env = "VERDICT_BACKOFF_FACTOR")]
    backoff_factor: Option<f64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch a page and summarize the response
    Fetch {
        #[arg(short, long)]
        url: String,
    },

    /// List the links of a page as JSON
    Links {
        #[arg(short, long)]
        url: String,

        /// CSS selector of link elements
        #[arg(long, default_value = "a")]
        selector: String,

        /// Attribute holding the link
        #[arg(long, default_value = "href")]
        attribute: String,

        /// Keep only links containing this substring
        #[arg(short, long)]
        filter: Option<String>,

        /// Include each link's text
        #[arg(long, default_value_t = false)]
        with_text: bool,
    },

    /// Extract fields described by a JSON extraction config
    Extract {
        #[arg(short, long)]
        url: String,

        /// Path to the extraction config file
        #[arg(short, long)]
        config: PathBuf,
    },

    /// Parse a court case page
    Case {
        #[arg(short, long)]
        url: String,

        /// Print the flattened corpus record instead of the case fields
        #[arg(long, default_value_t = false)]
        corpus: bool,
    },

    /// List the cases of a per-year index page as CSV
    Index {
        #[arg(short, long)]
        url: String,

        #[arg(short, long)]
        year: i32,
    },
}

impl Cli {
    fn fetch_config(&self) -> Result<FetchConfig> {
        let mut config = FetchConfig::from_env()?;
        if let Some(secs) = self.timeout {
            anyhow::ensure!(secs > 0, "--timeout must be at least 1 second");
            config = config.with_timeout(Duration::from_secs(secs));
        }
        if let Some(user_agent) = &self.user_agent {
            config = config.with_user_agent(user_agent.as_str());
        }
        Ok(config)
    }

    fn retry_policy(&self) -> Result<RetryPolicy> {
        let base = RetryPolicy::from_env()?;
        let policy = RetryPolicy::new(
            self.max_retries.unwrap_or(base.max_retries),
            self.backoff_factor.unwrap_or(base.backoff_factor),
        )?;
        Ok(policy)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("verdict=info".parse()?))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let policy = cli.retry_policy()?;
    tracing::debug!(
        max_retries = policy.max_retries,
        worst_case_backoff = ?policy.total_backoff(),
        "Retry policy"
    );
    let fetcher = ReqwestTransport::with_config(&cli.fetch_config()?)
        .context("Failed to create HTTP client")?
        .into_fetcher(TracingReporter);
    let extractor = Extractor::new(fetcher.clone(), TracingReporter).with_policy(policy);

    match cli.command {
        Commands::Fetch { url } => cmd_fetch(&fetcher, &url, &policy).await?,
        Commands::Links {
            url,
            selector,
            attribute,
            filter,
            with_text,
        } => {
            let mut query = LinkQuery::default()
                .with_selector(selector)
                .with_attribute(attribute);
            if let Some(filter) = filter {
                query = query.with_filter(filter);
            }
            if with_text {
                query = query.with_link_text();
            }
            let links = extractor.links(&url, &query).await?;
            print_json(&links)?;
        }
        Commands::Extract { url, config } => cmd_extract(&extractor, &url, &config).await?,
        Commands::Case { url, corpus } => {
            cmd_case(CaseParser::new(extractor), &url, corpus).await?
        }
        Commands::Index { url, year } => cmd_index(CaseParser::new(extractor), &url, year).await?,
    }

    Ok(())
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn cmd_fetch(fetcher: &HttpFetcher, url: &str, policy: &RetryPolicy) -> Result<()> {
    match fetcher.fetch(url, policy).await? {
        FetchOutcome::Success(page) => println!(
            "{} bytes ({})",
            page.body.len(),
            page.content_type().unwrap_or("unknown content type")
        ),
        FetchOutcome::RetriesExhausted { attempts } => {
            tracing::warn!(attempts, "Giving up on {}", url);
            println!("no content");
        }
    }
    Ok(())
}

async fn cmd_extract(
    extractor: &Extractor<HttpFetcher, TracingReporter>,
    url: &str,
    config_path: &Path,
) -> Result<()> {
    let config = ExtractionConfig::from_path(config_path)?;
    tracing::info!(fields = config.len(), "Extracting {}", url);

    let outcome = extractor.extract_structured_data(url, &config).await?;
    print_json(&outcome)
}

async fn cmd_case(
    parser: CaseParser<HttpFetcher, TracingReporter>,
    url: &str,
    corpus: bool,
) -> Result<()> {
    let outcome = parser.parse_case_page(url).await?;

    if !corpus {
        return print_json(&outcome);
    }
    match CorpusRecord::from_outcome(url, &outcome, &CORPUS_FIELDS) {
        Some(record) => print_json(&record),
        None => {
            tracing::warn!("No case text extracted from {}", url);
            print_json(&outcome)
        }
    }
}

async fn cmd_index(
    parser: CaseParser<HttpFetcher, TracingReporter>,
    url: &str,
    year: i32,
) -> Result<()> {
    let listings = parser.parse_year_index(url, year).await?;
    tracing::info!("{} produced {} cases", year, listings.len());

    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(std::io::stdout().lock());
    writer.write_record(INDEX_HEADER)?;
    for listing in &listings {
        writer.serialize(listing)?;
    }
    writer.flush()?;
    Ok(())
}
