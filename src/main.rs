use std::{path::PathBuf, time::Duration};

use anyhow::{bail, Result};
use chrono::{NaiveDate, Utc};
use chrono_tz::Tz;
use clap::Parser;
use tracing_subscriber::EnvFilter;
use tweet_archive::{
    archive::{Archiver, Settings},
    config::Config,
    output::CsvSink,
    twitter::TwitterClient,
    window::plan_windows,
    DEFAULT_WAIT_SECS, MAX_PER_WINDOW,
};

#[derive(Debug, Parser)]
#[command(name = "tweet-archive")]
#[command(about = "Download an account's tweet history from the full-archive search API into CSV")]
struct Args {
    /// Account to archive, without the leading @
    username: String,

    /// Oldest day to fetch (YYYY-MM-DD)
    start_date: NaiveDate,

    /// Newest day to fetch (YYYY-MM-DD), defaults to today
    end_date: Option<NaiveDate>,

    /// Output file, defaults to <USERNAME>.csv
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Seconds to wait after every request
    #[arg(long, default_value_t = DEFAULT_WAIT_SECS, value_parser = clap::value_parser!(u64).range(1..))]
    wait_secs: u64,

    /// Stop paging a month once this many tweets were fetched
    #[arg(long, default_value_t = MAX_PER_WINDOW)]
    max_per_window: usize,

    /// Timezone month boundaries are computed in
    #[arg(long, default_value = "Europe/London", value_parser = parse_tz)]
    timezone: Tz,
}

fn parse_tz(s: &str) -> Result<Tz, String> {
    s.parse::<Tz>().map_err(|e| e.to_string())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let env_filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("info"))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = Config::from_env()?;

    let now = Utc::now();
    let end_date = args
        .end_date
        .unwrap_or_else(|| now.with_timezone(&args.timezone).date_naive());

    if args.start_date > end_date {
        bail!(
            "start date {} is after end date {end_date}",
            args.start_date
        );
    }

    let windows = plan_windows(args.start_date, end_date, now, args.timezone);
    if windows.is_empty() {
        tracing::warn!("nothing to fetch: range ends inside the indexing safety margin");
        return Ok(());
    }

    let output = args
        .output
        .unwrap_or_else(|| PathBuf::from(format!("{}.csv", args.username)));

    tracing::info!(
        username = %args.username,
        windows = windows.len(),
        output = %output.display(),
        "starting archive"
    );

    let client = TwitterClient::new(&config)?;
    let sink = CsvSink::open(&output)?;

    let mut settings = Settings::new(args.username);
    settings.per_window_cap = args.max_per_window;
    settings.wait = Duration::from_secs(args.wait_secs);

    let summary = Archiver::new(client, sink, settings).run(&windows).await?;

    println!(
        "Archived {} tweets from {} windows into {}",
        summary.records,
        summary.windows,
        output.display()
    );

    Ok(())
}
