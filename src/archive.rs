use std::{io::Write, time::Duration};

use anyhow::{Context, Result};
use tokio::time::sleep;

use crate::{
    flatten::flatten_page,
    output::CsvSink,
    twitter::{SearchQuery, TwitterClient},
    window::Window,
    DEFAULT_WAIT_SECS, MAX_PER_WINDOW, MAX_RESULTS,
};

#[derive(Debug, Clone)]
pub struct Settings {
    pub username: String,
    pub max_results: u32,
    /// Stop paging a window once this many records were fetched. A page that
    /// crosses the cap is still written in full.
    pub per_window_cap: usize,
    /// Pause after every page.
    pub wait: Duration,
}

impl Settings {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            max_results: MAX_RESULTS,
            per_window_cap: MAX_PER_WINDOW,
            wait: Duration::from_secs(DEFAULT_WAIT_SECS),
        }
    }
}

/// Pagination state for a single window.
#[derive(Debug, Default)]
struct WindowCursor {
    next_token: Option<String>,
    fetched: usize,
    pages: usize,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub windows: usize,
    pub pages: usize,
    pub records: usize,
}

pub struct Archiver<W: Write> {
    client: TwitterClient,
    sink: CsvSink<W>,
    settings: Settings,
}

impl<W: Write> Archiver<W> {
    pub fn new(client: TwitterClient, sink: CsvSink<W>, settings: Settings) -> Self {
        Self {
            client,
            sink,
            settings,
        }
    }

    /// Fetch every window in order. The first failed request ends the run;
    /// rows from earlier pages are already on disk.
    pub async fn run(&mut self, windows: &[Window]) -> Result<RunSummary> {
        let mut summary = RunSummary::default();

        for (index, window) in windows.iter().enumerate() {
            tracing::info!(
                window = index + 1,
                of = windows.len(),
                start = %window.start_param(),
                end = %window.end_param(),
                "fetching window"
            );

            let cursor = self
                .fetch_window(window, summary.records)
                .await
                .with_context(|| format!("window {} ({window})", index + 1))?;

            summary.windows += 1;
            summary.pages += cursor.pages;
            summary.records += cursor.fetched;
        }

        tracing::info!(
            windows = summary.windows,
            pages = summary.pages,
            total = summary.records,
            "archive complete"
        );

        Ok(summary)
    }

    async fn fetch_window(&mut self, window: &Window, total_before: usize) -> Result<WindowCursor> {
        let mut cursor = WindowCursor::default();

        loop {
            if cursor.fetched >= self.settings.per_window_cap {
                tracing::info!(
                    fetched = cursor.fetched,
                    cap = self.settings.per_window_cap,
                    "window cap reached"
                );
                break;
            }

            tracing::debug!(token = ?cursor.next_token, "requesting page");

            let query = SearchQuery {
                username: &self.settings.username,
                window,
                max_results: self.settings.max_results,
                next_token: cursor.next_token.as_deref(),
            };
            let page = self.client.search_all(&query).await?;

            let records = flatten_page(&page, &self.settings.username);
            self.sink.append(&records)?;

            cursor.pages += 1;
            cursor.fetched += records.len();

            tracing::info!(
                page = cursor.pages,
                added = records.len(),
                window_total = cursor.fetched,
                total = total_before + cursor.fetched,
                "page written"
            );

            sleep(self.settings.wait).await;

            match page.meta.next_token {
                Some(token) => cursor.next_token = Some(token),
                None => break,
            }
        }

        Ok(cursor)
    }
}
