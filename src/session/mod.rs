// Session module
// Interactive query loop as an explicit state machine over a pluggable I/O seam

#[cfg(test)]
mod tests;

use std::fmt::Write as _;
use std::io;

use console::style;
use dialoguer::{Confirm, Input};
use tracing::{debug, warn};

use crate::database::lancedb::CollectionHandle;
use crate::engine::SearchEngine;
use crate::search::SearchResult;
use crate::{Result, SearchError};

const SEPARATOR_WIDTH: usize = 90;

#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    AwaitingQuery,
    Searching { query: String },
    DisplayingResults { results: Vec<SearchResult> },
    Terminated,
}

/// Where a session reads queries from and reports to
pub trait SessionIo {
    /// Next query, or `None` at end of input
    fn read_query(&mut self) -> Result<Option<String>>;

    /// Whether the user wants another search
    fn confirm_continue(&mut self) -> Result<bool>;

    fn show_results(&mut self, results: &[SearchResult]);

    fn show_error(&mut self, error: &SearchError);
}

pub struct Session<'a> {
    engine: &'a SearchEngine,
    collection: &'a CollectionHandle,
    top_k: usize,
    state: SessionState,
}

impl<'a> Session<'a> {
    #[inline]
    pub const fn new(engine: &'a SearchEngine, collection: &'a CollectionHandle, top_k: usize) -> Self {
        Self {
            engine,
            collection,
            top_k,
            state: SessionState::AwaitingQuery,
        }
    }

    #[inline]
    pub const fn state(&self) -> &SessionState {
        &self.state
    }

    /// Advance exactly one transition.
    ///
    /// Recoverable search failures are reported through `io` and the session
    /// goes back to waiting for a query. Anything else is returned.
    #[inline]
    pub async fn step<I: SessionIo>(&mut self, io: &mut I) -> Result<()> {
        let current = std::mem::replace(&mut self.state, SessionState::Terminated);

        self.state = match current {
            SessionState::AwaitingQuery => match io.read_query()? {
                Some(query) => SessionState::Searching { query },
                None => SessionState::Terminated,
            },
            SessionState::Searching { query } => {
                match self.engine.search(self.collection, &query, self.top_k).await {
                    Ok(results) => {
                        debug!("{} results for '{}'", results.len(), query);
                        SessionState::DisplayingResults { results }
                    }
                    Err(e) if e.is_recoverable() => {
                        warn!("Search failed: {}", e);
                        io.show_error(&e);
                        SessionState::AwaitingQuery
                    }
                    Err(e) => return Err(e),
                }
            }
            SessionState::DisplayingResults { results } => {
                io.show_results(&results);
                if io.confirm_continue()? {
                    SessionState::AwaitingQuery
                } else {
                    SessionState::Terminated
                }
            }
            SessionState::Terminated => SessionState::Terminated,
        };

        Ok(())
    }

    /// Step until the session terminates
    #[inline]
    pub async fn run<I: SessionIo>(&mut self, io: &mut I) -> Result<()> {
        while self.state != SessionState::Terminated {
            self.step(io).await?;
        }
        Ok(())
    }
}

/// Plain-text rendering of a result list
#[inline]
pub fn render_results(results: &[SearchResult]) -> String {
    let mut out = String::new();

    if results.is_empty() {
        out.push_str("No results found.\n");
        return out;
    }

    let _ = writeln!(out, "🎯 Top Search Results:");
    let _ = writeln!(out, "{}", "=".repeat(SEPARATOR_WIDTH));
    for result in results {
        let _ = writeln!(out, "Rank: {}", result.rank);
        let _ = writeln!(out, "🎬 Title: {}", or_unknown(&result.title));
        let _ = writeln!(out, "📺 Channel: {}", or_unknown(&result.channel));
        let _ = writeln!(
            out,
            "📏 Distance: {:.3} | 🔢 Similarity: {:.3}",
            result.distance, result.similarity
        );
        let _ = writeln!(out, "📝 Snippet: {}...", result.snippet);
        let _ = writeln!(out);
        let _ = writeln!(out, "{}", "-".repeat(SEPARATOR_WIDTH));
    }

    out
}

fn or_unknown(value: &str) -> &str {
    if value.trim().is_empty() {
        "Unknown"
    } else {
        value
    }
}

/// Prompts on the controlling terminal
#[derive(Debug, Default)]
pub struct TerminalIo;

impl SessionIo for TerminalIo {
    #[inline]
    fn read_query(&mut self) -> Result<Option<String>> {
        let input = Input::<String>::new()
            .with_prompt("🔍 Enter your search query")
            .allow_empty(true)
            .interact_text();

        match input {
            Ok(query) => Ok(Some(query)),
            Err(dialoguer::Error::IO(e)) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(None),
            Err(dialoguer::Error::IO(e)) => Err(SearchError::Io(e)),
        }
    }

    #[inline]
    fn confirm_continue(&mut self) -> Result<bool> {
        match Confirm::new()
            .with_prompt("🔁 Search again?")
            .default(true)
            .interact()
        {
            Ok(again) => {
                if !again {
                    eprintln!("{}", style("👋 Exiting semantic search.").dim());
                }
                Ok(again)
            }
            Err(dialoguer::Error::IO(e)) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(false),
            Err(dialoguer::Error::IO(e)) => Err(SearchError::Io(e)),
        }
    }

    #[inline]
    fn show_results(&mut self, results: &[SearchResult]) {
        println!();
        print!("{}", render_results(results));
    }

    #[inline]
    fn show_error(&mut self, error: &SearchError) {
        eprintln!("{} {}", style("❌").red(), style(error).red());
    }
}
