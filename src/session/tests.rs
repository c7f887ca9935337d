use super::*;
use crate::config::Config;
use crate::corpus::Document;
use crate::embeddings::FixedEmbeddings;
use std::collections::VecDeque;
use std::sync::Arc;
use tempfile::TempDir;

#[derive(Default)]
struct ScriptedIo {
    queries: VecDeque<String>,
    answers: VecDeque<bool>,
    shown: Vec<Vec<SearchResult>>,
    errors: Vec<String>,
}

impl ScriptedIo {
    fn new(queries: &[&str], answers: &[bool]) -> Self {
        Self {
            queries: queries.iter().map(|q| q.to_string()).collect(),
            answers: answers.iter().copied().collect(),
            ..Self::default()
        }
    }
}

impl SessionIo for ScriptedIo {
    fn read_query(&mut self) -> Result<Option<String>> {
        Ok(self.queries.pop_front())
    }

    fn confirm_continue(&mut self) -> Result<bool> {
        Ok(self.answers.pop_front().unwrap_or(false))
    }

    fn show_results(&mut self, results: &[SearchResult]) {
        self.shown.push(results.to_vec());
    }

    fn show_error(&mut self, error: &SearchError) {
        self.errors.push(error.to_string());
    }
}

async fn built_engine() -> (SearchEngine, CollectionHandle, TempDir) {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let mut config = Config::default();
    config.base_dir = temp_dir.path().to_path_buf();

    let model = Arc::new(
        FixedEmbeddings::new("stub", 3)
            .with("cats are great", vec![1.0, 0.0, 0.0])
            .with("dogs are loyal", vec![0.0, 1.0, 0.0])
            .with("the economy grew", vec![0.0, 0.0, 1.0])
            .with("cats", vec![0.9, 0.1, 0.0]),
    );
    let engine = SearchEngine::open(config, model)
        .await
        .expect("should open engine")
        .quiet();
    let report = engine
        .build_if_absent(
            &[
                Document::new("Cats 101", "Pet Channel", "cats are great"),
                Document::new("Dogs 101", "Pet Channel", "dogs are loyal"),
                Document::new("GDP Report", "News Daily", "the economy grew"),
            ],
            "videos",
        )
        .await
        .expect("build should succeed");
    (engine, report.handle, temp_dir)
}

fn result(rank: usize, title: &str, channel: &str) -> SearchResult {
    SearchResult {
        rank,
        id: rank.to_string(),
        title: title.to_string(),
        channel: channel.to_string(),
        distance: 0.1,
        similarity: 1.0 / 1.1,
        snippet: "cats are great".to_string(),
    }
}

#[tokio::test]
async fn empty_query_is_reported_and_session_continues() {
    let (engine, handle, _temp_dir) = built_engine().await;
    let mut io = ScriptedIo::new(&["!!!", "cats"], &[false]);
    let mut session = Session::new(&engine, &handle, 2);

    session.step(&mut io).await.expect("read");
    assert_eq!(
        session.state(),
        &SessionState::Searching {
            query: "!!!".to_string()
        }
    );

    session.step(&mut io).await.expect("search");
    assert_eq!(session.state(), &SessionState::AwaitingQuery);
    assert_eq!(io.errors.len(), 1);
    assert!(io.errors[0].contains("empty"));

    session.step(&mut io).await.expect("read");
    session.step(&mut io).await.expect("search");
    match session.state() {
        SessionState::DisplayingResults { results } => {
            assert_eq!(results.len(), 2);
            assert_eq!(results[0].title, "Cats 101");
        }
        other => panic!("expected results, got {:?}", other),
    }

    session.step(&mut io).await.expect("display");
    assert_eq!(session.state(), &SessionState::Terminated);
    assert_eq!(io.shown.len(), 1);
}

#[tokio::test]
async fn run_loops_until_user_declines() {
    let (engine, handle, _temp_dir) = built_engine().await;
    let mut io = ScriptedIo::new(&["cats", "cats"], &[true, false]);
    let mut session = Session::new(&engine, &handle, 1);

    session.run(&mut io).await.expect("session should finish");

    assert_eq!(session.state(), &SessionState::Terminated);
    assert_eq!(io.shown.len(), 2);
    assert!(io.errors.is_empty());
}

#[tokio::test]
async fn end_of_input_terminates() {
    let (engine, handle, _temp_dir) = built_engine().await;
    let mut io = ScriptedIo::new(&[], &[]);
    let mut session = Session::new(&engine, &handle, 3);

    session.run(&mut io).await.expect("session should finish");

    assert_eq!(session.state(), &SessionState::Terminated);
    assert!(io.shown.is_empty());
}

#[tokio::test]
async fn zero_top_k_is_recoverable() {
    let (engine, handle, _temp_dir) = built_engine().await;
    let mut io = ScriptedIo::new(&["cats"], &[]);
    let mut session = Session::new(&engine, &handle, 0);

    session.run(&mut io).await.expect("session should finish");

    assert_eq!(io.errors.len(), 1);
    assert!(io.shown.is_empty());
}

#[tokio::test]
async fn unrecoverable_errors_propagate() {
    let (engine, handle, _temp_dir) = built_engine().await;
    // Handle claims a width the model does not produce
    let wrong = CollectionHandle::new(handle.name(), 2, None);
    let mut io = ScriptedIo::new(&["cats"], &[]);
    let mut session = Session::new(&engine, &wrong, 2);

    session.step(&mut io).await.expect("read");
    let result = session.step(&mut io).await;

    assert!(matches!(result, Err(SearchError::Schema { .. })));
    assert!(io.errors.is_empty());
}

#[test]
fn render_results_layout() {
    let rendered = render_results(&[result(1, "Cats 101", "Pet Channel")]);

    assert!(rendered.contains(&"=".repeat(90)));
    assert!(rendered.contains(&"-".repeat(90)));
    assert!(rendered.contains("Rank: 1"));
    assert!(rendered.contains("Title: Cats 101"));
    assert!(rendered.contains("Channel: Pet Channel"));
    assert!(rendered.contains("Distance: 0.100 | 🔢 Similarity: 0.909"));
    assert!(rendered.contains("Snippet: cats are great..."));
}

#[test]
fn render_blank_metadata_as_unknown() {
    let rendered = render_results(&[result(1, "", "  ")]);

    assert!(rendered.contains("Title: Unknown"));
    assert!(rendered.contains("Channel: Unknown"));
}

#[test]
fn render_empty_results() {
    assert_eq!(render_results(&[]), "No results found.\n");
}
