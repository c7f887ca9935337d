use super::*;
use crate::database::lancedb::{CollectionSpec, IndexRecord, RecordMetadata};
use crate::embeddings::FixedEmbeddings;
use tempfile::TempDir;

fn record(id: &str, vector: Vec<f32>, body: &str) -> IndexRecord {
    IndexRecord {
        id: id.to_string(),
        vector,
        metadata: RecordMetadata {
            title: format!("Video {}", id),
            channel: "Channel".to_string(),
        },
        body: body.to_string(),
    }
}

async fn populated_store() -> (VectorStore, CollectionHandle, TempDir) {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let store = VectorStore::open(&temp_dir.path().join("vectors"))
        .await
        .expect("should open vector store");
    let spec = CollectionSpec {
        dimension: 3,
        model: "stub".to_string(),
    };
    let handle = store
        .create_collection_with(
            "videos",
            &spec,
            &[
                record("0", vec![1.0, 0.0, 0.0], "cats are great"),
                record("1", vec![0.0, 1.0, 0.0], "dogs are loyal"),
                record("2", vec![0.0, 0.0, 1.0], "the economy grew"),
            ],
        )
        .await
        .expect("should create collection")
        .into_handle();
    (store, handle, temp_dir)
}

#[test]
fn sanitize_strips_punctuation_and_symbols() {
    assert_eq!(
        sanitize_query("What's   up, cats?!").expect("should sanitize"),
        "Whats   up cats"
    );
    assert_eq!(sanitize_query("  #rust  ").expect("should sanitize"), "rust");
}

#[test]
fn sanitize_keeps_non_ascii_letters_and_digits() {
    assert_eq!(sanitize_query("café № 42").expect("should sanitize"), "café  42");
    assert_eq!(sanitize_query("日本語!").expect("should sanitize"), "日本語");
}

#[test]
fn sanitize_rejects_empty_queries() {
    assert!(matches!(sanitize_query(""), Err(SearchError::EmptyQuery)));
    assert!(matches!(sanitize_query("   \t"), Err(SearchError::EmptyQuery)));
    assert!(matches!(sanitize_query("!!!"), Err(SearchError::EmptyQuery)));
    assert!(matches!(sanitize_query("?. ,;"), Err(SearchError::EmptyQuery)));
}

#[tokio::test]
async fn search_returns_nearest_first() {
    let (store, handle, _temp_dir) = populated_store().await;
    let model = FixedEmbeddings::new("stub", 3).with("feline pets", vec![0.9, 0.1, 0.0]);
    let processor = QueryProcessor::new(&model, &store, &handle);

    let hits = processor
        .search("feline pets!", 2)
        .await
        .expect("search should succeed");

    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].id, "0");
    assert_eq!(hits[0].body, "cats are great");
    assert!(hits[0].distance <= hits[1].distance);
}

#[tokio::test]
async fn search_validates_before_encoding() {
    let (store, handle, _temp_dir) = populated_store().await;
    let model = FixedEmbeddings::new("stub", 3).with_fallback(vec![1.0, 0.0, 0.0]);
    let processor = QueryProcessor::new(&model, &store, &handle);

    assert!(matches!(
        processor.search("cats", 0).await,
        Err(SearchError::InvalidArgument(_))
    ));
    assert!(matches!(
        processor.search("!!!", 3).await,
        Err(SearchError::EmptyQuery)
    ));
    assert_eq!(model.encode_count(), 0);
}

#[tokio::test]
async fn search_with_large_top_k_returns_everything() {
    let (store, handle, _temp_dir) = populated_store().await;
    let model = FixedEmbeddings::new("stub", 3).with_fallback(vec![0.0, 0.0, 1.0]);
    let processor = QueryProcessor::new(&model, &store, &handle);

    let hits = processor.search("economy", 50).await.expect("search should succeed");
    assert_eq!(hits.len(), 3);
    assert_eq!(hits[0].id, "2");
}
