use super::*;
use crate::embeddings::FixedEmbeddings;
use tempfile::TempDir;

fn pets_model() -> Arc<FixedEmbeddings> {
    Arc::new(
        FixedEmbeddings::new("stub", 3)
            .with("cats are great", vec![1.0, 0.0, 0.0])
            .with("dogs are loyal", vec![0.0, 1.0, 0.0])
            .with("the economy grew", vec![0.0, 0.0, 1.0]),
    )
}

fn pets_corpus() -> Vec<Document> {
    vec![
        Document::new("Cats 101", "Pet Channel", "cats are great"),
        Document::new("Dogs 101", "Pet Channel", "dogs are loyal"),
        Document::new("GDP Report", "News Daily", "the economy grew"),
    ]
}

async fn create_test_indexer(model: Arc<FixedEmbeddings>) -> (CorpusIndexer, VectorStore, TempDir) {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let store = VectorStore::open(&temp_dir.path().join("vectors"))
        .await
        .expect("should open vector store");
    let indexer = CorpusIndexer::new(model, store.clone(), 2).quiet();
    (indexer, store, temp_dir)
}

#[tokio::test]
async fn builds_once_then_reuses() {
    let model = pets_model();
    let (indexer, store, _temp_dir) = create_test_indexer(Arc::clone(&model)).await;
    let corpus = pets_corpus();

    let first = indexer
        .build_if_absent(&corpus, "videos")
        .await
        .expect("first build should succeed");
    assert!(first.built);
    assert_eq!(first.records, 3);
    assert_eq!(model.encode_count(), 3);

    let second = indexer
        .build_if_absent(&corpus, "videos")
        .await
        .expect("second build should be a no-op");
    assert!(!second.built);
    assert_eq!(second.records, 3);
    assert_eq!(second.handle, first.handle);
    assert_eq!(model.encode_count(), 3, "no re-encoding on an existing collection");
    assert_eq!(
        store
            .count_records(&second.handle)
            .await
            .expect("should count"),
        3
    );
}

#[tokio::test]
async fn existing_collection_ignores_new_corpus() {
    let model = pets_model();
    let (indexer, _store, _temp_dir) = create_test_indexer(Arc::clone(&model)).await;

    indexer
        .build_if_absent(&pets_corpus(), "videos")
        .await
        .expect("first build should succeed");

    let report = indexer
        .build_if_absent(&[], "videos")
        .await
        .expect("empty corpus is ignored for an existing collection");
    assert!(!report.built);
    assert_eq!(report.records, 3);
}

#[tokio::test]
async fn ids_follow_input_position() {
    let model = pets_model();
    let (indexer, store, _temp_dir) = create_test_indexer(model).await;

    let report = indexer
        .build_if_absent(&pets_corpus(), "videos")
        .await
        .expect("build should succeed");

    let hits = store
        .query(&report.handle, &[0.0, 0.0, 1.0], 1)
        .await
        .expect("query should succeed");
    assert_eq!(hits[0].id, "2");
    assert_eq!(hits[0].metadata.title, "GDP Report");
    assert_eq!(hits[0].metadata.channel, "News Daily");
}

#[tokio::test]
async fn missing_body_leaves_no_collection() {
    let model = pets_model();
    let (indexer, store, _temp_dir) = create_test_indexer(Arc::clone(&model)).await;
    let mut corpus = pets_corpus();
    corpus[1].body = String::new();

    let result = indexer.build_if_absent(&corpus, "videos").await;

    match result {
        Err(SearchError::Validation(message)) => {
            assert!(message.contains("document 1"));
            assert!(message.contains("body"));
        }
        other => panic!("expected validation error, got {:?}", other),
    }
    assert!(!store.collection_exists("videos").await.expect("should list"));
    assert_eq!(model.encode_count(), 0);
}

#[tokio::test]
async fn empty_corpus_is_rejected() {
    let (indexer, store, _temp_dir) = create_test_indexer(pets_model()).await;

    let result = indexer.build_if_absent(&[], "videos").await;

    assert!(matches!(result, Err(SearchError::Validation(_))));
    assert!(!store.collection_exists("videos").await.expect("should list"));
}

#[tokio::test]
async fn encoding_failure_leaves_no_collection() {
    let model = Arc::new(FixedEmbeddings::new("stub", 3).with("cats are great", vec![1.0, 0.0, 0.0]));
    let (indexer, store, _temp_dir) = create_test_indexer(model).await;

    let result = indexer.build_if_absent(&pets_corpus(), "videos").await;

    assert!(matches!(result, Err(SearchError::Embedding(_))));
    assert!(!store.collection_exists("videos").await.expect("should list"));
}

#[tokio::test]
async fn wrong_model_dimension_is_a_schema_error() {
    let model = Arc::new(FixedEmbeddings::new("stub", 4).with_fallback(vec![1.0, 0.0, 0.0]));
    let (indexer, store, _temp_dir) = create_test_indexer(model).await;

    let result = indexer.build_if_absent(&pets_corpus(), "videos").await;

    assert!(matches!(
        result,
        Err(SearchError::Schema {
            expected: 4,
            actual: 3
        })
    ));
    assert!(!store.collection_exists("videos").await.expect("should list"));
}

#[tokio::test]
async fn concurrent_builders_build_once() {
    let model = pets_model();
    let (indexer, store, _temp_dir) = create_test_indexer(Arc::clone(&model)).await;
    let corpus = pets_corpus();

    let (a, b) = tokio::join!(
        indexer.build_if_absent(&corpus, "videos"),
        indexer.build_if_absent(&corpus, "videos")
    );
    let a = a.expect("first builder should succeed");
    let b = b.expect("second builder should succeed");

    assert!(a.built ^ b.built, "exactly one caller builds");
    assert_eq!(model.encode_count(), 3);
    assert_eq!(
        store.count_records(&a.handle).await.expect("should count"),
        3
    );
}

#[test]
fn validate_accepts_blank_metadata() {
    let corpus = vec![Document::new("", "", "some transcript")];
    assert!(validate_corpus(&corpus).is_ok());
}

#[test]
fn validate_rejects_whitespace_body() {
    let corpus = vec![
        Document::new("a", "b", "fine"),
        Document::new("c", "d", "   \n"),
    ];
    assert!(matches!(
        validate_corpus(&corpus),
        Err(SearchError::Validation(message)) if message.contains("document 1")
    ));
}
