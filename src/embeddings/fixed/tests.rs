use super::*;

#[test]
fn registered_text_returns_its_vector() {
    let model = FixedEmbeddings::new("fixed", 2).with("cats", vec![1.0, 0.0]);

    assert_eq!(model.encode("cats").expect("should encode"), vec![1.0, 0.0]);
    assert_eq!(model.encode_count(), 1);
    assert_eq!(model.model_id(), "fixed");
    assert_eq!(model.dimension(), 2);
}

#[test]
fn unknown_text_without_fallback_fails() {
    let model = FixedEmbeddings::new("fixed", 2);

    assert!(matches!(
        model.encode("dogs"),
        Err(SearchError::Embedding(_))
    ));
    assert_eq!(model.encode_count(), 0);
}

#[test]
fn fallback_covers_unknown_text() {
    let model = FixedEmbeddings::new("fixed", 2).with_fallback(vec![0.5, 0.5]);

    let batch = model
        .encode_batch(&["x".to_string(), "y".to_string()])
        .expect("should encode");
    assert_eq!(batch, vec![vec![0.5, 0.5], vec![0.5, 0.5]]);
    assert_eq!(model.encode_count(), 2);
}
