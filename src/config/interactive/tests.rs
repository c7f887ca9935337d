use super::normalize_corpus_path;
use std::path::PathBuf;

#[test]
fn empty_corpus_path_is_unset() {
    assert_eq!(normalize_corpus_path(""), None);
    assert_eq!(normalize_corpus_path("   "), None);
}

#[test]
fn corpus_path_is_trimmed() {
    assert_eq!(
        normalize_corpus_path("  /data/videos.csv "),
        Some(PathBuf::from("/data/videos.csv"))
    );
}
