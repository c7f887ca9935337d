// Database module
// Persistent vector collections backed by LanceDB

pub mod lancedb;
