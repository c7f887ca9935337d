use anyhow::{Context, Result, bail};
use console::style;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::Config;
use crate::corpus::{self, Document};
use crate::database::lancedb::VectorStore;
use crate::embeddings::ollama::OllamaClient;
use crate::engine::SearchEngine;
use crate::session::{Session, TerminalIo, render_results};

/// Index a CSV corpus into a collection, unless the collection already exists
#[inline]
pub async fn build_collection(corpus: Option<PathBuf>, collection: Option<String>) -> Result<()> {
    let config = Config::load().context("Failed to load configuration")?;
    let name = collection.unwrap_or_else(|| config.search.collection.clone());

    let engine = open_engine(config).await?;
    if engine.store().collection_exists(&name).await? {
        let handle = engine.collection(&name).await?;
        let records = engine.store().count_records(&handle).await?;
        println!(
            "Collection '{}' already exists with {} records; nothing to do.",
            name, records
        );
        engine.close();
        return Ok(());
    }

    let corpus_path = corpus_path(engine.config(), corpus)?;
    let documents = load_corpus(&engine, &corpus_path)?;
    println!(
        "Loaded {} documents from {}",
        documents.len(),
        corpus_path.display()
    );

    let report = engine
        .build_if_absent(&documents, &name)
        .await
        .with_context(|| format!("Failed to build collection '{}'", name))?;

    if report.built {
        println!(
            "{} Collection '{}' built with {} records",
            style("✓").green(),
            name,
            report.records
        );
    } else {
        println!(
            "Collection '{}' was built concurrently ({} records)",
            name, report.records
        );
    }

    engine.close();
    Ok(())
}

/// Run one query, or the interactive loop when no query is given
#[inline]
pub async fn search(
    query: Option<String>,
    collection: Option<String>,
    top_k: Option<usize>,
    corpus: Option<PathBuf>,
) -> Result<()> {
    let config = Config::load().context("Failed to load configuration")?;
    let name = collection.unwrap_or_else(|| config.search.collection.clone());
    let top_k = top_k.unwrap_or(config.search.top_k);

    let engine = open_engine(config).await?;

    if let Some(corpus) = corpus {
        if !engine.store().collection_exists(&name).await? {
            let documents = load_corpus(&engine, &corpus)?;
            let report = engine.build_if_absent(&documents, &name).await?;
            info!(
                "Collection '{}' ready with {} records",
                name, report.records
            );
        }
    }

    let handle = match engine.collection(&name).await {
        Ok(handle) => handle,
        Err(e) => {
            eprintln!(
                "{}",
                style(format!("Collection '{}' does not exist yet.", name)).yellow()
            );
            eprintln!("Use 'transcript-search build --corpus <csv>' to create it.");
            return Err(e.into());
        }
    };

    match query {
        Some(query) => {
            let results = engine.search(&handle, &query, top_k).await?;
            print!("{}", render_results(&results));
        }
        None => {
            let mut session = Session::new(&engine, &handle, top_k);
            session.run(&mut TerminalIo).await?;
        }
    }

    engine.close();
    Ok(())
}

/// Configuration, Ollama reachability and collection summary
#[inline]
pub async fn show_status() -> Result<()> {
    let config = Config::load().unwrap_or_default();

    println!("📊 Transcript Search Status Report");
    println!("{}", "=".repeat(50));
    println!();

    println!("⚙️  Configuration:");
    println!("   📁 Directory: {}", config.get_base_dir().display());
    println!("   📚 Default Collection: {}", config.search.collection);
    println!("   🔢 Default Top K: {}", config.search.top_k);
    match &config.corpus.path {
        Some(path) => println!("   📄 Corpus: {}", path.display()),
        None => println!("   📄 Corpus: not set"),
    }

    println!();
    println!("🤖 Ollama Status:");
    match OllamaClient::new(&config.ollama) {
        Ok(client) => match client.health_check() {
            Ok(()) => {
                println!(
                    "   ✅ Ollama: Connected ({}:{})",
                    config.ollama.host, config.ollama.port
                );
                println!("   📋 Model: {}", config.ollama.model);
                println!("   🔢 Batch Size: {}", config.ollama.batch_size);
            }
            Err(e) => {
                println!("   ⚠️  Ollama: Unavailable or unhealthy - {:#}", e);
            }
        },
        Err(e) => {
            println!("   ❌ Ollama: Invalid configuration - {:#}", e);
        }
    }

    println!();
    println!("🔍 Vector Database Status:");
    let store = match VectorStore::new(&config).await {
        Ok(store) => {
            println!("   ✅ LanceDB: Connected");
            store
        }
        Err(e) => {
            println!("   ❌ LanceDB: Failed to connect - {}", e);
            return Ok(());
        }
    };

    let names = store.list_collections().await?;
    if names.is_empty() {
        println!("   📭 No collections built yet");
    }

    for name in &names {
        let Some(handle) = store.open_collection(name).await? else {
            continue;
        };

        println!("   📚 {}", name);
        match store.count_records(&handle).await {
            Ok(count) => println!("      Records: {}", count),
            Err(e) => println!("      Records: Error - {}", e),
        }
        println!("      Dimension: {}", handle.dimension());
        println!("      Model: {}", handle.model().unwrap_or("unknown"));
        if let Ok(Some(built_at)) = store.built_at(&handle).await {
            println!("      Built: {}", built_at);
        }
        if handle
            .model()
            .is_some_and(|model| model != config.ollama.model)
        {
            println!(
                "      ⚠️  Built with a different model than the configured '{}'",
                config.ollama.model
            );
        }
    }

    println!();
    println!("💡 Next Steps:");
    println!("   • Use 'transcript-search build --corpus <csv>' to index transcripts");
    println!("   • Use 'transcript-search search' to start an interactive search");

    Ok(())
}

async fn open_engine(config: Config) -> Result<SearchEngine> {
    let client = OllamaClient::new(&config.ollama).context("Failed to create Ollama client")?;
    if let Err(e) = client.ping() {
        warn!("Ollama is not responding: {:#}", e);
        eprintln!(
            "{}",
            style(format!(
                "Warning: cannot reach Ollama at {}:{}. Encoding will fail until it is running.",
                config.ollama.host, config.ollama.port
            ))
            .yellow()
        );
    }

    SearchEngine::open(config, Arc::new(client))
        .await
        .context("Failed to open search engine")
}

fn corpus_path(config: &Config, corpus: Option<PathBuf>) -> Result<PathBuf> {
    match corpus.or_else(|| config.corpus.path.clone()) {
        Some(path) => Ok(path),
        None => bail!("No corpus given. Pass --corpus <csv> or set one with 'transcript-search config'."),
    }
}

fn load_corpus(engine: &SearchEngine, path: &Path) -> Result<Vec<Document>> {
    corpus::load_csv(path, &engine.config().corpus)
        .with_context(|| format!("Failed to load corpus from {}", path.display()))
}
