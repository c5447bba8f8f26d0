//! The `db` subcommand: collection management and local file ingestion,
//! independent of any chat/LLM surface.
//!
//! Grounded on `original_source/tiny_chat/chat/database_config.py`'s
//! collection CRUD panel (create/select/delete, source listing, document
//! count) plus `original_source/tiny_chat/utils/file_processor.py`'s
//! directory-walk ingestion entry point.

use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use ragcore_ingest::pipeline::FileIngestRequest;
use ragcore_store::{Collection, VectorStoreManager};
use ragcore_strategy::RagStrategyFactory;

/// `db` subcommand actions.
#[derive(Clone, Debug, clap::Subcommand)]
pub enum DbCommand {
    /// Creates a new collection with the given strategy and chunking config.
    Create {
        /// Collection name.
        name: String,
        /// Free-text description, also the MCP tool description when exposed.
        #[arg(long, default_value = "")]
        description: String,
        /// Strategy tag, e.g. `bm25`, `bm25_sbert_rerank`, `dense:ruri-v3-30m`.
        #[arg(long, default_value = "bm25")]
        strategy: String,
        /// Chunk size, in characters.
        #[arg(long, default_value_t = 500)]
        chunk_size: usize,
        /// Chunk overlap, in characters.
        #[arg(long, default_value_t = 50)]
        chunk_overlap: usize,
        /// Default number of hits to return for a query.
        #[arg(long, default_value_t = 5)]
        top_k: usize,
        /// Whether the strategy's embedders should prefer GPU execution.
        #[arg(long)]
        use_gpu: bool,
        /// Whether to expose this collection as an MCP `search-<name>` tool.
        #[arg(long, default_value_t = true)]
        show_in_mcp: bool,
    },
    /// Lists every collection, most recently visible first, with the
    /// document count and strategy tag.
    List,
    /// Deletes a collection. The default collection cannot be deleted.
    Delete {
        /// Collection name.
        name: String,
    },
    /// Lists the distinct document sources indexed in a collection.
    Sources {
        /// Collection name.
        name: String,
        /// Caps the number of distinct sources returned.
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Prints the total record count of a collection.
    Count {
        /// Collection name.
        name: String,
    },
    /// Ingests every file in a directory into a collection.
    Ingest {
        /// Collection to index into.
        collection: String,
        /// Directory to walk; every file with a recognized extension is ingested.
        path: String,
    },
}

/// Runs a `db` subcommand against `manager`/`factory`.
///
/// # Errors
/// Returns an error on a storage failure, an unrecognized collection, or an
/// ingestion failure for a single-file operation (batch ingestion instead
/// reports per-file failures to stdout and never fails the whole command).
pub fn run(
    command: DbCommand,
    manager: &Arc<VectorStoreManager>,
    factory: &Arc<RagStrategyFactory>,
) -> Result<()> {
    match command {
        DbCommand::Create {
            name,
            description,
            strategy,
            chunk_size,
            chunk_overlap,
            top_k,
            use_gpu,
            show_in_mcp,
        } => {
            let built = factory.get_strategy(&strategy, use_gpu).context("building strategy")?;
            manager.ensure_collection(&name, &built).context("creating collection")?;
            Collection {
                name: name.clone(),
                description,
                chunk_size,
                chunk_overlap,
                top_k,
                score_threshold: ragcore_core::NO_THRESHOLD,
                rag_strategy: strategy,
                use_gpu,
                show_in_mcp,
            }
            .save(manager)
            .context("saving catalog entry")?;
            println!("created collection '{name}'");
        }
        DbCommand::List => {
            for name in manager.get_collections().context("listing collections")? {
                let count = manager.count_documents(&name).unwrap_or_default();
                match Collection::load(&name, manager).context("loading catalog entry")? {
                    Some(entry) => println!("{name}\t{count} docs\t{}", entry.rag_strategy),
                    None => println!("{name}\t{count} docs\t(no catalog entry)"),
                }
            }
        }
        DbCommand::Delete { name } => {
            let fallback = manager.delete_collection(&name).context("deleting collection")?;
            match fallback {
                Some(next) => println!("deleted '{name}'; selected collection is now '{next}'"),
                None => println!("deleted '{name}'"),
            }
        }
        DbCommand::Sources { name, limit } => {
            for source in manager.get_sources(&name, limit).context("listing sources")? {
                println!("{source}");
            }
        }
        DbCommand::Count { name } => {
            println!("{}", manager.count_documents(&name).context("counting documents")?);
        }
        DbCommand::Ingest { collection, path } => {
            ingest_directory(manager, factory, &collection, Path::new(&path))?;
        }
    }
    Ok(())
}

fn ingest_directory(
    manager: &VectorStoreManager,
    factory: &RagStrategyFactory,
    collection: &str,
    dir: &Path,
) -> Result<()> {
    let Some(entry) = Collection::load(collection, manager).context("loading catalog entry")? else {
        bail!("no such collection '{collection}'");
    };
    let strategy = factory.get_strategy(&entry.rag_strategy, entry.use_gpu)?;

    let mut requests = Vec::new();
    for item in std::fs::read_dir(dir).with_context(|| format!("reading directory {}", dir.display()))? {
        let item = item?;
        if !item.file_type()?.is_file() {
            continue;
        }
        let path = item.path();
        let Some(extension) = path.extension().and_then(|e| e.to_str()) else {
            continue;
        };
        if ragcore_ingest::processor_for_extension(extension).is_none() {
            continue;
        }
        let bytes = std::fs::read(&path).with_context(|| format!("reading {}", path.display()))?;
        requests.push(FileIngestRequest {
            source: path.display().to_string(),
            bytes,
            extension: extension.to_string(),
        });
    }

    let results = ragcore_ingest::pipeline::ingest_batch(
        manager,
        &requests,
        collection,
        &strategy,
        entry.chunk_size,
        entry.chunk_overlap,
    );
    for (source, outcome) in results {
        match outcome {
            Ok(ok) => println!("ingested {source} ({} pages)", ok.page_count),
            Err(err) => println!("failed {source}: {err}"),
        }
    }
    Ok(())
}
