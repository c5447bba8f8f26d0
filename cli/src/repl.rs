//! The `chat` subcommand: an interactive search/DeepSearch REPL against a
//! collection, optionally synthesizing an answer through a configured chat
//! model.
//!
//! Grounded on `original_source/tiny_chat/chat/app.py`'s main chat loop:
//! read a question, run DeepSearch (or a flat search) against the selected
//! collection, print the retrieved context, and — only when a chat model is
//! configured — ask it to synthesize an answer from that context.

use std::io::Write;
use std::sync::Arc;

use anyhow::{Context, Result};
use ragcore_core::chat::{CancelToken, ChatMessage, ChatModel};
use ragcore_core::model::SearchHit;
use ragcore_planner::QueryPlanner;
use ragcore_store::{Collection, FilterSpec, VectorStoreManager};
use ragcore_strategy::RagStrategyFactory;

/// Options controlling one `chat` session.
#[derive(Clone, Debug)]
pub struct ChatOptions {
    /// Collection to search.
    pub collection: String,
    /// Number of rounds [`ragcore_planner::deep_search_subquery`] spends per
    /// sub-query.
    pub eval_iter: usize,
    /// Whether to decompose the question into sub-queries and run
    /// DeepSearch, or just search the question directly.
    pub use_deep: bool,
    /// Whether the config file should be written back to disk after this
    /// session (disabled in "server mode").
    pub persist_config: bool,
}

/// Runs the interactive REPL until the user sends an empty line or EOF.
///
/// # Errors
/// Returns an error if the collection's catalog entry is missing, its
/// strategy cannot be built, or stdin/stdout fail.
pub fn run(
    options: &ChatOptions,
    manager: &Arc<VectorStoreManager>,
    factory: &Arc<RagStrategyFactory>,
    chat: Option<Arc<dyn ChatModel>>,
) -> Result<()> {
    let entry = Collection::load(&options.collection, manager)
        .context("loading catalog entry")?
        .with_context(|| format!("no such collection '{}'", options.collection))?;
    let strategy = factory.get_strategy(&entry.rag_strategy, entry.use_gpu)?;
    let planner = chat.clone().map(|c| QueryPlanner::new(c, 3, None));

    let stdin = std::io::stdin();
    let mut line = String::new();
    loop {
        print!("> ");
        std::io::stdout().flush().ok();
        line.clear();
        if stdin.read_line(&mut line)? == 0 {
            break;
        }
        let question = line.trim();
        if question.is_empty() {
            break;
        }

        let hits = search_collection(manager, &strategy, &entry, &planner, question, options);
        print_hits(&hits);

        if let Some(chat_model) = &chat {
            match synthesize(chat_model.as_ref(), question, &hits) {
                Ok(answer) => println!("\n{answer}\n"),
                Err(err) => println!("\n(answer synthesis failed: {err})\n"),
            }
        }
    }

    if !options.persist_config {
        println!("server mode: not writing config to disk");
    }
    Ok(())
}

fn search_collection(
    manager: &VectorStoreManager,
    strategy: &ragcore_strategy::RetrievalStrategy,
    entry: &Collection,
    planner: &Option<QueryPlanner>,
    question: &str,
    options: &ChatOptions,
) -> Vec<SearchHit> {
    let Some(planner) = planner else {
        return manager
            .query_points(question, entry.top_k, entry.score_threshold, &entry.name, &FilterSpec::new(), strategy, None)
            .unwrap_or_default();
    };

    let mut search = |query: &str| {
        manager.query_points(
            query,
            entry.top_k,
            entry.score_threshold,
            &entry.name,
            &FilterSpec::new(),
            strategy,
            None,
        )
    };
    ragcore_planner::deep_search(planner, question, options.eval_iter, options.use_deep, entry.top_k, &mut search)
}

fn print_hits(hits: &[SearchHit]) {
    if hits.is_empty() {
        println!("(no results)");
        return;
    }
    for hit in hits {
        println!("[{} page:{}] (score {:.3})\n{}\n", hit.source(), hit.page(), hit.score, hit.text());
    }
}

fn synthesize(chat: &dyn ChatModel, question: &str, hits: &[SearchHit]) -> anyhow::Result<String> {
    let context: String = hits
        .iter()
        .map(|h| format!("[{} page:{}]\n{}\n", h.source(), h.page(), h.text()))
        .collect();
    let messages = vec![
        ChatMessage::system("Answer the question using only the provided context. If the context doesn't contain the answer, say so."),
        ChatMessage::user(format!("# Context\n{context}\n# Question\n{question}")),
    ];
    chat.complete(&messages, &CancelToken::new()).map_err(Into::into)
}
