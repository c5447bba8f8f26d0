//! Multi-query decomposition and iterative search-result evaluation.
//!
//! Grounded on `original_source/tiny_chat/utils/query_preprocessor.py::QueryPlanner`:
//! `transform` decomposes one question into up to `generate_queries`
//! sub-queries with reasons; `evaluate` judges one round of search results
//! against a sub-query's reason, extracting knowledge and optionally asking
//! for a follow-up query. Both degrade to a safe default on any LLM
//! failure rather than propagating it — only missing `question`/`query`
//! preconditions are hard errors.

use std::collections::HashSet;
use std::sync::Arc;

use ragcore_core::chat::{CancelToken, ChatMessage, ChatModel};
use ragcore_core::error::{CoreError, Result};
use ragcore_core::model::SearchHit;

use crate::schema::{QueryEvaluateResponse, QueryResponse, QueryResponseList};

/// Minimum `generate_queries` the original falls back to when configured
/// with `<= 1`.
const DEFAULT_GENERATE_QUERIES: usize = 3;

/// Outcome of one [`QueryPlanner::evaluate`] round.
#[derive(Clone, Debug)]
pub struct EvaluateOutcome {
    /// Updated accumulated knowledge.
    pub knowledge: String,
    /// A follow-up query to search next, if another round is warranted.
    pub new_query: Option<QueryResponse>,
    /// Search results judged relevant this round (may repeat entries; see
    /// `evaluate`'s doc comment on `original_indices`).
    pub valid_results: Vec<SearchHit>,
}

/// Decomposes questions into sub-queries and evaluates search results
/// against them.
#[derive(Clone)]
pub struct QueryPlanner {
    chat: Arc<dyn ChatModel>,
    generate_queries: usize,
    meta_prompt: Option<String>,
}

impl QueryPlanner {
    /// Builds a planner against `chat`. `generate_queries <= 1` falls back
    /// to [`DEFAULT_GENERATE_QUERIES`], matching the Python original.
    #[must_use]
    pub fn new(chat: Arc<dyn ChatModel>, generate_queries: usize, meta_prompt: Option<String>) -> Self {
        Self {
            chat,
            generate_queries: if generate_queries > 1 {
                generate_queries
            } else {
                DEFAULT_GENERATE_QUERIES
            },
            meta_prompt,
        }
    }

    /// Decomposes `question` into up to `generate_queries` sub-queries.
    /// Falls back to a single sub-query echoing `question` (reason
    /// `"クエリプラン変換エラー"`) on any upstream failure.
    #[must_use]
    pub fn transform(&self, question: &str) -> QueryResponseList {
        let n = self.generate_queries;
        let mut messages = vec![
            ChatMessage::user(format!(
                "タスクは与えられた質問を分解し、質問応答のために不足している情報を特定し、\
                 不足情報を取得するための具体的な検索クエリとそのクエリ作成理由を最大{n}個記述することです。\n\
                 以後、「質問:」に対応する検索クエリ情報をjson形式で記述してください。返信や補足説明は不要です。"
            )),
            ChatMessage {
                role: ragcore_core::chat::Role::Assistant,
                content: "わかりました。適切に質問応答するための不足情報考慮し、クエリと作成理由をjson形式で記述します。"
                    .to_string(),
            },
            ChatMessage::user("質問: 茶道を体験したいです。京都で初心者が楽しめる場所はありますか？"),
            ChatMessage {
                role: ragcore_core::chat::Role::Assistant,
                content: r#"{"queries": [
                    {"reason": "ユーザーの主な要望である「京都」「茶道体験」「初心者」を直接的に組み合わせた検索で、基本的な選択肢を得るため。", "query": "京都で茶道体験ができる場所はどこですか？"},
                    {"reason": "「体験」よりも少し本格的な「教室」の情報や、観光客が利用しやすい予約システムの有無を確認するため。", "query": "京都の観光客向け茶道教室の予約が取りたいです。"}
                ]}"#
                    .to_string(),
            },
        ];

        if let Some(meta_prompt) = &self.meta_prompt {
            messages.push(ChatMessage::system(meta_prompt.clone()));
        }
        messages.push(ChatMessage::user(format!("質問: {question}")));

        let schema = serde_json::to_value(schemars::schema_for!(QueryResponseList)).unwrap_or_default();
        match self
            .chat
            .complete_structured::<QueryResponseList>(&messages, "QueryResponseList", &schema, &CancelToken::new())
        {
            Ok(result) if !result.queries.is_empty() => result,
            _ => QueryResponseList {
                queries: vec![QueryResponse {
                    reason: "クエリプラン変換エラー".to_string(),
                    query: question.to_string(),
                }],
            },
        }
    }

    /// Evaluates one round of `search_results` against `query`, updating
    /// `exists_valid_list`/`black_list` in place.
    ///
    /// `original_indices` replicates the Python original's construction
    /// exactly: every index `0..search_results.len()` once, then every
    /// "white" (not blacklisted, not already-valid) index a second time.
    /// Any white index judged valid is therefore pushed into
    /// `valid_results` twice. This is an upstream quirk, not a bug in this
    /// port (see project grounding notes).
    ///
    /// # Errors
    /// Returns [`CoreError::InputRejected`] if `question` or `query` is
    /// empty. Upstream LLM failures do not error; they fall back to
    /// returning `search_results` unchanged.
    pub fn evaluate(
        &self,
        question: &str,
        query: &QueryResponse,
        search_results: &[SearchHit],
        knowledge: &str,
        exists_valid_list: &mut HashSet<(String, usize)>,
        black_list: &mut HashSet<(String, usize)>,
    ) -> Result<EvaluateOutcome> {
        if question.is_empty() {
            return Err(CoreError::InputRejected("require question".to_string()));
        }
        if query.query.is_empty() || query.reason.is_empty() {
            return Err(CoreError::InputRejected("require query".to_string()));
        }

        let mut original_indices: Vec<usize> = (0..search_results.len()).collect();

        let mut white_indices = Vec::new();
        let mut white_results = Vec::new();
        for (i, result) in search_results.iter().enumerate() {
            let key = result.source_page_key();
            if black_list.contains(&key) || exists_valid_list.contains(&key) {
                continue;
            }
            white_indices.push(i);
            white_results.push(result);
        }
        original_indices.extend(white_indices);

        let search_results_text = if white_results.is_empty() {
            "検索結果はありません".to_string()
        } else {
            white_results
                .iter()
                .enumerate()
                .map(|(i, r)| {
                    format!(
                        "[{}] {} page:{}\n```\n{} \n```\n\n",
                        i + 1,
                        r.source(),
                        r.page(),
                        r.text()
                    )
                })
                .collect()
        };

        let request_content = format!(
            "# タスク\n\
             タスクは与えられた質問と検索理由（reason）に対して、有効な検索結果があるか確認し、\
             検索結果が妥当であれば質問回答に役立つ知識（knowledge）を更新することです。\n\
             有効な検索結果があった場合は、その検索結果のインデックスを有効なインデックス（valid_index）として列挙してください。\n\
             また、クエリは検索結果を得るためにデータベースに発行したクエリです。\n\
             検索理由を満たした検索結果が無い、あるいは追加で検索が必要な場合は、再検索フラグをtrueとして、\
             検索理由に基づき新しいクエリを記述してください。\n\n\
             ## 質問\n{question}\n\n\
             ## 知識(knowledge)\n{knowledge}\n\n\
             ## 検索理由(reason)\n{}\n\n\
             ## クエリ(query)\n{}\n\n\
             ## 検索結果\n{search_results_text}",
            query.reason, query.query
        );

        let mut messages = Vec::new();
        if let Some(meta_prompt) = &self.meta_prompt {
            messages.push(ChatMessage::system(meta_prompt.clone()));
        }
        messages.push(ChatMessage::user(request_content));

        let schema = serde_json::to_value(schemars::schema_for!(QueryEvaluateResponse)).unwrap_or_default();
        let evaluated = self.chat.complete_structured::<QueryEvaluateResponse>(
            &messages,
            "QueryEvaluateResponse",
            &schema,
            &CancelToken::new(),
        );

        let Ok(evaluate_result) = evaluated else {
            return Ok(EvaluateOutcome {
                knowledge: knowledge.to_string(),
                new_query: None,
                valid_results: search_results.to_vec(),
            });
        };

        let new_query = evaluate_result.search_needed.then(|| QueryResponse {
            reason: query.reason.clone(),
            query: evaluate_result.new_query.clone().unwrap_or_default(),
        });

        let mut valid_results = Vec::new();
        for i in original_indices {
            let result = &search_results[i];
            let key = result.source_page_key();
            if evaluate_result.valid_index.contains(&(i + 1)) {
                valid_results.push(result.clone());
                exists_valid_list.insert(key);
            } else {
                black_list.insert(key);
            }
        }

        Ok(EvaluateOutcome {
            knowledge: evaluate_result.knowledge,
            new_query,
            valid_results,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    struct FailingChat;
    impl ChatModel for FailingChat {
        fn flavor(&self) -> ragcore_core::chat::ServerFlavor {
            ragcore_core::chat::ServerFlavor::Other
        }
        fn complete(&self, _messages: &[ChatMessage], _cancel: &CancelToken) -> Result<String> {
            Err(CoreError::Transient("down".to_string()))
        }
    }

    fn hit(source: &str, page: usize) -> SearchHit {
        let mut payload = BTreeMap::new();
        payload.insert("source".to_string(), source.to_string());
        payload.insert("page".to_string(), page.to_string());
        payload.insert("text".to_string(), "some text".to_string());
        SearchHit {
            id: uuid::Uuid::nil(),
            score: 1.0,
            payload,
        }
    }

    #[test]
    fn transform_falls_back_to_single_echo_query_on_failure() {
        let planner = QueryPlanner::new(Arc::new(FailingChat), 3, None);
        let result = planner.transform("質問文");
        assert_eq!(result.queries.len(), 1);
        assert_eq!(result.queries[0].reason, "クエリプラン変換エラー");
        assert_eq!(result.queries[0].query, "質問文");
    }

    #[test]
    fn generate_queries_below_two_falls_back_to_default() {
        let planner = QueryPlanner::new(Arc::new(FailingChat), 1, None);
        assert_eq!(planner.generate_queries, DEFAULT_GENERATE_QUERIES);
    }

    #[test]
    fn evaluate_rejects_empty_question() {
        let planner = QueryPlanner::new(Arc::new(FailingChat), 3, None);
        let query = QueryResponse {
            reason: "r".to_string(),
            query: "q".to_string(),
        };
        let mut exists = HashSet::new();
        let mut black = HashSet::new();
        let err = planner
            .evaluate("", &query, &[], "", &mut exists, &mut black)
            .unwrap_err();
        assert!(matches!(err, CoreError::InputRejected(_)));
    }

    #[test]
    fn evaluate_falls_back_to_unfiltered_results_on_llm_failure() {
        let planner = QueryPlanner::new(Arc::new(FailingChat), 3, None);
        let query = QueryResponse {
            reason: "r".to_string(),
            query: "q".to_string(),
        };
        let results = vec![hit("a", 1), hit("b", 2)];
        let mut exists = HashSet::new();
        let mut black = HashSet::new();
        let outcome = planner
            .evaluate("question", &query, &results, "prior", &mut exists, &mut black)
            .unwrap();
        assert_eq!(outcome.knowledge, "prior");
        assert!(outcome.new_query.is_none());
        assert_eq!(outcome.valid_results.len(), 2);
    }
}
