//! Step-back query transform.
//!
//! Take a Step Back: Evoking Reasoning via Abstraction in Large Language
//! Models (<https://arxiv.org/abs/2310.06117>), grounded on
//! `original_source/tiny_chat/utils/query_preprocessor.py::StepBackQuery`:
//! rephrase a specific query into a more general, easier-to-answer one that
//! still carries the context needed to answer the original.

use std::sync::Arc;

use ragcore_core::chat::{CancelToken, ChatMessage, ChatModel, Role};

use crate::THINK_PATTERN;

/// Generates a more general "step-back" rephrasing of a query.
#[derive(Clone)]
pub struct StepBackQuery {
    chat: Arc<dyn ChatModel>,
    meta_prompt: Option<String>,
}

impl StepBackQuery {
    /// Builds a transform against `chat`.
    #[must_use]
    pub fn new(chat: Arc<dyn ChatModel>, meta_prompt: Option<String>) -> Self {
        Self { chat, meta_prompt }
    }

    /// Transforms `query` into a step-back question. Falls back to `query`
    /// unchanged on any upstream failure.
    #[must_use]
    pub fn transform(&self, query: &str) -> String {
        #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
        let target_chars = (query.chars().count() as f64 * 1.5) as usize;
        let mut messages = vec![
            ChatMessage::user(format!(
                "タスクは、与えられた検索クエリを一歩下がって、より一般的で、より高レベルで、\
                 回答しやすい「ステップバック質問」に言い換えることです。\n\
                 ステップバック質問は、検索クエリに直接答えるために必要な全体的なコンテキストや\
                 基本的な情報、原則を取得するのに役立ちます。\n\
                 以後、「検索クエリ:」に対応するステップバック質問のみ{target_chars}文字で簡潔に記述してください。\
                 返信や補足説明は不要です。"
            )),
            ChatMessage {
                role: Role::Assistant,
                content: "わかりました。適切に「ステップバック質問」を記述します。".to_string(),
            },
            ChatMessage::user(
                "検索クエリ: 明治時代に活躍した夏目漱石は、1905年から1907年の間にどのような作品を発表しましたか？",
            ),
            ChatMessage {
                role: Role::Assistant,
                content: "夏目漱石の主要な著作は何ですか？".to_string(),
            },
            ChatMessage::user("検索クエリ: 2023年のWBCで優勝した国の決勝戦の対戦相手はどこですか？"),
            ChatMessage {
                role: Role::Assistant,
                content: "2023年のWBCで優勝した国はどこですか？".to_string(),
            },
            ChatMessage::user("検索クエリ: 京都にある清水寺が現在の形になったのは西暦何年ですか？"),
            ChatMessage {
                role: Role::Assistant,
                content: "京都の清水寺の歴史を教えてください。".to_string(),
            },
        ];

        if let Some(meta_prompt) = &self.meta_prompt {
            messages.push(ChatMessage::system(meta_prompt.clone()));
        }
        messages.push(ChatMessage::user(format!("検索クエリ: {query}")));

        match self.chat.complete(&messages, &CancelToken::new()) {
            Ok(text) => THINK_PATTERN.replace(&text, "").trim_start().to_string(),
            Err(_) => query.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ragcore_core::error::{CoreError, Result};

    struct FailingChat;
    impl ChatModel for FailingChat {
        fn flavor(&self) -> ragcore_core::chat::ServerFlavor {
            ragcore_core::chat::ServerFlavor::Other
        }
        fn complete(&self, _messages: &[ChatMessage], _cancel: &CancelToken) -> Result<String> {
            Err(CoreError::Transient("down".to_string()))
        }
    }

    #[test]
    fn falls_back_to_original_query_on_error() {
        let stepback = StepBackQuery::new(Arc::new(FailingChat), None);
        assert_eq!(stepback.transform("夏目漱石の作品"), "夏目漱石の作品");
    }
}
