//! Hypothetical Document Embeddings query transform.
//!
//! Precise Zero-Shot Dense Retrieval without Relevance Labels
//! (<https://arxiv.org/abs/2212.10496>), grounded on
//! `original_source/tiny_chat/utils/query_preprocessor.py::HypotheticalDocument`:
//! ask the model to write a plausible answer passage rather than rephrase
//! the query, then embed the passage instead of the query itself.

use std::sync::Arc;

use ragcore_core::chat::{CancelToken, ChatMessage, ChatModel};

use crate::THINK_PATTERN;

/// Generates a hypothetical answer passage for a query, prefixed for the
/// target embedding model's query/document convention.
#[derive(Clone)]
pub struct HypotheticalDocument {
    chat: Arc<dyn ChatModel>,
    prefix: String,
    meta_prompt: Option<String>,
}

impl HypotheticalDocument {
    /// Builds a transform using `prefix` (default `"検索文章: "` in the
    /// original, chosen to match a specific embedding model's query/passage
    /// convention) prepended to the generated passage.
    #[must_use]
    pub fn new(chat: Arc<dyn ChatModel>, prefix: impl Into<String>, meta_prompt: Option<String>) -> Self {
        Self {
            chat,
            prefix: prefix.into(),
            meta_prompt,
        }
    }

    /// Transforms `query` into a hypothetical document. Falls back to
    /// `query` unchanged on any upstream failure.
    #[must_use]
    pub fn transform(&self, query: &str) -> String {
        let target_chars = query.chars().count() * 2;
        let mut messages = vec![
            ChatMessage::user(format!(
                "タスクは、与えられた元の検索クエリに対して、該当する文書内容を例示することです。\
                 文書内容の例示はデータベースの類似度検索に利用されます。\n\
                 以後、「検索クエリ:」に対しての文書内容のみ{target_chars}文字で簡潔に記述してください。\
                 返信や補足説明は不要です。"
            )),
            ChatMessage {
                role: ragcore_core::chat::Role::Assistant,
                content: "わかりました。適切に文書内容例を記述します。".to_string(),
            },
            ChatMessage::user("検索クエリ: 茶道を体験したいです。京都で初心者が楽しめる場所はありますか？"),
            ChatMessage {
                role: ragcore_core::chat::Role::Assistant,
                content: "京都で初めての茶道体験。初心者でも安心して参加できる、英語対応可能な教室を紹介します。\
                          抹茶の点て方から和菓子の頂き方まで、基本的な作法を丁寧に学べます。\
                          美しい庭園を眺めながら、静かなひとときをお過ごしください。"
                    .to_string(),
            },
            ChatMessage::user("検索クエリ: 折り紙 鶴 簡単な折り方 子供向け"),
            ChatMessage {
                role: ragcore_core::chat::Role::Assistant,
                content: "簡単に折れる『折り鶴』の折り方をステップバイステップで解説。分かりやすいイラストと写真付き。\
                          平和の象徴でもある鶴を親子で一緒に作ってみましょう。必要な道具は折り紙一枚だけです。"
                    .to_string(),
            },
        ];

        if let Some(meta_prompt) = &self.meta_prompt {
            messages.push(ChatMessage::system(meta_prompt.clone()));
        }
        messages.push(ChatMessage::user(format!("検索クエリ: {query}")));

        match self.chat.complete(&messages, &CancelToken::new()) {
            Ok(text) => {
                let stripped = THINK_PATTERN.replace(&text, "");
                format!("{}{}", self.prefix, stripped.trim_start())
            }
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

    struct EchoChat(&'static str);
    impl ChatModel for EchoChat {
        fn flavor(&self) -> ragcore_core::chat::ServerFlavor {
            ragcore_core::chat::ServerFlavor::Other
        }
        fn complete(&self, _messages: &[ChatMessage], _cancel: &CancelToken) -> Result<String> {
            Ok(self.0.to_string())
        }
    }

    #[test]
    fn falls_back_to_original_query_on_error() {
        let hyde = HypotheticalDocument::new(Arc::new(FailingChat), "検索文章: ", None);
        assert_eq!(hyde.transform("京都の寺"), "京都の寺");
    }

    #[test]
    fn strips_think_block_and_applies_prefix() {
        let hyde = HypotheticalDocument::new(Arc::new(EchoChat("<think>reasoning</think>answer text")), "検索文章: ", None);
        assert_eq!(hyde.transform("query"), "検索文章: answer text");
    }
}
