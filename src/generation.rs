//! Response generation over retrieved chunks.
//!
//! The generation boundary is thin by design: retrieved chunk texts and any
//! chat history are folded into a system preamble, and the user input is
//! sent as the prompt. Provider errors propagate; the interactive loop in
//! the binary decides whether a failure ends the session.

use async_trait::async_trait;
use rig::client::CompletionClient;
use rig::completion::Prompt;
use rig::providers::openai;
use tracing::debug;

use crate::types::RagError;

/// What the generator is asked to do with the retrieved context.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GeneratorMode {
    QuestionAnswer,
    Summary,
}

/// Who said what in an interactive session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChatRole {
    User,
    Assistant,
}

impl std::fmt::Display for ChatRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChatRole::User => write!(f, "user"),
            ChatRole::Assistant => write!(f, "assistant"),
        }
    }
}

/// One turn of chat history.
#[derive(Clone, Debug)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub content: String,
}

impl ChatTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// Produces text from an input plus retrieved context.
#[async_trait]
pub trait ResponseGenerator: Send + Sync {
    async fn generate(
        &self,
        input: &str,
        context: &[String],
        history: &[ChatTurn],
    ) -> Result<String, RagError>;
}

/// Builds the system preamble from retrieved chunks and chat history.
///
/// Chunks appear in retrieval order; history is only included for
/// question answering.
pub fn build_preamble(mode: GeneratorMode, context: &[String], history: &[ChatTurn]) -> String {
    let mut preamble = String::from(match mode {
        GeneratorMode::QuestionAnswer => {
            "You answer questions using only the provided context. \
             If the context does not contain the answer, say so."
        }
        GeneratorMode::Summary => "You write a concise summary of the provided context.",
    });

    if !context.is_empty() {
        preamble.push_str("\n\nContext:\n");
        for chunk in context {
            preamble.push_str("- ");
            preamble.push_str(chunk);
            preamble.push('\n');
        }
    }

    if mode == GeneratorMode::QuestionAnswer && !history.is_empty() {
        preamble.push_str("\nConversation so far:\n");
        for turn in history {
            preamble.push_str(&format!("{}: {}\n", turn.role, turn.content));
        }
    }

    preamble
}

/// Generator backed by the OpenAI chat API via rig.
pub struct OpenAiResponseGenerator {
    client: openai::Client,
    model: String,
    mode: GeneratorMode,
}

impl OpenAiResponseGenerator {
    /// The credential comes from the `OPENAI_API_KEY` environment variable.
    pub fn new(mode: GeneratorMode, model: impl Into<String>) -> Result<Self, RagError> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| RagError::Config("OPENAI_API_KEY is not set".to_string()))?;
        Ok(Self {
            client: openai::Client::new(&api_key)
                .map_err(|err| RagError::Config(err.to_string()))?,
            model: model.into(),
            mode,
        })
    }
}

#[async_trait]
impl ResponseGenerator for OpenAiResponseGenerator {
    async fn generate(
        &self,
        input: &str,
        context: &[String],
        history: &[ChatTurn],
    ) -> Result<String, RagError> {
        let preamble = build_preamble(self.mode, context, history);
        let agent = self.client.agent(&self.model).preamble(&preamble).build();
        let response = agent
            .prompt(input)
            .await
            .map_err(|err| RagError::Generation(err.to_string()))?;
        debug!(
            model = %self.model,
            mode = ?self.mode,
            context_chunks = context.len(),
            "generated response"
        );
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preamble_lists_chunks_in_retrieval_order() {
        let context = vec!["most relevant".to_string(), "second".to_string()];
        let preamble = build_preamble(GeneratorMode::QuestionAnswer, &context, &[]);

        let first = preamble.find("most relevant").unwrap();
        let second = preamble.find("second").unwrap();
        assert!(first < second);
    }

    #[test]
    fn question_answer_preamble_includes_history() {
        let history = vec![
            ChatTurn::user("what is chunking?"),
            ChatTurn::assistant("splitting text into pieces"),
        ];
        let preamble = build_preamble(GeneratorMode::QuestionAnswer, &[], &history);

        assert!(preamble.contains("user: what is chunking?"));
        assert!(preamble.contains("assistant: splitting text into pieces"));
    }

    #[test]
    fn summary_preamble_ignores_history() {
        let history = vec![ChatTurn::user("unrelated banter")];
        let preamble = build_preamble(GeneratorMode::Summary, &["facts".to_string()], &history);

        assert!(preamble.contains("facts"));
        assert!(!preamble.contains("unrelated banter"));
    }
}
