//! Language-model trait and the prompt templates used for answer synthesis.

use async_trait::async_trait;

use crate::document::{ChatMessage, SearchResult};
use crate::error::Result;

/// The fixed system instruction sent with every generation call.
///
/// Biases responses toward a technical, citation-grounded style and forbids
/// fabricating facts outside the supplied context.
pub const SYSTEM_INSTRUCTION: &str = "You are an expert assistant answering questions about the \
    user's uploaded documents. Keep your answers technical and based strictly on the context \
    provided. If the context does not contain the answer, say so plainly. Do not invent facts \
    beyond the supplied context.";

/// System instruction for condensing a follow-up message into a standalone
/// question.
const CONDENSE_INSTRUCTION: &str = "Given a conversation and a follow-up message, rewrite the \
    follow-up as a single standalone question that carries all the context needed to answer it. \
    Resolve pronouns and references against the conversation. Reply with the rewritten question \
    only.";

/// A collaborator that generates text from a prompt.
///
/// Implementations wrap hosted chat models. A call either returns the
/// generated text or fails; empty output is treated as a generation failure
/// by the pipeline and is never retried.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Generate a completion for `messages` under the given system
    /// instruction.
    async fn generate(&self, system: &str, messages: &[ChatMessage]) -> Result<String>;
}

/// Build the one-shot answer prompt: retrieved passages followed by the
/// question.
pub(crate) fn context_prompt(query: &str, results: &[SearchResult]) -> String {
    let mut prompt = String::from("Context from the uploaded documents:\n");
    if results.is_empty() {
        prompt.push_str("(no relevant passages were found)\n");
    }
    for result in results {
        prompt.push_str(&format!(
            "\n[{} p.{}]\n{}\n",
            result.chunk.file_name, result.chunk.page_label, result.chunk.text
        ));
    }
    prompt.push_str(&format!("\nQuestion: {query}\nAnswer using only the context above."));
    prompt
}

/// Build the condensation request: a transcript of prior turns plus the new
/// follow-up message, as a single user message.
pub(crate) fn condense_request(history: &[ChatMessage], message: &str) -> (String, ChatMessage) {
    let mut transcript = String::from("Conversation so far:\n");
    for turn in history {
        transcript.push_str(&format!("{}: {}\n", turn.role.as_str(), turn.content));
    }
    transcript.push_str(&format!("\nFollow-up message: {message}"));
    (CONDENSE_INSTRUCTION.to_string(), ChatMessage::user(transcript))
}
