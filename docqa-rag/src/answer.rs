//! Grounded answer synthesis.
//!
//! The [`AnswerSynthesizer`] retrieves passages, abstains with a fixed
//! answer when the gate says they are not relevant enough, and otherwise
//! asks the chat model to answer from the rendered context, either in one
//! call ([`ask`](AnswerSynthesizer::ask)) or as a stream of delivery events
//! ([`ask_stream`](AnswerSynthesizer::ask_stream)).

use std::fmt::Write as _;
use std::sync::Arc;

use docqa_model::{ChatMessage, ChatModel, EventStream, deliver, deliver_text};
use serde::Serialize;
use tracing::{error, info};

use crate::document::RetrievedDocument;
use crate::error::{RagError, Result, Stage};
use crate::retrieval::{Retrieval, Retriever};

/// System instruction for grounded answers. `{documents}` is replaced by the context block.
pub const GROUNDED_SYSTEM_PROMPT: &str = "You are a helpful assistant. Answer the user's question \
using only the retrieved documents below. If the documents do not contain the relevant \
information, say that you do not know.\n\nRetrieved documents:\n{documents}";

/// Message reported when a generated answer was produced.
pub const ANSWERED_MESSAGE: &str = "retrieval succeeded and an answer was generated";

/// Why the synthesizer answered without calling the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Abstention {
    /// The search returned nothing.
    NoDocuments,
    /// The best score was below the similarity threshold.
    LowSimilarity,
}

impl Abstention {
    pub fn message(self) -> &'static str {
        match self {
            Self::NoDocuments => "no relevant information found in the knowledge base",
            Self::LowSimilarity => "retrieved documents have low similarity",
        }
    }

    pub fn answer(self) -> &'static str {
        match self {
            Self::NoDocuments => {
                "Sorry, the knowledge base does not contain information related to your question."
            }
            Self::LowSimilarity => {
                "Sorry, the knowledge base does not contain information closely related to your question."
            }
        }
    }

    fn of(retrieval: &Retrieval) -> Option<Self> {
        if retrieval.documents.is_empty() {
            Some(Self::NoDocuments)
        } else if retrieval.below_threshold {
            Some(Self::LowSimilarity)
        } else {
            None
        }
    }
}

/// Render passages as the numbered context block given to the model.
pub fn render_context(documents: &[RetrievedDocument]) -> String {
    let mut context = String::new();
    for (i, doc) in documents.iter().enumerate() {
        let _ = write!(context, "Document {} (similarity: {:.4}):\n{}\n\n", i + 1, doc.score, doc.content);
    }
    context
}

/// The grounded conversation: system instruction with context, then the question.
pub fn build_messages(query: &str, documents: &[RetrievedDocument]) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(GROUNDED_SYSTEM_PROMPT.replace("{documents}", &render_context(documents))),
        ChatMessage::user(query),
    ]
}

/// A complete answer with its retrieval summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Answer {
    pub query: String,
    pub answer: String,
    pub message: String,
    pub retrieved_docs: usize,
    pub max_score: f32,
    pub below_threshold: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub abstention: Option<Abstention>,
}

/// A streamed answer: the retrieval summary is known up front, the text arrives as events.
pub struct StreamedAnswer {
    pub retrieved_docs: usize,
    pub max_score: f32,
    pub below_threshold: bool,
    pub abstention: Option<Abstention>,
    pub events: EventStream,
}

pub struct AnswerSynthesizer {
    retriever: Arc<Retriever>,
    chat_model: Option<Arc<dyn ChatModel>>,
    top_k: usize,
}

impl AnswerSynthesizer {
    pub fn new(retriever: Arc<Retriever>, chat_model: Option<Arc<dyn ChatModel>>, top_k: usize) -> Self {
        Self { retriever, chat_model, top_k }
    }

    fn model(&self) -> Result<Arc<dyn ChatModel>> {
        self.chat_model
            .clone()
            .ok_or_else(|| RagError::NotConfigured("no chat model is configured".to_string()))
    }

    /// Answer `query` in one call.
    ///
    /// # Errors
    ///
    /// Input errors for a blank query, [`RagError::NotConfigured`] when an
    /// answer must be generated but no chat model exists, and staged errors
    /// when retrieval or generation fail.
    pub async fn ask(&self, query: &str) -> Result<Answer> {
        let retrieval = self.retriever.retrieve(query, self.top_k).await?;
        let retrieved_docs = retrieval.documents.len();

        if let Some(abstention) = Abstention::of(&retrieval) {
            info!(retrieved_docs, max_score = retrieval.max_score, reason = ?abstention, "abstaining from answer");
            return Ok(Answer {
                query: query.to_string(),
                answer: abstention.answer().to_string(),
                message: abstention.message().to_string(),
                retrieved_docs,
                max_score: retrieval.max_score,
                below_threshold: true,
                abstention: Some(abstention),
            });
        }

        let model = self.model()?;
        let messages = build_messages(query, &retrieval.documents);
        let reply = model.generate(&messages).await.map_err(|e| {
            error!(model = model.name(), error = %e, "answer generation failed");
            RagError::from(e).in_stage(Stage::Generate)
        })?;

        Ok(Answer {
            query: query.to_string(),
            answer: reply.content,
            message: ANSWERED_MESSAGE.to_string(),
            retrieved_docs,
            max_score: retrieval.max_score,
            below_threshold: false,
            abstention: None,
        })
    }

    /// Answer `query` as a stream of delivery events.
    ///
    /// Retrieval failures are returned as errors before any event is
    /// produced. Model failures arrive as one `error` event.
    pub async fn ask_stream(&self, query: &str) -> Result<StreamedAnswer> {
        let retrieval = self.retriever.retrieve(query, self.top_k).await?;
        let retrieved_docs = retrieval.documents.len();

        if let Some(abstention) = Abstention::of(&retrieval) {
            info!(retrieved_docs, max_score = retrieval.max_score, reason = ?abstention, "abstaining from streamed answer");
            return Ok(StreamedAnswer {
                retrieved_docs,
                max_score: retrieval.max_score,
                below_threshold: true,
                abstention: Some(abstention),
                events: deliver_text(abstention.answer()),
            });
        }

        let model = self.model()?;
        let messages = build_messages(query, &retrieval.documents);
        let events = deliver(async move { model.stream(&messages).await });

        Ok(StreamedAnswer {
            retrieved_docs,
            max_score: retrieval.max_score,
            below_threshold: false,
            abstention: None,
            events,
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::Map;

    use super::*;

    fn doc(content: &str, score: f32) -> RetrievedDocument {
        RetrievedDocument { id: content.into(), content: content.into(), score, metadata: Map::new() }
    }

    #[test]
    fn context_numbers_passages_from_one() {
        let context = render_context(&[doc("alpha", 0.91234), doc("beta", 0.8)]);
        assert_eq!(
            context,
            "Document 1 (similarity: 0.9123):\nalpha\n\nDocument 2 (similarity: 0.8000):\nbeta\n\n"
        );
    }

    #[test]
    fn grounded_conversation_is_system_then_question() {
        let messages = build_messages("what is milvus?", &[doc("Milvus is a vector database.", 0.9)]);
        assert_eq!(messages.len(), 2);
        assert!(messages[0].content.contains("Document 1 (similarity: 0.9000):"));
        assert!(!messages[0].content.contains("{documents}"));
        assert_eq!(messages[1], ChatMessage::user("what is milvus?"));
    }
}
