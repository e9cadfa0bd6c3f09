//! LLM-backed services behind the HTTP routes.

mod chunking;
mod learning_path;
mod qa;
mod summarization;

pub use chunking::Chunker;
pub use learning_path::{LearningPathService, analyze_goals, fallback_path, structure_path};
pub use qa::{
    MAX_DOCUMENT_SIZE, NO_RELEVANT_INFORMATION, QaService, clean_text, estimate_confidence,
    keyword_relevance, source_snippets,
};
pub use summarization::SummarizationService;
