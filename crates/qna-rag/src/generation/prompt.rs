//! Prompt templates for answer generation

/// System prompt sent with every question
pub const SYSTEM_PROMPT: &str =
    "You are an expert answering questions based on retrieved documents.";

/// Context used when retrieval found nothing, so the prompt is never empty
pub const NO_DOCUMENTS_PLACEHOLDER: &str = "No relevant documents found.";

/// Prompt builder for grounded questions
pub struct PromptBuilder;

impl PromptBuilder {
    /// Join document texts in retrieval order
    pub fn build_context<S: AsRef<str>>(texts: &[S]) -> String {
        if texts.is_empty() {
            return NO_DOCUMENTS_PLACEHOLDER.to_string();
        }

        texts
            .iter()
            .map(|t| t.as_ref())
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Build the user message
    pub fn build_user_prompt(question: &str, context: &str) -> String {
        format!(
            "Context:\n{context}\n\nQuestion: {question}\nAnswer:",
            context = context,
            question = question
        )
    }
}
