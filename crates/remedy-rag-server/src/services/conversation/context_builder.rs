use tracing::debug;

use crate::services::knowledge_index::KnowledgeHit;
use crate::utils::token_estimator::{estimate_tokens, truncate_lines_to_budget};

use super::types::ComposedPrompt;

/// Placed between knowledge passages in the context block.
pub const KNOWLEDGE_SEPARATOR: &str = "\n---\n";

pub struct ContextComposer {
    system_instruction: String,
    max_context_tokens: usize,
}

impl ContextComposer {
    /// `max_context_tokens == 0` disables truncation.
    pub fn new(system_instruction: String, max_context_tokens: usize) -> Self {
        Self {
            system_instruction,
            max_context_tokens,
        }
    }

    pub fn system_instruction(&self) -> &str {
        &self.system_instruction
    }

    pub fn default_system_instruction() -> String {
        "You are an Ayurvedic assistant.".to_string()
    }

    /// Memory first (short-term, then long-term), knowledge after.
    ///
    /// Every hit contributes a reference, even one with empty text.
    pub fn compose(
        &self,
        knowledge_hits: &[KnowledgeHit],
        short_term: &[String],
        long_term: &[String],
        user_query: &str,
    ) -> ComposedPrompt {
        let memory_context = short_term
            .iter()
            .chain(long_term.iter())
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join("\n");

        let knowledge_context = knowledge_hits
            .iter()
            .map(|h| h.context_text.as_str())
            .filter(|text| !text.is_empty())
            .collect::<Vec<_>>()
            .join(KNOWLEDGE_SEPARATOR);

        let mut context = format!("{}\n{}", memory_context, knowledge_context)
            .trim()
            .to_string();

        if self.max_context_tokens > 0 {
            let before = estimate_tokens(&context);
            if before > self.max_context_tokens {
                context = truncate_lines_to_budget(&context, self.max_context_tokens);
                debug!(
                    "Context truncated from ~{} to ~{} tokens (budget {})",
                    before,
                    estimate_tokens(&context),
                    self.max_context_tokens
                );
            }
        }

        let references = knowledge_hits
            .iter()
            .map(|h| h.reference_label.clone())
            .collect();

        ComposedPrompt {
            prompt: render_prompt(&context, user_query),
            context,
            references,
        }
    }
}

impl Default for ContextComposer {
    fn default() -> Self {
        Self::new(Self::default_system_instruction(), 0)
    }
}

fn render_prompt(context: &str, user_query: &str) -> String {
    format!(
        "You are an Ayurvedic doctor with 10+ years of experience.\n\
         Use the context below (memory + Ayurvedic data) to give the best natural remedy.\n\
         \n\
         Context:\n\
         {}\n\
         \n\
         User Query:\n\
         {}\n",
        context, user_query
    )
}
