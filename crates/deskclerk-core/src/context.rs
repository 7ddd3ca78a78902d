//! Token budget management for the conversation
//!
//! The estimate is a cheap word-count heuristic, not a tokenizer. It only has
//! to be deterministic and monotonic: more text never costs fewer tokens.

use tracing::debug;

use crate::conversation::Conversation;

/// Fixed overhead charged per message (role, separators, metadata)
pub const TOKENS_PER_MESSAGE: usize = 4;

/// Token multiplier per whitespace-delimited word
pub const TOKENS_PER_WORD: f64 = 1.5;

/// Estimate the token cost of a conversation.
///
/// Messages with no content contribute nothing, including their overhead;
/// the model ultimately sees their tool-call payloads through other channels.
pub fn estimate_tokens(conversation: &Conversation) -> usize {
    conversation
        .iter()
        .filter(|m| m.content.is_some())
        .map(|m| TOKENS_PER_MESSAGE + (m.word_count() as f64 * TOKENS_PER_WORD) as usize)
        .sum()
}

/// Trim the conversation until it fits the token budget.
///
/// Evicts the oldest non-system message first. The system message is never
/// removed, and neither is the last remaining message: a single over-budget
/// message is returned unchanged rather than leaving nothing to send.
pub fn trim_to_budget(mut conversation: Conversation, budget: usize) -> Conversation {
    let before = conversation.len();
    while estimate_tokens(&conversation) > budget && conversation.len() > 1 {
        if !conversation.remove_oldest_non_system() {
            break;
        }
    }
    if conversation.len() < before {
        debug!(
            evicted = before - conversation.len(),
            remaining = conversation.len(),
            budget,
            "Trimmed conversation to token budget"
        );
    }
    conversation
}
