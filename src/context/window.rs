//! Context budget for retrieved chunks.
//!
//! Chunks are admitted in rank order while their estimated token cost fits
//! the budget; the first chunk that does not fit ends the selection, so the
//! kept set is always a prefix of the ranking.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextBudget {
    /// Maximum estimated tokens of context; `0` means unlimited
    pub max_tokens: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FittedContext {
    pub chunks: Vec<String>,
    pub dropped: usize,
    pub estimated_tokens: usize,
}

impl ContextBudget {
    pub fn new(max_tokens: usize) -> Self {
        Self { max_tokens }
    }

    pub fn unlimited() -> Self {
        Self::new(0)
    }

    pub fn fit(&self, chunks: Vec<String>) -> FittedContext {
        let total = chunks.len();
        let mut kept = Vec::with_capacity(total);
        let mut used = 0;

        for chunk in chunks {
            let tokens = estimate_tokens(&chunk);
            if self.max_tokens > 0 && used + tokens > self.max_tokens {
                break;
            }
            used += tokens;
            kept.push(chunk);
        }

        FittedContext {
            dropped: total - kept.len(),
            chunks: kept,
            estimated_tokens: used,
        }
    }
}

/// Estimate token count from text.
///
/// ~4 characters per token for English text.
pub fn estimate_tokens(text: &str) -> usize {
    (text.len() + 3) / 4
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_estimation() {
        assert_eq!(estimate_tokens(""), 0);
        assert_eq!(estimate_tokens("abcd"), 1);
        assert!(estimate_tokens("This is a longer sentence.") > estimate_tokens("Hi"));
    }

    #[test]
    fn keeps_everything_within_budget() {
        let fitted = ContextBudget::new(100).fit(vec!["a".repeat(40), "b".repeat(40)]);
        assert_eq!(fitted.chunks.len(), 2);
        assert_eq!(fitted.dropped, 0);
        assert_eq!(fitted.estimated_tokens, 20);
    }

    #[test]
    fn drops_lowest_ranked_chunks_first() {
        let chunks = vec!["a".repeat(40), "b".repeat(40), "c".repeat(4)];
        let fitted = ContextBudget::new(12).fit(chunks);
        assert_eq!(fitted.chunks, vec!["a".repeat(40)]);
        assert_eq!(fitted.dropped, 2);
    }

    #[test]
    fn zero_budget_is_unlimited() {
        let fitted = ContextBudget::unlimited().fit(vec!["x".repeat(1_000_000)]);
        assert_eq!(fitted.dropped, 0);
    }
}
