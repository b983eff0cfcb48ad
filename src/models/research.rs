/// Web research gathered for a trip, ready to be embedded in a prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResearchContext {
    Found(String),
    /// Carries a short diagnostic; never treated as facts about the trip.
    Unavailable(String),
}

impl ResearchContext {
    pub fn is_available(&self) -> bool {
        matches!(self, ResearchContext::Found(_))
    }

    /// Text for the prompt, cut to `max_chars` characters.
    pub fn prompt_excerpt(&self, max_chars: usize) -> String {
        match self {
            ResearchContext::Found(text) => text.chars().take(max_chars).collect(),
            ResearchContext::Unavailable(_) => {
                "No research data available; rely on typical current prices.".to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_excerpt_is_capped_on_char_boundaries() {
        let context = ResearchContext::Found("₹".repeat(1000));
        assert_eq!(context.prompt_excerpt(800).chars().count(), 800);
    }

    #[test]
    fn test_unavailable_context_is_not_forwarded() {
        let context = ResearchContext::Unavailable("Research API key missing".to_string());
        assert!(!context.is_available());
        assert!(!context.prompt_excerpt(800).contains("API key"));
    }
}
