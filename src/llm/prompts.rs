use crate::summarizer::{SummaryLength, SummaryOptions};

fn actions_clause(options: &SummaryOptions) -> &'static str {
    if options.action_items {
        " and action items"
    } else {
        ""
    }
}

pub fn chunk_summary_prompt(chunk: &str, options: &SummaryOptions) -> String {
    let style = match options.length {
        SummaryLength::Detailed => "detailed paragraphs",
        SummaryLength::Brief => "concise bullet points",
    };

    format!(
        "Summarize the following meeting transcript in {style} and highlight key decisions{actions}.\n\n{chunk}",
        actions = actions_clause(options),
    )
}

/// Partials are joined with blank lines in the order given.
pub fn synthesis_prompt(partials: &[String], options: &SummaryOptions) -> String {
    format!(
        "Combine the following partial summaries into a cohesive {length} meeting summary with clear sections for decisions{actions}:\n\n{combined}",
        length = options.length,
        actions = actions_clause(options),
        combined = partials.join("\n\n"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_brief_chunk_prompt() {
        let prompt = chunk_summary_prompt("Ana: ship Friday", &SummaryOptions::default());
        assert!(prompt.contains("concise bullet points"));
        assert!(prompt.contains("key decisions and action items."));
        assert!(prompt.ends_with("\n\nAna: ship Friday"));
    }

    #[test]
    fn test_detailed_chunk_prompt_without_actions() {
        let options = SummaryOptions {
            length: SummaryLength::Detailed,
            action_items: false,
        };
        let prompt = chunk_summary_prompt("text", &options);
        assert!(prompt.contains("detailed paragraphs"));
        assert!(!prompt.contains("action items"));
    }

    #[test]
    fn test_synthesis_prompt_keeps_order() {
        let partials = vec!["first".to_string(), "second".to_string()];
        let prompt = synthesis_prompt(&partials, &SummaryOptions::default());
        assert!(prompt.contains("cohesive brief meeting summary"));
        assert!(prompt.ends_with(":\n\nfirst\n\nsecond"));
    }
}
