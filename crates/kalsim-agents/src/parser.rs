use kalsim_models::{ActionType, CONTENT_LIMIT};

const PLACEHOLDER_CONTENT: &str = "No specific action taken.";

/// A parsed `ACTION:` / `CONTENT:` decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub action_type: ActionType,
    pub content: String,
}

/// Parse model output into a decision. Never fails: unknown actions become
/// `LURK` and missing content gets a placeholder.
pub fn parse_decision(raw: &str) -> Decision {
    let mut action_type = ActionType::Lurk;
    let mut content = String::new();

    for line in raw.trim().lines() {
        let upper = line.trim_start().to_uppercase();
        if upper.starts_with("ACTION:") {
            let token = after_colon(line).to_uppercase();
            action_type = if token.contains("TWEET") {
                ActionType::Tweet
            } else if token.contains("HOLD") {
                ActionType::Hold
            } else {
                ActionType::Lurk
            };
        } else if upper.starts_with("CONTENT:") {
            content = after_colon(line).to_string();
        }
    }

    if content.is_empty() && action_type == ActionType::Tweet {
        content = truncate_chars(raw, CONTENT_LIMIT);
    }

    let content = if content.is_empty() {
        PLACEHOLDER_CONTENT.to_string()
    } else {
        truncate_chars(&content, CONTENT_LIMIT)
    };

    Decision {
        action_type,
        content,
    }
}

fn after_colon(line: &str) -> &str {
    line.split_once(':').map(|(_, rest)| rest.trim()).unwrap_or("")
}

/// First `limit` characters, never splitting a code point.
pub fn truncate_chars(text: &str, limit: usize) -> String {
    text.chars().take(limit).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_tweet() {
        let d = parse_decision("ACTION: TWEET\nCONTENT: GME to the moon 🚀🚀");
        assert_eq!(d.action_type, ActionType::Tweet);
        assert_eq!(d.content, "GME to the moon 🚀🚀");
    }

    #[test]
    fn tolerates_case_brackets_and_preamble() {
        let d = parse_decision("Sure! Here you go.\naction: [hold]\ncontent: diamond hands, not selling");
        assert_eq!(d.action_type, ActionType::Hold);
        assert_eq!(d.content, "diamond hands, not selling");
    }

    #[test]
    fn unknown_action_is_lurk() {
        let d = parse_decision("ACTION: BUY\nCONTENT: buying more");
        assert_eq!(d.action_type, ActionType::Lurk);
        assert_eq!(d.content, "buying more");
    }

    #[test]
    fn tweet_without_content_uses_raw_text() {
        let raw = "ACTION: TWEET";
        let d = parse_decision(raw);
        assert_eq!(d.action_type, ActionType::Tweet);
        assert_eq!(d.content, raw);
    }

    #[test]
    fn garbage_is_lurk_with_placeholder() {
        let d = parse_decision("the model rambled about the weather");
        assert_eq!(d.action_type, ActionType::Lurk);
        assert_eq!(d.content, PLACEHOLDER_CONTENT);
        assert_eq!(parse_decision("").content, PLACEHOLDER_CONTENT);
    }

    #[test]
    fn content_is_truncated() {
        let long = "a".repeat(500);
        let d = parse_decision(&format!("ACTION: TWEET\nCONTENT: {long}"));
        assert_eq!(d.content.chars().count(), CONTENT_LIMIT);

        let raw = format!("ACTION: TWEET {}", "🚀".repeat(400));
        let d = parse_decision(&raw);
        assert_eq!(d.content.chars().count(), CONTENT_LIMIT);
    }

    #[test]
    fn content_keeps_inner_colons() {
        let d = parse_decision("ACTION: TWEET\nCONTENT: price target: $420");
        assert_eq!(d.content, "price target: $420");
    }
}
