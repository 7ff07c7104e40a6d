//! Values exchanged between the registry, its drivers and API callers.

use serde::{Deserialize, Serialize};

/// Account details read from the page once a session is connected.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileInfo {
    pub display_name: Option<String>,
}

/// One recent conversation scraped from the platform's chat list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    /// First line of the entry (usually the chat title).
    pub title: String,
    /// Remaining text of the entry, if any.
    pub preview: Option<String>,
}

impl Item {
    /// Build an item from the raw text of a chat-list entry.
    pub fn from_text(text: &str) -> Option<Self> {
        let mut lines = text.lines().map(str::trim).filter(|l| !l.is_empty());
        let title = lines.next()?.to_string();
        let rest: Vec<&str> = lines.collect();
        let preview = if rest.is_empty() {
            None
        } else {
            Some(rest.join(" "))
        };
        Some(Self { title, preview })
    }

    fn matches(&self, needle: &str) -> bool {
        self.title.to_lowercase().contains(needle)
            || self
                .preview
                .as_deref()
                .is_some_and(|p| p.to_lowercase().contains(needle))
    }
}

/// Default number of items returned when the caller gives no limit.
pub const DEFAULT_ITEM_LIMIT: usize = 20;

/// Selection applied to recent items.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemFilter {
    /// Case-insensitive substring matched against title and preview.
    pub query: Option<String>,
    /// Requested maximum number of items.
    pub limit: Option<usize>,
}

impl ItemFilter {
    /// Effective limit, clamped to `[1, ceiling]`.
    pub fn effective_limit(&self, ceiling: usize) -> usize {
        let ceiling = ceiling.max(1);
        self.limit.unwrap_or(DEFAULT_ITEM_LIMIT).clamp(1, ceiling)
    }

    /// Filter raw entry texts into at most `ceiling` items.
    pub fn apply(&self, texts: &[String], ceiling: usize) -> Vec<Item> {
        let limit = self.effective_limit(ceiling);
        let needle = self
            .query
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .map(str::to_lowercase);
        texts
            .iter()
            .filter_map(|t| Item::from_text(t))
            .filter(|item| needle.as_deref().map_or(true, |n| item.matches(n)))
            .take(limit)
            .collect()
    }
}

/// Point-in-time rendering of a login prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialArtifact {
    pub mime_type: &'static str,
    pub data: Vec<u8>,
}

impl CredentialArtifact {
    pub fn png(data: Vec<u8>) -> Self {
        Self {
            mime_type: "image/png",
            data,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_from_multiline_text() {
        let item = Item::from_text("Alice\n12:04\n  see you soon ").unwrap();
        assert_eq!(item.title, "Alice");
        assert_eq!(item.preview.as_deref(), Some("12:04 see you soon"));
    }

    #[test]
    fn blank_text_is_skipped() {
        assert!(Item::from_text("  \n\n").is_none());
    }

    #[test]
    fn limit_is_clamped() {
        let f = ItemFilter::default();
        assert_eq!(f.effective_limit(50), DEFAULT_ITEM_LIMIT);
        assert_eq!(f.effective_limit(5), 5);
        let f = ItemFilter {
            limit: Some(0),
            ..Default::default()
        };
        assert_eq!(f.effective_limit(50), 1);
    }

    #[test]
    fn query_filters_case_insensitively() {
        let texts = vec![
            "Alice\nlunch?".to_string(),
            "Bob\nmeeting notes".to_string(),
            "Carol\nLunch tomorrow".to_string(),
        ];
        let f = ItemFilter {
            query: Some("LUNCH".into()),
            limit: None,
        };
        let items = f.apply(&texts, 50);
        let titles: Vec<_> = items.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(titles, vec!["Alice", "Carol"]);
    }

    #[test]
    fn apply_respects_ceiling() {
        let texts: Vec<String> = (0..10).map(|i| format!("chat {i}")).collect();
        let f = ItemFilter {
            query: None,
            limit: Some(100),
        };
        assert_eq!(f.apply(&texts, 3).len(), 3);
    }
}
