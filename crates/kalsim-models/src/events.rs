use serde::{Deserialize, Serialize};

/// A trending prediction-market event from a market data source.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MarketEvent {
    pub title: String,
    #[serde(default)]
    pub ticker: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub volume: f64,
    /// Implied probability in `[0, 1]`, when the source reports one.
    #[serde(default)]
    pub probability: Option<f64>,
}

const MAX_TOPICS: usize = 8;

/// Summary of what is moving across a set of events.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct TrendAnalysis {
    pub topics: Vec<String>,
    pub categories: Vec<String>,
    pub total_volume: f64,
    pub summary: String,
}

impl TrendAnalysis {
    /// Top titles by volume plus their distinct categories. An empty event
    /// list yields a single "General Market" topic.
    pub fn from_events(events: &[MarketEvent]) -> Self {
        if events.is_empty() {
            return Self {
                topics: vec!["General Market".to_string()],
                summary: "No market data available.".to_string(),
                ..Default::default()
            };
        }

        let mut sorted: Vec<&MarketEvent> = events.iter().collect();
        sorted.sort_by(|a, b| b.volume.total_cmp(&a.volume));

        let mut categories: Vec<String> = Vec::new();
        for event in &sorted {
            if let Some(cat) = &event.category {
                if !categories.contains(cat) {
                    categories.push(cat.clone());
                }
            }
        }

        let topics: Vec<String> = sorted
            .iter()
            .take(MAX_TOPICS)
            .map(|e| e.title.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();

        Self {
            summary: format!("Top trending markets: {}", topics.join(", ")),
            topics,
            categories,
            total_volume: events.iter().map(|e| e.volume).sum(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(title: &str, category: &str, volume: f64) -> MarketEvent {
        MarketEvent {
            title: title.to_string(),
            ticker: None,
            category: Some(category.to_string()),
            volume,
            probability: None,
        }
    }

    #[test]
    fn analysis_orders_by_volume() {
        let events = vec![
            event("Fed cuts rates", "economics", 100.0),
            event("Election winner", "politics", 500.0),
            event("CPI above 3%", "economics", 250.0),
        ];
        let analysis = TrendAnalysis::from_events(&events);
        assert_eq!(analysis.topics[0], "Election winner");
        assert_eq!(analysis.categories, vec!["politics", "economics"]);
        assert_eq!(analysis.total_volume, 850.0);
        assert!(analysis.summary.starts_with("Top trending markets: Election winner"));
    }

    #[test]
    fn topics_are_capped() {
        let events: Vec<MarketEvent> = (0..12)
            .map(|i| event(&format!("Event {i}"), "misc", i as f64))
            .collect();
        let analysis = TrendAnalysis::from_events(&events);
        assert_eq!(analysis.topics.len(), 8);
        assert_eq!(analysis.topics[0], "Event 11");
    }

    #[test]
    fn empty_events_fall_back_to_general_market() {
        let analysis = TrendAnalysis::from_events(&[]);
        assert_eq!(analysis.topics, vec!["General Market"]);
        assert_eq!(analysis.summary, "No market data available.");
    }
}
