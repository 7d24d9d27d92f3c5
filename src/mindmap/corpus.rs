use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

pub const FALLBACK_LIMIT: usize = 6;
const RECENCY_WINDOW_DAYS: f32 = 365.0;
const TITLE_MATCH_SCORE: f32 = 3.0;
const TAG_MATCH_SCORE: f32 = 2.0;
const CONTENT_MATCH_SCORE: f32 = 1.0;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub content: String,
    pub modified: DateTime<Utc>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Corpus {
    pub documents: Vec<Document>,
}

impl Corpus {
    pub fn document(&self, id: &str) -> Option<&Document> {
        self.documents.iter().find(|document| document.id == id)
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }
}

pub fn load_corpus(path: &Path) -> Result<Corpus> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read corpus file {}", path.display()))?;
    parse_corpus(&raw).with_context(|| format!("failed to parse corpus file {}", path.display()))
}

pub fn parse_corpus(raw: &str) -> Result<Corpus> {
    if raw.trim_start().starts_with('[') {
        let documents: Vec<Document> =
            serde_json::from_str(raw).context("invalid JSON document array")?;
        return Ok(Corpus { documents });
    }

    serde_json::from_str(raw).context("invalid JSON corpus object")
}

fn match_score(document: &Document, terms: &[String]) -> f32 {
    let title = document.title.to_lowercase();
    let content = document.content.to_lowercase();
    let tags = document
        .tags
        .iter()
        .map(|tag| tag.to_lowercase())
        .collect::<Vec<_>>();

    terms
        .iter()
        .map(|term| {
            let mut score = 0.0;
            if title.contains(term.as_str()) {
                score += TITLE_MATCH_SCORE;
            }
            if tags.iter().any(|tag| tag.contains(term.as_str())) {
                score += TAG_MATCH_SCORE;
            }
            if content.contains(term.as_str()) {
                score += CONTENT_MATCH_SCORE;
            }
            score
        })
        .sum()
}

fn recency_bonus(modified: DateTime<Utc>, now: DateTime<Utc>) -> f32 {
    let age = now.signed_duration_since(modified).max(Duration::zero());
    let age_days = age.num_seconds() as f32 / 86_400.0;
    (1.0 - age_days / RECENCY_WINDOW_DAYS).max(0.0)
}

/// Keyword + linear recency ranking used when the query service is unusable.
/// Only documents matching at least one term are returned, best first.
pub fn rank_documents<'a>(corpus: &'a Corpus, query: &str, now: DateTime<Utc>) -> Vec<&'a Document> {
    let terms = query
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>();
    if terms.is_empty() {
        return Vec::new();
    }

    let mut scored = corpus
        .documents
        .iter()
        .filter_map(|document| {
            let score = match_score(document, &terms);
            (score > 0.0).then(|| (score + recency_bonus(document.modified, now), document))
        })
        .collect::<Vec<_>>();

    scored.sort_by(|a, b| b.0.total_cmp(&a.0).then_with(|| a.1.id.cmp(&b.1.id)));
    scored.into_iter().map(|(_, document)| document).collect()
}

pub fn demo_corpus(now: DateTime<Utc>) -> Corpus {
    let entries: [(&str, &str, &[&str], &str, i64); 10] = [
        ("roots", "Root systems of old oaks", &["botany", "trees"], "How oak roots spread wider than the crown.", 12),
        ("canopy", "Canopy light and leaf density", &["botany", "light"], "Leaf placement follows available light.", 40),
        ("seeds", "Seed dormancy notes", &["botany", "seeds"], "Seeds wait for temperature and moisture cues.", 3),
        ("forces", "Force-directed layouts", &["graphs", "layout"], "Springs, charges and cooling schedules for graph layout.", 90),
        ("quadtree", "Barnes-Hut approximation", &["graphs", "performance"], "Quadtrees make many-body repulsion tractable.", 200),
        ("bezier", "Bezier curves by hand", &["geometry", "curves"], "De Casteljau evaluation and tangents of cubic curves.", 30),
        ("sky", "Sky colour through the day", &["light", "colour"], "Dawn, noon, dusk and night gradients.", 5),
        ("mindmaps", "Mind maps for research", &["notes", "graphs"], "Radial notes with collapsible branches.", 60),
        ("compost", "Compost and soil health", &["soil", "garden"], "Soil biology feeds the roots.", 400),
        ("pruning", "Pruning young trees", &["trees", "garden"], "Cut back competing leaders early.", 150),
    ];

    let documents = entries
        .iter()
        .map(|(id, title, tags, content, age_days)| Document {
            id: (*id).to_owned(),
            title: (*title).to_owned(),
            tags: tags.iter().map(|tag| (*tag).to_owned()).collect(),
            content: (*content).to_owned(),
            modified: now - Duration::days(*age_days),
        })
        .collect();

    Corpus { documents }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed_now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2025-06-01T00:00:00Z")
            .map(|time| time.with_timezone(&Utc))
            .unwrap_or_default()
    }

    #[test]
    fn title_matches_outrank_content_matches() {
        let corpus = demo_corpus(fixed_now());
        let ranked = rank_documents(&corpus, "root", fixed_now());
        let ids = ranked.iter().map(|document| document.id.as_str()).collect::<Vec<_>>();
        assert_eq!(ids.first(), Some(&"roots"));
        assert!(ids.contains(&"compost"));
    }

    #[test]
    fn recency_breaks_ties_between_equal_matches() {
        let now = fixed_now();
        let corpus = Corpus {
            documents: vec![
                Document {
                    id: "old".into(),
                    title: "graph".into(),
                    tags: Vec::new(),
                    content: String::new(),
                    modified: now - Duration::days(300),
                },
                Document {
                    id: "new".into(),
                    title: "graph".into(),
                    tags: Vec::new(),
                    content: String::new(),
                    modified: now - Duration::days(1),
                },
            ],
        };

        let ranked = rank_documents(&corpus, "GRAPH", now);
        assert_eq!(ranked[0].id, "new");
        assert_eq!(ranked[1].id, "old");
    }

    #[test]
    fn non_matching_and_empty_queries_return_nothing() {
        let corpus = demo_corpus(fixed_now());
        assert!(rank_documents(&corpus, "   ", fixed_now()).is_empty());
        assert!(rank_documents(&corpus, "zeppelin", fixed_now()).is_empty());
    }

    #[test]
    fn recency_bonus_is_linear_and_floors_at_zero() {
        let now = fixed_now();
        assert!((recency_bonus(now, now) - 1.0).abs() < 1e-6);
        let half = recency_bonus(now - Duration::hours(24 * 365 / 2), now);
        assert!((half - 0.5).abs() < 0.01);
        assert_eq!(recency_bonus(now - Duration::days(900), now), 0.0);
    }

    #[test]
    fn parses_both_corpus_shapes() {
        let array = r#"[{"id":"a","title":"A","modified":"2024-01-01T00:00:00Z"}]"#;
        let object = r#"{"documents":[{"id":"a","title":"A","tags":["x"],"modified":"2024-01-01T00:00:00Z"}]}"#;
        assert_eq!(parse_corpus(array).map(|corpus| corpus.len()).ok(), Some(1));
        assert_eq!(parse_corpus(object).map(|corpus| corpus.len()).ok(), Some(1));
        assert!(parse_corpus(r#"{"documents":[{"id":"a"}]}"#).is_err());
    }
}
