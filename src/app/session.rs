use std::collections::HashMap;
use std::f32::consts::{FRAC_PI_2, FRAC_PI_4};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Result;
use chrono::Utc;
use eframe::egui::{Color32, Vec2, vec2};
use tracing::{debug, info, warn};

use crate::mindmap::{
    Corpus, Document, FALLBACK_LIMIT, IconKind, Link, MindMap, Node, NodeKind, NodePatch,
    QueryPayload, QueryService, ROOT_ID, SEED_ROOT_VAL, SUMMARY_PLACEHOLDER, SummaryService,
    TREE_ROOT_VAL, VisibleGraph, payload_into_subtree, rank_documents, summary_or_placeholder,
    validate_payload,
};
use crate::util::short_label;

use super::animation::{DayNightCycle, SproutTween, Wind};
use super::physics::{LayoutEngine, LayoutMode, LayoutTuning, seed};
use super::procedural::{depths, subtree_weights};

const TREE_ROOT_COLOR: Color32 = Color32::from_rgb(110, 78, 48);
const SYNTHESIZED_NAME: &str = "New idea";
const DESCRIPTION_CHARS: usize = 140;

pub struct SessionConfig {
    pub corpus: Corpus,
    pub mode: LayoutMode,
    pub query_service: Arc<dyn QueryService>,
    pub summary_service: Arc<dyn SummaryService>,
    pub batches: Vec<QueryPayload>,
}

struct QueryReply {
    generation: u64,
    text: String,
    result: Result<QueryPayload>,
}

struct SummaryReply {
    node_id: String,
    summary: String,
}

#[derive(Clone, Debug, PartialEq)]
pub(in crate::app) enum SummaryState {
    Pending,
    Ready(String),
}

/// Headless mind-map core: model, layout, animation clocks and the
/// asynchronous collaborators. The UI and the SVG exporter both drive it one
/// frame at a time through [`Session::step`].
pub(in crate::app) struct Session {
    pub(in crate::app) map: MindMap,
    pub(in crate::app) layout: LayoutEngine,
    pub(in crate::app) day: DayNightCycle,
    pub(in crate::app) wind: Wind,
    pub(in crate::app) live_layout: bool,
    visible: VisibleGraph,
    depths: HashMap<String, u32>,
    weights: HashMap<String, u32>,
    structure_dirty: bool,
    sprout: Option<SproutTween>,
    corpus: Arc<Corpus>,
    query_service: Arc<dyn QueryService>,
    summary_service: Arc<dyn SummaryService>,
    generation: u64,
    answered_generation: u64,
    query_tx: Sender<QueryReply>,
    query_rx: Receiver<QueryReply>,
    summary_tx: Sender<SummaryReply>,
    summary_rx: Receiver<SummaryReply>,
    summaries: HashMap<String, SummaryState>,
    synthesized: usize,
}

impl Session {
    pub(in crate::app) fn new(config: SessionConfig) -> Self {
        let (query_tx, query_rx) = mpsc::channel();
        let (summary_tx, summary_rx) = mpsc::channel();
        let map = MindMap::new_seed();
        let visible = map.visible();
        let mut layout = LayoutEngine::new(config.mode);
        layout.set_root_anchor(Some(vec2(0.0, seed::seed_root_y())));
        layout.rebuild(&visible, config.mode);

        let mut session = Self {
            map,
            layout,
            day: DayNightCycle::default(),
            wind: Wind::default(),
            live_layout: true,
            depths: depths(&visible),
            weights: subtree_weights(&visible),
            visible,
            structure_dirty: false,
            sprout: None,
            corpus: Arc::new(config.corpus),
            query_service: config.query_service,
            summary_service: config.summary_service,
            generation: 0,
            answered_generation: 0,
            query_tx,
            query_rx,
            summary_tx,
            summary_rx,
            summaries: HashMap::new(),
            synthesized: 0,
        };
        for batch in config.batches {
            session.ingest(batch);
        }
        session
    }

    pub(in crate::app) fn visible(&self) -> &VisibleGraph {
        &self.visible
    }

    pub(in crate::app) fn depths(&self) -> &HashMap<String, u32> {
        &self.depths
    }

    pub(in crate::app) fn weights(&self) -> &HashMap<String, u32> {
        &self.weights
    }

    pub(in crate::app) fn corpus(&self) -> &Corpus {
        &self.corpus
    }

    pub(in crate::app) fn mode(&self) -> LayoutMode {
        self.layout.mode()
    }

    pub(in crate::app) fn is_sprouting(&self) -> bool {
        self.sprout.is_some()
    }

    pub(in crate::app) fn is_query_pending(&self) -> bool {
        self.answered_generation < self.generation
    }

    pub(in crate::app) fn set_mode(&mut self, mode: LayoutMode) {
        if mode == self.layout.mode() {
            return;
        }
        info!(mode = mode.label(), "switching layout mode");
        self.layout.rebuild(&self.visible, mode);
    }

    pub(in crate::app) fn set_tuning(&mut self, tuning: LayoutTuning) {
        self.layout.set_tuning(tuning, &self.visible);
    }

    /// Sends `text` to the query service on a background thread. Blank text
    /// is ignored. A newer query supersedes any answer still in flight.
    pub(in crate::app) fn submit_query(&mut self, text: &str) -> bool {
        let text = text.trim();
        if text.is_empty() {
            return false;
        }

        self.generation += 1;
        let generation = self.generation;
        info!(generation, query = text, "submitting query");

        let tx = self.query_tx.clone();
        let service = Arc::clone(&self.query_service);
        let corpus = Arc::clone(&self.corpus);
        let text = text.to_owned();
        thread::spawn(move || {
            let result = service.search(&text, &corpus);
            let _ = tx.send(QueryReply {
                generation,
                text,
                result,
            });
        });
        true
    }

    pub(in crate::app) fn wait_for_query(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while self.is_query_pending() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.query_rx.recv_timeout(remaining) {
                Ok(reply) => self.receive_query_reply(reply),
                Err(_) => return false,
            }
        }
        true
    }

    fn poll_background(&mut self) {
        while let Ok(reply) = self.query_rx.try_recv() {
            self.receive_query_reply(reply);
        }

        while let Ok(reply) = self.summary_rx.try_recv() {
            self.summaries
                .insert(reply.node_id, SummaryState::Ready(reply.summary));
        }
    }

    fn receive_query_reply(&mut self, reply: QueryReply) {
        if reply.generation != self.generation {
            debug!(
                generation = reply.generation,
                latest = self.generation,
                "discarding superseded query response"
            );
            return;
        }
        self.answered_generation = reply.generation;
        self.apply_query_result(&reply.text, reply.result);
    }

    /// Attaches a query answer under root, or the local ranking when the
    /// answer is missing or malformed. Returns the number of nodes added.
    pub(in crate::app) fn apply_query_result(&mut self, text: &str, result: Result<QueryPayload>) -> usize {
        let payload = result.and_then(|payload| {
            validate_payload(&payload)?;
            Ok(payload)
        });

        let added = match payload {
            Ok(payload) => {
                let (nodes, links) = payload_into_subtree(payload);
                let added = self.map.add_subtree(ROOT_ID, nodes, links);
                info!(query = text, added, "attached query subtree");
                added
            }
            Err(error) => {
                warn!(query = text, "query service failed, ranking locally: {error:#}");
                self.attach_fallback(text)
            }
        };

        self.structure_changed();
        added
    }

    pub(in crate::app) fn ingest(&mut self, batch: QueryPayload) -> usize {
        let (nodes, links) = payload_into_subtree(batch);
        let added = self.map.add_subtree(ROOT_ID, nodes, links);
        info!(added, "ingested batch");
        self.structure_changed();
        added
    }

    fn attach_fallback(&mut self, text: &str) -> usize {
        let ranked = rank_documents(&self.corpus, text, Utc::now());
        let (nodes, links): (Vec<_>, Vec<_>) = ranked
            .into_iter()
            .take(FALLBACK_LIMIT)
            .map(|document| {
                let id = format!("doc-{}", document.id);
                let mut node = Node::new(id.clone(), document.title.clone(), NodeKind::Document, 1);
                node.document_id = Some(document.id.clone());
                if !document.content.is_empty() {
                    node.description = Some(short_label(&document.content, DESCRIPTION_CHARS));
                }
                (node, Link::new(ROOT_ID, id))
            })
            .unzip();

        let added = self.map.add_subtree(ROOT_ID, nodes, links);
        info!(query = text, added, "attached fallback documents");
        added
    }

    fn structure_changed(&mut self) {
        let pruned = self.map.prune_dangling();
        if pruned > 0 {
            debug!(pruned, "pruned dangling links");
        }

        if self.sprout.is_none() && self.map.is_seed() && self.map.has_children(ROOT_ID) {
            let target_y = seed::tree_root_y(self.map.visible().nodes.len());
            self.sprout = Some(SproutTween::new(
                seed::seed_root_y(),
                target_y,
                SEED_ROOT_VAL,
                TREE_ROOT_VAL,
            ));
            self.layout.reheat(1.0);
            info!("seed is sprouting");
        }

        self.structure_dirty = true;
    }

    fn refresh_layout(&mut self) {
        let anchor = match &self.sprout {
            Some(tween) => Some(vec2(0.0, tween.root_y())),
            None if self.map.is_seed() => Some(vec2(0.0, seed::seed_root_y())),
            None => None,
        };
        self.layout.set_root_anchor(anchor);

        if self.structure_dirty {
            self.visible = self.map.visible();
            self.depths = depths(&self.visible);
            self.weights = subtree_weights(&self.visible);
            self.layout.rebuild(&self.visible, self.layout.mode());
            self.structure_dirty = false;
        }
    }

    fn step_sprout(&mut self, dt: f32) {
        let Some(tween) = self.sprout.as_mut() else {
            return;
        };
        tween.step(dt);
        let val = tween.root_val();
        let finished = tween.is_finished();

        if !finished {
            self.map.update_node(
                ROOT_ID,
                NodePatch {
                    val: Some(val),
                    ..NodePatch::default()
                },
            );
            return;
        }

        self.sprout = None;
        self.map.update_node(
            ROOT_ID,
            NodePatch {
                val: Some(TREE_ROOT_VAL),
                icon: Some(IconKind::Tree),
                color: Some(TREE_ROOT_COLOR),
                ..NodePatch::default()
            },
        );
        self.structure_dirty = true;
        info!("seed grew into a tree");
    }

    pub(in crate::app) fn step(&mut self, dt: f32) -> bool {
        self.poll_background();
        self.day.advance(dt);
        self.wind.advance(dt);
        self.step_sprout(dt);
        self.refresh_layout();
        let moving = self.live_layout && self.layout.tick();

        moving || self.sprout.is_some() || self.is_query_pending() || self.has_pending_summaries()
    }

    pub(in crate::app) fn toggle_expand(&mut self, node_id: &str) -> bool {
        let Some(node) = self.map.node(node_id) else {
            return false;
        };

        if self.map.has_children(node_id) {
            let collapsed = !node.collapsed;
            self.map.update_node(
                node_id,
                NodePatch {
                    collapsed: Some(collapsed),
                    ..NodePatch::default()
                },
            );
            debug!(node = node_id, collapsed, "toggled node");
            self.structure_changed();
            return true;
        }

        self.add_child(node_id).is_some()
    }

    pub(in crate::app) fn add_child(&mut self, parent_id: &str) -> Option<String> {
        let bias = self.synthesized_bias(parent_id)?;
        let id = self
            .map
            .add_child(parent_id, SYNTHESIZED_NAME, NodeKind::Category, Some(bias))?;
        self.synthesized += 1;
        info!(parent = parent_id, child = %id, "added child");
        self.structure_changed();
        Some(id)
    }

    fn synthesized_bias(&self, parent_id: &str) -> Option<Vec2> {
        let parent = self.map.node(parent_id)?;
        let anchor = self.layout.position(parent_id).unwrap_or(Vec2::ZERO);
        let slot = self.synthesized;

        Some(match self.layout.mode() {
            LayoutMode::Spider => {
                let angle = FRAC_PI_4 + (slot % 4) as f32 * FRAC_PI_2;
                let reach = 140.0 + 30.0 * parent.level.min(4) as f32;
                anchor + vec2(angle.cos(), angle.sin()) * reach
            }
            LayoutMode::Seed => {
                let side = if slot % 2 == 0 { -1.0 } else { 1.0 };
                anchor + vec2(side * (55.0 + 18.0 * (slot % 3) as f32), -80.0)
            }
        })
    }

    pub(in crate::app) fn delete(&mut self, node_id: &str) -> bool {
        if !self.map.delete_subtree(node_id) {
            return false;
        }
        self.summaries.retain(|id, _| self.map.contains(id));
        info!(node = node_id, "deleted subtree");
        self.structure_changed();
        true
    }

    pub(in crate::app) fn rename(&mut self, node_id: &str, name: &str) -> bool {
        let name = name.trim();
        if name.is_empty() {
            return false;
        }
        self.map.update_node(
            node_id,
            NodePatch {
                name: Some(name.to_owned()),
                ..NodePatch::default()
            },
        )
    }

    pub(in crate::app) fn recolor(&mut self, node_id: &str, color: Color32) -> bool {
        self.map.update_node(
            node_id,
            NodePatch {
                color: Some(color),
                ..NodePatch::default()
            },
        )
    }

    pub(in crate::app) fn document_for(&self, node_id: &str) -> Option<&Document> {
        let document_id = self.map.node(node_id)?.document_id.as_deref()?;
        self.corpus.document(document_id)
    }

    pub(in crate::app) fn request_summary(&mut self, node_id: &str) {
        let Some(node) = self.map.node(node_id) else {
            return;
        };
        if node.kind != NodeKind::Document || self.summaries.contains_key(node_id) {
            return;
        }

        let Some(document) = self.document_for(node_id).cloned() else {
            self.summaries
                .insert(node_id.to_owned(), SummaryState::Ready(SUMMARY_PLACEHOLDER.to_owned()));
            return;
        };

        self.summaries.insert(node_id.to_owned(), SummaryState::Pending);
        let tx = self.summary_tx.clone();
        let service = Arc::clone(&self.summary_service);
        let node_id = node_id.to_owned();
        thread::spawn(move || {
            let summary = summary_or_placeholder(service.as_ref(), &document);
            let _ = tx.send(SummaryReply { node_id, summary });
        });
    }

    pub(in crate::app) fn summary(&self, node_id: &str) -> Option<&SummaryState> {
        self.summaries.get(node_id)
    }

    fn has_pending_summaries(&self) -> bool {
        self.summaries
            .values()
            .any(|state| *state == SummaryState::Pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::mindmap::{Unconfigured, demo_corpus};

    struct Fixed(&'static str);

    impl QueryService for Fixed {
        fn search(&self, _text: &str, _corpus: &Corpus) -> Result<QueryPayload> {
            Ok(serde_json::from_str(self.0)?)
        }
    }

    struct Echo;

    impl SummaryService for Echo {
        fn summarize(&self, document: &Document) -> Result<String> {
            Ok(format!("About {}", document.title))
        }
    }

    fn session_with(query_service: Arc<dyn QueryService>, mode: LayoutMode) -> Session {
        Session::new(SessionConfig {
            corpus: demo_corpus(Utc::now()),
            mode,
            query_service,
            summary_service: Arc::new(Unconfigured),
            batches: Vec::new(),
        })
    }

    fn settle_query(session: &mut Session) {
        assert!(session.wait_for_query(Duration::from_secs(5)), "query thread should answer");
    }

    fn settle_summaries(session: &mut Session) {
        while session.has_pending_summaries() {
            let reply = session
                .summary_rx
                .recv_timeout(Duration::from_secs(5))
                .expect("summary thread should answer");
            session
                .summaries
                .insert(reply.node_id, SummaryState::Ready(reply.summary));
        }
    }

    #[test]
    fn blank_query_never_reaches_the_service() {
        let mut session = session_with(Arc::new(Unconfigured), LayoutMode::Seed);
        let before = session.map.clone();

        assert!(!session.submit_query("   "));
        assert_eq!(session.generation, 0);
        assert!(!session.is_query_pending());
        assert_eq!(session.map.nodes, before.nodes);
        assert_eq!(session.map.links, before.links);
    }

    #[test]
    fn failing_service_falls_back_to_local_ranking() {
        let mut session = session_with(Arc::new(Unconfigured), LayoutMode::Seed);
        let expected = rank_documents(session.corpus(), "tree", Utc::now())
            .len()
            .min(FALLBACK_LIMIT);
        assert!(expected > 0);

        assert!(session.submit_query("tree"));
        settle_query(&mut session);

        let children = session.map.children_of(ROOT_ID);
        assert_eq!(children.len(), expected);
        for child in children {
            let node = session.map.node(child).expect("child exists");
            assert_eq!(node.kind, NodeKind::Document);
            assert!(child.starts_with("doc-"));
        }
        assert!(session.is_sprouting());
    }

    #[test]
    fn valid_payload_attaches_and_sprout_finishes() {
        let payload = r#"{"nodes": [
            {"id": "soil", "name": "Soil", "type": "CATEGORY"},
            {"id": "worms", "name": "Worms", "type": "DOCUMENT"}
        ], "links": [{"source": "soil", "target": "worms"}]}"#;
        let mut session = session_with(Arc::new(Fixed(payload)), LayoutMode::Seed);

        session.submit_query("soil");
        settle_query(&mut session);
        assert_eq!(session.map.parent_of("worms"), Some("soil"));
        assert_eq!(session.map.parent_of("soil"), Some(ROOT_ID));

        for _ in 0..200 {
            session.step(1.0 / 60.0);
        }
        let root = session.map.node(ROOT_ID).expect("root");
        assert_eq!(root.icon, IconKind::Tree);
        assert_eq!(root.val, TREE_ROOT_VAL);
        assert!(!session.is_sprouting());
        assert!(session.visible().contains("worms"));
    }

    #[test]
    fn startup_batches_attach_under_root() {
        let batch: QueryPayload = serde_json::from_str(
            r#"{"nodes": [{"id": "notes", "name": "Notes", "type": "PROJECT"}], "links": []}"#,
        )
        .expect("batch json");
        let session = Session::new(SessionConfig {
            corpus: demo_corpus(Utc::now()),
            mode: LayoutMode::Seed,
            query_service: Arc::new(Unconfigured),
            summary_service: Arc::new(Unconfigured),
            batches: vec![batch],
        });

        assert_eq!(session.map.parent_of("notes"), Some(ROOT_ID));
        assert!(session.is_sprouting());
    }

    #[test]
    fn repeated_batches_extend_known_branches() {
        let first: QueryPayload =
            serde_json::from_str(r#"{"nodes": [{"id": "soil", "name": "Soil", "type": "CATEGORY"}]}"#)
                .expect("first batch");
        let second: QueryPayload = serde_json::from_str(
            r#"{"nodes": [
                {"id": "soil", "name": "Soil", "type": "CATEGORY"},
                {"id": "worms", "name": "Worms", "type": "DOCUMENT"}
            ], "links": [{"source": "soil", "target": "worms"}]}"#,
        )
        .expect("second batch");
        let mut session = session_with(Arc::new(Unconfigured), LayoutMode::Spider);

        assert_eq!(session.ingest(first), 1);
        assert_eq!(session.ingest(second), 1);
        session.step(1.0 / 60.0);

        assert_eq!(session.map.parent_of("worms"), Some("soil"));
        assert!(session.visible().contains("worms"));
        assert_eq!(session.map.node_count(), session.visible().nodes.len());
    }

    #[test]
    fn depth_and_weight_caches_follow_the_visible_graph() {
        let mut session = session_with(Arc::new(Unconfigured), LayoutMode::Seed);
        let branch = session.add_child(ROOT_ID).expect("branch");
        let twig = session.add_child(&branch).expect("twig");
        assert!(!session.depths().contains_key(&twig));

        session.step(1.0 / 60.0);
        assert_eq!(session.depths().get(&twig), Some(&2));
        assert_eq!(session.weights().get(&branch), Some(&2));
        assert_eq!(
            session.weights().get(ROOT_ID).copied(),
            Some(session.visible().nodes.len() as u32)
        );

        session.toggle_expand(&branch);
        session.step(1.0 / 60.0);
        assert!(!session.depths().contains_key(&twig));
        assert_eq!(session.weights().get(&branch), Some(&1));
    }

    #[test]
    fn malformed_payload_takes_the_fallback() {
        let mut session = session_with(Arc::new(Fixed(r#"{"nodes": []}"#)), LayoutMode::Spider);
        session.submit_query("seed");
        settle_query(&mut session);
        assert!(session.map.children_of(ROOT_ID).iter().all(|id| id.starts_with("doc-")));
        assert!(session.map.has_children(ROOT_ID));
    }

    #[test]
    fn superseded_responses_are_dropped() {
        let mut session = session_with(Arc::new(Unconfigured), LayoutMode::Seed);
        session.generation = 2;
        session
            .query_tx
            .send(QueryReply {
                generation: 1,
                text: "tree".into(),
                result: Err(anyhow::anyhow!("slow")),
            })
            .expect("receiver alive");

        session.step(1.0 / 60.0);
        assert!(!session.map.has_children(ROOT_ID));
        assert!(session.is_query_pending());
    }

    #[test]
    fn expand_state_machine() {
        let mut session = session_with(Arc::new(Unconfigured), LayoutMode::Spider);
        let a = session.add_child(ROOT_ID).expect("root exists");
        let b = session.add_child(&a).expect("a exists");
        session.step(0.0);
        assert!(session.visible().contains(&b));

        assert!(session.toggle_expand(&a));
        session.step(0.0);
        assert!(!session.visible().contains(&b));

        assert!(session.toggle_expand(&a));
        session.step(0.0);
        assert!(session.visible().contains(&b));

        assert!(session.toggle_expand(&b));
        assert_eq!(session.map.children_of(&b).len(), 1);
        assert!(!session.map.node(&b).expect("b").collapsed);

        assert!(!session.toggle_expand("ghost"));
    }

    #[test]
    fn synthesized_children_get_distinct_spider_slots() {
        let mut session = session_with(Arc::new(Unconfigured), LayoutMode::Spider);
        let first = session.add_child(ROOT_ID).expect("root");
        let second = session.add_child(ROOT_ID).expect("root");
        let bias = |id: &str| session.map.node(id).and_then(|node| node.bias);
        assert_ne!(bias(&first), bias(&second));
    }

    #[test]
    fn root_survives_delete_and_edits_apply() {
        let mut session = session_with(Arc::new(Unconfigured), LayoutMode::Seed);
        let child = session.add_child(ROOT_ID).expect("root");

        assert!(!session.delete(ROOT_ID));
        assert!(session.rename(&child, "Compost"));
        assert!(!session.rename(&child, "  "));
        assert!(session.recolor(&child, Color32::RED));
        assert_eq!(session.map.node(&child).map(|node| node.name.as_str()), Some("Compost"));

        assert!(session.delete(&child));
        assert!(!session.delete(&child));
        session.step(0.0);
        assert_eq!(session.visible().nodes.len(), 1);
    }

    #[test]
    fn failed_summary_shows_placeholder() {
        let mut session = session_with(Arc::new(Unconfigured), LayoutMode::Seed);
        session.submit_query("tree");
        settle_query(&mut session);
        let document_node = session.map.children_of(ROOT_ID)[0].to_owned();

        session.request_summary(&document_node);
        settle_summaries(&mut session);
        assert_eq!(
            session.summary(&document_node),
            Some(&SummaryState::Ready(SUMMARY_PLACEHOLDER.to_owned()))
        );
    }

    #[test]
    fn summaries_are_cached_per_node() {
        let mut session = Session::new(SessionConfig {
            corpus: demo_corpus(Utc::now()),
            mode: LayoutMode::Seed,
            query_service: Arc::new(Unconfigured),
            summary_service: Arc::new(Echo),
            batches: Vec::new(),
        });
        session.submit_query("tree");
        settle_query(&mut session);
        let document_node = session.map.children_of(ROOT_ID)[0].to_owned();

        session.request_summary(&document_node);
        settle_summaries(&mut session);
        let Some(SummaryState::Ready(summary)) = session.summary(&document_node).cloned() else {
            panic!("summary should be ready");
        };
        assert!(summary.starts_with("About "));

        session.request_summary(&document_node);
        assert!(!session.has_pending_summaries());
    }
}
