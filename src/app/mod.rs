use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context as _, Result};
use eframe::egui::{Context, Pos2, Vec2};
use tracing::{info, warn};

mod animation;
mod graph;
mod physics;
mod procedural;
mod render_utils;
mod scene;
mod session;
mod ui;

use animation::{FocusTween, Viewport};
use graph::{FrameStyle, compose_frame};
use physics::LayoutTuning;
use scene::{ReconcileStats, Reconciler, RetainedScene};
use session::Session;

pub use physics::LayoutMode;
pub use session::SessionConfig;

const QUERY_WAIT: Duration = Duration::from_secs(30);
const EXPORT_FRAME_SECS: f32 = 1.0 / 60.0;

pub struct MindGroveApp {
    model: Box<ViewModel>,
}

struct ViewModel {
    session: Session,
    viewport: Viewport,
    focus: Option<FocusTween>,
    pending_focus: Option<String>,
    reconciler: Reconciler,
    scene: RetainedScene,
    last_stats: ReconcileStats,
    selected: Option<String>,
    hovered: Option<String>,
    query_text: String,
    search: String,
    search_match_cache: Option<SearchMatchCache>,
    context_menu: Option<ContextMenu>,
    drag: Option<DragTarget>,
    tuning: LayoutTuning,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum DragTarget {
    Node,
    Canvas,
}

struct SearchMatchCache {
    query: String,
    names: Vec<(String, String)>,
    matches: Arc<HashSet<String>>,
}

struct ContextMenu {
    node_id: String,
    screen_pos: Pos2,
    rename: String,
}

impl MindGroveApp {
    pub fn new(_cc: &eframe::CreationContext<'_>, config: SessionConfig, initial_query: Option<String>) -> Self {
        let mut session = Session::new(config);
        if let Some(query) = initial_query.as_deref() {
            session.submit_query(query);
        }

        Self {
            model: Box::new(ViewModel::new(session, initial_query.unwrap_or_default())),
        }
    }
}

impl eframe::App for MindGroveApp {
    fn update(&mut self, ctx: &Context, _frame: &mut eframe::Frame) {
        self.model.show(ctx);
    }
}

/// Runs the frame loop `ticks` times without a window and writes the
/// resulting scene to `path` as SVG.
pub fn export_svg(
    config: SessionConfig,
    query: Option<&str>,
    ticks: usize,
    size: Vec2,
    path: &Path,
) -> Result<()> {
    let mut session = Session::new(config);
    if let Some(query) = query
        && session.submit_query(query)
        && !session.wait_for_query(QUERY_WAIT)
    {
        warn!(query, "query did not answer in time; exporting without it");
    }

    for _ in 0..ticks {
        session.step(EXPORT_FRAME_SECS);
    }

    let mut reconciler = Reconciler::default();
    let mut scene = RetainedScene::default();
    let stats = reconciler.apply(compose_frame(&session, FrameStyle::default()), &mut scene);
    let svg = scene.to_svg(size, Viewport::default());

    fs::write(path, svg).with_context(|| format!("failed to write SVG to {}", path.display()))?;
    info!(
        path = %path.display(),
        nodes = session.visible().nodes.len(),
        elements = stats.created,
        "exported scene"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::Utc;
    use eframe::egui::vec2;

    use crate::mindmap::{Unconfigured, demo_corpus};

    #[test]
    fn headless_export_writes_a_complete_svg() {
        let config = SessionConfig {
            corpus: demo_corpus(Utc::now()),
            mode: LayoutMode::Seed,
            query_service: Arc::new(Unconfigured),
            summary_service: Arc::new(Unconfigured),
            batches: Vec::new(),
        };
        let path = std::env::temp_dir().join(format!("mindgrove-export-{}.svg", std::process::id()));

        export_svg(config, Some("tree"), 120, vec2(640.0, 400.0), &path).expect("export");
        let svg = fs::read_to_string(&path).expect("read back");
        let _ = fs::remove_file(&path);

        assert!(svg.starts_with("<svg"));
        assert!(svg.trim_end().ends_with("</svg>"));
        assert!(svg.matches("<text").count() > 1);
    }
}
