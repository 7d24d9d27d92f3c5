mod app;
mod mindmap;
mod util;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context as _, Result, anyhow};
use chrono::Utc;
use clap::Parser;
use tracing::{info, warn};

use app::{LayoutMode, SessionConfig};
use mindmap::{
    CommandService, QueryService, SummaryService, Unconfigured, demo_corpus, load_batch, load_corpus,
};

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// JSON corpus of documents; a built-in demo corpus is used when omitted.
    #[arg(long)]
    corpus: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = LayoutMode::Seed)]
    mode: LayoutMode,

    /// Program that answers search requests as JSON on stdout.
    #[arg(long)]
    query_command: Option<String>,

    /// Program that answers summary requests on stdout.
    #[arg(long)]
    summary_command: Option<String>,

    /// Node/link batch (query-answer JSON) attached under root; repeatable.
    #[arg(long)]
    ingest: Vec<PathBuf>,

    /// Query submitted on start-up.
    #[arg(long)]
    query: Option<String>,

    /// Render headlessly to this SVG file instead of opening a window.
    #[arg(long)]
    export_svg: Option<PathBuf>,

    /// Simulation frames to run before exporting.
    #[arg(long, default_value_t = 600)]
    ticks: usize,

    #[arg(long, default_value_t = 1280.0)]
    width: f32,

    #[arg(long, default_value_t = 800.0)]
    height: f32,

    #[arg(short, long)]
    verbose: bool,
}

fn service_from(command_line: Option<&str>, role: &str) -> Option<CommandService> {
    let command_line = command_line?;
    let service = CommandService::from_command_line(command_line);
    if service.is_none() {
        warn!(role, "ignoring empty collaborator command");
    }
    service
}

fn main() -> Result<()> {
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_max_level(if args.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        })
        .init();

    let corpus = match &args.corpus {
        Some(path) => load_corpus(path)?,
        None => demo_corpus(Utc::now()),
    };
    info!(documents = corpus.len(), "corpus ready");

    let query_service: Arc<dyn QueryService> = match service_from(args.query_command.as_deref(), "query") {
        Some(service) => Arc::new(service),
        None => Arc::new(Unconfigured),
    };
    let summary_service: Arc<dyn SummaryService> =
        match service_from(args.summary_command.as_deref(), "summary") {
            Some(service) => Arc::new(service),
            None => Arc::new(Unconfigured),
        };

    let batches = args
        .ingest
        .iter()
        .map(|path| load_batch(path))
        .collect::<Result<Vec<_>>>()?;

    let config = SessionConfig {
        corpus,
        mode: args.mode,
        query_service,
        summary_service,
        batches,
    };

    if let Some(path) = &args.export_svg {
        return app::export_svg(
            config,
            args.query.as_deref(),
            args.ticks,
            eframe::egui::vec2(args.width, args.height),
            path,
        )
        .with_context(|| format!("export to {} failed", path.display()));
    }

    let options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default().with_inner_size([args.width, args.height]),
        ..Default::default()
    };
    let initial_query = args.query.clone();

    eframe::run_native(
        "mindgrove",
        options,
        Box::new(move |cc| Ok(Box::new(app::MindGroveApp::new(cc, config, initial_query)))),
    )
    .map_err(|error| anyhow!("window failed: {error}"))
}
