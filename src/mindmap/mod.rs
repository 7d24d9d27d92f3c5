mod command;
mod corpus;
mod graph;
mod payload;
mod service;

pub use corpus::{Corpus, Document, FALLBACK_LIMIT, demo_corpus, load_corpus, rank_documents};
pub use graph::{
    IconKind, Link, MindMap, Node, NodeKind, NodePatch, ROOT_ID, SEED_ROOT_VAL, TREE_ROOT_VAL,
    VisibleGraph,
};
pub use payload::{QueryPayload, load_batch, payload_into_subtree, validate_payload};
pub use service::{
    CommandService, QueryService, SUMMARY_PLACEHOLDER, SummaryService, Unconfigured,
    summary_or_placeholder,
};

#[cfg(test)]
pub(crate) use graph::tests::sample_map;
