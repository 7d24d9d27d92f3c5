use anyhow::{Context, Result, bail};
use serde::Serialize;

use super::command::run_collaborator;
use super::corpus::{Corpus, Document};
use super::payload::{QueryPayload, parse_query_payload};

pub const SUMMARY_PLACEHOLDER: &str = "Summary unavailable for this document.";

pub trait QueryService: Send + Sync {
    fn search(&self, text: &str, corpus: &Corpus) -> Result<QueryPayload>;
}

pub trait SummaryService: Send + Sync {
    fn summarize(&self, document: &Document) -> Result<String>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct Unconfigured;

impl QueryService for Unconfigured {
    fn search(&self, _text: &str, _corpus: &Corpus) -> Result<QueryPayload> {
        bail!("query service is not configured")
    }
}

impl SummaryService for Unconfigured {
    fn summarize(&self, _document: &Document) -> Result<String> {
        bail!("summary service is not configured")
    }
}

#[derive(Serialize)]
struct SearchRequest<'a> {
    query: &'a str,
    corpus: &'a Corpus,
}

#[derive(Serialize)]
struct SummaryRequest<'a> {
    document: &'a Document,
}

#[derive(Clone, Debug)]
pub struct CommandService {
    program: String,
    args: Vec<String>,
}

impl CommandService {
    pub fn from_command_line(command_line: &str) -> Option<Self> {
        let mut words = command_line.split_whitespace().map(str::to_owned);
        let program = words.next()?;
        Some(Self {
            program,
            args: words.collect(),
        })
    }
}

impl QueryService for CommandService {
    fn search(&self, text: &str, corpus: &Corpus) -> Result<QueryPayload> {
        let request = serde_json::to_string(&SearchRequest { query: text, corpus })
            .context("failed to encode search request")?;
        let raw = run_collaborator(&self.program, &self.args, &request)?;
        parse_query_payload(&raw)
    }
}

impl SummaryService for CommandService {
    fn summarize(&self, document: &Document) -> Result<String> {
        let request = serde_json::to_string(&SummaryRequest { document })
            .context("failed to encode summary request")?;
        let raw = run_collaborator(&self.program, &self.args, &request)?;
        let summary = raw.trim();
        if summary.is_empty() {
            bail!("summary service returned an empty summary for {}", document.id);
        }
        Ok(summary.to_owned())
    }
}

pub fn summary_or_placeholder(service: &dyn SummaryService, document: &Document) -> String {
    match service.summarize(document) {
        Ok(summary) => summary,
        Err(error) => {
            tracing::warn!(document = %document.id, "summary failed: {error:#}");
            SUMMARY_PLACEHOLDER.to_owned()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_line_splits_program_and_args() {
        let service = CommandService::from_command_line("python3 ask.py --fast");
        let service = service.expect("non-empty command line");
        assert_eq!(service.program, "python3");
        assert_eq!(service.args, ["ask.py", "--fast"]);
        assert!(CommandService::from_command_line("   ").is_none());
    }

    #[test]
    fn failing_summary_yields_placeholder() {
        let document = Document {
            id: "d".into(),
            title: "D".into(),
            tags: Vec::new(),
            content: String::new(),
            modified: chrono::Utc::now(),
        };
        assert_eq!(summary_or_placeholder(&Unconfigured, &document), SUMMARY_PLACEHOLDER);
    }

    #[test]
    fn missing_program_is_an_error_not_a_panic() {
        let service = CommandService::from_command_line("mindgrove-definitely-missing-binary")
            .expect("non-empty command line");
        assert!(service.search("roots", &Corpus::default()).is_err());
    }
}
