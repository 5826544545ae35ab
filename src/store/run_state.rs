use std::collections::HashSet;

use super::persistence::ExportDocument;
use crate::domain::{AnalysisRecord, AnalysisRequest, PoemKey};

/// Mutable state of one sequential run: the ordered result collection and
/// its counters.
#[derive(Debug, Clone, Default)]
pub struct RunState {
    results: Vec<AnalysisRecord>,
    processed: usize,
    tokens_used: u64,
}

impl RunState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a run from a previous export. Error records are dropped so the
    /// poems they belong to are attempted again.
    pub fn resume(document: ExportDocument) -> Self {
        let results: Vec<AnalysisRecord> = document
            .results
            .into_iter()
            .filter(AnalysisRecord::is_success)
            .collect();
        Self {
            processed: document.total_processed.max(results.len()),
            tokens_used: document.metadata.api_tokens_used,
            results,
        }
    }

    pub fn record(&mut self, record: AnalysisRecord) {
        self.processed += 1;
        self.results.push(record);
    }

    pub fn add_tokens(&mut self, tokens: u64) {
        self.tokens_used = self.tokens_used.saturating_add(tokens);
    }

    pub fn results(&self) -> &[AnalysisRecord] {
        &self.results
    }

    /// Poems attempted, including those carried over from resumed runs.
    pub fn processed(&self) -> usize {
        self.processed
    }

    pub fn analyzed(&self) -> usize {
        self.results.iter().filter(|r| r.is_success()).count()
    }

    pub fn tokens_used(&self) -> u64 {
        self.tokens_used
    }

    pub fn analyzed_keys(&self) -> HashSet<PoemKey> {
        self.results
            .iter()
            .filter(|r| r.is_success())
            .map(AnalysisRecord::key)
            .collect()
    }

    /// Keeps only the requests not already analyzed, in their original order.
    pub fn filter_pending(&self, requests: Vec<AnalysisRequest>) -> Vec<AnalysisRequest> {
        let done = self.analyzed_keys();
        requests
            .into_iter()
            .filter(|request| !done.contains(&request.key()))
            .collect()
    }
}
