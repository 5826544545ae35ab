use std::path::PathBuf;
use std::sync::Arc;
use std::thread::sleep;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::error::AnalysisError;
use super::llm_client::LLMClient;
use super::normalizer::FieldNormalizer;
use super::prompt::{PromptBuilder, PromptTemplate};
use super::response::{clean_response, recover_json};
use crate::domain::{AnalysisRecord, AnalysisRequest, StandardizedAnalysis};
use crate::store::{ExportWriter, RunState};
use crate::utils::{cost_of_tokens, estimate_tokens};

pub const DEFAULT_PROJECT: &str = "唐宋词花卉意象分析";
pub const DEFAULT_OUTPUT_DIR: &str = "analysis_output";

const COST_REPORT_EVERY: usize = 10;

#[derive(Debug, Clone)]
pub struct RunConfig {
    pub output_dir: PathBuf,
    pub project: String,
    /// Pause between consecutive poems, successful or not.
    pub delay: Duration,
    pub checkpoint_every: usize,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            project: DEFAULT_PROJECT.to_string(),
            delay: Duration::from_secs(1),
            checkpoint_every: 20,
        }
    }
}

impl RunConfig {
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    pub fn with_project(mut self, project: impl Into<String>) -> Self {
        self.project = project.into();
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_checkpoint_every(mut self, every: usize) -> Self {
        self.checkpoint_every = every.max(1);
        self
    }
}

#[derive(Debug, Clone)]
pub struct BatchSummary {
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub elapsed: Duration,
    pub export: Option<PathBuf>,
}

impl BatchSummary {
    pub fn success_rate(&self) -> f64 {
        if self.attempted == 0 {
            0.0
        } else {
            self.succeeded as f64 / self.attempted as f64
        }
    }
}

pub struct PoemAnalyzer<C: LLMClient> {
    llm: Arc<C>,
    prompt_builder: PromptBuilder,
    normalizer: FieldNormalizer<'static>,
    config: RunConfig,
}

impl<C: LLMClient> PoemAnalyzer<C> {
    pub fn new(llm: Arc<C>, template: PromptTemplate) -> Self {
        Self {
            llm,
            prompt_builder: PromptBuilder::new(template),
            normalizer: FieldNormalizer::standard(),
            config: RunConfig::default(),
        }
    }

    pub fn with_config(mut self, config: RunConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_normalizer(mut self, normalizer: FieldNormalizer<'static>) -> Self {
        self.normalizer = normalizer;
        self
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Analyzes one poem. Every failure ends up inside the returned record;
    /// token usage is added to `state`.
    pub fn analyze(&self, request: &AnalysisRequest, state: &mut RunState) -> AnalysisRecord {
        let prompt = self.prompt_builder.build(&request.content);
        debug!(title = %request.title, prompt_chars = prompt.chars().count(), "prompt built");

        let completion = match self.llm.complete(self.prompt_builder.system(), &prompt) {
            Ok(completion) => completion,
            Err(err) => {
                warn!(title = %request.title, author = %request.author, error = %err, "analysis call failed");
                return AnalysisRecord::failure(request, err.to_string());
            }
        };
        state.add_tokens(
            completion
                .total_tokens
                .unwrap_or_else(|| estimate_tokens(&prompt, &completion.text)),
        );

        let Some(text) = clean_response(&completion.text) else {
            let err = AnalysisError::EmptyCompletion;
            warn!(title = %request.title, author = %request.author, error = %err, "analysis call failed");
            return AnalysisRecord::failure(request, err.to_string());
        };

        let analysis = match recover_json(&text) {
            Ok(recovered) => {
                debug!(strategy = ?recovered.strategy, "model output recovered");
                self.normalizer.normalize(&recovered.object)
            }
            Err(err) => {
                warn!(title = %request.title, error = %err, raw = %text, "using default analysis");
                StandardizedAnalysis::default()
            }
        };

        info!(
            title = %request.title,
            author = %request.author,
            date = analysis.date,
            flower = %analysis.flower,
            imagery = %analysis.imagery.join(", "),
            "poem analyzed"
        );
        AnalysisRecord::success(request, analysis, Some(text))
    }

    /// Analyzes `requests` one after another, checkpointing into the output
    /// directory. Only export failures abort the run.
    pub fn run_batch(
        &self,
        requests: &[AnalysisRequest],
        state: &mut RunState,
    ) -> Result<BatchSummary, AnalysisError> {
        let total = requests.len();
        let start = Instant::now();
        let mut succeeded = 0usize;
        let mut export = None;
        let checkpoint_every = self.config.checkpoint_every.max(1);

        info!(total, "batch analysis started");
        for (index, request) in requests.iter().enumerate() {
            let done = index + 1;
            info!(progress = %format!("{done}/{total}"), title = %request.title, author = %request.author);

            let record = self.analyze(request, state);
            if record.is_success() {
                succeeded += 1;
            }
            state.record(record);

            if done % COST_REPORT_EVERY == 0 {
                info!(
                    tokens = state.tokens_used(),
                    cost = cost_of_tokens(state.tokens_used()),
                    "token usage"
                );
            }

            if done % checkpoint_every == 0 {
                export = Some(ExportWriter::save(
                    &self.config.output_dir,
                    &self.config.project,
                    state,
                )?);
                let minutes = start.elapsed().as_secs_f64() / 60.0;
                let per_minute = if minutes > 0.0 { done as f64 / minutes } else { 0.0 };
                info!(done, poems_per_minute = per_minute, "checkpoint saved");
            }

            if done < total && !self.config.delay.is_zero() {
                sleep(self.config.delay);
            }
        }

        if total > 0 {
            export = Some(ExportWriter::save(
                &self.config.output_dir,
                &self.config.project,
                state,
            )?);
        }

        let summary = BatchSummary {
            attempted: total,
            succeeded,
            failed: total - succeeded,
            elapsed: start.elapsed(),
            export,
        };
        info!(
            attempted = summary.attempted,
            succeeded = summary.succeeded,
            failed = summary.failed,
            elapsed_ms = summary.elapsed.as_millis() as u64,
            tokens = state.tokens_used(),
            "batch analysis finished"
        );
        Ok(summary)
    }
}
