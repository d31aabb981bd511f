use std::sync::Arc;

use super::providers::parse_overrides;
use super::{prompts, run_provider, ProviderRegistry};
use crate::clients::{self, ClientConfigSource, ConfigDomain};
use crate::models::{
    AnalysisOutcome, AnalysisResult, Comment, PreviousAnalysis, MAX_DEBATE_SUMMARY_CHARS, MAX_HIGHLIGHTED_COMMENTS,
};
use crate::Error;

pub const ANALYSIS_DISABLED: &str = "Analysis disabled.";
pub const ANALYSIS_FAILED: &str = "Error analyzing with the provider.";

/// Incremental discussion analysis over comment threads
pub struct Analyzer {
    registry: Arc<ProviderRegistry>,
    configs: Arc<dyn ClientConfigSource>,
}

impl Analyzer {
    pub fn new(registry: Arc<ProviderRegistry>, configs: Arc<dyn ClientConfigSource>) -> Self {
        Self { registry, configs }
    }

    /// Analyze `comments` for the article `title`/`summary`, merging into `previous`.
    ///
    /// Never fails: problems come back with `analysis: None` and a reason.
    pub async fn analyze(
        &self,
        client_id: &str,
        title: &str,
        summary: &str,
        comments: &[Comment],
        previous: Option<&PreviousAnalysis>,
    ) -> AnalysisOutcome {
        let config = match clients::resolve(self.configs.as_ref(), client_id, ConfigDomain::Analysis).await {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(client_id = %client_id, error = %e, "Analysis configuration unavailable");
                return AnalysisOutcome::failed(e.to_string());
            }
        };

        if !config.enabled {
            tracing::info!(client_id = %client_id, "Analysis disabled for client");
            return AnalysisOutcome::failed(ANALYSIS_DISABLED);
        }

        let Some(factory) = self.registry.get(&config.provider) else {
            tracing::warn!(client_id = %client_id, provider = %config.provider, "Unsupported analysis provider");
            return AnalysisOutcome::failed(Error::UnsupportedProvider(config.provider).to_string());
        };

        let overrides = parse_overrides(config.config_json.as_ref());
        let prompt = prompts::analysis_prompt(title, summary, comments, previous);

        let raw = match run_provider(factory.as_ref(), config.api_key.as_deref(), &overrides, &prompt).await {
            Ok(raw) => raw,
            Err(e) => {
                tracing::error!(
                    client_id = %client_id,
                    provider = %config.provider,
                    error = %e,
                    "Error analyzing with the provider"
                );
                return AnalysisOutcome::failed(ANALYSIS_FAILED);
            }
        };

        match AnalysisResult::parse(&raw) {
            Ok(mut analysis) => {
                enforce_limits(&mut analysis);
                tracing::debug!(
                    client_id = %client_id,
                    new_comments = comments.len(),
                    highlighted = analysis.highlighted_comments.len(),
                    "Discussion analyzed"
                );
                AnalysisOutcome::success(analysis)
            }
            Err(e) => {
                tracing::warn!(
                    client_id = %client_id,
                    provider = %config.provider,
                    error = %e,
                    "Provider returned an unparseable analysis"
                );
                AnalysisOutcome::failed(ANALYSIS_FAILED)
            }
        }
    }
}

/// Local check of the limits the prompt asks the backend to respect.
/// Only the highlight cap is enforced; the rest is logged.
fn enforce_limits(analysis: &mut AnalysisResult) {
    let highlighted = analysis.highlighted_comments.len();
    if highlighted > MAX_HIGHLIGHTED_COMMENTS {
        tracing::warn!(
            highlighted,
            max = MAX_HIGHLIGHTED_COMMENTS,
            "Backend exceeded highlighted comment cap, truncating"
        );
        analysis.highlighted_comments.truncate(MAX_HIGHLIGHTED_COMMENTS);
    }

    let summary_chars = analysis.debate_summary.chars().count();
    if summary_chars > MAX_DEBATE_SUMMARY_CHARS {
        tracing::warn!(summary_chars, max = MAX_DEBATE_SUMMARY_CHARS, "Debate summary exceeds length cap");
    }

    match analysis.sentiment.total() {
        Some(total) if (total - 100.0).abs() < 0.5 => {}
        Some(total) => tracing::warn!(total, "Sentiment percentages do not sum to 100"),
        None => tracing::warn!(sentiment = ?analysis.sentiment, "Sentiment percentages are not numeric"),
    }
}
