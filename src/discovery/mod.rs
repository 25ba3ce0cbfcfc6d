//! Selector Discovery Protocol
//!
//! Turns an unknown page into a validated [`SelectorMap`]:
//!
//! ```text
//! CheckCache ──hit──▶ ValidateCached ──valid──▶ Accepted (confidence 1.0)
//!     │miss                │invalid
//!     ▼                    ▼
//! AIAttempt × retry budget ──valid──▶ Accepted (persisted)
//!     │budget exhausted         │below usability threshold
//!     ▼                         ▼
//! BestEffort (proven fields)   BestEffort (validated map, not persisted)
//! ```
//!
//! Each attempt serializes the comment-bearing subtree, chunks it to the
//! model's token budget, asks the oracle about every chunk in turn, merges
//! the replies, and validates the merged map against the live document.
//! Fields that matched are carried into every later attempt, so proven
//! selectors are never lost.

pub mod chunk;
pub mod prompt;
pub mod snapshot;
pub mod validate;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::cache::SettingsStore;
use crate::dom::DomTree;
use crate::error::{OracleError, Result};
use crate::options::DiscoveryOptions;
use crate::oracle::{OracleReply, SelectorOracle};
use crate::result::{report, DiscoveredSelectors, Discovery, Progress, SelectorSource, Stage};
use crate::selector::SelectorMap;
use crate::site::SiteIdentity;

use self::prompt::{build_prompt, PromptContext};
use self::validate::validate;

/// Confidence multiplier applied to best-effort results.
const BEST_EFFORT_PENALTY: f64 = 0.5;

/// Feedback sent after an attempt in which no chunk produced a usable reply.
const UNUSABLE_REPLY_FEEDBACK: &str =
    "the reply could not be read as the requested JSON object; answer with JSON only";

/// Drives discovery against one settings store and one oracle.
pub struct SelectorDiscovery<'a> {
    store: &'a dyn SettingsStore,
    oracle: &'a dyn SelectorOracle,
    options: Option<DiscoveryOptions>,
}

/// Merged oracle output for one attempt.
#[derive(Debug, Default)]
struct AttemptReply {
    selectors: SelectorMap,
    confidence: f64,
    structure: Option<String>,
}

impl<'a> SelectorDiscovery<'a> {
    /// Discovery configured from the stored settings document.
    #[must_use]
    pub fn new(store: &'a dyn SettingsStore, oracle: &'a dyn SelectorOracle) -> Self {
        Self {
            store,
            oracle,
            options: None,
        }
    }

    /// Use `options` instead of the configuration held by the store.
    #[must_use]
    pub fn with_options(mut self, options: DiscoveryOptions) -> Self {
        self.options = Some(options);
        self
    }

    /// Run the protocol for `site` against the live document `dom`.
    ///
    /// # Errors
    ///
    /// Only settings-store failures propagate. Oracle failures consume
    /// retries; running out of retries yields [`Discovery::BestEffort`].
    pub async fn run<D: DomTree>(
        &self,
        dom: &D,
        site: &SiteIdentity,
        progress: Progress<'_>,
    ) -> Result<Discovery> {
        report(progress, Stage::CheckingCache, 0);
        let settings = self.store.load().await?;
        let options = self
            .options
            .clone()
            .unwrap_or_else(|| DiscoveryOptions::from_settings(&settings));
        let root = dom.root();

        let mut proven = SelectorMap::default();
        if let Some(entry) = settings.lookup(site) {
            report(progress, Stage::ValidatingCached, 0);
            let check = validate(dom, &root, &entry.selectors);
            if check.is_valid() {
                info!(site = %site, uses = entry.success_count, "discovery: cached selectors validated");
                let selectors = entry.selectors.clone();
                self.touch(site).await?;
                return Ok(Discovery::Accepted(DiscoveredSelectors {
                    selectors,
                    confidence: 1.0,
                    structure: None,
                    source: SelectorSource::Cache,
                }));
            }
            let failed: Vec<&str> = check.failed().iter().map(|f| f.as_str()).collect();
            info!(site = %site, ?failed, "discovery: cached selectors no longer validate");
            proven = check.successful();
        } else {
            debug!(site = %site, "discovery: no cached selectors");
        }

        let mut feedback: Option<String> = None;
        let mut best_confidence: f64 = 0.0;
        let mut structure: Option<String> = None;

        for attempt in 1..=options.retry_budget {
            let Some(reply) = self
                .attempt(dom, attempt, &proven, feedback.as_deref(), &options, progress)
                .await
            else {
                warn!(site = %site, attempt, "discovery: attempt produced no usable reply");
                feedback = Some(UNUSABLE_REPLY_FEEDBACK.to_string());
                continue;
            };

            let mut candidate = reply.selectors;
            candidate.overlay(&proven);
            best_confidence = best_confidence.max(reply.confidence);
            if reply.structure.is_some() {
                structure = reply.structure;
            }

            report(progress, Stage::Validating { attempt }, proven.present().count());
            let check = validate(dom, &root, &candidate);
            proven.merge_from(&check.successful(), &[]);

            if check.is_valid() {
                let confidence = reply.confidence;
                if confidence < options.usability_threshold {
                    warn!(
                        site = %site,
                        attempt,
                        confidence,
                        threshold = options.usability_threshold,
                        "discovery: selectors validated below the usability threshold"
                    );
                    return Ok(Discovery::BestEffort(DiscoveredSelectors {
                        selectors: candidate,
                        confidence,
                        structure,
                        source: SelectorSource::Oracle,
                    }));
                }
                info!(site = %site, attempt, confidence, "discovery: selectors accepted");
                self.persist(site, &candidate).await?;
                return Ok(Discovery::Accepted(DiscoveredSelectors {
                    selectors: candidate,
                    confidence,
                    structure,
                    source: SelectorSource::Oracle,
                }));
            }

            feedback = check.feedback();
            info!(
                site = %site,
                attempt,
                proven = proven.present().count(),
                feedback = feedback.as_deref().unwrap_or_default(),
                "discovery: attempt failed validation"
            );
        }

        let confidence = best_confidence.min(options.usability_threshold) * BEST_EFFORT_PENALTY;
        warn!(
            site = %site,
            retries = options.retry_budget,
            proven = proven.present().count(),
            confidence,
            "discovery: retry budget exhausted, returning best effort"
        );
        Ok(Discovery::BestEffort(DiscoveredSelectors {
            selectors: proven,
            confidence,
            structure,
            source: SelectorSource::Oracle,
        }))
    }

    /// One oracle round over every snapshot chunk. `None` when no chunk
    /// produced a usable reply.
    async fn attempt<D: DomTree>(
        &self,
        dom: &D,
        attempt: u32,
        proven: &SelectorMap,
        feedback: Option<&str>,
        options: &DiscoveryOptions,
        progress: Progress<'_>,
    ) -> Option<AttemptReply> {
        let scope = snapshot::snapshot_root(dom, proven);
        let lines = snapshot::serialize(dom, &scope, options.dom_analysis_depth);
        let mut chunks = chunk::chunk_lines(&lines, options.chunk_token_budget());
        if chunks.is_empty() {
            chunks.push(Vec::new());
        }
        if chunks.len() > options.max_chunks {
            warn!(
                attempt,
                chunks = chunks.len(),
                kept = options.max_chunks,
                "discovery: snapshot too large, dropping trailing chunks"
            );
            chunks.truncate(options.max_chunks.max(1));
        }

        let mut merged: Option<AttemptReply> = None;
        let total = chunks.len();
        for (index, lines) in chunks.iter().enumerate() {
            report(
                progress,
                Stage::QueryingOracle {
                    attempt,
                    chunk: index,
                    chunks: total,
                },
                proven.present().count(),
            );
            let prompt = build_prompt(
                lines,
                PromptContext {
                    hints: proven,
                    feedback,
                    chunk_index: index,
                    chunk_count: total,
                },
            );

            let reply = match self.ask(&prompt, options).await {
                Ok(reply) => reply,
                Err(e) => {
                    warn!(attempt, chunk = index, error = %e, "discovery: oracle call failed");
                    continue;
                }
            };
            debug!(
                attempt,
                chunk = index,
                fields = reply.selectors.present().count(),
                confidence = reply.confidence,
                "discovery: oracle replied"
            );

            match merged.as_mut() {
                None => {
                    merged = Some(AttemptReply {
                        selectors: reply.selectors,
                        confidence: reply.confidence,
                        structure: reply.structure,
                    });
                }
                Some(acc) => {
                    acc.selectors.merge_from(&reply.selectors, &options.overwritable_fields);
                    acc.confidence = acc.confidence.max(reply.confidence);
                    if reply.structure.is_some() {
                        acc.structure = reply.structure;
                    }
                }
            }
        }
        merged
    }

    async fn ask(&self, prompt: &str, options: &DiscoveryOptions) -> std::result::Result<OracleReply, OracleError> {
        let text = tokio::time::timeout(options.oracle_timeout, self.oracle.complete(prompt))
            .await
            .map_err(|_| OracleError::Timeout(options.oracle_timeout.as_millis() as u64))??;
        OracleReply::parse(&text)
    }

    /// Re-read the settings and upsert, so other writes since the initial
    /// load are kept.
    async fn persist(&self, site: &SiteIdentity, selectors: &SelectorMap) -> Result<()> {
        let mut settings = self.store.load().await?;
        settings.upsert(site, selectors.normalized(), Utc::now());
        self.store.save(&settings).await
    }

    async fn touch(&self, site: &SiteIdentity) -> Result<()> {
        let mut settings = self.store.load().await?;
        if settings.touch(site, Utc::now()) {
            self.store.save(&settings).await?;
        }
        Ok(())
    }
}
