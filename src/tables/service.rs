//! Table extraction orchestration.
//!
//! # Algorithm
//!
//! 1. Candidate methods: the preferred method if any, then rule-based
//! 2. Per candidate: resolve and detect. A missing model or unregistered
//!    method moves on to the next candidate; any other failure aborts
//! 3. Validate each returned table, dropping only the ones that break a rule
//! 4. Stop at the first candidate whose confidence reaches the threshold
//! 5. Otherwise return the best candidate seen, preferring ones that kept
//!    at least one table

use serde::{Deserialize, Serialize};

use crate::cancel::CancellationFlag;
use crate::config::ExtractionConfig;
use crate::document::DocumentId;
use crate::elements::ParsedContent;
use crate::error::{Error, Result};
use crate::tables::extractor::DetectionRequest;
use crate::tables::method::DetectionMethod;
use crate::tables::model::Table;
use crate::tables::registry::ExtractorRegistry;
use crate::tables::validation::{RejectedTable, TableValidator, ValidationOutcome};

/// What happened when one candidate method was tried.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AttemptOutcome {
    /// Detection ran and its tables were validated.
    Completed {
        /// Tables that passed validation
        accepted: usize,
        /// Tables dropped by validation
        rejected: usize,
        /// Candidate confidence
        confidence: f32,
    },
    /// The method could not run (model unavailable, not registered).
    Skipped {
        /// Why it was skipped
        reason: String,
    },
}

/// One step of the fallback chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodAttempt {
    /// Method tried
    pub method: DetectionMethod,
    /// Result of the attempt
    #[serde(flatten)]
    pub outcome: AttemptOutcome,
}

/// Tables extracted from one document.
///
/// Immutable once returned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResult {
    document_id: DocumentId,
    tables: Vec<Table>,
    method: Option<DetectionMethod>,
    confidence: f32,
    rejected: Vec<RejectedTable>,
    attempts: Vec<MethodAttempt>,
}

impl ExtractionResult {
    /// A result with no tables.
    pub fn empty(document_id: DocumentId) -> Self {
        Self {
            document_id,
            tables: Vec::new(),
            method: None,
            confidence: 0.0,
            rejected: Vec::new(),
            attempts: Vec::new(),
        }
    }

    /// Owning document.
    pub fn document_id(&self) -> &DocumentId {
        &self.document_id
    }

    /// Accepted tables in page order. Each carries the method that produced it.
    pub fn tables(&self) -> &[Table] {
        &self.tables
    }

    /// Method whose candidate result was returned.
    pub fn method(&self) -> Option<DetectionMethod> {
        self.method
    }

    /// Aggregate confidence of the returned candidate.
    pub fn confidence(&self) -> f32 {
        self.confidence
    }

    /// Tables from the returned candidate that failed validation.
    pub fn rejected(&self) -> &[RejectedTable] {
        &self.rejected
    }

    /// Every candidate tried, in order.
    pub fn attempts(&self) -> &[MethodAttempt] {
        &self.attempts
    }

    /// Whether no table was accepted.
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Consume the result, keeping the tables.
    pub fn into_tables(self) -> Vec<Table> {
        self.tables
    }
}

/// Input to [`TableExtractionService::extract`].
#[derive(Debug, Clone)]
pub struct ExtractionRequest<'a> {
    /// Owning document
    pub document_id: DocumentId,
    /// Parsed layout
    pub content: &'a ParsedContent,
    /// Method to try before rule-based
    pub preferred_method: Option<DetectionMethod>,
    /// Overrides the configured threshold
    pub min_confidence: Option<f32>,
    /// Abandons the call when raised
    pub cancel: CancellationFlag,
}

impl<'a> ExtractionRequest<'a> {
    /// Create a request with no preference and a fresh cancellation flag.
    pub fn new(document_id: DocumentId, content: &'a ParsedContent) -> Self {
        Self {
            document_id,
            content,
            preferred_method: None,
            min_confidence: None,
            cancel: CancellationFlag::new(),
        }
    }

    /// Set the preferred method.
    pub fn with_method(mut self, method: Option<DetectionMethod>) -> Self {
        self.preferred_method = method;
        self
    }

    /// Override the confidence threshold.
    pub fn with_min_confidence(mut self, threshold: Option<f32>) -> Self {
        self.min_confidence = threshold;
        self
    }

    /// Use a caller-owned cancellation flag.
    pub fn with_cancel(mut self, cancel: CancellationFlag) -> Self {
        self.cancel = cancel;
        self
    }
}

struct Candidate {
    method: DetectionMethod,
    confidence: f32,
    outcome: ValidationOutcome,
}

impl Candidate {
    /// Ranking for the best-so-far result: kept tables first, then confidence.
    fn beats(&self, other: &Candidate) -> bool {
        let mine = !self.outcome.accepted.is_empty();
        let theirs = !other.outcome.accepted.is_empty();
        mine && !theirs || (mine == theirs && self.confidence > other.confidence)
    }
}

/// Ordered fallback chain: the preferred method, then rule-based.
pub fn candidate_methods(preferred: Option<DetectionMethod>) -> Vec<DetectionMethod> {
    let mut methods = Vec::with_capacity(2);
    if let Some(method) = preferred {
        methods.push(method);
    }
    if !methods.contains(&DetectionMethod::RuleBased) {
        methods.push(DetectionMethod::RuleBased);
    }
    methods
}

/// Picks among registered extractors by confidence, with fallback.
///
/// Holds configuration only, so one service serves concurrent calls for
/// different documents.
#[derive(Debug, Clone)]
pub struct TableExtractionService {
    registry: ExtractorRegistry,
    config: ExtractionConfig,
    validator: TableValidator,
}

impl TableExtractionService {
    /// Create a service over a populated registry.
    pub fn new(registry: ExtractorRegistry, config: ExtractionConfig) -> Self {
        Self {
            validator: TableValidator::from_config(&config),
            registry,
            config,
        }
    }

    /// Registered extractors.
    pub fn registry(&self) -> &ExtractorRegistry {
        &self.registry
    }

    /// Active configuration.
    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    /// Extract tables with an optional preferred method and threshold.
    pub async fn extract_tables(
        &self,
        document_id: &DocumentId,
        content: &ParsedContent,
        preferred_method: Option<DetectionMethod>,
        min_confidence: Option<f32>,
    ) -> Result<ExtractionResult> {
        let request = ExtractionRequest::new(document_id.clone(), content)
            .with_method(preferred_method)
            .with_min_confidence(min_confidence);
        self.extract(request).await
    }

    /// Run the fallback chain for one request.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] when the threshold is outside [0, 1]
    /// - [`Error::Cancelled`] when the request's flag is raised
    /// - Any non-recoverable strategy error, unchanged
    /// - The last recoverable error when no candidate could run at all
    pub async fn extract(&self, request: ExtractionRequest<'_>) -> Result<ExtractionResult> {
        let threshold = request
            .min_confidence
            .unwrap_or(self.config.min_confidence_threshold);
        if !(0.0..=1.0).contains(&threshold) {
            return Err(Error::Config(format!(
                "min_confidence must be within [0, 1], got {}",
                threshold
            )));
        }

        let mut attempts = Vec::new();
        let mut best: Option<Candidate> = None;
        let mut last_recoverable: Option<Error> = None;

        for method in candidate_methods(request.preferred_method) {
            request.cancel.check()?;

            let detection = match self.run(method, &request).await {
                Ok(detection) => detection,
                Err(e) if e.is_recoverable() => {
                    log::warn!(
                        "Method {} unavailable for document {}: {}, falling back",
                        method,
                        request.document_id,
                        e
                    );
                    attempts.push(MethodAttempt {
                        method,
                        outcome: AttemptOutcome::Skipped {
                            reason: e.to_string(),
                        },
                    });
                    last_recoverable = Some(e);
                    continue;
                }
                Err(e) => {
                    log::error!(
                        "Method {} failed for document {}: {}",
                        method,
                        request.document_id,
                        e
                    );
                    return Err(e);
                }
            };

            let mut outcome = self.validator.partition(detection.tables);
            outcome.rejected.extend(detection.rejected);
            let confidence = detection
                .confidence
                .unwrap_or_else(|| self.mean_confidence(&outcome.accepted));

            attempts.push(MethodAttempt {
                method,
                outcome: AttemptOutcome::Completed {
                    accepted: outcome.accepted.len(),
                    rejected: outcome.rejected.len(),
                    confidence,
                },
            });

            let candidate = Candidate {
                method,
                confidence,
                outcome,
            };

            if confidence >= threshold {
                log::info!(
                    "Method {} accepted for document {}: confidence {:.2} >= {:.2}",
                    method,
                    request.document_id,
                    confidence,
                    threshold
                );
                return Ok(finish(request.document_id, candidate, attempts));
            }

            log::info!(
                "Method {} below threshold for document {}: {:.2} < {:.2}",
                method,
                request.document_id,
                confidence,
                threshold
            );
            if best.as_ref().map_or(true, |b| candidate.beats(b)) {
                best = Some(candidate);
            }
        }

        match (best, last_recoverable) {
            (Some(candidate), _) => {
                log::info!(
                    "No method reached {:.2} for document {}, using best: {} ({:.2})",
                    threshold,
                    request.document_id,
                    candidate.method,
                    candidate.confidence
                );
                Ok(finish(request.document_id, candidate, attempts))
            }
            (None, Some(e)) => Err(e),
            (None, None) => Ok(ExtractionResult::empty(request.document_id)),
        }
    }

    async fn run(
        &self,
        method: DetectionMethod,
        request: &ExtractionRequest<'_>,
    ) -> Result<crate::tables::extractor::Detection> {
        let extractor = self.registry.resolve(method)?;
        log::debug!(
            "Trying {} ({}) for document {}",
            method,
            extractor.name(),
            request.document_id
        );
        let detection_request =
            DetectionRequest::new(&request.document_id, request.content, &request.cancel);
        extractor.detect(&detection_request).await
    }

    fn mean_confidence(&self, tables: &[Table]) -> f32 {
        if tables.is_empty() {
            return 0.0;
        }
        let sum: f32 = tables
            .iter()
            .map(|t| t.confidence(self.config.confidence_aggregation))
            .sum();
        sum / tables.len() as f32
    }
}

fn finish(
    document_id: DocumentId,
    candidate: Candidate,
    attempts: Vec<MethodAttempt>,
) -> ExtractionResult {
    ExtractionResult {
        document_id,
        tables: candidate.outcome.accepted,
        method: Some(candidate.method),
        confidence: candidate.confidence,
        rejected: candidate.outcome.rejected,
        attempts,
    }
}
