//! Hybrid table extraction.
//!
//! Runs the model-backed and rule-based extractors on the same content and
//! merges their output. Both sources are validated first, so only
//! structurally sound tables take part in the merge:
//!
//! - **Confident model tables** (at or above the keep threshold) are kept first
//! - **Everything else** is added in descending confidence when it does not
//!   overlap an already kept table on the same page
//! - **Model unavailable**: the rule-based output is returned as is
//!
//! Each table keeps the method that produced it.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::config::{ConfidenceAggregation, ExtractionConfig};
use crate::error::Result;
use crate::tables::ai_driven::AiDrivenExtractor;
use crate::tables::extractor::{Detection, DetectionRequest, TableExtractor};
use crate::tables::method::DetectionMethod;
use crate::tables::model::Table;
use crate::tables::rule_based::RuleBasedExtractor;
use crate::tables::validation::TableValidator;

/// Model tables at or above this confidence win over any overlapping table.
pub const DEFAULT_KEEP_THRESHOLD: f32 = 0.8;

/// Merges model-backed and rule-based detections.
#[derive(Debug, Clone)]
pub struct HybridExtractor {
    ai: AiDrivenExtractor,
    rules: RuleBasedExtractor,
    keep_threshold: f32,
    aggregation: ConfidenceAggregation,
    validator: TableValidator,
}

impl HybridExtractor {
    /// Create a hybrid over the two component extractors.
    pub fn new(
        ai: AiDrivenExtractor,
        rules: RuleBasedExtractor,
        config: &ExtractionConfig,
    ) -> Self {
        Self {
            ai,
            rules,
            keep_threshold: DEFAULT_KEEP_THRESHOLD,
            aggregation: config.confidence_aggregation,
            validator: TableValidator::from_config(config),
        }
    }

    /// Set the confidence at which model tables are kept unconditionally.
    pub fn with_keep_threshold(mut self, threshold: f32) -> Self {
        self.keep_threshold = threshold;
        self
    }

    /// Merge model and rule-based tables.
    pub fn merge(&self, ai: Vec<Table>, rules: Vec<Table>) -> Vec<Table> {
        let score = |t: &Table| t.confidence(self.aggregation);

        let (mut kept, rest): (Vec<Table>, Vec<Table>) =
            ai.into_iter().partition(|t| score(t) >= self.keep_threshold);

        let mut rest: Vec<Table> = rest.into_iter().chain(rules).collect();
        rest.sort_by(|a, b| score(b).total_cmp(&score(a)));

        for table in rest {
            if kept.iter().any(|k| overlaps(k, &table)) {
                log::debug!(
                    "Dropping {} table {}: overlaps a kept table",
                    table.detection_method,
                    table.id
                );
                continue;
            }
            kept.push(table);
        }

        kept.sort_by(|a, b| {
            let (ra, rb) = (&a.region, &b.region);
            ra.page
                .cmp(&rb.page)
                .then(ra.bbox.top().total_cmp(&rb.bbox.top()))
                .then(ra.bbox.left().total_cmp(&rb.bbox.left()))
        });
        renumber(&mut kept);
        kept
    }
}

fn overlaps(a: &Table, b: &Table) -> bool {
    a.region.page == b.region.page && a.region.bbox.intersects(&b.region.bbox)
}

/// Reassign ids in page order so ids from the two sources cannot collide.
fn renumber(tables: &mut [Table]) {
    let mut per_page: HashMap<usize, usize> = HashMap::new();
    for table in tables.iter_mut() {
        let index = per_page.entry(table.region.page).or_insert(0);
        table.id = Table::make_id(&table.document_id, table.region.page, *index);
        *index += 1;
    }
}

#[async_trait]
impl TableExtractor for HybridExtractor {
    async fn detect(&self, request: &DetectionRequest<'_>) -> Result<Detection> {
        let ai = match self.ai.detect(request).await {
            Ok(detection) => detection.tables,
            Err(e) if e.is_recoverable() => {
                log::warn!("Model half of hybrid failed: {}, using rule-based output", e);
                return self.rules.detect(request).await;
            }
            Err(e) => return Err(e),
        };
        let rules = self.rules.detect(request).await?.tables;

        let ai = self.validator.partition(ai);
        let rules = self.validator.partition(rules);
        let ai_count = ai.accepted.len();
        let rule_count = rules.accepted.len();
        let mut rejected = ai.rejected;
        rejected.extend(rules.rejected);

        let merged = self.merge(ai.accepted, rules.accepted);
        log::debug!(
            "Hybrid merge: {} model + {} rule-based -> {} table(s), {} rejected",
            ai_count,
            rule_count,
            merged.len(),
            rejected.len()
        );
        Ok(Detection::new(merged).with_rejected(rejected))
    }

    fn method(&self) -> DetectionMethod {
        DetectionMethod::Hybrid
    }

    fn name(&self) -> &'static str {
        "hybrid"
    }
}
