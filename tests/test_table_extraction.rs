//! Integration tests for the table extraction service.
//!
//! Covers the fallback chain, confidence short-circuiting, and per-table
//! validation through the public `extract_tables` entry point.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tablesift::config::ExtractionConfig;
use tablesift::document::DocumentId;
use tablesift::elements::{ParsedContent, ParsedPage, TableCellContent, TableRegionContent, TextContent};
use tablesift::geometry::Rect;
use tablesift::tables::{
    AttemptOutcome, Cell, Detection, DetectionMethod, DetectionRequest, EmbeddedLayoutModel,
    ExtractorRegistry, Table, TableExtractionService, TableExtractor, TableRegion,
    UnavailableLayoutModel, ValidationError,
};
use tablesift::Error;

// =============================================================================
// TEST EXTRACTORS
// =============================================================================

/// Returns a fixed set of tables and counts how often it is called.
struct FixedExtractor {
    method: DetectionMethod,
    shape: Vec<(usize, usize)>,
    confidence: Option<f32>,
    calls: Arc<AtomicUsize>,
}

impl FixedExtractor {
    fn new(method: DetectionMethod, shape: Vec<(usize, usize)>, confidence: Option<f32>) -> Self {
        Self {
            method,
            shape,
            confidence,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }
}

#[async_trait]
impl TableExtractor for FixedExtractor {
    async fn detect(&self, request: &DetectionRequest<'_>) -> tablesift::Result<Detection> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let tables = self
            .shape
            .iter()
            .enumerate()
            .map(|(i, &(rows, cols))| grid_table(request.document_id, self.method, i, rows, cols))
            .collect();
        let detection = Detection::new(tables);
        Ok(match self.confidence {
            Some(c) => detection.with_confidence(c),
            None => detection,
        })
    }

    fn method(&self) -> DetectionMethod {
        self.method
    }

    fn name(&self) -> &'static str {
        "fixed"
    }
}

/// Fails with a non-recoverable error.
struct BrokenExtractor;

#[async_trait]
impl TableExtractor for BrokenExtractor {
    async fn detect(&self, _request: &DetectionRequest<'_>) -> tablesift::Result<Detection> {
        Err(Error::extraction(DetectionMethod::AiDriven, "corrupt model output"))
    }

    fn method(&self) -> DetectionMethod {
        DetectionMethod::AiDriven
    }

    fn name(&self) -> &'static str {
        "broken"
    }
}

// =============================================================================
// FIXTURES
// =============================================================================

fn grid_table(
    document_id: &DocumentId,
    method: DetectionMethod,
    index: usize,
    rows: usize,
    cols: usize,
) -> Table {
    let cells = (0..rows)
        .flat_map(|r| (0..cols).map(move |c| Cell::new(r, c, format!("r{}c{}", r, c))))
        .collect();
    Table::from_cells(
        Table::make_id(document_id, 0, index),
        document_id.clone(),
        TableRegion {
            page: 0,
            bbox: Rect::new(50.0, 50.0 + index as f32 * 200.0, 300.0, 100.0),
        },
        method,
        cells,
    )
}

/// A page with a clean 3x3 text grid the rule-based extractor can find.
fn grid_page() -> ParsedPage {
    let mut page = ParsedPage::new(0, 612.0, 792.0);
    for (r, y) in [100.0f32, 120.0, 140.0].into_iter().enumerate() {
        for (c, x) in [50.0f32, 150.0, 250.0].into_iter().enumerate() {
            let bbox = Rect::from_points(x, y, x + 60.0, y + 12.0);
            page = page.with_text(TextContent::new(format!("{}-{}", r, c), bbox));
        }
    }
    page
}

fn service_with(registry: ExtractorRegistry) -> TableExtractionService {
    TableExtractionService::new(registry, ExtractionConfig::default())
}

// =============================================================================
// FALLBACK
// =============================================================================

mod fallback_tests {
    use super::*;

    #[tokio::test]
    async fn test_unavailable_model_falls_back_to_rule_based() {
        let config = ExtractionConfig::default();
        let registry = ExtractorRegistry::with_defaults(
            &config,
            Some(Arc::new(UnavailableLayoutModel::new("CUDA kernel failed to load"))),
        );
        let service = TableExtractionService::new(registry, config);
        let content = ParsedContent::new(vec![grid_page()]);

        let result = service
            .extract_tables(
                &DocumentId::from("doc"),
                &content,
                Some(DetectionMethod::AiDriven),
                None,
            )
            .await
            .unwrap();

        assert_eq!(result.method(), Some(DetectionMethod::RuleBased));
        assert_eq!(result.tables().len(), 1);
        assert!(matches!(
            result.attempts()[0].outcome,
            AttemptOutcome::Skipped { .. }
        ));
        assert_eq!(result.attempts()[0].method, DetectionMethod::AiDriven);
    }

    #[tokio::test]
    async fn test_unregistered_preferred_method_falls_back() {
        let service = service_with(ExtractorRegistry::with_defaults(
            &ExtractionConfig::default(),
            None,
        ));
        let content = ParsedContent::new(vec![grid_page()]);

        let result = service
            .extract_tables(&DocumentId::from("doc"), &content, Some(DetectionMethod::Hybrid), None)
            .await
            .unwrap();

        assert_eq!(result.method(), Some(DetectionMethod::RuleBased));
        assert_eq!(result.attempts().len(), 2);
    }

    #[tokio::test]
    async fn test_fatal_error_is_not_masked_by_fallback() {
        let mut registry = ExtractorRegistry::with_defaults(&ExtractionConfig::default(), None);
        registry.register(DetectionMethod::AiDriven, Arc::new(BrokenExtractor));
        let service = service_with(registry);

        let err = service
            .extract_tables(
                &DocumentId::from("doc"),
                &ParsedContent::new(vec![grid_page()]),
                Some(DetectionMethod::AiDriven),
                None,
            )
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Extraction { .. }));
        assert!(!err.is_recoverable());
    }

    #[tokio::test]
    async fn test_unbounded_model_span_is_an_error() {
        let page = grid_page().with_element(tablesift::elements::LayoutElement::Table(
            TableRegionContent::new(Rect::new(50.0, 400.0, 200.0, 40.0))
                .with_cell(TableCellContent::new(0, 0, "a").with_span(usize::MAX, 1))
                .with_confidence(0.95),
        ));
        let service = service_with(ExtractorRegistry::with_defaults(
            &ExtractionConfig::default(),
            Some(Arc::new(EmbeddedLayoutModel)),
        ));

        for method in [DetectionMethod::AiDriven, DetectionMethod::Hybrid] {
            let err = service
                .extract_tables(
                    &DocumentId::from("doc"),
                    &ParsedContent::new(vec![page.clone()]),
                    Some(method),
                    None,
                )
                .await
                .unwrap_err();
            assert!(matches!(
                err,
                Error::Extraction {
                    method: DetectionMethod::AiDriven,
                    ..
                }
            ));
        }
    }

    #[tokio::test]
    async fn test_only_candidate_unknown_surfaces_error() {
        let service = service_with(ExtractorRegistry::new());
        let err = service
            .extract_tables(&DocumentId::from("doc"), &ParsedContent::default(), None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::UnknownMethod(DetectionMethod::RuleBased)));
    }
}

// =============================================================================
// CONFIDENCE THRESHOLD
// =============================================================================

mod threshold_tests {
    use super::*;

    #[tokio::test]
    async fn test_confident_first_method_short_circuits() {
        let first = FixedExtractor::new(DetectionMethod::AiDriven, vec![(2, 2)], Some(0.9));
        let second = FixedExtractor::new(DetectionMethod::RuleBased, vec![(3, 3)], Some(1.0));
        let first_calls = Arc::clone(&first.calls);
        let second_calls = Arc::clone(&second.calls);

        let mut registry = ExtractorRegistry::new();
        registry.register(DetectionMethod::AiDriven, Arc::new(first));
        registry.register(DetectionMethod::RuleBased, Arc::new(second));
        let service = service_with(registry);

        let result = service
            .extract_tables(
                &DocumentId::from("doc"),
                &ParsedContent::default(),
                Some(DetectionMethod::AiDriven),
                None,
            )
            .await
            .unwrap();

        assert_eq!(result.method(), Some(DetectionMethod::AiDriven));
        assert_eq!(result.confidence(), 0.9);
        assert_eq!(first_calls.load(Ordering::SeqCst), 1);
        assert_eq!(second_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_low_confidence_tries_next_method() {
        let first = FixedExtractor::new(DetectionMethod::AiDriven, vec![(2, 2)], Some(0.4));
        let second = FixedExtractor::new(DetectionMethod::RuleBased, vec![(3, 3)], Some(0.8));
        let second_calls = Arc::clone(&second.calls);

        let mut registry = ExtractorRegistry::new();
        registry.register(DetectionMethod::AiDriven, Arc::new(first));
        registry.register(DetectionMethod::RuleBased, Arc::new(second));

        let result = service_with(registry)
            .extract_tables(
                &DocumentId::from("doc"),
                &ParsedContent::default(),
                Some(DetectionMethod::AiDriven),
                None,
            )
            .await
            .unwrap();

        assert_eq!(second_calls.load(Ordering::SeqCst), 1);
        assert_eq!(result.method(), Some(DetectionMethod::RuleBased));
        assert_eq!(result.tables()[0].num_rows, 3);
    }

    #[tokio::test]
    async fn test_best_effort_when_nothing_reaches_threshold() {
        let first = FixedExtractor::new(DetectionMethod::AiDriven, vec![(2, 2)], Some(0.6));
        let second = FixedExtractor::new(DetectionMethod::RuleBased, vec![(2, 3)], Some(0.3));

        let mut registry = ExtractorRegistry::new();
        registry.register(DetectionMethod::AiDriven, Arc::new(first));
        registry.register(DetectionMethod::RuleBased, Arc::new(second));

        let result = service_with(registry)
            .extract_tables(
                &DocumentId::from("doc"),
                &ParsedContent::default(),
                Some(DetectionMethod::AiDriven),
                Some(0.95),
            )
            .await
            .unwrap();

        assert_eq!(result.method(), Some(DetectionMethod::AiDriven));
        assert_eq!(result.confidence(), 0.6);
        assert_eq!(result.attempts().len(), 2);
    }

    #[tokio::test]
    async fn test_candidate_with_tables_beats_empty_one() {
        let first = FixedExtractor::new(DetectionMethod::AiDriven, vec![], Some(0.6));
        let second = FixedExtractor::new(DetectionMethod::RuleBased, vec![(2, 2)], Some(0.3));

        let mut registry = ExtractorRegistry::new();
        registry.register(DetectionMethod::AiDriven, Arc::new(first));
        registry.register(DetectionMethod::RuleBased, Arc::new(second));

        let result = service_with(registry)
            .extract_tables(
                &DocumentId::from("doc"),
                &ParsedContent::default(),
                Some(DetectionMethod::AiDriven),
                None,
            )
            .await
            .unwrap();

        assert_eq!(result.method(), Some(DetectionMethod::RuleBased));
        assert_eq!(result.tables().len(), 1);
    }

    #[tokio::test]
    async fn test_confidence_derived_from_tables_when_not_reported() {
        let extractor = FixedExtractor::new(DetectionMethod::RuleBased, vec![(2, 2)], None);
        let mut registry = ExtractorRegistry::new();
        registry.register(DetectionMethod::RuleBased, Arc::new(extractor));

        let result = service_with(registry)
            .extract_tables(&DocumentId::from("doc"), &ParsedContent::default(), None, None)
            .await
            .unwrap();

        // Cells default to full confidence.
        assert_eq!(result.confidence(), 1.0);
    }

    #[tokio::test]
    async fn test_threshold_outside_unit_interval_rejected() {
        let service = service_with(ExtractorRegistry::with_defaults(
            &ExtractionConfig::default(),
            None,
        ));
        let err = service
            .extract_tables(&DocumentId::from("doc"), &ParsedContent::default(), None, Some(1.5))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}

// =============================================================================
// VALIDATION THROUGH THE SERVICE
// =============================================================================

mod validation_tests {
    use super::*;

    #[tokio::test]
    async fn test_empty_input_yields_empty_result() {
        let service = service_with(ExtractorRegistry::with_defaults(
            &ExtractionConfig::default(),
            Some(Arc::new(EmbeddedLayoutModel)),
        ));

        for method in [None, Some(DetectionMethod::AiDriven), Some(DetectionMethod::Hybrid)] {
            let result = service
                .extract_tables(&DocumentId::from("empty"), &ParsedContent::default(), method, None)
                .await
                .unwrap();
            assert!(result.is_empty());
            assert!(result.rejected().is_empty());
        }
    }

    #[tokio::test]
    async fn test_one_by_one_grid_discarded_without_failing() {
        let extractor =
            FixedExtractor::new(DetectionMethod::RuleBased, vec![(1, 1), (2, 2)], Some(0.9));
        let mut registry = ExtractorRegistry::new();
        registry.register(DetectionMethod::RuleBased, Arc::new(extractor));

        let result = service_with(registry)
            .extract_tables(&DocumentId::from("doc"), &ParsedContent::default(), None, None)
            .await
            .unwrap();

        assert_eq!(result.tables().len(), 1);
        assert_eq!(result.tables()[0].num_rows, 2);
        assert_eq!(result.rejected().len(), 1);
        assert!(matches!(
            result.rejected()[0].reason,
            ValidationError::TooSmall { rows: 1, cols: 1, .. }
        ));
    }

    #[tokio::test]
    async fn test_invalid_model_table_dropped_valid_kept() {
        let page = ParsedPage::new(0, 612.0, 792.0)
            .with_element(tablesift::elements::LayoutElement::Table(
                TableRegionContent::new(Rect::new(50.0, 50.0, 200.0, 40.0))
                    .with_cell(TableCellContent::new(0, 0, "A").with_span(2, 2))
                    .with_cell(TableCellContent::new(1, 1, "clash"))
                    .with_confidence(0.95),
            ))
            .with_element(tablesift::elements::LayoutElement::Table(
                TableRegionContent::new(Rect::new(50.0, 300.0, 200.0, 40.0))
                    .with_cell(TableCellContent::new(0, 0, "k"))
                    .with_cell(TableCellContent::new(0, 1, "v"))
                    .with_cell(TableCellContent::new(1, 0, "x"))
                    .with_cell(TableCellContent::new(1, 1, "1"))
                    .with_confidence(0.95),
            ));
        let content = ParsedContent::new(vec![page]);
        let service = service_with(ExtractorRegistry::with_defaults(
            &ExtractionConfig::default(),
            Some(Arc::new(EmbeddedLayoutModel)),
        ));

        let result = service
            .extract_tables(
                &DocumentId::from("doc"),
                &content,
                Some(DetectionMethod::AiDriven),
                None,
            )
            .await
            .unwrap();

        assert_eq!(result.method(), Some(DetectionMethod::AiDriven));
        assert_eq!(result.tables().len(), 1);
        assert_eq!(result.tables()[0].cell_at(1, 1).unwrap().text, "1");
        assert_eq!(result.rejected().len(), 1);
        assert!(matches!(
            result.rejected()[0].reason,
            ValidationError::Overlap { row: 1, col: 1, claims: 2 }
        ));
    }

    #[tokio::test]
    async fn test_hybrid_ignores_invalid_model_table_over_valid_grid() {
        let first = grid_page().with_element(tablesift::elements::LayoutElement::Table(
            TableRegionContent::new(Rect::from_points(40.0, 90.0, 320.0, 160.0))
                .with_cell(TableCellContent::new(0, 0, "smudge"))
                .with_confidence(0.95),
        ));
        let second = ParsedPage::new(1, 612.0, 792.0).with_element(
            tablesift::elements::LayoutElement::Table(
                TableRegionContent::new(Rect::new(50.0, 50.0, 200.0, 40.0))
                    .with_cell(TableCellContent::new(0, 0, "k"))
                    .with_cell(TableCellContent::new(0, 1, "v"))
                    .with_cell(TableCellContent::new(1, 0, "x"))
                    .with_cell(TableCellContent::new(1, 1, "1"))
                    .with_confidence(0.9),
            ),
        );
        let service = service_with(ExtractorRegistry::with_defaults(
            &ExtractionConfig::default(),
            Some(Arc::new(EmbeddedLayoutModel)),
        ));

        let result = service
            .extract_tables(
                &DocumentId::from("doc"),
                &ParsedContent::new(vec![first, second]),
                Some(DetectionMethod::Hybrid),
                None,
            )
            .await
            .unwrap();

        assert_eq!(result.method(), Some(DetectionMethod::Hybrid));
        let found: Vec<_> = result
            .tables()
            .iter()
            .map(|t| (t.region.page, t.num_rows, t.num_cols, t.detection_method))
            .collect();
        assert_eq!(
            found,
            vec![
                (0, 3, 3, DetectionMethod::RuleBased),
                (1, 2, 2, DetectionMethod::AiDriven),
            ]
        );
        assert_eq!(result.rejected().len(), 1);
        assert!(matches!(
            result.rejected()[0].reason,
            ValidationError::TooSmall { rows: 1, cols: 1, .. }
        ));
    }

    #[tokio::test]
    async fn test_merged_cells_survive_extraction() {
        let page = ParsedPage::new(0, 612.0, 792.0).with_element(
            tablesift::elements::LayoutElement::Table(
                TableRegionContent::new(Rect::new(50.0, 50.0, 300.0, 60.0))
                    .with_cell(TableCellContent::new(0, 0, "Region").with_span(2, 2))
                    .with_cell(TableCellContent::new(0, 2, "Q1"))
                    .with_cell(TableCellContent::new(1, 2, "Q2"))
                    .with_cell(TableCellContent::new(2, 0, "North"))
                    .with_cell(TableCellContent::new(2, 1, "12"))
                    .with_cell(TableCellContent::new(2, 2, "14"))
                    .with_confidence(0.9),
            ),
        );
        let service = service_with(ExtractorRegistry::with_defaults(
            &ExtractionConfig::default(),
            Some(Arc::new(EmbeddedLayoutModel)),
        ));

        let result = service
            .extract_tables(
                &DocumentId::from("doc"),
                &ParsedContent::new(vec![page]),
                Some(DetectionMethod::AiDriven),
                None,
            )
            .await
            .unwrap();

        let table = &result.tables()[0];
        assert_eq!(table.rows().iter().flatten().count(), 9);
        assert_eq!(table.effective_cells().len(), 6);
        for (r, c) in [(0, 0), (0, 1), (1, 0), (1, 1)] {
            assert_eq!(table.cell_at(r, c).unwrap().text, "Region");
        }
    }

    #[tokio::test]
    async fn test_extraction_is_idempotent() {
        let service = service_with(ExtractorRegistry::with_defaults(
            &ExtractionConfig::default(),
            None,
        ));
        let content = ParsedContent::new(vec![grid_page()]);
        let doc = DocumentId::from("doc");

        let first = service.extract_tables(&doc, &content, None, None).await.unwrap();
        let second = service.extract_tables(&doc, &content, None, None).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_tables_belong_to_requested_document() {
        let service = service_with(ExtractorRegistry::with_defaults(
            &ExtractionConfig::default(),
            None,
        ));
        let doc = DocumentId::from("invoice-7");
        let result = service
            .extract_tables(&doc, &ParsedContent::new(vec![grid_page()]), None, None)
            .await
            .unwrap();

        assert_eq!(result.document_id(), &doc);
        assert!(result.tables().iter().all(|t| t.document_id == doc));
        assert!(result.tables().iter().all(|t| t.id.starts_with("invoice-7-")));
    }
}
