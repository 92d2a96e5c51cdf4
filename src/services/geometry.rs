use crate::metrics::BridgeMetrics;
use crate::models::{GeometryBatch, GeometryRecord, HIT_RECT_TABLE, OverlayLayout, Rect};
use crate::services::engine::Engine;
use std::sync::Arc;

/// Resolve every tracked control against a layout, in table order.
///
/// Controls the layout lacks keep their engine code with a zero rectangle.
pub fn resolve(layout: &OverlayLayout) -> GeometryBatch {
    let records = HIT_RECT_TABLE
        .iter()
        .map(|&(id, engine_code)| GeometryRecord {
            engine_code,
            rect: layout.hit_rect(id).unwrap_or(Rect::ZERO),
        })
        .collect();
    GeometryBatch::new(records)
}

/// Sends the overlay's control geometry to the engine after each layout pass.
#[derive(Clone)]
pub struct GeometryReporter {
    engine: Arc<dyn Engine>,
    metrics: Arc<BridgeMetrics>,
}

impl GeometryReporter {
    pub fn new(engine: Arc<dyn Engine>, metrics: Arc<BridgeMetrics>) -> Self {
        Self { engine, metrics }
    }

    /// Resolve and send one full batch; the engine replaces its table wholesale.
    pub fn report(&self, layout: &OverlayLayout) -> GeometryBatch {
        let batch = resolve(layout);
        let absent = batch.records().iter().filter(|r| r.rect.is_zero()).count();
        tracing::debug!(
            "Reporting geometry for {} controls ({} absent)",
            batch.len(),
            absent
        );

        self.engine.report_geometry(&batch.to_flat());
        self.metrics.record_geometry_report();
        batch
    }
}
