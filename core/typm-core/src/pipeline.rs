//! Run drivers (made by FontLab https://www.fontlab.com/)
//!
//! Walks the catalog in order and measures every font, optionally across
//! several independent rendering sessions over disjoint contiguous
//! slices. Each session's work is strictly sequential; results merge
//! through the store's single-writer accumulator and are reordered to
//! catalog order, so output is deterministic regardless of engine
//! timing. Measurement failures are contained per unit of work; the
//! run always completes.

use futures::future::join_all;

use crate::catalog::{FontCatalog, FontDescriptor};
use crate::measure::{measure_font_characters, MeasureConfig};
use crate::probe::ProbeSet;
use crate::scale::measure_catalog_scales;
use crate::session::RenderSession;
use crate::store::{FontResult, ResultStore, RunSummary};

/// Measure character widths for every catalog font and persist results
/// as each font completes (per-font mode) or at the end (aggregate).
pub async fn run_character_pipeline<S: RenderSession>(
    mut sessions: Vec<S>,
    catalog: &FontCatalog,
    probes: &ProbeSet,
    config: &MeasureConfig,
    store: &ResultStore,
) -> RunSummary {
    let entries: Vec<(String, FontDescriptor)> = catalog
        .iter()
        .map(|(key, font)| (key.clone(), font.clone()))
        .collect();
    let slices = contiguous_slices(&entries, sessions.len());

    let jobs = sessions
        .iter_mut()
        .zip(slices)
        .map(|(session, slice)| async move {
            for (key, font) in slice {
                let measurement =
                    measure_font_characters(session, &key, &font, probes, config).await;
                let failed = measurement.error.is_some();
                log::info!(
                    "{key}: {} characters{}",
                    measurement.characters.len(),
                    if failed { " (failed)" } else { "" }
                );
                let result = FontResult::from_characters(&key, &font, measurement);
                store.record(&key, result, failed);
            }
            close_session(session).await;
        });
    join_all(jobs).await;

    let keys: Vec<String> = catalog.keys().cloned().collect();
    store.finish(&keys)
}

/// Measure baseline-relative scale for every catalog font. Fallbacks are
/// handled results, not failures.
pub async fn run_scale_pipeline<S: RenderSession>(
    mut sessions: Vec<S>,
    catalog: &FontCatalog,
    config: &MeasureConfig,
    store: &ResultStore,
) -> RunSummary {
    let entries: Vec<(String, FontDescriptor)> = catalog
        .iter()
        .map(|(key, font)| (key.clone(), font.clone()))
        .collect();
    let slices = contiguous_slices(&entries, sessions.len());

    let jobs = sessions
        .iter_mut()
        .zip(slices)
        .map(|(session, slice)| async move {
            let scales = measure_catalog_scales(session, &slice, config).await;
            for (key, font) in &slice {
                if let Some(result) = scales.get(key) {
                    log::info!(
                        "{key}: scale {} x {}{}",
                        result.outcome.width_scale,
                        result.outcome.height_scale,
                        if result.fallback.is_some() {
                            " (fallback)"
                        } else {
                            ""
                        }
                    );
                    let record = FontResult::from_scale(
                        key,
                        font,
                        result.outcome,
                        result.fallback.clone(),
                    );
                    store.record(key, record, false);
                }
            }
            close_session(session).await;
        });
    join_all(jobs).await;

    let keys: Vec<String> = catalog.keys().cloned().collect();
    store.finish(&keys)
}

async fn close_session<S: RenderSession>(session: &mut S) {
    if let Err(err) = session.close().await {
        log::warn!("closing session: {err}");
    }
}

/// Split items into exactly `parts` contiguous, order-preserving slices
/// (trailing slices may be empty).
fn contiguous_slices<T: Clone>(items: &[T], parts: usize) -> Vec<Vec<T>> {
    let parts = parts.max(1);
    let chunk = items.len().div_ceil(parts).max(1);
    let mut slices: Vec<Vec<T>> = items.chunks(chunk).map(|c| c.to_vec()).collect();
    slices.resize(parts, Vec::new());
    slices
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slices_are_contiguous_and_cover_input() {
        let items: Vec<u32> = (0..10).collect();
        let slices = contiguous_slices(&items, 3);

        assert_eq!(slices.len(), 3);
        let flattened: Vec<u32> = slices.into_iter().flatten().collect();
        assert_eq!(flattened, items);
    }

    #[test]
    fn more_parts_than_items_gives_empty_tails() {
        let slices = contiguous_slices(&[1], 4);
        assert_eq!(slices.len(), 4);
        assert_eq!(slices[0], vec![1]);
        assert!(slices[3].is_empty());
    }
}
