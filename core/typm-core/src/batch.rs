//! Batch scheduling (made by FontLab https://www.fontlab.com/)
//!
//! Pure partitioning, no I/O. Batches bound per-document size so one
//! rendering pass never exceeds the engine's memory/time envelope.

use crate::catalog::{primary_family, FontDescriptor};

/// Split `items` into ordered windows of at most `max_batch` elements.
/// Stable: same input and size always yield the same partition, and
/// concatenating the windows reproduces the input exactly. The final
/// window may be smaller. A `max_batch` of zero is treated as one.
pub fn partition<T: Clone>(items: &[T], max_batch: usize) -> Vec<Vec<T>> {
    let size = max_batch.max(1);
    items.chunks(size).map(|chunk| chunk.to_vec()).collect()
}

/// Split fonts for scale measurement: fonts whose primary family equals
/// the baseline's are trivially scale 1.0 by identity and skip rendering
/// entirely; the rest are batched for shared documents.
pub fn split_baseline_identity(
    fonts: &[(String, FontDescriptor)],
    baseline: &FontDescriptor,
) -> (Vec<(String, FontDescriptor)>, Vec<(String, FontDescriptor)>) {
    let base_family = primary_family(&baseline.css_family);
    let (trivial, measurable): (Vec<_>, Vec<_>) = fonts
        .iter()
        .cloned()
        .partition(|(_, font)| primary_family(&font.css_family) == base_family);
    (trivial, measurable)
}
