//! Character-width measurement (made by FontLab https://www.fontlab.com/)
//!
//! For one font: partition the probe set into batches, present each
//! batch as a fresh document, wait (best effort) for the font, read
//! geometry back, and merge widths in probe order. Each batch is one
//! retried unit of work; a timed-out attempt contributes nothing, so no
//! partial batch ever leaks into the result.

use std::time::Duration;

use indexmap::IndexMap;

use crate::batch::partition;
use crate::catalog::{baseline_descriptor, primary_family, FontDescriptor};
use crate::markup::{self, BatchDocument};
use crate::probe::ProbeSet;
use crate::retry::{run_with_retry, AttemptError, RetryOutcome, RetryPolicy};
use crate::scale::WIDTH_PROBE;
use crate::session::{RenderSession, SessionError};
use crate::store::round2;

/// Tuning knobs for a measurement run. Defaults are the empirically
/// chosen production constants; the rendering engine's sub-pixel
/// behavior varies by runtime, so all of them stay configurable.
#[derive(Debug, Clone)]
pub struct MeasureConfig {
    /// Declared font size for every probe element.
    pub test_size_px: f64,
    /// Maximum probes per character batch document.
    pub batch_size: usize,
    /// Maximum target fonts per shared scale document.
    pub scale_batch_size: usize,
    /// Best-effort wait for the font to become shapeable.
    pub font_load_timeout: Duration,
    /// Wait for structural document readiness.
    pub present_timeout: Duration,
    /// Hard ceiling on one whole batch attempt.
    pub batch_timeout: Duration,
    pub retry: RetryPolicy,
    /// Below this |Δ| against the baseline a measurement is treated as
    /// "the font never loaded", not as a result.
    pub no_signal_epsilon: f64,
    pub baseline: FontDescriptor,
}

impl Default for MeasureConfig {
    fn default() -> Self {
        Self {
            test_size_px: 100.0,
            batch_size: 500,
            scale_batch_size: 10,
            font_load_timeout: Duration::from_secs(10),
            present_timeout: Duration::from_secs(30),
            batch_timeout: Duration::from_secs(45),
            retry: RetryPolicy::default(),
            no_signal_epsilon: 0.1,
            baseline: baseline_descriptor(),
        }
    }
}

/// Outcome of measuring one font's characters. Probes that rendered
/// with no ink are absent from the map. `error` is set only when the
/// whole font produced nothing and the retry budget is gone.
#[derive(Debug, Clone, Default)]
pub struct CharacterMeasurement {
    pub characters: IndexMap<String, f64>,
    pub error: Option<String>,
}

/// Measure glyph advance widths for every probe, batch by batch.
pub async fn measure_font_characters<S: RenderSession>(
    session: &mut S,
    key: &str,
    font: &FontDescriptor,
    probes: &ProbeSet,
    config: &MeasureConfig,
) -> CharacterMeasurement {
    let mut measurement = CharacterMeasurement::default();
    if probes.is_empty() {
        return measurement;
    }

    // Measuring the baseline against itself always reads as no-signal.
    let check_signal =
        primary_family(&font.css_family) != primary_family(&config.baseline.css_family);

    let batches = partition(probes.probes(), config.batch_size);
    let total = batches.len();
    let mut batches_ok = 0usize;
    let mut last_error: Option<AttemptError> = None;
    let mut sess = session;

    for (index, chunk) in batches.iter().enumerate() {
        let doc = markup::character_batch_document(
            font,
            &config.baseline,
            chunk,
            config.test_size_px,
            WIDTH_PROBE,
        );
        let label = format!("{key}: batch {}/{total}", index + 1);

        let (returned, outcome) = run_with_retry(&config.retry, &label, sess, |s, _| {
            let doc = &doc;
            async move {
                let result = attempt_character_batch(&mut *s, font, doc, config, check_signal).await;
                (s, result)
            }
        })
        .await;
        sess = returned;

        match outcome {
            RetryOutcome::Succeeded(widths) => {
                batches_ok += 1;
                for (probe_key, width) in widths {
                    measurement.characters.insert(probe_key, width);
                }
            }
            RetryOutcome::Exhausted {
                attempts,
                last_error: err,
            } => {
                log::warn!("{label}: gave up after {attempts} attempts: {err}");
                last_error = Some(err);
            }
        }
    }

    if batches_ok == 0 {
        // Whole-font fallback: empty map plus a recorded error, so the
        // run keeps going and the artifact is still written.
        measurement.error = Some(match last_error {
            Some(err) => format!("measurement failed after retries: {err}"),
            None => "measurement produced no batches".to_string(),
        });
    }

    measurement
}

async fn attempt_character_batch<S: RenderSession>(
    session: &mut S,
    font: &FontDescriptor,
    doc: &BatchDocument,
    config: &MeasureConfig,
    check_signal: bool,
) -> Result<Vec<(String, f64)>, AttemptError> {
    let work = async {
        session.present(&doc.markup, config.present_timeout).await?;

        let family = primary_family(&font.css_family);
        let ready = session
            .await_font_ready(&family, config.test_size_px, config.font_load_timeout)
            .await?;
        if !ready {
            log::debug!("{family}: not confirmed ready in time, measuring anyway");
        }

        let mut selectors: Vec<String> = doc.probes.iter().map(|(sel, _)| sel.clone()).collect();
        selectors.push(doc.base_sentinel.clone());
        selectors.push(doc.target_sentinel.clone());
        let geometry = session.read_geometry(&selectors).await?;
        Ok::<_, AttemptError>(geometry)
    };

    let geometry = tokio::time::timeout(config.batch_timeout, work)
        .await
        .map_err(|_| AttemptError::Timeout(config.batch_timeout))??;

    if check_signal {
        let base = geometry
            .get(&doc.base_sentinel)
            .ok_or_else(|| SessionError::ElementNotFound(doc.base_sentinel.clone()))?;
        let target = geometry
            .get(&doc.target_sentinel)
            .ok_or_else(|| SessionError::ElementNotFound(doc.target_sentinel.clone()))?;
        let delta = (base.width - target.width).abs();
        if delta < config.no_signal_epsilon {
            return Err(AttemptError::NoSignal {
                delta,
                epsilon: config.no_signal_epsilon,
            });
        }
    }

    let mut widths = Vec::with_capacity(doc.probes.len());
    for (selector, probe_key) in &doc.probes {
        if let Some(extent) = geometry.get(selector) {
            if extent.has_ink() {
                widths.push((probe_key.clone(), round2(extent.width)));
            }
        }
    }
    Ok(widths)
}
