//! Scale normalization (made by FontLab https://www.fontlab.com/)
//!
//! A font's apparent size relative to the baseline font at the same
//! declared size: `widthScale = baselineWidth / targetWidth`,
//! `heightScale = baselineHeight / targetHeight`, both measured from
//! fixed probe strings rendered in the same document as the baseline.
//! Ratios must be finite and positive: zero, infinity, and NaN are
//! measurement failures, never values.

use indexmap::IndexMap;

use crate::batch::{partition, split_baseline_identity};
use crate::catalog::{primary_family, FontDescriptor};
use crate::markup::{self, ScaleDocument};
use crate::measure::MeasureConfig;
use crate::retry::{run_with_retry, AttemptError, RetryOutcome};
use crate::session::{Extent, RenderSession, SessionError};
use crate::store::round3;

/// Width-sensitive probe: wide glyphs, repeated.
pub const WIDTH_PROBE: &str = "WWWWWWWWMMMMMMMM";
/// Height-sensitive probe: ascenders, descenders, and tall accents.
pub const HEIGHT_PROBE: &str = "ÁÿjgpqÇ|";

/// Baseline-relative size ratios, rounded to 3 decimal places.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleOutcome {
    pub width_scale: f64,
    pub height_scale: f64,
}

impl ScaleOutcome {
    /// The safe fallback: pretend the font is the same size as the
    /// baseline.
    pub const IDENTITY: ScaleOutcome = ScaleOutcome {
        width_scale: 1.0,
        height_scale: 1.0,
    };
}

/// Terminal per-font scale result. `fallback` records why the identity
/// scale was substituted; a fallback is handled, not a run failure.
#[derive(Debug, Clone)]
pub struct ScaleResult {
    pub outcome: ScaleOutcome,
    pub fallback: Option<String>,
}

/// Measure scale for a list of fonts against the configured baseline.
///
/// Fonts identical to the baseline by family skip rendering entirely.
/// The rest go through a shared multi-font document first (one present
/// per batch); fonts the shared pass could not settle are retried
/// individually under the controller, and exhaustion falls back to the
/// identity scale. Output preserves input order.
pub async fn measure_catalog_scales<S: RenderSession>(
    session: &mut S,
    fonts: &[(String, FontDescriptor)],
    config: &MeasureConfig,
) -> IndexMap<String, ScaleResult> {
    let mut settled: IndexMap<String, ScaleResult> = IndexMap::new();

    let (trivial, measurable) = split_baseline_identity(fonts, &config.baseline);
    for (key, _) in &trivial {
        settled.insert(
            key.clone(),
            ScaleResult {
                outcome: ScaleOutcome::IDENTITY,
                fallback: None,
            },
        );
    }

    let mut pending: Vec<(String, FontDescriptor)> = Vec::new();
    let mut sess = session;

    for chunk in partition(&measurable, config.scale_batch_size) {
        match attempt_scale_batch(&mut *sess, &chunk, config).await {
            Ok(per_font) => {
                for ((key, font), result) in chunk.iter().zip(per_font) {
                    match result {
                        Ok(outcome) => {
                            settled.insert(
                                key.clone(),
                                ScaleResult {
                                    outcome,
                                    fallback: None,
                                },
                            );
                        }
                        Err(err) => {
                            log::debug!("{key}: shared scale pass failed: {err}");
                            pending.push((key.clone(), font.clone()));
                        }
                    }
                }
            }
            Err(err) => {
                log::debug!("shared scale batch failed, retrying fonts individually: {err}");
                pending.extend(chunk.iter().cloned());
            }
        }
    }

    for (key, font) in pending {
        let label = format!("scale {key}");
        let (returned, outcome) = run_with_retry(&config.retry, &label, sess, |s, _| {
            let font = &font;
            let key = key.as_str();
            async move {
                let result = attempt_scale_single(&mut *s, key, font, config).await;
                (s, result)
            }
        })
        .await;
        sess = returned;

        let result = match outcome {
            RetryOutcome::Succeeded(outcome) => ScaleResult {
                outcome,
                fallback: None,
            },
            RetryOutcome::Exhausted {
                attempts,
                last_error,
            } => {
                log::warn!("{label}: falling back to identity scale: {last_error}");
                ScaleResult {
                    outcome: ScaleOutcome::IDENTITY,
                    fallback: Some(format!(
                        "scale fallback after {attempts} attempts: {last_error}"
                    )),
                }
            }
        };
        settled.insert(key.clone(), result);
    }

    // Input order, not settle order.
    let mut ordered = IndexMap::with_capacity(fonts.len());
    for (key, _) in fonts {
        if let Some(result) = settled.shift_remove(key) {
            ordered.insert(key.clone(), result);
        }
    }
    ordered
}

/// One shared pass over a batch of target fonts. The outer error means
/// the whole document failed; inner per-font errors are individual.
async fn attempt_scale_batch<S: RenderSession>(
    session: &mut S,
    targets: &[(String, FontDescriptor)],
    config: &MeasureConfig,
) -> Result<Vec<Result<ScaleOutcome, AttemptError>>, AttemptError> {
    let doc = markup::scale_batch_document(
        targets,
        &config.baseline,
        config.test_size_px,
        WIDTH_PROBE,
        HEIGHT_PROBE,
    );
    let geometry = read_scale_geometry(session, &doc, targets, config).await?;

    let base_w = lookup(&geometry, &doc.base_width)?;
    let base_h = lookup(&geometry, &doc.base_height)?;

    let mut results = Vec::with_capacity(targets.len());
    for (_, w_sel, h_sel) in &doc.fonts {
        let result = (|| {
            let target_w = lookup(&geometry, w_sel)?;
            let target_h = lookup(&geometry, h_sel)?;
            compute_scale(base_w, base_h, target_w, target_h, config.no_signal_epsilon)
        })();
        results.push(result);
    }
    Ok(results)
}

async fn attempt_scale_single<S: RenderSession>(
    session: &mut S,
    key: &str,
    font: &FontDescriptor,
    config: &MeasureConfig,
) -> Result<ScaleOutcome, AttemptError> {
    let targets = vec![(key.to_string(), font.clone())];
    let mut results = attempt_scale_batch(session, &targets, config).await?;
    results
        .pop()
        .unwrap_or_else(|| Err(AttemptError::Degenerate("empty scale batch".into())))
}

async fn read_scale_geometry<S: RenderSession>(
    session: &mut S,
    doc: &ScaleDocument,
    targets: &[(String, FontDescriptor)],
    config: &MeasureConfig,
) -> Result<IndexMap<String, Extent>, AttemptError> {
    let work = async {
        session.present(&doc.markup, config.present_timeout).await?;

        for (_, font) in targets {
            let family = primary_family(&font.css_family);
            let ready = session
                .await_font_ready(&family, config.test_size_px, config.font_load_timeout)
                .await?;
            if !ready {
                log::debug!("{family}: not confirmed ready in time, measuring anyway");
            }
        }

        let mut selectors = vec![doc.base_width.clone(), doc.base_height.clone()];
        for (_, w_sel, h_sel) in &doc.fonts {
            selectors.push(w_sel.clone());
            selectors.push(h_sel.clone());
        }
        session.read_geometry(&selectors).await.map_err(Into::into)
    };

    tokio::time::timeout(config.batch_timeout, work)
        .await
        .map_err(|_| AttemptError::Timeout(config.batch_timeout))?
}

fn lookup(geometry: &IndexMap<String, Extent>, selector: &str) -> Result<Extent, AttemptError> {
    geometry
        .get(selector)
        .copied()
        .ok_or_else(|| SessionError::ElementNotFound(selector.to_string()).into())
}

/// Turn raw extents into a scale outcome, rejecting no-signal and
/// degenerate measurements.
fn compute_scale(
    base_w: Extent,
    base_h: Extent,
    target_w: Extent,
    target_h: Extent,
    epsilon: f64,
) -> Result<ScaleOutcome, AttemptError> {
    let width_delta = (base_w.width - target_w.width).abs();
    let height_delta = (base_h.height - target_h.height).abs();
    if width_delta < epsilon && height_delta < epsilon {
        return Err(AttemptError::NoSignal {
            delta: width_delta.max(height_delta),
            epsilon,
        });
    }

    if target_w.width <= 0.0 || target_h.height <= 0.0 {
        return Err(AttemptError::Degenerate(format!(
            "target rendered without extent: {} x {}",
            target_w.width, target_h.height
        )));
    }

    let width_scale = base_w.width / target_w.width;
    let height_scale = base_h.height / target_h.height;
    if !(width_scale.is_finite() && width_scale > 0.0)
        || !(height_scale.is_finite() && height_scale > 0.0)
    {
        return Err(AttemptError::Degenerate(format!(
            "non-finite or non-positive scale: {width_scale} / {height_scale}"
        )));
    }

    Ok(ScaleOutcome {
        width_scale: round3(width_scale),
        height_scale: round3(height_scale),
    })
}
