//! A scripted stand-in for the rendering engine so pipelines can run
//! without a browser. Geometry is derived deterministically from each
//! selector, which is all the measurement engine ever looks at.

use std::time::Duration;

use indexmap::IndexMap;
use typm_core::session::{Extent, RenderSession, SessionError};

pub enum EngineBehavior {
    /// Fonts load: target elements get stable nonzero geometry clearly
    /// distinct from the baseline's.
    Healthy,
    /// The target font never loads; every element mirrors the baseline
    /// geometry exactly.
    NeverLoads,
    /// Presenting any document times out.
    PresentFails,
    /// Geometry reads stall well past any short batch timeout before
    /// answering with healthy geometry.
    GeometryStalls,
}

pub struct FakeSession {
    pub behavior: EngineBehavior,
    pub presents: usize,
    pub closed: bool,
}

impl FakeSession {
    pub fn new(behavior: EngineBehavior) -> Self {
        Self {
            behavior,
            presents: 0,
            closed: false,
        }
    }
}

const BASE_EXTENT: Extent = Extent {
    width: 500.0,
    height: 100.0,
};

fn healthy_extent(selector: &str) -> Extent {
    if selector.contains("base") {
        return BASE_EXTENT;
    }
    if selector.starts_with("#f") {
        // Scale targets: 500/640 and 100/128 both give 0.78125.
        return Extent {
            width: 640.0,
            height: 128.0,
        };
    }
    let mut acc: u32 = 7;
    for byte in selector.bytes() {
        acc = acc.wrapping_mul(31).wrapping_add(u32::from(byte));
    }
    Extent {
        width: 600.0 + f64::from(acc % 300) + f64::from(acc % 97) / 100.0,
        height: 100.0,
    }
}

impl RenderSession for FakeSession {
    async fn present(&mut self, _markup: &str, load_timeout: Duration) -> Result<(), SessionError> {
        self.presents += 1;
        match self.behavior {
            EngineBehavior::PresentFails => Err(SessionError::PresentTimeout(load_timeout)),
            _ => Ok(()),
        }
    }

    async fn read_geometry(
        &mut self,
        selectors: &[String],
    ) -> Result<IndexMap<String, Extent>, SessionError> {
        if matches!(self.behavior, EngineBehavior::GeometryStalls) {
            tokio::time::sleep(Duration::from_millis(250)).await;
        }
        let mut geometry = IndexMap::new();
        for selector in selectors {
            let extent = match self.behavior {
                EngineBehavior::Healthy | EngineBehavior::GeometryStalls => {
                    healthy_extent(selector)
                }
                EngineBehavior::NeverLoads => BASE_EXTENT,
                EngineBehavior::PresentFails => {
                    return Err(SessionError::Engine("no document".into()))
                }
            };
            geometry.insert(selector.clone(), extent);
        }
        Ok(geometry)
    }

    async fn await_font_ready(
        &mut self,
        _family: &str,
        _size_px: f64,
        _max_wait: Duration,
    ) -> Result<bool, SessionError> {
        Ok(matches!(self.behavior, EngineBehavior::Healthy))
    }

    async fn close(&mut self) -> Result<(), SessionError> {
        self.closed = true;
        Ok(())
    }
}

/// A retry/timing setup fast enough for tests.
pub fn fast_config() -> typm_core::measure::MeasureConfig {
    let mut config = typm_core::measure::MeasureConfig::default();
    config.retry.max_attempts = 2;
    config.retry.backoff_unit = Duration::from_millis(1);
    config.batch_timeout = Duration::from_secs(5);
    config
}

pub fn descriptor(family: &str) -> typm_core::catalog::FontDescriptor {
    typm_core::catalog::FontDescriptor {
        import_url: format!(
            "https://fonts.googleapis.com/css2?family={}&display=swap",
            family.replace(' ', "+")
        ),
        css_family: format!("'{family}', sans-serif"),
        display_name: Some(family.to_string()),
    }
}
