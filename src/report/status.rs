use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use utoipa::ToSchema;

/// Attendance status band derived from a percentage.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum StatusBand {
    Good,
    Warning,
    Critical,
    /// No hours recorded yet. Only the module roster reports this.
    Pending,
}

/// Lower bounds (inclusive) of the `good` and `warning` bands.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    pub good: f64,
    pub warning: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            good: 90.0,
            warning: 80.0,
        }
    }
}

impl Thresholds {
    pub fn classify(&self, percentage: f64) -> StatusBand {
        if percentage >= self.good {
            StatusBand::Good
        } else if percentage >= self.warning {
            StatusBand::Warning
        } else {
            StatusBand::Critical
        }
    }
}

/// Chooses the thresholds that apply to a module.
///
/// With `use_module_requirement` off every module uses `defaults`. With it on,
/// the module's `requirement` becomes the `good` bound and `warning` sits
/// `band_width` points below it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdPolicy {
    pub defaults: Thresholds,
    pub use_module_requirement: bool,
    pub band_width: f64,
}

impl Default for ThresholdPolicy {
    fn default() -> Self {
        Self {
            defaults: Thresholds::default(),
            use_module_requirement: false,
            band_width: Self::DEFAULT_BAND_WIDTH,
        }
    }
}

impl ThresholdPolicy {
    pub const DEFAULT_BAND_WIDTH: f64 = 10.0;

    pub fn for_requirement(&self, requirement: Option<f64>) -> Thresholds {
        match requirement {
            Some(req) if self.use_module_requirement && req.is_finite() && req > 0.0 => {
                let good = req.min(100.0);
                Thresholds {
                    good,
                    warning: (good - self.band_width).max(0.0),
                }
            }
            _ => self.defaults,
        }
    }
}
