//! Planning-side estimate of how long a conversion test must run.

use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, Result};

/// A full weekly cycle, whatever the traffic.
pub const MINIMUM_DURATION_DAYS: u64 = 7;

/// Beyond this the estimate is meaningless for planning.
const MAX_SAMPLE_PER_GROUP: f64 = 1e15;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DurationParams {
    /// Total daily audience of the tested page.
    pub audience_per_day: f64,
    pub conversions_per_day: f64,
    /// Relative minimum detectable effect (0.05 = +5%).
    pub mde: f64,
    /// Share of the audience sent into the test, 0–1.
    pub traffic_exposed: f64,
    #[serde(default = "default_alpha")]
    pub alpha: f64,
    #[serde(default = "default_power")]
    pub power: f64,
}

fn default_alpha() -> f64 {
    0.05
}

fn default_power() -> f64 {
    0.8
}

impl DurationParams {
    pub fn new(audience_per_day: f64, conversions_per_day: f64, mde: f64, traffic_exposed: f64) -> Self {
        Self {
            audience_per_day,
            conversions_per_day,
            mde,
            traffic_exposed,
            alpha: default_alpha(),
            power: default_power(),
        }
    }

    fn validate(&self) -> Result<()> {
        let mut errors = Vec::new();
        if !(self.audience_per_day.is_finite() && self.audience_per_day > 0.0) {
            errors.push("Audience per day must be positive".to_string());
        }
        if !(self.conversions_per_day.is_finite() && self.conversions_per_day > 0.0) {
            errors.push("Conversions per day must be positive".to_string());
        } else if self.conversions_per_day >= self.audience_per_day {
            errors.push("Conversions per day must be lower than audience per day".to_string());
        }
        if !(self.mde.is_finite() && self.mde > 0.0) {
            errors.push("Minimum detectable effect must be positive".to_string());
        }
        if !(self.traffic_exposed > 0.0 && self.traffic_exposed <= 1.0) {
            errors.push("Exposed traffic must be in (0, 1]".to_string());
        }
        if !(self.alpha > 0.0 && self.alpha < 1.0) {
            errors.push("Alpha must be in (0, 1)".to_string());
        }
        if !(self.power > 0.0 && self.power < 1.0) {
            errors.push("Power must be in (0, 1)".to_string());
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(AnalysisError::Validation { errors })
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DurationEstimate {
    /// p0.
    pub baseline_rate: f64,
    /// Absolute detectable difference.
    pub delta: f64,
    pub sample_per_group: u64,
    pub total_sample: u64,
    pub duration_days: u64,
}

/// Two-proportion sample size per group and the days needed to collect it.
pub fn estimate_test_duration(params: &DurationParams) -> Result<DurationEstimate> {
    params.validate()?;

    let p1 = params.conversions_per_day / params.audience_per_day;
    let delta = p1 * params.mde;
    let p2 = p1 + delta;
    if p2 >= 1.0 {
        return Err(AnalysisError::Validation {
            errors: vec!["Baseline rate plus effect must stay below 100%".to_string()],
        });
    }

    let z_alpha = critical_value(params.alpha / 2.0);
    let z_power = critical_value(1.0 - params.power);
    let p_bar = (p1 + p2) / 2.0;

    let numerator = z_alpha * (2.0 * p_bar * (1.0 - p_bar)).sqrt()
        + z_power * (p1 * (1.0 - p1) + p2 * (1.0 - p2)).sqrt();
    let per_group = (numerator.powi(2) / delta.powi(2)).ceil();
    if !per_group.is_finite() || per_group > MAX_SAMPLE_PER_GROUP {
        return Err(AnalysisError::Validation {
            errors: vec!["Minimum detectable effect is too small to estimate a sample size".to_string()],
        });
    }
    let per_group = per_group as u64;

    let visitors_per_group_per_day = params.audience_per_day * params.traffic_exposed / 2.0;
    let days = (per_group as f64 / visitors_per_group_per_day).ceil() as u64;

    Ok(DurationEstimate {
        baseline_rate: p1,
        delta,
        sample_per_group: per_group,
        total_sample: per_group.saturating_mul(2),
        duration_days: days.max(MINIMUM_DURATION_DAYS),
    })
}

/// z such that a standard normal exceeds it with probability `upper_tail`.
///
/// Rational approximation from Abramowitz & Stegun 26.2.23, accurate to about
/// 4.5e-4.
fn critical_value(upper_tail: f64) -> f64 {
    const NUM: [f64; 3] = [2.515517, 0.802853, 0.010328];
    const DEN: [f64; 3] = [1.432788, 0.189269, 0.001308];

    if upper_tail <= 0.0 {
        return f64::INFINITY;
    }
    if upper_tail >= 1.0 {
        return f64::NEG_INFINITY;
    }
    if upper_tail > 0.5 {
        return -critical_value(1.0 - upper_tail);
    }

    let t = (-2.0 * upper_tail.ln()).sqrt();
    let num = NUM[0] + t * (NUM[1] + t * NUM[2]);
    let den = 1.0 + t * (DEN[0] + t * (DEN[1] + t * DEN[2]));
    t - num / den
}
