//! Probability calibration against a known population prevalence.
//!
//! The raw model surface is rescaled by a single factor so that the mean of a
//! reference sample matches the target prevalence:
//!
//! ```text
//! factor = target_prevalence / mean(reference_sample)
//! ```
//!
//! Calibrated values are never clipped to [0, 1].

use pw_math::stable_mean;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Calibration failures. Any of these aborts the whole batch.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CalibrationError {
    #[error("reference sample is empty")]
    EmptyReferenceSample,

    #[error("reference sample value at index {index} is not finite ({value})")]
    NonFiniteReference { index: usize, value: f64 },

    #[error("reference sample mean must be positive, got {mean}")]
    NonPositiveMean { mean: f64 },

    #[error("target prevalence must be finite and positive, got {value}")]
    InvalidTargetPrevalence { value: f64 },

    #[error("calibration factor {factor} from reference mean {mean} is not finite and positive")]
    DegenerateFactor { factor: f64, mean: f64 },
}

/// Multiplicative correction from raw to calibrated probability.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CalibrationFactor {
    factor: f64,
    reference_mean: f64,
    target_prevalence: f64,
    reference_len: usize,
}

impl CalibrationFactor {
    /// Build the factor from a reference sample.
    ///
    /// The mean uses compensated summation so large surfaces of small
    /// probabilities do not drift.
    pub fn from_reference(
        reference_sample: &[f64],
        target_prevalence: f64,
    ) -> Result<Self, CalibrationError> {
        if !target_prevalence.is_finite() || target_prevalence <= 0.0 {
            return Err(CalibrationError::InvalidTargetPrevalence {
                value: target_prevalence,
            });
        }
        if let Some((index, &value)) = reference_sample
            .iter()
            .enumerate()
            .find(|(_, v)| !v.is_finite())
        {
            return Err(CalibrationError::NonFiniteReference { index, value });
        }
        let reference_mean =
            stable_mean(reference_sample).ok_or(CalibrationError::EmptyReferenceSample)?;
        if reference_mean <= 0.0 {
            return Err(CalibrationError::NonPositiveMean {
                mean: reference_mean,
            });
        }

        let factor = target_prevalence / reference_mean;
        if !factor.is_finite() || factor <= 0.0 {
            // Subnormal means overflow the division; overflowing sums underflow it.
            return Err(CalibrationError::DegenerateFactor {
                factor,
                mean: reference_mean,
            });
        }

        Ok(CalibrationFactor {
            factor,
            reference_mean,
            target_prevalence,
            reference_len: reference_sample.len(),
        })
    }

    pub fn factor(&self) -> f64 {
        self.factor
    }

    pub fn reference_mean(&self) -> f64 {
        self.reference_mean
    }

    pub fn target_prevalence(&self) -> f64 {
        self.target_prevalence
    }

    pub fn reference_len(&self) -> usize {
        self.reference_len
    }

    #[inline]
    pub fn apply(&self, raw: f64) -> f64 {
        raw * self.factor
    }

    #[inline]
    pub fn invert(&self, calibrated: f64) -> f64 {
        calibrated / self.factor
    }

    /// Calibrate every value of a surface.
    pub fn calibrate_surface(&self, raw: &[f64]) -> Vec<f64> {
        raw.iter().map(|&p| self.apply(p)).collect()
    }
}
