//! Expected value of perfect partial information about pest presence.
//!
//! ```text
//! cost_without_info = min(hat(p, Treat), hat(p, NoTreatment))
//! cost_with_info    = p * hat(1, Treat)
//! evppi             = cost_without_info - cost_with_info
//! ```
//!
//! With validated parameters (`0 <= C <= L_nt - L_t`) this reduces to
//! `C * (1 - p)` when treating is preferred and `p * (L_nt - L_t - C)`
//! otherwise, both non-negative on [0, 1] and zero at either end.

use pw_config::CostParameters;
use pw_math::{is_unit_interval, DEFAULT_TOLERANCE};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::expected_cost::{expected_hat_cost, Treatment};

/// Every intermediate of one EVPPI evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct EvppiBreakdown {
    pub probability: f64,
    pub cost_without_info: f64,
    pub cost_with_info: f64,
    pub evppi: f64,
    /// Branch taken without information. Ties go to no treatment.
    pub branch_without_info: Treatment,
}

/// Compute the EVPPI and its intermediates.
///
/// Never clips. Negative results for `p` outside [0, 1] are returned as-is.
pub fn evaluate_evppi(p: f64, params: &CostParameters) -> EvppiBreakdown {
    let hat_treat = expected_hat_cost(p, Treatment::Treat, params);
    let hat_none = expected_hat_cost(p, Treatment::NoTreatment, params);

    let (cost_without_info, branch_without_info) = if hat_treat < hat_none {
        (hat_treat, Treatment::Treat)
    } else {
        (hat_none, Treatment::NoTreatment)
    };
    let cost_with_info = p * expected_hat_cost(1.0, Treatment::Treat, params);
    let evppi = cost_without_info - cost_with_info;

    // Overflow near f64::MAX can leave a non-finite result; nothing to check then.
    if is_unit_interval(p) && evppi.is_finite() {
        let scale = 1.0 + params.loss_given_no_treatment() + params.treatment_cost();
        debug_assert!(
            evppi >= -DEFAULT_TOLERANCE * scale,
            "evppi {evppi} negative at p = {p}"
        );
    }

    EvppiBreakdown {
        probability: p,
        cost_without_info,
        cost_with_info,
        evppi,
        branch_without_info,
    }
}

/// EVPPI at probability `p`.
pub fn evppi(p: f64, params: &CostParameters) -> f64 {
    evaluate_evppi(p, params).evppi
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        pw_math::approx_eq(a, b, pw_math::DEFAULT_TOLERANCE)
    }

    #[test]
    fn zero_at_certainty() {
        let params = CostParameters::default();
        assert_eq!(evppi(0.0, &params), 0.0);
        assert!(approx(evppi(1.0, &params), 0.0));
    }

    #[test]
    fn default_params_at_ten_percent() {
        let params = CostParameters::default();
        let b = evaluate_evppi(0.1, &params);
        assert!(approx(b.cost_without_info, 55.5 - 86.8));
        assert!(approx(b.cost_with_info, 0.1 * (55.5 - 868.0)));
        assert!(approx(b.evppi, 55.5 * 0.9));
        assert_eq!(b.branch_without_info, Treatment::Treat);
    }

    #[test]
    fn below_treatment_threshold_uses_no_treatment_branch() {
        let params = CostParameters::default();
        // C / (L_nt - L_t) = 55.5 / 868 ~ 0.0639
        let b = evaluate_evppi(0.05, &params);
        assert_eq!(b.branch_without_info, Treatment::NoTreatment);
        assert!(approx(b.evppi, 0.05 * (868.0 - 55.5)));
    }

    #[test]
    fn peak_is_at_treatment_threshold() {
        let params = CostParameters::default();
        let threshold = params.treatment_cost() / params.avoided_loss();
        let peak = evppi(threshold, &params);
        for p in [0.0, 0.03, 0.06, 0.07, 0.2, 0.5, 1.0] {
            assert!(evppi(p, &params) <= peak + 1e-9, "p = {p}");
        }
    }

    #[test]
    fn out_of_range_probability_is_not_clipped() {
        let params = CostParameters::default();
        // Treat branch: C * (1 - p) goes negative above one.
        let b = evaluate_evppi(1.5, &params);
        assert!(approx(b.evppi, 55.5 * (1.0 - 1.5)));
        assert!(b.evppi < 0.0);
    }
}
