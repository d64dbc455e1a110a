//! Expected cost and hat-cost for the binary treatment decision.
//!
//! Both quantities are affine in the infestation probability `p`. They are
//! evaluated with plain IEEE-754 arithmetic and extend algebraically to `p`
//! outside [0, 1], which calibrated probabilities may be.

use pw_config::CostParameters;
use pw_math::Affine;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Binary treatment choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Treatment {
    NoTreatment = 0,
    Treat = 1,
}

impl Treatment {
    pub const ALL: [Treatment; 2] = [Treatment::NoTreatment, Treatment::Treat];

    pub fn is_treat(self) -> bool {
        self == Treatment::Treat
    }
}

impl From<bool> for Treatment {
    fn from(treat: bool) -> Self {
        if treat {
            Treatment::Treat
        } else {
            Treatment::NoTreatment
        }
    }
}

/// `expected_cost(p, treat)` as a line in `p`.
pub fn cost_line(treat: Treatment, params: &CostParameters) -> Affine {
    match treat {
        Treatment::Treat => Affine::new(params.loss_given_treatment(), params.treatment_cost()),
        Treatment::NoTreatment => Affine::new(params.loss_given_no_treatment(), 0.0),
    }
}

/// `expected_hat_cost(p, treat)` as a line in `p`.
pub fn hat_cost_line(treat: Treatment, params: &CostParameters) -> Affine {
    let line = cost_line(treat, params);
    Affine::new(line.slope - params.loss_given_no_treatment(), line.intercept)
}

/// Expected loss plus the cost of treating, if treated.
pub fn expected_cost(p: f64, treat: Treatment, params: &CostParameters) -> f64 {
    let (loss, treatment) = match treat {
        Treatment::Treat => (params.loss_given_treatment(), params.treatment_cost()),
        Treatment::NoTreatment => (params.loss_given_no_treatment(), 0.0),
    };
    p * loss + treatment
}

/// Expected cost relative to the untreated expected loss.
///
/// Zero for [`Treatment::NoTreatment`] at every `p`.
pub fn expected_hat_cost(p: f64, treat: Treatment, params: &CostParameters) -> f64 {
    expected_cost(p, treat, params) - p * params.loss_given_no_treatment()
}
