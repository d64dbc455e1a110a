//! Fuzz target for the decision core with arbitrary cost parameters.

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use pw_config::CostParameters;
use pw_core::decision::{evppi, recommend, utilities};

#[derive(Debug, Arbitrary)]
struct Input {
    loss_given_treatment: f64,
    loss_given_no_treatment: f64,
    treatment_application_cost: f64,
    monitoring_cost: f64,
    probability: f64,
}

fuzz_target!(|input: Input| {
    let Ok(params) = CostParameters::new(
        input.loss_given_treatment,
        input.loss_given_no_treatment,
        input.treatment_application_cost,
        input.monitoring_cost,
    ) else {
        return;
    };
    let p = input.probability;
    let u = utilities(p, &params);
    assert_eq!(u[0], 0.0);
    let _ = recommend(p, &params);

    if (0.0..=1.0).contains(&p) {
        let scale = 1.0 + params.loss_given_no_treatment() + params.treatment_cost();
        let value = evppi(p, &params);
        if scale.is_finite() && value.is_finite() {
            assert!(value >= -1e-9 * scale);
        }
    }
});
