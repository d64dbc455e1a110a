//! Fuzz target for costs.json parsing.
//!
//! Anything that parses must satisfy the cost invariants.

#![no_main]

use libfuzzer_sys::fuzz_target;
use pw_config::CostParameters;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    if let Ok(params) = CostParameters::parse_json(text) {
        assert!(params.loss_given_no_treatment() >= params.loss_given_treatment());
        assert!(params.treatment_cost() >= 0.0);
        assert!(params.treatment_cost() <= params.avoided_loss());
    }
});
