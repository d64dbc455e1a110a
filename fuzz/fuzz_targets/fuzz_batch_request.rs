//! Fuzz target for batch request parsing and evaluation.
//!
//! Evaluation of any parsed request must never panic, and every cell must end
//! up in exactly one of results or failures.

#![no_main]

use libfuzzer_sys::fuzz_target;
use pw_config::CostParameters;
use pw_core::batch::{evaluate_batch, BatchOptions, BatchRequest};

fuzz_target!(|data: &[u8]| {
    let Ok(request) = serde_json::from_slice::<BatchRequest>(data) else {
        return;
    };
    if request.cells.len() > 4096 {
        return;
    }
    let options = BatchOptions::default().with_max_workers(2);
    if let Ok(report) = evaluate_batch(&request, &CostParameters::default(), &options) {
        assert_eq!(
            report.results.len() + report.failures.len(),
            request.cells.len()
        );
        let _ = serde_json::to_string(&report);
    }
});
