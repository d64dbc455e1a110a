//! Fuzz target for calibration.json parsing.

#![no_main]

use libfuzzer_sys::fuzz_target;
use pw_config::CalibrationConfig;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    if let Ok(config) = CalibrationConfig::parse_json(text) {
        assert!(config.target_prevalence > 0.0 && config.target_prevalence <= 1.0);
    }
});
