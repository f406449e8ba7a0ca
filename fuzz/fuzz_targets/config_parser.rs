#![no_main]

use goggles::config::AnalysisConfig;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        // Any accepted configuration must pass its own validation
        if let Ok(config) = AnalysisConfig::from_toml_str(input) {
            assert!(config.validate().is_ok());
        }
    }
});
