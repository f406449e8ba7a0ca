#![no_main]

use goggles::config::AnalysisConfig;
use goggles::dataset::Dataset;
use goggles::preprocess::prepare;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        if let Ok(dataset) = Dataset::from_json_str(input) {
            let config = AnalysisConfig::default();
            for variable in &dataset.variables {
                let _ = prepare(&variable.name, &variable.groups, &config);
            }
        }
    }
});
