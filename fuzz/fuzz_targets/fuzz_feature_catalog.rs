#![no_main]
use libfuzzer_sys::fuzz_target;
use siggen_core::UnitRegistry;
use siggen_core::conversions::feature_spec;

fuzz_target!(|data: &str| {
    // Feature tables go through template parsing and unit lookup; neither may panic.
    let Ok(features) = siggen_config::load_features_toml(data) else {
        return;
    };
    let _ = siggen_config::validate_features(&features);
    let units = UnitRegistry::builtin();
    for f in &features {
        if let Ok(spec) = feature_spec(f, &units) {
            for t in &spec.activate {
                let _ = t.render(1, "");
            }
        }
    }
});
