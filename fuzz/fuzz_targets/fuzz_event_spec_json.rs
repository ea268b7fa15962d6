#![no_main]

use jgui_runtime::EventSpec;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(json) = serde_json::from_slice::<serde_json::Value>(data) else {
        return;
    };
    if let Ok(spec) = EventSpec::from_json("fuzz", &json) {
        let _ = spec.validate("fuzz");
    }
});
