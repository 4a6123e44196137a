#![no_main]

use libfuzzer_sys::fuzz_target;
use shade_core::{evaluate, ops};
use shade_ir::{Graph, Value};

fuzz_target!(|data: &[u8]| {
    if let Ok(pattern) = std::str::from_utf8(data) {
        // Invalid patterns must be rejected with an error, never a panic.
        let mut g = Graph::new();
        let Ok(v) = shade_core::make(&mut g, Value::Vec(vec![1.0, 2.0, 3.0])) else {
            return;
        };
        if let Ok(s) = ops::swizzle(&mut g, v, pattern) {
            let value = evaluate(&g, s).expect("valid swizzle failed to evaluate");
            assert_eq!(value.component_count(), pattern.len());
        }
    }
});
