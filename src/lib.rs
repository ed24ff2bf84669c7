use abi::{Machine, VMError};
use wasm_bindgen::prelude::*;

pub mod fixtures;
pub mod image;

pub use abi;

pub const SYSTEM_STATUS: &str = r#"
================================================================================
UM // 32-BIT SEGMENTED MACHINE
================================================================================
[ ARCHITECTURE ]
8 registers, segmented word memory, 14 instructions, byte I/O.

[ IMAGE FORMAT ]
Flat big-endian 32-bit words. Segment 0 is the image; execution starts at 0.

CONFORMANCE SUITE:
"#;

/// Runs `image` to halt against `input`, returning everything it wrote.
pub fn execute(image: &[u8], input: &[u8]) -> Result<Vec<u8>, VMError> {
    let mut vm = Machine::from_image(image, input, Vec::new())?;
    vm.run()?;
    Ok(vm.into_output())
}

pub fn run_suite() -> String {
    let mut report = String::from(SYSTEM_STATUS);
    let mut failed = 0;
    for fixture in fixtures::all() {
        report.push_str(&format!("TEST: {:<24} ... ", fixture.name));
        match fixture.check() {
            Ok(()) => report.push_str("PASS\n"),
            Err(e) => {
                failed += 1;
                report.push_str(&format!("FAIL ({e})\n"));
            }
        }
    }
    if failed == 0 {
        report.push_str("\nALL SYSTEMS NOMINAL.\n");
    } else {
        report.push_str(&format!("\n{failed} FAILED.\n"));
    }
    report
}

#[wasm_bindgen]
pub fn init_shell() -> String {
    run_suite()
}

#[wasm_bindgen]
pub fn run_image(image: &[u8], input: &[u8]) -> Result<Vec<u8>, JsError> {
    Ok(execute(image, input)?)
}
