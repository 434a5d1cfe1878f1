#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Arbitrary bytes off the bus must decode or fail cleanly.
    let _ = phcal_hardware::ezo::decode_response(data);
    if let Ok(text) = std::str::from_utf8(data) {
        let _ = phcal_hardware::ezo::encode_command(text);
    }
});
