#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    use dnsauth::records::SpfTerm;
    if let Ok(s) = std::str::from_utf8(data) {
        let _ = SpfTerm::from_str(s);
    }
});
