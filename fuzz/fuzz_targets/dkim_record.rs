#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    use dnsauth::records::RecordKind;
    if let Ok(s) = std::str::from_utf8(data) {
        let _ = dnsauth::parse_dkim_record(s);
        let _ = dnsauth::validate_dkim_record(s);
        let _ = dnsauth::get_recommendations(RecordKind::Dkim, Some(s));
    }
});
