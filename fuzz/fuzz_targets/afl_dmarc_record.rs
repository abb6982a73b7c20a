#[macro_use]
extern crate afl;

fn main() {
    use dnsauth::records::RecordKind;
    fuzz!(|data: &[u8]| {
        if let Ok(s) = std::str::from_utf8(data) {
            let _ = dnsauth::parse_dmarc_record(s);
            let _ = dnsauth::validate_dmarc_record(s);
            let _ = dnsauth::get_recommendations(RecordKind::Dmarc, Some(s));
        }
    });
}
