#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(body) = std::str::from_utf8(data) else {
        return;
    };

    // Whatever parses must be sorted and selectable without panicking
    if let Ok(points) = heatgate::price::parse_day(body) {
        assert!(points.windows(2).all(|w| w[0].valid_from <= w[1].valid_from));
        if let Some(first) = points.first() {
            let _ = heatgate::price::select_current(&points, first.valid_from.with_timezone(&chrono::Utc));
        }
    }
});
