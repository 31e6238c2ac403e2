#![no_main]

use libfuzzer_sys::fuzz_target;
use vigia::tally::SyscallTally;
use vigia::validator::compare;
use vigia::whitelist::Whitelist;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        let (ids, skipped) = Whitelist::parse(input);
        assert!(ids.len() + skipped <= input.split_whitespace().count());

        // Compare the parsed set against a tally of the same ids: nothing unauthorized
        let mut tally = SyscallTally::new();
        for &id in &ids {
            tally.record(id);
        }
        let report = compare(tally.snapshot(), &Whitelist::from_ids(ids.iter().copied()));
        assert!(report.fully_matched);
        assert!(report.unused.is_empty());
    }
});
