#![no_main]

use libfuzzer_sys::fuzz_target;
use perfdigest::config::DigestConfig;
use perfdigest::notification::{DateRange, Mailbox, MessageClassifier};

fuzz_target!(|data: &[u8]| {
    let input = String::from_utf8_lossy(data);
    let mailbox = Mailbox::parse(&input);

    let config = DigestConfig::default();
    let (Ok(classifier), Ok(range)) = (
        MessageClassifier::new(&config, "Ts, Paint"),
        DateRange::parse("01/01/1970-31/12/2099"),
    ) else {
        return;
    };

    // Classification and extraction must never panic
    for msg in mailbox.messages() {
        if let Some(platform) = classifier.classify(msg, &range) {
            let _ = classifier.extract(msg, &platform);
        }
    }
    let _ = DateRange::parse(&input);
});
