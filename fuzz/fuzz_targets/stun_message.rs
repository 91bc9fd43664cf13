//! Fuzz target for STUN message decoding
//!
//! Arbitrary datagrams must decode or fail cleanly, and anything that
//! decodes must survive validation and re-encoding.

#![no_main]

use libfuzzer_sys::fuzz_target;
use natprobe_core::{StunMessage, TransactionId};
use natprobe_transport::validate_response;

fuzz_target!(|data: &[u8]| {
    let Ok(message) = StunMessage::from_bytes(data) else {
        return;
    };

    let _ = validate_response(&message, message.transaction_id());
    let _ = validate_response(&message, &TransactionId::from_words([0; 3]));

    // Skipped zero-length attributes and clipped bodies may shrink the
    // output, but it must decode again.
    let reencoded = message.to_bytes();
    let _ = StunMessage::from_bytes(&reencoded);
});
