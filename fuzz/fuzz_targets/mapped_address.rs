//! Fuzz target for (XOR-)MAPPED-ADDRESS value decoding

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use natprobe_core::TransactionId;
use natprobe_core::attribute::{decode_mapped_address, decode_xor_mapped_address};

#[derive(Debug, Arbitrary)]
struct Input {
    transaction_id: [u32; 3],
    value: Vec<u8>,
}

fuzz_target!(|input: Input| {
    let tid = TransactionId::from_words(input.transaction_id);

    if let Ok(mapped) = decode_mapped_address(&input.value) {
        let _ = mapped.socket_addr();
    }
    if let Ok(mapped) = decode_xor_mapped_address(&input.value, &tid) {
        let _ = mapped.socket_addr();
    }
});
