//! Arbitrary bytes through the frame decoder.
//!
//! Decoding must never panic, and anything that decodes must re-encode to
//! exactly the bytes it consumed.

#![no_main]

use fieldwire_proto::Frame;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok((frame, consumed)) = Frame::decode(data) {
        assert_eq!(frame.to_vec(), &data[..consumed]);
        assert_eq!(frame.header.body_len(), frame.body.len());
    }
});
