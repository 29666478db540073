//! Arbitrary telemetry bodies through field slicing.
//!
//! Short or malformed bodies must be rejected, never read out of range.

#![no_main]

use bytes::Bytes;
use fieldwire_proto::EnvelopeBody;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let body = Bytes::copy_from_slice(data);
    if let Ok(envelope) = EnvelopeBody::parse(&body) {
        assert!(data.len() >= EnvelopeBody::MIN_LEN);
        assert_eq!(envelope.to_bytes(), data);
    }
});
