//! Decoding arbitrary datagrams never panics, and every decoded frame
//! re-encodes to the exact input.

#![no_main]

use libfuzzer_sys::fuzz_target;
use trustline_proto::Frame;

fuzz_target!(|data: &[u8]| {
    let Ok(frame) = Frame::decode(data) else {
        assert_ne!(data.len(), Frame::SIZE);
        return;
    };

    assert_eq!(&frame.to_bytes()[..], data);
    assert_eq!(&frame.signed_region()[..], &data[..Frame::SIGNED_LEN]);

    // Names are either valid identifiers or rejected, never a panic
    let _ = frame.x_username.to_identifier();
    let _ = frame.y_username.to_identifier();
    let _ = frame.y_server_address.to_identifier();
});
