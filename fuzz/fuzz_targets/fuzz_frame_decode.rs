//! Fuzz target: `Frame::decode` and `Frame::parse`
//!
//! Feeds arbitrary bytes as a response to a fixed request and as an
//! unsolicited frame. Neither path may panic, and anything that decodes
//! must re-encode to the exact input bytes.
//!
//! cargo fuzz run fuzz_frame_decode

#![no_main]

use hatbus::proto::codec::{Frame, MAX_PAYLOAD};
use hatbus::proto::command::Command;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(request) = Frame::new(data.first().copied().unwrap_or(0), Command::GetBoardName, &[])
    else {
        return;
    };
    let mut response = Frame::response_to(&request);
    if response.decode(data).is_ok() {
        assert!(response.payload().len() <= MAX_PAYLOAD);
        assert_eq!(response.encode().as_slice(), data);
    }

    if let Ok(frame) = Frame::parse(data) {
        assert_eq!(frame.encode().as_slice(), data);
    }
});
