//   Copyright (c) 2024-2026 Anton Kundenko <singaraiona@gmail.com>
//   All rights reserved.
//
//   Permission is hereby granted, free of charge, to any person obtaining a copy
//   of this software and associated documentation files (the "Software"), to deal
//   in the Software without restriction, including without limitation the rights
//   to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
//   copies of the Software, and to permit persons to whom the Software is
//   furnished to do so, subject to the following conditions:
//
//   The above copyright notice and this permission notice shall be included in all
//   copies or substantial portions of the Software.
//
//   THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
//   IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
//   FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
//   AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
//   LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
//   OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
//   SOFTWARE.

//! Frame-level guards on top of `pgwire`'s own message framing (spec §4.2).
//!
//! `pgwire::tokio::process_socket` owns the actual byte-level codec (length
//! prefix, type byte, backpressure-aware writes) the same way it does for
//! the teacher; this module only adds the one knob the wire protocol itself
//! leaves to the deployment: an upper bound on a single message's payload
//! size, enforced wherever this crate reads length-prefixed data it owns
//! directly (COPY batches, the startup handshake). `message_max_bytes`
//! defaults to 256 MiB (`Config::default`).

use crate::error::IrisPgError;

/// A message length field below this many bytes can't even encode its own
/// four-byte length prefix (spec §4.2: "length must be >= 4").
pub const MIN_MESSAGE_LEN: u32 = 4;

/// Reject a declared payload length before allocating a buffer for it.
/// `declared_len` is the length PostgreSQL's wire format bakes into the
/// message itself (spec §4.2's length-prefix field, inclusive of itself);
/// callers pass the full field value, not a payload-only length.
pub fn check_message_len(declared_len: u32, message_max_bytes: usize) -> Result<(), IrisPgError> {
    if declared_len < MIN_MESSAGE_LEN {
        return Err(IrisPgError::Protocol(format!(
            "message length {declared_len} is shorter than the 4-byte length prefix itself"
        )));
    }
    if declared_len as usize > message_max_bytes {
        return Err(IrisPgError::Protocol(format!(
            "message length {declared_len} exceeds the configured cap of {message_max_bytes} bytes"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_length_shorter_than_four() {
        let err = check_message_len(3, 1024).unwrap_err();
        assert_eq!(err.sqlstate(), "08P01");
    }

    #[test]
    fn rejects_oversized_payload() {
        let err = check_message_len(2048, 1024).unwrap_err();
        assert_eq!(err.sqlstate(), "08P01");
    }

    #[test]
    fn accepts_length_within_bounds() {
        assert!(check_message_len(64, 1024).is_ok());
    }
}
