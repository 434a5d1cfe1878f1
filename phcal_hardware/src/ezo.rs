//! Framing for the Atlas Scientific EZO pH circuit in I2C mode.
//!
//! A command is written as plain ASCII. After the command's processing delay
//! the host reads a fixed-size frame: byte 0 is a response code, the payload
//! follows as ASCII and is NUL-terminated.

use crate::error::{HwError, Result};

/// Bytes requested per read; long enough for the `i` and `Slope,?` answers.
pub const RESPONSE_LEN: usize = 40;

/// Longest command the circuit accepts.
pub const MAX_COMMAND_LEN: usize = 32;

/// First byte of every I2C response frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseCode {
    Success,
    SyntaxError,
    Pending,
    NoData,
}

impl ResponseCode {
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            1 => Some(Self::Success),
            2 => Some(Self::SyntaxError),
            254 => Some(Self::Pending),
            255 => Some(Self::NoData),
            _ => None,
        }
    }
}

/// Validate and encode a command for the wire.
pub fn encode_command(command: &str) -> Result<Vec<u8>> {
    if command.is_empty() {
        return Err(HwError::Malformed("empty command".into()));
    }
    if command.len() > MAX_COMMAND_LEN {
        return Err(HwError::Malformed(format!(
            "command longer than {MAX_COMMAND_LEN} bytes"
        )));
    }
    if !command.bytes().all(|b| b.is_ascii_graphic() || b == b' ') {
        return Err(HwError::Malformed("command must be printable ASCII".into()));
    }
    Ok(command.as_bytes().to_vec())
}

/// Decode one response frame into its ASCII payload.
///
/// The payload ends at the first NUL (or at the end of the frame) and is
/// returned trimmed. An empty payload is a valid acknowledgement.
pub fn decode_response(frame: &[u8]) -> Result<String> {
    let Some((&code, rest)) = frame.split_first() else {
        return Err(HwError::Malformed("empty frame".into()));
    };
    match ResponseCode::from_byte(code) {
        Some(ResponseCode::Success) => {}
        Some(ResponseCode::SyntaxError) => return Err(HwError::Syntax),
        Some(ResponseCode::Pending) => return Err(HwError::Pending),
        Some(ResponseCode::NoData) => return Err(HwError::NoData),
        None => return Err(HwError::Malformed(format!("unknown response code {code}"))),
    }
    let end = rest.iter().position(|&b| b == 0).unwrap_or(rest.len());
    let payload = &rest[..end];
    if let Some(bad) = payload.iter().find(|b| !b.is_ascii() || b.is_ascii_control()) {
        return Err(HwError::Malformed(format!(
            "non-printable byte 0x{bad:02x} in payload"
        )));
    }
    // Validated as printable ASCII above, so this is lossless.
    Ok(String::from_utf8_lossy(payload).trim().to_string())
}
