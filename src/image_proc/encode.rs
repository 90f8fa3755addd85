//! Device payload encoding.
//!
//! The payload sent to the panel is the packed frame, byte for byte. A
//! C-style hex array of the same bytes can be produced for firmware
//! builds and debugging:
//!
//! ```text
//! const unsigned char IMAGE_BLACK[] PROGMEM = {
//! 0XFF, 0XFF, ... (16 values per line),
//! ...
//! };
//! ```

use super::pack::PackedBitstream;
use bytes::Bytes;
use thiserror::Error;

/// Name of the array in the text form
pub const ARRAY_NAME: &str = "IMAGE_BLACK";

/// Values per line in the text form
pub const VALUES_PER_LINE: usize = 16;

/// Hex array parse errors
#[derive(Error, Debug, PartialEq, Eq)]
pub enum HexArrayError {
    #[error("No {{...}} array body found")]
    MissingBody,

    #[error("Invalid hex value '{0}'")]
    InvalidValue(String),
}

/// Exact bytes transmitted to the panel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceUploadPayload(Bytes);

impl DeviceUploadPayload {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Encode a packed frame as the upload payload
pub fn encode(bits: PackedBitstream) -> DeviceUploadPayload {
    DeviceUploadPayload(Bytes::from(bits.into_bytes()))
}

/// Render bytes as a C hex array declaration
pub fn to_hex_array(bytes: &[u8]) -> String {
    let lines: Vec<String> = bytes
        .chunks(VALUES_PER_LINE)
        .map(|chunk| {
            chunk
                .iter()
                .map(|b| format!("0X{:02X}", b))
                .collect::<Vec<_>>()
                .join(", ")
        })
        .collect();

    format!(
        "const unsigned char {}[] PROGMEM = {{\n{}\n}};",
        ARRAY_NAME,
        lines.join(",\n")
    )
}

/// Parse the bytes back out of a C hex array declaration
///
/// Reads the text between the first `{` and the following `}` and keeps
/// every comma-separated token starting with `0X`.
pub fn parse_hex_array(text: &str) -> Result<Vec<u8>, HexArrayError> {
    let start = text.find('{').ok_or(HexArrayError::MissingBody)?;
    let rest = &text[start + 1..];
    let end = rest.find('}').ok_or(HexArrayError::MissingBody)?;

    rest[..end]
        .split(',')
        .map(str::trim)
        .filter(|token| token.starts_with("0X"))
        .map(|token| {
            let digits = &token[2..];
            if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
                return Err(HexArrayError::InvalidValue(token.to_string()));
            }
            u8::from_str_radix(digits, 16)
                .map_err(|_| HexArrayError::InvalidValue(token.to_string()))
        })
        .collect()
}
