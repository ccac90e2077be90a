//! Firmware loading: binary image to fixed-width memory words.
//!
//! A firmware binary is sliced into `data_width / 8`-byte groups, and each
//! group is decoded as an unsigned integer in the CPU's byte order. Word `i`
//! covers bytes `i * n .. (i + 1) * n` of the image.

use std::fmt;
use std::io::Read;

use serde::Serialize;
use sha2::{Digest, Sha256};
use socgen_model::ByteOrder;

use crate::error::FirmwareError;

/// What to do with an image whose length is not a whole number of words.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RemainderPolicy {
    /// Fail with [`FirmwareError::TrailingBytes`].
    #[default]
    Reject,
    /// Complete the final word with zero bytes at its high addresses.
    ZeroPad,
}

impl fmt::Display for RemainderPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RemainderPolicy::Reject => "reject",
            RemainderPolicy::ZeroPad => "zero-pad",
        })
    }
}

/// Bytes per word for a width in bits.
pub fn word_bytes(data_width: u32) -> Result<usize, FirmwareError> {
    if data_width == 0 || data_width % 8 != 0 || data_width > 64 {
        return Err(FirmwareError::UnsupportedWidth { bits: data_width });
    }
    Ok((data_width / 8) as usize)
}

fn decode_word(chunk: &[u8], n: usize, byteorder: ByteOrder) -> u64 {
    // `chunk` is at most `n` bytes; missing bytes are the high-address ones.
    let mut buf = [0u8; 8];
    match byteorder {
        ByteOrder::Little => {
            buf[..chunk.len()].copy_from_slice(chunk);
            u64::from_le_bytes(buf)
        }
        ByteOrder::Big => {
            let start = 8 - n;
            buf[start..start + chunk.len()].copy_from_slice(chunk);
            u64::from_be_bytes(buf)
        }
    }
}

/// Decode `bytes` into words of `data_width` bits.
pub fn decode_words(
    bytes: &[u8],
    data_width: u32,
    byteorder: ByteOrder,
    remainder: RemainderPolicy,
) -> Result<Vec<u64>, FirmwareError> {
    let n = word_bytes(data_width)?;
    if bytes.len() % n != 0 && remainder == RemainderPolicy::Reject {
        return Err(FirmwareError::TrailingBytes {
            len: bytes.len(),
            word_bytes: n,
        });
    }
    Ok(bytes
        .chunks(n)
        .map(|chunk| decode_word(chunk, n, byteorder))
        .collect())
}

/// Encode words back into bytes; the inverse of [`decode_words`].
pub fn encode_words(
    words: &[u64],
    data_width: u32,
    byteorder: ByteOrder,
) -> Result<Vec<u8>, FirmwareError> {
    let n = word_bytes(data_width)?;
    let mut out = Vec::with_capacity(words.len() * n);
    for (index, &value) in words.iter().enumerate() {
        if n < 8 && value >> (n * 8) != 0 {
            return Err(FirmwareError::WordOverflow {
                index,
                value,
                bits: data_width,
            });
        }
        match byteorder {
            ByteOrder::Little => out.extend_from_slice(&value.to_le_bytes()[..n]),
            ByteOrder::Big => out.extend_from_slice(&value.to_be_bytes()[8 - n..]),
        }
    }
    Ok(out)
}

/// Read `reader` to exhaustion and decode its contents.
pub fn load<R: Read>(
    mut reader: R,
    data_width: u32,
    byteorder: ByteOrder,
    remainder: RemainderPolicy,
) -> Result<FirmwareImage, FirmwareError> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;
    FirmwareImage::decode(&bytes, data_width, byteorder, remainder)
}

/// A decoded firmware image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FirmwareImage {
    #[serde(skip)]
    pub words: Vec<u64>,
    /// Length of the source binary in bytes.
    pub byte_len: usize,
    pub data_width: u32,
    pub byteorder: String,
    /// Lowercase hex SHA-256 of the source binary.
    pub sha256: String,
}

impl FirmwareImage {
    pub fn decode(
        bytes: &[u8],
        data_width: u32,
        byteorder: ByteOrder,
        remainder: RemainderPolicy,
    ) -> Result<Self, FirmwareError> {
        let words = decode_words(bytes, data_width, byteorder, remainder)?;
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        let sha256 = hasher
            .finalize()
            .iter()
            .map(|b| format!("{b:02x}"))
            .collect();
        Ok(Self {
            words,
            byte_len: bytes.len(),
            data_width,
            byteorder: byteorder.as_str().to_string(),
            sha256,
        })
    }

    pub fn word_count(&self) -> usize {
        self.words.len()
    }
}

impl fmt::Display for FirmwareImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} words of {} bits ({}-endian) from {} bytes, sha256 {}",
            self.words.len(),
            self.data_width,
            self.byteorder,
            self.byte_len,
            self.sha256
        )
    }
}
