use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Display, Formatter};
use std::str::FromStr;
use thiserror::Error;

pub const HASH_SIZE: usize = 32;

/// A SHA-256 digest, displayed as uppercase hexadecimal as in all textual
/// document formats of the protocol.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Hash([u8; HASH_SIZE]);

#[derive(Error, Debug, Clone)]
pub enum HashParseError {
    #[error("expected {0} hex characters, got {1}")]
    WrongLength(usize, usize),

    #[error("invalid hex string: {0}")]
    InvalidHex(String),
}

impl Hash {
    /// The hash of the empty byte string. Genesis-block documents reference
    /// the pseudo blockstamp `0-<EMPTY_DOC>`.
    pub const EMPTY_DOC: Hash = Hash([
        0xE3, 0xB0, 0xC4, 0x42, 0x98, 0xFC, 0x1C, 0x14, 0x9A, 0xFB, 0xF4, 0xC8, 0x99, 0x6F, 0xB9, 0x24, 0x27, 0xAE, 0x41, 0xE4,
        0x64, 0x9B, 0x93, 0x4C, 0xA4, 0x95, 0x99, 0x1B, 0x78, 0x52, 0xB8, 0x55,
    ]);

    pub const fn from_bytes(bytes: [u8; HASH_SIZE]) -> Self {
        Hash(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; HASH_SIZE] {
        &self.0
    }

    /// The `i`-th hexadecimal digit of the displayed form, most significant
    /// first. Used by the proof-of-work level check.
    pub fn nibble(&self, i: usize) -> u8 {
        let byte = self.0[i / 2];
        if i % 2 == 0 {
            byte >> 4
        } else {
            byte & 0x0F
        }
    }

    /// Number of leading zero hexadecimal digits.
    pub fn leading_zero_nibbles(&self) -> usize {
        (0..HASH_SIZE * 2).take_while(|&i| self.nibble(i) == 0).count()
    }
}

impl Display for Hash {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        let mut hex = [0u8; HASH_SIZE * 2];
        faster_hex::hex_encode_upper(&self.0, &mut hex).expect("The output is exactly twice the size of the input");
        f.write_str(std::str::from_utf8(&hex).expect("hex is always valid UTF-8"))
    }
}

impl Debug for Hash {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        Display::fmt(self, f)
    }
}

impl FromStr for Hash {
    type Err = HashParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != HASH_SIZE * 2 {
            return Err(HashParseError::WrongLength(HASH_SIZE * 2, s.len()));
        }
        let mut bytes = [0u8; HASH_SIZE];
        faster_hex::hex_decode(s.as_bytes(), &mut bytes).map_err(|_| HashParseError::InvalidHex(s.to_owned()))?;
        Ok(Hash(bytes))
    }
}
