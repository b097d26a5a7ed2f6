use crate::hash::{Hash, HashParseError};
use crate::BlockNumber;
use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Display, Formatter};
use std::str::FromStr;
use thiserror::Error;

/// A `NUMBER-HASH` reference to a block, used by documents to anchor
/// themselves to a point of the chain.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Blockstamp {
    pub number: BlockNumber,
    pub hash: Hash,
}

#[derive(Error, Debug, Clone)]
pub enum BlockstampParseError {
    #[error("missing '-' separator in blockstamp")]
    MissingSeparator,

    #[error("invalid block number: {0}")]
    InvalidNumber(String),

    #[error(transparent)]
    InvalidHash(#[from] HashParseError),
}

impl Blockstamp {
    pub const fn new(number: BlockNumber, hash: Hash) -> Self {
        Blockstamp { number, hash }
    }

    /// The conventional reference used by genesis-block documents:
    /// block 0 with the empty-document hash.
    pub const fn zero() -> Self {
        Blockstamp { number: 0, hash: Hash::EMPTY_DOC }
    }
}

impl Display for Blockstamp {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "{}-{}", self.number, self.hash)
    }
}

impl Debug for Blockstamp {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        Display::fmt(self, f)
    }
}

impl FromStr for Blockstamp {
    type Err = BlockstampParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (number, hash) = s.split_once('-').ok_or(BlockstampParseError::MissingSeparator)?;
        Ok(Blockstamp {
            number: number.parse().map_err(|_| BlockstampParseError::InvalidNumber(number.to_owned()))?,
            hash: hash.parse()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_blockstamp_display() {
        assert_eq!(Blockstamp::zero().to_string(), "0-E3B0C44298FC1C149AFBF4C8996FB92427AE41E4649B934CA495991B7852B855");
    }

    #[test]
    fn parse() {
        let bs: Blockstamp = "42-E3B0C44298FC1C149AFBF4C8996FB92427AE41E4649B934CA495991B7852B855".parse().unwrap();
        assert_eq!(bs.number, 42);
        assert_eq!(bs.hash, Hash::EMPTY_DOC);
        assert!("42".parse::<Blockstamp>().is_err());
    }
}
