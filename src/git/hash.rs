use crate::error::GitError;
use std::fmt;
use std::str::FromStr;

/// SHA1 object name of a git object
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Hash([u8; 20]);

/// The "no hash" sentinel
pub const ZERO_HASH: Hash = Hash([0; 20]);

impl Hash {
    /// Lenient constructor: decodes leading hex pairs until the first invalid
    /// one and zero-fills the rest. Use [`Hash::from_hex`] for untrusted input.
    pub fn new(s: &str) -> Self {
        let mut bytes = [0u8; 20];
        for (slot, pair) in bytes.iter_mut().zip(s.as_bytes().chunks_exact(2)) {
            let mut byte = [0u8; 1];
            if hex::decode_to_slice(pair, &mut byte).is_err() {
                break;
            }
            *slot = byte[0];
        }
        Self(bytes)
    }

    /// Parse a 40 character hexadecimal object name
    pub fn from_hex(s: &str) -> Result<Self, GitError> {
        let mut bytes = [0u8; 20];
        hex::decode_to_slice(s, &mut bytes).map_err(|_| GitError::InvalidHash(s.to_string()))?;
        Ok(Self(bytes))
    }

    pub fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Whether this is the zero value
    pub fn is_zero(&self) -> bool {
        *self == ZERO_HASH
    }
}

impl FromStr for Hash {
    type Err = GitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash({})", self)
    }
}
