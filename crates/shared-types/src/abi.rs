//! # Solidity ABI Codec
//!
//! Minimal head/tail ABI encoding for the types the rooms contract uses:
//! `address`, `uint256`, `string` and dynamic arrays of those.
//!
//! ## Layout
//!
//! ```text
//! tuple  = head(t1) .. head(tn) tail(t1) .. tail(tn)
//! static = one 32-byte word in the head, no tail
//! dynamic= head holds the byte offset of its tail, relative to tuple start
//! string = len word || bytes padded to 32
//! T[]    = len word || tuple(T, T, ..)
//! ```

use sha3::{Digest, Keccak256};

use crate::entities::{Address, Hash, U256};
use crate::errors::AbiError;

const WORD: usize = 32;

/// Keccak-256 of arbitrary bytes.
#[must_use]
pub fn keccak256(data: &[u8]) -> Hash {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    let mut out = [0u8; 32];
    out.copy_from_slice(&hasher.finalize());
    Hash(out)
}

/// 4-byte function selector for a canonical signature such as `move(uint256,uint256)`.
#[must_use]
pub fn selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    let mut out = [0u8; 4];
    out.copy_from_slice(&hash.0[..4]);
    out
}

/// ABI parameter types understood by the codec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbiType {
    /// `address`
    Address,
    /// `uint256`
    Uint256,
    /// `string`
    String,
    /// `T[]`
    Array(Box<AbiType>),
}

impl AbiType {
    fn is_dynamic(&self) -> bool {
        matches!(self, Self::String | Self::Array(_))
    }
}

/// A decoded (or to-be-encoded) ABI value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// `address`
    Address(Address),
    /// `uint256`
    Uint(U256),
    /// `string`
    String(String),
    /// `T[]`
    Array(Vec<Token>),
}

impl Token {
    fn is_dynamic(&self) -> bool {
        matches!(self, Self::String(_) | Self::Array(_))
    }

    /// Returns the address, if this is an address token.
    #[must_use]
    pub fn into_address(self) -> Option<Address> {
        match self {
            Self::Address(a) => Some(a),
            _ => None,
        }
    }

    /// Returns the integer, if this is a uint token.
    #[must_use]
    pub fn into_uint(self) -> Option<U256> {
        match self {
            Self::Uint(v) => Some(v),
            _ => None,
        }
    }

    /// Returns the string, if this is a string token.
    #[must_use]
    pub fn into_string(self) -> Option<String> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the elements, if this is an array token.
    #[must_use]
    pub fn into_array(self) -> Option<Vec<Token>> {
        match self {
            Self::Array(items) => Some(items),
            _ => None,
        }
    }
}

// =============================================================================
// ENCODING
// =============================================================================

/// Encode a tuple of tokens.
#[must_use]
pub fn encode(tokens: &[Token]) -> Vec<u8> {
    let head_len = WORD * tokens.len();
    let mut head = Vec::with_capacity(head_len);
    let mut tail = Vec::new();

    for token in tokens {
        if token.is_dynamic() {
            head.extend_from_slice(&uint_word(U256::from(head_len + tail.len())));
            tail.extend(encode_dynamic(token));
        } else {
            head.extend_from_slice(&encode_static(token));
        }
    }

    head.extend(tail);
    head
}

/// Encode a function call: selector followed by the encoded arguments.
#[must_use]
pub fn encode_call(signature: &str, tokens: &[Token]) -> Vec<u8> {
    let mut out = selector(signature).to_vec();
    out.extend(encode(tokens));
    out
}

fn uint_word(value: U256) -> [u8; 32] {
    let mut word = [0u8; 32];
    value.to_big_endian(&mut word);
    word
}

fn encode_static(token: &Token) -> [u8; 32] {
    match token {
        Token::Address(a) => a.to_word(),
        Token::Uint(v) => uint_word(*v),
        // Dynamic tokens never reach here.
        Token::String(_) | Token::Array(_) => [0u8; 32],
    }
}

fn encode_dynamic(token: &Token) -> Vec<u8> {
    match token {
        Token::String(s) => {
            let bytes = s.as_bytes();
            let mut out = uint_word(U256::from(bytes.len())).to_vec();
            out.extend_from_slice(bytes);
            let padding = (WORD - bytes.len() % WORD) % WORD;
            out.extend(std::iter::repeat(0u8).take(padding));
            out
        }
        Token::Array(items) => {
            let mut out = uint_word(U256::from(items.len())).to_vec();
            out.extend(encode(items));
            out
        }
        Token::Address(_) | Token::Uint(_) => encode_static(token).to_vec(),
    }
}

// =============================================================================
// DECODING
// =============================================================================

/// Decode a tuple of the given types.
pub fn decode(types: &[AbiType], data: &[u8]) -> Result<Vec<Token>, AbiError> {
    let mut tokens = Vec::with_capacity(types.len());
    for (i, ty) in types.iter().enumerate() {
        let head = read_word(data, i * WORD)?;
        let token = if ty.is_dynamic() {
            let offset = word_to_usize(&head)?;
            let tail = data.get(offset..).ok_or(AbiError::OutOfBounds {
                offset,
                needed: WORD,
                available: data.len(),
            })?;
            decode_dynamic(ty, tail)?
        } else {
            decode_static(ty, &head)?
        };
        tokens.push(token);
    }
    Ok(tokens)
}

/// Decode a single `uint256` word.
pub fn decode_uint(data: &[u8], index: usize) -> Result<U256, AbiError> {
    let word = read_word(data, index * WORD)?;
    Ok(U256::from_big_endian(&word))
}

fn decode_static(ty: &AbiType, word: &[u8; 32]) -> Result<Token, AbiError> {
    match ty {
        AbiType::Address => Address::from_word(word)
            .map(Token::Address)
            .ok_or(AbiError::InvalidAddress),
        _ => Ok(Token::Uint(U256::from_big_endian(word))),
    }
}

fn decode_dynamic(ty: &AbiType, data: &[u8]) -> Result<Token, AbiError> {
    let len = word_to_usize(&read_word(data, 0)?)?;
    let body = &data[WORD..];
    match ty {
        AbiType::String => {
            let bytes = body.get(..len).ok_or(AbiError::OutOfBounds {
                offset: WORD,
                needed: len,
                available: body.len(),
            })?;
            String::from_utf8(bytes.to_vec())
                .map(Token::String)
                .map_err(|e| AbiError::InvalidUtf8(e.to_string()))
        }
        AbiType::Array(inner) => {
            // Every element occupies at least one head word.
            let needed = len.checked_mul(WORD).ok_or_else(|| {
                AbiError::WordOverflow(format!("array length {len}"))
            })?;
            if needed > body.len() {
                return Err(AbiError::OutOfBounds {
                    offset: WORD,
                    needed,
                    available: body.len(),
                });
            }
            let types = vec![(**inner).clone(); len];
            decode(&types, body).map(Token::Array)
        }
        AbiType::Address | AbiType::Uint256 => {
            let word = read_word(data, 0)?;
            decode_static(ty, &word)
        }
    }
}

fn read_word(data: &[u8], offset: usize) -> Result<[u8; 32], AbiError> {
    let slice = data
        .get(offset..offset + WORD)
        .ok_or(AbiError::OutOfBounds {
            offset,
            needed: WORD,
            available: data.len(),
        })?;
    let mut word = [0u8; 32];
    word.copy_from_slice(slice);
    Ok(word)
}

fn word_to_usize(word: &[u8; 32]) -> Result<usize, AbiError> {
    let value = U256::from_big_endian(word);
    if value > U256::from(u32::MAX) {
        return Err(AbiError::WordOverflow(value.to_string()));
    }
    Ok(value.low_u64() as usize)
}
