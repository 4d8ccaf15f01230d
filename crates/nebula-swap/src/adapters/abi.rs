//! Solidity ABI codec for the HTLC contract.
//!
//! Only the static types the escrow interface uses: `bytes32`, `uint256`,
//! `address` and `bool`, each one 32-byte word.

use crate::domain::{Hash, TransportError};
use primitive_types::U256;
use sha3::{Digest, Keccak256};

/// `createEscrow(bytes32,uint256,address)`, payable.
pub const CREATE_ESCROW: &str = "createEscrow(bytes32,uint256,address)";
/// `claimEscrow(bytes32,bytes32)`.
pub const CLAIM_ESCROW: &str = "claimEscrow(bytes32,bytes32)";
/// `refundEscrow(bytes32)`.
pub const REFUND_ESCROW: &str = "refundEscrow(bytes32)";
/// `escrowExists(bytes32)`.
pub const ESCROW_EXISTS: &str = "escrowExists(bytes32)";
/// `getEscrow(bytes32)`.
pub const GET_ESCROW: &str = "getEscrow(bytes32)";
/// Event emitted on claim: hashlock indexed, secret in data.
pub const ESCROW_CLAIMED_EVENT: &str = "EscrowClaimed(bytes32,bytes32)";

const WORD: usize = 32;

/// Keccak-256 of a string.
pub fn keccak(input: &str) -> Hash {
    Keccak256::digest(input.as_bytes()).into()
}

/// 4-byte function selector.
pub fn selector(signature: &str) -> [u8; 4] {
    let hash = keccak(signature);
    [hash[0], hash[1], hash[2], hash[3]]
}

/// Topic0 of `EscrowClaimed`.
pub fn escrow_claimed_topic() -> Hash {
    keccak(ESCROW_CLAIMED_EVENT)
}

/// Parse `0x` + 40 hex characters.
pub fn parse_address(address: &str) -> Option<[u8; 20]> {
    let body = address.strip_prefix("0x")?;
    if body.len() != 40 {
        return None;
    }
    let bytes = hex::decode(body).ok()?;
    let mut out = [0u8; 20];
    out.copy_from_slice(&bytes);
    Some(out)
}

/// Lowercase `0x` rendering.
pub fn format_address(address: &[u8; 20]) -> String {
    format!("0x{}", hex::encode(address))
}

fn uint_word(value: U256) -> [u8; WORD] {
    let mut word = [0u8; WORD];
    value.to_big_endian(&mut word);
    word
}

fn address_word(address: &[u8; 20]) -> [u8; WORD] {
    let mut word = [0u8; WORD];
    word[12..].copy_from_slice(address);
    word
}

fn bool_word(value: bool) -> [u8; WORD] {
    let mut word = [0u8; WORD];
    word[31] = u8::from(value);
    word
}

fn call(signature: &str, words: &[[u8; WORD]]) -> Vec<u8> {
    let mut data = Vec::with_capacity(4 + words.len() * WORD);
    data.extend_from_slice(&selector(signature));
    for word in words {
        data.extend_from_slice(word);
    }
    data
}

/// Calldata for `createEscrow`. The amount travels as `msg.value`.
pub fn encode_create_escrow(hashlock: &Hash, timelock: u64, recipient: &[u8; 20]) -> Vec<u8> {
    call(
        CREATE_ESCROW,
        &[*hashlock, uint_word(U256::from(timelock)), address_word(recipient)],
    )
}

/// Calldata for `claimEscrow`.
pub fn encode_claim_escrow(hashlock: &Hash, secret: &[u8; 32]) -> Vec<u8> {
    call(CLAIM_ESCROW, &[*hashlock, *secret])
}

/// Calldata for `refundEscrow`.
pub fn encode_refund_escrow(hashlock: &Hash) -> Vec<u8> {
    call(REFUND_ESCROW, &[*hashlock])
}

/// Calldata for `escrowExists`.
pub fn encode_escrow_exists(hashlock: &Hash) -> Vec<u8> {
    call(ESCROW_EXISTS, &[*hashlock])
}

/// Calldata for `getEscrow`.
pub fn encode_get_escrow(hashlock: &Hash) -> Vec<u8> {
    call(GET_ESCROW, &[*hashlock])
}

/// Decoded `getEscrow` return tuple. All-zero for an unknown hashlock.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EscrowTuple {
    /// Funding address.
    pub sender: [u8; 20],
    /// Claim beneficiary.
    pub recipient: [u8; 20],
    /// Locked wei.
    pub amount: u128,
    /// Refund timelock.
    pub timelock: u64,
    /// Claimed flag.
    pub claimed: bool,
    /// Refunded flag.
    pub refunded: bool,
}

/// Encode a `getEscrow` return value.
pub fn encode_escrow_tuple(escrow: &EscrowTuple) -> Vec<u8> {
    [
        address_word(&escrow.sender),
        address_word(&escrow.recipient),
        uint_word(U256::from(escrow.amount)),
        uint_word(U256::from(escrow.timelock)),
        bool_word(escrow.claimed),
        bool_word(escrow.refunded),
    ]
    .concat()
}

/// Encode a `bool` return value.
pub fn encode_bool(value: bool) -> Vec<u8> {
    bool_word(value).to_vec()
}

fn word_at(data: &[u8], index: usize) -> Result<&[u8], TransportError> {
    data.get(index * WORD..(index + 1) * WORD)
        .ok_or_else(|| TransportError::Malformed(format!("missing word {index}")))
}

fn read_hash(data: &[u8], index: usize) -> Result<Hash, TransportError> {
    let mut out = [0u8; WORD];
    out.copy_from_slice(word_at(data, index)?);
    Ok(out)
}

fn read_uint(data: &[u8], index: usize) -> Result<U256, TransportError> {
    Ok(U256::from_big_endian(word_at(data, index)?))
}

fn read_u128(data: &[u8], index: usize) -> Result<u128, TransportError> {
    let value = read_uint(data, index)?;
    if value.bits() > 128 {
        return Err(TransportError::Malformed(format!("word {index} exceeds u128")));
    }
    Ok(value.low_u128())
}

fn read_u64(data: &[u8], index: usize) -> Result<u64, TransportError> {
    let value = read_uint(data, index)?;
    if value.bits() > 64 {
        return Err(TransportError::Malformed(format!("word {index} exceeds u64")));
    }
    Ok(value.low_u64())
}

fn read_address(data: &[u8], index: usize) -> Result<[u8; 20], TransportError> {
    let word = word_at(data, index)?;
    if word[..12].iter().any(|b| *b != 0) {
        return Err(TransportError::Malformed(format!("word {index} is not an address")));
    }
    let mut out = [0u8; 20];
    out.copy_from_slice(&word[12..]);
    Ok(out)
}

/// Decode a `bool` return value.
pub fn decode_bool(data: &[u8]) -> Result<bool, TransportError> {
    match read_u64(data, 0)? {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(TransportError::Malformed(format!("bool word {other}"))),
    }
}

/// Decode a `getEscrow` return value.
pub fn decode_escrow_tuple(data: &[u8]) -> Result<EscrowTuple, TransportError> {
    Ok(EscrowTuple {
        sender: read_address(data, 0)?,
        recipient: read_address(data, 1)?,
        amount: read_u128(data, 2)?,
        timelock: read_u64(data, 3)?,
        claimed: read_u64(data, 4)? != 0,
        refunded: read_u64(data, 5)? != 0,
    })
}

/// Read a single `bytes32` word (event data).
pub fn decode_bytes32(data: &[u8]) -> Result<Hash, TransportError> {
    read_hash(data, 0)
}

/// A decoded call to the escrow contract.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EscrowCall {
    /// `createEscrow`.
    Create {
        /// Hashlock.
        hashlock: Hash,
        /// Timelock.
        timelock: u64,
        /// Recipient.
        recipient: [u8; 20],
    },
    /// `claimEscrow`.
    Claim {
        /// Hashlock.
        hashlock: Hash,
        /// Preimage.
        secret: [u8; 32],
    },
    /// `refundEscrow`.
    Refund {
        /// Hashlock.
        hashlock: Hash,
    },
    /// `escrowExists`.
    Exists {
        /// Hashlock.
        hashlock: Hash,
    },
    /// `getEscrow`.
    Get {
        /// Hashlock.
        hashlock: Hash,
    },
}

/// Decode calldata by selector. Used by contract-side simulators.
pub fn decode_call(data: &[u8]) -> Result<EscrowCall, TransportError> {
    if data.len() < 4 {
        return Err(TransportError::Malformed("calldata shorter than selector".into()));
    }
    let (head, args) = data.split_at(4);
    let call = if head == selector(CREATE_ESCROW) {
        EscrowCall::Create {
            hashlock: read_hash(args, 0)?,
            timelock: read_u64(args, 1)?,
            recipient: read_address(args, 2)?,
        }
    } else if head == selector(CLAIM_ESCROW) {
        EscrowCall::Claim {
            hashlock: read_hash(args, 0)?,
            secret: read_hash(args, 1)?,
        }
    } else if head == selector(REFUND_ESCROW) {
        EscrowCall::Refund {
            hashlock: read_hash(args, 0)?,
        }
    } else if head == selector(ESCROW_EXISTS) {
        EscrowCall::Exists {
            hashlock: read_hash(args, 0)?,
        }
    } else if head == selector(GET_ESCROW) {
        EscrowCall::Get {
            hashlock: read_hash(args, 0)?,
        }
    } else {
        return Err(TransportError::Malformed(format!(
            "unknown selector 0x{}",
            hex::encode(head)
        )));
    };
    Ok(call)
}
