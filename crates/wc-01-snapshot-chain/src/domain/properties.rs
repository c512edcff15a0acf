//! Encodings for chain properties that several subsystems read.

use shared_types::Address;

use super::SnapshotError;

/// `Store::Witness` key holding the ordered active witness list.
pub const ACTIVE_WITNESSES_KEY: &[u8] = b"active_witnesses";

/// `Store::DynamicProperties` key holding the head block number.
pub const LATEST_BLOCK_NUM_KEY: &[u8] = b"latest_block_header_number";

/// `Store::DynamicProperties` key holding the head block id hash.
pub const LATEST_BLOCK_HASH_KEY: &[u8] = b"latest_block_header_hash";

pub fn encode_u64(value: u64) -> Vec<u8> {
    value.to_be_bytes().to_vec()
}

pub fn decode_u64(bytes: &[u8]) -> Result<u64, SnapshotError> {
    let array: [u8; 8] = bytes.try_into().map_err(|_| SnapshotError::Corrupt {
        what: "u64 property",
        reason: format!("expected 8 bytes, got {}", bytes.len()),
    })?;
    Ok(u64::from_be_bytes(array))
}

/// Concatenated 20-byte addresses, in slot order.
pub fn encode_witness_list(witnesses: &[Address]) -> Vec<u8> {
    witnesses.iter().flat_map(|w| w.iter().copied()).collect()
}

pub fn decode_witness_list(bytes: &[u8]) -> Result<Vec<Address>, SnapshotError> {
    if bytes.len() % 20 != 0 {
        return Err(SnapshotError::Corrupt {
            what: "witness list",
            reason: format!("length {} is not a multiple of 20", bytes.len()),
        });
    }
    Ok(bytes
        .chunks_exact(20)
        .map(|chunk| {
            let mut address = [0u8; 20];
            address.copy_from_slice(chunk);
            address
        })
        .collect())
}
