//! Single-line clipboard transfer of session snapshots.

use base64::{engine::general_purpose::STANDARD_NO_PAD, Engine as _};
use gridmerge_storage::{CorruptSnapshot, SessionSnapshot, StorageError};
use thiserror::Error;

/// Identifier prefix emitted before the encoded snapshot payload.
pub const TRANSFER_PREFIX: &str = "gridmerge";
const FIELD_DELIMITER: char = ':';

/// Errors that can occur while exchanging transfer strings.
#[derive(Debug, Error)]
pub enum TransferError {
    /// The provided string was empty or contained only whitespace.
    #[error("transfer string was empty")]
    EmptyPayload,
    /// The string did not contain a payload segment.
    #[error("transfer string is missing the payload")]
    MissingPayload,
    /// The string used an unexpected prefix segment.
    #[error("transfer prefix '{0}' is not supported")]
    InvalidPrefix(String),
    /// The base64 payload could not be decoded.
    #[error("could not decode transfer payload: {0}")]
    InvalidEncoding(#[from] base64::DecodeError),
    /// The payload decoded but is not a valid snapshot.
    #[error("transfer payload is not a valid snapshot: {0}")]
    InvalidPayload(#[from] CorruptSnapshot),
    /// The snapshot could not be serialised.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Encodes the snapshot into a string suitable for clipboard transfer.
pub fn encode(snapshot: &SessionSnapshot) -> Result<String, TransferError> {
    let json = snapshot.encode()?;
    let encoded = STANDARD_NO_PAD.encode(json.as_bytes());
    Ok(format!("{TRANSFER_PREFIX}{FIELD_DELIMITER}{encoded}"))
}

/// Decodes a snapshot from a transfer string.
pub fn decode(value: &str) -> Result<SessionSnapshot, TransferError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(TransferError::EmptyPayload);
    }

    let (prefix, payload) = trimmed
        .split_once(FIELD_DELIMITER)
        .ok_or(TransferError::MissingPayload)?;
    if prefix != TRANSFER_PREFIX {
        return Err(TransferError::InvalidPrefix(prefix.to_owned()));
    }
    if payload.is_empty() {
        return Err(TransferError::MissingPayload);
    }

    let bytes = STANDARD_NO_PAD.decode(payload.as_bytes())?;
    let json = String::from_utf8_lossy(&bytes);
    Ok(SessionSnapshot::decode(&json)?)
}
