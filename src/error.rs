use thiserror::Error;

/// Crate-level error. Protocol-level rejections (stale ballots, slot
/// mismatches, replies in the wrong phase) are not errors: they are normal
/// outcomes of concurrent ballots and are silently discarded by the
/// handler. Only the codec boundary can actually fail.
#[derive(Error, Debug)]
pub enum Error {
    #[error("failed to encode or decode a protocol message")]
    Encoding(#[from] bincode::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
