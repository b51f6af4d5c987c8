// SPDX-License-Identifier: Apache-2.0, MIT
use economy_types::EconomyError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage unavailable: {0}")]
    Unavailable(#[from] sqlx::Error),

    #[error("row decode failed: {0}")]
    Decode(String),
}

impl From<StorageError> for EconomyError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Unavailable(source) => EconomyError::StorageUnavailable(source),
            StorageError::Decode(msg) => EconomyError::Other(msg),
        }
    }
}
