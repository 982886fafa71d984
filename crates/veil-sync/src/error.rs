use thiserror::Error;

use crate::remote::TransferError;
use veil_tree::TreeError;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Tree(#[from] TreeError),

    #[error(transparent)]
    Transfer(#[from] TransferError),
}
