use thiserror::Error;

/// Failures surfaced by the RPC gateway.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    #[error("InvalidAddress: {0}")]
    InvalidAddress(String),
    #[error("NotFound: {0}")]
    NotFound(String),
    #[error("NetworkError: {0}")]
    Network(String),
    #[error("NodeRejected: {0}")]
    NodeRejected(String),
    #[error("ConfirmationTimeout: {0}")]
    ConfirmationTimeout(String),
}

/// Failures while assembling a transfer or account-creation transaction.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransferError {
    #[error("InvalidAddress: {0}")]
    InvalidAddress(String),
    #[error("InvalidAmount: {0}")]
    InvalidAmount(String),
    #[error("InsufficientContext: no signer available")]
    InsufficientContext,
    #[error("AccountMissing: holding account {account} for owner {owner} does not exist")]
    AccountMissing { owner: String, account: String },
    #[error("Failed to build instruction: {0}")]
    Instruction(String),
    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

/// Returned by an external signer when it does not produce a signature.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("signer refused: {0}")]
pub struct SignerError(pub String);

/// Failures while moving a built transaction to a terminal state.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SubmitError {
    #[error("SignerDeclined")]
    SignerDeclined,
    #[error("Failed to serialize transaction: {0}")]
    Serialization(String),
    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Invalid address")]
    InvalidAddress,
    #[error("No historical data found")]
    NoData,
    #[error("Upstream node failure: {0}")]
    Upstream(String),
    #[error("Internal server error")]
    Internal,
}

impl From<GatewayError> for ApiError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::InvalidAddress(_) => ApiError::InvalidAddress,
            GatewayError::NotFound(_) => ApiError::NoData,
            other => ApiError::Upstream(other.to_string()),
        }
    }
}
