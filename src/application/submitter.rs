use crate::domain::{
    errors::{GatewayError, SubmitError},
    models::{BuiltTransaction, TransactionOutcome, TransactionSigner},
};
use crate::infrastructure::bc_client::BcClient;
use solana_sdk::{signature::Signature, transaction::Transaction};
use typed_builder::TypedBuilder;

/// Lifecycle of one transaction attempt.
///
/// `Built → Signed → Submitted → Confirmed | TimedOut`, with `Failed` reachable from every
/// non-terminal state. Once `Submitted` the write has left the process and cannot be recalled.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SubmissionState {
    Built,
    Signed,
    Submitted(Signature),
    Confirmed(Signature),
    TimedOut(Signature),
    Failed(String),
}

impl SubmissionState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SubmissionState::Confirmed(_) | SubmissionState::TimedOut(_) | SubmissionState::Failed(_)
        )
    }

    fn signature(&self) -> Option<Signature> {
        match self {
            SubmissionState::Submitted(sig)
            | SubmissionState::Confirmed(sig)
            | SubmissionState::TimedOut(sig) => Some(*sig),
            _ => None,
        }
    }
}

/// A single in-flight attempt. Retrying means building a new transaction with a fresh
/// blockhash, never resubmitting this one.
struct SubmissionAttempt {
    transaction: Transaction,
    state: SubmissionState,
}

impl SubmissionAttempt {
    fn new(transaction: Transaction) -> Self {
        Self {
            transaction,
            state: SubmissionState::Built,
        }
    }

    fn transition(&mut self, next: SubmissionState) {
        tracing::debug!("Submission state {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    async fn sign(&mut self, signer: Option<&dyn TransactionSigner>) -> Result<(), SubmitError> {
        let signer = signer.ok_or(SubmitError::SignerDeclined)?;
        let signed = signer
            .sign(self.transaction.clone())
            .await
            .map_err(|e| {
                tracing::warn!("Signer declined: {}", e);
                SubmitError::SignerDeclined
            })?;

        if !signed.is_signed() {
            tracing::warn!("Signer returned a transaction missing signatures");
            return Err(SubmitError::SignerDeclined);
        }

        self.transaction = signed;
        self.transition(SubmissionState::Signed);
        Ok(())
    }

    async fn submit<C: BcClient>(&mut self, bc_client: &C) -> Result<Signature, SubmitError> {
        let bytes = bincode::serialize(&self.transaction)
            .map_err(|e| SubmitError::Serialization(e.to_string()))?;
        let signature = bc_client.submit_signed_transaction(bytes).await?;
        self.transition(SubmissionState::Submitted(signature));
        Ok(signature)
    }

    async fn confirm<C: BcClient>(
        &mut self,
        bc_client: &C,
        signature: Signature,
    ) -> Result<(), SubmitError> {
        match bc_client.confirm_transaction(&signature).await {
            Ok(()) => {
                self.transition(SubmissionState::Confirmed(signature));
                Ok(())
            }
            Err(e @ GatewayError::ConfirmationTimeout(_)) => {
                self.transition(SubmissionState::TimedOut(signature));
                Err(e.into())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn drive<C: BcClient>(
        &mut self,
        bc_client: &C,
        signer: Option<&dyn TransactionSigner>,
    ) -> Result<Signature, SubmitError> {
        self.sign(signer).await?;
        let signature = self.submit(bc_client).await?;
        self.confirm(bc_client, signature).await?;
        Ok(signature)
    }
}

/// Hands built transactions to an external signer, relays them to the node and waits for
/// confirmation. Never fails past its own boundary: every outcome is a [`TransactionOutcome`].
#[derive(Clone, TypedBuilder)]
pub struct TransactionSubmitter<C> {
    bc_client: C,
}

impl<C> TransactionSubmitter<C>
where
    C: BcClient + Send + Sync,
{
    pub async fn submit(
        &self,
        built: BuiltTransaction,
        signer: Option<&dyn TransactionSigner>,
        success_message: &str,
    ) -> TransactionOutcome {
        self.submit_tracked(built, signer, success_message).await.1
    }

    /// Like [`Self::submit`], also returning the terminal state the attempt ended in.
    pub async fn submit_tracked(
        &self,
        built: BuiltTransaction,
        signer: Option<&dyn TransactionSigner>,
        success_message: &str,
    ) -> (SubmissionState, TransactionOutcome) {
        let mut attempt = SubmissionAttempt::new(built.transaction);

        let outcome = match attempt.drive(&self.bc_client, signer).await {
            Ok(signature) => {
                tracing::info!("Transaction {} confirmed", signature);
                TransactionOutcome::success(success_message, signature.to_string())
            }
            Err(e) => {
                tracing::error!("Transaction attempt failed: {}", e);
                let mut outcome = TransactionOutcome::failure(&e);
                outcome.signature = attempt.state.signature().map(|sig| sig.to_string());
                if !attempt.state.is_terminal() {
                    attempt.transition(SubmissionState::Failed(e.to_string()));
                }
                outcome
            }
        };

        let outcome = outcome.with_token_account(built.target_account);
        (attempt.state, outcome)
    }
}
