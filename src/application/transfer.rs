use crate::domain::{
    amount::to_raw_amount,
    errors::{GatewayError, TransferError},
    models::{AccountCreation, BuiltTransaction, TransferRequest},
};
use crate::infrastructure::bc_client::{parse_address, BcClient};
use solana_sdk::{
    instruction::Instruction, message::Message, pubkey::Pubkey, transaction::Transaction,
};
use spl_associated_token_account::{
    get_associated_token_address, instruction::create_associated_token_account_idempotent,
};
use typed_builder::TypedBuilder;

/// Outcome of resolving one wallet's holding account for a mint.
#[derive(Clone, Debug)]
pub enum AccountResolution {
    /// The account is already on chain
    Existing(Pubkey),
    /// The account is missing and the returned transaction creates it
    ToCreate(BuiltTransaction),
}

/// Assembles unsigned token transactions.
///
/// Every step reads the gateway in order: mint decimals before amount conversion, account
/// resolution before instruction assembly, and the blockhash last so it is as fresh as possible
/// when handed to the signer. Failures propagate unchanged.
#[derive(Clone, TypedBuilder)]
pub struct TransferBuilder<C> {
    bc_client: C,
}

fn parse_party(text: &str) -> Result<Pubkey, TransferError> {
    parse_address(text).map_err(|e| match e {
        GatewayError::InvalidAddress(msg) => TransferError::InvalidAddress(msg),
        other => TransferError::Gateway(other),
    })
}

impl<C> TransferBuilder<C>
where
    C: BcClient + Send + Sync,
{
    /// Builds an unsigned transfer of `request.ui_amount` from the sender's holding account to
    /// the recipient's.
    ///
    /// With [`AccountCreation::CreateIfMissing`] a missing holding account (the recipient's, or
    /// the sender's) is created inside the same transaction and its rent is charged to the
    /// sender. The accounts that will be created are listed in
    /// [`BuiltTransaction::created_accounts`].
    pub async fn build_transfer(
        &self,
        request: &TransferRequest,
        creation: AccountCreation,
    ) -> Result<BuiltTransaction, TransferError> {
        let sender = parse_party(&request.sender)?;
        let recipient = parse_party(&request.recipient)?;
        let mint = parse_party(&request.mint)?;

        let descriptor = self.bc_client.get_mint_descriptor(&mint).await?;
        let raw_amount = to_raw_amount(request.ui_amount, descriptor.decimals)?;

        let sender_account = get_associated_token_address(&sender, &mint);
        let recipient_account = get_associated_token_address(&recipient, &mint);
        let mut parties = vec![(sender, sender_account)];
        if recipient_account != sender_account {
            parties.push((recipient, recipient_account));
        }

        let mut instructions = Vec::with_capacity(3);
        let mut created_accounts = Vec::new();
        for (owner, account) in parties {
            if let Some(create) = self
                .creation_instruction(&sender, &owner, &account, &mint, creation)
                .await?
            {
                instructions.push(create);
                created_accounts.push(account);
            }
        }

        let transfer = spl_token::instruction::transfer(
            &spl_token::id(),
            &sender_account,
            &recipient_account,
            &sender,
            &[],
            raw_amount,
        )
        .map_err(|e| TransferError::Instruction(e.to_string()))?;
        instructions.push(transfer);

        let transaction = self.assemble(&instructions, &sender).await?;

        tracing::info!(
            "Built transfer of {} base units of {} from {} to {} ({} account(s) to create)",
            raw_amount,
            mint,
            sender_account,
            recipient_account,
            created_accounts.len()
        );

        Ok(BuiltTransaction {
            transaction,
            raw_amount,
            target_account: recipient_account,
            created_accounts,
        })
    }

    /// Resolves `owner`'s holding account for `mint`, building a creation transaction paid by
    /// the owner when it does not exist yet.
    pub async fn build_create_account(
        &self,
        owner: &str,
        mint: &str,
    ) -> Result<AccountResolution, TransferError> {
        let owner = parse_party(owner)?;
        let mint = parse_party(mint)?;

        // Fails with NotFound before anything is built for a mint that does not exist.
        self.bc_client.get_mint_descriptor(&mint).await?;

        let account = get_associated_token_address(&owner, &mint);
        if self.bc_client.account_exists(&account).await? {
            tracing::info!("Holding account {} already exists", account);
            return Ok(AccountResolution::Existing(account));
        }

        let instruction =
            create_associated_token_account_idempotent(&owner, &owner, &mint, &spl_token::id());
        let transaction = self.assemble(&[instruction], &owner).await?;

        Ok(AccountResolution::ToCreate(BuiltTransaction {
            transaction,
            raw_amount: 0,
            target_account: account,
            created_accounts: vec![account],
        }))
    }

    /// Returns the instruction creating `account` for `owner`, funded by `payer`, or `None` when
    /// the account already exists.
    async fn creation_instruction(
        &self,
        payer: &Pubkey,
        owner: &Pubkey,
        account: &Pubkey,
        mint: &Pubkey,
        creation: AccountCreation,
    ) -> Result<Option<Instruction>, TransferError> {
        if self.bc_client.account_exists(account).await? {
            return Ok(None);
        }

        match creation {
            AccountCreation::CreateIfMissing => {
                tracing::warn!(
                    "Holding account {} of {} is missing, {} will pay for its creation",
                    account,
                    owner,
                    payer
                );
                Ok(Some(create_associated_token_account_idempotent(
                    payer,
                    owner,
                    mint,
                    &spl_token::id(),
                )))
            }
            AccountCreation::RequireExisting => Err(TransferError::AccountMissing {
                owner: owner.to_string(),
                account: account.to_string(),
            }),
        }
    }

    async fn assemble(
        &self,
        instructions: &[Instruction],
        fee_payer: &Pubkey,
    ) -> Result<Transaction, TransferError> {
        let blockhash = self.bc_client.get_latest_blockhash().await?;
        let message = Message::new_with_blockhash(instructions, Some(fee_payer), &blockhash);
        Ok(Transaction::new_unsigned(message))
    }
}
