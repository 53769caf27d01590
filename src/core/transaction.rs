//! Transactions: construction, validation, and execution against state.
//!
//! Three kinds exist. `TRANSACT` moves value between registered accounts and
//! runs the recipient's code when it has any. `CREATE_ACCOUNT` registers a new
//! account record. `MINING_REWARD` credits a block's beneficiary and is only
//! ever injected by the miner.
//!
//! Validation is side-effect free; contract calls are dry-run against a
//! scratch copy of the recipient's storage. Execution is not: a contract
//! fault during [`run`] keeps every storage write made before the fault.

use crate::core::account::{Account, AccountRecord};
use crate::crypto::key_pair::{verify_signature, Address, Signature};
use crate::storage::state::State;
use crate::virtual_machine::errors::VmError;
use crate::virtual_machine::interpreter::Interpreter;
use rand_core::{OsRng, RngCore};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Amount credited to the beneficiary of every mined block.
pub const MINING_REWARD: u64 = 50;

/// Kind-specific payload, tagged on the wire as `"type"`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionData {
    CreateAccount { account_data: AccountRecord },
    Transact,
    MiningReward,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    pub from: Address,
    pub to: Address,
    pub value: u64,
    #[serde(default)]
    pub gas_limit: u64,
    pub data: TransactionData,
    pub signature: Option<Signature>,
}

/// The signed portion of a transaction. Field names must stay in sync with
/// [`Transaction`] so signatures cover exactly the non-signature fields.
#[derive(Serialize)]
struct UnsignedTransaction<'a> {
    id: &'a str,
    from: &'a Address,
    to: &'a Address,
    value: u64,
    gas_limit: u64,
    data: &'a TransactionData,
}

impl Transaction {
    /// A signed value transfer from `sender` to `to`.
    pub fn transfer(sender: &Account, to: &Address, value: u64, gas_limit: u64) -> Transaction {
        let mut transaction = Transaction {
            id: random_id(),
            from: sender.address(),
            to: to.clone(),
            value,
            gas_limit,
            data: TransactionData::Transact,
            signature: None,
        };
        transaction.signature = Some(sender.sign(&transaction.unsigned()));
        transaction
    }

    /// An unsigned registration of `account`'s on-chain record.
    pub fn create_account(account: &Account) -> Transaction {
        Transaction {
            id: random_id(),
            from: Address::none(),
            to: Address::none(),
            value: 0,
            gas_limit: 0,
            data: TransactionData::CreateAccount {
                account_data: account.snapshot(),
            },
            signature: None,
        }
    }

    /// The miner-injected reward for `beneficiary`.
    pub fn mining_reward(beneficiary: &Address) -> Transaction {
        Transaction {
            id: random_id(),
            from: Address::none(),
            to: beneficiary.clone(),
            value: MINING_REWARD,
            gas_limit: 0,
            data: TransactionData::MiningReward,
            signature: None,
        }
    }

    fn unsigned(&self) -> UnsignedTransaction<'_> {
        UnsignedTransaction {
            id: &self.id,
            from: &self.from,
            to: &self.to,
            value: self.value,
            gas_limit: self.gas_limit,
            data: &self.data,
        }
    }
}

/// A fresh random transaction id: 16 bytes of OS entropy, hex encoded.
fn random_id() -> String {
    let mut bytes = [0u8; 16];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

#[derive(Debug, Error, PartialEq)]
pub enum TransactionError {
    #[error("transaction {0} has a missing or invalid signature")]
    InvalidSignature(String),
    #[error("amount {amount} exceeds balance {balance}")]
    InsufficientBalance { amount: u64, balance: u64 },
    #[error("no account registered at address {0}")]
    UnknownAccount(Address),
    #[error("transaction to contract {0} carries no gas")]
    InsufficientGas(Address),
    #[error("contract used {gas_used} gas, limit was {gas_limit}")]
    GasExhausted { gas_used: u64, gas_limit: u64 },
    #[error("account data is malformed")]
    MalformedAccountData,
    #[error("mining reward must be {expected}, found {actual}")]
    RewardMismatch { expected: u64, actual: u64 },
    #[error(transparent)]
    Vm(#[from] VmError),
}

/// Validates a `TRANSACT` transaction against current state.
///
/// Checks, in order: the signature covers the unsigned fields, the sender can
/// afford value plus gas limit, the recipient is registered, and a contract
/// recipient's code completes within the gas limit when dry-run against a
/// scratch copy of its storage. Leaves `state` untouched.
pub fn validate_transfer(transaction: &Transaction, state: &State) -> Result<(), TransactionError> {
    let Some(signature) = &transaction.signature else {
        return Err(TransactionError::InvalidSignature(transaction.id.clone()));
    };
    if !verify_signature(&transaction.from, &transaction.unsigned(), signature) {
        return Err(TransactionError::InvalidSignature(transaction.id.clone()));
    }

    let balance = state
        .get_account(&transaction.from)
        .map(|record| record.balance)
        .unwrap_or(0);
    let amount = transaction.value.saturating_add(transaction.gas_limit);
    if amount > balance {
        return Err(TransactionError::InsufficientBalance { amount, balance });
    }

    let recipient = state
        .get_account(&transaction.to)
        .ok_or_else(|| TransactionError::UnknownAccount(transaction.to.clone()))?;

    if let Some(code) = &recipient.code {
        if transaction.gas_limit == 0 {
            return Err(TransactionError::InsufficientGas(transaction.to.clone()));
        }
        let mut scratch = state
            .storage_trie(&transaction.to)
            .cloned()
            .unwrap_or_default();
        let outcome = Interpreter::with_storage(&mut scratch).run(code)?;
        if outcome.gas_used > transaction.gas_limit {
            return Err(TransactionError::GasExhausted {
                gas_used: outcome.gas_used,
                gas_limit: transaction.gas_limit,
            });
        }
    }
    Ok(())
}

/// Validates a `CREATE_ACCOUNT` transaction's embedded record.
pub fn validate_create_account(transaction: &Transaction) -> Result<(), TransactionError> {
    let TransactionData::CreateAccount { account_data } = &transaction.data else {
        return Err(TransactionError::MalformedAccountData);
    };
    // Storage roots are stamped by the state layer, never supplied.
    if account_data.storage_root.is_some() {
        return Err(TransactionError::MalformedAccountData);
    }
    match (&account_data.code, &account_data.code_hash) {
        (None, None) => Ok(()),
        (Some(code), Some(hash)) if *hash == crate::types::hash::canonical_hash(code) => Ok(()),
        _ => Err(TransactionError::MalformedAccountData),
    }
}

/// Validates a `MINING_REWARD` transaction.
pub fn validate_mining_reward(transaction: &Transaction) -> Result<(), TransactionError> {
    if transaction.value != MINING_REWARD {
        return Err(TransactionError::RewardMismatch {
            expected: MINING_REWARD,
            actual: transaction.value,
        });
    }
    Ok(())
}

/// Validates every transaction in a block's series, short-circuiting on the
/// first failure.
pub fn validate_series(series: &[Transaction], state: &State) -> Result<(), TransactionError> {
    for transaction in series {
        match &transaction.data {
            TransactionData::Transact => validate_transfer(transaction, state)?,
            TransactionData::CreateAccount { .. } => validate_create_account(transaction)?,
            TransactionData::MiningReward => validate_mining_reward(transaction)?,
        }
    }
    Ok(())
}

/// Applies `transaction` to `state`, returning the gas consumed.
///
/// Callers are expected to have validated first. Execution is not
/// transactional: a contract fault propagates as an error but every state
/// write made before the fault stays.
pub fn run(transaction: &Transaction, state: &mut State) -> Result<u64, TransactionError> {
    match &transaction.data {
        TransactionData::CreateAccount { account_data } => {
            state.put_account(&account_data.address, account_data.clone());
            Ok(0)
        }
        TransactionData::MiningReward => {
            let mut beneficiary = state.get_account(&transaction.to).unwrap_or(AccountRecord {
                address: transaction.to.clone(),
                balance: 0,
                code: None,
                code_hash: None,
                storage_root: None,
            });
            beneficiary.balance = beneficiary.balance.saturating_add(transaction.value);
            state.put_account(&transaction.to, beneficiary);
            Ok(0)
        }
        TransactionData::Transact => run_transfer(transaction, state),
    }
}

/// Applies a series in list order. Not transactional: a failure partway
/// through leaves the effects of earlier transactions in place.
pub fn run_series(series: &[Transaction], state: &mut State) -> Result<(), TransactionError> {
    for transaction in series {
        run(transaction, state)?;
    }
    Ok(())
}

fn run_transfer(transaction: &Transaction, state: &mut State) -> Result<u64, TransactionError> {
    let mut sender = state
        .get_account(&transaction.from)
        .ok_or_else(|| TransactionError::UnknownAccount(transaction.from.clone()))?;
    let mut recipient = state
        .get_account(&transaction.to)
        .ok_or_else(|| TransactionError::UnknownAccount(transaction.to.clone()))?;

    sender.balance =
        sender
            .balance
            .checked_sub(transaction.value)
            .ok_or(TransactionError::InsufficientBalance {
                amount: transaction.value,
                balance: sender.balance,
            })?;
    recipient.balance = recipient.balance.saturating_add(transaction.value);
    let code = recipient.code.clone();
    state.put_account(&transaction.from, sender);
    state.put_account(&transaction.to, recipient);

    let Some(code) = code else {
        return Ok(0);
    };

    // A fault here aborts before the gas settlement below, leaving the
    // recipient's stamped storage root stale relative to its storage trie.
    let storage = state.storage_trie_mut(&transaction.to);
    let outcome = Interpreter::with_storage(storage).run(&code)?;

    let mut sender = state
        .get_account(&transaction.from)
        .ok_or_else(|| TransactionError::UnknownAccount(transaction.from.clone()))?;
    sender.balance = sender.balance.saturating_sub(outcome.gas_used);
    state.put_account(&transaction.from, sender);

    let mut recipient = state
        .get_account(&transaction.to)
        .ok_or_else(|| TransactionError::UnknownAccount(transaction.to.clone()))?;
    recipient.balance = recipient.balance.saturating_add(outcome.gas_used);
    state.put_account(&transaction.to, recipient);

    Ok(outcome.gas_used)
}
