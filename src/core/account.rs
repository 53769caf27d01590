//! Accounts: local key-holding identities and their on-chain records.
//!
//! An [`Account`] lives on the node and owns a private key. Its on-chain
//! projection is an [`AccountRecord`]: the serializable balance/code entry
//! stored in the state trie. Contract accounts carry their code inline along
//! with a commitment to it.

use crate::crypto::key_pair::{Address, KeyPair, Signature};
use crate::types::hash::{canonical_hash, Digest};
use crate::virtual_machine::isa::Word;
use serde::{Deserialize, Serialize};

/// Balance granted to every newly registered account.
pub const STARTING_BALANCE: u64 = 1_000;

/// The on-chain state of one account.
///
/// `deny_unknown_fields` so records smuggled in through CREATE_ACCOUNT
/// transactions cannot carry extra payload.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AccountRecord {
    pub address: Address,
    pub balance: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<Vec<Word>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_hash: Option<Digest>,
    /// Root of the account's storage trie as of the last state write. Stamped
    /// by the state layer, never set by hand.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_root: Option<Digest>,
}

impl AccountRecord {
    /// Whether this record carries contract code.
    pub fn is_contract(&self) -> bool {
        self.code.is_some()
    }
}

/// A local identity: key pair plus optional contract code.
#[derive(Clone)]
pub struct Account {
    key_pair: KeyPair,
    code: Option<Vec<Word>>,
}

impl Account {
    /// A plain account with a fresh random key.
    pub fn new() -> Account {
        Account {
            key_pair: KeyPair::new(),
            code: None,
        }
    }

    /// A contract account carrying `code`.
    pub fn with_code(code: Vec<Word>) -> Account {
        Account {
            key_pair: KeyPair::new(),
            code: Some(code),
        }
    }

    pub fn address(&self) -> Address {
        self.key_pair.address()
    }

    /// Signs the canonical hash of `payload` with this account's key.
    pub fn sign<T: Serialize>(&self, payload: &T) -> Signature {
        self.key_pair.sign(payload)
    }

    /// The on-chain record registering this account would create.
    pub fn snapshot(&self) -> AccountRecord {
        AccountRecord {
            address: self.address(),
            balance: STARTING_BALANCE,
            code: self.code.clone(),
            code_hash: self.code.as_ref().map(canonical_hash),
            storage_root: None,
        }
    }
}

impl Default for Account {
    fn default() -> Account {
        Account::new()
    }
}
