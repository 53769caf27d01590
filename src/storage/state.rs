//! World state: account records plus per-contract storage tries.
//!
//! The account trie maps addresses to serialized [`AccountRecord`]s; each
//! account additionally owns a storage trie that contract code reads and
//! writes through `STORE`/`LOAD`. Writing an account record stamps the
//! *current* root of its storage trie into the record, so the stamped root is
//! only as fresh as the last [`State::put_account`] call.

use crate::core::account::AccountRecord;
use crate::crypto::key_pair::Address;
use crate::storage::trie::Trie;
use crate::types::hash::{to_json, Digest};
use std::collections::HashMap;

/// Account state and contract storage for one chain.
#[derive(Clone, Debug, Default)]
pub struct State {
    accounts: Trie,
    storage: HashMap<Address, Trie>,
}

impl State {
    /// Creates an empty state with no accounts.
    pub fn new() -> State {
        State::default()
    }

    /// Writes `record` under `address`, stamping the current root of the
    /// address's storage trie into the record first. The storage trie is
    /// created empty if the account never had one.
    pub fn put_account(&mut self, address: &Address, mut record: AccountRecord) {
        let storage = self.storage.entry(address.clone()).or_default();
        record.storage_root = Some(storage.root_hash());
        self.accounts.put(address.as_str(), to_json(&record));
    }

    /// Reads the account record stored under `address`, if any.
    pub fn get_account(&self, address: &Address) -> Option<AccountRecord> {
        let value = self.accounts.get(address.as_str())?;
        serde_json::from_value(value).ok()
    }

    /// Root commitment over every account record.
    pub fn state_root(&self) -> Digest {
        self.accounts.root_hash()
    }

    /// The storage trie for `address`, if the account has ever been written.
    pub fn storage_trie(&self, address: &Address) -> Option<&Trie> {
        self.storage.get(address)
    }

    /// Mutable storage trie for `address`, created empty on first access.
    pub fn storage_trie_mut(&mut self, address: &Address) -> &mut Trie {
        self.storage.entry(address.clone()).or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::account::Account;
    use serde_json::json;

    #[test]
    fn put_then_get_roundtrips_the_record() {
        let mut state = State::new();
        let account = Account::new();
        let address = account.address();
        state.put_account(&address, account.snapshot());

        let fetched = state.get_account(&address).expect("stored account");
        assert_eq!(fetched.address, address);
        assert_eq!(fetched.balance, crate::core::account::STARTING_BALANCE);
    }

    #[test]
    fn get_returns_none_for_unknown_address() {
        let state = State::new();
        assert_eq!(state.get_account(&Account::new().address()), None);
    }

    #[test]
    fn put_account_stamps_the_storage_root() {
        let mut state = State::new();
        let account = Account::new();
        let address = account.address();
        state.put_account(&address, account.snapshot());

        let empty_root = Trie::new().root_hash();
        let fetched = state.get_account(&address).expect("stored account");
        assert_eq!(fetched.storage_root, Some(empty_root));
    }

    #[test]
    fn stamped_root_reflects_storage_at_write_time() {
        let mut state = State::new();
        let account = Account::new();
        let address = account.address();
        state.put_account(&address, account.snapshot());

        // Mutating storage after the write leaves the stamped root stale
        // until the account is written again.
        state.storage_trie_mut(&address).put("key", json!("value"));
        let stale = state.get_account(&address).expect("stored account");
        assert_eq!(stale.storage_root, Some(Trie::new().root_hash()));

        state.put_account(&address, stale);
        let fresh = state.get_account(&address).expect("stored account");
        assert_ne!(fresh.storage_root, Some(Trie::new().root_hash()));
    }

    #[test]
    fn state_root_changes_with_every_account_write() {
        let mut state = State::new();
        let empty = state.state_root();
        state.put_account(&Account::new().address(), Account::new().snapshot());
        assert_ne!(state.state_root(), empty);
    }

    #[test]
    fn storage_trie_is_lazily_created() {
        let mut state = State::new();
        let address = Account::new().address();
        assert!(state.storage_trie(&address).is_none());
        state.storage_trie_mut(&address);
        assert!(state.storage_trie(&address).is_some());
    }
}
