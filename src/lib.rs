//! A minimal account-based proof-of-work blockchain.
//!
//! Provides the consensus and execution core: canonical structural hashing, a
//! merkle-hashed trie backing both account state and contract storage, a
//! stack-machine contract interpreter with gas metering, transaction
//! validation and execution, proof-of-work mining with difficulty
//! retargeting, and all-or-nothing chain replacement.

pub mod core;
pub mod crypto;
pub mod node;
pub mod storage;
pub mod types;
pub mod utils;
pub mod virtual_machine;
