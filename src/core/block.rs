//! Blocks: proof-of-work mining, header validation, and execution.
//!
//! A block commits to its parent header, its transaction series (via a trie
//! root), and the state root its miner observed. The proof of work seals the
//! header minus the nonce: the canonical hash of that truncated header is
//! concatenated with the nonce and hashed again, and the result must fall at
//! or below the target derived from the parent's difficulty.

use crate::core::transaction::{self, Transaction, TransactionError};
use crate::crypto::key_pair::Address;
use crate::storage::state::State;
use crate::storage::trie::Trie;
use crate::types::hash::{canonical_hash, Digest};
use rand_core::{OsRng, RngCore};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

/// Target time between blocks, in milliseconds. Difficulty retargets toward
/// this on every mined block.
pub const MINE_RATE: u64 = 13_000;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Header {
    pub parent_hash: Digest,
    pub beneficiary: Address,
    pub difficulty: u64,
    pub number: u64,
    pub timestamp: u64,
    pub transaction_root: Digest,
    pub state_root: Digest,
    pub nonce: u64,
}

/// The header fields sealed by the proof of work. Field names must stay in
/// sync with [`Header`] minus `nonce`.
#[derive(Serialize)]
struct TruncatedHeader<'a> {
    parent_hash: Digest,
    beneficiary: &'a Address,
    difficulty: u64,
    number: u64,
    timestamp: u64,
    transaction_root: Digest,
    state_root: Digest,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub header: Header,
    pub transaction_series: Vec<Transaction>,
}

#[derive(Debug, Error, PartialEq)]
pub enum BlockError {
    #[error("block does not match the canonical genesis block")]
    GenesisMismatch,
    #[error("parent hash does not match the preceding block's header")]
    ParentHashMismatch,
    #[error("block number {actual} is not sequential, expected {expected}")]
    NumberNotSequential { expected: u64, actual: u64 },
    #[error("difficulty jumped from {parent} to {block}")]
    DifficultyJumpTooLarge { parent: u64, block: u64 },
    #[error("transaction root does not match the block's transaction series")]
    TransactionRootMismatch,
    #[error("block hash does not meet the proof-of-work target")]
    ProofOfWorkNotMet,
    #[error("gave up mining after {0} attempts")]
    MiningAttemptsExhausted(u64),
    #[error("mining task was interrupted")]
    MiningInterrupted,
    #[error(transparent)]
    Transaction(#[from] TransactionError),
}

impl Block {
    /// The fixed first block every chain starts from.
    pub fn genesis() -> Block {
        Block {
            header: Header {
                parent_hash: Digest::zero(),
                beneficiary: Address::none(),
                difficulty: 1,
                number: 0,
                timestamp: 0,
                transaction_root: Digest::zero(),
                state_root: Digest::zero(),
                nonce: 0,
            },
            transaction_series: Vec::new(),
        }
    }

    /// Mines the successor of `last` with OS randomness and no attempt cap.
    pub fn mine(
        last: &Block,
        beneficiary: &Address,
        series: Vec<Transaction>,
        state_root: Digest,
    ) -> Result<Block, BlockError> {
        Block::mine_with(last, beneficiary, series, state_root, &mut OsRng, None)
    }

    /// Mines the successor of `last`, drawing nonces from `rng`.
    ///
    /// A mining reward for `beneficiary` is appended to `series` before the
    /// transaction root is computed. With `max_attempts` set, gives up with
    /// [`BlockError::MiningAttemptsExhausted`] once that many nonces failed.
    pub fn mine_with(
        last: &Block,
        beneficiary: &Address,
        mut series: Vec<Transaction>,
        state_root: Digest,
        rng: &mut impl RngCore,
        max_attempts: Option<u64>,
    ) -> Result<Block, BlockError> {
        series.push(Transaction::mining_reward(beneficiary));
        let transaction_root = Trie::from_items(&series).root_hash();
        let parent_hash = canonical_hash(&last.header);
        let number = last.header.number + 1;
        let target = calculate_target(last);

        let mut attempts = 0u64;
        loop {
            if let Some(cap) = max_attempts {
                if attempts >= cap {
                    return Err(BlockError::MiningAttemptsExhausted(cap));
                }
            }
            attempts += 1;

            // Timestamp and difficulty are re-derived every attempt so a long
            // search still seals an honest timestamp.
            let timestamp = now_millis();
            let difficulty = adjust_difficulty(last, timestamp);
            let truncated = TruncatedHeader {
                parent_hash,
                beneficiary,
                difficulty,
                number,
                timestamp,
                transaction_root,
                state_root,
            };
            let header_digest = canonical_hash(&truncated);
            let nonce = rng.next_u64();
            if seal_digest(header_digest, nonce) <= target {
                return Ok(Block {
                    header: Header {
                        parent_hash,
                        beneficiary: beneficiary.clone(),
                        difficulty,
                        number,
                        timestamp,
                        transaction_root,
                        state_root,
                        nonce,
                    },
                    transaction_series: series,
                });
            }
        }
    }

    /// Validates `block` as the successor of `last`, or as genesis when
    /// `last` is `None`. Side-effect free; checks run in a fixed order and
    /// the first failure wins.
    pub fn validate(last: Option<&Block>, block: &Block, state: &State) -> Result<(), BlockError> {
        let Some(last) = last else {
            if canonical_hash(block) == canonical_hash(&Block::genesis()) {
                return Ok(());
            }
            return Err(BlockError::GenesisMismatch);
        };

        if block.header.parent_hash != canonical_hash(&last.header) {
            return Err(BlockError::ParentHashMismatch);
        }
        let expected = last.header.number + 1;
        if block.header.number != expected {
            return Err(BlockError::NumberNotSequential {
                expected,
                actual: block.header.number,
            });
        }
        if last.header.difficulty.abs_diff(block.header.difficulty) > 1 {
            return Err(BlockError::DifficultyJumpTooLarge {
                parent: last.header.difficulty,
                block: block.header.difficulty,
            });
        }
        let rebuilt_root = Trie::from_items(&block.transaction_series).root_hash();
        if block.header.transaction_root != rebuilt_root {
            return Err(BlockError::TransactionRootMismatch);
        }

        let truncated = TruncatedHeader {
            parent_hash: block.header.parent_hash,
            beneficiary: &block.header.beneficiary,
            difficulty: block.header.difficulty,
            number: block.header.number,
            timestamp: block.header.timestamp,
            transaction_root: block.header.transaction_root,
            state_root: block.header.state_root,
        };
        let header_digest = canonical_hash(&truncated);
        if seal_digest(header_digest, block.header.nonce) > calculate_target(last) {
            return Err(BlockError::ProofOfWorkNotMet);
        }

        transaction::validate_series(&block.transaction_series, state)?;
        Ok(())
    }

    /// Applies every transaction in the block to `state`, in series order.
    pub fn run(block: &Block, state: &mut State) -> Result<(), BlockError> {
        transaction::run_series(&block.transaction_series, state)?;
        Ok(())
    }
}

/// The digest a nonce seals: hash of the truncated-header digest concatenated
/// with the nonce's decimal rendering.
fn seal_digest(header_digest: Digest, nonce: u64) -> Digest {
    canonical_hash(&format!("{header_digest}{nonce}"))
}

/// The proof-of-work target for the successor of `last`: the maximum 256-bit
/// value divided by the parent's difficulty. Difficulty 0 degenerates to the
/// loosest possible target.
pub fn calculate_target(last: &Block) -> Digest {
    let difficulty = last.header.difficulty as u128;
    if difficulty == 0 {
        return Digest::max();
    }
    // Big-endian long division of 2^256 - 1 by the difficulty, one 64-bit
    // limb at a time.
    let mut bytes = [0u8; 32];
    let mut remainder = 0u128;
    for limb in 0..4 {
        let current = (remainder << 64) | u64::MAX as u128;
        let quotient = (current / difficulty) as u64;
        remainder = current % difficulty;
        bytes[limb * 8..(limb + 1) * 8].copy_from_slice(&quotient.to_be_bytes());
    }
    Digest(bytes)
}

/// Retargets difficulty toward [`MINE_RATE`]: one step down (floored at 1)
/// when the parent-to-child gap exceeds the rate, one step up otherwise.
pub fn adjust_difficulty(last: &Block, timestamp: u64) -> u64 {
    let elapsed = timestamp.saturating_sub(last.header.timestamp);
    if elapsed > MINE_RATE {
        last.header.difficulty.saturating_sub(1).max(1)
    } else {
        last.header.difficulty.saturating_add(1)
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock is set before the unix epoch")
        .as_millis() as u64
}
