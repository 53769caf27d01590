//! The chain itself: an ordered block list plus the state it produces.
//!
//! State is never rebuilt from scratch on [`Blockchain::add_block`]; each
//! accepted block's transactions are applied on top of the state the previous
//! blocks left behind. [`Blockchain::replace_chain`] is the exception: a
//! candidate chain is replayed into a fresh state and nothing local changes
//! unless the whole candidate checks out.

use crate::core::block::{Block, BlockError};
use crate::info;
use crate::storage::state::State;
use crate::storage::txpool::TransactionQueue;
use crate::types::hash::Digest;

#[derive(Debug)]
pub struct Blockchain {
    chain: Vec<Block>,
    state: State,
}

impl Blockchain {
    /// A chain holding only the genesis block, with empty state.
    pub fn new() -> Blockchain {
        Blockchain {
            chain: vec![Block::genesis()],
            state: State::new(),
        }
    }

    pub fn last_block(&self) -> &Block {
        // The chain always holds at least genesis.
        self.chain.last().expect("chain is never empty")
    }

    pub fn chain(&self) -> &[Block] {
        &self.chain
    }

    pub fn block_at(&self, number: u64) -> Option<&Block> {
        self.chain.get(number as usize)
    }

    pub fn len(&self) -> usize {
        self.chain.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chain.is_empty()
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    pub fn state_root(&self) -> Digest {
        self.state.state_root()
    }

    /// Validates `block` against the tip, applies its transactions, appends
    /// it, and drops its transactions from `queue`. On any error the chain
    /// is unchanged, though a transaction that faults mid-run has already
    /// written state.
    pub fn add_block(
        &mut self,
        block: Block,
        queue: &TransactionQueue,
    ) -> Result<(), BlockError> {
        Block::validate(Some(self.last_block()), &block, &self.state)?;
        Block::run(&block, &mut self.state)?;
        queue.clear_block_transactions(&block.transaction_series);
        info!(
            "accepted block {} with {} transaction(s)",
            block.header.number,
            block.transaction_series.len()
        );
        self.chain.push(block);
        Ok(())
    }

    /// Replaces this chain with `candidate` if every block in it validates
    /// and runs, genesis included. All or nothing: on any failure the
    /// current chain and state stay exactly as they were.
    pub fn replace_chain(&mut self, candidate: Vec<Block>) -> Result<(), BlockError> {
        let mut state = State::new();
        for (index, block) in candidate.iter().enumerate() {
            let parent = if index == 0 {
                None
            } else {
                candidate.get(index - 1)
            };
            Block::validate(parent, block, &state)?;
            Block::run(block, &mut state)?;
            info!("validated block {} of candidate chain", block.header.number);
        }
        self.chain = candidate;
        self.state = state;
        Ok(())
    }
}

impl Default for Blockchain {
    fn default() -> Blockchain {
        Blockchain::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::account::Account;
    use crate::core::transaction::{Transaction, MINING_REWARD};

    fn mine_next(blockchain: &Blockchain, series: Vec<Transaction>) -> Block {
        Block::mine(
            blockchain.last_block(),
            &Account::new().address(),
            series,
            blockchain.state_root(),
        )
        .expect("mining at difficulty 1 succeeds")
    }

    #[test]
    fn new_chain_starts_at_genesis() {
        let blockchain = Blockchain::new();
        assert_eq!(blockchain.len(), 1);
        assert!(!blockchain.is_empty());
        assert_eq!(blockchain.last_block(), &Block::genesis());
        assert_eq!(blockchain.block_at(0), Some(&Block::genesis()));
    }

    #[test]
    fn add_block_appends_and_applies_state() {
        let mut blockchain = Blockchain::new();
        let queue = TransactionQueue::new();
        let block = mine_next(&blockchain, Vec::new());
        let beneficiary = block.header.beneficiary.clone();

        blockchain.add_block(block, &queue).expect("block accepted");

        assert_eq!(blockchain.len(), 2);
        assert_eq!(
            blockchain
                .state()
                .get_account(&beneficiary)
                .expect("beneficiary")
                .balance,
            MINING_REWARD
        );
    }

    #[test]
    fn add_block_clears_mined_transactions_from_the_queue() {
        let mut blockchain = Blockchain::new();
        let queue = TransactionQueue::new();
        let account = Account::new();
        let registration = Transaction::create_account(&account);
        queue.add(registration.clone());

        let block = mine_next(&blockchain, queue.transaction_series());
        blockchain.add_block(block, &queue).expect("block accepted");

        assert!(queue.is_empty());
        assert!(blockchain.state().get_account(&account.address()).is_some());
    }

    #[test]
    fn re_adding_the_same_block_is_rejected() {
        let mut blockchain = Blockchain::new();
        let queue = TransactionQueue::new();
        let block = mine_next(&blockchain, Vec::new());

        blockchain.add_block(block.clone(), &queue).expect("block accepted");
        assert_eq!(
            blockchain.add_block(block, &queue),
            Err(BlockError::ParentHashMismatch)
        );
        assert_eq!(blockchain.len(), 2);
    }

    #[test]
    fn replace_chain_adopts_a_valid_longer_chain() {
        let mut source = Blockchain::new();
        let queue = TransactionQueue::new();
        for _ in 0..3 {
            let block = mine_next(&source, Vec::new());
            source.add_block(block, &queue).expect("block accepted");
        }

        let mut local = Blockchain::new();
        local
            .replace_chain(source.chain().to_vec())
            .expect("candidate accepted");

        assert_eq!(local.len(), 4);
        assert_eq!(local.state_root(), source.state_root());
    }

    #[test]
    fn replace_chain_rejects_a_tampered_candidate_without_side_effects() {
        let mut source = Blockchain::new();
        let queue = TransactionQueue::new();
        for _ in 0..2 {
            let block = mine_next(&source, Vec::new());
            source.add_block(block, &queue).expect("block accepted");
        }

        let mut local = Blockchain::new();
        let block = mine_next(&local, Vec::new());
        local.add_block(block, &queue).expect("block accepted");
        let root_before = local.state_root();
        let chain_before = local.chain().to_vec();

        let mut candidate = source.chain().to_vec();
        candidate[1].header.beneficiary = Account::new().address();

        assert!(local.replace_chain(candidate).is_err());
        assert_eq!(local.chain(), &chain_before[..]);
        assert_eq!(local.state_root(), root_before);
    }

    #[test]
    fn replace_chain_rejects_a_candidate_with_a_bad_genesis() {
        let mut local = Blockchain::new();
        let mut candidate = vec![Block::genesis()];
        candidate[0].header.timestamp = 12345;
        assert_eq!(
            local.replace_chain(candidate),
            Err(BlockError::GenesisMismatch)
        );
    }
}
