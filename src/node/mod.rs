//! A single mining node: one chain behind a lock, one transaction queue, one
//! operator identity.
//!
//! The chain lives in a `tokio` read/write lock. Reads (validation, balance
//! queries, mining snapshots) share it; block acceptance and chain
//! replacement take it exclusively, so blocks land one at a time. Proof-of-
//! work search runs on the blocking thread pool and never holds the lock.

use crate::core::account::Account;
use crate::core::block::{Block, BlockError};
use crate::core::blockchain::Blockchain;
use crate::core::transaction::{self, Transaction, TransactionData, TransactionError};
use crate::crypto::key_pair::Address;
use crate::storage::txpool::TransactionQueue;
use crate::warn;
use std::sync::Arc;
use tokio::sync::RwLock;

pub struct Node {
    chain: RwLock<Blockchain>,
    queue: Arc<TransactionQueue>,
    operator: Account,
}

impl Node {
    /// A node with a fresh genesis-only chain, mining on behalf of `operator`.
    pub fn new(operator: Account) -> Node {
        Node {
            chain: RwLock::new(Blockchain::new()),
            queue: Arc::new(TransactionQueue::new()),
            operator,
        }
    }

    pub fn operator(&self) -> &Account {
        &self.operator
    }

    pub fn queue(&self) -> &TransactionQueue {
        &self.queue
    }

    /// Validates `transaction` against current state and queues it.
    pub async fn submit_transaction(
        &self,
        transaction: Transaction,
    ) -> Result<(), TransactionError> {
        {
            let chain = self.chain.read().await;
            match &transaction.data {
                TransactionData::Transact => {
                    transaction::validate_transfer(&transaction, chain.state())?
                }
                TransactionData::CreateAccount { .. } => {
                    transaction::validate_create_account(&transaction)?
                }
                TransactionData::MiningReward => {
                    transaction::validate_mining_reward(&transaction)?
                }
            }
        }
        self.queue.add(transaction);
        Ok(())
    }

    /// Mines one block on top of the current tip and submits it to the chain.
    ///
    /// The tip, queued transactions, and state root are snapshotted under a
    /// read lock; the nonce search then runs on the blocking pool without any
    /// lock held. If another block lands first, the freshly mined block loses
    /// the race and is rejected like any other stale block.
    pub async fn mine(&self) -> Result<(), BlockError> {
        let (last, series, state_root) = {
            let chain = self.chain.read().await;
            (
                chain.last_block().clone(),
                self.queue.transaction_series(),
                chain.state_root(),
            )
        };
        let beneficiary = self.operator.address();

        let mined = tokio::task::spawn_blocking(move || {
            Block::mine(&last, &beneficiary, series, state_root)
        })
        .await
        .map_err(|_| BlockError::MiningInterrupted)??;

        self.receive_block(mined).await
    }

    /// Validates and appends a block, removing its transactions from the
    /// queue on success.
    pub async fn receive_block(&self, block: Block) -> Result<(), BlockError> {
        let number = block.header.number;
        let mut chain = self.chain.write().await;
        chain.add_block(block, &self.queue).inspect_err(|reason| {
            warn!("rejected block {number}: {reason}");
        })
    }

    /// Offers a replacement chain; adopted only if it fully validates.
    pub async fn receive_chain(&self, candidate: Vec<Block>) -> Result<(), BlockError> {
        let mut chain = self.chain.write().await;
        chain.replace_chain(candidate).inspect_err(|reason| {
            warn!("rejected candidate chain: {reason}");
        })
    }

    pub async fn chain_snapshot(&self) -> Vec<Block> {
        self.chain.read().await.chain().to_vec()
    }

    pub async fn chain_len(&self) -> usize {
        self.chain.read().await.len()
    }

    pub async fn balance_of(&self, address: &Address) -> Option<u64> {
        self.chain
            .read()
            .await
            .state()
            .get_account(address)
            .map(|record| record.balance)
    }
}
