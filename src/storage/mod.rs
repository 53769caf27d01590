pub mod state;
pub mod trie;
pub mod txpool;
