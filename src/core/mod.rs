pub mod account;
pub mod block;
pub mod blockchain;
pub mod transaction;
