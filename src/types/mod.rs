//! Block and Transaction Data Model
//! Defines the wire-level structures the ledger and processor consume

pub mod block;
pub mod transaction;

// Re-export main types
pub use block::{Block, BlockHeader};
pub use transaction::{Transaction, TxInput, TxOutput};
