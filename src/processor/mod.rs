//! Parallel Work Processing Module
//!
//! A bounded worker pool dispatching typed work items: transaction and
//! block checks plus reserved maintenance kinds. Every item carries a
//! single-shot result channel; callers can fire-and-forget or await the
//! outcome with a timeout.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

use crate::types::{Block, Transaction};
use crate::utxo::Utxo;

pub mod pool;
pub mod priority_queue;

// Re-export main types
pub use pool::{ParallelProcessor, ProcessorConfig, ProcessorStats, WorkerStats};
pub use priority_queue::PriorityQueue;

/// Processor error types
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ProcessorError {
    #[error("work queue is full")]
    QueueFull,

    #[error("timed out waiting for a work result")]
    Timeout,

    #[error("work item was cancelled before completion")]
    Cancelled,

    #[error("batch of {len} items exceeds the configured maximum of {max}")]
    BatchTooLarge { len: usize, max: usize },

    #[error("processor is closed")]
    Closed,
}

/// What a work item asks for. Kept alongside the payload for dispatch
/// verification, logging and stats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkKind {
    TxValidation,
    BlockProcessing,
    UtxoUpdate,
    MerkleCalc,
    SigVerify,
    StateTransition,
}

impl std::fmt::Display for WorkKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            WorkKind::TxValidation => "tx_validation",
            WorkKind::BlockProcessing => "block_processing",
            WorkKind::UtxoUpdate => "utxo_update",
            WorkKind::MerkleCalc => "merkle_calc",
            WorkKind::SigVerify => "sig_verify",
            WorkKind::StateTransition => "state_transition",
        };
        f.write_str(name)
    }
}

/// Typed work payload. The worker rejects an item whose payload does
/// not match its kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkPayload {
    Transaction(Transaction),
    Block(Block),
    Utxo(Utxo),
    Bytes(Vec<u8>),
    Unit,
}

/// One submission to the processor. Lower `priority` wins when the
/// priority path is enabled.
#[derive(Debug)]
pub struct WorkItem {
    pub id: String,
    pub kind: WorkKind,
    pub payload: WorkPayload,
    pub priority: i64,
    pub created: Instant,
    /// Items past their deadline fail instead of being processed
    pub deadline: Option<Instant>,
    pub(crate) result_tx: oneshot::Sender<WorkResult>,
}

impl WorkItem {
    /// Build a work item and the receiving half of its result channel.
    /// Dropping the receiver is allowed; the result is then discarded.
    pub fn new(
        id: impl Into<String>,
        kind: WorkKind,
        payload: WorkPayload,
    ) -> (Self, oneshot::Receiver<WorkResult>) {
        let (result_tx, result_rx) = oneshot::channel();
        (
            Self {
                id: id.into(),
                kind,
                payload,
                priority: 0,
                created: Instant::now(),
                deadline: None,
                result_tx,
            },
            result_rx,
        )
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }
}

/// Outcome of one work item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkResult {
    pub id: String,
    pub success: bool,
    /// The payload handed back on success
    pub data: Option<WorkPayload>,
    pub error: Option<String>,
    pub duration: Duration,
    pub worker_id: usize,
    /// Unix seconds at completion
    pub timestamp: u64,
}
