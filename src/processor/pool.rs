//! Bounded Worker Pool
//!
//! Work items flow through a bounded FIFO channel, or through the
//! priority queue when priority queuing is enabled, to a fixed set of
//! worker tasks. Workers drain the priority queue before the FIFO
//! queue, dispatch each item to its per-kind handler and deliver the
//! outcome on the item's result channel.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use anyhow::{bail, ensure};
use dashmap::DashMap;
use tokio::sync::{mpsc, oneshot, watch, Mutex as TokioMutex, Notify};
use tokio::task::JoinHandle;

use crate::processor::priority_queue::PriorityQueue;
use crate::processor::{ProcessorError, WorkItem, WorkKind, WorkPayload, WorkResult};
use crate::types::{Block, Transaction};

/// Worker pool configuration. The defaults produce a working pool.
#[derive(Debug, Clone)]
pub struct ProcessorConfig {
    /// Number of worker tasks
    pub max_workers: usize,
    /// FIFO queue capacity
    pub queue_size: usize,
    /// Maximum number of items accepted by a single batch submission
    pub batch_size: usize,
    /// Bound on blocking submissions and on awaiting a result
    pub timeout: Duration,
    /// Route prioritized submissions through the priority queue
    pub priority_queuing: bool,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            max_workers: num_cpus::get() * 2,
            queue_size: 10_000,
            batch_size: 100,
            timeout: Duration::from_secs(30),
            priority_queuing: false,
        }
    }
}

/// Per-worker counters, aggregated on demand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerStats {
    pub worker_id: usize,
    pub processed: u64,
    pub errors: u64,
    /// Time spent inside handlers
    pub busy: Duration,
}

impl WorkerStats {
    fn new(worker_id: usize) -> Self {
        Self {
            worker_id,
            processed: 0,
            errors: 0,
            busy: Duration::ZERO,
        }
    }
}

/// Snapshot of the pool's counters.
#[derive(Debug, Clone)]
pub struct ProcessorStats {
    pub processed: u64,
    pub errors: u64,
    pub queue_depth: usize,
    pub priority_depth: usize,
    pub active_workers: usize,
    pub workers: Vec<WorkerStats>,
}

#[derive(Debug, Default)]
struct Shared {
    processed: AtomicU64,
    errors: AtomicU64,
    active: AtomicUsize,
    workers: DashMap<usize, WorkerStats>,
}

/// The parallel work-processing engine.
pub struct ParallelProcessor {
    config: ProcessorConfig,
    queue_tx: mpsc::Sender<WorkItem>,
    // Keeps the receiving half alive across worker restarts and in
    // worker-less test builds.
    queue_rx: Arc<TokioMutex<mpsc::Receiver<WorkItem>>>,
    priority: Arc<PriorityQueue<WorkItem>>,
    notify: Arc<Notify>,
    shutdown: watch::Sender<bool>,
    handles: parking_lot::Mutex<Vec<JoinHandle<()>>>,
    shared: Arc<Shared>,
    closed: AtomicBool,
}

impl ParallelProcessor {
    /// Start the pool. Must be called inside a tokio runtime.
    pub fn new(config: ProcessorConfig) -> Self {
        Self::build(config, true)
    }

    fn build(config: ProcessorConfig, spawn_workers: bool) -> Self {
        let (queue_tx, queue_rx) = mpsc::channel(config.queue_size.max(1));
        let queue_rx = Arc::new(TokioMutex::new(queue_rx));
        let priority = Arc::new(PriorityQueue::new());
        let notify = Arc::new(Notify::new());
        let (shutdown, _) = watch::channel(false);
        let shared = Arc::new(Shared::default());

        let mut handles = Vec::new();
        if spawn_workers {
            for worker_id in 0..config.max_workers.max(1) {
                handles.push(tokio::spawn(worker_loop(
                    worker_id,
                    Arc::clone(&queue_rx),
                    Arc::clone(&priority),
                    Arc::clone(&notify),
                    shutdown.subscribe(),
                    Arc::clone(&shared),
                )));
            }
            log::info!("parallel processor started with {} workers", handles.len());
        }

        Self {
            config,
            queue_tx,
            queue_rx,
            priority,
            notify,
            shutdown,
            handles: parking_lot::Mutex::new(handles),
            shared,
            closed: AtomicBool::new(false),
        }
    }

    /// Enqueue one item, waiting up to the configured timeout for
    /// queue space.
    pub async fn submit(&self, item: WorkItem) -> Result<(), ProcessorError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(ProcessorError::Closed);
        }
        self.queue_tx
            .send_timeout(item, self.config.timeout)
            .await
            .map_err(|e| match e {
                mpsc::error::SendTimeoutError::Timeout(_) => ProcessorError::QueueFull,
                mpsc::error::SendTimeoutError::Closed(_) => ProcessorError::Closed,
            })
    }

    /// Enqueue with an explicit priority (lower value is served first).
    /// Falls back to the FIFO queue when priority queuing is disabled.
    pub async fn submit_with_priority(
        &self,
        mut item: WorkItem,
        priority: i64,
    ) -> Result<(), ProcessorError> {
        item.priority = priority;
        if !self.config.priority_queuing {
            return self.submit(item).await;
        }
        if self.closed.load(Ordering::SeqCst) {
            return Err(ProcessorError::Closed);
        }
        self.priority.push(item, priority);
        self.notify.notify_one();
        Ok(())
    }

    /// Submit several items, failing fast on the first error. Batches
    /// larger than `batch_size` are rejected outright.
    pub async fn submit_batch(&self, items: Vec<WorkItem>) -> Result<(), ProcessorError> {
        if items.len() > self.config.batch_size {
            return Err(ProcessorError::BatchTooLarge {
                len: items.len(),
                max: self.config.batch_size,
            });
        }
        for item in items {
            self.submit(item).await?;
        }
        Ok(())
    }

    /// Run a transaction through the validation handler and await its
    /// result.
    pub async fn process_transaction(
        &self,
        tx: Transaction,
    ) -> Result<WorkResult, ProcessorError> {
        let id = format!("tx-{}", hex::encode(&tx.hash[..8]));
        let (item, result_rx) =
            WorkItem::new(id, WorkKind::TxValidation, WorkPayload::Transaction(tx));
        self.submit(item).await?;
        self.await_result(result_rx).await
    }

    /// Run a block through the block handler and await its result.
    pub async fn process_block(&self, block: Block) -> Result<WorkResult, ProcessorError> {
        let id = format!(
            "block-{}-{}",
            block.header.height,
            hex::encode(&block.calculate_hash()[..8])
        );
        let (item, result_rx) =
            WorkItem::new(id, WorkKind::BlockProcessing, WorkPayload::Block(block));
        self.submit(item).await?;
        self.await_result(result_rx).await
    }

    pub fn stats(&self) -> ProcessorStats {
        let mut workers: Vec<WorkerStats> = self
            .shared
            .workers
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        workers.sort_by_key(|w| w.worker_id);
        ProcessorStats {
            processed: self.shared.processed.load(Ordering::Relaxed),
            errors: self.shared.errors.load(Ordering::Relaxed),
            queue_depth: self.queue_tx.max_capacity() - self.queue_tx.capacity(),
            priority_depth: self.priority.len(),
            active_workers: self.shared.active.load(Ordering::SeqCst),
            workers,
        }
    }

    /// Stop accepting work, cancel the workers and wait for in-flight
    /// items to finish. Idempotent.
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        let _ = self.shutdown.send(true);
        self.notify.notify_waiters();
        let handles = std::mem::take(&mut *self.handles.lock());
        for handle in handles {
            let _ = handle.await;
        }
        self.queue_rx.lock().await.close();
        log::info!(
            "parallel processor closed after {} items",
            self.shared.processed.load(Ordering::Relaxed)
        );
    }

    async fn await_result(
        &self,
        result_rx: oneshot::Receiver<WorkResult>,
    ) -> Result<WorkResult, ProcessorError> {
        match tokio::time::timeout(self.config.timeout, result_rx).await {
            Ok(Ok(result)) => Ok(result),
            Ok(Err(_)) => Err(ProcessorError::Cancelled),
            Err(_) => Err(ProcessorError::Timeout),
        }
    }
}

async fn worker_loop(
    worker_id: usize,
    queue: Arc<TokioMutex<mpsc::Receiver<WorkItem>>>,
    priority: Arc<PriorityQueue<WorkItem>>,
    notify: Arc<Notify>,
    mut shutdown: watch::Receiver<bool>,
    shared: Arc<Shared>,
) {
    log::debug!("worker {worker_id} started");
    loop {
        if *shutdown.borrow() {
            break;
        }
        if let Some(item) = priority.pop() {
            process_item(worker_id, item, &shared);
            continue;
        }
        tokio::select! {
            biased;
            _ = shutdown.changed() => break,
            _ = notify.notified() => {}
            item = recv_next(&queue) => match item {
                Some(item) => process_item(worker_id, item, &shared),
                None => break,
            },
        }
    }
    log::debug!("worker {worker_id} stopped");
}

async fn recv_next(queue: &TokioMutex<mpsc::Receiver<WorkItem>>) -> Option<WorkItem> {
    queue.lock().await.recv().await
}

fn process_item(worker_id: usize, item: WorkItem, shared: &Shared) {
    let WorkItem {
        id,
        kind,
        payload,
        deadline,
        result_tx,
        ..
    } = item;

    let start = Instant::now();
    shared.active.fetch_add(1, Ordering::SeqCst);

    let outcome = if deadline.is_some_and(|d| Instant::now() > d) {
        Err(anyhow::anyhow!("deadline exceeded"))
    } else {
        run_handler(kind, &payload)
    };
    let duration = start.elapsed();

    shared.active.fetch_sub(1, Ordering::SeqCst);
    shared.processed.fetch_add(1, Ordering::Relaxed);

    let result = {
        let mut worker = shared
            .workers
            .entry(worker_id)
            .or_insert_with(|| WorkerStats::new(worker_id));
        worker.processed += 1;
        worker.busy += duration;

        match outcome {
            Ok(()) => WorkResult {
                id: id.clone(),
                success: true,
                data: Some(payload),
                error: None,
                duration,
                worker_id,
                timestamp: unix_now(),
            },
            Err(e) => {
                shared.errors.fetch_add(1, Ordering::Relaxed);
                worker.errors += 1;
                log::debug!("worker {worker_id} failed {id} ({kind}): {e}");
                WorkResult {
                    id: id.clone(),
                    success: false,
                    data: None,
                    error: Some(e.to_string()),
                    duration,
                    worker_id,
                    timestamp: unix_now(),
                }
            }
        }
    };

    if result_tx.send(result).is_err() {
        log::debug!("result receiver for {id} dropped");
    }
}

/// Per-kind handlers. Only the shallow structural checks live here; the
/// ledger performs full validation.
fn run_handler(kind: WorkKind, payload: &WorkPayload) -> anyhow::Result<()> {
    match kind {
        WorkKind::TxValidation => {
            let WorkPayload::Transaction(tx) = payload else {
                bail!("payload type mismatch for {kind}");
            };
            ensure!(tx.version > 0, "invalid transaction version");
            ensure!(!tx.inputs.is_empty(), "transaction has no inputs");
            ensure!(!tx.outputs.is_empty(), "transaction has no outputs");
            Ok(())
        }
        WorkKind::BlockProcessing => {
            let WorkPayload::Block(block) = payload else {
                bail!("payload type mismatch for {kind}");
            };
            ensure!(!block.transactions.is_empty(), "block has no transactions");
            Ok(())
        }
        // Reserved kinds succeed until their pipelines land.
        WorkKind::UtxoUpdate
        | WorkKind::MerkleCalc
        | WorkKind::SigVerify
        | WorkKind::StateTransition => Ok(()),
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}
