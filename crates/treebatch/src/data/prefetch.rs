//! Background batch production.
//!
//! A producer thread collates the batches of one epoch and hands them over a
//! bounded channel, so the layout of batch `N + 1` overlaps the consumer's
//! work on batch `N`. Each batch is fully built on the producer before it is
//! sent; nothing is shared or mutated after publication.

use std::sync::mpsc::{sync_channel, Receiver};
use std::thread::JoinHandle;

use super::collate::Batch;
use super::loader::JetLoader;
use crate::error::BatchError;

/// Iterator over batches produced on a background thread.
///
/// Dropping the prefetcher disconnects the channel; the producer stops at
/// its next send and is joined.
#[derive(Debug)]
pub struct Prefetcher {
    rx: Option<Receiver<Result<Batch, BatchError>>>,
    handle: Option<JoinHandle<()>>,
    remaining: usize,
}

impl Prefetcher {
    pub(crate) fn spawn(loader: JetLoader, epoch: u64) -> Self {
        let depth = loader.config().prefetch.max(1);
        let (tx, rx) = sync_channel(depth);
        let batches = loader.batch_indices(epoch);
        let remaining = batches.len();

        let handle = std::thread::spawn(move || {
            for (batch, indices) in batches.iter().enumerate() {
                let result = loader.load_batch(epoch, batch, indices);
                if tx.send(result).is_err() {
                    tracing::debug!(epoch, batch, "prefetch consumer went away");
                    return;
                }
            }
        });

        Self {
            rx: Some(rx),
            handle: Some(handle),
            remaining,
        }
    }
}

impl Iterator for Prefetcher {
    type Item = Result<Batch, BatchError>;

    fn next(&mut self) -> Option<Self::Item> {
        let item = self.rx.as_ref()?.recv().ok()?;
        self.remaining = self.remaining.saturating_sub(1);
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.remaining))
    }
}

impl Drop for Prefetcher {
    fn drop(&mut self) {
        drop(self.rx.take());
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::warn!("prefetch producer panicked");
            }
        }
    }
}
