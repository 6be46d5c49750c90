//! Streaming execution in fixed-size batches.
//!
//! [`ScoreStream`] pulls at most one batch of input at a time, dispatches it
//! through [`WorkerPool::run_batch_outcomes`] and yields the results one by
//! one before touching the next batch. Memory stays bounded to a single
//! batch however long the input is. There is no prefetching: batch `n + 1`
//! is read only after batch `n` has fully completed.

use std::iter::FusedIterator;

use crate::client::ScoreResult;
use crate::error::{PoolError, PoolResult};
use crate::pool::WorkerPool;

/// Splits an iterator into owned chunks of at most `size` items.
#[derive(Debug)]
pub struct Batches<I> {
    input: I,
    size: usize,
    exhausted: bool,
}

impl<I: Iterator> Batches<I> {
    /// `size` is clamped to at least one.
    pub fn new(input: I, size: usize) -> Self {
        Self {
            input,
            size: size.max(1),
            exhausted: false,
        }
    }
}

impl<I: Iterator> Iterator for Batches<I> {
    type Item = Vec<I::Item>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.exhausted {
            return None;
        }
        let batch: Vec<I::Item> = self.input.by_ref().take(self.size).collect();
        if batch.len() < self.size {
            self.exhausted = true;
        }
        if batch.is_empty() { None } else { Some(batch) }
    }
}

impl<I: Iterator> FusedIterator for Batches<I> {}

/// Lazy, single-pass sequence of scores for a stream of texts.
///
/// Yields one item per input, in input order. A failed item yields
/// `Err(PoolError::Item { index, .. })` with its position in the whole
/// stream and the stream continues. A pool-level failure (no worker could
/// be started) yields that error once and ends the stream.
///
/// Dropping the stream early leaves the pool's workers running; they are
/// stopped by [`WorkerPool::stop_all`] or when the pool is dropped.
pub struct ScoreStream<'p, I: Iterator> {
    pool: &'p mut WorkerPool,
    batches: Batches<I>,
    pending: std::vec::IntoIter<PoolResult<ScoreResult>>,
    offset: usize,
    dispatched: usize,
    finished: bool,
}

impl<'p, I> ScoreStream<'p, I>
where
    I: Iterator,
    I::Item: AsRef<str> + Sync,
{
    pub fn new(pool: &'p mut WorkerPool, input: I, batch_size: usize) -> Self {
        Self {
            pool,
            batches: Batches::new(input, batch_size),
            pending: Vec::new().into_iter(),
            offset: 0,
            dispatched: 0,
            finished: false,
        }
    }

    /// Number of batches sent to the pool so far.
    pub fn batches_dispatched(&self) -> usize {
        self.dispatched
    }

    fn dispatch_next(&mut self) -> Option<PoolResult<()>> {
        let batch = self.batches.next()?;
        let offset = self.offset;
        self.offset += batch.len();
        self.dispatched += 1;

        log::debug!(
            target: "sentipool::scheduler",
            "Batch {} with {} items (offset {})",
            self.dispatched,
            batch.len(),
            offset
        );

        match self.pool.run_batch_outcomes(&batch) {
            Ok(outcomes) => {
                self.pending = outcomes
                    .into_iter()
                    .enumerate()
                    .map(|(i, outcome)| {
                        outcome.map_err(|source| PoolError::Item {
                            index: offset + i,
                            source,
                        })
                    })
                    .collect::<Vec<_>>()
                    .into_iter();
                Some(Ok(()))
            }
            Err(e) => Some(Err(e)),
        }
    }
}

impl<I> Iterator for ScoreStream<'_, I>
where
    I: Iterator,
    I::Item: AsRef<str> + Sync,
{
    type Item = PoolResult<ScoreResult>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(item) = self.pending.next() {
                return Some(item);
            }
            if self.finished {
                return None;
            }
            match self.dispatch_next() {
                Some(Ok(())) => continue,
                Some(Err(e)) => {
                    self.finished = true;
                    return Some(Err(e));
                }
                None => {
                    self.finished = true;
                    return None;
                }
            }
        }
    }
}

impl<I> FusedIterator for ScoreStream<'_, I>
where
    I: Iterator,
    I::Item: AsRef<str> + Sync,
{
}

impl WorkerPool {
    /// Stream `items` through the pool in batches of the configured size.
    pub fn run_stream<I>(&mut self, items: I) -> ScoreStream<'_, I::IntoIter>
    where
        I: IntoIterator,
        I::Item: AsRef<str> + Sync,
    {
        let batch_size = self.config().batch_size;
        ScoreStream::new(self, items.into_iter(), batch_size)
    }
}
