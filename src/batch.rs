//! Bounded batch execution.
//!
//! [`BatchRunner`] drives an asynchronous action over a list in consecutive
//! waves of at most `limit` items. A wave's futures are polled together on
//! the calling task; the next wave starts only once every action of the
//! current one has settled.
//!
//! # Example
//!
//! ```
//! # async fn example() -> Result<(), vidcover::VidcoverError> {
//! use vidcover::BatchRunner;
//!
//! let runner = BatchRunner::new(10)?;
//! let outcome = runner.run((0..23).collect(), |n: u32| async move { n * 2 }).await;
//! assert_eq!(outcome.wave_sizes, vec![10, 10, 3]);
//! assert_eq!(outcome.outputs[22], 44);
//! # Ok(())
//! # }
//! ```

use std::future::Future;
use std::num::NonZeroUsize;

use futures::future::join_all;

use crate::error::VidcoverError;

/// Everything a finished batch produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchOutcome<O> {
    /// One output per input item, in input order.
    pub outputs: Vec<O>,
    /// Number of items in each wave, in execution order.
    pub wave_sizes: Vec<usize>,
}

/// Runs actions in fixed-width waves.
#[derive(Debug, Clone, Copy)]
pub struct BatchRunner {
    limit: NonZeroUsize,
}

impl BatchRunner {
    /// # Errors
    ///
    /// Returns [`VidcoverError::InvalidConcurrency`] when `limit` is zero.
    pub fn new(limit: usize) -> Result<Self, VidcoverError> {
        NonZeroUsize::new(limit)
            .map(|limit| Self { limit })
            .ok_or(VidcoverError::InvalidConcurrency(limit))
    }

    pub fn limit(&self) -> usize {
        self.limit.get()
    }

    /// Run `action` over every item.
    ///
    /// Actions within a wave are started in list order and may settle in
    /// any order. The action's output is collected as-is: an action that
    /// returns `Err` does not stop the batch, so this resolves only after
    /// all items have settled.
    pub async fn run<T, O, F, Fut>(&self, items: Vec<T>, mut action: F) -> BatchOutcome<O>
    where
        F: FnMut(T) -> Fut,
        Fut: Future<Output = O>,
    {
        let total = items.len();
        let limit = self.limit.get();
        let mut outputs = Vec::with_capacity(total);
        let mut wave_sizes = Vec::with_capacity(total.div_ceil(limit));

        let mut remaining = items.into_iter().peekable();
        while remaining.peek().is_some() {
            let wave: Vec<Fut> = remaining.by_ref().take(limit).map(&mut action).collect();
            log::debug!(
                "Starting wave {} with {} of {total} items",
                wave_sizes.len() + 1,
                wave.len()
            );
            wave_sizes.push(wave.len());
            outputs.extend(join_all(wave).await);
        }

        BatchOutcome {
            outputs,
            wave_sizes,
        }
    }
}
