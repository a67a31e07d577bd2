/*!
 * Batch construction.
 *
 * Pending work items are grouped greedily, in input order, into batches of at
 * most `max_size` items. A batch never mixes items with different dispatch
 * keys (language pairs), and items are never split or reordered. Batches are
 * produced lazily; build a fresh iterator for every run.
 */

use std::iter::Peekable;

/// Default number of units per request
pub const DEFAULT_BATCH_SIZE: usize = 10;

/// A contiguous group of work items sent in one request
#[derive(Debug, Clone, PartialEq)]
pub struct Batch<T> {
    /// 1-based position in build order
    pub number: usize,
    pub items: Vec<T>,
}

impl<T> Batch<T> {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Builds batches of bounded size
#[derive(Debug, Clone, Copy)]
pub struct Batcher {
    max_size: usize,
}

impl Default for Batcher {
    fn default() -> Self {
        Self::new(DEFAULT_BATCH_SIZE)
    }
}

impl Batcher {
    /// A size of zero is treated as one
    pub fn new(max_size: usize) -> Self {
        Self {
            max_size: max_size.max(1),
        }
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Lazily group `items`; consecutive items with equal `key` may share a batch
    pub fn build<I, K, F>(&self, items: I, key: F) -> Batches<I::IntoIter, F>
    where
        I: IntoIterator,
        F: Fn(&I::Item) -> K,
        K: PartialEq,
    {
        Batches {
            items: items.into_iter().peekable(),
            key,
            max_size: self.max_size,
            number: 0,
        }
    }
}

/// Iterator returned by [`Batcher::build`]
pub struct Batches<I: Iterator, F> {
    items: Peekable<I>,
    key: F,
    max_size: usize,
    number: usize,
}

impl<I, K, F> Iterator for Batches<I, F>
where
    I: Iterator,
    F: Fn(&I::Item) -> K,
    K: PartialEq,
{
    type Item = Batch<I::Item>;

    fn next(&mut self) -> Option<Self::Item> {
        let first = self.items.next()?;
        let batch_key = (self.key)(&first);
        let mut items = Vec::with_capacity(self.max_size);
        items.push(first);

        while items.len() < self.max_size {
            match self.items.peek() {
                Some(next) if (self.key)(next) == batch_key => {
                    if let Some(item) = self.items.next() {
                        items.push(item);
                    }
                }
                _ => break,
            }
        }

        self.number += 1;
        Some(Batch {
            number: self.number,
            items,
        })
    }
}
