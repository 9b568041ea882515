use std::collections::VecDeque;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Unbounded FIFO queue guarded by a single read-write lock.
///
/// Every operation is a non-blocking snapshot of the current state: nothing waits for items to
/// arrive, and the lock is only held for the duration of the call itself.
#[derive(Debug)]
pub struct ConcurrentQueue<T> {
    items: RwLock<VecDeque<T>>,
}

impl<T> ConcurrentQueue<T> {
    pub fn new() -> Self {
        Self {
            items: RwLock::new(VecDeque::new()),
        }
    }

    /// Appends `item` to the tail. Never rejects.
    pub fn push(&self, item: T) {
        self.write().push_back(item);
    }

    /// Removes and returns the head, or `None` when the queue is empty.
    pub fn pop(&self) -> Option<T> {
        self.write().pop_front()
    }

    /// Like [`ConcurrentQueue::pop`], but yields `T::default()` on an empty queue.
    pub fn pop_or_default(&self) -> T
    where
        T: Default,
    {
        self.pop().unwrap_or_default()
    }

    /// Removes up to `n` items from the head in FIFO order.
    ///
    /// The whole batch is removed under one exclusive lock, so the result is always a contiguous
    /// run of the queue. Returns fewer than `n` items when fewer are available.
    pub fn take(&self, n: usize) -> Vec<T> {
        let mut items = self.write();
        let count = n.min(items.len());
        items.drain(..count).collect()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    // User code never runs under this lock, so a poisoned guard still holds a consistent deque.
    fn read(&self) -> RwLockReadGuard<'_, VecDeque<T>> {
        self.items.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, VecDeque<T>> {
        self.items.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T> Default for ConcurrentQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}
