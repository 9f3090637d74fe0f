// src/loader.rs
use parking_lot::Mutex;
use serde::Serialize;
use std::ops::Range;
use tracing::debug;

#[derive(Debug, Default)]
struct LoaderState {
    loaded_count: usize,
    is_loading: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LoadProgress {
    pub loaded: usize,
    pub total: usize,
}

/// Releases a fixed working-set snapshot in consecutive chunks. At most one
/// chunk is in flight; a new working set means a new loader (or `reset`).
#[derive(Debug)]
pub struct ChunkedLoader<T> {
    items: Vec<T>,
    chunk_size: usize,
    state: Mutex<LoaderState>,
}

impl<T> ChunkedLoader<T> {
    pub fn new(items: Vec<T>, chunk_size: usize) -> Self {
        Self {
            items,
            chunk_size: chunk_size.max(1),
            state: Mutex::new(LoaderState::default()),
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn loaded_count(&self) -> usize {
        self.state.lock().loaded_count
    }

    pub fn is_loading(&self) -> bool {
        self.state.lock().is_loading
    }

    pub fn is_exhausted(&self) -> bool {
        self.state.lock().loaded_count >= self.items.len()
    }

    pub fn progress(&self) -> LoadProgress {
        LoadProgress {
            loaded: self.loaded_count(),
            total: self.items.len(),
        }
    }

    /// Claim the next chunk. `None` while another chunk is in flight or once
    /// everything has been released.
    pub fn begin(&self) -> Option<ChunkLease<'_, T>> {
        let mut state = self.state.lock();
        if state.is_loading || state.loaded_count >= self.items.len() {
            return None;
        }
        state.is_loading = true;
        let start = state.loaded_count;
        let end = (start + self.chunk_size).min(self.items.len());
        debug!("Chunk claimed - range={}..{}, total={}", start, end, self.items.len());
        Some(ChunkLease {
            loader: self,
            range: start..end,
        })
    }

    /// Replace the snapshot and rewind.
    pub fn reset(&mut self, items: Vec<T>) {
        self.items = items;
        *self.state.get_mut() = LoaderState::default();
    }
}

impl<T: Clone> ChunkedLoader<T> {
    /// Claim, copy out and commit the next chunk in one step.
    pub fn load_next(&self) -> Option<Vec<T>> {
        let lease = self.begin()?;
        let chunk = lease.items().to_vec();
        lease.commit();
        Some(chunk)
    }
}

/// An in-flight chunk. Committing advances the loader; dropping without
/// committing releases the claim and leaves the count where it was.
#[derive(Debug)]
pub struct ChunkLease<'a, T> {
    loader: &'a ChunkedLoader<T>,
    range: Range<usize>,
}

impl<T> ChunkLease<'_, T> {
    pub fn items(&self) -> &[T] {
        &self.loader.items[self.range.clone()]
    }

    pub fn range(&self) -> Range<usize> {
        self.range.clone()
    }

    pub fn commit(self) {
        self.loader.state.lock().loaded_count = self.range.end;
    }
}

impl<T> Drop for ChunkLease<'_, T> {
    fn drop(&mut self) {
        self.loader.state.lock().is_loading = false;
    }
}
