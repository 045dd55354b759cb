use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use thiserror::Error;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Error)]
pub enum PlayOrderError {
    #[error("play order is empty")]
    EmptyOrder,
}

/// Playback permutation over filtered-view positions, plus a cursor.
///
/// The order is always a permutation of `0..n` for the view size `n` it was
/// last rebuilt with. Stepping wraps at both ends.
#[derive(Debug)]
pub struct PlayOrder {
    order: Vec<usize>,
    cursor: usize,
    shuffle: bool,
    rng: StdRng,
}

impl PlayOrder {
    pub fn new(shuffle: bool) -> Self {
        Self::with_seed(shuffle, rand::random())
    }

    /// Deterministic shuffles, for tests and reproducible sessions.
    pub fn with_seed(shuffle: bool, seed: u64) -> Self {
        Self {
            order: Vec::new(),
            cursor: 0,
            shuffle,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Regenerate the order for a view of `n` tracks and reset the cursor.
    pub fn rebuild(&mut self, n: usize) {
        self.order.clear();
        self.order.extend(0..n);
        if self.shuffle {
            self.order.shuffle(&mut self.rng);
        }
        self.cursor = 0;
    }

    /// Point the cursor at `view_index`. Returns `false` if it is not in the order.
    pub fn activate(&mut self, view_index: usize) -> bool {
        match self.order.iter().position(|&i| i == view_index) {
            Some(pos) => {
                self.cursor = pos;
                true
            }
            None => false,
        }
    }

    pub fn next(&mut self, repeat_one: bool) -> Result<usize, PlayOrderError> {
        if self.order.is_empty() {
            return Err(PlayOrderError::EmptyOrder);
        }
        if !repeat_one {
            self.cursor = (self.cursor + 1) % self.order.len();
        }
        Ok(self.order[self.cursor])
    }

    pub fn previous(&mut self, repeat_one: bool) -> Result<usize, PlayOrderError> {
        if self.order.is_empty() {
            return Err(PlayOrderError::EmptyOrder);
        }
        if !repeat_one {
            self.cursor = self.cursor.checked_sub(1).unwrap_or(self.order.len() - 1);
        }
        Ok(self.order[self.cursor])
    }

    /// View position under the cursor.
    pub fn current(&self) -> Option<usize> {
        self.order.get(self.cursor).copied()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Move the cursor to an order position. Ignored when out of range.
    pub fn set_cursor(&mut self, cursor: usize) {
        if cursor < self.order.len() {
            self.cursor = cursor;
        }
    }

    pub fn shuffle(&self) -> bool {
        self.shuffle
    }

    /// Toggle shuffling and rebuild for a view of `n` tracks.
    pub fn set_shuffle(&mut self, shuffle: bool, n: usize) {
        self.shuffle = shuffle;
        self.rebuild(n);
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.order
    }
}
