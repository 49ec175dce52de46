use crate::reel::ReelItem;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FeedError {
    #[error("index {index} out of range for feed of {len} reels")]
    OutOfRange { index: usize, len: usize },
}

/// Ordered reels plus the one index that is allowed to play.
///
/// `active` is `None` exactly when `items` is empty; otherwise it always
/// points inside `items`. Every mutation goes through `&mut self`, so the
/// event loop that owns the store is the single writer.
#[derive(Debug, Clone, Default)]
pub struct FeedStore {
    items: Vec<ReelItem>,
    active: Option<usize>,
}

impl FeedStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_items(items: Vec<ReelItem>) -> Self {
        let mut store = Self::new();
        store.set_items(items);
        store
    }

    /// Replaces the sequence in one step. The previously active reel keeps
    /// the activation if its id survives; otherwise the first reel becomes
    /// active.
    pub fn set_items(&mut self, items: Vec<ReelItem>) -> bool {
        let previous_id = self.active_item().map(|item| item.id.clone());
        let previous_index = self.active;

        self.items = items;
        self.active = previous_id
            .and_then(|id| self.position_of(&id))
            .or_else(|| self.clamp_index(0));
        previous_index != self.active
    }

    /// Commits `index` as active. Returns whether the active index moved.
    pub fn set_active(&mut self, index: usize) -> Result<bool, FeedError> {
        if index >= self.items.len() {
            return Err(FeedError::OutOfRange {
                index,
                len: self.items.len(),
            });
        }
        if self.active == Some(index) {
            return Ok(false);
        }
        self.active = Some(index);
        Ok(true)
    }

    pub fn next(&mut self) -> bool {
        match self.active {
            Some(current) if current + 1 < self.items.len() => {
                self.active = Some(current + 1);
                true
            }
            _ => false,
        }
    }

    pub fn previous(&mut self) -> bool {
        match self.active {
            Some(current) if current > 0 => {
                self.active = Some(current - 1);
                true
            }
            _ => false,
        }
    }

    pub fn active_index(&self) -> Option<usize> {
        self.active
    }

    pub fn active_item(&self) -> Option<&ReelItem> {
        self.active.and_then(|index| self.items.get(index))
    }

    pub fn items(&self) -> &[ReelItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn position_of(&self, id: &str) -> Option<usize> {
        self.items.iter().position(|item| item.id == id)
    }

    pub fn clamp_index(&self, index: usize) -> Option<usize> {
        if self.items.is_empty() {
            None
        } else {
            Some(index.min(self.items.len() - 1))
        }
    }
}
