/// Pending generation requests, deduplicated by entity name.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::schema::queue_item::{name_key, QueueItem};

/// FIFO queue of items waiting to become active.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityQueue {
    items: VecDeque<QueueItem>,
}

impl EntityQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `item` unless an item with the same name key is queued or
    /// is `active`. Returns whether the item was queued.
    pub fn enqueue(&mut self, item: QueueItem, active: Option<&QueueItem>) -> bool {
        let key = item.name_key();
        if active.is_some_and(|a| a.name_key() == key) || self.contains_key(&key) {
            return false;
        }
        self.items.push_back(item);
        true
    }

    pub fn dequeue_next(&mut self) -> Option<QueueItem> {
        self.items.pop_front()
    }

    pub fn peek(&self) -> Option<&QueueItem> {
        self.items.front()
    }

    /// Whether an item with the same name key as `name` is queued.
    pub fn contains_name(&self, name: &str) -> bool {
        self.contains_key(&name_key(name))
    }

    fn contains_key(&self, key: &str) -> bool {
        self.items.iter().any(|i| i.name_key() == key)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.items.iter().map(|i| i.name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &QueueItem> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::profile::TypeProfile;

    fn item(name: &str) -> QueueItem {
        QueueItem::new(name, "", &TypeProfile::characters())
    }

    #[test]
    fn fifo_order() {
        let mut q = EntityQueue::new();
        assert!(q.enqueue(item("Ada"), None));
        assert!(q.enqueue(item("Byron"), None));
        assert_eq!(q.dequeue_next().unwrap().name, "Ada");
        assert_eq!(q.dequeue_next().unwrap().name, "Byron");
        assert!(q.dequeue_next().is_none());
    }

    #[test]
    fn dedup_on_first_token() {
        let mut q = EntityQueue::new();
        assert!(q.enqueue(item("Ada Lovelace"), None));
        assert!(!q.enqueue(item("ada_byron"), None));
        assert_eq!(q.len(), 1);
        assert!(q.contains_name("ADA"));
    }

    #[test]
    fn dedup_against_active_item() {
        let mut q = EntityQueue::new();
        let active = item("Ada");
        assert!(!q.enqueue(item("Ada Lovelace"), Some(&active)));
        assert!(q.is_empty());
        assert!(q.enqueue(item("Byron"), Some(&active)));
    }

    #[test]
    fn clear_empties_queue() {
        let mut q = EntityQueue::new();
        q.enqueue(item("Ada"), None);
        q.clear();
        assert!(q.is_empty());
        assert!(q.peek().is_none());
    }

    #[test]
    fn names_in_order() {
        let mut q = EntityQueue::new();
        q.enqueue(item("Ada"), None);
        q.enqueue(item("Byron"), None);
        assert_eq!(q.names().collect::<Vec<_>>(), vec!["Ada", "Byron"]);
    }
}
