use std::collections::{HashMap, VecDeque};

use parking_lot::RwLock;
use shared_types::Hash;
use wc_04_message_codec::Message;

/// Recently accepted messages by content id, oldest evicted first.
///
/// Answers fetches without touching the chain and keeps the bytes each
/// message arrived with, so a relayed message is identical to the one
/// received.
pub struct MessageCache {
    cache: RwLock<HashMap<Hash, Message>>,
    insertion_order: RwLock<VecDeque<Hash>>,
    max_size: usize,
}

impl MessageCache {
    pub fn new(max_size: usize) -> Self {
        Self {
            cache: RwLock::new(HashMap::with_capacity(max_size)),
            insertion_order: RwLock::new(VecDeque::with_capacity(max_size)),
            max_size,
        }
    }

    pub fn contains(&self, id: &Hash) -> bool {
        self.cache.read().contains_key(id)
    }

    pub fn get(&self, id: &Hash) -> Option<Message> {
        self.cache.read().get(id).cloned()
    }

    /// Returns `false` if a message with the same content id was cached.
    pub fn insert(&self, message: Message) -> bool {
        if self.max_size == 0 {
            return false;
        }
        let id = message.content_id();
        let mut cache = self.cache.write();
        let mut order = self.insertion_order.write();
        if cache.contains_key(&id) {
            return false;
        }
        while cache.len() >= self.max_size {
            match order.pop_front() {
                Some(oldest) => {
                    cache.remove(&oldest);
                }
                None => break,
            }
        }
        cache.insert(id, message);
        order.push_back(id);
        true
    }

    pub fn len(&self) -> usize {
        self.cache.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_evicts_oldest() {
        let cache = MessageCache::new(2);
        let (a, b, c) = (
            Message::keep_alive(1),
            Message::keep_alive(2),
            Message::keep_alive(3),
        );
        assert!(cache.insert(a.clone()));
        assert!(!cache.insert(a.clone()));
        assert!(cache.insert(b.clone()));
        assert!(cache.insert(c.clone()));

        assert_eq!(cache.len(), 2);
        assert!(!cache.contains(&a.content_id()));
        assert_eq!(cache.get(&c.content_id()), Some(c));
    }
}
