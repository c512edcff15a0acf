use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

use super::Item;

/// One outstanding fetch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Request {
    pub item: Item,
    /// Peer currently asked.
    pub peer: SocketAddr,
    pub deadline: Instant,
    /// Re-requests made so far.
    pub retries: u32,
    /// Other peers that announced the item, in announcement order.
    pub advertisers: Vec<SocketAddr>,
}

/// What happened to a request that failed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Retry {
    /// Asked another advertiser instead.
    Reassigned {
        item: Item,
        from: SocketAddr,
        to: SocketAddr,
    },
    /// No advertiser or no retries left; the item is forgotten.
    Abandoned { item: Item, peer: SocketAddr },
}

/// In-flight fetches, at most one per item.
///
/// Time is passed in, so every transition is deterministic.
pub struct RequestTracker {
    in_flight: HashMap<Item, Request>,
    timeout: Duration,
    max_retries: u32,
}

impl RequestTracker {
    pub fn new(timeout: Duration, max_retries: u32) -> Self {
        Self {
            in_flight: HashMap::new(),
            timeout,
            max_retries,
        }
    }

    /// Record that `peer` can serve `item`.
    ///
    /// Returns `true` when a fetch should be sent to `peer` now. An item
    /// already in flight only gains `peer` as a fallback.
    pub fn begin(&mut self, item: Item, peer: SocketAddr, now: Instant) -> bool {
        match self.in_flight.get_mut(&item) {
            Some(request) => {
                if request.peer != peer && !request.advertisers.contains(&peer) {
                    request.advertisers.push(peer);
                }
                false
            }
            None => {
                self.in_flight.insert(
                    item,
                    Request {
                        item,
                        peer,
                        deadline: now + self.timeout,
                        retries: 0,
                        advertisers: Vec::new(),
                    },
                );
                true
            }
        }
    }

    /// The item arrived, from anyone.
    pub fn complete(&mut self, item: &Item) -> Option<Request> {
        self.in_flight.remove(item)
    }

    /// `peer` answered that it does not have `item`.
    pub fn fail(&mut self, item: &Item, peer: SocketAddr, now: Instant) -> Option<Retry> {
        if self.in_flight.get(item)?.peer != peer {
            return None;
        }
        self.in_flight
            .remove(item)
            .map(|request| self.retry(request, now))
    }

    /// Retry or abandon every request past its deadline.
    pub fn expire(&mut self, now: Instant) -> Vec<Retry> {
        let expired: Vec<Item> = self
            .in_flight
            .values()
            .filter(|request| request.deadline <= now)
            .map(|request| request.item)
            .collect();
        self.retry_all(expired, now)
    }

    /// `peer` went away: move its requests elsewhere and drop it as a
    /// fallback everywhere.
    pub fn forget_peer(&mut self, peer: SocketAddr, now: Instant) -> Vec<Retry> {
        let mut assigned = Vec::new();
        for request in self.in_flight.values_mut() {
            request.advertisers.retain(|advertiser| *advertiser != peer);
            if request.peer == peer {
                assigned.push(request.item);
            }
        }
        self.retry_all(assigned, now)
    }

    pub fn contains(&self, item: &Item) -> bool {
        self.in_flight.contains_key(item)
    }

    pub fn get(&self, item: &Item) -> Option<&Request> {
        self.in_flight.get(item)
    }

    pub fn len(&self) -> usize {
        self.in_flight.len()
    }

    pub fn is_empty(&self) -> bool {
        self.in_flight.is_empty()
    }

    fn retry_all(&mut self, items: Vec<Item>, now: Instant) -> Vec<Retry> {
        let mut retries = Vec::with_capacity(items.len());
        for item in items {
            if let Some(request) = self.in_flight.remove(&item) {
                retries.push(self.retry(request, now));
            }
        }
        retries
    }

    /// Hand a removed request to its next advertiser, or give up.
    fn retry(&mut self, mut request: Request, now: Instant) -> Retry {
        let item = request.item;
        let from = request.peer;
        if request.retries >= self.max_retries || request.advertisers.is_empty() {
            return Retry::Abandoned { item, peer: from };
        }
        let to = request.advertisers.remove(0);
        request.peer = to;
        request.retries += 1;
        request.deadline = now + self.timeout;
        self.in_flight.insert(item, request);
        Retry::Reassigned { item, from, to }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TIMEOUT: Duration = Duration::from_millis(100);

    fn peer(port: u16) -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], port))
    }

    fn item() -> Item {
        Item::transaction([9; 32])
    }

    #[test]
    fn test_second_advertiser_becomes_fallback() {
        let now = Instant::now();
        let mut tracker = RequestTracker::new(TIMEOUT, 2);
        assert!(tracker.begin(item(), peer(1), now));
        assert!(!tracker.begin(item(), peer(2), now));
        assert!(!tracker.begin(item(), peer(2), now));
        assert_eq!(tracker.get(&item()).unwrap().advertisers, vec![peer(2)]);
    }

    #[test]
    fn test_timeout_retries_against_another_peer() {
        let now = Instant::now();
        let mut tracker = RequestTracker::new(TIMEOUT, 2);
        tracker.begin(item(), peer(1), now);
        tracker.begin(item(), peer(2), now);

        assert!(tracker.expire(now + TIMEOUT / 2).is_empty());
        assert_eq!(
            tracker.expire(now + TIMEOUT),
            vec![Retry::Reassigned {
                item: item(),
                from: peer(1),
                to: peer(2)
            }]
        );
        assert_eq!(
            tracker.expire(now + TIMEOUT * 2),
            vec![Retry::Abandoned {
                item: item(),
                peer: peer(2)
            }]
        );
        assert!(tracker.is_empty());
    }

    #[test]
    fn test_retries_are_bounded() {
        let now = Instant::now();
        let mut tracker = RequestTracker::new(TIMEOUT, 1);
        for port in 1..=3 {
            tracker.begin(item(), peer(port), now);
        }
        assert!(matches!(
            tracker.fail(&item(), peer(1), now),
            Some(Retry::Reassigned { .. })
        ));
        assert!(matches!(
            tracker.fail(&item(), peer(2), now),
            Some(Retry::Abandoned { .. })
        ));
    }

    #[test]
    fn test_not_found_from_other_peer_is_ignored() {
        let now = Instant::now();
        let mut tracker = RequestTracker::new(TIMEOUT, 2);
        tracker.begin(item(), peer(1), now);
        assert_eq!(tracker.fail(&item(), peer(2), now), None);
        assert!(tracker.complete(&item()).is_some());
        assert_eq!(tracker.fail(&item(), peer(1), now), None);
    }

    #[test]
    fn test_forget_peer_reassigns_and_prunes() {
        let now = Instant::now();
        let mut tracker = RequestTracker::new(TIMEOUT, 2);
        let other = Item::transaction([1; 32]);
        tracker.begin(item(), peer(1), now);
        tracker.begin(item(), peer(2), now);
        tracker.begin(other, peer(2), now);
        tracker.begin(other, peer(1), now);

        let retries = tracker.forget_peer(peer(1), now);
        assert_eq!(
            retries,
            vec![Retry::Reassigned {
                item: item(),
                from: peer(1),
                to: peer(2)
            }]
        );
        assert!(tracker.get(&other).unwrap().advertisers.is_empty());
    }
}
