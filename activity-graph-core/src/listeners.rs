//! Scoped global-listener subscriptions
//!
//! The host owns the real window listeners and asks the registry whether any
//! component currently wants an event kind delivered. A subscription lasts
//! exactly as long as its guard.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

/// Window-level event an outside-click handler can bind to
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ListenerKind {
    Click,
    MouseDown,
}

type Counts = Rc<RefCell<BTreeMap<ListenerKind, usize>>>;

/// Single-threaded registry of active subscriptions
#[derive(Debug, Clone, Default)]
pub struct ListenerRegistry {
    counts: Counts,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, kind: ListenerKind) -> ListenerGuard {
        *self.counts.borrow_mut().entry(kind).or_insert(0) += 1;
        ListenerGuard {
            kind,
            counts: Rc::clone(&self.counts),
        }
    }

    pub fn is_subscribed(&self, kind: ListenerKind) -> bool {
        self.subscriber_count(kind) > 0
    }

    pub fn subscriber_count(&self, kind: ListenerKind) -> usize {
        self.counts.borrow().get(&kind).copied().unwrap_or(0)
    }
}

/// Unsubscribes on drop
#[derive(Debug)]
#[must_use = "dropping the guard unsubscribes immediately"]
pub struct ListenerGuard {
    kind: ListenerKind,
    counts: Counts,
}

impl ListenerGuard {
    pub fn kind(&self) -> ListenerKind {
        self.kind
    }
}

impl Drop for ListenerGuard {
    fn drop(&mut self) {
        let mut counts = self.counts.borrow_mut();
        if let Some(count) = counts.get_mut(&self.kind) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                counts.remove(&self.kind);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_scopes_subscription() {
        let registry = ListenerRegistry::new();
        {
            let _guard = registry.subscribe(ListenerKind::Click);
            assert!(registry.is_subscribed(ListenerKind::Click));
            assert!(!registry.is_subscribed(ListenerKind::MouseDown));
        }
        assert!(!registry.is_subscribed(ListenerKind::Click));
    }

    #[test]
    fn test_nested_subscriptions_are_counted() {
        let registry = ListenerRegistry::new();
        let first = registry.subscribe(ListenerKind::MouseDown);
        let second = registry.subscribe(ListenerKind::MouseDown);
        assert_eq!(registry.subscriber_count(ListenerKind::MouseDown), 2);
        drop(first);
        assert!(registry.is_subscribed(ListenerKind::MouseDown));
        drop(second);
        assert_eq!(registry.subscriber_count(ListenerKind::MouseDown), 0);
    }
}
