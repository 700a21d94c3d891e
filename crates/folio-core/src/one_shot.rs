#![forbid(unsafe_code)]

//! One-way `Pending → Fired` latches.
//!
//! Intersection observers may deliver a callback for an element more than
//! once (several entries in one batch, or a callback already queued when the
//! element was unobserved). Rather than relying on unsubscription timing, each
//! watched element gets a latch: the first [`fire`](OneShot::fire) wins and
//! every later one is a no-op.

use std::collections::BTreeMap;

use crate::dom::NodeId;

/// State of a single latch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OneShot {
    #[default]
    Pending,
    Fired,
}

impl OneShot {
    /// Transition to [`OneShot::Fired`]. Returns `true` only on the first call.
    pub fn fire(&mut self) -> bool {
        match self {
            Self::Pending => {
                *self = Self::Fired;
                true
            }
            Self::Fired => false,
        }
    }

    #[must_use]
    pub fn is_fired(self) -> bool {
        self == Self::Fired
    }
}

/// Latches keyed by element.
#[derive(Debug, Clone, Default)]
pub struct OneShotSet {
    latches: BTreeMap<NodeId, OneShot>,
}

impl OneShotSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm a latch for `node`. Re-arming an existing latch keeps its state.
    pub fn arm(&mut self, node: NodeId) {
        self.latches.entry(node).or_default();
    }

    /// Fire the latch for `node`. `false` for unknown nodes and for latches
    /// that already fired.
    pub fn fire(&mut self, node: NodeId) -> bool {
        self.latches.get_mut(&node).is_some_and(OneShot::fire)
    }

    #[must_use]
    pub fn is_fired(&self, node: NodeId) -> bool {
        self.latches.get(&node).is_some_and(|l| l.is_fired())
    }

    /// Latches still waiting.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.latches.values().filter(|l| !l.is_fired()).count()
    }

    /// Nodes whose latch has not fired yet.
    pub fn pending_nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.latches
            .iter()
            .filter(|(_, latch)| !latch.is_fired())
            .map(|(&node, _)| node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_once() {
        let mut latch = OneShot::default();
        assert!(latch.fire());
        assert!(!latch.fire());
        assert!(latch.is_fired());
    }

    #[test]
    fn unknown_nodes_never_fire() {
        let mut set = OneShotSet::new();
        assert!(!set.fire(NodeId::new(7)));
        assert_eq!(set.pending(), 0);
    }

    #[test]
    fn rearming_keeps_fired_state() {
        let mut set = OneShotSet::new();
        let node = NodeId::new(1);
        set.arm(node);
        assert!(set.fire(node));
        set.arm(node);
        assert!(!set.fire(node));
        assert!(set.is_fired(node));
        assert_eq!(set.pending(), 0);
    }

    #[test]
    fn latches_are_independent() {
        let mut set = OneShotSet::new();
        let (a, b) = (NodeId::new(1), NodeId::new(2));
        set.arm(a);
        set.arm(b);
        assert!(set.fire(a));
        assert_eq!(set.pending(), 1);
        assert_eq!(set.pending_nodes().collect::<Vec<_>>(), vec![b]);
        assert!(set.fire(b));
        assert_eq!(set.pending_nodes().count(), 0);
    }
}
