#![forbid(unsafe_code)]

//! Slot table behind the [`NodeId`]s the host hands to the core.
//!
//! Released slots go on a free list and are reused, so the table is as large
//! as the most elements held at once, not every element ever seen. Finding
//! the id of a known element is the host's job (a `WeakMap` in the browser);
//! this table only maps ids to elements.

use folio_core::dom::NodeId;

/// Elements addressed by [`NodeId`].
#[derive(Debug, Clone)]
pub struct NodeRegistry<E> {
    slots: Vec<Option<E>>,
    free: Vec<u32>,
}

impl<E> Default for NodeRegistry<E> {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
        }
    }
}

impl<E> NodeRegistry<E> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `element`, reusing a released slot when there is one.
    pub fn insert(&mut self, element: E) -> NodeId {
        if let Some(index) = self.free.pop()
            && let Some(slot) = self.slots.get_mut(index as usize)
        {
            *slot = Some(element);
            return NodeId::new(index);
        }
        let index = u32::try_from(self.slots.len()).unwrap_or(u32::MAX);
        self.slots.push(Some(element));
        NodeId::new(index)
    }

    #[must_use]
    pub fn get(&self, node: NodeId) -> Option<&E> {
        self.slots.get(node.get() as usize)?.as_ref()
    }

    /// Free the slot for `node`, returning its element. Unknown and already
    /// released ids give `None`.
    pub fn release(&mut self, node: NodeId) -> Option<E> {
        let element = self.slots.get_mut(node.get() as usize)?.take()?;
        self.free.push(node.get());
        Some(element)
    }

    /// Live entries with their ids.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &E)> {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.as_ref()
                .map(|element| (NodeId::new(index as u32), element))
        })
    }

    /// Number of live entries.
    #[must_use]
    pub fn live(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    /// Slots allocated so far, live or free.
    #[must_use]
    pub fn slots(&self) -> usize {
        self.slots.len()
    }
}
