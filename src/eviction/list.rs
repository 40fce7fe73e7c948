//! Arena-backed doubly linked list of keys.
//!
//! Nodes live in a `Vec` and link to each other by index, so the list can be
//! walked in both directions and addressed from the key map without pointer
//! cycles. Freed slots are recycled through a free list.

use std::collections::HashMap;

/// Stable index of a node in the arena.
pub type NodeIndex = usize;

#[derive(Debug)]
struct Node {
    key: String,
    visited: bool,
    prev: Option<NodeIndex>,
    next: Option<NodeIndex>,
}

/// Doubly linked list of keys. Head is the newest end, tail the oldest.
#[derive(Debug, Default)]
pub struct KeyList {
    nodes: Vec<Option<Node>>,
    free: Vec<NodeIndex>,
    index: HashMap<String, NodeIndex>,
    head: Option<NodeIndex>,
    tail: Option<NodeIndex>,
}

impl KeyList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn find(&self, key: &str) -> Option<NodeIndex> {
        self.index.get(key).copied()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    pub fn head(&self) -> Option<NodeIndex> {
        self.head
    }

    pub fn tail(&self) -> Option<NodeIndex> {
        self.tail
    }

    pub fn prev(&self, idx: NodeIndex) -> Option<NodeIndex> {
        self.node(idx).and_then(|n| n.prev)
    }

    pub fn next(&self, idx: NodeIndex) -> Option<NodeIndex> {
        self.node(idx).and_then(|n| n.next)
    }

    pub fn key(&self, idx: NodeIndex) -> Option<&str> {
        self.node(idx).map(|n| n.key.as_str())
    }

    pub fn is_visited(&self, idx: NodeIndex) -> bool {
        self.node(idx).is_some_and(|n| n.visited)
    }

    pub fn set_visited(&mut self, idx: NodeIndex, visited: bool) {
        if let Some(node) = self.node_mut(idx) {
            node.visited = visited;
        }
    }

    /// Inserts `key` at the head with a clear visited bit.
    ///
    /// The caller must ensure the key is not already present.
    pub fn push_head(&mut self, key: String) -> NodeIndex {
        let node = Node {
            key: key.clone(),
            visited: false,
            prev: None,
            next: None,
        };
        let idx = match self.free.pop() {
            Some(idx) => {
                self.nodes[idx] = Some(node);
                idx
            }
            None => {
                self.nodes.push(Some(node));
                self.nodes.len() - 1
            }
        };
        self.index.insert(key, idx);
        self.link_head(idx);
        idx
    }

    /// Moves an existing node to the head.
    pub fn move_to_head(&mut self, idx: NodeIndex) {
        if self.head == Some(idx) || self.node(idx).is_none() {
            return;
        }
        self.unlink(idx);
        self.link_head(idx);
    }

    /// Unlinks the node, frees its slot and returns its key.
    pub fn remove(&mut self, idx: NodeIndex) -> Option<String> {
        self.node(idx)?;
        self.unlink(idx);
        let node = self.nodes[idx].take()?;
        self.index.remove(&node.key);
        self.free.push(idx);
        Some(node.key)
    }

    /// Keys from head to tail.
    pub fn keys(&self) -> Vec<String> {
        let mut out = Vec::with_capacity(self.len());
        let mut cursor = self.head;
        while let Some(idx) = cursor {
            if let Some(node) = self.node(idx) {
                out.push(node.key.clone());
            }
            cursor = self.next(idx);
        }
        out
    }

    fn node(&self, idx: NodeIndex) -> Option<&Node> {
        self.nodes.get(idx).and_then(Option::as_ref)
    }

    fn node_mut(&mut self, idx: NodeIndex) -> Option<&mut Node> {
        self.nodes.get_mut(idx).and_then(Option::as_mut)
    }

    fn link_head(&mut self, idx: NodeIndex) {
        let old_head = self.head;
        if let Some(node) = self.node_mut(idx) {
            node.prev = None;
            node.next = old_head;
        }
        match old_head {
            Some(h) => {
                if let Some(head) = self.node_mut(h) {
                    head.prev = Some(idx);
                }
            }
            None => self.tail = Some(idx),
        }
        self.head = Some(idx);
    }

    fn unlink(&mut self, idx: NodeIndex) {
        let (prev, next) = match self.node(idx) {
            Some(n) => (n.prev, n.next),
            None => return,
        };

        match prev {
            Some(p) => {
                if let Some(node) = self.node_mut(p) {
                    node.next = next;
                }
            }
            None => self.head = next,
        }
        match next {
            Some(n) => {
                if let Some(node) = self.node_mut(n) {
                    node.prev = prev;
                }
            }
            None => self.tail = prev,
        }

        if let Some(node) = self.node_mut(idx) {
            node.prev = None;
            node.next = None;
        }
    }
}
