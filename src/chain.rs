//! The Hook Chain: an immutable, doubly-linked sequence of hooks.
//!
//! Nodes never move after [`HookChain::build`] returns, and node identity —
//! not the hook itself — is what callers use to resume processing (the
//! "last processed node" pairing key between request and response phases).

use std::sync::Arc;

use crate::hook::Hook;
use crate::taxonomy::{Channel, ChannelSet, Direction};

/// Opaque identity of a node in a [`HookChain`]. Stable for the lifetime of
/// the chain; never reused across chains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

/// One link in the chain: a hook plus its precomputed capability bitsets and
/// its neighbors.
///
/// The capability bitsets are probed once at build time (see the design
/// notes: "a builder may probe each hook once at chain build time and cache
/// a bitset of implemented channels per node") rather than on every hop.
pub struct ChainNode {
    id: NodeId,
    hook: Arc<dyn Hook>,
    request_channels: ChannelSet,
    result_channels: ChannelSet,
    error_channels: ChannelSet,
    notification_channels: ChannelSet,
    prev: Option<NodeId>,
    next: Option<NodeId>,
}

impl ChainNode {
    /// This node's stable identity.
    #[must_use]
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// The hook held by this node.
    #[must_use]
    pub fn hook(&self) -> &Arc<dyn Hook> {
        &self.hook
    }

    /// Whether this node's hook implements a request handler for `channel`.
    #[must_use]
    pub fn handles_request(&self, channel: Channel) -> bool {
        self.request_channels.contains(channel)
    }

    /// Whether this node's hook implements a result handler for `channel`.
    #[must_use]
    pub fn handles_result(&self, channel: Channel) -> bool {
        self.result_channels.contains(channel)
    }

    /// Whether this node's hook implements an error handler for `channel`.
    #[must_use]
    pub fn handles_error(&self, channel: Channel) -> bool {
        self.error_channels.contains(channel)
    }

    /// Whether this node's hook implements a notification handler for `channel`.
    #[must_use]
    pub fn handles_notification(&self, channel: Channel) -> bool {
        self.notification_channels.contains(channel)
    }
}

/// An immutable ordered sequence of hooks with O(1) access to head, tail,
/// and each node's neighbors.
///
/// Invariants: order matches the input to [`HookChain::build`]; no duplicate
/// nodes; the chain cannot be mutated after construction; nodes are never
/// shared between chains (each [`HookChain::build`] call produces fresh
/// [`NodeId`]s local to that chain).
pub struct HookChain {
    nodes: Vec<ChainNode>,
    head: Option<NodeId>,
    tail: Option<NodeId>,
}

impl HookChain {
    /// Build a chain from an ordered list of hooks. An empty list produces
    /// an empty chain (`head == tail == None`).
    #[must_use]
    pub fn build(hooks: Vec<Arc<dyn Hook>>) -> Self {
        let mut nodes = Vec::with_capacity(hooks.len());
        for (idx, hook) in hooks.into_iter().enumerate() {
            let id = NodeId(idx);
            let prev = idx.checked_sub(1).map(NodeId);
            nodes.push(ChainNode {
                id,
                request_channels: hook.request_channels(),
                result_channels: hook.result_channels(),
                error_channels: hook.error_channels(),
                notification_channels: hook.notification_channels(),
                hook,
                prev,
                next: None,
            });
        }
        let len = nodes.len();
        for idx in 0..len {
            if idx + 1 < len {
                nodes[idx].next = Some(NodeId(idx + 1));
            }
        }
        let head = nodes.first().map(ChainNode::id);
        let tail = nodes.last().map(ChainNode::id);
        Self { nodes, head, tail }
    }

    /// The first node in the chain, or `None` if empty.
    #[must_use]
    pub fn head(&self) -> Option<NodeId> {
        self.head
    }

    /// The last node in the chain, or `None` if empty.
    #[must_use]
    pub fn tail(&self) -> Option<NodeId> {
        self.tail
    }

    /// Number of hooks in the chain.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the chain has no hooks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Fetch a node by id.
    #[must_use]
    pub fn node(&self, id: NodeId) -> &ChainNode {
        &self.nodes[id.0]
    }

    /// The starting node for a traversal in the given direction, or `None`
    /// if the chain is empty.
    #[must_use]
    pub fn start(&self, direction: Direction) -> Option<NodeId> {
        match direction {
            Direction::Forward => self.head,
            Direction::Reverse => self.tail,
        }
    }

    /// The next node to visit after `id`, walking in `direction`.
    #[must_use]
    pub fn step(&self, id: NodeId, direction: Direction) -> Option<NodeId> {
        let node = self.node(id);
        match direction {
            Direction::Forward => node.next,
            Direction::Reverse => node.prev,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hook::Hook;
    use async_trait::async_trait;

    struct NamedHook(&'static str);

    #[async_trait]
    impl Hook for NamedHook {
        fn name(&self) -> &str {
            self.0
        }
    }

    #[test]
    fn empty_chain_has_no_head_or_tail() {
        let chain = HookChain::build(vec![]);
        assert!(chain.is_empty());
        assert_eq!(chain.head(), None);
        assert_eq!(chain.tail(), None);
    }

    #[test]
    fn chain_preserves_order_and_links_neighbors() {
        let hooks: Vec<Arc<dyn Hook>> = vec![
            Arc::new(NamedHook("h1")),
            Arc::new(NamedHook("h2")),
            Arc::new(NamedHook("h3")),
        ];
        let chain = HookChain::build(hooks);
        assert_eq!(chain.len(), 3);

        let head = chain.head().unwrap();
        assert_eq!(chain.node(head).hook().name(), "h1");

        let mid = chain.step(head, Direction::Forward).unwrap();
        assert_eq!(chain.node(mid).hook().name(), "h2");

        let tail = chain.step(mid, Direction::Forward).unwrap();
        assert_eq!(chain.node(tail).hook().name(), "h3");
        assert_eq!(Some(tail), chain.tail());
        assert_eq!(chain.step(tail, Direction::Forward), None);

        // Walking backward retraces the same nodes in reverse.
        assert_eq!(chain.step(tail, Direction::Reverse), Some(mid));
        assert_eq!(chain.step(mid, Direction::Reverse), Some(head));
        assert_eq!(chain.step(head, Direction::Reverse), None);
    }
}
