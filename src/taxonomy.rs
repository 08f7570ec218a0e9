//! The Message Taxonomy: the closed set of logical channels and the
//! directional chain-traversal order each one implies.
//!
//! The source system achieves channel dispatch via type-level method-name
//! inference; per the design notes we replace that with an explicit table
//! here. Every MCP method the pipeline will ever see maps to exactly one
//! [`Channel`], and each channel carries a fixed [`ChannelSet`] bit a hook
//! can declare support for.

/// A (method, direction) channel in the closed taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    /// `tools/call`
    ToolsCall,
    /// `tools/list`
    ToolsList,
    /// `prompts/list`
    PromptsList,
    /// `resources/list`
    ResourcesList,
    /// `resources/templates/list`
    ResourcesTemplatesList,
    /// `resources/read`
    ResourcesRead,
    /// `initialize`
    Initialize,
    /// Catch-all for unrecognized client-originated (source→target) requests.
    Other,
    /// Catch-all for server-originated (target→source) requests.
    Target,
    /// Client→server notifications.
    NotifyClientToServer,
    /// Server→client notifications.
    NotifyServerToClient,
}

impl Channel {
    /// All channels, in a stable order, for iteration and capability tables.
    pub const ALL: [Channel; 11] = [
        Channel::ToolsCall,
        Channel::ToolsList,
        Channel::PromptsList,
        Channel::ResourcesList,
        Channel::ResourcesTemplatesList,
        Channel::ResourcesRead,
        Channel::Initialize,
        Channel::Other,
        Channel::Target,
        Channel::NotifyClientToServer,
        Channel::NotifyServerToClient,
    ];

    /// Whether this channel carries a request/response pair (as opposed to
    /// being one of the two one-shot notification channels).
    #[must_use]
    pub fn is_request_bearing(self) -> bool {
        !matches!(
            self,
            Channel::NotifyClientToServer | Channel::NotifyServerToClient
        )
    }

    fn bit(self) -> u16 {
        1 << (self as u16)
    }
}

/// A bitset over [`Channel`], used to record which channels a [`crate::hook::Hook`]
/// implements a given handler (request/result/error/notification) for.
///
/// Built once per hook at chain-construction time (see [`crate::chain::HookChain::build`]),
/// this is the idiomatic-Rust substitute for runtime duck-typing: instead of
/// probing for the presence of a method named after the channel, a hook
/// self-reports the channels it cares about and the pipeline tests
/// membership in O(1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChannelSet(u16);

impl ChannelSet {
    /// The empty set — transparent pass-through on every channel.
    pub const NONE: ChannelSet = ChannelSet(0);

    /// Every channel.
    pub const ALL: ChannelSet = ChannelSet(0b0000_0111_1111_1111);

    /// Build a set from a list of channels.
    #[must_use]
    pub fn of(channels: &[Channel]) -> Self {
        let mut set = Self::NONE;
        for &c in channels {
            set = set.with(c);
        }
        set
    }

    /// Return a copy of this set with `channel` added.
    #[must_use]
    pub fn with(self, channel: Channel) -> Self {
        ChannelSet(self.0 | channel.bit())
    }

    /// Whether `channel` is a member of this set.
    #[must_use]
    pub fn contains(self, channel: Channel) -> bool {
        self.0 & channel.bit() != 0
    }
}

/// Direction of travel relative to the proxy: which side originated the
/// message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageDirection {
    /// Client → server (the common case: a tool call, a list request, ...).
    SourceToTarget,
    /// Server → target-initiated request, e.g. sampling.
    TargetToSource,
}

/// A taxonomy entry: everything the pipeline needs to route one channel.
#[derive(Debug, Clone, Copy)]
pub struct TaxonomyEntry {
    /// The channel this entry describes.
    pub channel: Channel,
    /// `true` for the two notification channels, `false` otherwise.
    pub is_notification: bool,
    /// Whether `continueAsync` is legal on this channel's request phase.
    /// Only request-bearing channels support it (see `spec.md` §4.C.4).
    pub supports_async: bool,
}

/// Look up the taxonomy entry for an incoming MCP method and direction.
///
/// Total over the closed set: methods outside the seven named channels map
/// to the `other`/`target` catch-all by direction.
#[must_use]
pub fn lookup_request(method: &str, direction: MessageDirection) -> TaxonomyEntry {
    let channel = match method {
        "tools/call" => Channel::ToolsCall,
        "tools/list" => Channel::ToolsList,
        "prompts/list" => Channel::PromptsList,
        "resources/list" => Channel::ResourcesList,
        "resources/templates/list" => Channel::ResourcesTemplatesList,
        "resources/read" => Channel::ResourcesRead,
        "initialize" => Channel::Initialize,
        _ => match direction {
            MessageDirection::SourceToTarget => Channel::Other,
            MessageDirection::TargetToSource => Channel::Target,
        },
    };
    TaxonomyEntry {
        channel,
        is_notification: false,
        supports_async: true,
    }
}

/// Look up the taxonomy entry for a notification and direction. Unlike
/// requests, notifications have exactly two channels regardless of method
/// name: the direction alone selects the channel.
#[must_use]
pub fn lookup_notification(direction: MessageDirection) -> TaxonomyEntry {
    let channel = match direction {
        MessageDirection::SourceToTarget => Channel::NotifyClientToServer,
        MessageDirection::TargetToSource => Channel::NotifyServerToClient,
    };
    TaxonomyEntry {
        channel,
        is_notification: true,
        supports_async: false,
    }
}

/// The chain-traversal direction a request phase runs in, determined by
/// [`MessageDirection`]: source→target requests walk head→tail ("forward");
/// target→source requests walk tail→head, for symmetry with response
/// unwinding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Head → tail.
    Forward,
    /// Tail → head.
    Reverse,
}

impl Direction {
    /// The request-phase traversal direction implied by a message direction.
    #[must_use]
    pub fn for_request(direction: MessageDirection) -> Self {
        match direction {
            MessageDirection::SourceToTarget => Direction::Forward,
            MessageDirection::TargetToSource => Direction::Reverse,
        }
    }

    /// The mirror direction, used to pair a response phase with the request
    /// phase that preceded it.
    #[must_use]
    pub fn reversed(self) -> Self {
        match self {
            Direction::Forward => Direction::Reverse,
            Direction::Reverse => Direction::Forward,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_method_maps_to_catch_all_by_direction() {
        let src = lookup_request("experimental/frobnicate", MessageDirection::SourceToTarget);
        assert!(matches!(src.channel, Channel::Other));
        let tgt = lookup_request("experimental/frobnicate", MessageDirection::TargetToSource);
        assert!(matches!(tgt.channel, Channel::Target));
    }

    #[test]
    fn known_methods_are_total_over_the_closed_set() {
        for (method, expected) in [
            ("tools/call", Channel::ToolsCall),
            ("tools/list", Channel::ToolsList),
            ("prompts/list", Channel::PromptsList),
            ("resources/list", Channel::ResourcesList),
            ("resources/templates/list", Channel::ResourcesTemplatesList),
            ("resources/read", Channel::ResourcesRead),
            ("initialize", Channel::Initialize),
        ] {
            let entry = lookup_request(method, MessageDirection::SourceToTarget);
            assert_eq!(entry.channel, expected);
        }
    }

    #[test]
    fn channel_set_contains_and_union() {
        let set = ChannelSet::of(&[Channel::ToolsCall, Channel::Initialize]);
        assert!(set.contains(Channel::ToolsCall));
        assert!(set.contains(Channel::Initialize));
        assert!(!set.contains(Channel::ToolsList));
    }

    #[test]
    fn notification_direction_selects_channel() {
        let c2s = lookup_notification(MessageDirection::SourceToTarget);
        assert!(matches!(c2s.channel, Channel::NotifyClientToServer));
        let s2c = lookup_notification(MessageDirection::TargetToSource);
        assert!(matches!(s2c.channel, Channel::NotifyServerToClient));
    }

    #[test]
    fn request_direction_is_mirrored_for_response() {
        let fwd = Direction::for_request(MessageDirection::SourceToTarget);
        assert_eq!(fwd, Direction::Forward);
        assert_eq!(fwd.reversed(), Direction::Reverse);
    }
}
