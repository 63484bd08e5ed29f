//! Placeable part assets.

use crate::descriptor::{GridDescriptor, ParseError};
use glam::{Quat, Vec2};
use std::sync::Arc;

/// A head socket a part exposes once it has been placed.
#[derive(Clone, Debug)]
pub struct SocketMount {
    /// The socket region. Must have the `Head` role.
    pub head: Arc<GridDescriptor>,

    /// Where the socket's top-left corner sits, in the part's unrotated cell space.
    pub anchor: Vec2,

    /// Orientation of the socket relative to the part.
    pub local_rotation: Quat,
}

impl SocketMount {
    pub fn new(head: Arc<GridDescriptor>, anchor: Vec2) -> Self {
        Self {
            head,
            anchor,
            local_rotation: Quat::IDENTITY,
        }
    }

    pub fn with_rotation(mut self, local_rotation: Quat) -> Self {
        self.local_rotation = local_rotation;
        self
    }
}

/// An authored part: its footprint and requirements, plus the sockets it hosts.
#[derive(Clone, Debug)]
pub struct PartDefinition {
    pub tail: Arc<GridDescriptor>,
    pub sockets: Vec<SocketMount>,
}

impl PartDefinition {
    pub fn new(tail: Arc<GridDescriptor>) -> Self {
        Self {
            tail,
            sockets: Vec::new(),
        }
    }

    /// A socket-less part straight from its authoring string.
    pub fn parse(tail: &str) -> Result<Self, ParseError> {
        GridDescriptor::try_parse(tail).map(|d| Self::new(Arc::new(d)))
    }

    /// Adds a hosted socket (builder pattern).
    pub fn with_socket(mut self, mount: SocketMount) -> Self {
        self.sockets.push(mount);
        self
    }

    pub fn hosts_sockets(&self) -> bool {
        !self.sockets.is_empty()
    }
}
