//! Two-phase actor activation.
//!
//! Construction is synchronous, but most kinds need animation metadata before
//! they can simulate. `on_activated` returns [`Activation::Await`] naming the
//! metadata; the level keeps the actor in a pending list until the content
//! resolver delivers it, then commits it. Dropping a pending activation
//! cancels its content request.

use glam::Vec2;

use super::ActorState;
use crate::content::MetadataTicket;
use crate::events::params::{SpawnParams, SPAWN_PARAMS_SIZE};

use super::{Actor, ActorHandle};

#[derive(Debug, Clone, Copy)]
pub struct ActorActivationDetails {
    pub pos: Vec2,
    pub state: ActorState,
    pub params: SpawnParams,
}

impl ActorActivationDetails {
    pub fn new(pos: Vec2) -> Self {
        Self {
            pos,
            state: ActorState::empty(),
            params: [0; SPAWN_PARAMS_SIZE],
        }
    }

    pub fn with_params(mut self, params: SpawnParams) -> Self {
        self.params = params;
        self
    }

    pub fn with_state(mut self, state: ActorState) -> Self {
        self.state = state;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Activation {
    /// Suspend until the metadata at this path is loaded.
    Await(String),
    Commit,
    Discard,
}

/// An actor parked while its metadata loads.
#[derive(Debug)]
pub struct PendingActivation {
    pub handle: ActorHandle,
    pub actor: Box<Actor>,
    pub ticket: MetadataTicket,
}
