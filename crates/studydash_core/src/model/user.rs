//! Caller identity passed into every store call.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque identifier of the authenticated user owning a record set.
pub type OwnerId = Uuid;

/// Explicit session context scoping reads and writes to one owner.
///
/// Stores never query across owners; a record written under one context is
/// invisible to every other context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserContext {
    owner_id: OwnerId,
}

impl UserContext {
    pub fn new(owner_id: OwnerId) -> Self {
        Self { owner_id }
    }

    pub fn owner_id(&self) -> OwnerId {
        self.owner_id
    }
}
