//! Arena ownership capability.

use std::sync::OnceLock;

use super::{FeatureProvider, FeatureRegistry};
use crate::core::ParticipantId;

/// Participant who created the arena. Set at most once.
#[derive(Debug, Default)]
pub struct OwnerFeature {
    owner: OnceLock<ParticipantId>,
}

impl OwnerFeature {
    /// Record the owner. Returns false if one was already recorded.
    pub fn set_owner(&self, owner: ParticipantId) -> bool {
        self.owner.set(owner).is_ok()
    }

    /// Recorded owner, if any.
    pub fn owner(&self) -> Option<ParticipantId> {
        self.owner.get().copied()
    }

    /// Is `participant` the owner?
    pub fn is_owner(&self, participant: ParticipantId) -> bool {
        self.owner() == Some(participant)
    }
}

/// Attaches an empty [`OwnerFeature`].
#[derive(Debug, Default)]
pub struct OwnerProvider;

impl FeatureProvider for OwnerProvider {
    fn attach(&self, registry: &mut FeatureRegistry) {
        registry.attach(OwnerFeature::default());
    }
}
