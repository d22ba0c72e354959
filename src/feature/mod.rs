//! Arena Features
//!
//! Capabilities are attached to an arena at creation time and looked up by
//! type. The arena itself knows nothing about what is attached: timers,
//! ownership and the game binding are all just features.
//!
//! ```text
//! FeatureRegistry ── attach::<TimerFeature>() ──► Arc<TimerFeature>
//!        │
//!        └── get::<GameFeature>() ──► Ok(Arc<GameFeature>)
//!                                 └─► Err(CapabilityNotFound)
//! ```

pub mod binding;
pub mod owner;
pub mod timer;

use std::any::{type_name, Any, TypeId};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use crate::core::Clock;

pub use binding::{GameBindingProvider, GameFeature};
pub use owner::{OwnerFeature, OwnerProvider};
pub use timer::{TimerFeature, TimerProvider};

/// Feature lookup errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FeatureError {
    /// The arena was created without this capability.
    #[error("capability {capability} is not attached to arena {arena}")]
    CapabilityNotFound {
        /// Type name of the missing capability.
        capability: &'static str,
        /// Arena that was asked.
        arena: String,
    },
}

struct FeatureSlot {
    type_id: TypeId,
    capability: &'static str,
    instance: Arc<dyn Any + Send + Sync>,
}

/// Typed capability store owned by one arena.
///
/// Attachment order is kept. Attaching a second instance of the same type
/// replaces the first in place.
pub struct FeatureRegistry {
    arena: String,
    slots: Vec<FeatureSlot>,
}

impl FeatureRegistry {
    /// Empty registry for the named arena.
    pub fn new(arena: impl Into<String>) -> Self {
        Self {
            arena: arena.into(),
            slots: Vec::new(),
        }
    }

    /// Attach a capability, returning a shared handle to it.
    pub fn attach<T: Send + Sync + 'static>(&mut self, instance: T) -> Arc<T> {
        self.attach_arc(Arc::new(instance))
    }

    /// Attach an already shared capability.
    pub fn attach_arc<T: Send + Sync + 'static>(&mut self, instance: Arc<T>) -> Arc<T> {
        let erased: Arc<dyn Any + Send + Sync> = instance.clone();
        let slot = FeatureSlot {
            type_id: TypeId::of::<T>(),
            capability: type_name::<T>(),
            instance: erased,
        };

        match self.slots.iter_mut().find(|s| s.type_id == slot.type_id) {
            Some(existing) => *existing = slot,
            None => self.slots.push(slot),
        }
        instance
    }

    /// Look up a capability by type.
    pub fn get<T: Send + Sync + 'static>(&self) -> Result<Arc<T>, FeatureError> {
        self.slots
            .iter()
            .find(|s| s.type_id == TypeId::of::<T>())
            .and_then(|s| s.instance.clone().downcast::<T>().ok())
            .ok_or_else(|| FeatureError::CapabilityNotFound {
                capability: type_name::<T>(),
                arena: self.arena.clone(),
            })
    }

    /// Is a capability of this type attached?
    pub fn contains<T: Send + Sync + 'static>(&self) -> bool {
        self.slots.iter().any(|s| s.type_id == TypeId::of::<T>())
    }

    /// Names of attached capabilities, in attachment order.
    pub fn capabilities(&self) -> Vec<&'static str> {
        self.slots.iter().map(|s| s.capability).collect()
    }

    /// Arena this registry belongs to.
    pub fn arena(&self) -> &str {
        &self.arena
    }

    /// Number of attached capabilities.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Nothing attached?
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

impl fmt::Debug for FeatureRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FeatureRegistry")
            .field("arena", &self.arena)
            .field("capabilities", &self.capabilities())
            .finish()
    }
}

/// Attaches one concern to every arena a manager creates.
pub trait FeatureProvider: Send + Sync {
    /// Attach a fresh instance to `registry`.
    fn attach(&self, registry: &mut FeatureRegistry);
}

/// Timer, ownership and game binding, in that order.
pub fn default_providers(clock: Arc<dyn Clock>) -> Vec<Box<dyn FeatureProvider>> {
    vec![
        Box::new(TimerProvider::new(clock)),
        Box::new(OwnerProvider),
        Box::new(GameBindingProvider),
    ]
}
