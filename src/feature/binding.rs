//! Template binding capability.
//!
//! Holds the game a template created for this arena. An arena whose binding
//! is empty is "not ready" and only exists in the Choosing phase.

use std::fmt;
use std::sync::{Arc, OnceLock};

use super::{FeatureProvider, FeatureRegistry};
use crate::game::Game;

struct Binding {
    template_id: String,
    game: Arc<dyn Game>,
}

/// The arena's bound game.
#[derive(Default)]
pub struct GameFeature {
    binding: OnceLock<Binding>,
}

impl GameFeature {
    /// Bind `game`. Returns false if a game is already bound.
    pub fn bind(&self, template_id: &str, game: Arc<dyn Game>) -> bool {
        self.binding
            .set(Binding {
                template_id: template_id.to_string(),
                game,
            })
            .is_ok()
    }

    /// Bound game, if any.
    pub fn game(&self) -> Option<Arc<dyn Game>> {
        self.binding.get().map(|b| b.game.clone())
    }

    /// Template the bound game came from.
    pub fn template_id(&self) -> Option<&str> {
        self.binding.get().map(|b| b.template_id.as_str())
    }

    /// Has a template been chosen?
    pub fn is_ready(&self) -> bool {
        self.binding.get().is_some()
    }
}

impl fmt::Debug for GameFeature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GameFeature")
            .field("template_id", &self.template_id())
            .finish()
    }
}

/// Attaches an empty [`GameFeature`].
#[derive(Debug, Default)]
pub struct GameBindingProvider;

impl FeatureProvider for GameBindingProvider {
    fn attach(&self, registry: &mut FeatureRegistry) {
        registry.attach(GameFeature::default());
    }
}
