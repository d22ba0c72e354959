//! Template Registry
//!
//! Catalog of game blueprints, keyed by id. A template turns an arena view
//! into a fresh [`Game`] each time an arena chooses it.

use dashmap::DashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

use crate::feature::FeatureError;
use crate::game::{ArenaView, Game};

/// Template errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    /// No template registered under this id.
    #[error("template not found: {0}")]
    NotFound(String),

    /// Settings no match could run with.
    #[error("invalid template {id}: {reason}")]
    Invalid {
        /// Template id.
        id: String,
        /// What is wrong.
        reason: String,
    },

    /// The arena lacks a capability the game needs.
    #[error(transparent)]
    Feature(#[from] FeatureError),
}

/// Blueprint for one kind of game.
pub trait Template: Send + Sync {
    /// Unique id.
    fn id(&self) -> &str;

    /// Name shown in menus.
    fn display_name(&self) -> &str;

    /// Maximum participants per arena.
    fn capacity(&self) -> usize;

    /// Build a game bound to `arena`.
    fn create_game(&self, arena: ArenaView) -> Result<Arc<dyn Game>, TemplateError>;
}

/// Concurrent template catalog.
#[derive(Default)]
pub struct TemplateRegistry {
    templates: DashMap<String, Arc<dyn Template>>,
}

impl TemplateRegistry {
    /// Empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a template, returning the one it replaced.
    pub fn register(&self, template: Arc<dyn Template>) -> Option<Arc<dyn Template>> {
        let id = template.id().to_string();
        info!(template = %id, capacity = template.capacity(), "Template registered");
        self.templates.insert(id, template)
    }

    /// Look a template up by id.
    pub fn resolve(&self, id: &str) -> Result<Arc<dyn Template>, TemplateError> {
        self.templates
            .get(id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| TemplateError::NotFound(id.to_string()))
    }

    /// Registered ids, sorted.
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.templates.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        ids
    }

    /// All templates, sorted by id.
    pub fn templates(&self) -> Vec<Arc<dyn Template>> {
        let mut templates: Vec<Arc<dyn Template>> =
            self.templates.iter().map(|e| e.value().clone()).collect();
        templates.sort_by(|a, b| a.id().cmp(b.id()));
        templates
    }

    /// Number of templates.
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    /// Empty catalog?
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Drop every template.
    pub fn clear(&self) {
        self.templates.clear();
    }
}
