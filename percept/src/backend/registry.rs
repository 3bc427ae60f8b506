//! Registry mapping approach ids to back end factories.
//!
//! The registry is the only place approach ids resolve to concrete
//! implementations. Registration order is significant: it defines the
//! fallback order used to pick a switch target when more than two
//! approaches are configured.

use super::{ApproachId, Backend, BackendError};

/// Factory producing a fresh, unstarted back end instance.
///
/// Creation is cheap; expensive work (model loading, server handshakes)
/// belongs in [`Backend::start`], which the controller runs off the frame
/// path. A factory may fail (for example when an HTTP client cannot be
/// built); during a dynamic swap that is treated like a failed candidate
/// start.
pub type BackendFactory = Box<dyn Fn() -> Result<Box<dyn Backend>, BackendError> + Send>;

/// Explicit approach-id to factory mapping.
pub struct BackendRegistry {
    entries: Vec<(ApproachId, BackendFactory)>,
}

impl BackendRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Register a factory for an approach id.
    ///
    /// Ids must be unique; registering one twice is a configuration error.
    pub fn register(
        &mut self,
        id: ApproachId,
        factory: BackendFactory,
    ) -> Result<(), BackendError> {
        if self.contains(&id) {
            return Err(BackendError::DuplicateApproach(id));
        }
        self.entries.push((id, factory));
        Ok(())
    }

    /// `true` if the id is registered.
    pub fn contains(&self, id: &ApproachId) -> bool {
        self.entries.iter().any(|(e, _)| e == id)
    }

    /// Registered ids in registration order.
    pub fn ids(&self) -> impl Iterator<Item = &ApproachId> {
        self.entries.iter().map(|(id, _)| id)
    }

    /// Number of registered approaches.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Create a fresh, unstarted instance of the given approach.
    pub fn create(&self, id: &ApproachId) -> Result<Box<dyn Backend>, BackendError> {
        let (_, factory) = self
            .entries
            .iter()
            .find(|(e, _)| e == id)
            .ok_or_else(|| BackendError::UnknownApproach(id.clone()))?;
        factory()
    }

    /// First registered approach other than `current`, in registration
    /// order. With exactly two approaches this is the complement.
    pub fn fallback_for(&self, current: &ApproachId) -> Option<ApproachId> {
        self.ids().find(|id| *id != current).cloned()
    }
}

impl Default for BackendRegistry {
    fn default() -> Self {
        Self::new()
    }
}
