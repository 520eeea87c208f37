//! The trajectory registry: body and gravity-source identity → predictor.
//!
//! Insertion order is kept, so the coordinator updates predictors and
//! intersection prediction scans sources in a stable, reproducible order.

use std::error::Error;
use std::fmt;
use std::sync::Arc;

use foresight_core::{BodyId, GravitySource, SourceId};
use indexmap::IndexMap;

use crate::predictor::Predictor;

/// Errors from registering a predictor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RegistryError {
    /// A predictor is already registered for this body.
    DuplicateBody(BodyId),
    /// A predictor is already registered for this gravity source.
    DuplicateSource(SourceId),
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateBody(id) => write!(f, "body {id} is already tracked"),
            Self::DuplicateSource(id) => write!(f, "gravity source {id} is already tracked"),
        }
    }
}

impl Error for RegistryError {}

/// A tracked gravity source and the predictor of the body that owns it.
#[derive(Clone, Debug)]
pub struct SourceEntry {
    /// The source's geometry and law.
    pub source: GravitySource,
    /// Predictor whose trajectory the source follows.
    pub predictor: Arc<Predictor>,
}

/// Unique, insertion-ordered lookup of predictors.
#[derive(Default)]
pub struct Registry {
    bodies: IndexMap<BodyId, Arc<Predictor>>,
    sources: IndexMap<SourceId, SourceEntry>,
}

impl Registry {
    /// Register `predictor`, and `source` under it if given.
    ///
    /// Nothing is inserted unless both identities are free.
    pub fn insert(
        &mut self,
        predictor: Arc<Predictor>,
        source: Option<GravitySource>,
    ) -> Result<(), RegistryError> {
        let body = predictor.id();
        if self.bodies.contains_key(&body) {
            return Err(RegistryError::DuplicateBody(body));
        }
        if let Some(source) = &source {
            if self.sources.contains_key(&source.id) {
                return Err(RegistryError::DuplicateSource(source.id));
            }
        }

        if let Some(source) = source {
            self.sources.insert(
                source.id,
                SourceEntry {
                    source,
                    predictor: Arc::clone(&predictor),
                },
            );
        }
        self.bodies.insert(body, predictor);
        Ok(())
    }

    /// Deregister `body` and every source it owns.
    pub fn remove(&mut self, body: BodyId) -> Option<Arc<Predictor>> {
        let predictor = self.bodies.shift_remove(&body)?;
        self.sources.retain(|_, entry| entry.predictor.id() != body);
        Some(predictor)
    }

    /// The predictor tracking `body`.
    pub fn predictor(&self, body: BodyId) -> Option<&Arc<Predictor>> {
        self.bodies.get(&body)
    }

    /// The tracked source `id`.
    pub fn source(&self, id: SourceId) -> Option<&SourceEntry> {
        self.sources.get(&id)
    }

    /// The predictor of the body owning source `id`.
    pub fn source_predictor(&self, id: SourceId) -> Option<&Arc<Predictor>> {
        self.sources.get(&id).map(|entry| &entry.predictor)
    }

    /// All predictors, in registration order.
    pub fn predictors(&self) -> impl Iterator<Item = &Arc<Predictor>> {
        self.bodies.values()
    }

    /// All tracked sources, in registration order.
    pub fn sources(&self) -> impl Iterator<Item = &SourceEntry> {
        self.sources.values()
    }

    /// Number of tracked bodies.
    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    /// Whether no body is tracked.
    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }
}
