//! Test utilities and mock scenes for Foresight development.
//!
//! Provides [`MockScene`], a `HashMap`-backed implementation of
//! [`SceneAccess`], and reusable gravity [`fixtures`].

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;

use std::collections::HashMap;

use foresight_core::{BodyId, BodyState, ForceDetector, SceneAccess};

/// Mock implementation of [`SceneAccess`].
///
/// Pre-populate bodies with [`with_body`](MockScene::with_body) and
/// detectors with [`with_detector`](MockScene::with_detector), then hand
/// the scene to the frame hooks. Bodies without a detector are inert.
#[derive(Clone, Debug, Default)]
pub struct MockScene {
    states: HashMap<BodyId, BodyState>,
    detectors: HashMap<BodyId, ForceDetector>,
}

impl MockScene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) a body.
    pub fn with_body(mut self, body: BodyId, state: BodyState) -> Self {
        self.states.insert(body, state);
        self
    }

    /// Attach a force detector to a body.
    pub fn with_detector(mut self, body: BodyId, detector: ForceDetector) -> Self {
        self.detectors.insert(body, detector);
        self
    }

    /// Move a body between frames.
    pub fn set_state(&mut self, body: BodyId, state: BodyState) {
        self.states.insert(body, state);
    }

    pub fn set_detector(&mut self, body: BodyId, detector: Option<ForceDetector>) {
        match detector {
            Some(detector) => self.detectors.insert(body, detector),
            None => self.detectors.remove(&body),
        };
    }

    /// Remove a body and its detector.
    pub fn remove(&mut self, body: BodyId) {
        self.states.remove(&body);
        self.detectors.remove(&body);
    }
}

impl SceneAccess for MockScene {
    fn body_state(&self, body: BodyId) -> Option<BodyState> {
        self.states.get(&body).copied()
    }

    fn force_detector(&self, body: BodyId) -> Option<ForceDetector> {
        self.detectors.get(&body).cloned()
    }
}
