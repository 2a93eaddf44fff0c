//! Model resource manager
//!
//! Owns the lifetime of the loaded garment subtree. A load is split into
//! [`ModelManager::begin_load`], which hands out a [`LoadTicket`] for the
//! asynchronous fetch, and [`ModelManager::complete`], which applies the
//! result only if the ticket still belongs to the current activation.

use glam::Vec3;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::config::ZoneId;
use crate::error::{AssetLoadError, DisplayState};
use crate::graph::{NodeId, SceneGraph, Transform};
use crate::import::{ImportedScene, SceneSummary};
use crate::resource::ResourceLedger;

/// Name of the group node that wraps every imported scene
pub const MODEL_ROOT_NAME: &str = "model";

/// Shared flag checked by in-flight fetches
#[derive(Debug, Clone)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Proof of which load a completion belongs to
#[derive(Debug, Clone)]
pub struct LoadTicket {
    generation: u64,
    locator: String,
    token: CancellationToken,
}

impl LoadTicket {
    pub fn locator(&self) -> &str {
        &self.locator
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }
}

/// What happened to a completed load
#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    Attached(NodeId),
    Failed(AssetLoadError),
    /// The ticket was stale or cancelled; nothing was touched
    Discarded,
}

pub struct ModelManager {
    canonical_size: f32,
    generation: u64,
    in_flight: Option<CancellationToken>,
    root: Option<NodeId>,
    summary: Option<SceneSummary>,
    state: DisplayState,
}

impl ModelManager {
    pub fn new(canonical_size: f32) -> Self {
        Self {
            canonical_size,
            generation: 0,
            in_flight: None,
            root: None,
            summary: None,
            state: DisplayState::Loading,
        }
    }

    /// The attached model subtree, if any
    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn state(&self) -> &DisplayState {
        &self.state
    }

    pub fn summary(&self) -> Option<&SceneSummary> {
        self.summary.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Start a new load, superseding any load in flight and removing any
    /// model already attached
    pub fn begin_load(&mut self, locator: &str, graph: &mut SceneGraph) -> LoadTicket {
        self.teardown(graph);

        let token = CancellationToken::new();
        self.in_flight = Some(token.clone());
        self.state = DisplayState::Loading;
        info!("Loading model from {}", locator);

        LoadTicket {
            generation: self.generation,
            locator: locator.to_string(),
            token,
        }
    }

    /// Apply the result of a load. Stale or cancelled tickets are discarded
    /// without touching the graph.
    pub fn complete(
        &mut self,
        ticket: &LoadTicket,
        result: Result<ImportedScene, AssetLoadError>,
        graph: &mut SceneGraph,
        ledger: &ResourceLedger,
        parent: NodeId,
    ) -> LoadOutcome {
        if ticket.generation != self.generation || ticket.token.is_cancelled() {
            warn!("Discarding late load of {}", ticket.locator);
            return LoadOutcome::Discarded;
        }
        self.in_flight = None;

        let imported = match result {
            Ok(imported) => imported,
            Err(AssetLoadError::Cancelled) => return LoadOutcome::Discarded,
            Err(e) => {
                error!("Failed to load {}: {}", ticket.locator, e);
                self.state = DisplayState::Error(e.to_string());
                return LoadOutcome::Failed(e);
            }
        };

        let summary = imported.describe();
        info!("Model {}: {}", ticket.locator, summary);
        for zone in ZoneId::ALL {
            if !summary.zones.contains(&zone) {
                warn!("Model has no '{}' zone", zone.node_name());
            }
        }

        let root = imported.instantiate(graph, ledger, MODEL_ROOT_NAME);
        self.normalize(root, graph);
        graph.attach(root, parent);

        self.root = Some(root);
        self.summary = Some(summary);
        self.state = DisplayState::Ready;
        LoadOutcome::Attached(root)
    }

    /// Center the subtree on the origin and scale its longest side to the
    /// canonical size
    fn normalize(&self, root: NodeId, graph: &mut SceneGraph) {
        let Some(bounds) = graph.local_bounds(root) else {
            warn!("Model has no geometry; skipping normalization");
            return;
        };
        let max_dim = bounds.max_dimension();
        if !(max_dim.is_finite() && max_dim > f32::EPSILON) {
            warn!("Model bounds are degenerate ({}); skipping normalization", max_dim);
            return;
        }

        let scale = self.canonical_size / max_dim;
        graph.set_transform(
            root,
            Transform {
                translation: -bounds.center() * scale,
                scale: Vec3::splat(scale),
                ..Transform::IDENTITY
            },
        );
    }

    /// Cancel any load in flight and destroy the attached model. Safe to call
    /// repeatedly; returns whether a model was removed.
    pub fn teardown(&mut self, graph: &mut SceneGraph) -> bool {
        self.generation += 1;
        if let Some(token) = self.in_flight.take() {
            token.cancel();
        }
        self.summary = None;
        self.state = DisplayState::Loading;

        match self.root.take() {
            Some(root) => {
                let removed = graph.remove_subtree(root);
                info!("Model torn down ({} nodes)", removed);
                true
            }
            None => false,
        }
    }
}
