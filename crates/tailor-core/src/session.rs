//! Customizer session
//!
//! Wires the configuration store to the scene: every committed change is
//! replayed in order through the camera, the zone binder and the label
//! compositor before the next frame is produced.

use std::sync::Arc;
use tracing::{debug, error, info};

use crate::binder::ZoneBinder;
use crate::compositor::LabelCompositor;
use crate::config::{CameraDirective, ConfigPatch, ConfigStore, Configuration, Subscription};
use crate::error::{AssetLoadError, DisplayState, HostError};
use crate::graph::NodeId;
use crate::host::{FrameOutcome, RenderSurface, SceneHost};
use crate::import::{parse_glb, ImportedScene};
use crate::model::{LoadOutcome, LoadTicket, ModelManager};
use crate::raster::GlyphSource;
use crate::settings::CustomizerSettings;

pub struct Customizer {
    settings: CustomizerSettings,
    store: ConfigStore,
    updates: Subscription,
    host: Option<SceneHost>,
    mount_error: Option<HostError>,
    model: ModelManager,
    binder: ZoneBinder,
    compositor: LabelCompositor,
}

impl Customizer {
    /// Activate the scene on `surface`. A surface without a 3D context
    /// leaves the session unsupported instead of failing.
    pub fn mount(settings: CustomizerSettings, surface: &dyn RenderSurface) -> Self {
        let mut store = ConfigStore::new(&settings.labels);
        let updates = store.subscribe();

        let (host, mount_error) = match SceneHost::activate(surface, &settings) {
            Ok(host) => (Some(host), None),
            Err(e) => {
                error!("{}", e);
                (None, Some(e))
            }
        };

        Self {
            model: ModelManager::new(settings.canonical_size),
            binder: ZoneBinder::new(),
            compositor: LabelCompositor::new(settings.labels.clone()),
            settings,
            store,
            updates,
            host,
            mount_error,
        }
    }

    pub fn settings(&self) -> &CustomizerSettings {
        &self.settings
    }

    pub fn store(&self) -> &ConfigStore {
        &self.store
    }

    /// Writes take effect on the next [`Customizer::tick`]
    pub fn store_mut(&mut self) -> &mut ConfigStore {
        &mut self.store
    }

    pub fn config(&self) -> Arc<Configuration> {
        self.store.get()
    }

    pub fn host(&self) -> Option<&SceneHost> {
        self.host.as_ref()
    }

    pub fn host_mut(&mut self) -> Option<&mut SceneHost> {
        self.host.as_mut()
    }

    pub fn model(&self) -> &ModelManager {
        &self.model
    }

    pub fn model_root(&self) -> Option<NodeId> {
        self.model.root()
    }

    pub fn compositor(&self) -> &LabelCompositor {
        &self.compositor
    }

    pub fn is_mounted(&self) -> bool {
        self.host.as_ref().is_some_and(SceneHost::is_active)
    }

    pub fn display_state(&self) -> DisplayState {
        match &self.host {
            None => DisplayState::Unsupported,
            Some(_) => self.model.state().clone(),
        }
    }

    /// Start loading the configured model
    pub fn begin_model_load(&mut self) -> Result<LoadTicket, HostError> {
        let url = self.settings.model_url.clone();
        self.begin_model_load_from(&url)
    }

    /// Start loading a model from `locator`, replacing the current one.
    /// Fails when the surface never had a 3D context or the scene is torn down.
    pub fn begin_model_load_from(&mut self, locator: &str) -> Result<LoadTicket, HostError> {
        let host = match self.host.as_mut() {
            None => {
                return Err(self
                    .mount_error
                    .clone()
                    .unwrap_or_else(|| HostError::CapabilityUnavailable("not mounted".into())))
            }
            Some(host) if !host.is_active() => return Err(HostError::TornDown),
            Some(host) => host,
        };
        let graph = host.graph_mut();
        self.compositor.clear(graph);
        self.binder.invalidate();
        Ok(self.model.begin_load(locator, graph))
    }

    /// Hand over fetched bytes for a ticket. Cancelled tickets skip parsing.
    pub fn complete_model_bytes(
        &mut self,
        ticket: &LoadTicket,
        bytes: Result<Vec<u8>, AssetLoadError>,
    ) -> LoadOutcome {
        let result = if ticket.token().is_cancelled() {
            Err(AssetLoadError::Cancelled)
        } else {
            bytes.and_then(|b| parse_glb(&b))
        };
        self.complete_model_load(ticket, result)
    }

    /// Attach a loaded model, or record its failure, then bring it in line
    /// with the current configuration
    pub fn complete_model_load(
        &mut self,
        ticket: &LoadTicket,
        result: Result<ImportedScene, AssetLoadError>,
    ) -> LoadOutcome {
        let Some(host) = self.host.as_mut().filter(|h| h.is_active()) else {
            debug!("Ignoring load of {} after teardown", ticket.locator());
            return LoadOutcome::Discarded;
        };
        let (graph, ledger) = host.scene_mut();
        let parent = graph.root();
        let outcome = self.model.complete(ticket, result, graph, ledger, parent);

        if matches!(outcome, LoadOutcome::Attached(_)) {
            self.resync();
        }
        outcome
    }

    /// Install the label font; existing labels are redrawn with it
    pub fn set_glyph_source(&mut self, glyphs: Arc<dyn GlyphSource>) {
        self.compositor.set_glyph_source(glyphs);
        self.resync();
    }

    /// Apply pending configuration changes and advance one frame
    pub fn tick(&mut self, dt: f32) -> FrameOutcome {
        if !self.is_mounted() {
            return FrameOutcome::default();
        }
        self.apply_pending();

        let outcome = match self.host.as_mut() {
            Some(host) => host.frame(dt),
            None => FrameOutcome::default(),
        };
        if outcome.transition_completed {
            self.store.set(ConfigPatch::camera_directive(CameraDirective::Free));
            self.apply_pending();
        }
        outcome
    }

    /// Tear down labels, model and scene. Safe to call repeatedly; returns
    /// whether anything was torn down.
    pub fn unmount(&mut self) -> bool {
        let Some(host) = self.host.as_mut().filter(|h| h.is_active()) else {
            return false;
        };
        let graph = host.graph_mut();
        self.compositor.clear(graph);
        self.model.teardown(graph);
        self.binder.invalidate();
        host.teardown();
        self.updates.drain();
        info!("Customizer unmounted");
        true
    }

    /// Replay every committed change in order. Returns how many were applied.
    fn apply_pending(&mut self) -> usize {
        let updates = self.updates.drain();
        let Some(host) = self.host.as_mut() else {
            return 0;
        };
        for update in &updates {
            debug!("Applying configuration revision {}", update.revision);
            reconcile(
                host,
                &mut self.binder,
                &mut self.compositor,
                self.model.root(),
                &update.current,
            );
        }
        updates.len()
    }

    /// Catch up on pending changes, then reapply the current snapshot
    fn resync(&mut self) {
        self.apply_pending();
        let current = self.store.get();
        if let Some(host) = self.host.as_mut() {
            reconcile(host, &mut self.binder, &mut self.compositor, self.model.root(), &current);
        }
    }
}

impl Drop for Customizer {
    fn drop(&mut self) {
        self.unmount();
    }
}

fn reconcile(
    host: &mut SceneHost,
    binder: &mut ZoneBinder,
    compositor: &mut LabelCompositor,
    model: Option<NodeId>,
    config: &Configuration,
) {
    if !host.is_active() {
        return;
    }
    host.observe(config);
    let (graph, ledger) = host.scene_mut();
    if let Some(report) = binder.reconcile(&config.zone_colors, model, graph, ledger) {
        debug!("Zone colors applied: {:?}", report);
    }
    compositor.reconcile(&config.labels, model, graph, ledger);
}
