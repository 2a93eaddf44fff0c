//! Model and font downloads

use bevy::prelude::*;
use tracing::{debug, error, info, warn};
use std::sync::{Arc, Mutex};

use tailor_core::error::AssetLoadError;
use tailor_core::{FontGlyphs, LoadOutcome, LoadTicket};
use tailor_scene::CustomizerSession;

/// Result slot filled by an async fetch
pub type FetchSlot = Arc<Mutex<Option<Result<Vec<u8>, String>>>>;

/// Plugin that downloads the model and label font
pub struct FetchPlugin;

impl Plugin for FetchPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<PendingFetches>()
            .add_systems(Startup, start_initial_fetches)
            .add_systems(
                Update,
                process_pending_fetches.run_if(resource_exists::<CustomizerSession>),
            );
    }
}

/// Downloads in flight
#[derive(Resource, Default)]
pub struct PendingFetches {
    model: Option<(LoadTicket, FetchSlot)>,
    font: Option<FetchSlot>,
}

impl PendingFetches {
    /// Fetch the model a ticket was issued for. A previous model fetch is
    /// superseded; its ticket is already stale.
    pub fn start_model(&mut self, ticket: LoadTicket) {
        let slot = FetchSlot::default();
        fetch_bytes(ticket.locator(), slot.clone());
        self.model = Some((ticket, slot));
    }

    pub fn start_font(&mut self, url: &str) {
        let slot = FetchSlot::default();
        fetch_bytes(url, slot.clone());
        self.font = Some(slot);
    }

    pub fn model_in_flight(&self) -> bool {
        self.model.is_some()
    }
}

fn start_initial_fetches(
    session: Option<ResMut<CustomizerSession>>,
    mut pending: ResMut<PendingFetches>,
) {
    let Some(mut session) = session else {
        return;
    };
    let font_url = session.settings().font_url.clone();
    match session.begin_model_load() {
        Ok(ticket) => {
            info!("Loading model from {}", ticket.locator());
            pending.start_model(ticket);
        }
        Err(err) => warn!("Model not loaded: {}", err),
    }
    pending.start_font(&font_url);
}

/// Take finished downloads and hand them to the session
fn process_pending_fetches(mut session: ResMut<CustomizerSession>, mut pending: ResMut<PendingFetches>) {
    if let Some(result) = pending.model.as_ref().and_then(|(_, slot)| take(slot)) {
        if let Some((ticket, _)) = pending.model.take() {
            let bytes = result.map_err(|reason| AssetLoadError::Fetch {
                url: ticket.locator().to_string(),
                reason,
            });
            match session.complete_model_bytes(&ticket, bytes) {
                LoadOutcome::Attached(_) => info!("Model ready: {}", ticket.locator()),
                LoadOutcome::Failed(err) => error!("{}", err),
                LoadOutcome::Discarded => debug!("Discarded stale model {}", ticket.locator()),
            }
        }
    }

    if let Some(result) = pending.font.as_ref().and_then(take) {
        pending.font = None;
        match result.and_then(|bytes| FontGlyphs::from_bytes(&bytes).map_err(|e| e.to_string())) {
            Ok(glyphs) => session.set_glyph_source(Arc::new(glyphs)),
            // Labels stay blank until a font arrives
            Err(err) => warn!("Label font unavailable: {}", err),
        }
    }
}

fn take(slot: &FetchSlot) -> Option<Result<Vec<u8>, String>> {
    slot.try_lock().ok().and_then(|mut guard| guard.take())
}

/// Fetch `url` as bytes into `slot`
#[cfg(target_arch = "wasm32")]
pub fn fetch_bytes(url: &str, slot: FetchSlot) {
    use wasm_bindgen::JsCast;

    let url = url.to_string();
    wasm_bindgen_futures::spawn_local(async move {
        let result = async {
            let window = web_sys::window().ok_or("No window")?;

            let resp = wasm_bindgen_futures::JsFuture::from(window.fetch_with_str(&url))
                .await
                .map_err(|e| format!("Fetch failed: {:?}", e))?;

            let resp: web_sys::Response = resp.dyn_into().map_err(|_| "Response cast failed")?;

            if !resp.ok() {
                return Err(format!("HTTP {}: {}", resp.status(), resp.status_text()));
            }

            let buf = wasm_bindgen_futures::JsFuture::from(
                resp.array_buffer().map_err(|_| "Failed to get body")?,
            )
            .await
            .map_err(|e| format!("Body read failed: {:?}", e))?;

            Ok::<_, String>(js_sys::Uint8Array::new(&buf).to_vec())
        }
        .await;

        if let Ok(mut pending) = slot.lock() {
            *pending = Some(result);
        }
    });
}

/// Native builds read `url` as a local path
#[cfg(not(target_arch = "wasm32"))]
pub fn fetch_bytes(url: &str, slot: FetchSlot) {
    let result = std::fs::read(url.trim_start_matches('/')).map_err(|e| e.to_string());
    if let Ok(mut pending) = slot.lock() {
        *pending = Some(result);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_fills_slot_with_error() {
        let slot = FetchSlot::default();
        fetch_bytes("/definitely/not/here.glb", slot.clone());
        assert!(matches!(take(&slot), Some(Err(_))));
        assert!(take(&slot).is_none());
    }
}
