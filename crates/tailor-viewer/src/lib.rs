//! Tailor Viewer - Garment customizer in the browser
//!
//! Probes the page for a 3D context, reads settings overrides from the URL,
//! then starts the Bevy app with the customizer scene and its control panel.

mod app;
mod fetch;
mod panel;
mod surface;

use wasm_bindgen::prelude::*;

use tailor_core::error::HostError;
use tailor_core::host::RenderSurface;
use tailor_core::DisplayState;

/// WASM entry point
#[wasm_bindgen(start)]
pub fn main() {
    console_error_panic_hook::set_once();

    tracing_wasm::set_as_global_default_with_config(
        tracing_wasm::WASMLayerConfigBuilder::new()
            .set_max_level(tracing::Level::WARN)
            .build(),
    );

    let settings = surface::settings_from_location();
    let probe = surface::BrowserSurface::new(&settings.canvas_selector);
    if let Err(reason) = probe.probe() {
        let err = HostError::CapabilityUnavailable(reason);
        tracing::error!("{}", err);
        surface::show_status(
            &settings.canvas_selector,
            &DisplayState::Unsupported.message().unwrap_or_default(),
        );
        return;
    }

    app::run(settings);
}
