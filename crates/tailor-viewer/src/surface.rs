//! The page the customizer runs in: capability probe, URL overrides, and the
//! fallback status message

use tailor_core::host::RenderSurface;
use tailor_core::CustomizerSettings;

/// The canvas element the renderer will attach to
pub struct BrowserSurface {
    selector: String,
}

impl BrowserSurface {
    pub fn new(selector: &str) -> Self {
        Self {
            selector: selector.to_string(),
        }
    }
}

#[cfg(target_arch = "wasm32")]
impl RenderSurface for BrowserSurface {
    fn probe(&self) -> Result<(), String> {
        use wasm_bindgen::JsCast;

        let window = web_sys::window().ok_or("No window")?;
        let document = window.document().ok_or("No document")?;

        // WebGPU builds need navigator.gpu; WebGL2 builds need a webgl2 context
        if cfg!(feature = "webgpu") {
            let gpu = js_sys::Reflect::get(&window.navigator(), &"gpu".into())
                .map_err(|e| format!("navigator.gpu lookup failed: {:?}", e))?;
            if gpu.is_undefined() || gpu.is_null() {
                return Err("WebGPU is not available".to_string());
            }
            return Ok(());
        }

        let canvas = document
            .create_element("canvas")
            .map_err(|e| format!("Canvas creation failed: {:?}", e))?
            .dyn_into::<web_sys::HtmlCanvasElement>()
            .map_err(|_| "Canvas cast failed")?;
        match canvas.get_context("webgl2") {
            Ok(Some(_)) => Ok(()),
            Ok(None) => Err("WebGL2 is not available".to_string()),
            Err(e) => Err(format!("WebGL2 context request failed: {:?}", e)),
        }
    }

    fn size(&self) -> (u32, u32) {
        use wasm_bindgen::JsCast;

        web_sys::window()
            .and_then(|w| w.document())
            .and_then(|d| d.query_selector(&self.selector).ok().flatten())
            .and_then(|e| e.dyn_into::<web_sys::HtmlCanvasElement>().ok())
            .map(|c| (c.width(), c.height()))
            .unwrap_or((0, 0))
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl RenderSurface for BrowserSurface {
    fn probe(&self) -> Result<(), String> {
        Ok(())
    }

    fn size(&self) -> (u32, u32) {
        (0, 0)
    }
}

/// Settings with `?model=` and `?font=` overrides applied
#[cfg(target_arch = "wasm32")]
pub fn settings_from_location() -> CustomizerSettings {
    let mut settings = CustomizerSettings::default();
    let Some(href) = web_sys::window().and_then(|w| w.location().href().ok()) else {
        return settings;
    };
    let Ok(url) = web_sys::Url::new(&href) else {
        return settings;
    };

    let params = url.search_params();
    if let Some(model) = params.get("model").filter(|m| !m.is_empty()) {
        tracing::info!("Model from URL parameter: {}", model);
        settings.model_url = model;
    }
    if let Some(font) = params.get("font").filter(|f| !f.is_empty()) {
        tracing::info!("Font from URL parameter: {}", font);
        settings.font_url = font;
    }
    settings
}

/// Native builds read `tailor.toml` from the working directory
#[cfg(not(target_arch = "wasm32"))]
pub fn settings_from_location() -> CustomizerSettings {
    settings_from_file(std::path::Path::new(SETTINGS_FILE))
}

#[cfg(not(target_arch = "wasm32"))]
const SETTINGS_FILE: &str = "tailor.toml";

#[cfg(not(target_arch = "wasm32"))]
fn settings_from_file(path: &std::path::Path) -> CustomizerSettings {
    match CustomizerSettings::load_or_default(path) {
        Ok(settings) => settings,
        Err(e) => {
            tracing::warn!("Ignoring {}: {}", path.display(), e);
            CustomizerSettings::default()
        }
    }
}

/// Replace the canvas's parent content with a plain text message
pub fn show_status(selector: &str, message: &str) {
    let Some(document) = web_sys::window().and_then(|w| w.document()) else {
        return;
    };
    let target = document
        .query_selector(selector)
        .ok()
        .flatten()
        .and_then(|canvas| canvas.parent_element())
        .or_else(|| document.body().map(Into::into));

    if let Some(target) = target {
        target.set_text_content(Some(message));
    }
}

#[cfg(all(test, not(target_arch = "wasm32")))]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_settings_file_overrides_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(SETTINGS_FILE);
        assert_eq!(settings_from_file(&path), CustomizerSettings::default());

        std::fs::write(&path, "model_url = \"/models/hoodie.glb\"\n").unwrap();
        assert_eq!(settings_from_file(&path).model_url, "/models/hoodie.glb");
    }

    #[test]
    fn test_invalid_settings_file_falls_back_to_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(SETTINGS_FILE);
        std::fs::write(&path, "canonical_size = -1.0\n").unwrap();
        assert_eq!(settings_from_file(&path), CustomizerSettings::default());
    }
}
