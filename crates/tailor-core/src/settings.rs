//! Customizer settings loading
//!
//! Settings are static for the lifetime of a session: asset locations, the
//! canonical model size, camera and lighting parameters, and label limits.
//! Every field has a default so an empty TOML document is a valid config.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::color::Rgb;

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("TOML error: {0}")]
    TomlError(#[from] toml::de::Error),
    #[error("Invalid setting: {0}")]
    Invalid(String),
}

/// Top-level settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomizerSettings {
    /// Location of the binary glTF garment model
    #[serde(default = "default_model_url")]
    pub model_url: String,
    /// Location of the TTF/OTF font used for label textures
    #[serde(default = "default_font_url")]
    pub font_url: String,
    /// CSS selector of the canvas the renderer attaches to
    #[serde(default = "default_canvas_selector")]
    pub canvas_selector: String,
    /// Longest bounding dimension of the model after normalization
    #[serde(default = "default_canonical_size")]
    pub canonical_size: f32,
    #[serde(default)]
    pub camera: CameraConfig,
    #[serde(default)]
    pub labels: LabelConfig,
    #[serde(default)]
    pub lighting: LightingConfig,
}

impl Default for CustomizerSettings {
    fn default() -> Self {
        Self {
            model_url: default_model_url(),
            font_url: default_font_url(),
            canvas_selector: default_canvas_selector(),
            canonical_size: default_canonical_size(),
            camera: CameraConfig::default(),
            labels: LabelConfig::default(),
            lighting: LightingConfig::default(),
        }
    }
}

fn default_model_url() -> String {
    "/models/shirt-zones.glb".to_string()
}

fn default_font_url() -> String {
    "/fonts/label.ttf".to_string()
}

fn default_canvas_selector() -> String {
    "#customizer-canvas".to_string()
}

fn default_canonical_size() -> f32 {
    4.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraConfig {
    /// Vertical field of view in degrees
    #[serde(default = "default_fov")]
    pub fov_degrees: f32,
    #[serde(default = "default_near")]
    pub near: f32,
    #[serde(default = "default_far")]
    pub far: f32,
    #[serde(default = "default_initial_position")]
    pub initial_position: [f32; 3],
    /// Duration of a preset transition in milliseconds
    #[serde(default = "default_transition_ms")]
    pub transition_ms: u32,
    /// Fraction of the remaining orbit velocity removed each frame
    #[serde(default = "default_damping")]
    pub damping_factor: f32,
    /// Distance of every preset pose from the origin at zoom 1.0
    #[serde(default = "default_preset_distance")]
    pub preset_distance: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov_degrees: default_fov(),
            near: default_near(),
            far: default_far(),
            initial_position: default_initial_position(),
            transition_ms: default_transition_ms(),
            damping_factor: default_damping(),
            preset_distance: default_preset_distance(),
        }
    }
}

fn default_fov() -> f32 {
    45.0
}

fn default_near() -> f32 {
    0.1
}

fn default_far() -> f32 {
    1000.0
}

fn default_initial_position() -> [f32; 3] {
    [5.0, 5.0, 5.0]
}

fn default_transition_ms() -> u32 {
    500
}

fn default_damping() -> f32 {
    0.05
}

fn default_preset_distance() -> f32 {
    3.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelConfig {
    #[serde(default = "default_max_labels")]
    pub max_labels: usize,
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,
    /// Label raster size in pixels
    #[serde(default = "default_texture_size")]
    pub texture_size: [u32; 2],
    /// Physical width and height of a label surface in model units
    #[serde(default = "default_plane_size")]
    pub plane_size: [f32; 2],
    /// Distance of a label surface from the model center along the facing axis
    #[serde(default = "default_surface_offset")]
    pub surface_offset: f32,
    /// Texture alpha below which label pixels are discarded
    #[serde(default = "default_alpha_cutoff")]
    pub alpha_cutoff: f32,
    #[serde(default = "default_font_size")]
    pub default_font_size: f32,
    /// Smallest and largest accepted label font size in pixels
    #[serde(default = "default_font_size_range")]
    pub font_size_range: [f32; 2],
    #[serde(default = "default_label_color")]
    pub default_color: Rgb,
    /// Model-space extent covered by the 0..1 label anchor range
    #[serde(default = "default_anchor_span")]
    pub anchor_span: f32,
}

impl Default for LabelConfig {
    fn default() -> Self {
        Self {
            max_labels: default_max_labels(),
            max_chars: default_max_chars(),
            texture_size: default_texture_size(),
            plane_size: default_plane_size(),
            surface_offset: default_surface_offset(),
            alpha_cutoff: default_alpha_cutoff(),
            default_font_size: default_font_size(),
            font_size_range: default_font_size_range(),
            default_color: default_label_color(),
            anchor_span: default_anchor_span(),
        }
    }
}

fn default_max_labels() -> usize {
    5
}

fn default_max_chars() -> usize {
    20
}

fn default_texture_size() -> [u32; 2] {
    [512, 128]
}

fn default_plane_size() -> [f32; 2] {
    [1.0, 0.25]
}

fn default_surface_offset() -> f32 {
    0.3
}

fn default_alpha_cutoff() -> f32 {
    0.5
}

fn default_font_size() -> f32 {
    48.0
}

fn default_font_size_range() -> [f32; 2] {
    [8.0, 128.0]
}

fn default_label_color() -> Rgb {
    Rgb::BLACK
}

fn default_anchor_span() -> f32 {
    2.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LightingConfig {
    #[serde(default = "default_white")]
    pub ambient_color: Rgb,
    #[serde(default = "default_ambient_intensity")]
    pub ambient_intensity: f32,
    #[serde(default = "default_white")]
    pub directional_color: Rgb,
    #[serde(default = "default_directional_intensity")]
    pub directional_intensity: f32,
    #[serde(default = "default_directional_position")]
    pub directional_position: [f32; 3],
    #[serde(default = "default_background")]
    pub background: Rgb,
}

impl Default for LightingConfig {
    fn default() -> Self {
        Self {
            ambient_color: default_white(),
            ambient_intensity: default_ambient_intensity(),
            directional_color: default_white(),
            directional_intensity: default_directional_intensity(),
            directional_position: default_directional_position(),
            background: default_background(),
        }
    }
}

fn default_white() -> Rgb {
    Rgb::WHITE
}

fn default_ambient_intensity() -> f32 {
    0.6
}

fn default_directional_intensity() -> f32 {
    0.8
}

fn default_directional_position() -> [f32; 3] {
    [5.0, 5.0, 5.0]
}

fn default_background() -> Rgb {
    Rgb::from_u32(0xF0F0F0)
}

impl CustomizerSettings {
    /// Parse settings from a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self, SettingsError> {
        let settings: CustomizerSettings = toml::from_str(content)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, SettingsError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Load settings or fall back to defaults if the file doesn't exist
    pub fn load_or_default(path: &Path) -> Result<Self, SettingsError> {
        if path.exists() {
            Self::from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if !(self.canonical_size.is_finite() && self.canonical_size > 0.0) {
            return Err(SettingsError::Invalid(format!(
                "canonical_size must be positive, got {}",
                self.canonical_size
            )));
        }
        if self.camera.transition_ms == 0 {
            return Err(SettingsError::Invalid("camera.transition_ms must be > 0".into()));
        }
        if !(0.0..1.0).contains(&self.camera.damping_factor) {
            return Err(SettingsError::Invalid(format!(
                "camera.damping_factor must be in [0, 1), got {}",
                self.camera.damping_factor
            )));
        }
        let [w, h] = self.labels.texture_size;
        if w == 0 || h == 0 {
            return Err(SettingsError::Invalid("labels.texture_size must be non-zero".into()));
        }
        let [min, max] = self.labels.font_size_range;
        if !(min.is_finite() && max.is_finite() && min > 0.0 && min <= max) {
            return Err(SettingsError::Invalid(format!(
                "labels.font_size_range must be positive and ordered, got [{}, {}]",
                min, max
            )));
        }
        if !(min..=max).contains(&self.labels.default_font_size) {
            return Err(SettingsError::Invalid(format!(
                "labels.default_font_size {} is outside labels.font_size_range",
                self.labels.default_font_size
            )));
        }
        Ok(())
    }
}
