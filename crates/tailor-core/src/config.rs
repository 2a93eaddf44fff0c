//! Customization state and the observable store that holds it
//!
//! The store keeps the latest desired configuration and pushes every committed
//! snapshot to each subscriber's channel in commit order. Reconcilers drain
//! their subscription and receive each snapshot explicitly, so no component
//! reads ambient global state.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::color::Rgb;
use crate::settings::LabelConfig;

pub const MIN_ZOOM: f32 = 0.5;
pub const MAX_ZOOM: f32 = 2.0;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Label limit reached ({0})")]
    TooManyLabels(usize),
    #[error("Label text is empty")]
    EmptyText,
    #[error("Label text has {len} characters, limit is {max}")]
    TextTooLong { len: usize, max: usize },
    #[error("Unknown label: {0}")]
    UnknownLabel(LabelId),
    #[error("Zoom must be a finite number, got {0}")]
    InvalidZoom(f32),
    #[error("Font size must be a positive finite number, got {0}")]
    InvalidFontSize(f32),
}

/// Independently colorable region of the garment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZoneId {
    Sleeves,
    Front,
    Back,
}

impl ZoneId {
    pub const ALL: [ZoneId; 3] = [ZoneId::Sleeves, ZoneId::Front, ZoneId::Back];

    /// Name of the zone root node inside the model asset
    pub fn node_name(self) -> &'static str {
        match self {
            ZoneId::Sleeves => "sleeves",
            ZoneId::Front => "front_torso",
            ZoneId::Back => "back_torso",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            ZoneId::Sleeves => "Sleeves",
            ZoneId::Front => "Front",
            ZoneId::Back => "Back",
        }
    }
}

/// One color per zone; every zone always has a color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneColors {
    pub sleeves: Rgb,
    pub front: Rgb,
    pub back: Rgb,
}

impl Default for ZoneColors {
    fn default() -> Self {
        Self {
            sleeves: Rgb::from_u32(0xFF0000),
            front: Rgb::from_u32(0x00FF00),
            back: Rgb::from_u32(0xFFFF00),
        }
    }
}

impl ZoneColors {
    pub fn get(&self, zone: ZoneId) -> Rgb {
        match zone {
            ZoneId::Sleeves => self.sleeves,
            ZoneId::Front => self.front,
            ZoneId::Back => self.back,
        }
    }

    pub fn set(&mut self, zone: ZoneId, color: Rgb) {
        match zone {
            ZoneId::Sleeves => self.sleeves = color,
            ZoneId::Front => self.front = color,
            ZoneId::Back => self.back = color,
        }
    }
}

/// Which side of the garment a label sits on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Placement {
    #[default]
    Front,
    Back,
}

/// Stable label identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LabelId(pub String);

impl LabelId {
    pub fn generate() -> Self {
        Self(format!("label-{}", Uuid::new_v4()))
    }
}

impl fmt::Display for LabelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A short text overlay on the front or back of the garment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Label {
    pub id: LabelId,
    pub text: String,
    pub placement: Placement,
    pub font_size: f32,
    pub color: Rgb,
    /// Position within the zone, both axes in [0, 1]
    pub anchor: [f32; 2],
}

/// A label as submitted by the panel, before it has an id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelDraft {
    pub text: String,
    pub placement: Placement,
    pub font_size: f32,
    pub color: Rgb,
    pub anchor: [f32; 2],
}

impl LabelDraft {
    /// Draft with the configured default style, centered in the zone
    pub fn new(text: impl Into<String>, placement: Placement, config: &LabelConfig) -> Self {
        Self {
            text: text.into(),
            placement,
            font_size: config.default_font_size,
            color: config.default_color,
            anchor: [0.5, 0.5],
        }
    }
}

/// Partial label update; `None` fields are left alone
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LabelUpdate {
    pub text: Option<String>,
    pub placement: Option<Placement>,
    pub font_size: Option<f32>,
    pub color: Option<Rgb>,
    pub anchor: Option<[f32; 2]>,
}

/// Requested camera pose; `Free` leaves the camera to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CameraDirective {
    Front,
    Back,
    Left,
    Right,
    #[default]
    Free,
}

impl CameraDirective {
    pub const PRESETS: [CameraDirective; 4] = [
        CameraDirective::Front,
        CameraDirective::Back,
        CameraDirective::Left,
        CameraDirective::Right,
    ];

    pub fn display_name(self) -> &'static str {
        match self {
            CameraDirective::Front => "Front",
            CameraDirective::Back => "Back",
            CameraDirective::Left => "Left",
            CameraDirective::Right => "Right",
            CameraDirective::Free => "Free",
        }
    }
}

/// The single source of truth for what the scene should look like
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Configuration {
    pub zone_colors: ZoneColors,
    pub labels: Vec<Label>,
    pub camera_directive: CameraDirective,
    pub zoom: f32,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            zone_colors: ZoneColors::default(),
            labels: Vec::new(),
            camera_directive: CameraDirective::Free,
            zoom: 1.0,
        }
    }
}

impl Configuration {
    pub fn label(&self, id: &LabelId) -> Option<&Label> {
        self.labels.iter().find(|l| &l.id == id)
    }
}

/// Partial write into the store
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigPatch {
    pub sleeves: Option<Rgb>,
    pub front: Option<Rgb>,
    pub back: Option<Rgb>,
    pub labels: Option<Vec<Label>>,
    pub camera_directive: Option<CameraDirective>,
    pub zoom: Option<f32>,
}

impl ConfigPatch {
    pub fn zone_color(zone: ZoneId, color: Rgb) -> Self {
        let mut patch = Self::default();
        match zone {
            ZoneId::Sleeves => patch.sleeves = Some(color),
            ZoneId::Front => patch.front = Some(color),
            ZoneId::Back => patch.back = Some(color),
        }
        patch
    }

    pub fn camera_directive(directive: CameraDirective) -> Self {
        Self {
            camera_directive: Some(directive),
            ..Default::default()
        }
    }

    fn apply_to(self, config: &mut Configuration) {
        if let Some(color) = self.sleeves {
            config.zone_colors.sleeves = color;
        }
        if let Some(color) = self.front {
            config.zone_colors.front = color;
        }
        if let Some(color) = self.back {
            config.zone_colors.back = color;
        }
        if let Some(labels) = self.labels {
            config.labels = labels;
        }
        if let Some(directive) = self.camera_directive {
            config.camera_directive = directive;
        }
        if let Some(zoom) = self.zoom {
            config.zoom = zoom;
        }
    }
}

/// One committed change, delivered to every subscriber
#[derive(Debug, Clone)]
pub struct ConfigUpdate {
    pub revision: u64,
    pub previous: Arc<Configuration>,
    pub current: Arc<Configuration>,
}

/// Receiving end of a store subscription
pub struct Subscription {
    rx: mpsc::UnboundedReceiver<ConfigUpdate>,
}

impl Subscription {
    /// Next pending update, if any
    pub fn try_next(&mut self) -> Option<ConfigUpdate> {
        self.rx.try_recv().ok()
    }

    /// All pending updates in commit order
    pub fn drain(&mut self) -> Vec<ConfigUpdate> {
        let mut updates = Vec::new();
        while let Some(update) = self.try_next() {
            updates.push(update);
        }
        updates
    }
}

/// Observable holder of the current configuration
pub struct ConfigStore {
    current: Arc<Configuration>,
    revision: u64,
    subscribers: Vec<mpsc::UnboundedSender<ConfigUpdate>>,
    max_labels: usize,
    max_chars: usize,
    font_size_range: [f32; 2],
    default_font_size: f32,
}

impl Default for ConfigStore {
    fn default() -> Self {
        Self::new(&LabelConfig::default())
    }
}

impl ConfigStore {
    pub fn new(limits: &LabelConfig) -> Self {
        Self {
            current: Arc::new(Configuration::default()),
            revision: 0,
            subscribers: Vec::new(),
            max_labels: limits.max_labels,
            max_chars: limits.max_chars,
            font_size_range: limits.font_size_range,
            default_font_size: limits.default_font_size,
        }
    }

    /// Current snapshot
    pub fn get(&self) -> Arc<Configuration> {
        Arc::clone(&self.current)
    }

    /// Number of committed changes so far
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn subscribe(&mut self) -> Subscription {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.push(tx);
        Subscription { rx }
    }

    /// Apply a partial update; returns whether anything changed.
    /// A non-finite zoom is ignored and label values are brought into range.
    pub fn set(&mut self, mut patch: ConfigPatch) -> bool {
        patch.zoom = patch
            .zoom
            .filter(|zoom| zoom.is_finite())
            .map(|zoom| zoom.clamp(MIN_ZOOM, MAX_ZOOM));
        if let Some(labels) = patch.labels.as_mut() {
            labels.truncate(self.max_labels);
            for label in labels.iter_mut() {
                label.font_size = self
                    .validate_font_size(label.font_size)
                    .unwrap_or(self.default_font_size);
                label.anchor = clamp_anchor(label.anchor);
            }
        }

        let mut next = (*self.current).clone();
        patch.apply_to(&mut next);
        self.commit(next)
    }

    pub fn set_zone_color(&mut self, zone: ZoneId, color: Rgb) -> bool {
        self.set(ConfigPatch::zone_color(zone, color))
    }

    pub fn add_label(&mut self, draft: LabelDraft) -> Result<LabelId, ConfigError> {
        if self.current.labels.len() >= self.max_labels {
            return Err(ConfigError::TooManyLabels(self.max_labels));
        }
        let text = self.validate_text(&draft.text)?;
        let font_size = self.validate_font_size(draft.font_size)?;

        let id = LabelId::generate();
        let mut next = (*self.current).clone();
        next.labels.push(Label {
            id: id.clone(),
            text,
            placement: draft.placement,
            font_size,
            color: draft.color,
            anchor: clamp_anchor(draft.anchor),
        });
        self.commit(next);
        Ok(id)
    }

    pub fn update_label(&mut self, id: &LabelId, update: LabelUpdate) -> Result<bool, ConfigError> {
        let text = match &update.text {
            Some(text) => Some(self.validate_text(text)?),
            None => None,
        };
        let font_size = update.font_size.map(|size| self.validate_font_size(size)).transpose()?;

        let mut next = (*self.current).clone();
        let label = next
            .labels
            .iter_mut()
            .find(|l| &l.id == id)
            .ok_or_else(|| ConfigError::UnknownLabel(id.clone()))?;

        if let Some(text) = text {
            label.text = text;
        }
        if let Some(placement) = update.placement {
            label.placement = placement;
        }
        if let Some(font_size) = font_size {
            label.font_size = font_size;
        }
        if let Some(color) = update.color {
            label.color = color;
        }
        if let Some(anchor) = update.anchor {
            label.anchor = clamp_anchor(anchor);
        }
        Ok(self.commit(next))
    }

    pub fn remove_label(&mut self, id: &LabelId) -> bool {
        let mut next = (*self.current).clone();
        next.labels.retain(|l| &l.id != id);
        self.commit(next)
    }

    pub fn set_camera_directive(&mut self, directive: CameraDirective) -> bool {
        self.set(ConfigPatch::camera_directive(directive))
    }

    pub fn set_zoom(&mut self, zoom: f32) -> Result<bool, ConfigError> {
        if !zoom.is_finite() {
            return Err(ConfigError::InvalidZoom(zoom));
        }
        Ok(self.set(ConfigPatch {
            zoom: Some(zoom.clamp(MIN_ZOOM, MAX_ZOOM)),
            ..Default::default()
        }))
    }

    /// Back to the session defaults
    pub fn reset(&mut self) -> bool {
        self.commit(Configuration::default())
    }

    fn validate_text(&self, text: &str) -> Result<String, ConfigError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(ConfigError::EmptyText);
        }
        let len = trimmed.chars().count();
        if len > self.max_chars {
            return Err(ConfigError::TextTooLong { len, max: self.max_chars });
        }
        Ok(trimmed.to_string())
    }

    /// Positive sizes are clamped into the configured range
    fn validate_font_size(&self, size: f32) -> Result<f32, ConfigError> {
        if !(size.is_finite() && size > 0.0) {
            return Err(ConfigError::InvalidFontSize(size));
        }
        let [min, max] = self.font_size_range;
        Ok(size.clamp(min, max))
    }

    fn commit(&mut self, next: Configuration) -> bool {
        if next == *self.current {
            return false;
        }

        let previous = std::mem::replace(&mut self.current, Arc::new(next));
        self.revision += 1;

        let update = ConfigUpdate {
            revision: self.revision,
            previous,
            current: Arc::clone(&self.current),
        };
        // Closed receivers are pruned here
        self.subscribers.retain(|tx| tx.send(update.clone()).is_ok());
        true
    }
}

fn clamp_anchor(anchor: [f32; 2]) -> [f32; 2] {
    let clamp = |v: f32| if v.is_finite() { v.clamp(0.0, 1.0) } else { 0.5 };
    [clamp(anchor[0]), clamp(anchor[1])]
}
