//! Tailor Core - Scene model and reconciliation for the garment customizer
//!
//! This crate holds everything that does not need a GPU:
//! - Configuration store with ordered change notification
//! - Scene graph with owned geometry, material and texture handles
//! - GLB import and model lifecycle (load, normalize, teardown)
//! - Zone recoloring and label surface reconciliation
//! - Camera presets, eased transitions and the orbit controller
//! - The scene host and the session that drives it frame by frame

pub mod binder;
pub mod camera;
pub mod color;
pub mod compositor;
pub mod config;
pub mod error;
pub mod geometry;
pub mod graph;
pub mod host;
pub mod import;
pub mod material;
pub mod model;
pub mod orbit;
pub mod raster;
pub mod resource;
pub mod session;
pub mod settings;
pub mod texture;

#[cfg(test)]
mod fixtures;

pub use color::{Rgb, Swatch, SWATCHES};
pub use config::{
    CameraDirective, ConfigError, ConfigPatch, ConfigStore, Configuration, Label, LabelDraft, LabelId,
    LabelUpdate, Placement, ZoneColors, ZoneId,
};
pub use error::{AssetLoadError, DisplayState, HostError};
pub use graph::{GraphChange, NodeId, NodeKind, NodeRole, SceneGraph};
pub use host::{FrameOutcome, HeadlessSurface, RenderSurface, SceneHost};
pub use model::{CancellationToken, LoadOutcome, LoadTicket};
pub use raster::{FontGlyphs, GlyphSource};
pub use resource::{Released, ResourceId, ResourceKind, ResourceLedger};
pub use session::Customizer;
pub use settings::{CustomizerSettings, SettingsError};
