//! Scene host
//!
//! Owns the scene graph, the resource ledger, the camera with its orbit
//! controller, and the lighting rig. The host is driven one frame at a time;
//! a preset camera directive turns into an eased transition that runs over
//! the following frames and reports its completion so the directive can be
//! written back to `Free`.

use glam::Vec3;
use tracing::{debug, info};

use crate::camera::{preset_position, CameraTransition, PerspectiveCamera};
use crate::color::Rgb;
use crate::config::{CameraDirective, Configuration};
use crate::error::HostError;
use crate::graph::SceneGraph;
use crate::orbit::OrbitController;
use crate::resource::ResourceLedger;
use crate::settings::{CameraConfig, CustomizerSettings, LightingConfig};

/// What the host needs from the drawing surface it renders into
pub trait RenderSurface {
    /// Probe for a 3D-capable context. Must not allocate anything that needs
    /// disposing when it fails.
    fn probe(&self) -> Result<(), String>;

    /// Current size in physical pixels
    fn size(&self) -> (u32, u32);
}

/// Fixed-size surface that always has a context; for tests and headless use
#[derive(Debug, Clone, Copy)]
pub struct HeadlessSurface {
    pub width: u32,
    pub height: u32,
}

impl RenderSurface for HeadlessSurface {
    fn probe(&self) -> Result<(), String> {
        Ok(())
    }

    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AmbientLight {
    pub color: Rgb,
    pub intensity: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectionalLight {
    pub color: Rgb,
    pub intensity: f32,
    pub position: Vec3,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Lighting {
    pub ambient: AmbientLight,
    pub directional: DirectionalLight,
    pub background: Rgb,
}

impl From<&LightingConfig> for Lighting {
    fn from(config: &LightingConfig) -> Self {
        Self {
            ambient: AmbientLight {
                color: config.ambient_color,
                intensity: config.ambient_intensity,
            },
            directional: DirectionalLight {
                color: config.directional_color,
                intensity: config.directional_intensity,
                position: Vec3::from_array(config.directional_position),
            },
            background: config.background,
        }
    }
}

/// Per-frame result
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameOutcome {
    /// A preset transition finished this frame
    pub transition_completed: bool,
    pub camera_moved: bool,
}

pub struct SceneHost {
    graph: SceneGraph,
    ledger: ResourceLedger,
    camera: PerspectiveCamera,
    orbit: OrbitController,
    lighting: Lighting,
    camera_config: CameraConfig,
    surface_size: (u32, u32),
    transition: Option<CameraTransition>,
    observed_directive: CameraDirective,
    frames: u64,
    active: bool,
}

impl SceneHost {
    /// Probe the surface and build the scene. Fails before allocating
    /// anything if no 3D context is available.
    pub fn activate(surface: &dyn RenderSurface, settings: &CustomizerSettings) -> Result<Self, HostError> {
        surface.probe().map_err(HostError::CapabilityUnavailable)?;

        let (width, height) = surface.size();
        let mut camera = PerspectiveCamera::from_config(&settings.camera, aspect_ratio(width, height));
        camera.look_at(Vec3::ZERO);

        info!("Scene host active ({}x{})", width, height);
        Ok(Self {
            graph: SceneGraph::new(),
            ledger: ResourceLedger::new(),
            camera,
            orbit: OrbitController::new(settings.camera.damping_factor),
            lighting: Lighting::from(&settings.lighting),
            camera_config: settings.camera.clone(),
            surface_size: (width, height),
            transition: None,
            observed_directive: CameraDirective::Free,
            frames: 0,
            active: true,
        })
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn graph(&self) -> &SceneGraph {
        &self.graph
    }

    pub fn graph_mut(&mut self) -> &mut SceneGraph {
        &mut self.graph
    }

    pub fn ledger(&self) -> &ResourceLedger {
        &self.ledger
    }

    /// Graph and ledger together, for reconcilers that need both
    pub fn scene_mut(&mut self) -> (&mut SceneGraph, &ResourceLedger) {
        (&mut self.graph, &self.ledger)
    }

    pub fn camera(&self) -> &PerspectiveCamera {
        &self.camera
    }

    pub fn orbit(&self) -> &OrbitController {
        &self.orbit
    }

    /// Orbit input goes through here; ignored while a transition runs
    pub fn orbit_mut(&mut self) -> Option<(&mut OrbitController, &PerspectiveCamera)> {
        if !self.active || !self.orbit.enabled {
            return None;
        }
        Some((&mut self.orbit, &self.camera))
    }

    pub fn lighting(&self) -> &Lighting {
        &self.lighting
    }

    pub fn surface_size(&self) -> (u32, u32) {
        self.surface_size
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn is_transitioning(&self) -> bool {
        self.transition.is_some()
    }

    /// Track the container size; the camera aspect follows immediately
    pub fn resize(&mut self, width: u32, height: u32) {
        if !self.active || (width, height) == self.surface_size {
            return;
        }
        self.surface_size = (width, height);
        self.camera.aspect = aspect_ratio(width, height);
        debug!("Surface resized to {}x{}", width, height);
    }

    /// React to a configuration snapshot. A change into a preset directive
    /// starts a transition; anything else leaves the camera alone.
    pub fn observe(&mut self, config: &Configuration) {
        if !self.active {
            return;
        }
        let directive = config.camera_directive;
        if directive == self.observed_directive {
            return;
        }
        self.observed_directive = directive;

        let Some(to) = preset_position(directive, self.camera_config.preset_distance, config.zoom) else {
            return;
        };
        let duration = self.camera_config.transition_ms as f32 / 1000.0;
        self.transition = Some(CameraTransition::new(self.camera.position, to, duration));
        self.orbit.enabled = false;
        debug!("Camera transition to {:?} ({:?})", directive, to);
    }

    /// Advance one frame by `dt` seconds
    pub fn frame(&mut self, dt: f32) -> FrameOutcome {
        let mut outcome = FrameOutcome::default();
        if !self.active {
            return outcome;
        }
        self.frames += 1;

        match self.transition.as_mut() {
            Some(transition) => {
                self.camera.position = transition.advance(dt);
                self.camera.look_at(Vec3::ZERO);
                outcome.camera_moved = true;

                if transition.is_finished() {
                    self.transition = None;
                    self.orbit.reset(Vec3::ZERO);
                    self.orbit.enabled = true;
                    outcome.transition_completed = true;
                }
            }
            None => {
                outcome.camera_moved = self.orbit.update(&mut self.camera);
            }
        }
        outcome
    }

    /// Stop the frame loop and dispose everything in the scene. Safe to call
    /// repeatedly; returns whether anything was torn down.
    pub fn teardown(&mut self) -> bool {
        if !self.active {
            return false;
        }
        self.active = false;
        self.transition = None;
        self.orbit.enabled = false;

        let removed = self.graph.clear();
        info!("Scene host torn down ({} nodes disposed)", removed);
        true
    }
}

fn aspect_ratio(width: u32, height: u32) -> f32 {
    if height == 0 {
        1.0
    } else {
        width as f32 / height as f32
    }
}
