//! Tailor Scene - Bevy rendering for a customizer session
//!
//! The core crate owns the scene graph and every decision about it. This
//! crate mounts a [`Customizer`] as an ECS resource, forwards window and
//! pointer input into it, ticks it once per frame and mirrors the resulting
//! graph changes into entities, meshes, materials and images.

pub mod camera;
pub mod convert;
pub mod mirror;
pub mod session;

use tracing::{info, warn};
use bevy::prelude::*;
use bevy::window::PrimaryWindow;

use tailor_core::{Customizer, CustomizerSettings};

pub use camera::CustomizerCamera;
pub use mirror::{MirroredNode, SceneMirror};
pub use session::{CustomizerSession, SessionSettings, WindowSurface};

/// Fallback surface size when no primary window exists yet
const DEFAULT_SURFACE: (u32, u32) = (1280, 720);

/// Plugin that mounts the customizer and renders its scene
#[derive(Default)]
pub struct TailorScenePlugin {
    pub settings: CustomizerSettings,
}

impl Plugin for TailorScenePlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(SessionSettings(self.settings.clone()))
            .add_systems(PreStartup, mount_session)
            .add_systems(Startup, camera::spawn_camera_and_lights)
            .add_systems(
                Update,
                (
                    session::track_window_size,
                    camera::forward_orbit_input,
                    session::tick_session,
                    mirror::mirror_scene,
                    camera::sync_camera,
                )
                    .chain()
                    .run_if(resource_exists::<CustomizerSession>.and(resource_exists::<SceneMirror>)),
            )
            .add_systems(
                Last,
                (session::teardown_on_exit, mirror::mirror_scene)
                    .chain()
                    .run_if(resource_exists::<CustomizerSession>.and(resource_exists::<SceneMirror>)),
            );
    }
}

/// Mount the customizer against the primary window and spawn the entity the
/// scene root is mirrored onto
fn mount_session(
    mut commands: Commands,
    settings: Res<SessionSettings>,
    windows: Query<&Window, With<PrimaryWindow>>,
) {
    let surface = match windows.single() {
        Ok(window) => WindowSurface::from_window(window),
        Err(_) => WindowSurface {
            width: DEFAULT_SURFACE.0,
            height: DEFAULT_SURFACE.1,
        },
    };

    let customizer = Customizer::mount(settings.0.clone(), &surface);
    let Some(root) = customizer.host().map(|host| host.graph().root()) else {
        warn!("Customizer did not mount, scene stays empty");
        commands.insert_resource(CustomizerSession(customizer));
        return;
    };

    let root_entity = commands
        .spawn((
            Name::new("customizer-root"),
            Transform::default(),
            Visibility::default(),
            MirroredNode(root),
        ))
        .id();

    info!("Customizer mounted at {}x{}", surface.width, surface.height);
    commands.insert_resource(SceneMirror::new(root, root_entity));
    commands.insert_resource(CustomizerSession(customizer));
}
