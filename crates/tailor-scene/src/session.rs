//! The customizer session as an ECS resource

use tracing::debug;
use bevy::prelude::*;
use bevy::window::PrimaryWindow;
use std::ops::{Deref, DerefMut};

use tailor_core::host::RenderSurface;
use tailor_core::{Customizer, CustomizerSettings};

#[derive(Resource)]
pub struct CustomizerSession(pub Customizer);

impl Deref for CustomizerSession {
    type Target = Customizer;

    fn deref(&self) -> &Customizer {
        &self.0
    }
}

impl DerefMut for CustomizerSession {
    fn deref_mut(&mut self) -> &mut Customizer {
        &mut self.0
    }
}

/// Settings the session is mounted with
#[derive(Resource, Debug, Clone, Default)]
pub struct SessionSettings(pub CustomizerSettings);

/// The primary window as a render surface. The page has already been probed
/// for a 3D context before the app starts, so the probe always succeeds.
pub struct WindowSurface {
    pub width: u32,
    pub height: u32,
}

impl WindowSurface {
    pub fn from_window(window: &Window) -> Self {
        Self {
            width: window.physical_width(),
            height: window.physical_height(),
        }
    }
}

impl RenderSurface for WindowSurface {
    fn probe(&self) -> Result<(), String> {
        Ok(())
    }

    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// Keep the host's surface size in step with the window
pub fn track_window_size(
    mut session: ResMut<CustomizerSession>,
    windows: Query<&Window, (With<PrimaryWindow>, Changed<Window>)>,
) {
    let Ok(window) = windows.single() else {
        return;
    };
    if let Some(host) = session.host_mut() {
        host.resize(window.physical_width(), window.physical_height());
    }
}

/// Apply pending configuration changes and advance the host one frame
pub fn tick_session(mut session: ResMut<CustomizerSession>, time: Res<Time>) {
    let outcome = session.tick(time.delta_secs());
    if outcome.transition_completed {
        debug!("Camera preset reached");
    }
}

/// Tear the scene down when the app exits
pub fn teardown_on_exit(mut exits: MessageReader<AppExit>, mut session: ResMut<CustomizerSession>) {
    if exits.read().next().is_some() {
        session.unmount();
    }
}
