//! Bevy application setup

use bevy::prelude::*;
use bevy::winit::WinitSettings;
use bevy_egui::EguiPlugin;
use bevy_picking::DefaultPickingPlugins;

use tailor_core::CustomizerSettings;
use tailor_scene::TailorScenePlugin;

use crate::fetch::FetchPlugin;
use crate::panel::PanelPlugin;

pub fn run(settings: CustomizerSettings) {
    let canvas = settings.canvas_selector.clone();

    App::new()
        .insert_resource(WinitSettings::default())
        .add_plugins(DefaultPlugins
            .set(WindowPlugin {
                primary_window: Some(Window {
                    title: "Tailor Customizer".to_string(),
                    canvas: Some(canvas),
                    fit_canvas_to_parent: true,
                    prevent_default_event_handling: false,
                    ..default()
                }),
                ..default()
            })
            .set(AssetPlugin {
                file_path: "".to_string(),
                // Static hosting has no .meta files
                meta_check: bevy::asset::AssetMetaCheck::Never,
                ..default()
            })
        )
        // Picking must be registered before EguiPlugin so egui can detect it
        .add_plugins(DefaultPickingPlugins)
        .add_plugins(EguiPlugin::default())
        .add_plugins(TailorScenePlugin { settings })
        .add_plugins(FetchPlugin)
        .add_plugins(PanelPlugin)
        .run();
}
