//! Control panel and status overlay using bevy_egui

use bevy::ecs::system::SystemParam;
use bevy::prelude::*;
use bevy_egui::{egui, EguiContexts, EguiPrimaryContextPass};
use std::collections::HashMap;

use tailor_core::color::{Rgb, SWATCHES};
use tailor_core::config::{
    CameraDirective, ConfigError, ConfigStore, Configuration, Label, LabelDraft, LabelId, LabelUpdate,
    Placement, ZoneId, MAX_ZOOM, MIN_ZOOM,
};
use tailor_core::settings::LabelConfig;
use tailor_scene::CustomizerSession;

use crate::fetch::PendingFetches;

pub struct PanelPlugin;

impl Plugin for PanelPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<PanelState>().add_systems(
            EguiPrimaryContextPass,
            panel_system.run_if(resource_exists::<CustomizerSession>),
        );
    }
}

/// Text the user is typing, kept apart from the committed configuration so
/// rejected edits stay visible
#[derive(Resource, Default)]
pub struct PanelState {
    pub draft_text: String,
    pub draft_placement: Placement,
    pub model_url: String,
    pub edits: HashMap<LabelId, String>,
    pub error: Option<String>,
}

impl PanelState {
    /// Submit the draft as a new label; the draft clears on success
    pub fn submit_draft(&mut self, store: &mut ConfigStore, limits: &LabelConfig) -> Result<LabelId, ConfigError> {
        let draft = LabelDraft::new(self.draft_text.clone(), self.draft_placement, limits);
        let result = store.add_label(draft);
        match &result {
            Ok(_) => {
                self.draft_text.clear();
                self.error = None;
            }
            Err(err) => self.error = Some(err.to_string()),
        }
        result
    }

    /// Edit buffer for a label, seeded from its committed text
    pub fn edit_buffer(&mut self, label: &Label) -> &mut String {
        self.edits.entry(label.id.clone()).or_insert_with(|| label.text.clone())
    }

    /// Push an edited buffer into the store
    pub fn commit_edit(&mut self, store: &mut ConfigStore, id: &LabelId) {
        let Some(text) = self.edits.get(id).cloned() else {
            return;
        };
        let update = LabelUpdate {
            text: Some(text),
            ..Default::default()
        };
        self.record(store.update_label(id, update));
    }

    /// Drop buffers of labels that no longer exist
    pub fn prune(&mut self, config: &Configuration) {
        self.edits.retain(|id, _| config.label(id).is_some());
    }

    fn record<T>(&mut self, result: Result<T, ConfigError>) {
        self.error = result.err().map(|e| e.to_string());
    }
}

/// Grouped system parameters for the panel
#[derive(SystemParam)]
pub struct UiParams<'w, 's> {
    pub contexts: EguiContexts<'w, 's>,
    pub session: ResMut<'w, CustomizerSession>,
    pub state: ResMut<'w, PanelState>,
    pub fetches: ResMut<'w, PendingFetches>,
}

fn panel_system(params: UiParams) {
    let UiParams {
        mut contexts,
        mut session,
        mut state,
        mut fetches,
    } = params;
    let Ok(ctx) = contexts.ctx_mut() else { return };

    let config = session.config();
    let limits = session.settings().labels.clone();
    state.prune(&config);

    egui::SidePanel::right("customizer_panel")
        .default_width(300.0)
        .resizable(false)
        .show(ctx, |ui| {
            egui::ScrollArea::vertical().show(ui, |ui| {
                ui.heading("Customize");
                ui.separator();

                zone_section(ui, &mut session, &config);
                ui.separator();
                label_section(ui, &mut session, &mut state, &config, &limits);
                ui.separator();
                view_section(ui, &mut session, &mut state, &config);
                ui.separator();
                model_section(ui, &mut session, &mut state, &mut fetches);

                if let Some(error) = &state.error {
                    ui.add_space(6.0);
                    ui.label(
                        egui::RichText::new(error)
                            .small()
                            .color(egui::Color32::from_rgb(255, 100, 100)),
                    );
                }
            });
        });

    if let Some(message) = session.display_state().message() {
        egui::Area::new(egui::Id::new("status_overlay"))
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| {
                egui::Frame::popup(ui.style()).show(ui, |ui| {
                    ui.label(egui::RichText::new(message).size(16.0));
                });
            });
    }
}

fn zone_section(ui: &mut egui::Ui, session: &mut CustomizerSession, config: &Configuration) {
    for zone in ZoneId::ALL {
        let current = config.zone_colors.get(zone);
        ui.label(egui::RichText::new(zone.display_name()).strong());
        ui.horizontal_wrapped(|ui| {
            for swatch in SWATCHES {
                let button = egui::Button::new("")
                    .fill(color32(swatch.color))
                    .min_size(egui::vec2(22.0, 22.0))
                    .selected(swatch.color == current);
                if ui.add(button).on_hover_text(swatch.name).clicked() {
                    session.store_mut().set_zone_color(zone, swatch.color);
                }
            }

            let mut rgb = [current.r, current.g, current.b];
            if ui.color_edit_button_srgb(&mut rgb).changed() {
                session.store_mut().set_zone_color(zone, Rgb::new(rgb[0], rgb[1], rgb[2]));
            }
        });
    }
}

fn label_section(
    ui: &mut egui::Ui,
    session: &mut CustomizerSession,
    state: &mut PanelState,
    config: &Configuration,
    limits: &LabelConfig,
) {
    ui.label(egui::RichText::new(format!("Labels ({}/{})", config.labels.len(), limits.max_labels)).strong());

    let mut removed = None;
    for label in &config.labels {
        ui.push_id(&label.id.0, |ui| {
            ui.horizontal(|ui| {
                let response = ui.add(
                    egui::TextEdit::singleline(state.edit_buffer(label))
                        .char_limit(limits.max_chars)
                        .desired_width(150.0),
                );
                if response.changed() {
                    state.commit_edit(session.store_mut(), &label.id);
                }
                if ui.button("✕").on_hover_text("Remove label").clicked() {
                    removed = Some(label.id.clone());
                }
            });

            let mut update = LabelUpdate::default();
            ui.horizontal(|ui| {
                let mut placement = label.placement;
                ui.selectable_value(&mut placement, Placement::Front, "Front");
                ui.selectable_value(&mut placement, Placement::Back, "Back");
                if placement != label.placement {
                    update.placement = Some(placement);
                }

                let mut rgb = [label.color.r, label.color.g, label.color.b];
                if ui.color_edit_button_srgb(&mut rgb).changed() {
                    update.color = Some(Rgb::new(rgb[0], rgb[1], rgb[2]));
                }
            });

            let mut font_size = label.font_size;
            let [min_size, max_size] = limits.font_size_range;
            if ui
                .add(egui::Slider::new(&mut font_size, min_size..=max_size).text("Size"))
                .changed()
            {
                update.font_size = Some(font_size);
            }

            let [mut x, mut y] = label.anchor;
            let moved_x = ui.add(egui::Slider::new(&mut x, 0.0..=1.0).text("Across")).changed();
            let moved_y = ui.add(egui::Slider::new(&mut y, 0.0..=1.0).text("Down")).changed();
            if moved_x || moved_y {
                update.anchor = Some([x, y]);
            }

            if update != LabelUpdate::default() {
                let result = session.store_mut().update_label(&label.id, update);
                state.record(result);
            }
        });
        ui.add_space(4.0);
    }

    if let Some(id) = removed {
        session.store_mut().remove_label(&id);
        state.edits.remove(&id);
    }

    let full = config.labels.len() >= limits.max_labels;
    ui.add_enabled_ui(!full, |ui| {
        ui.horizontal(|ui| {
            let response = ui.add(
                egui::TextEdit::singleline(&mut state.draft_text)
                    .char_limit(limits.max_chars)
                    .hint_text("Label text")
                    .desired_width(150.0),
            );
            let submitted = response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
            if ui.button("Add").clicked() || submitted {
                // Failures land in state.error
                let _ = state.submit_draft(session.store_mut(), limits);
            }
        });
        ui.horizontal(|ui| {
            ui.selectable_value(&mut state.draft_placement, Placement::Front, "Front");
            ui.selectable_value(&mut state.draft_placement, Placement::Back, "Back");
        });
    });
}

fn view_section(ui: &mut egui::Ui, session: &mut CustomizerSession, state: &mut PanelState, config: &Configuration) {
    ui.label(egui::RichText::new("View").strong());
    ui.horizontal(|ui| {
        for preset in CameraDirective::PRESETS {
            if ui.button(preset.display_name()).clicked() {
                session.store_mut().set_camera_directive(preset);
            }
        }
    });

    let mut zoom = config.zoom;
    if ui
        .add(egui::Slider::new(&mut zoom, MIN_ZOOM..=MAX_ZOOM).text("Zoom"))
        .changed()
    {
        let result = session.store_mut().set_zoom(zoom);
        state.record(result);
    }

    if ui.button("Reset").clicked() {
        session.store_mut().reset();
        state.edits.clear();
        state.error = None;
    }
}

fn model_section(
    ui: &mut egui::Ui,
    session: &mut CustomizerSession,
    state: &mut PanelState,
    fetches: &mut PendingFetches,
) {
    egui::CollapsingHeader::new("Model").default_open(false).show(ui, |ui| {
        if state.model_url.is_empty() {
            state.model_url = session.settings().model_url.clone();
        }
        ui.horizontal(|ui| {
            ui.add(egui::TextEdit::singleline(&mut state.model_url).desired_width(200.0));
            let enabled = !state.model_url.trim().is_empty();
            if ui.add_enabled(enabled, egui::Button::new("Load")).clicked() {
                let url = state.model_url.trim().to_string();
                match session.begin_model_load_from(&url) {
                    Ok(ticket) => fetches.start_model(ticket),
                    Err(err) => state.error = Some(err.to_string()),
                }
            }
        });
        if fetches.model_in_flight() {
            ui.label(egui::RichText::new("Downloading...").small().color(egui::Color32::GRAY));
        }
    });
}

fn color32(rgb: Rgb) -> egui::Color32 {
    egui::Color32::from_rgb(rgb.r, rgb.g, rgb.b)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (ConfigStore, LabelConfig) {
        let limits = LabelConfig::default();
        (ConfigStore::new(&limits), limits)
    }

    #[test]
    fn test_submit_draft_clears_on_success() {
        let (mut store, limits) = store();
        let mut state = PanelState {
            draft_text: "TEAM".to_string(),
            draft_placement: Placement::Back,
            ..Default::default()
        };

        let id = state.submit_draft(&mut store, &limits).unwrap();
        let label = store.get().label(&id).cloned().unwrap();
        assert_eq!(label.text, "TEAM");
        assert_eq!(label.placement, Placement::Back);
        assert!(state.draft_text.is_empty());
        assert!(state.error.is_none());
    }

    #[test]
    fn test_rejected_draft_keeps_text_and_error() {
        let (mut store, limits) = store();
        let mut state = PanelState {
            draft_text: "   ".to_string(),
            ..Default::default()
        };

        assert_eq!(state.submit_draft(&mut store, &limits), Err(ConfigError::EmptyText));
        assert_eq!(state.draft_text, "   ");
        assert!(state.error.is_some());
        assert!(store.get().labels.is_empty());
    }

    #[test]
    fn test_edit_buffer_survives_rejection() {
        let (mut store, limits) = store();
        let id = store
            .add_label(LabelDraft::new("NAME", Placement::Front, &limits))
            .unwrap();
        let label = store.get().label(&id).cloned().unwrap();

        let mut state = PanelState::default();
        state.edit_buffer(&label).clear();
        state.commit_edit(&mut store, &id);

        assert_eq!(state.edits[&id], "");
        assert!(state.error.is_some());
        assert_eq!(store.get().label(&id).map(|l| l.text.as_str()), Some("NAME"));

        state.edit_buffer(&label).push_str("NEW");
        state.commit_edit(&mut store, &id);
        assert!(state.error.is_none());
        assert_eq!(store.get().label(&id).map(|l| l.text.as_str()), Some("NEW"));
    }

    #[test]
    fn test_prune_drops_removed_labels() {
        let (mut store, limits) = store();
        let id = store
            .add_label(LabelDraft::new("A", Placement::Front, &limits))
            .unwrap();
        let label = store.get().label(&id).cloned().unwrap();

        let mut state = PanelState::default();
        state.edit_buffer(&label);
        store.remove_label(&id);
        state.prune(&store.get());
        assert!(state.edits.is_empty());
    }
}
