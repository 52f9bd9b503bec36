use eframe::egui;
use uuid::Uuid;

use super::library_events::*;
use crate::entities::asset::{Asset, AssetCategory};
use crate::entities::library::Library;
use crate::widgets::actions::ActionQueue;
use crate::widgets::file_dialogs::create_image_dialog;

/// Library panel view state (filters, inline edits)
#[derive(Debug, Default)]
pub struct LibraryPanelState {
    pub filter: crate::entities::asset::AssetFilter,
    pub favorites_only: bool,
    /// Asset being renamed and the edit buffer
    renaming: Option<(Uuid, String)>,
    new_tag: String,
}

fn render_filters(ui: &mut egui::Ui, library: &Library, state: &mut LibraryPanelState) {
    ui.horizontal(|ui| {
        ui.label("🔍");
        ui.add(egui::TextEdit::singleline(&mut state.filter.search).hint_text("Search assets"));
    });

    ui.horizontal_wrapped(|ui| {
        ui.selectable_value(&mut state.filter.category, None, "All");
        for category in AssetCategory::ALL {
            ui.selectable_value(&mut state.filter.category, Some(category), category.label());
        }
        ui.separator();
        ui.toggle_value(&mut state.favorites_only, "★");
    });

    ui.horizontal_wrapped(|ui| {
        for tag in library.tags() {
            let mut on = state.filter.tags.contains(&tag.name);
            if ui.toggle_value(&mut on, format!("#{}", tag.name)).changed() {
                if on {
                    state.filter.tags.push(tag.name.clone());
                } else {
                    state.filter.tags.retain(|t| t != &tag.name);
                }
            }
        }
    });
}

fn render_asset_row(
    ui: &mut egui::Ui,
    asset: &Asset,
    library: &Library,
    state: &mut LibraryPanelState,
    actions: &mut ActionQueue,
) {
    ui.horizontal(|ui| {
        let star = if asset.favorite { "★" } else { "☆" };
        if ui.small_button(star).on_hover_text("Favorite").clicked() {
            actions.send(ToggleFavoriteEvent(asset.id));
        }

        let editing = matches!(&state.renaming, Some((id, _)) if *id == asset.id);
        if editing {
            let mut finished = None;
            if let Some((_, buffer)) = state.renaming.as_mut() {
                let response = ui.text_edit_singleline(buffer);
                if response.lost_focus() {
                    finished = Some(buffer.trim().to_string());
                } else {
                    response.request_focus();
                }
            }
            if let Some(name) = finished {
                if !name.is_empty() && name != asset.name {
                    actions.send(RenameAssetEvent { id: asset.id, name });
                }
                state.renaming = None;
            }
        } else {
            let response = ui
                .add(egui::Label::new(&asset.name).sense(egui::Sense::click()))
                .on_hover_text(format!("{}\n{}", asset.category, asset.file_url));
            if response.double_clicked() {
                actions.send(UseAssetEvent(asset.id));
            }
            response.context_menu(|ui| {
                if ui.button("Add to Sequence").clicked() {
                    actions.send(UseAssetEvent(asset.id));
                    ui.close();
                }
                if ui.button("Rename").clicked() {
                    state.renaming = Some((asset.id, asset.name.clone()));
                    ui.close();
                }
                if ui.button("Duplicate").clicked() {
                    actions.send(DuplicateAssetEvent(asset.id));
                    ui.close();
                }
                ui.menu_button("Move to", |ui| {
                    for category in AssetCategory::ALL {
                        if ui
                            .add_enabled(category != asset.category, egui::Button::new(category.label()))
                            .clicked()
                        {
                            actions.send(MoveAssetEvent { id: asset.id, category });
                            ui.close();
                        }
                    }
                });
                ui.menu_button("Tag", |ui| {
                    for tag in library.tags() {
                        if ui
                            .add_enabled(!asset.has_tag(&tag.name), egui::Button::new(&tag.name))
                            .clicked()
                        {
                            actions.send(TagAssetEvent {
                                id: asset.id,
                                tag: tag.name.clone(),
                            });
                            ui.close();
                        }
                    }
                });
                ui.separator();
                if ui.button("Delete").clicked() {
                    actions.send(DeleteAssetEvent(asset.id));
                    ui.close();
                }
            });
        }

        if let Some(count) = asset.frame_count {
            ui.weak(format!("{} fr", count));
        }
        for tag in &asset.tags {
            ui.small(format!("#{}", tag));
        }
    });
}

/// Render library side panel
pub fn render(ui: &mut egui::Ui, library: &Library, state: &mut LibraryPanelState) -> ActionQueue {
    let mut actions = ActionQueue::new();

    ui.horizontal(|ui| {
        ui.heading("Library");
        if ui.button("+Import").clicked()
            && let Some(paths) = create_image_dialog("Import Images").pick_files()
            && !paths.is_empty()
        {
            let category = state.filter.category.unwrap_or_default();
            actions.send(ImportAssetsEvent { category, paths });
        }
    });
    ui.separator();

    render_filters(ui, library, state);

    ui.horizontal(|ui| {
        ui.add(
            egui::TextEdit::singleline(&mut state.new_tag)
                .hint_text("New tag")
                .desired_width(100.0),
        );
        let name = state.new_tag.trim().to_string();
        let exists = library.tags().iter().any(|t| t.name == name);
        if ui
            .add_enabled(!name.is_empty() && !exists, egui::Button::new("Add Tag"))
            .clicked()
        {
            actions.send(CreateTagEvent {
                name,
                color: "hsl(200 60% 75%)".to_string(),
            });
            state.new_tag.clear();
        }
    });
    ui.separator();

    let filter = state.filter.clone();
    let assets: Vec<&Asset> = if state.favorites_only {
        library.favorites().filter(|a| filter.matches(a)).collect()
    } else {
        library.filtered(&filter).collect()
    };

    if assets.is_empty() {
        ui.weak(if library.is_empty() {
            "Library is empty. Import images or upload through the API."
        } else {
            "No assets match the filter."
        });
    }

    egui::ScrollArea::vertical()
        .id_salt("library_assets")
        .auto_shrink([false, false])
        .show(ui, |ui| {
            for asset in assets {
                render_asset_row(ui, asset, library, state, &mut actions);
            }
        });

    actions.hovered = ui.ui_contains_pointer();
    actions
}
