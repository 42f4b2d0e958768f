use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use anyhow::{Context, Result};
use eframe::egui::Color32;
use serde::{Deserialize, Serialize};

use crate::engine::palette::DEFAULT_NODE_GRAY;
use crate::engine::scene::DEFAULT_ATTRIBUTE;
use crate::engine::{ColorMap, FrameStyle};

pub const DEFAULT_SETTINGS_FILE: &str = "settings.json";

/// Viewer settings as stored on disk. Missing keys take their defaults.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub data_file: String,
    pub background_color: String,
    /// Colour of nodes whose attribute is the default one.
    pub node_color: String,
    pub edge_color: String,
    pub node_size: f32,
    /// Multiplier applied to the weight-scaled edge width.
    pub edge_width: f32,
    pub attribute_colors: BTreeMap<String, String>,
    /// Larger than the engine default so a tree laid out around the origin is
    /// visible from the initial camera distance.
    pub lod_threshold: f32,
    pub selection_radius: f32,
    pub show_labels: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_file: "data_sample_dataset.csv".to_owned(),
            background_color: "#FFFFFF".to_owned(),
            node_color: "#FF5733".to_owned(),
            edge_color: "#C70039".to_owned(),
            node_size: 10.0,
            edge_width: 1.0,
            attribute_colors: BTreeMap::from([
                ("attribute_value_1".to_owned(), "#FF0000".to_owned()),
                ("attribute_value_2".to_owned(), "#00FF00".to_owned()),
            ]),
            lod_threshold: 150.0,
            selection_radius: 5.0,
            show_labels: true,
        }
    }
}

fn parse_color(key: &str, hex: &str, fallback: Color32) -> Color32 {
    Color32::from_hex(hex.trim()).unwrap_or_else(|_| {
        log::warn!("invalid colour {hex:?} for {key}, using {}", fallback.to_hex());
        fallback
    })
}

impl Settings {
    /// Reads settings from `path`.
    ///
    /// A missing file is created with the defaults. An unreadable or malformed
    /// file is left alone and the defaults are used for this run.
    pub fn load_or_default(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(text) => match Self::from_json(&text) {
                Ok(settings) => {
                    log::info!("loaded settings from {}", path.display());
                    settings
                }
                Err(error) => {
                    log::warn!("{}: {error:#}; using default settings", path.display());
                    Self::default()
                }
            },
            Err(error) if error.kind() == ErrorKind::NotFound => {
                let settings = Self::default();
                match settings.save(path) {
                    Ok(()) => log::info!("wrote default settings to {}", path.display()),
                    Err(error) => log::warn!("{error:#}"),
                }
                settings
            }
            Err(error) => {
                log::warn!("failed to read {}: {error}; using default settings", path.display());
                Self::default()
            }
        }
    }

    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).context("failed to parse settings JSON")
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let text = serde_json::to_string_pretty(self).context("failed to serialize settings")?;
        fs::write(path, text).with_context(|| format!("failed to write {}", path.display()))
    }

    pub fn color_map(&self) -> ColorMap {
        let defaults = Self::default();
        let mut colors = ColorMap::new(Default::default(), DEFAULT_NODE_GRAY);
        colors.insert(
            DEFAULT_ATTRIBUTE,
            parse_color(
                "node_color",
                &self.node_color,
                parse_color("node_color", &defaults.node_color, DEFAULT_NODE_GRAY),
            ),
        );
        for (attribute, hex) in &self.attribute_colors {
            colors.insert(attribute.clone(), parse_color(attribute, hex, DEFAULT_NODE_GRAY));
        }
        colors
    }

    pub fn frame_style(&self) -> FrameStyle {
        let defaults = FrameStyle::default();
        FrameStyle {
            background: parse_color("background_color", &self.background_color, defaults.background),
            edge_color: parse_color("edge_color", &self.edge_color, defaults.edge_color),
            node_size: if self.node_size > 0.0 {
                self.node_size
            } else {
                defaults.node_size
            },
            edge_width: if self.edge_width > 0.0 {
                self.edge_width
            } else {
                defaults.edge_width
            },
            show_labels: self.show_labels,
        }
    }
}
