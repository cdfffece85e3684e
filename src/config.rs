// config.rs - viewer settings
//
// Sources, strongest first:
//   1. CLI: --data <dir>, --lang <code>, --settings <file>
//   2. Env: CITYMAP_DATA, CITYMAP_LANG, CITYMAP_SETTINGS
//   3. JSON settings file (every field optional)
//   4. Built-in defaults

use crate::camera::ZoomRange;
use crate::gesture::GestureSettings;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const DEFAULT_DATA_DIR: &str = "data";
pub const DEFAULT_LANG: &str = "en";
pub const DEFAULT_SETTINGS_FILE: &str = "citymap.json";

/// Tunables read from the settings file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub zoom_min: f32,
    pub zoom_max: f32,
    pub zoom_speed: f32,
    pub rotate_speed: f32,
    pub pinch_rotate_gain: f32,
    pub fov_deg: f32,
    pub show_labels: bool,
}

impl Default for Settings {
    fn default() -> Self {
        let zoom = ZoomRange::default();
        let gestures = GestureSettings::default();
        Self {
            zoom_min: zoom.min,
            zoom_max: zoom.max,
            zoom_speed: gestures.zoom_speed,
            rotate_speed: gestures.rotate_speed,
            pinch_rotate_gain: gestures.pinch_rotate_gain,
            fov_deg: 60.0,
            show_labels: true,
        }
    }
}

impl Settings {
    /// Repairs values that would break the camera, warning about each.
    pub fn sanitized(mut self) -> Self {
        let defaults = Settings::default();
        let positive = |v: f32| v.is_finite() && v > 0.0;

        if !positive(self.zoom_min) || !positive(self.zoom_max) {
            log::warn!(
                "zoom range {}..{} invalid, using {}..{}",
                self.zoom_min,
                self.zoom_max,
                defaults.zoom_min,
                defaults.zoom_max
            );
            self.zoom_min = defaults.zoom_min;
            self.zoom_max = defaults.zoom_max;
        } else if self.zoom_min > self.zoom_max {
            log::warn!("zoom_min > zoom_max, swapping");
            std::mem::swap(&mut self.zoom_min, &mut self.zoom_max);
        }
        if !positive(self.zoom_speed) || self.zoom_speed >= 1.0 {
            log::warn!("zoom_speed {} out of (0, 1), using {}", self.zoom_speed, defaults.zoom_speed);
            self.zoom_speed = defaults.zoom_speed;
        }
        if !self.rotate_speed.is_finite() {
            self.rotate_speed = defaults.rotate_speed;
        }
        if !self.pinch_rotate_gain.is_finite() {
            self.pinch_rotate_gain = defaults.pinch_rotate_gain;
        }
        if !(self.fov_deg.is_finite() && self.fov_deg >= 10.0 && self.fov_deg <= 120.0) {
            log::warn!("fov_deg {} out of 10..120, using {}", self.fov_deg, defaults.fov_deg);
            self.fov_deg = defaults.fov_deg;
        }
        self
    }

    pub fn zoom_range(&self) -> ZoomRange {
        ZoomRange {
            min: self.zoom_min,
            max: self.zoom_max,
        }
    }

    pub fn gestures(&self) -> GestureSettings {
        GestureSettings {
            zoom_speed: self.zoom_speed,
            rotate_speed: self.rotate_speed,
            pinch_rotate_gain: self.pinch_rotate_gain,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ViewerConfig {
    pub data_dir: PathBuf,
    pub lang: String,
    pub settings: Settings,
}

#[derive(Debug, Default, PartialEq)]
struct CliArgs {
    data: Option<PathBuf>,
    lang: Option<String>,
    settings: Option<PathBuf>,
}

fn parse_args(args: impl IntoIterator<Item = String>) -> CliArgs {
    let mut out = CliArgs::default();
    let mut it = args.into_iter();
    while let Some(a) = it.next() {
        match a.as_str() {
            "--data" => out.data = it.next().map(PathBuf::from),
            "--lang" => out.lang = it.next(),
            "--settings" => out.settings = it.next().map(PathBuf::from),
            _ => {}
        }
    }
    out
}

fn env_nonempty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

pub fn load_settings(path: &Path) -> Result<Settings> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading settings {}", path.display()))?;
    let settings: Settings = serde_json::from_str(&text)
        .with_context(|| format!("parsing settings {}", path.display()))?;
    Ok(settings.sanitized())
}

impl ViewerConfig {
    pub fn from_env() -> Self {
        Self::resolve(
            std::env::args().skip(1),
            env_nonempty("CITYMAP_DATA"),
            env_nonempty("CITYMAP_LANG"),
            env_nonempty("CITYMAP_SETTINGS"),
        )
    }

    fn resolve(
        args: impl IntoIterator<Item = String>,
        env_data: Option<String>,
        env_lang: Option<String>,
        env_settings: Option<String>,
    ) -> Self {
        let cli = parse_args(args);

        let data_dir = cli
            .data
            .or(env_data.map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));
        let lang = cli
            .lang
            .or(env_lang)
            .unwrap_or_else(|| DEFAULT_LANG.to_string());

        // An explicitly named file must load; the implicit one may be absent.
        let settings = match cli.settings.or(env_settings.map(PathBuf::from)) {
            Some(path) => load_settings(&path).unwrap_or_else(|e| {
                log::warn!("{:#}; using defaults", e);
                Settings::default()
            }),
            None => {
                let implicit = data_dir.join(DEFAULT_SETTINGS_FILE);
                if implicit.exists() {
                    load_settings(&implicit).unwrap_or_else(|e| {
                        log::warn!("{:#}; using defaults", e);
                        Settings::default()
                    })
                } else {
                    Settings::default()
                }
            }
        };

        Self {
            data_dir,
            lang,
            settings,
        }
    }
}
