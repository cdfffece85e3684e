// i18n.rs - UI strings
//
// English ships in the binary. Other languages come from a flat
// `{ "key": "text" }` JSON file found in, first hit wins:
//   <data>/i18n/<lang>.json
//   <exe_dir>/assets/i18n/<lang>.json
//   ./assets/i18n/<lang>.json
// Keys missing from that file fall back to English, then to the key itself.
// `{name}` placeholders are filled by `tr_with`.

use once_cell::sync::OnceCell;
use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::RwLock,
};

const BUILTIN_EN: &[(&str, &str)] = &[
    ("app.title", "City Map"),
    ("menu.file", "File"),
    ("menu.open_folder", "Open map folder…"),
    ("menu.exit", "Exit"),
    ("menu.view", "View"),
    ("menu.language", "Language"),
    ("view.reset", "Reset camera"),
    ("view.fullscreen.enter", "Fullscreen"),
    ("view.fullscreen.exit", "Exit fullscreen"),
    ("view.show_labels", "Show labels"),
    ("view.show_fps", "Show FPS"),
    ("status.loading", "Loading map…"),
    ("status.zoom", "Zoom"),
    ("status.yaw", "Yaw"),
    ("status.pitch", "Pitch"),
    ("status.pan", "Pan"),
    ("status.labels", "Labels {visible}/{total}"),
    ("status.gesture", "Gesture"),
    ("status.touch", "touch"),
    ("status.hint", "Drag: pan · Shift+drag: rotate · Wheel: zoom"),
];

#[derive(Debug, Clone)]
struct Strings {
    lang: String,
    map: HashMap<String, String>,
}

static STRINGS: OnceCell<RwLock<Strings>> = OnceCell::new();

fn candidate_files(lang: &str, data_dir: &Path) -> Vec<PathBuf> {
    let file = format!("{lang}.json");
    let mut out = vec![data_dir.join("i18n").join(&file)];
    if let Some(dir) = std::env::current_exe().ok().as_deref().and_then(Path::parent) {
        out.push(dir.join("assets").join("i18n").join(&file));
    }
    out.push(PathBuf::from("assets").join("i18n").join(&file));
    out
}

fn load_overlay(lang: &str, data_dir: &Path) -> HashMap<String, String> {
    for path in candidate_files(lang, data_dir) {
        let Ok(text) = std::fs::read_to_string(&path) else {
            continue;
        };
        match serde_json::from_str::<HashMap<String, String>>(&text) {
            Ok(map) => {
                log::info!("language {} from {}", lang, path.display());
                return map;
            }
            Err(e) => log::warn!("ignoring {}: {}", path.display(), e),
        }
    }
    if lang != "en" {
        log::warn!("no strings for language {:?}, using English", lang);
    }
    HashMap::new()
}

/// Selects the UI language. Later calls replace the earlier selection.
pub fn init(lang: &str, data_dir: &Path) {
    let map = if lang == "en" {
        HashMap::new()
    } else {
        load_overlay(lang, data_dir)
    };
    let strings = Strings {
        lang: lang.to_string(),
        map,
    };

    if let Some(lock) = STRINGS.get() {
        if let Ok(mut w) = lock.write() {
            *w = strings;
        }
    } else {
        let _ = STRINGS.set(RwLock::new(strings));
    }
}

pub fn current_lang() -> String {
    STRINGS
        .get()
        .and_then(|l| l.read().ok().map(|s| s.lang.clone()))
        .unwrap_or_else(|| "en".to_string())
}

pub fn tr(key: &str) -> String {
    if let Some(v) = STRINGS
        .get()
        .and_then(|l| l.read().ok().and_then(|s| s.map.get(key).cloned()))
    {
        return v;
    }
    BUILTIN_EN
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, v)| v.to_string())
        .unwrap_or_else(|| key.to_string())
}

/// Like [`tr`], substituting `{name}` placeholders; unknown ones stay as is.
pub fn tr_with(key: &str, args: &[(&str, String)]) -> String {
    let mut s = tr(key);
    for (k, v) in args {
        s = s.replace(&format!("{{{k}}}"), v);
    }
    s
}
