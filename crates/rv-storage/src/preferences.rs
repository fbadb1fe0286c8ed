//! Host preferences persisted between runs.

use crate::store::KeyValueStore;
use rv_core::PreviewError;
use rv_core::PreviewResult;
use serde::Deserialize;
use serde::Serialize;
use tracing::debug;

pub const EDITOR_CONTENT_KEY: &str = "html-editor-content";
pub const DARK_MODE_KEY: &str = "dark-mode";
pub const AUTO_PREVIEW_KEY: &str = "auto-preview";
pub const AUTO_PREVIEW_DELAY_KEY: &str = "auto-preview-delay";
pub const BLOCK_NETWORK_KEY: &str = "block-network";
pub const CUSTOM_SIZE_KEY: &str = "custom-preview-size";

pub const DEFAULT_AUTO_PREVIEW_DELAY_MS: u32 = 800;
pub const MIN_AUTO_PREVIEW_DELAY_MS: u32 = 300;
pub const MAX_AUTO_PREVIEW_DELAY_MS: u32 = 1500;
const MIN_CUSTOM_SIZE: u32 = 200;
const MAX_CUSTOM_SIZE: u32 = 3000;
const DEFAULT_CUSTOM_SIZE: CustomSize = CustomSize {
    width: 1200,
    height: 800,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
struct CustomSize {
    width: u32,
    height: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostPreferences {
    pub editor_content: String,
    pub dark_mode: bool,
    pub auto_preview: bool,
    pub auto_preview_delay_ms: u32,
    pub block_network: bool,
    pub custom_width: u32,
    pub custom_height: u32,
}

impl Default for HostPreferences {
    fn default() -> Self {
        Self {
            editor_content: String::new(),
            dark_mode: false,
            auto_preview: false,
            auto_preview_delay_ms: DEFAULT_AUTO_PREVIEW_DELAY_MS,
            block_network: true,
            custom_width: DEFAULT_CUSTOM_SIZE.width,
            custom_height: DEFAULT_CUSTOM_SIZE.height,
        }
    }
}

impl HostPreferences {
    /// Reads every preference, falling back to the default for anything
    /// missing or malformed.
    pub fn load(store: &KeyValueStore) -> PreviewResult<Self> {
        let defaults = Self::default();
        let flag = |key: &str, default: bool| -> PreviewResult<bool> {
            Ok(store.get(key)?.map_or(default, |raw| raw == "true"))
        };

        let auto_preview_delay_ms = store
            .get(AUTO_PREVIEW_DELAY_KEY)?
            .and_then(|raw| raw.trim().parse::<i64>().ok())
            .map_or(DEFAULT_AUTO_PREVIEW_DELAY_MS, clamp_delay);

        let size = store
            .get(CUSTOM_SIZE_KEY)?
            .and_then(|raw| serde_json::from_str::<CustomSize>(&raw).ok())
            .filter(|size| size.width >= MIN_CUSTOM_SIZE && size.height >= MIN_CUSTOM_SIZE)
            .unwrap_or(DEFAULT_CUSTOM_SIZE);

        Ok(Self {
            editor_content: store.get(EDITOR_CONTENT_KEY)?.unwrap_or_default(),
            dark_mode: flag(DARK_MODE_KEY, defaults.dark_mode)?,
            auto_preview: flag(AUTO_PREVIEW_KEY, defaults.auto_preview)?,
            auto_preview_delay_ms,
            block_network: flag(BLOCK_NETWORK_KEY, defaults.block_network)?,
            custom_width: size.width,
            custom_height: size.height,
        })
    }

    /// Writes every preference, clamping numeric values first.
    pub fn save(&self, store: &KeyValueStore) -> PreviewResult<()> {
        let size = CustomSize {
            width: self.custom_width.clamp(MIN_CUSTOM_SIZE, MAX_CUSTOM_SIZE),
            height: self.custom_height.clamp(MIN_CUSTOM_SIZE, MAX_CUSTOM_SIZE),
        };
        let size_json = serde_json::to_string(&size)
            .map_err(|error| PreviewError::new("storage.preferences_encode", error.to_string()))?;

        store.set(EDITOR_CONTENT_KEY, &self.editor_content)?;
        store.set(DARK_MODE_KEY, &self.dark_mode.to_string())?;
        store.set(AUTO_PREVIEW_KEY, &self.auto_preview.to_string())?;
        store.set(
            AUTO_PREVIEW_DELAY_KEY,
            &clamp_delay(i64::from(self.auto_preview_delay_ms)).to_string(),
        )?;
        store.set(BLOCK_NETWORK_KEY, &self.block_network.to_string())?;
        store.set(CUSTOM_SIZE_KEY, &size_json)?;
        debug!("host preferences saved");
        Ok(())
    }
}

fn clamp_delay(value: i64) -> u32 {
    let clamped = value.clamp(
        i64::from(MIN_AUTO_PREVIEW_DELAY_MS),
        i64::from(MAX_AUTO_PREVIEW_DELAY_MS),
    );
    u32::try_from(clamped).unwrap_or(DEFAULT_AUTO_PREVIEW_DELAY_MS)
}

#[cfg(test)]
mod tests {
    use super::AUTO_PREVIEW_DELAY_KEY;
    use super::BLOCK_NETWORK_KEY;
    use super::CUSTOM_SIZE_KEY;
    use super::HostPreferences;
    use crate::store::KeyValueStore;
    use crate::test_support::temp_config;

    #[test]
    fn empty_store_yields_defaults() {
        let config = temp_config();
        let store = KeyValueStore::open(&config);
        let loaded = HostPreferences::load(&store);
        assert_eq!(loaded, Ok(HostPreferences::default()));
        let defaults = HostPreferences::default();
        assert!(defaults.block_network);
        assert_eq!(defaults.auto_preview_delay_ms, 800);
        assert_eq!((defaults.custom_width, defaults.custom_height), (1200, 800));
    }

    #[test]
    fn out_of_range_values_are_clamped_or_rejected() {
        let config = temp_config();
        let store = KeyValueStore::open(&config);
        assert!(store.set(AUTO_PREVIEW_DELAY_KEY, "50").is_ok());
        assert!(store.set(BLOCK_NETWORK_KEY, "false").is_ok());
        assert!(store.set(CUSTOM_SIZE_KEY, r#"{"width":150,"height":900}"#).is_ok());
        let Ok(loaded) = HostPreferences::load(&store) else {
            panic!("preferences should load");
        };
        assert_eq!(loaded.auto_preview_delay_ms, 300);
        assert!(!loaded.block_network);
        assert_eq!((loaded.custom_width, loaded.custom_height), (1200, 800));

        assert!(store.set(AUTO_PREVIEW_DELAY_KEY, "soon").is_ok());
        let Ok(loaded) = HostPreferences::load(&store) else {
            panic!("preferences should load");
        };
        assert_eq!(loaded.auto_preview_delay_ms, 800);

        let _ = std::fs::remove_dir_all(&config.root);
    }

    #[test]
    fn save_then_load_clamps_sizes() {
        let config = temp_config();
        let store = KeyValueStore::open(&config);
        let preferences = HostPreferences {
            editor_content: "<p>draft</p>".to_owned(),
            dark_mode: true,
            auto_preview: true,
            auto_preview_delay_ms: 9000,
            block_network: false,
            custom_width: 5000,
            custom_height: 640,
        };
        assert!(preferences.save(&store).is_ok());
        let Ok(loaded) = HostPreferences::load(&store) else {
            panic!("preferences should load");
        };
        assert_eq!(loaded.editor_content, "<p>draft</p>");
        assert!(loaded.dark_mode && loaded.auto_preview && !loaded.block_network);
        assert_eq!(loaded.auto_preview_delay_ms, 1500);
        assert_eq!((loaded.custom_width, loaded.custom_height), (3000, 640));

        let _ = std::fs::remove_dir_all(&config.root);
    }
}
