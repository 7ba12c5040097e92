use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};

use parley_lib::config::StoreConfig;
use parley_lib::conversations::ConversationStore;
use parley_lib::encryption::{ChaChaFieldCipher, FieldCipher};
use parley_lib::settings::SettingsStore;

/// Shared application state for CLI commands
pub struct App {
    pub settings: SettingsStore,
    pub conversations: ConversationStore,
}

impl App {
    /// Load configuration, acquire the master key and open both stores
    pub fn new(config_path: Option<&Path>, data_dir: Option<PathBuf>) -> Result<Self> {
        let mut config = StoreConfig::load(config_path).context("Failed to load configuration")?;
        if let Some(dir) = data_dir {
            config.storage.data_dir = Some(dir);
        }

        let data_dir = config.data_dir().context("Failed to get data directory")?;
        log::debug!("Using data directory {:?}", data_dir);

        let key = config
            .key
            .load()
            .context("Failed to load the master key")?;
        let cipher: Arc<dyn FieldCipher> = Arc::new(ChaChaFieldCipher::new(key));

        let settings = SettingsStore::new(config.settings_dir()?, Arc::clone(&cipher))
            .context("Failed to open settings")?;
        let conversations = ConversationStore::with_clock(
            config.conversations_dir()?,
            cipher,
            Arc::new(parley_lib::clock::SystemClock),
            config.cache_ttl(),
        )
        .context("Failed to open conversations")?
        .with_page_size(config.page_size());

        Ok(Self {
            settings,
            conversations,
        })
    }
}
