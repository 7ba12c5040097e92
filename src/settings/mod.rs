mod models;
mod storage;

pub use models::*;
pub use storage::{SettingsStore, SETTINGS_FILE};
