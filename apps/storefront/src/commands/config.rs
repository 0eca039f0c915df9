//! # Config Commands

use tracing::debug;

use crate::state::ConfigState;

/// Gets the store settings (name, tax, shipping).
pub fn get_config(config: &ConfigState) -> ConfigState {
    debug!("get_config command");
    config.clone()
}
