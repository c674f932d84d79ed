//! # Config Commands
//!
//! Retrieving the clinic configuration.

use tracing::debug;

use crate::state::ConfigState;

/// Gets the current clinic configuration.
///
/// ## When Used
/// - App startup (clinic name in the header)
/// - Currency formatting
/// - Low-stock badge threshold
pub fn get_config(config: &ConfigState) -> ConfigState {
    debug!("get_config command");
    config.clone()
}
