//! Wire protocol for the backend bridge
//!
//! Every backend reply is the envelope `{success, result}`. A reply that is
//! not an object, or that lacks a `success` field, counts as failure; callers
//! must never read `result` without checking `success` first.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Backend method names
pub mod methods {
    pub const GET_MASTER_ENABLED: &str = "get_master_enabled";
    pub const SET_MASTER_ENABLED: &str = "set_master_enabled";
    pub const GET_CRASH_DETECTED: &str = "get_crash_detected";
    pub const SET_CURRENT_GAME_INFO: &str = "set_current_game_info";
    pub const GET_GAME_INFO: &str = "get_game_info";
    pub const SET_PER_GAME: &str = "set_per_game";
    pub const GET_SHADER_PACKAGES: &str = "get_shader_packages";
    pub const SET_ACTIVE_CATEGORY: &str = "set_active_category";
    pub const GET_SHADER_LIST: &str = "get_shader_list";
    pub const GET_SHADER_ENABLED: &str = "get_shader_enabled";
    pub const SET_SHADER_ENABLED: &str = "set_shader_enabled";
    pub const GET_CURRENT_SHADER: &str = "get_current_shader";
    pub const SET_SHADER: &str = "set_shader";
    pub const TOGGLE_SHADER: &str = "toggle_shader";
    pub const GET_SHADER_PARAMS: &str = "get_shader_params";
    pub const SET_SHADER_PARAM: &str = "set_shader_param";
    pub const RESET_SHADER_PARAMS: &str = "reset_shader_params";
    pub const APPLY_SHADER: &str = "apply_shader";
    pub const RESET_CONFIGURATION: &str = "reset_configuration";
    pub const RESET_RESHADE_DIRECTORY: &str = "reset_reshade_directory";
    pub const CLEANUP_LEGACY_FILES: &str = "cleanup_legacy_files";
}

/// Normalized backend reply
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub success: bool,
    pub result: Option<Value>,
}

impl Envelope {
    /// The failure envelope every error path collapses to
    pub fn failure() -> Self {
        Self {
            success: false,
            result: None,
        }
    }

    /// Decode a raw reply; a missing or non-true `success` is failure
    pub fn from_reply(reply: Value) -> Self {
        let Value::Object(mut map) = reply else {
            return Self::failure();
        };
        let success = matches!(map.get("success"), Some(Value::Bool(true)));
        if !success {
            return Self::failure();
        }
        Self {
            success: true,
            result: map.remove("result"),
        }
    }
}

/// Authoritative game resolution from `get_game_info`
///
/// The backend may coalesce to a platform-level pseudo-identifier when no
/// game is running.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GameInfo {
    #[serde(default)]
    pub appid: String,
    #[serde(default)]
    pub appname: String,
    #[serde(default)]
    pub per_game: bool,
    #[serde(default)]
    pub active_category: String,
}
