//! Published panel state
//!
//! One snapshot struct carries everything the rendering layer needs. The
//! controller replaces the whole value through a watch channel after every
//! mutation step, so readers never see a half-updated view.

use serde::Serialize;

use crate::constants::packages::DEFAULT_PACKAGE;
use crate::model::{GameContext, ShaderSelection};
use crate::params::ShaderParam;

#[derive(Debug, Clone, Serialize)]
pub struct PanelState {
    /// Global kill switch; off means nothing is applied
    pub master_enabled: bool,
    /// Backend-reported crash condition; renders a non-dismissible warning
    pub crash_detected: bool,
    /// Per-shader enablement for the current selection
    pub shaders_enabled: bool,
    /// Profile follows the foreground game instead of the global profile
    pub per_game: bool,
    /// Backend-resolved foreground game
    pub game: GameContext,
    /// Available shader packages (cache of the backend list)
    pub packages: Vec<String>,
    /// Package the shader list is scoped to
    pub active_package: String,
    pub selection: ShaderSelection,
    /// Shaders in the active package
    pub shader_list: Vec<String>,
    pub params: Vec<ShaderParam>,
    /// Force-apply lockout currently running
    pub apply_cooldown: bool,
    /// Monotonic resync counter; lets observers order refreshes
    pub sync_seq: u64,
}

impl Default for PanelState {
    fn default() -> Self {
        Self {
            master_enabled: false,
            crash_detected: false,
            shaders_enabled: false,
            per_game: false,
            game: GameContext::unknown(),
            packages: vec![DEFAULT_PACKAGE.to_string()],
            active_package: DEFAULT_PACKAGE.to_string(),
            selection: ShaderSelection::None,
            shader_list: Vec::new(),
            params: Vec::new(),
            apply_cooldown: false,
            sync_seq: 0,
        }
    }
}

impl PanelState {
    pub fn param(&self, name: &str) -> Option<&ShaderParam> {
        self.params.iter().find(|p| p.name == name)
    }

    pub fn param_mut(&mut self, name: &str) -> Option<&mut ShaderParam> {
        self.params.iter_mut().find(|p| p.name == name)
    }

    /// Whether the force-apply action is currently actionable
    pub fn force_apply_enabled(&self) -> bool {
        self.master_enabled && !self.apply_cooldown && !self.selection.is_none()
    }

    /// Dropdown label for the current selection
    pub fn selection_label(&self) -> String {
        self.selection.display_label()
    }
}
