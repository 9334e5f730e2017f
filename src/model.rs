//! Core domain types
//!
//! The foreground-game context and the shader selection, plus the label
//! formatting shared by shader lists and parameter rows.

use serde::{Deserialize, Serialize};

use crate::constants::{context, packages, shader};

/// Foreground application as reported by the host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameContext {
    pub app_id: String,
    pub app_name: String,
}

impl GameContext {
    pub fn new(app_id: impl Into<String>, app_name: impl Into<String>) -> Self {
        Self {
            app_id: app_id.into(),
            app_name: app_name.into(),
        }
    }

    /// Sentinel context for "nothing is running"
    pub fn unknown() -> Self {
        Self::new(context::UNKNOWN, context::UNKNOWN)
    }
}

impl Default for GameContext {
    fn default() -> Self {
        Self::unknown()
    }
}

/// Current shader selection
///
/// The wire format is a plain string: a shader path, optionally prefixed
/// with its package ("Pack/film_grain.fx"), or one of the no-shader
/// sentinels. Every legacy spelling of "nothing selected" decodes to `None`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ShaderSelection {
    #[default]
    None,
    Path(String),
}

impl ShaderSelection {
    /// Decode a wire string; `"None"`, `"0"`, and the empty string all mean
    /// no selection
    pub fn from_wire(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty()
            || trimmed == shader::NONE_SENTINEL
            || trimmed == shader::LEGACY_NONE
        {
            ShaderSelection::None
        } else {
            ShaderSelection::Path(trimmed.to_string())
        }
    }

    /// Encode for the backend (`None` maps back to the `"None"` sentinel)
    pub fn to_wire(&self) -> &str {
        match self {
            ShaderSelection::None => shader::NONE_SENTINEL,
            ShaderSelection::Path(path) => path,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, ShaderSelection::None)
    }

    /// File name portion, without any package prefix
    pub fn file_name(&self) -> Option<&str> {
        match self {
            ShaderSelection::None => None,
            ShaderSelection::Path(path) => match path.split_once(packages::SEPARATOR) {
                Some((_, file)) => Some(file),
                None => Some(path),
            },
        }
    }

    /// Human-readable label for dropdowns ("No Shader" when empty)
    pub fn display_label(&self) -> String {
        match self.file_name() {
            Some(file) => format_display_name(file),
            None => shader::NO_SHADER_LABEL.to_string(),
        }
    }
}

impl Serialize for ShaderSelection {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.to_wire())
    }
}

impl<'de> Deserialize<'de> for ShaderSelection {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Ok(ShaderSelection::from_wire(&raw))
    }
}

/// Turn a shader or uniform name into a display label: strip a trailing
/// `.fx`, replace underscores with spaces, and drop a trailing `[Source]`
/// bracket group
pub fn format_display_name(name: &str) -> String {
    let mut base = name.trim();
    if base.to_ascii_lowercase().ends_with(shader::FX_EXTENSION) {
        base = &base[..base.len() - shader::FX_EXTENSION.len()];
    }

    let spaced = base.replace('_', " ");
    let mut label = spaced.trim_end();
    if label.ends_with(']') {
        if let Some(open) = label.rfind('[') {
            label = &label[..open];
        }
    }
    label.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selection_from_wire_sentinels() {
        assert_eq!(ShaderSelection::from_wire("None"), ShaderSelection::None);
        assert_eq!(ShaderSelection::from_wire("0"), ShaderSelection::None);
        assert_eq!(ShaderSelection::from_wire(""), ShaderSelection::None);
        assert_eq!(ShaderSelection::from_wire("  "), ShaderSelection::None);
        assert_eq!(
            ShaderSelection::from_wire("CRT.fx"),
            ShaderSelection::Path("CRT.fx".to_string())
        );
    }

    #[test]
    fn test_selection_wire_round_trip() {
        let selection = ShaderSelection::from_wire("PackA/film_grain.fx");
        assert_eq!(selection.to_wire(), "PackA/film_grain.fx");
        assert_eq!(ShaderSelection::None.to_wire(), "None");
    }

    #[test]
    fn test_selection_file_name_strips_package() {
        let scoped = ShaderSelection::from_wire("PackA/film_grain.fx");
        assert_eq!(scoped.file_name(), Some("film_grain.fx"));

        let flat = ShaderSelection::from_wire("vibrance.fx");
        assert_eq!(flat.file_name(), Some("vibrance.fx"));

        assert_eq!(ShaderSelection::None.file_name(), None);
    }

    #[test]
    fn test_selection_display_label() {
        assert_eq!(ShaderSelection::None.display_label(), "No Shader");
        assert_eq!(
            ShaderSelection::from_wire("PackA/film_grain.fx").display_label(),
            "film grain"
        );
    }

    #[test]
    fn test_format_display_name_rules() {
        assert_eq!(format_display_name("film_grain.fx"), "film grain");
        assert_eq!(format_display_name("CRT.FX"), "CRT");
        assert_eq!(format_display_name("Strength [FakeHDR]"), "Strength");
        // Only the trailing bracket group is dropped
        assert_eq!(format_display_name("a [b] [c]"), "a [b]");
        assert_eq!(format_display_name("  padded_name  "), "padded name");
    }

    #[test]
    fn test_selection_serde_uses_wire_form() {
        let json = serde_json::to_string(&ShaderSelection::None).unwrap();
        assert_eq!(json, "\"None\"");

        let decoded: ShaderSelection = serde_json::from_str("\"0\"").unwrap();
        assert_eq!(decoded, ShaderSelection::None);

        let decoded: ShaderSelection = serde_json::from_str("\"PackB/glow.fx\"").unwrap();
        assert_eq!(decoded, ShaderSelection::Path("PackB/glow.fx".to_string()));
    }
}
