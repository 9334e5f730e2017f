//! Active package resolution
//!
//! A shader selection, the persisted category, and the available-package
//! list can disagree (the backend's package set changes out from under the
//! panel). The precedence ladder here decides which package the panel scopes
//! itself to; an unavailable candidate falls back to the first available
//! package rather than failing.

use tracing::warn;

use crate::constants::packages::{DEFAULT_PACKAGE, SEPARATOR};
use crate::model::ShaderSelection;

/// Package a selection belongs to, by its path shape alone
///
/// A separator-prefixed path names its package; a flat path lives in the
/// root package; no selection implies no package.
pub fn package_of(selection: &ShaderSelection) -> Option<&str> {
    match selection {
        ShaderSelection::None => None,
        ShaderSelection::Path(path) => match path.split_once(SEPARATOR) {
            Some((package, _)) => Some(package),
            None => Some(DEFAULT_PACKAGE),
        },
    }
}

/// Resolve the active package; first match wins:
///
/// 1. selection `"Pack/foo.fx"` → `"Pack"`
/// 2. selection `"foo.fx"` → `"Default"`
/// 3. no selection → persisted category, or `"Default"` when unset
/// 4. candidate absent from `available` → first available package
pub fn resolve_active_package(
    selection: &ShaderSelection,
    persisted_category: Option<&str>,
    available: &[String],
) -> String {
    let candidate = match package_of(selection) {
        Some(package) => package,
        None => persisted_category
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or(DEFAULT_PACKAGE),
    };

    if available.iter().any(|p| p == candidate) {
        return candidate.to_string();
    }

    let fallback = available
        .first()
        .cloned()
        .unwrap_or_else(|| DEFAULT_PACKAGE.to_string());
    warn!(
        candidate,
        fallback = %fallback,
        "resolved package not in available list, falling back"
    );
    fallback
}
