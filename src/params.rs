//! Shader parameter model
//!
//! Parameters arrive from the backend as loose JSON objects with flat `ui_*`
//! annotation keys. The kind tag is a closed sum so renderers can match
//! exhaustively; decoded values whose JSON type disagrees with the declared
//! kind are coerced with a warning rather than rejected.
//!
//! Optimistic edits are two-phase: `value` is the last backend-confirmed
//! value and `pending` an uncommitted edit. `effective()` is what the UI
//! shows.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::constants::sliders;
use crate::model::format_display_name;
use crate::quantize;

/// Declared parameter kind (the wire `type` tag)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamKind {
    Bool,
    Int,
    Float,
}

/// A parameter value matching one of the kinds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    Float(f64),
}

impl ParamValue {
    pub fn kind(&self) -> ParamKind {
        match self {
            ParamValue::Bool(_) => ParamKind::Bool,
            ParamValue::Int(_) => ParamKind::Int,
            ParamValue::Float(_) => ParamKind::Float,
        }
    }

    /// Numeric view for slider math; `None` for booleans
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParamValue::Bool(_) => None,
            ParamValue::Int(i) => Some(*i as f64),
            ParamValue::Float(f) => Some(*f),
        }
    }

    /// Zero value for a kind, used when nothing better is known
    pub fn zero(kind: ParamKind) -> Self {
        match kind {
            ParamKind::Bool => ParamValue::Bool(false),
            ParamKind::Int => ParamValue::Int(0),
            ParamKind::Float => ParamValue::Float(0.0),
        }
    }

    /// Coerce this value to the declared kind
    ///
    /// Floats accept ints (widening), ints truncate stray floats, bools
    /// accept only bools. A mismatch that cannot be bridged falls back to
    /// the kind's zero value.
    pub fn coerce_to(self, kind: ParamKind) -> Self {
        if self.kind() == kind {
            return self;
        }
        match (kind, &self) {
            (ParamKind::Float, ParamValue::Int(i)) => ParamValue::Float(*i as f64),
            (ParamKind::Int, ParamValue::Float(f)) => {
                warn!(value = *f, "truncating float value for int parameter");
                ParamValue::Int(*f as i64)
            }
            _ => {
                warn!(got = ?self.kind(), expected = ?kind, "parameter value kind mismatch, using zero");
                ParamValue::zero(kind)
            }
        }
    }

    /// Wire form for `set_shader_param`
    pub fn to_wire(&self) -> Value {
        match self {
            ParamValue::Bool(b) => Value::from(*b),
            ParamValue::Int(i) => Value::from(*i),
            ParamValue::Float(f) => Value::from(*f),
        }
    }
}

/// Slider/combo annotations extracted from the shader source
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParamUi {
    #[serde(rename = "ui_min", default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(rename = "ui_max", default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(rename = "ui_step", default, skip_serializing_if = "Option::is_none")]
    pub step: Option<f64>,
    #[serde(rename = "ui_label", default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Combo choices; present only on int parameters rendered as dropdowns
    #[serde(rename = "ui_items", default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Vec<String>>,
}

impl ParamUi {
    pub fn slider_min(&self) -> f64 {
        self.min.unwrap_or(sliders::DEFAULT_MIN)
    }

    pub fn slider_max(&self) -> f64 {
        self.max.unwrap_or(sliders::DEFAULT_MAX)
    }

    pub fn slider_step(&self) -> f64 {
        self.step.unwrap_or(sliders::DEFAULT_STEP)
    }
}

/// One shader uniform as shown in the panel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShaderParam {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ParamKind,
    /// Last backend-confirmed value
    pub value: ParamValue,
    pub default: ParamValue,
    #[serde(flatten)]
    pub ui: ParamUi,
    /// Optimistic edit not yet confirmed by the backend
    #[serde(skip)]
    pub pending: Option<ParamValue>,
}

impl ShaderParam {
    /// Align decoded values with the declared kind (backends send loose JSON)
    pub fn normalize(&mut self) {
        self.value = self.value.clone().coerce_to(self.kind);
        self.default = self.default.clone().coerce_to(self.kind);
    }

    /// The value the UI should render: the uncommitted edit if one exists
    pub fn effective(&self) -> &ParamValue {
        self.pending.as_ref().unwrap_or(&self.value)
    }

    /// Record an optimistic edit
    pub fn set_pending(&mut self, value: ParamValue) {
        self.pending = Some(value.coerce_to(self.kind));
    }

    /// Fold a confirmed commit into the cached value
    ///
    /// The pending slot is cleared only when it still holds the committed
    /// value; a newer edit stays pending for its own commit.
    pub fn confirm(&mut self, committed: ParamValue) {
        self.value = committed;
        if self.pending.as_ref() == Some(&self.value) {
            self.pending = None;
        }
    }

    /// Display label: the `ui_label` annotation, else the prettified name
    pub fn label(&self) -> String {
        match &self.ui.label {
            Some(label) => format_display_name(label),
            None => format_display_name(&self.name),
        }
    }

    /// Int parameter with combo choices
    pub fn is_combo(&self) -> bool {
        self.kind == ParamKind::Int && self.ui.items.as_ref().is_some_and(|i| !i.is_empty())
    }

    /// Slider position for the effective value
    pub fn current_tick(&self) -> i64 {
        let value = self.effective().as_f64().unwrap_or(0.0);
        quantize::to_tick(
            value,
            self.ui.slider_min(),
            self.ui.slider_max(),
            self.ui.slider_step(),
        )
    }

    /// Total slider positions for this parameter's range
    pub fn tick_count(&self) -> i64 {
        quantize::tick_count(
            self.ui.slider_min(),
            self.ui.slider_max(),
            self.ui.slider_step(),
        )
    }

    /// Value at a slider position, typed to the declared kind
    pub fn value_at_tick(&self, tick: i64) -> ParamValue {
        let value = quantize::from_tick(
            tick,
            self.ui.slider_min(),
            self.ui.slider_max(),
            self.ui.slider_step(),
        );
        match self.kind {
            ParamKind::Bool => ParamValue::Bool(value != 0.0),
            ParamKind::Int => ParamValue::Int(value.round() as i64),
            ParamKind::Float => ParamValue::Float(value),
        }
    }
}
