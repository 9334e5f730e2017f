//! Backend bridge: the transport seam and the typed call gateway
//!
//! `BackendBridge` is the one trait a host must implement to connect the
//! engine to its backend. `BackendGateway` wraps a bridge with envelope
//! normalization and a typed wrapper per backend method; it never retries —
//! callers decide between fallback and cached state.

use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::model::{GameContext, ShaderSelection};
use crate::params::{ParamValue, ShaderParam};

mod protocol;
pub use protocol::{Envelope, GameInfo, methods};

/// Asynchronous call-and-response transport to the backend
///
/// Implementations must return the raw reply object (the engine normalizes
/// the envelope) or an error for transport-level failures. Requests are
/// assumed reliable with bounded latency.
#[async_trait]
pub trait BackendBridge: Send + Sync + 'static {
    async fn call(&self, method: &str, args: Value) -> Result<Value>;
}

/// Adapt a plain closure into a `BackendBridge`
///
/// Handy for in-process backends and tests.
pub struct FnBridge<F> {
    handler: F,
}

impl<F> FnBridge<F>
where
    F: Fn(&str, Value) -> Result<Value> + Send + Sync + 'static,
{
    pub fn new(handler: F) -> Self {
        Self { handler }
    }
}

#[async_trait]
impl<F> BackendBridge for FnBridge<F>
where
    F: Fn(&str, Value) -> Result<Value> + Send + Sync + 'static,
{
    async fn call(&self, method: &str, args: Value) -> Result<Value> {
        (self.handler)(method, args)
    }
}

/// Typed call surface over a `BackendBridge`
#[derive(Clone)]
pub struct BackendGateway {
    bridge: Arc<dyn BackendBridge>,
}

impl BackendGateway {
    pub fn new(bridge: Arc<dyn BackendBridge>) -> Self {
        Self { bridge }
    }

    /// Raw call with envelope normalization; transport errors and malformed
    /// replies collapse to the failure envelope
    pub async fn call(&self, method: &str, args: Value) -> Envelope {
        match self.bridge.call(method, args).await {
            Ok(reply) => {
                let envelope = Envelope::from_reply(reply);
                if !envelope.success {
                    warn!(method, "backend reported failure");
                }
                envelope
            }
            Err(err) => {
                warn!(method, error = %err, "backend call failed");
                Envelope::failure()
            }
        }
    }

    /// Call expecting only the success flag back
    async fn call_ack(&self, method: &str, args: Value) -> Result<()> {
        let envelope = self.call(method, args).await;
        if envelope.success {
            Ok(())
        } else {
            Err(anyhow!("backend call {method} failed"))
        }
    }

    /// Call and decode `result` into `T`
    async fn call_decode<T>(&self, method: &str, args: Value) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        let envelope = self.call(method, args).await;
        if !envelope.success {
            return Err(anyhow!("backend call {method} failed"));
        }
        let result = envelope
            .result
            .with_context(|| format!("backend call {method} returned no result"))?;
        serde_json::from_value(result).with_context(|| format!("decoding {method} result"))
    }

    pub async fn get_master_enabled(&self) -> Result<bool> {
        self.call_decode(methods::GET_MASTER_ENABLED, json!({})).await
    }

    pub async fn set_master_enabled(&self, enabled: bool) -> Result<()> {
        self.call_ack(methods::SET_MASTER_ENABLED, json!({"enabled": enabled}))
            .await
    }

    pub async fn get_crash_detected(&self) -> Result<bool> {
        self.call_decode(methods::GET_CRASH_DETECTED, json!({})).await
    }

    pub async fn set_current_game_info(&self, context: &GameContext) -> Result<()> {
        self.call_ack(
            methods::SET_CURRENT_GAME_INFO,
            json!({"appid": context.app_id, "appname": context.app_name}),
        )
        .await
    }

    pub async fn get_game_info(&self) -> Result<GameInfo> {
        self.call_decode(methods::GET_GAME_INFO, json!({})).await
    }

    pub async fn set_per_game(&self, enabled: bool) -> Result<()> {
        self.call_ack(methods::SET_PER_GAME, json!({"enabled": enabled}))
            .await
    }

    pub async fn get_shader_packages(&self) -> Result<Vec<String>> {
        self.call_decode(methods::GET_SHADER_PACKAGES, json!({})).await
    }

    pub async fn set_active_category(&self, category: &str) -> Result<()> {
        self.call_ack(methods::SET_ACTIVE_CATEGORY, json!({"category": category}))
            .await
    }

    pub async fn get_shader_list(&self, category: Option<&str>) -> Result<Vec<String>> {
        let args = match category {
            Some(category) => json!({"category": category}),
            None => json!({}),
        };
        self.call_decode(methods::GET_SHADER_LIST, args).await
    }

    /// Tolerates both `true`/`false` and the legacy `"true"`/`"false"` strings
    pub async fn get_shader_enabled(&self) -> Result<bool> {
        let raw: Value = self.call_decode(methods::GET_SHADER_ENABLED, json!({})).await?;
        match raw {
            Value::Bool(b) => Ok(b),
            Value::String(s) if s == "true" => Ok(true),
            Value::String(s) if s == "false" => Ok(false),
            other => Err(anyhow!("unexpected get_shader_enabled reply: {other}")),
        }
    }

    pub async fn set_shader_enabled(&self, enabled: bool) -> Result<()> {
        self.call_ack(methods::SET_SHADER_ENABLED, json!({"isEnabled": enabled}))
            .await
    }

    pub async fn get_current_shader(&self) -> Result<ShaderSelection> {
        self.call_decode(methods::GET_CURRENT_SHADER, json!({})).await
    }

    pub async fn set_shader(&self, selection: &ShaderSelection) -> Result<()> {
        self.call_ack(methods::SET_SHADER, json!({"shader_name": selection.to_wire()}))
            .await
    }

    pub async fn toggle_shader(&self, selection: &ShaderSelection) -> Result<()> {
        self.call_ack(
            methods::TOGGLE_SHADER,
            json!({"shader_name": selection.to_wire()}),
        )
        .await
    }

    pub async fn get_shader_params(&self) -> Result<Vec<ShaderParam>> {
        let mut params: Vec<ShaderParam> =
            self.call_decode(methods::GET_SHADER_PARAMS, json!({})).await?;
        for param in &mut params {
            param.normalize();
        }
        Ok(params)
    }

    pub async fn set_shader_param(&self, name: &str, value: &ParamValue) -> Result<()> {
        self.call_ack(
            methods::SET_SHADER_PARAM,
            json!({"name": name, "value": value.to_wire()}),
        )
        .await
    }

    pub async fn reset_shader_params(&self) -> Result<()> {
        self.call_ack(methods::RESET_SHADER_PARAMS, json!({})).await
    }

    /// The single idempotent action making pending backend state take effect
    pub async fn apply_shader(&self) -> Result<()> {
        let envelope = self.call(methods::APPLY_SHADER, json!({})).await;
        if !envelope.success {
            return Err(anyhow!("backend call apply_shader failed"));
        }
        // Older backends echo the applied effect back; nothing depends on it
        if let Some(effect) = envelope.result.as_ref().and_then(|r| r.get("effect")) {
            debug!(effect = %effect, "apply_shader legacy reply");
        }
        Ok(())
    }

    pub async fn reset_configuration(&self) -> Result<()> {
        self.call_ack(methods::RESET_CONFIGURATION, json!({})).await
    }

    pub async fn reset_reshade_directory(&self) -> Result<()> {
        self.call_ack(methods::RESET_RESHADE_DIRECTORY, json!({})).await
    }

    pub async fn cleanup_legacy_files(&self) -> Result<()> {
        self.call_ack(methods::CLEANUP_LEGACY_FILES, json!({})).await
    }
}
