//! shadesync — client-side shader configuration synchronization
//!
//! Keeps an overlay panel's local view of "which shader, which parameters,
//! which profile, which package" consistent with state owned by an
//! out-of-process backend, reachable only through an asynchronous
//! call-and-response bridge.
//!
//! The host supplies two seams: [`BackendBridge`] (the transport) and
//! [`HostEnvironment`] (the foreground-app read, plus an optional lifecycle
//! event stream). Everything else lives here: the resync sequence, the
//! package precedence policy, debounced parameter commits, foreground
//! tracking, and graceful degradation when the backend fails or reports a
//! crash condition.
//!
//! ```no_run
//! # use std::sync::Arc;
//! # use shadesync::{FnBridge, GameContext, HostEnvironment, SyncEngine, SyncOptions};
//! # struct Host;
//! # impl HostEnvironment for Host {
//! #     fn foreground_app(&self) -> GameContext { GameContext::unknown() }
//! # }
//! # async fn demo(bridge: Arc<FnBridge<fn(&str, serde_json::Value) -> anyhow::Result<serde_json::Value>>>) {
//! let engine = SyncEngine::spawn(bridge, Arc::new(Host), SyncOptions::default(), None);
//! let handle = engine.handle();
//! let mut updates = handle.watch();
//! while updates.changed().await.is_ok() {
//!     let state = updates.borrow().clone();
//!     // hand the snapshot to the rendering layer
//! }
//! # }
//! ```

#![forbid(unsafe_code)]

pub mod bridge;
pub mod config;
pub mod constants;
pub mod controller;
pub mod debounce;
pub mod model;
pub mod packages;
pub mod params;
pub mod quantize;
pub mod state;
pub mod tracker;

pub use bridge::{BackendBridge, BackendGateway, Envelope, FnBridge, GameInfo};
pub use config::SyncOptions;
pub use controller::{SyncCommand, SyncEngine, SyncHandle};
pub use debounce::Debouncer;
pub use model::{GameContext, ShaderSelection, format_display_name};
pub use params::{ParamKind, ParamUi, ParamValue, ShaderParam};
pub use state::PanelState;
pub use tracker::{
    GameContextTracker, HostEnvironment, LifetimeEvent, TrackerPhase, TrackerRequest,
};
