//! The sync controller
//!
//! One actor task owns all mutable panel state. Commands arrive on a single
//! queue (from the rendering layer through `SyncHandle`, and from the
//! tracker) and are processed one at a time, so resyncs can never
//! interleave; redundant queued resyncs just re-run idempotent reads. The
//! state is published as whole `PanelState` snapshots over a watch channel.
//!
//! Every backend failure degrades to cached or default state. Partial data
//! beats a blocked panel; the next poll or resync is the self-healing
//! mechanism.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::bridge::{BackendBridge, BackendGateway};
use crate::config::SyncOptions;
use crate::constants::{engine, packages::DEFAULT_PACKAGE};
use crate::debounce::Debouncer;
use crate::model::{GameContext, ShaderSelection};
use crate::packages::resolve_active_package;
use crate::params::ParamValue;
use crate::state::PanelState;
use crate::tracker::{GameContextTracker, HostEnvironment, LifetimeEvent, TrackerRequest};

/// Everything the engine can be asked to do
#[derive(Debug, Clone)]
pub enum SyncCommand {
    /// Re-establish all cached state from the backend
    Resync,
    /// Re-read crash and master flags only
    FlagsRefresh,
    /// Report a foreground context to the backend
    ReportContext(GameContext),
    /// Optimistic parameter edit; the backend write is debounced
    EditParam { name: String, value: ParamValue },
    /// Outcome of a debounced parameter commit (internal)
    CommitResult {
        name: String,
        value: ParamValue,
        committed: bool,
    },
    ApplyShader,
    /// Apply with a client-side cooldown lockout
    ForceApply,
    /// Cooldown timer expiry (internal)
    CooldownElapsed,
    SetMasterEnabled(bool),
    SetShadersEnabled(bool),
    SelectShader(ShaderSelection),
    SwitchPackage(String),
    SetPerGame(bool),
    ResetParams,
    ResetConfiguration,
    ResetReshadeDirectory,
    CleanupLegacyFiles,
    SetPanelVisible(bool),
    Shutdown,
}

/// Clonable command surface handed to the rendering layer
#[derive(Clone)]
pub struct SyncHandle {
    commands: mpsc::Sender<SyncCommand>,
    snapshot: watch::Receiver<PanelState>,
}

impl SyncHandle {
    /// Current state snapshot
    pub fn snapshot(&self) -> PanelState {
        self.snapshot.borrow().clone()
    }

    /// Subscribe to snapshot updates
    pub fn watch(&self) -> watch::Receiver<PanelState> {
        self.snapshot.clone()
    }

    pub async fn send(&self, command: SyncCommand) {
        if self.commands.send(command).await.is_err() {
            warn!("sync engine stopped, command dropped");
        }
    }

    pub async fn resync(&self) {
        self.send(SyncCommand::Resync).await;
    }

    pub async fn edit_param(&self, name: impl Into<String>, value: ParamValue) {
        self.send(SyncCommand::EditParam {
            name: name.into(),
            value,
        })
        .await;
    }

    pub async fn apply_shader(&self) {
        self.send(SyncCommand::ApplyShader).await;
    }

    pub async fn force_apply(&self) {
        self.send(SyncCommand::ForceApply).await;
    }

    pub async fn set_master_enabled(&self, enabled: bool) {
        self.send(SyncCommand::SetMasterEnabled(enabled)).await;
    }

    pub async fn set_shaders_enabled(&self, enabled: bool) {
        self.send(SyncCommand::SetShadersEnabled(enabled)).await;
    }

    pub async fn select_shader(&self, selection: ShaderSelection) {
        self.send(SyncCommand::SelectShader(selection)).await;
    }

    pub async fn switch_package(&self, package: impl Into<String>) {
        self.send(SyncCommand::SwitchPackage(package.into())).await;
    }

    pub async fn set_per_game(&self, enabled: bool) {
        self.send(SyncCommand::SetPerGame(enabled)).await;
    }

    pub async fn reset_params(&self) {
        self.send(SyncCommand::ResetParams).await;
    }

    pub async fn set_panel_visible(&self, visible: bool) {
        self.send(SyncCommand::SetPanelVisible(visible)).await;
    }
}

/// Owner of the controller task; dropping it aborts the engine as a last
/// resort, `shutdown()` is the orderly path
pub struct SyncEngine {
    handle: SyncHandle,
    worker: JoinHandle<()>,
}

impl SyncEngine {
    /// Spawn the engine: tracker, forwarder, and the controller actor.
    /// Supplying `lifecycle` selects the event-driven context strategy;
    /// `None` selects the polling fallback.
    pub fn spawn(
        bridge: Arc<dyn BackendBridge>,
        host: Arc<dyn HostEnvironment>,
        options: SyncOptions,
        lifecycle: Option<mpsc::Receiver<LifetimeEvent>>,
    ) -> Self {
        let options = options.normalized();
        let (command_tx, command_rx) = mpsc::channel(engine::COMMAND_BUFFER);
        let (snapshot_tx, snapshot_rx) = watch::channel(PanelState::default());
        let (visible_tx, visible_rx) = watch::channel(false);
        let (request_tx, mut request_rx) = mpsc::channel(engine::COMMAND_BUFFER);

        let tracker = GameContextTracker::spawn(
            Arc::clone(&host),
            &options,
            lifecycle,
            request_tx,
            visible_rx,
        );

        // Tracker requests are ordinary commands; arrival order is the only
        // ordering between them and user actions
        let forwarder = tokio::spawn({
            let commands = command_tx.clone();
            async move {
                while let Some(request) = request_rx.recv().await {
                    let command = match request {
                        TrackerRequest::ReportContext(context) => {
                            SyncCommand::ReportContext(context)
                        }
                        TrackerRequest::FullResync => SyncCommand::Resync,
                        TrackerRequest::FlagsRefresh => SyncCommand::FlagsRefresh,
                    };
                    if commands.send(command).await.is_err() {
                        break;
                    }
                }
            }
        });

        let controller = Controller {
            gateway: BackendGateway::new(bridge),
            host,
            options,
            debouncer: Debouncer::new(),
            state: PanelState::default(),
            snapshot: snapshot_tx,
            commands: command_tx.clone(),
            visible: visible_tx,
            persisted_category: None,
            cooldown_timer: None,
            tracker,
            forwarder,
        };
        let worker = tokio::spawn(controller.run(command_rx));

        Self {
            handle: SyncHandle {
                commands: command_tx,
                snapshot: snapshot_rx,
            },
            worker,
        }
    }

    pub fn handle(&self) -> SyncHandle {
        self.handle.clone()
    }

    /// Orderly teardown: cancels every timer, stops the tracker, and waits
    /// for the controller task to exit
    pub async fn shutdown(mut self) {
        let _ = self.handle.commands.send(SyncCommand::Shutdown).await;
        let _ = (&mut self.worker).await;
    }
}

impl Drop for SyncEngine {
    fn drop(&mut self) {
        self.worker.abort();
    }
}

struct Controller {
    gateway: BackendGateway,
    host: Arc<dyn HostEnvironment>,
    options: SyncOptions,
    debouncer: Debouncer,
    state: PanelState,
    snapshot: watch::Sender<PanelState>,
    /// Loops back debounce commits and cooldown expiry into the queue
    commands: mpsc::Sender<SyncCommand>,
    visible: watch::Sender<bool>,
    /// Last `active_category` the backend reported
    persisted_category: Option<String>,
    cooldown_timer: Option<JoinHandle<()>>,
    tracker: GameContextTracker,
    forwarder: JoinHandle<()>,
}

impl Controller {
    async fn run(mut self, mut commands: mpsc::Receiver<SyncCommand>) {
        self.resync().await;
        while let Some(command) = commands.recv().await {
            if !self.dispatch(command).await {
                break;
            }
        }
    }

    /// Returns false when the engine should stop
    async fn dispatch(&mut self, command: SyncCommand) -> bool {
        match command {
            SyncCommand::Resync => self.resync().await,
            SyncCommand::FlagsRefresh => self.flags_refresh().await,
            SyncCommand::ReportContext(context) => self.report_context(context).await,
            SyncCommand::EditParam { name, value } => self.edit_param(name, value),
            SyncCommand::CommitResult {
                name,
                value,
                committed,
            } => self.commit_result(&name, value, committed),
            SyncCommand::ApplyShader => self.apply_shader().await,
            SyncCommand::ForceApply => self.force_apply().await,
            SyncCommand::CooldownElapsed => {
                self.state.apply_cooldown = false;
                self.publish();
            }
            SyncCommand::SetMasterEnabled(enabled) => self.set_master_enabled(enabled).await,
            SyncCommand::SetShadersEnabled(enabled) => self.set_shaders_enabled(enabled).await,
            SyncCommand::SelectShader(selection) => self.select_shader(selection).await,
            SyncCommand::SwitchPackage(package) => self.switch_package(package).await,
            SyncCommand::SetPerGame(enabled) => self.set_per_game(enabled).await,
            SyncCommand::ResetParams => self.reset_params().await,
            SyncCommand::ResetConfiguration => {
                if let Err(err) = self.gateway.reset_configuration().await {
                    warn!(error = %err, "configuration reset failed");
                }
                self.resync().await;
            }
            SyncCommand::ResetReshadeDirectory => {
                if let Err(err) = self.gateway.reset_reshade_directory().await {
                    warn!(error = %err, "directory reset failed");
                }
                self.resync().await;
            }
            SyncCommand::CleanupLegacyFiles => {
                if let Err(err) = self.gateway.cleanup_legacy_files().await {
                    warn!(error = %err, "legacy cleanup failed");
                }
            }
            SyncCommand::SetPanelVisible(visible) => {
                self.visible.send_replace(visible);
            }
            SyncCommand::Shutdown => {
                self.teardown();
                return false;
            }
        }
        true
    }

    fn publish(&self) {
        self.snapshot.send_replace(self.state.clone());
    }

    /// The full ordered read sequence re-establishing cached state.
    /// Steps are strictly sequential; each failure keeps cached state or a
    /// default and never aborts the steps after it.
    async fn resync(&mut self) {
        debug!("resync started");

        // 1. flags
        match self.gateway.get_crash_detected().await {
            Ok(crash) => self.state.crash_detected = crash,
            Err(err) => warn!(error = %err, "keeping cached crash flag"),
        }
        match self.gateway.get_master_enabled().await {
            Ok(enabled) => self.state.master_enabled = enabled,
            Err(err) => warn!(error = %err, "keeping cached master switch"),
        }
        self.publish();

        // 2. report the host's view of the foreground app
        let context = self.host.foreground_app();
        if let Err(err) = self.gateway.set_current_game_info(&context).await {
            warn!(error = %err, "failed to report game context");
        }
        self.state.game = context;

        // 3. the backend's authoritative resolution wins over the host read
        match self.gateway.get_game_info().await {
            Ok(info) => {
                self.state.game = GameContext::new(info.appid, info.appname);
                self.state.per_game = info.per_game;
                if !info.active_category.trim().is_empty() {
                    self.persisted_category = Some(info.active_category);
                }
            }
            Err(err) => warn!(error = %err, "keeping cached game info"),
        }
        self.publish();

        // 4. packages; an empty list is as useless as a failed fetch
        self.state.packages = match self.gateway.get_shader_packages().await {
            Ok(packages) if !packages.is_empty() => packages,
            Ok(_) => {
                warn!("backend returned no packages, using default");
                vec![DEFAULT_PACKAGE.to_string()]
            }
            Err(err) => {
                warn!(error = %err, "package fetch failed, using default");
                vec![DEFAULT_PACKAGE.to_string()]
            }
        };

        // 5. selection (legacy sentinels normalize in decode)
        match self.gateway.get_current_shader().await {
            Ok(selection) => self.state.selection = selection,
            Err(err) => warn!(error = %err, "keeping cached selection"),
        }
        match self.gateway.get_shader_enabled().await {
            Ok(enabled) => self.state.shaders_enabled = enabled,
            Err(err) => warn!(error = %err, "keeping cached shader enablement"),
        }

        // 6. precedence: selection path > persisted category > default
        self.state.active_package = resolve_active_package(
            &self.state.selection,
            self.persisted_category.as_deref(),
            &self.state.packages,
        );
        self.publish();

        // 7. shader list scoped to the resolved package
        match self
            .gateway
            .get_shader_list(Some(&self.state.active_package))
            .await
        {
            Ok(list) => self.state.shader_list = list,
            Err(err) => warn!(error = %err, "keeping cached shader list"),
        }

        // 8. parameters; uncommitted edits survive the refresh
        self.refresh_params(true).await;

        self.state.sync_seq += 1;
        self.publish();
        info!(
            seq = self.state.sync_seq,
            package = %self.state.active_package,
            shader = %self.state.selection.to_wire(),
            "resync complete"
        );
    }

    /// Lightweight crash + master re-read between full resyncs
    async fn flags_refresh(&mut self) {
        match self.gateway.get_crash_detected().await {
            Ok(crash) => self.state.crash_detected = crash,
            Err(err) => warn!(error = %err, "keeping cached crash flag"),
        }
        match self.gateway.get_master_enabled().await {
            Ok(enabled) => self.state.master_enabled = enabled,
            Err(err) => warn!(error = %err, "keeping cached master switch"),
        }
        self.publish();
    }

    async fn report_context(&mut self, context: GameContext) {
        if let Err(err) = self.gateway.set_current_game_info(&context).await {
            warn!(app_id = %context.app_id, error = %err, "failed to report game context");
        }
    }

    async fn refresh_params(&mut self, carry_pending: bool) {
        if self.state.selection.is_none() {
            self.state.params.clear();
            return;
        }
        let previous = std::mem::take(&mut self.state.params);
        self.state.params = match self.gateway.get_shader_params().await {
            Ok(mut params) => {
                if carry_pending {
                    for param in &mut params {
                        if let Some(old) = previous.iter().find(|p| p.name == param.name) {
                            param.pending = old.pending.clone();
                        }
                    }
                }
                params
            }
            Err(err) => {
                warn!(error = %err, "parameter fetch failed, clearing list");
                Vec::new()
            }
        };
    }

    /// Optimistic local update now; backend write + re-apply after the
    /// debounce settles
    fn edit_param(&mut self, name: String, value: ParamValue) {
        let Some(param) = self.state.param_mut(&name) else {
            warn!(param = %name, "edit for unknown parameter ignored");
            return;
        };
        param.set_pending(value);
        let value = param.effective().clone();
        self.publish();

        let gateway = self.gateway.clone();
        let commands = self.commands.clone();
        let key = name.clone();
        self.debouncer
            .schedule(&key, self.options.param_debounce(), async move {
                let committed = match gateway.set_shader_param(&name, &value).await {
                    Ok(()) => {
                        if let Err(err) = gateway.apply_shader().await {
                            warn!(error = %err, "apply after parameter commit failed");
                        }
                        true
                    }
                    Err(err) => {
                        warn!(
                            param = %name,
                            error = %err,
                            "parameter commit failed, keeping optimistic value"
                        );
                        false
                    }
                };
                let _ = commands
                    .send(SyncCommand::CommitResult {
                        name,
                        value,
                        committed,
                    })
                    .await;
            });
    }

    fn commit_result(&mut self, name: &str, value: ParamValue, committed: bool) {
        let Some(param) = self.state.param_mut(name) else {
            return;
        };
        if committed {
            param.confirm(value);
            self.publish();
        }
        // A failed commit keeps the optimistic value; the next resync
        // restores authority
    }

    async fn apply_shader(&mut self) {
        if let Err(err) = self.gateway.apply_shader().await {
            warn!(error = %err, "apply failed");
        }
    }

    async fn force_apply(&mut self) {
        if !self.state.force_apply_enabled() {
            debug!("force apply unavailable, ignoring");
            return;
        }
        self.apply_shader().await;
        self.state.apply_cooldown = true;
        self.publish();

        if let Some(old) = self.cooldown_timer.take() {
            old.abort();
        }
        let commands = self.commands.clone();
        let cooldown = self.options.apply_cooldown();
        self.cooldown_timer = Some(tokio::spawn(async move {
            tokio::time::sleep(cooldown).await;
            let _ = commands.send(SyncCommand::CooldownElapsed).await;
        }));
    }

    async fn set_master_enabled(&mut self, enabled: bool) {
        self.state.master_enabled = enabled;
        // Re-enabling is the one user action allowed to clear the crash
        // flag before backend confirmation
        if enabled && self.state.crash_detected {
            self.state.crash_detected = false;
        }
        self.publish();
        if let Err(err) = self.gateway.set_master_enabled(enabled).await {
            warn!(error = %err, "master switch persist failed, next poll corrects drift");
        }
    }

    async fn set_shaders_enabled(&mut self, enabled: bool) {
        self.state.shaders_enabled = enabled;
        self.publish();
        if let Err(err) = self.gateway.set_shader_enabled(enabled).await {
            warn!(error = %err, "shader enablement persist failed");
        }
        let target = if enabled {
            self.state.selection.clone()
        } else {
            ShaderSelection::None
        };
        if let Err(err) = self.gateway.toggle_shader(&target).await {
            warn!(error = %err, "shader toggle failed");
        }
    }

    async fn select_shader(&mut self, selection: ShaderSelection) {
        self.state.selection = selection;
        self.publish();
        if let Err(err) = self.gateway.set_shader(&self.state.selection).await {
            warn!(error = %err, "selection persist failed");
        }
        self.refresh_params(false).await;
        self.publish();
    }

    /// Switching collections invalidates both the shown shader and any
    /// parameter UI bound to it; stale controls must never survive
    async fn switch_package(&mut self, package: String) {
        if package == self.state.active_package {
            return;
        }
        if let Err(err) = self.gateway.set_active_category(&package).await {
            warn!(category = %package, error = %err, "category persist failed");
        }
        self.persisted_category = Some(package.clone());
        self.state.active_package = package;

        self.state.shader_list = match self
            .gateway
            .get_shader_list(Some(&self.state.active_package))
            .await
        {
            Ok(list) => list,
            Err(err) => {
                warn!(error = %err, "shader list fetch failed, showing empty list");
                Vec::new()
            }
        };

        self.state.selection = ShaderSelection::None;
        if let Err(err) = self.gateway.set_shader(&ShaderSelection::None).await {
            warn!(error = %err, "selection reset failed");
        }
        self.state.params.clear();
        self.publish();
    }

    async fn set_per_game(&mut self, enabled: bool) {
        self.state.per_game = enabled;
        self.publish();
        if let Err(err) = self.gateway.set_per_game(enabled).await {
            warn!(error = %err, "per-game persist failed");
        }
        // The effective profile changed under us
        self.resync().await;
    }

    async fn reset_params(&mut self) {
        // Outstanding debounced edits would re-commit values the reset just
        // discarded
        self.debouncer.cancel_all();
        if let Err(err) = self.gateway.reset_shader_params().await {
            warn!(error = %err, "parameter reset failed");
        }
        self.refresh_params(false).await;
        self.publish();
        self.apply_shader().await;
    }

    fn teardown(&mut self) {
        info!("sync engine stopping");
        self.debouncer.cancel_all();
        if let Some(timer) = self.cooldown_timer.take() {
            timer.abort();
        }
        self.tracker.stop();
        self.forwarder.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::FnBridge;
    use crate::params::ParamKind;
    use anyhow::anyhow;
    use serde_json::{Value, json};
    use std::collections::HashSet;
    use std::sync::Mutex as StdMutex;
    use std::time::Duration;
    use tokio::time::advance;

    type CallLog = Arc<StdMutex<Vec<(String, Value)>>>;

    struct StubHost {
        context: StdMutex<GameContext>,
    }

    impl StubHost {
        fn new(app_id: &str, app_name: &str) -> Arc<Self> {
            Arc::new(Self {
                context: StdMutex::new(GameContext::new(app_id, app_name)),
            })
        }
    }

    impl HostEnvironment for StubHost {
        fn foreground_app(&self) -> GameContext {
            self.context.lock().unwrap().clone()
        }
    }

    /// Scripted backend: answers getters from a fixed table, acks setters,
    /// fails any method listed in `failing`
    struct Scripted {
        current_shader: &'static str,
        packages: Vec<&'static str>,
        crash: bool,
        failing: HashSet<&'static str>,
    }

    impl Default for Scripted {
        fn default() -> Self {
            Self {
                current_shader: "CRT.fx",
                packages: vec!["Default", "PackA"],
                crash: false,
                failing: HashSet::new(),
            }
        }
    }

    fn spawn_engine(script: Scripted, host: Arc<StubHost>) -> (SyncEngine, CallLog) {
        let log: CallLog = Arc::new(StdMutex::new(Vec::new()));
        let bridge = {
            let log = Arc::clone(&log);
            FnBridge::new(move |method: &str, args: Value| {
                log.lock().unwrap().push((method.to_string(), args));
                if script.failing.contains(method) {
                    return Err(anyhow!("scripted failure"));
                }
                let result = match method {
                    "get_master_enabled" => json!(true),
                    "get_crash_detected" => json!(script.crash),
                    "get_game_info" => json!({
                        "appid": "730",
                        "appname": "CS2",
                        "per_game": false,
                        "active_category": "Default"
                    }),
                    "get_shader_packages" => json!(script.packages),
                    "get_current_shader" => json!(script.current_shader),
                    "get_shader_enabled" => json!(true),
                    "get_shader_list" => json!(["CRT.fx", "film_grain.fx"]),
                    "get_shader_params" => json!([
                        {"name": "intensity", "type": "float", "value": 1.0, "default": 1.0,
                         "ui_min": 0.0, "ui_max": 2.0, "ui_step": 0.01}
                    ]),
                    _ => return Ok(json!({"success": true})),
                };
                Ok(json!({"success": true, "result": result}))
            })
        };
        let engine = SyncEngine::spawn(
            Arc::new(bridge),
            host,
            SyncOptions::default(),
            None,
        );
        (engine, log)
    }

    async fn settle() {
        for _ in 0..64 {
            tokio::task::yield_now().await;
        }
    }

    fn methods(log: &CallLog) -> Vec<String> {
        log.lock().unwrap().iter().map(|(m, _)| m.clone()).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_initial_resync_call_order() {
        let (engine, log) = spawn_engine(Scripted::default(), StubHost::new("730", "CS2"));
        settle().await;

        let calls = methods(&log);
        let expected = [
            "get_crash_detected",
            "get_master_enabled",
            "set_current_game_info",
            "get_game_info",
            "get_shader_packages",
            "get_current_shader",
            "get_shader_enabled",
            "get_shader_list",
            "get_shader_params",
        ];
        assert_eq!(&calls[..expected.len()], expected);

        let state = engine.handle().snapshot();
        assert_eq!(state.sync_seq, 1);
        assert_eq!(state.game, GameContext::new("730", "CS2"));
        assert_eq!(state.shader_list, vec!["CRT.fx", "film_grain.fx"]);
        assert_eq!(state.params.len(), 1);
        engine.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_package_failure_degrades_to_default() {
        let script = Scripted {
            failing: HashSet::from(["get_shader_packages"]),
            ..Scripted::default()
        };
        let (engine, _log) = spawn_engine(script, StubHost::new("730", "CS2"));
        settle().await;

        let state = engine.handle().snapshot();
        // Resync completed anyway
        assert_eq!(state.sync_seq, 1);
        assert_eq!(state.packages, vec!["Default"]);
        assert_eq!(state.active_package, "Default");
        assert!(!state.params.is_empty());
        engine.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_legacy_zero_selection_normalizes_everywhere() {
        let script = Scripted {
            current_shader: "0",
            ..Scripted::default()
        };
        let (engine, log) = spawn_engine(script, StubHost::new("730", "CS2"));
        settle().await;

        let state = engine.handle().snapshot();
        assert!(state.selection.is_none());
        assert_eq!(state.selection_label(), "No Shader");
        assert!(state.params.is_empty());
        assert!(!state.force_apply_enabled());
        // No parameter fetch for an empty selection
        assert!(!methods(&log).contains(&"get_shader_params".to_string()));
        engine.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_scoped_selection_resolves_its_package() {
        let script = Scripted {
            current_shader: "PackA/glow.fx",
            ..Scripted::default()
        };
        let (engine, log) = spawn_engine(script, StubHost::new("730", "CS2"));
        settle().await;

        let state = engine.handle().snapshot();
        assert_eq!(state.active_package, "PackA");
        let list_args = log
            .lock()
            .unwrap()
            .iter()
            .find(|(m, _)| m == "get_shader_list")
            .map(|(_, a)| a.clone())
            .unwrap();
        assert_eq!(list_args, json!({"category": "PackA"}));
        engine.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_enabling_master_clears_crash_optimistically() {
        let script = Scripted {
            crash: true,
            failing: HashSet::from(["set_master_enabled"]),
            ..Scripted::default()
        };
        let (engine, _log) = spawn_engine(script, StubHost::new("730", "CS2"));
        settle().await;
        assert!(engine.handle().snapshot().crash_detected);

        engine.handle().set_master_enabled(true).await;
        settle().await;

        let state = engine.handle().snapshot();
        // Cleared locally even though the backend persist failed
        assert!(!state.crash_detected);
        assert!(state.master_enabled);
        engine.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_switch_package_side_effects() {
        let (engine, log) = spawn_engine(Scripted::default(), StubHost::new("730", "CS2"));
        settle().await;
        log.lock().unwrap().clear();

        engine.handle().switch_package("PackC").await;
        settle().await;

        let calls = log.lock().unwrap().clone();
        let category = calls.iter().find(|(m, _)| m == "set_active_category");
        assert_eq!(category.unwrap().1, json!({"category": "PackC"}));
        let reset = calls.iter().find(|(m, _)| m == "set_shader");
        assert_eq!(reset.unwrap().1, json!({"shader_name": "None"}));

        let state = engine.handle().snapshot();
        assert_eq!(state.active_package, "PackC");
        assert!(state.selection.is_none());
        assert!(state.params.is_empty());
        engine.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_switch_package_list_failure_shows_empty_list() {
        let script = Scripted {
            failing: HashSet::from(["get_shader_list"]),
            ..Scripted::default()
        };
        let (engine, _log) = spawn_engine(script, StubHost::new("730", "CS2"));
        settle().await;

        engine.handle().switch_package("PackC").await;
        settle().await;

        // Unlike resync (which keeps the cached list), a package switch has
        // no valid cache to fall back to
        let state = engine.handle().snapshot();
        assert_eq!(state.active_package, "PackC");
        assert!(state.shader_list.is_empty());
        engine.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_resync_list_failure_keeps_cached_list() {
        let failing: Arc<StdMutex<HashSet<&'static str>>> =
            Arc::new(StdMutex::new(HashSet::new()));
        let bridge = {
            let failing = Arc::clone(&failing);
            FnBridge::new(move |method: &str, _args: Value| {
                if failing.lock().unwrap().contains(method) {
                    return Err(anyhow!("scripted failure"));
                }
                let result = match method {
                    "get_master_enabled" | "get_shader_enabled" => json!(true),
                    "get_crash_detected" => json!(false),
                    "get_game_info" => json!({
                        "appid": "730", "appname": "CS2",
                        "per_game": false, "active_category": "Default"
                    }),
                    "get_shader_packages" => json!(["Default"]),
                    "get_current_shader" => json!("CRT.fx"),
                    "get_shader_list" => json!(["CRT.fx", "film_grain.fx"]),
                    "get_shader_params" => json!([]),
                    _ => return Ok(json!({"success": true})),
                };
                Ok(json!({"success": true, "result": result}))
            })
        };
        let engine = SyncEngine::spawn(
            Arc::new(bridge),
            StubHost::new("730", "CS2"),
            SyncOptions::default(),
            None,
        );
        settle().await;
        assert_eq!(
            engine.handle().snapshot().shader_list,
            vec!["CRT.fx", "film_grain.fx"]
        );

        // The list fetch starts failing; a later resync keeps the cache
        failing.lock().unwrap().insert("get_shader_list");
        engine.handle().resync().await;
        settle().await;

        let state = engine.handle().snapshot();
        assert_eq!(state.sync_seq, 2);
        assert_eq!(state.shader_list, vec!["CRT.fx", "film_grain.fx"]);
        engine.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_switch_to_current_package_is_noop() {
        let (engine, log) = spawn_engine(Scripted::default(), StubHost::new("730", "CS2"));
        settle().await;
        log.lock().unwrap().clear();

        let current = engine.handle().snapshot().active_package.clone();
        engine.handle().switch_package(current).await;
        settle().await;
        assert!(log.lock().unwrap().is_empty());
        engine.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_param_edit_is_optimistic_and_debounced() {
        let (engine, log) = spawn_engine(Scripted::default(), StubHost::new("730", "CS2"));
        settle().await;
        log.lock().unwrap().clear();

        let handle = engine.handle();
        handle.edit_param("intensity", ParamValue::Float(1.5)).await;
        settle().await;

        // Optimistic: visible immediately, nothing written yet
        let state = handle.snapshot();
        let param = state.param("intensity").unwrap();
        assert_eq!(param.effective(), &ParamValue::Float(1.5));
        assert_eq!(param.value, ParamValue::Float(1.0));
        assert!(methods(&log).is_empty());

        // A second edit within the window replaces the first
        handle.edit_param("intensity", ParamValue::Float(1.8)).await;
        settle().await;
        advance(Duration::from_millis(600)).await;
        settle().await;

        let calls = log.lock().unwrap().clone();
        let writes: Vec<_> = calls.iter().filter(|(m, _)| m == "set_shader_param").collect();
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0].1, json!({"name": "intensity", "value": 1.8}));
        assert!(methods(&log).contains(&"apply_shader".to_string()));

        // Commit confirmed: pending folded into the cached value
        let state = handle.snapshot();
        let param = state.param("intensity").unwrap();
        assert_eq!(param.value, ParamValue::Float(1.8));
        assert!(param.pending.is_none());
        engine.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_commit_keeps_optimistic_value() {
        let script = Scripted {
            failing: HashSet::from(["set_shader_param"]),
            ..Scripted::default()
        };
        let (engine, _log) = spawn_engine(script, StubHost::new("730", "CS2"));
        settle().await;

        let handle = engine.handle();
        handle.edit_param("intensity", ParamValue::Float(0.2)).await;
        settle().await;
        advance(Duration::from_millis(600)).await;
        settle().await;

        let state = handle.snapshot();
        let param = state.param("intensity").unwrap();
        assert_eq!(param.effective(), &ParamValue::Float(0.2));
        assert_eq!(param.value, ParamValue::Float(1.0));
        assert_eq!(param.pending, Some(ParamValue::Float(0.2)));
        engine.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_edit_coerces_to_declared_kind() {
        let (engine, _log) = spawn_engine(Scripted::default(), StubHost::new("730", "CS2"));
        settle().await;

        let handle = engine.handle();
        handle.edit_param("intensity", ParamValue::Int(2)).await;
        settle().await;

        let state = handle.snapshot();
        let param = state.param("intensity").unwrap();
        assert_eq!(param.kind, ParamKind::Float);
        assert_eq!(param.effective(), &ParamValue::Float(2.0));
        engine.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_force_apply_cooldown() {
        let (engine, log) = spawn_engine(Scripted::default(), StubHost::new("730", "CS2"));
        settle().await;
        let handle = engine.handle();
        handle.set_master_enabled(true).await;
        settle().await;
        log.lock().unwrap().clear();

        handle.force_apply().await;
        settle().await;
        assert!(handle.snapshot().apply_cooldown);
        assert!(methods(&log).contains(&"apply_shader".to_string()));
        log.lock().unwrap().clear();

        // Locked out until the cooldown clears
        handle.force_apply().await;
        settle().await;
        assert!(!methods(&log).contains(&"apply_shader".to_string()));

        advance(Duration::from_millis(1100)).await;
        settle().await;
        assert!(!handle.snapshot().apply_cooldown);
        engine.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_per_game_toggle_triggers_resync() {
        let (engine, log) = spawn_engine(Scripted::default(), StubHost::new("730", "CS2"));
        settle().await;
        assert_eq!(engine.handle().snapshot().sync_seq, 1);
        log.lock().unwrap().clear();

        engine.handle().set_per_game(true).await;
        settle().await;

        let calls = methods(&log);
        assert_eq!(calls[0], "set_per_game");
        assert!(calls.contains(&"get_game_info".to_string()));
        assert_eq!(engine.handle().snapshot().sync_seq, 2);
        engine.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_select_shader_refetches_params() {
        let script = Scripted {
            current_shader: "0",
            ..Scripted::default()
        };
        let (engine, log) = spawn_engine(script, StubHost::new("730", "CS2"));
        settle().await;
        log.lock().unwrap().clear();

        let handle = engine.handle();
        handle
            .select_shader(ShaderSelection::from_wire("CRT.fx"))
            .await;
        settle().await;

        let calls = log.lock().unwrap().clone();
        assert_eq!(calls[0].0, "set_shader");
        assert_eq!(calls[0].1, json!({"shader_name": "CRT.fx"}));
        assert_eq!(calls[1].0, "get_shader_params");
        assert_eq!(handle.snapshot().params.len(), 1);

        // Back to no shader: params clear without a fetch
        log.lock().unwrap().clear();
        handle.select_shader(ShaderSelection::None).await;
        settle().await;
        assert!(handle.snapshot().params.is_empty());
        assert!(!methods(&log).contains(&"get_shader_params".to_string()));
        engine.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_cancels_pending_commits() {
        let (engine, log) = spawn_engine(Scripted::default(), StubHost::new("730", "CS2"));
        settle().await;
        let handle = engine.handle();
        handle.edit_param("intensity", ParamValue::Float(1.9)).await;
        settle().await;
        log.lock().unwrap().clear();

        engine.shutdown().await;
        advance(Duration::from_millis(2000)).await;
        settle().await;
        // The debounced write never fired
        assert!(!methods(&log).contains(&"set_shader_param".to_string()));
    }
}
