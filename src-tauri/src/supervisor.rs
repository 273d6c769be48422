use std::{
    env,
    io::Read,
    path::{Path, PathBuf},
    process::{Child, Command, Stdio},
    sync::{mpsc, Arc, Mutex, MutexGuard, OnceLock, PoisonError},
    time::Duration,
};

use crate::{
    backend_config,
    backend_readiness::ReadinessProbe,
    client_config,
    errors::{ConfigDegraded, SupervisorError},
    launch_plan::{self, InstallLayout, LaunchPlan},
    logging::{LogCategory, LogSink},
    port_allocator,
    process_control::{self, StopOutcome, GRACEFUL_STOP_TIMEOUT_MS},
    process_monitor::{self, ProcessEvent, SharedChild},
    run_mode::{self, RunMode},
    runtime_config::{self, ConfigEnv, EffectiveConfig, BACKEND_HOST, RUN_MODE_ENV},
    runtime_paths::{self, AppPaths},
    supervisor_state::{SupervisorState, SupervisorStateMachine},
};

const PYTHON_ENV_DEFAULTS: [(&str, &str); 2] =
    [("PYTHONUNBUFFERED", "1"), ("PYTHONIOENCODING", "utf-8")];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendEndpoint {
    pub host: &'static str,
    pub port: u16,
}

impl BackendEndpoint {
    pub fn url(&self) -> String {
        format!("http://{}:{}/", self.host, self.port)
    }
}

#[derive(Debug, Clone)]
pub struct SupervisorOptions {
    pub run_mode: RunMode,
    pub layout: InstallLayout,
    pub paths: AppPaths,
    pub env: ConfigEnv,
    pub app_version: String,
    pub cwd: PathBuf,
}

impl SupervisorOptions {
    pub fn from_environment(app_version: &str, resources_root: Option<PathBuf>) -> Self {
        let env = ConfigEnv::from_process();
        let (run_mode, _) = run_mode::resolve_run_mode(env.run_mode.as_deref(), RUN_MODE_ENV);
        Self {
            run_mode,
            layout: InstallLayout {
                resources_root: resources_root
                    .unwrap_or_else(runtime_paths::executable_resources_dir),
                workspace_root: runtime_paths::workspace_root_dir(),
            },
            paths: AppPaths::from_env(),
            env,
            app_version: app_version.to_string(),
            cwd: env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        }
    }
}

pub struct Supervisor {
    state: Mutex<SupervisorStateMachine>,
    child: SharedChild,
    sink: Arc<LogSink>,
    options: SupervisorOptions,
    probe: ReadinessProbe,
    endpoint: OnceLock<BackendEndpoint>,
}

impl Supervisor {
    pub fn new(options: SupervisorOptions) -> Self {
        let sink = Arc::new(LogSink::new(options.paths.desktop_log.clone()));
        if let (_, Some(message)) =
            run_mode::resolve_run_mode(options.env.run_mode.as_deref(), RUN_MODE_ENV)
        {
            sink.append(LogCategory::Startup, &message);
        }
        let budget_ms = backend_config::resolve_startup_timeout_ms(
            options.env.backend_timeout_ms.as_deref(),
            |message| sink.append(LogCategory::Startup, &message),
        );

        Self {
            state: Mutex::new(SupervisorStateMachine::default()),
            child: Arc::new(Mutex::new(None)),
            sink,
            options,
            probe: ReadinessProbe::with_budget(Duration::from_millis(budget_ms)),
            endpoint: OnceLock::new(),
        }
    }

    pub fn log(&self, category: LogCategory, message: &str) {
        self.sink.append(category, message);
    }

    pub fn log_path(&self) -> &Path {
        self.sink.path()
    }

    pub fn paths(&self) -> &AppPaths {
        &self.options.paths
    }

    pub fn state(&self) -> SupervisorState {
        self.lock_state().state()
    }

    /// Bound once per lifetime; later reads always see the same port.
    pub fn endpoint(&self) -> Option<&BackendEndpoint> {
        self.endpoint.get()
    }

    pub fn startup_interrupted_by_stop(&self) -> bool {
        self.state() == SupervisorState::Stopped
    }

    pub fn ensure_backend_ready(&self) -> Result<BackendEndpoint, SupervisorError> {
        {
            let mut state = self.lock_state();
            if !state.try_begin_start() {
                let current = state.state();
                drop(state);
                return match (current, self.endpoint.get()) {
                    (SupervisorState::Ready, Some(endpoint)) => Ok(endpoint.clone()),
                    _ => Err(SupervisorError::InvalidState(current)),
                };
            }
        }

        self.log(
            LogCategory::Startup,
            &format!(
                "backend startup requested: mode={}, budget_ms={}",
                self.options.run_mode.as_str(),
                self.probe.budget().as_millis()
            ),
        );

        match self.start_and_wait() {
            Ok(endpoint) => {
                self.log(
                    LogCategory::Startup,
                    &format!("backend ready at {}", endpoint.url()),
                );
                Ok(endpoint)
            }
            Err(error) => {
                let _ = self.terminate_child(LogCategory::Startup);
                self.lock_state().mark_failed();
                Err(error)
            }
        }
    }

    fn start_and_wait(&self) -> Result<BackendEndpoint, SupervisorError> {
        let client_config = client_config::resolve_client_config(
            &self.options.paths.client_config,
            |issue| self.log_degraded(issue),
        );
        let config = runtime_config::resolve_backend_runtime_config(
            &self.options.env,
            &client_config,
            &self.options.paths,
            &self.options.cwd,
            &self.options.app_version,
            |issue| self.log_degraded(issue),
        );

        let port = match config.backend_port {
            Some(port) => port,
            None => port_allocator::allocate_free_port().map_err(|error| {
                self.log_startup_failure(&error, None, None, &config);
                error
            })?,
        };
        let endpoint = self
            .endpoint
            .get_or_init(|| BackendEndpoint {
                host: BACKEND_HOST,
                port,
            })
            .clone();

        let plan = launch_plan::locate_backend(
            self.options.run_mode,
            &self.options.layout,
            &config,
            &self.options.env,
            endpoint.port,
            |message| self.log(LogCategory::Startup, message),
        )
        .map_err(|error| {
            self.log_startup_failure(&error, None, Some(endpoint.port), &config);
            error
        })?;

        let fail = |error: SupervisorError| {
            self.log_startup_failure(&error, Some(&plan), Some(endpoint.port), &config);
            error
        };

        let (events_tx, events_rx) = mpsc::channel();
        self.spawn_backend(&plan, events_tx).map_err(fail)?;

        self.probe
            .wait_for_ready(endpoint.host, endpoint.port, &events_rx)
            .map_err(fail)?;
        drop(events_rx);

        if !self.lock_state().mark_ready() {
            return Err(fail(SupervisorError::InvalidState(self.state())));
        }
        Ok(endpoint)
    }

    fn spawn_backend(
        &self,
        plan: &LaunchPlan,
        events: mpsc::Sender<ProcessEvent>,
    ) -> Result<(), SupervisorError> {
        let debug_command = plan.debug_command();
        let mut command = Command::new(&plan.command);
        command
            .args(&plan.args)
            .current_dir(&plan.cwd)
            .envs(&plan.extra_env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if plan.mode == RunMode::Development {
            for (name, value) in PYTHON_ENV_DEFAULTS {
                if env::var_os(name).is_none() {
                    command.env(name, value);
                }
            }
        }
        process_control::hide_console_window(&mut command);

        // Spawn under the state lock: `stop` either runs first and the spawn is refused,
        // or runs after and finds the child in the slot.
        let mut state = self.lock_state();
        if state.state() != SupervisorState::Starting {
            return Err(SupervisorError::InvalidState(state.state()));
        }
        self.log(
            LogCategory::Startup,
            &format!(
                "spawning backend: command={}, cwd={}",
                debug_command,
                plan.cwd.display()
            ),
        );
        let mut child = command
            .spawn()
            .map_err(|error| SupervisorError::ProcessSpawn {
                command: debug_command.clone(),
                reason: error.to_string(),
            })?;
        let pid = child.id();
        self.attach_output_pumps(&mut child);
        *self.lock_child() = Some(child);
        state.mark_spawned();
        drop(state);
        self.log(
            LogCategory::Startup,
            &format!("backend process spawned: pid={pid}"),
        );

        process_monitor::spawn_exit_watcher(
            Arc::clone(&self.child),
            pid,
            debug_command.clone(),
            Arc::clone(&self.sink),
            events,
        )
        .map(|_| ())
        .map_err(|error| SupervisorError::ProcessSpawn {
            command: debug_command,
            reason: format!("failed to start exit watcher: {error}"),
        })
    }

    fn attach_output_pumps(&self, child: &mut Child) {
        if let Some(stdout) = child.stdout.take() {
            self.start_output_pump(stdout, LogCategory::Backend);
        }
        if let Some(stderr) = child.stderr.take() {
            self.start_output_pump(stderr, LogCategory::BackendError);
        }
    }

    fn start_output_pump<R>(&self, stream: R, category: LogCategory)
    where
        R: Read + Send + 'static,
    {
        if let Err(error) =
            process_monitor::spawn_output_pump(stream, category, Arc::clone(&self.sink))
        {
            self.log(
                LogCategory::Runtime,
                &format!("failed to start {} output pump: {error}", category.label()),
            );
        }
    }

    pub fn stop(&self) -> Result<(), SupervisorError> {
        let (previous, child) = {
            let mut state = self.lock_state();
            let previous = state.mark_stopped();
            (previous, self.lock_child().take())
        };
        if !previous.is_terminal() {
            self.log(
                LogCategory::Shutdown,
                &format!("backend stop requested from state {previous}"),
            );
        }
        self.terminate(child, LogCategory::Shutdown)
    }

    fn terminate_child(&self, category: LogCategory) -> Result<(), SupervisorError> {
        let child = self.lock_child().take();
        self.terminate(child, category)
    }

    fn terminate(&self, child: Option<Child>, category: LogCategory) -> Result<(), SupervisorError> {
        let Some(mut child) = child else {
            return Ok(());
        };
        let pid = child.id();
        let outcome = process_control::stop_child_process(
            &mut child,
            Duration::from_millis(GRACEFUL_STOP_TIMEOUT_MS),
            |message| self.log(category, message),
        );
        match outcome {
            StopOutcome::AlreadyExited => {
                self.log(category, &format!("backend process pid={pid} had already exited"));
                Ok(())
            }
            StopOutcome::Terminated | StopOutcome::Killed => {
                self.log(category, &format!("backend process pid={pid} stopped: {outcome:?}"));
                Ok(())
            }
            StopOutcome::Unresponsive => {
                let error = SupervisorError::StopTimedOut {
                    pid,
                    timeout_ms: GRACEFUL_STOP_TIMEOUT_MS,
                };
                self.log(category, &error.to_string());
                Err(error)
            }
        }
    }

    fn log_degraded(&self, issue: ConfigDegraded) {
        self.log(LogCategory::Startup, &format!("config degraded: {issue}"));
    }

    fn log_startup_failure(
        &self,
        error: &SupervisorError,
        plan: Option<&LaunchPlan>,
        port: Option<u16>,
        config: &EffectiveConfig,
    ) {
        let (command, cwd) = match plan {
            Some(plan) => (plan.debug_command(), plan.cwd.display().to_string()),
            None => ("<unresolved>".to_string(), "<unresolved>".to_string()),
        };
        let port = port
            .map(|port| port.to_string())
            .unwrap_or_else(|| "unassigned".to_string());
        self.log(
            LogCategory::Startup,
            &format!(
                "backend startup failed: {error}; command={command}, cwd={cwd}, port={port}, data_root={}",
                config.data_root.display()
            ),
        );
    }

    fn lock_state(&self) -> MutexGuard<'_, SupervisorStateMachine> {
        self.state.lock().unwrap_or_else(|poisoned| {
            self.log(LogCategory::Runtime, "supervisor state lock poisoned, recovering");
            poisoned.into_inner()
        })
    }

    fn lock_child(&self) -> MutexGuard<'_, Option<Child>> {
        self.child.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for Supervisor {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}
