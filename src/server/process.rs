//! Tika server process supervision.
//!
//! Launches the server jar as a child process, redirects its output to a log
//! file and polls that log for the readiness marker.
//!
//! # Lifecycle
//!
//! 1. `NotStarted`: no launch attempted yet
//! 2. `Launching`: runtime located, log opened, process spawned
//! 3. `AwaitingReadiness`: polling the log for [`READINESS_MARKER`]
//! 4. `Ready` or `Failed`
//!
//! A failed readiness check kills the child before returning the error.

use std::ffi::OsString;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::config::ClientConfig;
use crate::error::ProvisioningError;

/// Substring the server writes to its log once it accepts requests.
pub const READINESS_MARKER: &str = "Started Apache Tika server";

/// Main class of the Tika server.
pub const SERVER_ENTRYPOINT: &str = "org.apache.tika.server.core.TikaServerCli";

/// How long `terminate` waits for a graceful exit before forcing it.
const TERMINATE_GRACE: Duration = Duration::from_secs(2);

/// Launch state of the supervisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchState {
    NotStarted,
    Launching,
    AwaitingReadiness,
    Ready,
    Failed,
}

/// Parameters of a single launch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchRequest {
    pub artifact: PathBuf,
    pub host: String,
    pub port: u16,
    pub classpath: Vec<PathBuf>,
    pub config_path: Option<PathBuf>,
}

/// Supervisor settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupervisorConfig {
    /// Runtime binary (looked up on PATH).
    pub runtime: String,
    /// Arguments placed before `-cp`.
    pub runtime_args: Vec<String>,
    pub log_path: PathBuf,
    pub max_retries: u32,
    pub retry_delay: Duration,
}

impl SupervisorConfig {
    pub fn from_client_config(config: &ClientConfig) -> Self {
        Self {
            runtime: config.java.clone(),
            runtime_args: config.java_args.clone(),
            log_path: config.log_path(),
            max_retries: config.startup_max_retry,
            retry_delay: config.startup_sleep(),
        }
    }
}

/// A launched server process.
///
/// The child runs in its own process group so signals sent to the caller's
/// group do not reach it.
#[derive(Debug)]
pub struct ServerHandle {
    child: Option<Child>,
    pid: u32,
    log_path: PathBuf,
}

impl ServerHandle {
    pub(crate) fn new(child: Option<Child>, pid: u32, log_path: PathBuf) -> Self {
        Self {
            child,
            pid,
            log_path,
        }
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    /// Whether the child is still running. A reaped or absent child is not.
    pub fn is_running(&mut self) -> bool {
        match self.child.as_mut() {
            Some(child) => matches!(child.try_wait(), Ok(None)),
            None => false,
        }
    }
}

/// Something that can start a server and confirm it is ready.
pub trait ServerLauncher: Send {
    fn launch(&mut self, request: &LaunchRequest) -> Result<ServerHandle, ProvisioningError>;
}

/// Launches the Tika server as a child process.
#[derive(Debug)]
pub struct ProcessSupervisor {
    config: SupervisorConfig,
    state: LaunchState,
}

impl ProcessSupervisor {
    pub fn new(config: SupervisorConfig) -> Self {
        Self {
            config,
            state: LaunchState::NotStarted,
        }
    }

    pub fn state(&self) -> LaunchState {
        self.state
    }

    /// Arguments passed to the runtime:
    /// `<args> -cp <classpath> <entrypoint> --port <port> --host <host> [--config <path>]`.
    pub fn command_args(&self, request: &LaunchRequest) -> Result<Vec<OsString>, ProvisioningError> {
        let classpath = std::env::join_paths(
            std::iter::once(&request.artifact).chain(request.classpath.iter()),
        )
        .map_err(|e| {
            ProvisioningError::Spawn(std::io::Error::new(std::io::ErrorKind::InvalidInput, e))
        })?;

        let mut args: Vec<OsString> = self.config.runtime_args.iter().map(OsString::from).collect();
        args.push("-cp".into());
        args.push(classpath);
        args.push(SERVER_ENTRYPOINT.into());
        args.push("--port".into());
        args.push(request.port.to_string().into());
        args.push("--host".into());
        args.push(request.host.clone().into());
        if let Some(ref config_path) = request.config_path {
            args.push("--config".into());
            args.push(config_path.clone().into_os_string());
        }
        Ok(args)
    }

    fn spawn(&mut self, request: &LaunchRequest) -> Result<ServerHandle, ProvisioningError> {
        self.state = LaunchState::Launching;

        let runtime = which::which(&self.config.runtime)
            .map_err(|_| ProvisioningError::RuntimeNotFound(self.config.runtime.clone()))?;

        let log_path = self.config.log_path.clone();
        let log = File::create(&log_path).map_err(|source| ProvisioningError::LogFileUnwritable {
            path: log_path.clone(),
            source,
        })?;
        let log_err = log.try_clone().map_err(|source| ProvisioningError::LogFileUnwritable {
            path: log_path.clone(),
            source,
        })?;

        let args = self.command_args(request)?;
        info!(
            "Starting Tika server on {}:{} ({} {})",
            request.host,
            request.port,
            runtime.display(),
            args.iter()
                .map(|a| a.to_string_lossy())
                .collect::<Vec<_>>()
                .join(" ")
        );
        debug!("Tika server log: {}", log_path.display());

        let mut command = Command::new(&runtime);
        command
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::from(log))
            .stderr(Stdio::from(log_err));
        detach(&mut command);

        let child = command.spawn().map_err(ProvisioningError::Spawn)?;
        let pid = child.id();
        Ok(ServerHandle::new(Some(child), pid, log_path))
    }

    /// Poll the log for the readiness marker within the retry budget.
    fn await_readiness(&mut self, handle: &mut ServerHandle) -> bool {
        self.state = LaunchState::AwaitingReadiness;

        for attempt in 1..=self.config.max_retries {
            thread::sleep(self.config.retry_delay);

            // Runtime warnings may be written in a non-UTF-8 locale
            let log = fs::read(handle.log_path()).unwrap_or_default();
            if contains_marker(&log) {
                info!("Tika server ready (pid {})", handle.pid());
                return true;
            }

            if !handle.is_running() {
                warn!("Tika server process {} exited before becoming ready", handle.pid());
                return false;
            }

            debug!(
                "Tika server not ready yet (attempt {}/{})",
                attempt, self.config.max_retries
            );
        }
        false
    }
}

impl ServerLauncher for ProcessSupervisor {
    fn launch(&mut self, request: &LaunchRequest) -> Result<ServerHandle, ProvisioningError> {
        let mut handle = match self.spawn(request) {
            Ok(handle) => handle,
            Err(e) => {
                self.state = LaunchState::Failed;
                return Err(e);
            }
        };

        if self.await_readiness(&mut handle) {
            self.state = LaunchState::Ready;
            return Ok(handle);
        }

        self.state = LaunchState::Failed;
        error!(
            "Tika server failed to start; see {}",
            handle.log_path().display()
        );
        terminate(&mut handle);
        Err(ProvisioningError::ReadinessTimeout {
            attempts: self.config.max_retries,
            log: handle.log_path().to_path_buf(),
        })
    }
}

/// Stop a server process and reap it.
///
/// Idempotent: an absent or already exited process is logged and ignored.
pub fn terminate(handle: &mut ServerHandle) {
    let Some(mut child) = handle.child.take() else {
        debug!("No Tika server process to terminate");
        return;
    };

    if let Ok(Some(status)) = child.try_wait() {
        info!("Tika server {} already exited ({})", handle.pid, status);
        return;
    }

    info!("Shutting down Tika server (pid {})...", handle.pid);
    backend::request_stop(&mut child);

    let mut waited = Duration::ZERO;
    let step = Duration::from_millis(100);
    while waited < TERMINATE_GRACE {
        if let Ok(Some(_)) = child.try_wait() {
            return;
        }
        thread::sleep(step);
        waited += step;
    }

    warn!(
        "Tika server {} did not exit after {:?}, killing",
        handle.pid, TERMINATE_GRACE
    );
    backend::force_stop(&mut child);
    let _ = child.wait();
}

fn contains_marker(log: &[u8]) -> bool {
    let marker = READINESS_MARKER.as_bytes();
    log.windows(marker.len()).any(|window| window == marker)
}

#[cfg(unix)]
fn detach(command: &mut Command) {
    use std::os::unix::process::CommandExt;
    command.process_group(0);
}

#[cfg(not(unix))]
fn detach(_command: &mut Command) {}

/// Process-group signalling on Unix.
#[cfg(unix)]
mod backend {
    use std::io;
    use std::process::Child;

    use tracing::debug;

    fn signal_group(pgid: u32, signal: libc::c_int) -> io::Result<()> {
        // SAFETY: killpg only sends a signal to the group led by our own child.
        let result = unsafe { libc::killpg(pgid as libc::pid_t, signal) };
        if result == 0 {
            Ok(())
        } else {
            Err(io::Error::last_os_error())
        }
    }

    pub fn request_stop(child: &mut Child) {
        if let Err(e) = signal_group(child.id(), libc::SIGTERM) {
            debug!("SIGTERM to process group {} failed: {}", child.id(), e);
        }
    }

    pub fn force_stop(child: &mut Child) {
        if let Err(e) = signal_group(child.id(), libc::SIGKILL) {
            debug!("SIGKILL to process group {} failed: {}", child.id(), e);
            let _ = child.kill();
        }
    }
}

/// Handle-based termination elsewhere.
#[cfg(not(unix))]
mod backend {
    use std::process::Child;

    use tracing::debug;

    pub fn request_stop(child: &mut Child) {
        if let Err(e) = child.kill() {
            debug!("Kill of process {} failed: {}", child.id(), e);
        }
    }

    pub fn force_stop(child: &mut Child) {
        let _ = child.kill();
    }
}
