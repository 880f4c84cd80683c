//! Launching and escalating termination of external processes.
//!
//! Children are placed in their own process group so an interrupt sent to
//! them reaches their descendants too. Termination escalates through three
//! stages: interrupt, terminate request, forced kill.

use std::path::{Path, PathBuf};
use std::process::{Child, Command};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crate::logging::RunLogger;

use super::errors::{ProcessError, ProcessResult};

/// Interval between exit checks while waiting for a child.
const POLL_SLICE: Duration = Duration::from_millis(50);

/// Identifies a launched process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessHandle {
    pub pid: u32,
    pub executable: PathBuf,
}

/// Wait budgets for each escalation stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TerminationPolicy {
    /// Wait after the interrupt signal. Default 5 s.
    pub interrupt_grace: Duration,
    /// Wait after the terminate request. Default 10 s.
    pub terminate_grace: Duration,
}

impl Default for TerminationPolicy {
    fn default() -> Self {
        Self {
            interrupt_grace: Duration::from_secs(5),
            terminate_grace: Duration::from_secs(10),
        }
    }
}

/// Which stage ended a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationStage {
    /// Exited before any signal was sent, or was never owned.
    AlreadyExited,
    /// Exited after the interrupt signal.
    Interrupted,
    /// Exited after the terminate request.
    Terminated,
    /// Had to be killed.
    Killed,
}

struct ManagedProcess {
    handle: ProcessHandle,
    child: Child,
}

/// Owns every process launched for a run.
pub struct ProcessManager {
    logger: Arc<RunLogger>,
    policy: TerminationPolicy,
    processes: Vec<ManagedProcess>,
}

impl ProcessManager {
    /// Create a manager with the default termination policy.
    pub fn new(logger: Arc<RunLogger>) -> Self {
        Self::with_policy(logger, TerminationPolicy::default())
    }

    /// Create a manager with a custom termination policy.
    pub fn with_policy(logger: Arc<RunLogger>, policy: TerminationPolicy) -> Self {
        Self {
            logger,
            policy,
            processes: Vec::new(),
        }
    }

    /// Number of processes still owned.
    pub fn len(&self) -> usize {
        self.processes.len()
    }

    /// Whether no processes are owned.
    pub fn is_empty(&self) -> bool {
        self.processes.is_empty()
    }

    /// Launch `executable` with `args` in a new process group.
    pub fn start(&mut self, executable: &Path, args: &[String]) -> ProcessResult<ProcessHandle> {
        if !executable.exists() {
            return Err(ProcessError::NotFound(executable.to_path_buf()));
        }

        let mut command = Command::new(executable);
        command.args(args);

        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            command.process_group(0);
        }

        #[cfg(windows)]
        {
            use std::os::windows::process::CommandExt;
            const CREATE_NEW_PROCESS_GROUP: u32 = 0x0000_0200;
            command.creation_flags(CREATE_NEW_PROCESS_GROUP);
        }

        let mut display = vec![executable.display().to_string()];
        display.extend(args.iter().cloned());
        self.logger.command(&display.join(" "));

        let child = command
            .spawn()
            .map_err(|e| ProcessError::spawn(executable, e))?;

        let handle = ProcessHandle {
            pid: child.id(),
            executable: executable.to_path_buf(),
        };
        self.logger
            .info(&format!("Process PID {} started ({})", handle.pid, executable.display()));
        self.processes.push(ManagedProcess {
            handle: handle.clone(),
            child,
        });
        Ok(handle)
    }

    /// Stop a process, escalating until it exits.
    ///
    /// Calling this for a process that already exited, or was already
    /// terminated, returns immediately.
    pub fn terminate(&mut self, handle: &ProcessHandle) -> ProcessResult<TerminationStage> {
        let Some(index) = self.processes.iter().position(|p| p.handle == *handle) else {
            return Ok(TerminationStage::AlreadyExited);
        };

        let mut process = self.processes.remove(index);
        match self.shutdown(&mut process) {
            Ok(stage) => Ok(stage),
            Err(e) => {
                self.processes.insert(index, process);
                Err(e)
            }
        }
    }

    /// Terminate every owned process in reverse launch order.
    ///
    /// Failures are logged and do not stop the remaining terminations. A
    /// process whose exit cannot be confirmed even after a last kill stays
    /// owned, so a later call (or `Drop`) tries again.
    pub fn terminate_all(&mut self) {
        let mut unconfirmed = Vec::new();
        while let Some(mut process) = self.processes.pop() {
            if let Err(e) = self.shutdown(&mut process) {
                self.logger.error(&format!(
                    "Failed to terminate {}: {}",
                    process.handle.executable.display(),
                    e
                ));
                if !self.reap(&mut process) {
                    unconfirmed.push(process);
                }
            }
        }
        unconfirmed.reverse();
        self.processes = unconfirmed;
    }

    /// Kill and wait without escalation; `true` once the exit is confirmed.
    fn reap(&self, process: &mut ManagedProcess) -> bool {
        let pid = process.handle.pid;
        if let Err(e) = process.child.kill() {
            self.logger
                .warn(&format!("Last-resort kill of PID {} failed: {}", pid, e));
        }
        match process.child.wait() {
            Ok(status) => {
                self.logger
                    .info(&format!("Process PID {} reaped ({})", pid, status));
                true
            }
            Err(e) => {
                self.logger.error(&format!(
                    "Could not confirm exit of PID {}, keeping it for a later attempt: {}",
                    pid, e
                ));
                false
            }
        }
    }

    fn shutdown(&self, process: &mut ManagedProcess) -> ProcessResult<TerminationStage> {
        let pid = process.handle.pid;
        if has_exited(&mut process.child, pid)? {
            self.logger.debug(&format!("Process PID {} already exited", pid));
            return Ok(TerminationStage::AlreadyExited);
        }

        self.logger.info(&format!("Terminating process PID {}", pid));
        let grace = self.policy.interrupt_grace;
        if send_interrupt(pid) && wait_for_exit(&mut process.child, pid, grace)? {
            self.logger.info(&format!("Process PID {} exited after interrupt", pid));
            return Ok(TerminationStage::Interrupted);
        }

        self.logger.warn(&format!(
            "Process PID {} still running after interrupt, requesting termination",
            pid
        ));
        let grace = self.policy.terminate_grace;
        if send_terminate(pid) && wait_for_exit(&mut process.child, pid, grace)? {
            self.logger.info(&format!("Process PID {} terminated", pid));
            return Ok(TerminationStage::Terminated);
        }

        self.logger
            .warn(&format!("Process PID {} did not terminate, killing", pid));
        force_kill(&mut process.child, pid)?;
        process
            .child
            .wait()
            .map_err(|source| ProcessError::Wait { pid, source })?;
        self.logger.info(&format!("Process PID {} killed", pid));
        Ok(TerminationStage::Killed)
    }
}

impl Drop for ProcessManager {
    fn drop(&mut self) {
        self.terminate_all();
    }
}

fn has_exited(child: &mut Child, pid: u32) -> ProcessResult<bool> {
    child
        .try_wait()
        .map(|status| status.is_some())
        .map_err(|source| ProcessError::Wait { pid, source })
}

/// Poll in short slices until the child exits or `budget` elapses.
fn wait_for_exit(child: &mut Child, pid: u32, budget: Duration) -> ProcessResult<bool> {
    let start = Instant::now();
    loop {
        if has_exited(child, pid)? {
            return Ok(true);
        }
        let elapsed = start.elapsed();
        if elapsed >= budget {
            return Ok(false);
        }
        thread::sleep(POLL_SLICE.min(budget - elapsed));
    }
}

#[cfg(unix)]
fn signal_group(pid: u32, signal: nix::sys::signal::Signal) -> bool {
    use nix::sys::signal::{kill, killpg};
    use nix::unistd::Pid;

    let pid = Pid::from_raw(pid as i32);
    killpg(pid, signal).or_else(|_| kill(pid, signal)).is_ok()
}

#[cfg(unix)]
fn send_interrupt(pid: u32) -> bool {
    signal_group(pid, nix::sys::signal::Signal::SIGINT)
}

#[cfg(unix)]
fn send_terminate(pid: u32) -> bool {
    signal_group(pid, nix::sys::signal::Signal::SIGTERM)
}

#[cfg(unix)]
fn force_kill(child: &mut Child, pid: u32) -> ProcessResult<()> {
    if signal_group(pid, nix::sys::signal::Signal::SIGKILL) {
        return Ok(());
    }
    child.kill().map_err(|e| ProcessError::signal(pid, e.to_string()))
}

/// CTRL_BREAK to the child's console process group.
#[cfg(windows)]
fn send_interrupt(pid: u32) -> bool {
    use windows_sys::Win32::System::Console::{GenerateConsoleCtrlEvent, CTRL_BREAK_EVENT};

    // The child was created with CREATE_NEW_PROCESS_GROUP, so its pid is
    // also its group id.
    unsafe { GenerateConsoleCtrlEvent(CTRL_BREAK_EVENT, pid) != 0 }
}

// TerminateProcess is the only termination request on Windows and it is
// what `force_kill` issues.
#[cfg(windows)]
fn send_terminate(_pid: u32) -> bool {
    false
}

#[cfg(not(any(unix, windows)))]
fn send_interrupt(_pid: u32) -> bool {
    false
}

#[cfg(not(any(unix, windows)))]
fn send_terminate(_pid: u32) -> bool {
    false
}

#[cfg(not(unix))]
fn force_kill(child: &mut Child, pid: u32) -> ProcessResult<()> {
    child.kill().map_err(|e| ProcessError::signal(pid, e.to_string()))
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::logging::LogLevel;

    fn manager() -> ProcessManager {
        ProcessManager::with_policy(
            Arc::new(RunLogger::console(LogLevel::Debug)),
            TerminationPolicy {
                interrupt_grace: Duration::from_millis(300),
                terminate_grace: Duration::from_millis(300),
            },
        )
    }

    fn shell(script: &str) -> Vec<String> {
        vec!["-c".to_string(), script.to_string()]
    }

    #[test]
    fn missing_executable_is_rejected() {
        let mut mgr = manager();
        let err = mgr
            .start(Path::new("/definitely/not/here"), &[])
            .unwrap_err();
        assert!(matches!(err, ProcessError::NotFound(_)));
        assert!(mgr.is_empty());
    }

    #[test]
    fn interrupt_stops_cooperative_child() {
        let mut mgr = manager();
        let handle = mgr.start(Path::new("/bin/sh"), &shell("sleep 30")).unwrap();
        thread::sleep(Duration::from_millis(200));

        let stage = mgr.terminate(&handle).unwrap();
        assert_eq!(stage, TerminationStage::Interrupted);
        assert!(mgr.is_empty());
    }

    #[test]
    fn ignored_interrupt_escalates_to_terminate() {
        let mut mgr = manager();
        let handle = mgr
            .start(Path::new("/bin/sh"), &shell("trap '' INT; sleep 30"))
            .unwrap();
        thread::sleep(Duration::from_millis(300));

        let stage = mgr.terminate(&handle).unwrap();
        assert_eq!(stage, TerminationStage::Terminated);
    }

    #[test]
    fn stubborn_child_is_killed_within_budget() {
        let mut mgr = ProcessManager::new(Arc::new(RunLogger::console(LogLevel::Debug)));
        let handle = mgr
            .start(Path::new("/bin/sh"), &shell("trap '' INT TERM; sleep 60"))
            .unwrap();
        thread::sleep(Duration::from_millis(300));

        let started = Instant::now();
        let stage = mgr.terminate(&handle).unwrap();
        assert_eq!(stage, TerminationStage::Killed);
        assert!(started.elapsed() < Duration::from_secs(16));
    }

    #[test]
    fn terminate_is_idempotent() {
        let mut mgr = manager();
        let handle = mgr.start(Path::new("/bin/sh"), &shell("exit 0")).unwrap();
        thread::sleep(Duration::from_millis(200));

        assert_eq!(mgr.terminate(&handle).unwrap(), TerminationStage::AlreadyExited);
        assert_eq!(mgr.terminate(&handle).unwrap(), TerminationStage::AlreadyExited);
    }

    #[test]
    fn unconfirmed_exit_is_kept_for_retry() {
        use nix::sys::wait::waitpid;
        use nix::unistd::Pid;

        let mut mgr = manager();
        let handle = mgr.start(Path::new("/bin/sh"), &shell("exit 0")).unwrap();
        // Reap behind the manager's back so every wait on the child fails.
        waitpid(Pid::from_raw(handle.pid as i32), None).unwrap();

        mgr.terminate_all();
        assert_eq!(mgr.len(), 1);

        let err = mgr.terminate(&handle).unwrap_err();
        assert!(matches!(err, ProcessError::Wait { .. }));
        assert_eq!(mgr.len(), 1);
    }

    #[test]
    fn terminate_all_keeps_launch_order_of_survivors() {
        let mut mgr = manager();
        let first = mgr.start(Path::new("/bin/sh"), &shell("exit 0")).unwrap();
        let second = mgr.start(Path::new("/bin/sh"), &shell("exit 0")).unwrap();
        waitpid_all(&[&first, &second]);

        mgr.terminate_all();
        let pids: Vec<u32> = mgr.processes.iter().map(|p| p.handle.pid).collect();
        assert_eq!(pids, vec![first.pid, second.pid]);
    }

    fn waitpid_all(handles: &[&ProcessHandle]) {
        for handle in handles {
            nix::sys::wait::waitpid(nix::unistd::Pid::from_raw(handle.pid as i32), None).unwrap();
        }
    }

    #[test]
    fn terminate_all_empties_the_manager() {
        let mut mgr = manager();
        mgr.start(Path::new("/bin/sh"), &shell("sleep 30")).unwrap();
        mgr.start(Path::new("/bin/sh"), &shell("sleep 30")).unwrap();
        assert_eq!(mgr.len(), 2);

        mgr.terminate_all();
        assert!(mgr.is_empty());
    }
}
