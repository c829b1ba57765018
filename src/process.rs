// SPDX-License-Identifier: GPL-3.0-only

//! Invocation of the external command-line tools shotux is built on.
//!
//! Every tool goes through [`ExternalTool::run`] so that capture, clipboard and
//! hotkey code share one failure classification:
//! - the program cannot be found → [`ToolError::DependencyMissing`]
//! - the program exits nonzero → [`ToolError::Failed`] with its stderr
//! - the program outlives the wall-clock bound → [`ToolError::TimedOut`]

use std::ffi::{OsStr, OsString};
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

/// Marker a shell prints on stderr when it cannot resolve a command
const NOT_FOUND_SIGNATURE: &str = "command not found";

#[derive(thiserror::Error, Debug)]
pub enum ToolError {
    #[error("{tool} is not installed. Please install it using: sudo apt install {package}")]
    DependencyMissing {
        tool: &'static str,
        package: &'static str,
    },
    #[error("{tool} failed: {stderr}")]
    Failed { tool: &'static str, stderr: String },
    #[error("{tool} timed out after {}s", .after.as_secs())]
    TimedOut { tool: &'static str, after: Duration },
    #[error("running {tool}: {source}")]
    Io {
        tool: &'static str,
        #[source]
        source: io::Error,
    },
}

impl ToolError {
    #[must_use]
    pub fn is_dependency_missing(&self) -> bool {
        matches!(self, Self::DependencyMissing { .. })
    }

    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::TimedOut { .. })
    }
}

/// An external executable together with the distribution package providing it
#[derive(Debug, Clone)]
pub struct ExternalTool {
    name: &'static str,
    package: &'static str,
    program: OsString,
    leading_args: Vec<OsString>,
}

impl ExternalTool {
    #[must_use]
    pub fn new(name: &'static str, package: &'static str) -> Self {
        Self {
            name,
            package,
            program: OsString::from(name),
            leading_args: Vec::new(),
        }
    }

    /// Screen capture tool
    #[must_use]
    pub fn scrot() -> Self {
        Self::new("scrot", "scrot")
    }

    /// X11 clipboard setter
    #[must_use]
    pub fn xclip() -> Self {
        Self::new("xclip", "xclip")
    }

    /// Global hotkey daemon
    #[must_use]
    pub fn xbindkeys() -> Self {
        Self::new("xbindkeys", "xbindkeys")
    }

    /// Run a different executable under this tool's name
    #[must_use]
    pub fn with_program(mut self, program: impl Into<OsString>) -> Self {
        self.program = program.into();
        self
    }

    /// Arguments placed before the per-invocation arguments, e.g. a wrapper's own flags
    #[must_use]
    pub fn with_leading_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.leading_args = args.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[must_use]
    pub fn package(&self) -> &'static str {
        self.package
    }

    #[must_use]
    pub fn program(&self) -> &OsStr {
        &self.program
    }

    /// Whether the executable can be located right now
    #[must_use]
    pub fn is_installed(&self) -> bool {
        find_program(&self.program).is_some()
    }

    #[must_use]
    pub fn missing(&self) -> ToolError {
        ToolError::DependencyMissing {
            tool: self.name,
            package: self.package,
        }
    }

    /// Blocking command for long-lived helpers that are supervised outside of tokio
    pub fn std_command<I, S>(&self, args: I) -> std::process::Command
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut command = std::process::Command::new(&self.program);
        command.args(&self.leading_args).args(args);
        command
    }

    /// Runs the tool to completion and classifies the outcome.
    ///
    /// stderr goes to an anonymous file instead of a pipe: tools that fork into
    /// the background (xclip keeps serving the selection) would otherwise hold
    /// the pipe open long after the foreground process exited.
    ///
    /// # Errors
    /// See [`ToolError`]
    pub async fn run<I, S>(&self, args: I, timeout: Option<Duration>) -> Result<(), ToolError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let io_error = |source| ToolError::Io {
            tool: self.name,
            source,
        };

        let mut stderr = tempfile::tempfile().map_err(io_error)?;
        let mut command = tokio::process::Command::new(&self.program);
        command
            .args(&self.leading_args)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::from(stderr.try_clone().map_err(io_error)?))
            .kill_on_drop(true);

        log::debug!("running {:?}", command.as_std());
        let mut child = command.spawn().map_err(|err| self.spawn_error(err))?;

        let status = match timeout {
            Some(limit) => match tokio::time::timeout(limit, child.wait()).await {
                Ok(status) => status,
                Err(_) => {
                    let _ = child.start_kill();
                    return Err(ToolError::TimedOut {
                        tool: self.name,
                        after: limit,
                    });
                }
            },
            None => child.wait().await,
        }
        .map_err(io_error)?;

        let stderr = read_back(&mut stderr).map_err(io_error)?;
        if status.success() {
            if !stderr.is_empty() {
                log::debug!("{} stderr: {}", self.name, stderr.trim_end());
            }
            Ok(())
        } else if stderr.contains(NOT_FOUND_SIGNATURE) {
            Err(self.missing())
        } else {
            Err(ToolError::Failed {
                tool: self.name,
                stderr: stderr.trim().to_string(),
            })
        }
    }

    fn spawn_error(&self, err: io::Error) -> ToolError {
        if err.kind() == io::ErrorKind::NotFound {
            self.missing()
        } else {
            ToolError::Io {
                tool: self.name,
                source: err,
            }
        }
    }

    /// Tool whose behaviour is a shell script; `$1`.. are the invocation arguments
    #[cfg(test)]
    pub(crate) fn scripted(name: &'static str, package: &'static str, script: &str) -> Self {
        Self::new(name, package)
            .with_program("sh")
            .with_leading_args(["-c", script, name])
    }
}

fn read_back(file: &mut std::fs::File) -> io::Result<String> {
    let mut buffer = Vec::new();
    file.seek(SeekFrom::Start(0))?;
    file.read_to_end(&mut buffer)?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

/// Resolves `program` the way `which` does: paths are checked directly, bare
/// names are searched for in `PATH`.
#[must_use]
pub fn find_program(program: &OsStr) -> Option<PathBuf> {
    let candidate = Path::new(program);
    if candidate.components().count() > 1 {
        return is_executable(candidate).then(|| candidate.to_path_buf());
    }

    let search_path = std::env::var_os("PATH")?;
    std::env::split_paths(&search_path)
        .map(|dir| dir.join(program))
        .find(|path| is_executable(path))
}

fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    path.metadata()
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn successful_run_is_ok() {
        let tool = ExternalTool::scripted("fake", "fake", "echo chatter >&2; exit 0");
        tool.run::<_, &str>([], None).await.unwrap();
    }

    #[tokio::test]
    async fn nonzero_exit_carries_stderr() {
        let tool = ExternalTool::scripted("fake", "fake-pkg", "echo 'no display' >&2; exit 2");
        let err = tool.run::<_, &str>([], None).await.unwrap_err();
        match err {
            ToolError::Failed { tool, stderr } => {
                assert_eq!(tool, "fake");
                assert_eq!(stderr, "no display");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn not_found_signature_means_missing_dependency() {
        let tool = ExternalTool::scripted("fake", "fake-pkg", "echo 'fake: command not found' >&2; exit 127");
        let err = tool.run::<_, &str>([], None).await.unwrap_err();
        assert!(err.is_dependency_missing());
        assert!(err.to_string().contains("sudo apt install fake-pkg"));
    }

    #[tokio::test]
    async fn unknown_program_means_missing_dependency() {
        let tool = ExternalTool::new("fake", "fake-pkg").with_program("/nonexistent/shotux-fake");
        let err = tool.run::<_, &str>([], None).await.unwrap_err();
        assert!(err.is_dependency_missing());
    }

    #[tokio::test]
    async fn slow_tool_times_out() {
        let tool = ExternalTool::scripted("fake", "fake", "sleep 5");
        let err = tool
            .run::<_, &str>([], Some(Duration::from_millis(200)))
            .await
            .unwrap_err();
        assert!(err.is_timeout(), "{err:?}");
        assert!(!matches!(err, ToolError::Failed { .. }));
    }

    #[tokio::test]
    async fn invocation_arguments_follow_leading_args() {
        let dir = tempfile::tempdir().unwrap();
        let record = dir.path().join("args");
        let script = format!("echo \"$@\" > '{}'", record.display());
        let tool = ExternalTool::scripted("fake", "fake", &script);
        tool.run(["-s", "out.png"], None).await.unwrap();
        assert_eq!(std::fs::read_to_string(record).unwrap().trim(), "-s out.png");
    }

    #[test]
    fn find_program_searches_path() {
        assert!(find_program(OsStr::new("sh")).is_some());
        assert!(find_program(OsStr::new("shotux-definitely-not-installed")).is_none());
        assert!(find_program(OsStr::new("/nonexistent/sh")).is_none());
    }
}
