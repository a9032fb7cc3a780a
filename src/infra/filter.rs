use futures_util::future::BoxFuture;
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::pin::Pin;
use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::io::AsyncRead;
use tokio::process::{Child, Command};

pub type FilterOutput = Pin<Box<dyn AsyncRead + Send>>;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FilterExit {
    Success,
    Failed { code: Option<i32> },
    TimedOut { after: Duration },
}

/// A started filter: its output as it is produced, and its eventual exit.
///
/// `exit` must be driven to completion for the program to be reaped; it does not
/// depend on `output` being read to the end.
pub struct FilterRun {
    pub output: FilterOutput,
    pub exit: BoxFuture<'static, io::Result<FilterExit>>,
}

#[derive(Debug, Error)]
pub enum FilterStartError {
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("{0} started without a stdout pipe")]
    MissingStdout(String),
}

/// Turns one input file into a byte stream.
pub trait FilterProgram: Send + Sync {
    fn name(&self) -> String;

    fn start(&self, input: File) -> Result<FilterRun, FilterStartError>;
}

/// Runs an executable with no arguments, `input` as stdin and stdout piped back.
///
/// On unix the program leads its own process group, so a timeout kill also reaches
/// whatever it forked and the stdout pipe closes with it.
#[derive(Clone, Debug)]
pub struct ProcessFilter {
    program: PathBuf,
    timeout: Option<Duration>,
}

impl ProcessFilter {
    pub fn new(program: impl Into<PathBuf>, timeout: Option<Duration>) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }
}

impl FilterProgram for ProcessFilter {
    fn name(&self) -> String {
        self.program.display().to_string()
    }

    fn start(&self, input: File) -> Result<FilterRun, FilterStartError> {
        let mut command = Command::new(&self.program);
        command
            .stdin(Stdio::from(input))
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit());
        #[cfg(unix)]
        command.process_group(0);

        let mut child = command.spawn().map_err(|source| FilterStartError::Spawn {
            program: self.name(),
            source,
        })?;
        // The child holds its own copy of the input descriptor now.
        drop(command);

        // Dropping `child` here leaves it to tokio's orphan reaping.
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| FilterStartError::MissingStdout(self.name()))?;

        Ok(FilterRun {
            output: Box::pin(stdout),
            exit: Box::pin(wait_for_exit(child, self.timeout)),
        })
    }
}

async fn wait_for_exit(mut child: Child, timeout: Option<Duration>) -> io::Result<FilterExit> {
    let status = match timeout {
        None => child.wait().await?,
        Some(limit) => match tokio::time::timeout(limit, child.wait()).await {
            Ok(status) => status?,
            Err(_elapsed) => {
                kill_process_group(&mut child)?;
                child.wait().await?;
                return Ok(FilterExit::TimedOut { after: limit });
            }
        },
    };

    if status.success() {
        Ok(FilterExit::Success)
    } else {
        Ok(FilterExit::Failed {
            code: status.code(),
        })
    }
}

#[cfg(unix)]
fn kill_process_group(child: &mut Child) -> io::Result<()> {
    let Some(pid) = child.id() else {
        return Ok(());
    };
    let pgid = libc::pid_t::try_from(pid).map_err(io::Error::other)?;

    // SAFETY: kill(2) only signals; the group was created for this child at spawn.
    if unsafe { libc::kill(-pgid, libc::SIGKILL) } == -1 {
        let error = io::Error::last_os_error();
        if error.raw_os_error() != Some(libc::ESRCH) {
            return Err(error);
        }
    }
    Ok(())
}

#[cfg(not(unix))]
fn kill_process_group(child: &mut Child) -> io::Result<()> {
    child.start_kill()
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use std::path::Path;
    use tempfile::tempdir;
    use tokio::io::AsyncReadExt;

    fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("write script");
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).expect("chmod");
        path
    }

    fn input_file(dir: &Path, contents: &str) -> File {
        let path = dir.join("input.log");
        fs::write(&path, contents).expect("write input");
        File::open(path).expect("open input")
    }

    async fn read_all(mut output: FilterOutput) -> Vec<u8> {
        let mut buf = Vec::new();
        output.read_to_end(&mut buf).await.expect("read output");
        buf
    }

    #[tokio::test]
    async fn relays_stdin_through_cat() {
        let temp = tempdir().expect("tempdir");
        let filter = ProcessFilter::new("cat", None);

        let run = filter
            .start(input_file(temp.path(), "GET / 200\nGET /a 404\n"))
            .expect("cat starts");
        let output = read_all(run.output).await;

        assert_eq!(output, b"GET / 200\nGET /a 404\n");
        assert_eq!(run.exit.await.expect("wait"), FilterExit::Success);
    }

    #[tokio::test]
    async fn reports_non_zero_exit_after_partial_output() {
        let temp = tempdir().expect("tempdir");
        let script = write_script(temp.path(), "fail.sh", "printf partial\nexit 3");
        let filter = ProcessFilter::new(script, None);

        let run = filter
            .start(input_file(temp.path(), "ignored"))
            .expect("script starts");
        let output = read_all(run.output).await;

        assert_eq!(output, b"partial");
        assert_eq!(
            run.exit.await.expect("wait"),
            FilterExit::Failed { code: Some(3) }
        );
    }

    #[tokio::test]
    async fn kills_programs_that_outlive_the_timeout() {
        let temp = tempdir().expect("tempdir");
        let script = write_script(temp.path(), "hang.sh", "exec sleep 30");
        let limit = Duration::from_millis(100);
        let filter = ProcessFilter::new(script, Some(limit));

        let run = filter
            .start(input_file(temp.path(), ""))
            .expect("script starts");
        let exit = tokio::time::timeout(Duration::from_secs(5), run.exit)
            .await
            .expect("timeout enforced")
            .expect("wait");

        assert_eq!(exit, FilterExit::TimedOut { after: limit });
        // The pipe closes once the killed program is gone.
        assert!(read_all(run.output).await.is_empty());
    }

    #[tokio::test]
    async fn timeout_kill_reaches_forked_children() {
        let temp = tempdir().expect("tempdir");
        let script = write_script(temp.path(), "alp.sh", "printf head\nsleep 30\nprintf tail");
        let limit = Duration::from_millis(200);
        let filter = ProcessFilter::new(script, Some(limit));

        let run = filter
            .start(input_file(temp.path(), ""))
            .expect("script starts");
        let exit = tokio::spawn(run.exit);
        let output = tokio::time::timeout(Duration::from_secs(5), read_all(run.output))
            .await
            .expect("stdout closes once the group is killed");

        assert_eq!(output, b"head");
        assert_eq!(
            exit.await.expect("join").expect("wait"),
            FilterExit::TimedOut { after: limit }
        );
    }

    #[tokio::test]
    async fn missing_program_fails_to_start() {
        let temp = tempdir().expect("tempdir");
        let filter = ProcessFilter::new(temp.path().join("no-such-filter"), None);

        let result = filter.start(input_file(temp.path(), ""));

        assert!(matches!(result, Err(FilterStartError::Spawn { .. })));
    }

    #[tokio::test]
    async fn non_executable_program_fails_to_start() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("not-executable.sh");
        fs::write(&path, "#!/bin/sh\ncat\n").expect("write");

        let filter = ProcessFilter::new(&path, None);
        let result = filter.start(input_file(temp.path(), ""));

        assert!(matches!(result, Err(FilterStartError::Spawn { .. })));
    }
}
