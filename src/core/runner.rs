//! Command pipeline runner.
//!
//! Runs an ordered chain of external commands with pipe semantics: each
//! stage's stdout becomes the next stage's stdin, and only the final stage's
//! output reaches the [`LineObserver`]. Every stage is spawned from an
//! explicit token vector, never through a shell.
//!
//! Intermediate output is spooled to an anonymous temporary file and handed
//! to the next stage once the producer has exited successfully, so a failing
//! stage stops the chain before anything downstream is spawned.

use std::collections::VecDeque;
use std::fmt;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read, Seek, SeekFrom};
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{debug, error, warn};

use crate::error::{CancelledDetails, CommandFailedDetails, Error, Result};
use crate::utils::shell;

/// Number of trailing stderr lines kept for error details.
const STDERR_TAIL: usize = 20;

/// How often the watchdog checks for cancellation and deadlines.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Bound for the channel carrying final-stage lines to the observer.
const STREAM_BUFFER: usize = 256;

// ============================================================================
// Data model
// ============================================================================

/// One external process invocation: program followed by its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    tokens: Vec<String>,
}

impl CommandSpec {
    /// Build a command from tokens. The first token is the program.
    pub fn new<I, S>(tokens: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let tokens: Vec<String> = tokens.into_iter().map(Into::into).collect();

        match tokens.first() {
            None => Err(Error::config_invalid_value(
                "command",
                None,
                "command has no tokens",
            )),
            Some(program) if program.trim().is_empty() => Err(Error::config_invalid_value(
                "command",
                Some(shell::quote_args(&tokens)),
                "command program is empty",
            )),
            Some(_) => Ok(Self { tokens }),
        }
    }

    pub fn program(&self) -> &str {
        &self.tokens[0]
    }

    pub fn args(&self) -> &[String] {
        &self.tokens[1..]
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&shell::quote_args(&self.tokens))
    }
}

/// An ordered chain of commands, `cmd1 | cmd2 | ...`. May be empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineRequest {
    stages: Vec<CommandSpec>,
}

impl PipelineRequest {
    pub fn new(stages: Vec<CommandSpec>) -> Self {
        Self { stages }
    }

    /// Append a stage reading from the current last stage.
    pub fn pipe(mut self, next: CommandSpec) -> Self {
        self.stages.push(next);
        self
    }

    pub fn stages(&self) -> &[CommandSpec] {
        &self.stages
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }
}

impl From<CommandSpec> for PipelineRequest {
    fn from(spec: CommandSpec) -> Self {
        Self::new(vec![spec])
    }
}

impl fmt::Display for PipelineRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self.stages.iter().map(ToString::to_string).collect();
        f.write_str(&rendered.join(" | "))
    }
}

/// Outcome of a single stage.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    pub stage: usize,
    pub command: Vec<String>,
    pub exit_code: i32,
    pub failed: bool,
    /// Lines forwarded to the observer. Always zero for non-final stages.
    pub lines: usize,
}

/// Outcome of a whole pipeline run.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineReport {
    pub stages: Vec<ExecutionResult>,
}

impl PipelineReport {
    pub fn lines(&self) -> usize {
        self.stages.iter().map(|s| s.lines).sum()
    }
}

// ============================================================================
// Observers
// ============================================================================

/// Sink for the lines a pipeline produces.
pub trait LineObserver {
    fn on_line(&mut self, line: &str);

    /// Called right before a stage is spawned.
    fn on_stage_start(&mut self, _stage: usize, _command: &CommandSpec) {}
}

/// Observer that keeps every forwarded line in memory.
#[derive(Debug, Default)]
pub struct LineCollector {
    pub lines: Vec<String>,
    pub started: Vec<usize>,
}

impl LineCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_text(self) -> String {
        self.lines.join("\n")
    }
}

impl LineObserver for LineCollector {
    fn on_line(&mut self, line: &str) {
        self.lines.push(line.to_string());
    }

    fn on_stage_start(&mut self, stage: usize, _command: &CommandSpec) {
        self.started.push(stage);
    }
}

// ============================================================================
// Options
// ============================================================================

/// Shared cancellation flag. Clones observe the same state.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Underlying flag, for registration with signal handlers.
    pub fn flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.0)
    }
}

/// What happens to child stderr.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StderrMode {
    /// Read concurrently, log at debug level, keep a tail for error details.
    #[default]
    Drain,
    /// Forward final-stage stderr to the observer with a `[stderr] ` prefix.
    Merge,
}

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub working_dir: Option<PathBuf>,
    pub cancel: Option<CancelToken>,
    pub timeout: Option<Duration>,
    pub stderr: StderrMode,
}

impl RunOptions {
    pub fn in_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_stderr(mut self, mode: StderrMode) -> Self {
        self.stderr = mode;
        self
    }
}

// ============================================================================
// Line iteration
// ============================================================================

/// Lazy line iterator over a buffered reader.
///
/// Yields raw lines including their terminator; invalid UTF-8 is replaced.
/// Reads one line at a time, so a slow consumer blocks the writer through
/// ordinary pipe backpressure.
pub struct Lines<R> {
    reader: R,
    buf: Vec<u8>,
}

pub fn lines<R: BufRead>(reader: R) -> Lines<R> {
    Lines {
        reader,
        buf: Vec::new(),
    }
}

impl<R: BufRead> Iterator for Lines<R> {
    type Item = io::Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        self.buf.clear();
        match self.reader.read_until(b'\n', &mut self.buf) {
            Ok(0) => None,
            Ok(_) => Some(Ok(String::from_utf8_lossy(&self.buf).into_owned())),
            Err(e) => Some(Err(e)),
        }
    }
}

/// Strip the terminator and drop lines that carried nothing else.
pub fn forwardable(raw: &str) -> Option<&str> {
    let line = raw.strip_suffix('\n').unwrap_or(raw);
    let line = line.strip_suffix('\r').unwrap_or(line);
    if line.is_empty() {
        None
    } else {
        Some(line)
    }
}

// ============================================================================
// Execution
// ============================================================================

/// Run one pipeline to completion.
///
/// Returns after every stage exited zero, or with the first failure. An empty
/// pipeline is a no-op.
///
/// Non-final stages are spooled to disk until they exit, so they get no
/// backpressure and must terminate on their own: `yes | head -1` never
/// finishes. Use a timeout for producers that might not.
pub fn run(
    pipeline: &PipelineRequest,
    options: &RunOptions,
    observer: &mut dyn LineObserver,
) -> Result<PipelineReport> {
    let mut report = PipelineReport::default();
    if pipeline.is_empty() {
        return Ok(report);
    }

    debug!(pipeline = %pipeline, "executing pipeline");

    let deadline = options.timeout.map(|t| Instant::now() + t);
    let last = pipeline.len() - 1;
    let mut next_input: Option<File> = None;

    for (index, spec) in pipeline.stages().iter().enumerate() {
        if let Some(token) = &options.cancel {
            if token.is_cancelled() {
                return Err(cancelled(index, spec, StopReason::Cancelled));
            }
        }

        let stage = Stage {
            index,
            spec,
            is_last: index == last,
            deadline,
        };
        let (result, spool) = stage.execute(next_input.take(), options, observer)?;
        report.stages.push(result);
        next_input = spool;
    }

    Ok(report)
}

/// Run pipelines one after another, stopping at the first failure.
pub fn run_many(
    pipelines: &[PipelineRequest],
    options: &RunOptions,
    observer: &mut dyn LineObserver,
) -> Result<Vec<PipelineReport>> {
    let mut reports = Vec::with_capacity(pipelines.len());
    for pipeline in pipelines {
        reports.push(run(pipeline, options, observer)?);
    }
    Ok(reports)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StopReason {
    Cancelled,
    Timeout,
}

impl StopReason {
    fn as_str(&self) -> &'static str {
        match self {
            StopReason::Cancelled => "cancelled",
            StopReason::Timeout => "timeout",
        }
    }
}

fn cancelled(index: usize, spec: &CommandSpec, reason: StopReason) -> Error {
    Error::cancelled(CancelledDetails {
        command: spec.tokens().to_vec(),
        stage: index,
        reason: reason.as_str().to_string(),
    })
}

struct Stage<'a> {
    index: usize,
    spec: &'a CommandSpec,
    is_last: bool,
    deadline: Option<Instant>,
}

impl Stage<'_> {
    /// Spawn, stream, reap. Returns the spool holding this stage's stdout when
    /// it is not the final stage.
    fn execute(
        &self,
        input: Option<File>,
        options: &RunOptions,
        observer: &mut dyn LineObserver,
    ) -> Result<(ExecutionResult, Option<File>)> {
        let mut command = Command::new(self.spec.program());
        command.args(self.spec.args());
        if let Some(dir) = &options.working_dir {
            command.current_dir(dir);
        }

        command.stdin(match input {
            Some(file) => Stdio::from(file),
            None => Stdio::inherit(),
        });

        let spool = if self.is_last {
            command.stdout(Stdio::piped());
            None
        } else {
            let spool = tempfile::tempfile()
                .map_err(|e| Error::internal_io(e.to_string(), Some("create spool".to_string())))?;
            let writer = spool
                .try_clone()
                .map_err(|e| Error::internal_io(e.to_string(), Some("clone spool".to_string())))?;
            command.stdout(Stdio::from(writer));
            Some(spool)
        };
        command.stderr(Stdio::piped());

        observer.on_stage_start(self.index, self.spec);
        debug!(stage = self.index, command = %self.spec, "executing command");

        let mut child = command
            .spawn()
            .map_err(|e| Error::spawn_failed(self.spec.program(), self.index, &e))?;
        drop(command);

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let child = Arc::new(Mutex::new(child));
        let watchdog = Watchdog::start(Arc::clone(&child), options.cancel.clone(), self.deadline);

        let merge = self.is_last && options.stderr == StderrMode::Merge;
        let (tx, rx) = mpsc::sync_channel(STREAM_BUFFER);
        if let Some(out) = stdout {
            forward_lines(out, tx.clone(), Stream::Out);
        }
        let drain = match stderr {
            Some(err) if merge => {
                forward_lines(err, tx.clone(), Stream::Err);
                None
            }
            Some(err) => Some(drain_stderr(err, self.index)),
            None => None,
        };
        drop(tx);

        let streamed = pump(rx, observer, watchdog.as_ref());

        // Waiting must not hold the lock the watchdog needs to kill the child.
        let status = wait_child(&child, watchdog.is_some());
        let stop = watchdog.and_then(Watchdog::finish);

        if let Some(reason) = stop {
            // Readers stay blocked while the stage's own children hold its
            // pipes. They are detached rather than joined.
            warn!(stage = self.index, command = %self.spec, reason = reason.as_str(), "command stopped");
            return Err(cancelled(self.index, self.spec, reason));
        }

        let status = status.map_err(|e| {
            Error::internal_io(e.to_string(), Some(format!("wait for {}", self.spec.program())))
        })?;

        if let Some(e) = streamed.read_error {
            return Err(Error::internal_io(
                e.to_string(),
                Some(format!("read output of {}", self.spec.program())),
            ));
        }

        let forwarded = streamed.forwarded;
        let stderr_tail = match drain {
            Some(handle) => join_drain(handle),
            None => streamed.tail,
        };

        let exit_code = exit_code(status);
        if !status.success() {
            error!(stage = self.index, command = %self.spec, exit_code, "command failed");
            return Err(Error::command_failed(CommandFailedDetails {
                command: self.spec.tokens().to_vec(),
                stage: self.index,
                exit_code,
                stderr_tail,
            }));
        }

        let spool = match spool {
            Some(mut file) => {
                file.seek(SeekFrom::Start(0)).map_err(|e| {
                    Error::internal_io(e.to_string(), Some("rewind spool".to_string()))
                })?;
                Some(file)
            }
            None => None,
        };

        Ok((
            ExecutionResult {
                stage: self.index,
                command: self.spec.tokens().to_vec(),
                exit_code,
                failed: false,
                lines: forwarded,
            },
            spool,
        ))
    }
}

enum Stream {
    Out(io::Result<String>),
    Err(io::Result<String>),
}

/// Read `reader` line by line on a detached thread. Stops once the receiver
/// is gone.
fn forward_lines<R: Read + Send + 'static>(
    reader: R,
    tx: SyncSender<Stream>,
    wrap: fn(io::Result<String>) -> Stream,
) {
    thread::spawn(move || {
        for line in lines(BufReader::new(reader)) {
            if tx.send(wrap(line)).is_err() {
                break;
            }
        }
    });
}

#[derive(Default)]
struct Streamed {
    forwarded: usize,
    read_error: Option<io::Error>,
    tail: Vec<String>,
}

/// Hand lines to the observer until every reader is done or the watchdog
/// has stopped the stage.
fn pump(
    rx: Receiver<Stream>,
    observer: &mut dyn LineObserver,
    watchdog: Option<&Watchdog>,
) -> Streamed {
    let mut streamed = Streamed::default();
    let mut tail = VecDeque::with_capacity(STDERR_TAIL);

    loop {
        if watchdog.is_some_and(Watchdog::fired) {
            break;
        }
        let message = match rx.recv_timeout(POLL_INTERVAL) {
            Ok(message) => message,
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        };

        match message {
            Stream::Out(Ok(raw)) => {
                if let Some(line) = forwardable(&raw) {
                    observer.on_line(line);
                    streamed.forwarded += 1;
                }
            }
            Stream::Err(Ok(raw)) => {
                if let Some(line) = forwardable(&raw) {
                    observer.on_line(&format!("[stderr] {}", line));
                    streamed.forwarded += 1;
                    push_tail(&mut tail, line);
                }
            }
            Stream::Out(Err(e)) | Stream::Err(Err(e)) => {
                streamed.read_error.get_or_insert(e);
            }
        }
    }

    streamed.tail = tail.into_iter().collect();
    streamed
}

fn drain_stderr<R: Read + Send + 'static>(stderr: R, stage: usize) -> JoinHandle<Vec<String>> {
    thread::spawn(move || {
        let mut tail = VecDeque::with_capacity(STDERR_TAIL);
        for line in lines(BufReader::new(stderr)) {
            let Ok(raw) = line else { break };
            if let Some(line) = forwardable(&raw) {
                debug!(stage, "stderr: {}", line);
                push_tail(&mut tail, line);
            }
        }
        tail.into_iter().collect()
    })
}

fn join_drain(handle: JoinHandle<Vec<String>>) -> Vec<String> {
    handle.join().unwrap_or_default()
}

fn push_tail(tail: &mut VecDeque<String>, line: &str) {
    if tail.len() == STDERR_TAIL {
        tail.pop_front();
    }
    tail.push_back(line.to_string());
}

fn wait_child(child: &Mutex<Child>, watched: bool) -> io::Result<ExitStatus> {
    if !watched {
        return child.lock().unwrap_or_else(PoisonError::into_inner).wait();
    }
    loop {
        if let Some(status) = child
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .try_wait()?
        {
            return Ok(status);
        }
        thread::sleep(POLL_INTERVAL);
    }
}

#[cfg(unix)]
fn exit_code(status: ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    status
        .code()
        .or_else(|| status.signal().map(|sig| 128 + sig))
        .unwrap_or(-1)
}

#[cfg(not(unix))]
fn exit_code(status: ExitStatus) -> i32 {
    status.code().unwrap_or(-1)
}

/// Kills a stage's child when the cancel token fires or the deadline passes.
struct Watchdog {
    stop: mpsc::Sender<()>,
    fired: Arc<AtomicBool>,
    handle: JoinHandle<Option<StopReason>>,
}

impl Watchdog {
    fn start(
        child: Arc<Mutex<Child>>,
        cancel: Option<CancelToken>,
        deadline: Option<Instant>,
    ) -> Option<Self> {
        if cancel.is_none() && deadline.is_none() {
            return None;
        }

        let (stop, stop_rx) = mpsc::channel::<()>();
        let fired = Arc::new(AtomicBool::new(false));
        let fired_flag = Arc::clone(&fired);
        let handle = thread::spawn(move || loop {
            match stop_rx.recv_timeout(POLL_INTERVAL) {
                Ok(()) | Err(RecvTimeoutError::Disconnected) => return None,
                Err(RecvTimeoutError::Timeout) => {}
            }

            let reason = if cancel.as_ref().is_some_and(CancelToken::is_cancelled) {
                StopReason::Cancelled
            } else if deadline.is_some_and(|d| Instant::now() >= d) {
                StopReason::Timeout
            } else {
                continue;
            };

            let mut child = child.lock().unwrap_or_else(PoisonError::into_inner);
            // Exited before the deadline was noticed: the stage finished.
            if let Ok(Some(_)) = child.try_wait() {
                return None;
            }
            if let Err(e) = child.kill() {
                debug!("kill after {} failed: {}", reason.as_str(), e);
            }
            fired_flag.store(true, Ordering::SeqCst);
            return Some(reason);
        });

        Some(Self {
            stop,
            fired,
            handle,
        })
    }

    fn fired(&self) -> bool {
        self.fired.load(Ordering::SeqCst)
    }

    fn finish(self) -> Option<StopReason> {
        let _ = self.stop.send(());
        self.handle.join().unwrap_or(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_spec_rejects_empty_tokens() {
        let err = CommandSpec::new(Vec::<String>::new()).unwrap_err();
        assert_eq!(err.code.as_str(), "config.invalid_value");
    }

    #[test]
    fn command_spec_rejects_blank_program() {
        let err = CommandSpec::new(["  ", "validate"]).unwrap_err();
        assert_eq!(err.code.as_str(), "config.invalid_value");
    }

    #[test]
    fn command_spec_splits_program_and_args() {
        let spec = CommandSpec::new(["packer", "inspect", "tmpl.json"]).unwrap();
        assert_eq!(spec.program(), "packer");
        assert_eq!(spec.args(), ["inspect", "tmpl.json"]);
    }

    #[test]
    fn command_spec_display_quotes_tokens() {
        let spec = CommandSpec::new(["echo", "hello world"]).unwrap();
        assert_eq!(spec.to_string(), "echo 'hello world'");
    }

    #[test]
    fn pipeline_display_joins_with_pipes() {
        let pipeline = PipelineRequest::from(CommandSpec::new(["printf", "a"]).unwrap())
            .pipe(CommandSpec::new(["tr", "a-z", "A-Z"]).unwrap());
        assert_eq!(pipeline.to_string(), "printf a | tr a-z A-Z");
        assert_eq!(pipeline.len(), 2);
    }

    #[test]
    fn forwardable_drops_bare_terminators() {
        assert_eq!(forwardable("\n"), None);
        assert_eq!(forwardable("\r\n"), None);
        assert_eq!(forwardable(""), None);
    }

    #[test]
    fn forwardable_keeps_whitespace_lines() {
        assert_eq!(forwardable("  \n"), Some("  "));
        assert_eq!(forwardable("\t"), Some("\t"));
        assert_eq!(forwardable("done\r\n"), Some("done"));
        assert_eq!(forwardable("no newline"), Some("no newline"));
    }

    #[test]
    fn lines_yields_incrementally_with_terminators() {
        let input = io::Cursor::new("one\n\ntwo");
        let collected: Vec<String> = lines(input).map(|l| l.unwrap()).collect();
        assert_eq!(collected, vec!["one\n", "\n", "two"]);
    }

    #[test]
    fn push_tail_keeps_only_recent_lines() {
        let mut tail = VecDeque::new();
        for i in 0..(STDERR_TAIL + 5) {
            push_tail(&mut tail, &i.to_string());
        }
        assert_eq!(tail.len(), STDERR_TAIL);
        assert_eq!(tail.front().map(String::as_str), Some("5"));
    }

    #[test]
    fn cancel_token_clones_share_state() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
        assert!(token.flag().load(Ordering::SeqCst));
    }

    #[test]
    fn empty_pipeline_is_noop() {
        let mut observer = LineCollector::new();
        let report = run(&PipelineRequest::default(), &RunOptions::default(), &mut observer).unwrap();
        assert!(report.stages.is_empty());
        assert!(observer.lines.is_empty());
        assert!(observer.started.is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn echo_hello_forwards_one_line() {
        let mut observer = LineCollector::new();
        let pipeline = PipelineRequest::from(CommandSpec::new(["echo", "hello"]).unwrap());
        let report = run(&pipeline, &RunOptions::default(), &mut observer).unwrap();

        assert_eq!(observer.lines, vec!["hello"]);
        assert_eq!(report.stages[0].exit_code, 0);
        assert_eq!(report.lines(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn false_fails_with_exit_code_one() {
        let mut observer = LineCollector::new();
        let pipeline = PipelineRequest::from(CommandSpec::new(["false"]).unwrap());
        let err = run(&pipeline, &RunOptions::default(), &mut observer).unwrap_err();

        assert_eq!(err.code.as_str(), "command.failed");
        assert_eq!(err.exit_code(), Some(1));
        assert_eq!(err.details["stage"], 0);
    }

    #[cfg(unix)]
    #[test]
    fn watchdog_leaves_exited_child_alone() {
        let child = Command::new("true").spawn().unwrap();
        thread::sleep(Duration::from_millis(200));
        let child = Arc::new(Mutex::new(child));

        let watchdog = Watchdog::start(Arc::clone(&child), None, Some(Instant::now())).unwrap();
        thread::sleep(POLL_INTERVAL * 4);

        assert!(!watchdog.fired());
        assert_eq!(watchdog.finish(), None);
        assert!(child.lock().unwrap().wait().unwrap().success());
    }

    #[cfg(unix)]
    #[test]
    fn watchdog_kills_running_child_on_cancel() {
        let child = Command::new("sleep").arg("5").spawn().unwrap();
        let child = Arc::new(Mutex::new(child));
        let token = CancelToken::new();
        token.cancel();

        let watchdog = Watchdog::start(Arc::clone(&child), Some(token), None).unwrap();
        let status = wait_child(&child, true).unwrap();

        assert!(!status.success());
        assert_eq!(watchdog.finish(), Some(StopReason::Cancelled));
    }

    #[cfg(unix)]
    #[test]
    fn missing_program_is_spawn_error() {
        let mut observer = LineCollector::new();
        let pipeline =
            PipelineRequest::from(CommandSpec::new(["inframate-no-such-binary-xyz"]).unwrap());
        let err = run(&pipeline, &RunOptions::default(), &mut observer).unwrap_err();

        assert_eq!(err.code.as_str(), "command.spawn_failed");
        assert_eq!(observer.started, vec![0]);
    }
}
