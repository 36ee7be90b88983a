//! External-command arbiter.
//!
//! [`CommandArbiter`] writes a plain-text selection prompt to a command's
//! stdin and expects a 1-based position on stdout. Any LLM command-line
//! client that reads a prompt from stdin works, e.g.
//! `["llm", "-m", "claude-3.5-haiku"]`.
//!
//! The command runs under its own deadline and is killed when it passes,
//! so a slow arbiter never outlives the selection that consulted it.

use crate::error::ArbiterError;
use crate::normalize::Candidate;
use crate::request::ParsedRequest;
use crate::selection::Arbiter;
use lazy_static::lazy_static;
use regex::Regex;
use std::fmt::Write as _;
use std::io::{self, Read, Write as _};
use std::process::{Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

lazy_static! {
    static ref FIRST_NUMBER: Regex = Regex::new(r"\d+").expect("valid number pattern");
}

/// How often a running command is checked for exit.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Default deadline, matching the selection policy's arbiter timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandArbiter {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandArbiter {
    pub fn new(program: impl Into<String>, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Build from a full argv. `None` when `argv` is empty.
    #[must_use]
    pub fn from_argv(argv: &[String]) -> Option<Self> {
        let (program, args) = argv.split_first()?;
        Some(Self::new(program.clone(), args.iter().cloned()))
    }

    /// Kill the command and report [`ArbiterError::Timeout`] after `timeout`.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run the command with `prompt` on stdin until it exits or the
    /// deadline passes. Returns exit status, stdout and stderr.
    fn run(&self, prompt: &str) -> Result<(ExitStatus, Vec<u8>, Vec<u8>), ArbiterError> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| ArbiterError::Unavailable(format!("failed to run {}: {e}", self.program)))?;

        if let Some(mut stdin) = child.stdin.take() {
            match stdin.write_all(prompt.as_bytes()) {
                // The command may answer without reading its input.
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {}
                Err(e) => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(ArbiterError::Unavailable(format!("failed to write prompt: {e}")));
                }
            }
        }

        let stdout = child.stdout.take().map(drain);
        let stderr = child.stderr.take().map(drain);

        let deadline = Instant::now() + self.timeout;
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) if Instant::now() >= deadline => {
                    log::warn!("{} gave no answer within {:?}; killing it", self.program, self.timeout);
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(ArbiterError::Timeout(self.timeout));
                }
                Ok(None) => thread::sleep(POLL_INTERVAL),
                Err(e) => {
                    let _ = child.kill();
                    return Err(ArbiterError::Unavailable(format!("{} did not finish: {e}", self.program)));
                }
            }
        };

        Ok((status, collect(stdout), collect(stderr)))
    }
}

/// Read a pipe to the end on its own thread so a chatty command cannot
/// block on a full pipe while it is being polled.
fn drain(mut source: impl Read + Send + 'static) -> JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buffer = Vec::new();
        let _ = source.read_to_end(&mut buffer);
        buffer
    })
}

fn collect(reader: Option<JoinHandle<Vec<u8>>>) -> Vec<u8> {
    reader.and_then(|handle| handle.join().ok()).unwrap_or_default()
}

impl Arbiter for CommandArbiter {
    fn select(&self, request: &ParsedRequest, candidates: &[Candidate]) -> Result<usize, ArbiterError> {
        let prompt = selection_prompt(request, candidates);
        log::debug!("Asking {} to choose among {} candidates", self.program, candidates.len());

        let (status, stdout, stderr) = self.run(&prompt)?;
        if !status.success() {
            let stderr = String::from_utf8_lossy(&stderr);
            return Err(ArbiterError::Unavailable(format!(
                "{} exited with {status}: {}",
                self.program,
                stderr.trim()
            )));
        }

        parse_position(&String::from_utf8_lossy(&stdout), candidates.len())
    }
}

/// Prompt listing the shortlist as numbered lines.
#[must_use]
pub fn selection_prompt(request: &ParsedRequest, candidates: &[Candidate]) -> String {
    let artist = request.artist().unwrap_or("any artist");
    let preferences = if request.preferences().is_empty() {
        "none".to_string()
    } else {
        request
            .preferences()
            .iter()
            .map(|p| p.describe())
            .collect::<Vec<_>>()
            .join(", ")
    };

    let mut prompt = String::new();
    let _ = writeln!(prompt, "You are helping pick the best track from music search results.");
    let _ = writeln!(prompt);
    let _ = writeln!(prompt, "TARGET SONG: \"{}\" by {artist}", request.title());
    if let Some(album) = request.album() {
        let _ = writeln!(prompt, "TARGET ALBUM: {album}");
    }
    let _ = writeln!(prompt, "PREFERENCES: {preferences}");
    let _ = writeln!(prompt);
    let _ = writeln!(prompt, "SEARCH RESULTS:");
    for (i, candidate) in candidates.iter().enumerate() {
        let _ = writeln!(prompt, "{}. {} - {} - {}", i + 1, candidate.title, candidate.artist, candidate.album);
    }
    let _ = writeln!(prompt);
    let _ = writeln!(prompt, "- Match the exact song title, not similarly named songs.");
    let _ = writeln!(prompt, "- Prefer the requested artist over covers and tributes.");
    let _ = writeln!(prompt, "- Look for \"Live\", \"Acoustic\" or \"Unplugged\" in titles and albums when a version is requested.");
    let _ = writeln!(prompt, "- Without a version preference, prefer the original album over compilations.");
    let _ = writeln!(prompt);
    let _ = writeln!(
        prompt,
        "Which position number (1-{}) best matches the request? Answer with the number only.",
        candidates.len()
    );
    prompt
}

/// Read a 1-based position from an arbiter reply and return it 0-based.
///
/// # Errors
///
/// `InvalidResponse` when the reply holds no number or the number is outside
/// `1..=count`.
pub fn parse_position(reply: &str, count: usize) -> Result<usize, ArbiterError> {
    let digits = FIRST_NUMBER
        .find(reply)
        .ok_or_else(|| ArbiterError::InvalidResponse(format!("no position in reply {:?}", reply.trim())))?;

    let position: usize = digits
        .as_str()
        .parse()
        .map_err(|_| ArbiterError::InvalidResponse(format!("unreadable position {:?}", digits.as_str())))?;

    if position == 0 || position > count {
        return Err(ArbiterError::InvalidResponse(format!(
            "position {position} outside 1-{count}"
        )));
    }
    Ok(position - 1)
}
