//! Headless Chrome/Chromium engine.
//!
//! Each session gets its own scratch directory holding the browser profile,
//! the staged HTML and the printed PDF. The browser runs once per render with
//! `--print-to-pdf`; it is killed if it outlives the render timeout, and the
//! directory is removed when the session is dropped.

use std::env;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use tempfile::TempDir;

use super::{EngineSession, RenderEngine, RenderOptions};
use crate::error::RenderError;

/// Executable names tried on `PATH`, in order.
const CANDIDATES: &[&str] = &[
    "google-chrome-stable",
    "google-chrome",
    "chromium",
    "chromium-browser",
    "chrome",
    "headless_shell",
];

/// Well-known install locations outside `PATH`.
const KNOWN_LOCATIONS: &[&str] = &[
    "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
    "/Applications/Chromium.app/Contents/MacOS/Chromium",
    r"C:\Program Files\Google\Chrome\Application\chrome.exe",
];

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// A discovered Chrome/Chromium installation.
#[derive(Debug, Clone)]
pub struct ChromeEngine {
    binary: PathBuf,
    sandbox: bool,
}

impl ChromeEngine {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            sandbox: true,
        }
    }

    /// Locate a browser: `explicit` first, then `CHROME_PATH`, then `PATH`,
    /// then well-known install locations.
    pub fn discover(explicit: Option<&Path>) -> Result<Self, RenderError> {
        if let Some(path) = explicit {
            return if path.is_file() {
                Ok(Self::new(path))
            } else {
                Err(RenderError::EngineNotFound)
            };
        }
        if let Some(path) = env::var_os("CHROME_PATH").map(PathBuf::from) {
            if path.is_file() {
                return Ok(Self::new(path));
            }
            log::warn!("CHROME_PATH={} is not a file; searching PATH", path.display());
        }
        let on_path = env::var_os("PATH").and_then(|paths| {
            env::split_paths(&paths).find_map(|dir| {
                CANDIDATES
                    .iter()
                    .map(|name| dir.join(name))
                    .find(|candidate| candidate.is_file())
            })
        });
        on_path
            .or_else(|| {
                KNOWN_LOCATIONS
                    .iter()
                    .map(PathBuf::from)
                    .find(|p| p.is_file())
            })
            .map(Self::new)
            .ok_or(RenderError::EngineNotFound)
    }

    /// Disable the browser sandbox (needed when running as root in
    /// containers).
    pub fn without_sandbox(mut self) -> Self {
        self.sandbox = false;
        self
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }
}

impl RenderEngine for ChromeEngine {
    fn name(&self) -> &'static str {
        "chrome"
    }

    fn launch(&self) -> Result<Box<dyn EngineSession>, RenderError> {
        let dir = tempfile::Builder::new()
            .prefix("cookbook-forge-")
            .tempdir()
            .map_err(|source| RenderError::Launch {
                engine: "chrome",
                source,
            })?;
        log::debug!("chrome session scratch dir {}", dir.path().display());
        Ok(Box::new(ChromeSession {
            binary: self.binary.clone(),
            sandbox: self.sandbox,
            dir,
            child: None,
        }))
    }
}

struct ChromeSession {
    binary: PathBuf,
    sandbox: bool,
    dir: TempDir,
    child: Option<Child>,
}

impl ChromeSession {
    fn command(&self, input: &Path, output: &Path) -> Command {
        let mut cmd = Command::new(&self.binary);
        cmd.arg("--headless=new")
            .arg("--disable-gpu")
            .arg("--hide-scrollbars")
            .arg("--no-first-run")
            .arg("--no-default-browser-check")
            .arg("--no-pdf-header-footer")
            .arg("--print-to-pdf-no-header")
            .arg("--run-all-compositor-stages-before-draw")
            .arg("--virtual-time-budget=10000")
            .arg(format!(
                "--user-data-dir={}",
                self.dir.path().join("profile").display()
            ))
            .arg(format!("--print-to-pdf={}", output.display()));
        if !self.sandbox {
            cmd.arg("--no-sandbox");
        }
        cmd.arg(input);
        cmd
    }

    fn wait(&mut self, timeout: Duration) -> Result<ExitStatus, RenderError> {
        let started = Instant::now();
        loop {
            let Some(child) = self.child.as_mut() else {
                return Err(RenderError::Failed {
                    code: None,
                    stderr: "browser process was not started".to_string(),
                });
            };
            if let Some(status) = child.try_wait()? {
                self.child = None;
                return Ok(status);
            }
            if started.elapsed() >= timeout {
                self.kill();
                return Err(RenderError::Timeout(timeout));
            }
            thread::sleep(POLL_INTERVAL);
        }
    }

    fn kill(&mut self) {
        if let Some(mut child) = self.child.take() {
            if let Ok(None) = child.try_wait() {
                let _ = child.kill();
            }
            let _ = child.wait();
        }
    }
}

impl EngineSession for ChromeSession {
    fn render(&mut self, markup: &str, options: &RenderOptions) -> Result<Vec<u8>, RenderError> {
        let input = self.dir.path().join("document.html");
        let output = self.dir.path().join("document.pdf");
        let stderr_path = self.dir.path().join("chrome.stderr");

        fs::write(&input, inject_page_rule(markup, options))?;
        let stderr = File::create(&stderr_path)?;

        let mut cmd = self.command(&input, &output);
        cmd.stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::from(stderr));
        let child = cmd.spawn().map_err(|source| RenderError::Launch {
            engine: "chrome",
            source,
        })?;
        self.child = Some(child);

        let status = self.wait(options.timeout)?;
        if !status.success() {
            let stderr = fs::read_to_string(&stderr_path).unwrap_or_default();
            return Err(RenderError::Failed {
                code: status.code(),
                stderr: tail(&stderr, 2000).to_string(),
            });
        }

        let bytes = match fs::read(&output) {
            Ok(bytes) if !bytes.is_empty() => bytes,
            _ => return Err(RenderError::EmptyOutput(output)),
        };
        Ok(bytes)
    }
}

impl Drop for ChromeSession {
    fn drop(&mut self) {
        self.kill();
    }
}

/// Insert an `@page` rule for `options` into the document head so the
/// browser prints at the requested size and margins.
fn inject_page_rule(markup: &str, options: &RenderOptions) -> String {
    let rule = format!("<style>{}</style>\n", options.page_rule());
    match markup.find("</head>") {
        Some(i) => {
            let mut out = String::with_capacity(markup.len() + rule.len());
            out.push_str(&markup[..i]);
            out.push_str(&rule);
            out.push_str(&markup[i..]);
            out
        }
        None => format!("{rule}{markup}"),
    }
}

fn tail(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut start = s.len() - max;
    while !s.is_char_boundary(start) {
        start += 1;
    }
    &s[start..]
}
