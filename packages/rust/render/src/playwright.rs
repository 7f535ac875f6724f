//! Headless-Chromium renderer driven through a Node.js Playwright script.
//!
//! Rust writes one JSON request to the script's stdin and reads one JSON reply
//! from stdout. The PDF itself goes through a temp file, never through the pipe.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::{debug, instrument, warn};
use url::Url;

use askweb_shared::{AskWebError, RenderConfig, Result};

use crate::PageRenderer;
use crate::options::PrintOptions;

/// Playwright driver. Images are blocked; a network-idle timeout is expected
/// on busy pages and the page is printed anyway.
const SCRIPT: &str = r#"
const fs = require('fs');
const reply = (obj) => process.stdout.write(JSON.stringify(obj));
const fail = (message) => reply({ ok: false, error: String(message) });

async function main() {
  let req;
  try { req = JSON.parse(fs.readFileSync(0, 'utf8')); }
  catch (e) { return fail('invalid render request: ' + e.message); }

  let pw;
  try { pw = require('playwright'); }
  catch (_) { return fail('playwright is not installed (npm i -g playwright && npx playwright install chromium)'); }

  let browser;
  try {
    browser = await pw.chromium.launch({
      headless: true,
      args: ['--disable-gpu', '--no-sandbox', '--disable-dev-shm-usage', '--window-size=1920,1080'],
    });
    const page = await browser.newPage();
    await page.route('**/*', (route) =>
      route.request().resourceType() === 'image' ? route.abort() : route.continue());
    await page.goto(req.source, { waitUntil: 'domcontentloaded' });

    let settled = true;
    try { await page.waitForLoadState('networkidle', { timeout: req.timeout_ms }); }
    catch (_) { settled = false; }

    await page.pdf({ ...req.options, path: req.target });
    reply({ ok: true, settled });
  } catch (e) {
    fail(e && e.message ? e.message : e);
  } finally {
    try { if (browser) await browser.close(); } catch (_) {}
  }
}

main().catch(fail);
"#;

// ---------------------------------------------------------------------------
// Protocol types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct RenderRequest<'a> {
    source: &'a str,
    target: &'a str,
    timeout_ms: u64,
    options: &'a PrintOptions,
}

#[derive(Debug, Deserialize)]
struct RenderReply {
    ok: bool,
    #[serde(default)]
    settled: bool,
    #[serde(default)]
    error: Option<String>,
}

// ---------------------------------------------------------------------------
// PlaywrightRenderer
// ---------------------------------------------------------------------------

/// Renders URLs and local HTML files to PDF with headless Chromium.
#[derive(Debug, Clone)]
pub struct PlaywrightRenderer {
    node_cmd: String,
    hard_timeout_grace: Duration,
}

impl PlaywrightRenderer {
    pub fn new(config: &RenderConfig) -> Self {
        Self {
            node_cmd: config.node_cmd.clone(),
            hard_timeout_grace: Duration::from_secs(config.hard_timeout_grace_secs),
        }
    }

    async fn run_script(&self, request: &RenderRequest<'_>, hard_timeout: Duration) -> Result<()> {
        let payload = serde_json::to_vec(request)
            .map_err(|e| AskWebError::Render(format!("failed to encode render request: {e}")))?;

        let mut child = tokio::process::Command::new(&self.node_cmd)
            .arg("-e")
            .arg(SCRIPT)
            .kill_on_drop(true)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                AskWebError::Render(format!(
                    "failed to spawn '{}' (Node.js with the playwright package is required): {e}",
                    self.node_cmd
                ))
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            // A failed write surfaces as an "invalid render request" reply.
            let _ = stdin.write_all(&payload).await;
            let _ = stdin.shutdown().await;
        }

        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| AskWebError::Render("renderer stdout not captured".into()))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| AskWebError::Render("renderer stderr not captured".into()))?;

        let stdout_task = tokio::spawn(async move {
            let mut buf = Vec::new();
            let _ = stdout.read_to_end(&mut buf).await;
            buf
        });
        let stderr_task = tokio::spawn(async move {
            let mut buf = Vec::new();
            let _ = stderr.read_to_end(&mut buf).await;
            buf
        });

        let status = match tokio::time::timeout(hard_timeout, child.wait()).await {
            Ok(status) => status
                .map_err(|e| AskWebError::Render(format!("renderer process failed: {e}")))?,
            Err(_) => {
                let _ = child.kill().await;
                let _ = child.wait().await;
                stdout_task.abort();
                stderr_task.abort();
                return Err(AskWebError::Render(format!(
                    "renderer exceeded hard timeout of {}s",
                    hard_timeout.as_secs()
                )));
            }
        };

        let stdout = stdout_task.await.unwrap_or_default();
        let stderr = stderr_task.await.unwrap_or_default();

        let reply = parse_reply(&stdout).map_err(|e| {
            let tail = stderr_tail(&stderr);
            AskWebError::Render(format!("{e} (exit status {status}; stderr: {tail})"))
        })?;

        if !reply.ok {
            return Err(AskWebError::Render(
                reply.error.unwrap_or_else(|| "renderer reported failure".into()),
            ));
        }
        if !reply.settled {
            debug!("network did not go idle before the wait timeout, printed anyway");
        }
        Ok(())
    }
}

impl PageRenderer for PlaywrightRenderer {
    #[instrument(skip_all, fields(source = %source))]
    async fn render(
        &self,
        source: &str,
        timeout: Duration,
        options: &PrintOptions,
    ) -> Result<Vec<u8>> {
        let source = resolve_source(source)?;

        let target = tempfile::Builder::new()
            .prefix("askweb-render-")
            .suffix(".pdf")
            .tempfile()
            .map_err(|e| AskWebError::Render(format!("failed to create temp file: {e}")))?;
        let target_path = target.path().to_string_lossy().into_owned();

        let request = RenderRequest {
            source: &source,
            target: &target_path,
            timeout_ms: duration_ms(timeout),
            options,
        };

        self.run_script(&request, timeout + self.hard_timeout_grace)
            .await?;

        let bytes = std::fs::read(target.path())
            .map_err(|e| AskWebError::io(target.path(), e))?;
        if bytes.is_empty() {
            warn!("renderer produced an empty PDF");
            return Err(AskWebError::Render(format!("empty PDF for {source}")));
        }

        debug!(bytes = bytes.len(), "page rendered");
        Ok(bytes)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Turn a local file path into a `file://` URL; anything else passes through.
fn resolve_source(source: &str) -> Result<String> {
    let path = Path::new(source);
    if !path.exists() {
        return Ok(source.to_string());
    }

    let absolute = path
        .canonicalize()
        .map_err(|e| AskWebError::io(path, e))?;
    Url::from_file_path(&absolute)
        .map(String::from)
        .map_err(|()| AskWebError::validation(format!("cannot build file URL for {absolute:?}")))
}

fn parse_reply(stdout: &[u8]) -> Result<RenderReply> {
    let text = String::from_utf8_lossy(stdout);
    let line = text.trim();
    if line.is_empty() {
        return Err(AskWebError::Render("renderer produced no reply".into()));
    }
    serde_json::from_str(line)
        .map_err(|e| AskWebError::Render(format!("malformed renderer reply: {e}")))
}

fn stderr_tail(stderr: &[u8]) -> String {
    const MAX: usize = 500;
    let text = String::from_utf8_lossy(stderr);
    let text = text.trim();
    let start = text
        .char_indices()
        .rev()
        .nth(MAX)
        .map(|(i, _)| i)
        .unwrap_or(0);
    text[start..].to_string()
}

fn duration_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
