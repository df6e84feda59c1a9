//! Stdio bridge to the rendering-engine helper (made by FontLab https://www.fontlab.com/)
//!
//! The actual rendering engine lives in a separate helper process (for
//! example a small node script driving a headless browser). We spawn it
//! and speak newline-delimited JSON over its stdio: one request object
//! per line out, one response object per line back, strictly in order,
//! which matches the strictly sequential session discipline anyway.

use std::process::Stdio;
use std::time::Duration;

use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};

use typm_core::session::{Extent, RenderSession, SessionError};

#[derive(Debug, Serialize)]
#[serde(tag = "op", rename_all = "camelCase", rename_all_fields = "camelCase")]
enum Request<'a> {
    Present { markup: &'a str, timeout_ms: u64 },
    ReadGeometry { selectors: &'a [String] },
    AwaitFontReady {
        family: &'a str,
        size_px: f64,
        timeout_ms: u64,
    },
    Close,
}

#[derive(Debug, Deserialize)]
struct Response {
    ok: bool,
    #[serde(default)]
    error: Option<WireError>,
    #[serde(default)]
    result: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct WireError {
    #[serde(default)]
    kind: String,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct WireExtent {
    width: f64,
    height: f64,
}

/// One spawned helper process implementing the session contract.
pub struct StdioEngine {
    child: Child,
    stdin: ChildStdin,
    stdout: Lines<BufReader<ChildStdout>>,
}

impl StdioEngine {
    /// Spawn the helper. Failing to obtain a session is fatal to the
    /// run, so this returns a hard error.
    pub async fn launch(command: &str, args: &[String]) -> Result<Self> {
        let mut child = Command::new(command)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .spawn()
            .with_context(|| format!("launching rendering engine: {command}"))?;

        let stdin = child
            .stdin
            .take()
            .context("rendering engine has no stdin")?;
        let stdout = child
            .stdout
            .take()
            .context("rendering engine has no stdout")?;

        Ok(Self {
            child,
            stdin,
            stdout: BufReader::new(stdout).lines(),
        })
    }

    async fn call(
        &mut self,
        request: &Request<'_>,
        timeout_hint: Option<Duration>,
    ) -> Result<serde_json::Value, SessionError> {
        let line = serde_json::to_string(request)
            .map_err(|err| SessionError::Engine(format!("encoding request: {err}")))?;

        self.stdin
            .write_all(line.as_bytes())
            .await
            .map_err(|err| SessionError::Engine(format!("writing to engine: {err}")))?;
        self.stdin
            .write_all(b"\n")
            .await
            .map_err(|err| SessionError::Engine(format!("writing to engine: {err}")))?;
        self.stdin
            .flush()
            .await
            .map_err(|err| SessionError::Engine(format!("writing to engine: {err}")))?;

        let reply = self
            .stdout
            .next_line()
            .await
            .map_err(|err| SessionError::Engine(format!("reading from engine: {err}")))?
            .ok_or_else(|| SessionError::Engine("engine closed its stdout".to_string()))?;

        let response: Response = serde_json::from_str(&reply)
            .map_err(|err| SessionError::Engine(format!("malformed engine response: {err}")))?;

        if response.ok {
            return Ok(response.result.unwrap_or(serde_json::Value::Null));
        }

        let error = response.error.unwrap_or(WireError {
            kind: String::new(),
            message: "engine reported failure without detail".to_string(),
        });
        Err(match error.kind.as_str() {
            "presentTimeout" => SessionError::PresentTimeout(timeout_hint.unwrap_or_default()),
            "elementNotFound" => SessionError::ElementNotFound(error.message),
            _ => SessionError::Engine(error.message),
        })
    }
}

impl RenderSession for StdioEngine {
    async fn present(&mut self, markup: &str, load_timeout: Duration) -> Result<(), SessionError> {
        self.call(
            &Request::Present {
                markup,
                timeout_ms: load_timeout.as_millis() as u64,
            },
            Some(load_timeout),
        )
        .await?;
        Ok(())
    }

    async fn read_geometry(
        &mut self,
        selectors: &[String],
    ) -> Result<IndexMap<String, Extent>, SessionError> {
        let value = self
            .call(&Request::ReadGeometry { selectors }, None)
            .await?;
        let wire: IndexMap<String, WireExtent> = serde_json::from_value(value)
            .map_err(|err| SessionError::Engine(format!("malformed geometry: {err}")))?;

        // The helper should have failed already, but enforce the
        // contract locally too.
        for selector in selectors {
            if !wire.contains_key(selector) {
                return Err(SessionError::ElementNotFound(selector.clone()));
            }
        }

        Ok(wire
            .into_iter()
            .map(|(selector, extent)| (selector, Extent::new(extent.width, extent.height)))
            .collect())
    }

    async fn await_font_ready(
        &mut self,
        family: &str,
        size_px: f64,
        max_wait: Duration,
    ) -> Result<bool, SessionError> {
        let value = self
            .call(
                &Request::AwaitFontReady {
                    family,
                    size_px,
                    timeout_ms: max_wait.as_millis() as u64,
                },
                Some(max_wait),
            )
            .await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    async fn close(&mut self) -> Result<(), SessionError> {
        // Best effort: the helper may already be gone.
        let _ = self.call(&Request::Close, None).await;
        match tokio::time::timeout(Duration::from_secs(5), self.child.wait()).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(err)) => Err(SessionError::Engine(format!("waiting for engine: {err}"))),
            Err(_) => {
                self.child
                    .start_kill()
                    .map_err(|err| SessionError::Engine(format!("killing engine: {err}")))?;
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requests_serialize_with_op_tags() {
        let selectors = vec!["#probe-0".to_string()];
        let json =
            serde_json::to_value(Request::ReadGeometry { selectors: &selectors }).expect("encode");
        assert_eq!(json["op"], "readGeometry");
        assert_eq!(json["selectors"][0], "#probe-0");

        let json = serde_json::to_value(Request::Present {
            markup: "<html>",
            timeout_ms: 30_000,
        })
        .expect("encode");
        assert_eq!(json["op"], "present");
        assert_eq!(json["timeoutMs"], 30_000);
    }

    #[test]
    fn error_kinds_map_to_session_errors() {
        let reply = r##"{"ok":false,"error":{"kind":"elementNotFound","message":"#probe-3"}}"##;
        let response: Response = serde_json::from_str(reply).expect("decode");
        assert!(!response.ok);
        let error = response.error.expect("error");
        assert_eq!(error.kind, "elementNotFound");
        assert_eq!(error.message, "#probe-3");
    }
}
