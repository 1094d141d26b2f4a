//! Newline-delimited JSON transport.
//!
//! Events arrive one per line on the input; replies and host commands leave
//! one per line on the output through a single writer task. Fetch events run
//! on their own tasks, so a slow network never holds up other events.

use std::io;
use std::sync::Arc;

use async_trait::async_trait;
use offcache_core::Error;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinSet;

use crate::error::WorkerError;
use crate::events::{Event, Reply};
use crate::handler::{ServiceWorker, error_reply};
use crate::host::Host;
use crate::shortcuts::Shortcut;

/// Cloneable handle for queueing output lines.
#[derive(Clone)]
pub struct Outbound {
    tx: mpsc::UnboundedSender<Reply>,
}

impl Outbound {
    pub fn send(&self, reply: Reply) {
        if self.tx.send(reply).is_err() {
            tracing::warn!("transport closed, dropping reply");
        }
    }
}

pub fn outbound() -> (Outbound, mpsc::UnboundedReceiver<Reply>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (Outbound { tx }, rx)
}

/// Host whose commands are written to the transport as reply lines.
pub struct StdioHost {
    out: Outbound,
    shortcuts: bool,
}

impl StdioHost {
    pub fn new(out: Outbound, shortcuts: bool) -> Self {
        Self { out, shortcuts }
    }
}

#[async_trait]
impl Host for StdioHost {
    async fn skip_waiting(&self) -> Result<(), Error> {
        self.out.send(Reply::SkipWaiting);
        Ok(())
    }

    async fn claim_clients(&self) -> Result<(), Error> {
        self.out.send(Reply::ClaimClients);
        Ok(())
    }

    async fn set_shortcuts(&self, shortcuts: &[Shortcut]) -> Result<(), Error> {
        if !self.shortcuts {
            return Err(Error::HostUnsupported("host has no shortcut support".into()));
        }
        self.out.send(Reply::SetShortcuts { shortcuts: shortcuts.to_vec() });
        Ok(())
    }
}

/// Serve events from `input` until it closes, then finish in-flight fetches
/// and background refreshes and hand back the output.
pub async fn serve<R, W>(
    worker: Arc<ServiceWorker>, out: Outbound, replies: mpsc::UnboundedReceiver<Reply>, input: R, output: W,
) -> Result<W, WorkerError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (close_tx, close_rx) = oneshot::channel();
    let writer = tokio::spawn(write_replies(replies, close_rx, output));

    let mut lines = BufReader::new(input).lines();
    let mut in_flight = JoinSet::new();

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match serde_json::from_str::<Event>(line) {
            Ok(Event::Fetch { id, request }) => {
                let worker = worker.clone();
                let out = out.clone();
                in_flight.spawn(async move {
                    out.send(worker.dispatch(Event::Fetch { id, request }).await);
                });
            }
            Ok(event) => out.send(worker.dispatch(event).await),
            Err(e) => out.send(undecodable(line, &e)),
        }

        while let Some(done) = in_flight.try_join_next() {
            if let Err(e) = done {
                tracing::error!(error = %e, "fetch handler panicked");
            }
        }
    }

    tracing::info!("input closed, finishing in-flight work");
    while let Some(done) = in_flight.join_next().await {
        if let Err(e) = done {
            tracing::error!(error = %e, "fetch handler panicked");
        }
    }
    worker.background().drain().await;

    let _ = close_tx.send(());
    writer.await.map_err(|e| WorkerError::Transport(io::Error::other(e)))?
}

/// Reply for a line that is not a valid [`Event`]. A fetch that carries an
/// id is still answered under that id, so the host never waits on it.
fn undecodable(line: &str, err: &serde_json::Error) -> Reply {
    let value: Option<Value> = serde_json::from_str(line).ok();
    let field = |name: &str| value.as_ref().and_then(|v| v.get(name)).and_then(Value::as_str).map(str::to_string);

    match (field("event").as_deref(), field("id")) {
        (Some("fetch"), Some(id)) => {
            tracing::warn!(%id, error = %err, "undecodable fetch, passing through");
            Reply::Passthrough { id }
        }
        (Some("message"), _) => {
            tracing::warn!(error = %err, "malformed client message");
            error_reply(None, &WorkerError::Core(Error::InvalidMessage(err.to_string())))
        }
        (_, id) => {
            tracing::warn!(error = %err, "undecodable event");
            error_reply(id, &WorkerError::InvalidEvent(err.to_string()))
        }
    }
}

async fn write_replies<W>(
    mut replies: mpsc::UnboundedReceiver<Reply>, mut close: oneshot::Receiver<()>, mut output: W,
) -> Result<W, WorkerError>
where
    W: AsyncWrite + Unpin,
{
    loop {
        tokio::select! {
            biased;
            reply = replies.recv() => match reply {
                Some(reply) => write_line(&mut output, &reply).await?,
                None => break,
            },
            _ = &mut close => {
                while let Ok(reply) = replies.try_recv() {
                    write_line(&mut output, &reply).await?;
                }
                break;
            }
        }
    }
    output.flush().await?;
    Ok(output)
}

async fn write_line<W: AsyncWrite + Unpin>(output: &mut W, reply: &Reply) -> Result<(), WorkerError> {
    let mut line = serde_json::to_vec(reply).map_err(|e| WorkerError::Transport(io::Error::other(e)))?;
    line.push(b'\n');
    output.write_all(&line).await?;
    output.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeNetwork, url};
    use offcache_core::{MemoryStorage, Response, RouterConfig};

    async fn run(input: &str, shortcuts: bool) -> Vec<Value> {
        let config = RouterConfig { install_retries: 0, ..Default::default() };
        let network = Arc::new(FakeNetwork::new());
        for asset in &config.assets {
            network.respond(&url(asset), Response::text(200, "asset"));
        }
        let (out, rx) = outbound();
        let host = Arc::new(StdioHost::new(out.clone(), shortcuts));
        let worker =
            Arc::new(ServiceWorker::new(&config, Arc::new(MemoryStorage::new()), network, host).unwrap());

        let output = serve(worker, out, rx, input.as_bytes(), Vec::new()).await.unwrap();
        String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    fn kinds(replies: &[Value]) -> Vec<&str> {
        replies.iter().map(|r| r["reply"].as_str().unwrap()).collect()
    }

    #[tokio::test]
    async fn test_lifecycle_over_stdio() {
        let input = concat!(
            r#"{"event":"install"}"#,
            "\n",
            r#"{"event":"activate"}"#,
            "\n",
            r#"{"event":"message","data":{"type":"SKIP_WAITING"}}"#,
            "\n",
        );

        let replies = run(input, true).await;

        assert_eq!(
            kinds(&replies),
            vec!["skip_waiting", "installed", "claim_clients", "activated", "skip_waiting", "ack"]
        );
        assert_eq!(replies[1]["cache"], "recorder-cache-v1");
        assert!(replies[1]["failed"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_fetches_over_stdio() {
        let input = concat!(
            r#"{"event":"install"}"#,
            "\n",
            r#"{"event":"activate"}"#,
            "\n",
            r#"{"event":"fetch","id":"a","request":{"url":"http://localhost:8000/static/js/app.js"}}"#,
            "\n",
            r#"{"event":"fetch","id":"b","request":"#,
            r#"{"method":"POST","url":"http://localhost:8000/api/upload","body_hex":"00ff"}}"#,
            "\n",
        );

        let replies = run(input, true).await;

        let asset = replies.iter().find(|r| r["id"] == "a").unwrap();
        assert_eq!(asset["reply"], "response");
        assert_eq!(asset["route"], "asset");
        assert_eq!(asset["response"]["status"], 200);
        assert_eq!(asset["response"]["body_hex"], hex_of("asset"));

        let upload = replies.iter().find(|r| r["id"] == "b").unwrap();
        assert_eq!(upload["reply"], "passthrough");
    }

    #[tokio::test]
    async fn test_bad_lines_get_error_replies() {
        let input = "not json\n\n{\"event\":\"teleport\"}\n";

        let replies = run(input, true).await;

        assert_eq!(kinds(&replies), vec!["error", "error"]);
        assert_eq!(replies[0]["code"], -32700);
    }

    #[tokio::test]
    async fn test_every_fetch_is_answered_under_its_id() {
        let input = concat!(
            r#"{"event":"install"}"#,
            "\n",
            r#"{"event":"activate"}"#,
            "\n",
            r#"{"event":"fetch","id":"ws1","request":{"url":"http://localhost:8000/live","mode":"websocket"}}"#,
            "\n",
            r#"{"event":"fetch","id":"bad1","request":{"url":"not a url"}}"#,
            "\n",
        );

        let replies = run(input, true).await;

        for id in ["ws1", "bad1"] {
            let reply = replies.iter().find(|r| r["id"] == id).unwrap_or_else(|| panic!("{id} unanswered"));
            assert_eq!(reply["reply"], "passthrough");
        }
    }

    #[tokio::test]
    async fn test_malformed_message_is_invalid_message() {
        let input = concat!(r#"{"event":"message","data":{"type":"UPDATE_SHORTCUTS","shortcuts":"standup"}}"#, "\n");

        let replies = run(input, true).await;

        assert_eq!(kinds(&replies), vec!["error"]);
        assert_eq!(replies[0]["code"], -32600);
        assert!(replies[0]["message"].as_str().unwrap().starts_with("INVALID_MESSAGE"));
    }

    #[tokio::test]
    async fn test_shortcuts_over_stdio() {
        let input = concat!(
            r#"{"event":"message","data":{"type":"UPDATE_SHORTCUTS","#,
            r#""shortcuts":[{"name":"Standup","url":"/recordings/1"}]}}"#,
            "\n",
        );

        let replies = run(input, true).await;
        assert_eq!(kinds(&replies), vec!["set_shortcuts", "ack"]);
        assert_eq!(replies[0]["shortcuts"].as_array().unwrap().len(), 3);

        let replies = run(input, false).await;
        assert_eq!(kinds(&replies), vec!["ack"]);
    }

    fn hex_of(s: &str) -> String {
        s.bytes().map(|b| format!("{b:02x}")).collect()
    }
}
