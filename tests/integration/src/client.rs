//! WebSocket test client speaking the gateway protocol

use std::time::Duration;

use anyhow::{bail, Context, Result};
use futures_util::{SinkExt, StreamExt};
use relay_core::ChatMessage;
use relay_gateway::protocol::{GatewayMessage, OpCode, EVENT_MESSAGE, EVENT_READY};
use serde_json::{json, Value};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode as WsCloseCode;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

const RECV_TIMEOUT: Duration = Duration::from_secs(2);

/// What the server sent next
#[derive(Debug)]
pub enum Received {
    Frame(GatewayMessage),
    Closed(Option<u16>),
}

pub struct GatewayClient {
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
    pub heartbeat_interval: u64,
}

impl GatewayClient {
    /// Connect and consume the Hello frame
    pub async fn connect(url: &str) -> Result<Self> {
        let (ws, _) = connect_async(url).await?;
        let mut client = Self {
            ws,
            heartbeat_interval: 0,
        };

        let hello = client.expect_frame().await?;
        if hello.op != OpCode::Hello {
            bail!("expected Hello, got {hello}");
        }
        client.heartbeat_interval = hello
            .d
            .as_ref()
            .and_then(|d| d["heartbeat_interval"].as_u64())
            .context("Hello without heartbeat_interval")?;

        Ok(client)
    }

    /// Connect and identify as `username`, returning after READY
    pub async fn connect_as(url: &str, token: &str) -> Result<Self> {
        let mut client = Self::connect(url).await?;
        client.identify(token).await?;
        Ok(client)
    }

    pub async fn send_raw(&mut self, text: impl Into<String>) -> Result<()> {
        self.ws.send(Message::Text(text.into())).await?;
        Ok(())
    }

    pub async fn send_op(&mut self, op: OpCode, d: Option<Value>) -> Result<()> {
        let mut frame = json!({ "op": op.as_u8() });
        if let Some(d) = d {
            frame["d"] = d;
        }
        self.send_raw(frame.to_string()).await
    }

    pub async fn identify(&mut self, token: &str) -> Result<Value> {
        self.send_op(OpCode::Identify, Some(json!({ "token": token }))).await?;
        let ready = self.expect_frame().await?;
        if ready.t.as_deref() != Some(EVENT_READY) {
            bail!("expected READY, got {ready}");
        }
        ready.d.context("READY without payload")
    }

    /// Subscribe and wait until the gateway has processed it
    pub async fn subscribe(&mut self, destination: &str) -> Result<()> {
        self.send_op(OpCode::Subscribe, Some(json!({ "destination": destination })))
            .await?;
        self.sync().await
    }

    pub async fn unsubscribe(&mut self, destination: &str) -> Result<()> {
        self.send_op(OpCode::Unsubscribe, Some(json!({ "destination": destination })))
            .await?;
        self.sync().await
    }

    pub async fn send_message(&mut self, message: &ChatMessage) -> Result<()> {
        self.send_op(OpCode::Send, Some(serde_json::to_value(message)?)).await
    }

    /// Round-trip a heartbeat
    ///
    /// Frames are handled in order per connection, so the ack means every
    /// earlier frame has been processed. Fails if anything else arrives first.
    pub async fn sync(&mut self) -> Result<()> {
        self.send_op(OpCode::Heartbeat, None).await?;
        let ack = self.expect_frame().await?;
        if ack.op != OpCode::HeartbeatAck {
            bail!("expected HeartbeatAck, got {ack}");
        }
        Ok(())
    }

    /// Next frame or close, within the receive timeout
    pub async fn recv(&mut self) -> Result<Received> {
        self.recv_within(RECV_TIMEOUT).await
    }

    pub async fn recv_within(&mut self, timeout: Duration) -> Result<Received> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let next = tokio::time::timeout_at(deadline, self.ws.next())
                .await
                .context("timed out waiting for the gateway")?;

            match next {
                Some(Ok(Message::Text(text))) => {
                    return Ok(Received::Frame(GatewayMessage::from_json(&text)?));
                }
                Some(Ok(Message::Close(frame))) => {
                    return Ok(Received::Closed(frame.map(|f| u16::from(f.code))));
                }
                Some(Ok(_)) => continue,
                Some(Err(e)) => return Err(e.into()),
                None => return Ok(Received::Closed(None)),
            }
        }
    }

    pub async fn expect_frame(&mut self) -> Result<GatewayMessage> {
        match self.recv().await? {
            Received::Frame(frame) => Ok(frame),
            Received::Closed(code) => bail!("connection closed with {code:?}"),
        }
    }

    /// Next frame must be a MESSAGE dispatch; returns its payload
    pub async fn expect_message(&mut self) -> Result<Value> {
        let frame = self.expect_frame().await?;
        if frame.op != OpCode::Dispatch || frame.t.as_deref() != Some(EVENT_MESSAGE) {
            bail!("expected MESSAGE, got {frame}");
        }
        frame.d.context("MESSAGE without payload")
    }

    /// Next frame must be an Error; returns its code
    pub async fn expect_error(&mut self) -> Result<String> {
        let frame = self.expect_frame().await?;
        match frame.as_error() {
            Some(error) => Ok(error.code),
            None => bail!("expected Error, got {frame}"),
        }
    }

    /// Nothing arrives within `window`
    pub async fn expect_silence(&mut self, window: Duration) -> Result<()> {
        match self.recv_within(window).await {
            Err(_) => Ok(()),
            Ok(received) => bail!("expected silence, got {received:?}"),
        }
    }

    pub async fn close(mut self) -> Result<()> {
        self.ws
            .close(Some(tokio_tungstenite::tungstenite::protocol::CloseFrame {
                code: WsCloseCode::Normal,
                reason: "bye".into(),
            }))
            .await?;
        Ok(())
    }
}
