use crate::config::Config;
use crate::protocol::RecognizerMessage;
use std::sync::Arc;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;

/// Events from the external speech-recognition process.
///
/// `Result` replaces any earlier transcript for the current session. `Ended`
/// fires whenever the recognizer stops on its own; the controller restarts it
/// while the hold gesture is still active. `Error` carries the platform
/// reason string ("not-allowed" means microphone permission was denied).
#[derive(Debug, Clone, PartialEq)]
pub enum RecognizerEvent {
    Result(String),
    Ended,
    Error(String),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RecognizerCommand {
    Start,
    Stop,
}

pub struct RecognizerBridge {
    socket: Arc<UdpSocket>,
    target_addr: String,
    tx: mpsc::Sender<RecognizerEvent>,
}

// 识别器进程和Core进程通过本地UDP通信，端口在配置中指定
impl RecognizerBridge {
    pub async fn new(config: &Config, tx: mpsc::Sender<RecognizerEvent>) -> anyhow::Result<Self> {
        let socket = UdpSocket::bind(format!("0.0.0.0:{}", config.rec_local_port)).await?;
        let target_addr = format!("127.0.0.1:{}", config.rec_remote_port);

        Ok(Self {
            socket: Arc::new(socket),
            target_addr,
            tx,
        })
    }

    pub async fn run(&self) -> anyhow::Result<()> {
        let mut buf = [0u8; 4096];
        loop {
            let (len, _) = self.socket.recv_from(&mut buf).await?;
            if len == 0 {
                continue;
            }
            let Ok(raw) = std::str::from_utf8(&buf[..len]) else {
                continue;
            };
            let msg: RecognizerMessage = match serde_json::from_str(raw) {
                Ok(msg) => msg,
                Err(e) => {
                    log::warn!("Ignoring malformed recognizer datagram: {}", e);
                    continue;
                }
            };
            let event = match msg.msg_type.as_str() {
                "result" => RecognizerEvent::Result(msg.text.unwrap_or_default()),
                "end" => RecognizerEvent::Ended,
                "error" => {
                    RecognizerEvent::Error(msg.reason.unwrap_or_else(|| "unknown".to_string()))
                }
                other => {
                    log::debug!("Unhandled recognizer message type: {}", other);
                    continue;
                }
            };
            if let Err(e) = self.tx.send(event).await {
                log::error!("Failed to forward recognizer event: {}", e);
                break;
            }
        }
        Ok(())
    }

    pub async fn send_message(&self, msg: &str) -> anyhow::Result<()> {
        self.socket
            .send_to(msg.as_bytes(), &self.target_addr)
            .await?;
        Ok(())
    }
}

/// Drains controller commands and forwards listen start/stop to the
/// recognizer process.
pub async fn command_task(bridge: Arc<RecognizerBridge>, mut rx: mpsc::Receiver<RecognizerCommand>) {
    while let Some(cmd) = rx.recv().await {
        let payload = match cmd {
            RecognizerCommand::Start => r#"{"type":"listen","state":"start"}"#,
            RecognizerCommand::Stop => r#"{"type":"listen","state":"stop"}"#,
        };
        if let Err(e) = bridge.send_message(payload).await {
            log::error!("Failed to send listen command: {}", e);
        }
    }
}
