use crate::config::Config;
use crate::protocol::UiMessage;
use crate::state_machine::SystemState;
use serde_json::json;
use std::sync::Arc;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;

/// Gesture events decoded from UI datagrams.
#[derive(Debug, Clone, PartialEq)]
pub enum UiEvent {
    Press,
    Release,
    Interrupt,
    SelectDocuments(Vec<String>),
}

/// Outbound updates for the UI process.
#[derive(Debug, Clone, PartialEq)]
pub enum UiPush {
    Status { state: SystemState, text: String },
    Toast { level: &'static str, title: &'static str, text: String },
    Levels(Vec<f32>),
}

impl UiPush {
    pub fn to_json(&self) -> String {
        match self {
            UiPush::Status { state, text } => {
                json!({"type": "status", "state": state.as_str(), "text": text}).to_string()
            }
            UiPush::Toast { level, title, text } => {
                json!({"type": "toast", "level": level, "title": title, "text": text}).to_string()
            }
            UiPush::Levels(values) => {
                // Values live in [20,100]; round for a compact datagram.
                let rounded: Vec<u8> = values.iter().map(|v| v.round() as u8).collect();
                json!({"type": "levels", "values": rounded}).to_string()
            }
        }
    }
}

pub struct UiBridge {
    socket: Arc<UdpSocket>,
    target_addr: String,
    tx: mpsc::Sender<UiEvent>,
}

// UI进程和Core进程通过本地UDP通信，端口在配置中指定
impl UiBridge {
    pub async fn new(config: &Config, tx: mpsc::Sender<UiEvent>) -> anyhow::Result<Self> {
        // 绑定本地UDP端口
        let socket = UdpSocket::bind(format!("0.0.0.0:{}", config.ui_local_port)).await?;
        let target_addr = format!("127.0.0.1:{}", config.ui_remote_port);

        Ok(Self {
            socket: Arc::new(socket),
            target_addr,
            tx,
        })
    }

    pub async fn run(&self) -> anyhow::Result<()> {
        let mut buf = [0u8; 4096]; // 4KB缓冲区
        loop {
            // 通过UDP socket接收消息
            let (len, _) = self.socket.recv_from(&mut buf).await?;
            if len == 0 {
                continue;
            }
            let Ok(raw) = std::str::from_utf8(&buf[..len]) else {
                continue;
            };
            let msg: UiMessage = match serde_json::from_str(raw) {
                Ok(msg) => msg,
                Err(e) => {
                    log::warn!("Ignoring malformed UI datagram: {}", e);
                    continue;
                }
            };
            let event = match msg.msg_type.as_str() {
                "press" => UiEvent::Press,
                "release" => UiEvent::Release,
                "interrupt" => UiEvent::Interrupt,
                "select_documents" => {
                    UiEvent::SelectDocuments(msg.documents.unwrap_or_default())
                }
                other => {
                    log::debug!("Unhandled UI message type: {}", other);
                    continue;
                }
            };
            if let Err(e) = self.tx.send(event).await {
                log::error!("Failed to forward UI event: {}", e);
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

/// Drains controller pushes and forwards them to the UI process.
pub async fn push_task(bridge: Arc<UiBridge>, mut rx: mpsc::Receiver<UiPush>) {
    while let Some(push) = rx.recv().await {
        if let Err(e) = bridge.send_message(&push.to_json()).await {
            log::error!("Failed to send to UI: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_push_serializes_state_name() {
        let push = UiPush::Status {
            state: SystemState::Listening,
            text: "listening".to_string(),
        };
        let v: serde_json::Value = serde_json::from_str(&push.to_json()).unwrap();
        assert_eq!(v["type"], "status");
        assert_eq!(v["state"], "listening");
    }

    #[test]
    fn levels_push_rounds_values() {
        let push = UiPush::Levels(vec![20.0, 55.4, 99.6]);
        let v: serde_json::Value = serde_json::from_str(&push.to_json()).unwrap();
        assert_eq!(v["values"][0], 20);
        assert_eq!(v["values"][1], 55);
        assert_eq!(v["values"][2], 100);
    }
}
