mod audio;
mod backend;
mod config;
mod controller;
mod protocol;
mod recognizer_bridge;
mod state_machine;
mod ui_bridge;

use audio::level_monitor::{meter_task, MeterCommand};
use audio::playback::{Playback, PlaybackCommand, PlaybackEvent};
use audio::AudioConfig;
use backend::{qa_task, speak_task, AnswerEvent, AskRequest, Backend};
use config::Config;
use controller::VoiceController;
use recognizer_bridge::{RecognizerBridge, RecognizerCommand, RecognizerEvent};
use ui_bridge::{UiBridge, UiEvent, UiPush};

use mac_address::get_mac_address;
use std::sync::Arc;
use tokio::signal;
use tokio::sync::mpsc;
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 初始化日志
    env_logger::init();

    // 加载配置
    let mut config = Config::new().map_err(anyhow::Error::msg)?;

    // 设备id和客户端id的处理
    if config.device_id == "unknown-device" {
        config.device_id = match get_mac_address() {
            Ok(Some(mac)) => mac.to_string().to_lowercase(),
            _ => Uuid::new_v4().to_string(),
        };
    }

    // 客户端UUID，先从本地文件读取以保持重启间身份一致，如果不存在则生成新的并保存
    let uuid_file_path = "docuvoice_uuid.txt";
    if config.client_id == "unknown-client" {
        if let Ok(content) = std::fs::read_to_string(uuid_file_path) {
            let trimmed = content.trim();
            if !trimmed.is_empty() {
                config.client_id = trimmed.to_string();
                log::info!("Loaded Client ID from file: {}", config.client_id);
            }
        }
    }

    // 生成新的UUID并保存
    if config.client_id == "unknown-client" {
        config.client_id = Uuid::new_v4().to_string();
        log::info!("Generated new Client ID: {}", config.client_id);
        if let Err(e) = std::fs::write(uuid_file_path, &config.client_id) {
            log::warn!("Failed to save Client ID to file: {}", e);
        }
    }

    let audio_config = AudioConfig::from_config(&config);
    let backend = Arc::new(Backend::new(config.clone())?);

    // 创建通道，用于组件间通信
    // 事件通道（汇入主循环）
    let (tx_ui_event, mut rx_ui_event) = mpsc::channel::<UiEvent>(100);
    let (tx_rec_event, mut rx_rec_event) = mpsc::channel::<RecognizerEvent>(100);
    let (tx_answer, mut rx_answer) = mpsc::channel::<AnswerEvent>(100);
    let (tx_play_event, mut rx_play_event) = mpsc::channel::<PlaybackEvent>(100);

    // 命令通道（从控制器发出）
    let (tx_ui_push, rx_ui_push) = mpsc::channel::<UiPush>(100);
    let (tx_rec_cmd, rx_rec_cmd) = mpsc::channel::<RecognizerCommand>(100);
    let (tx_meter_cmd, rx_meter_cmd) = mpsc::channel::<MeterCommand>(100);
    let (tx_ask, rx_ask) = mpsc::channel::<AskRequest>(100);
    let (tx_speak, rx_speak) = mpsc::channel::<String>(100);
    let (tx_play_cmd, rx_play_cmd) = mpsc::channel::<PlaybackCommand>(100);

    // 电平数据通道，采集线程 -> UI
    let (tx_levels, mut rx_levels) = mpsc::channel::<Vec<f32>>(100);

    // 启动UI桥，与UI进程通信
    let ui_bridge = Arc::new(UiBridge::new(&config, tx_ui_event).await?);
    let ui_bridge_run = ui_bridge.clone();
    tokio::spawn(async move {
        if let Err(e) = ui_bridge_run.run().await {
            log::error!("UiBridge error: {}", e);
        }
    });
    tokio::spawn(ui_bridge::push_task(ui_bridge.clone(), rx_ui_push));

    // 启动识别器桥，与语音识别进程通信
    let rec_bridge = Arc::new(RecognizerBridge::new(&config, tx_rec_event).await?);
    let rec_bridge_run = rec_bridge.clone();
    tokio::spawn(async move {
        if let Err(e) = rec_bridge_run.run().await {
            log::error!("RecognizerBridge error: {}", e);
        }
    });
    tokio::spawn(recognizer_bridge::command_task(rec_bridge, rx_rec_cmd));

    // 启动音频工作线程
    tokio::spawn(meter_task(audio_config.clone(), rx_meter_cmd, tx_levels));
    let mut playback = Playback::start(audio_config, rx_play_cmd, tx_play_event.clone())?;

    // 启动后端任务
    tokio::spawn(qa_task(backend.clone(), rx_ask, tx_answer));
    tokio::spawn(speak_task(backend, rx_speak, tx_play_cmd.clone(), tx_play_event));

    let mut controller = VoiceController::new(
        tx_ui_push.clone(),
        tx_rec_cmd,
        tx_meter_cmd,
        tx_ask,
        tx_speak,
        tx_play_cmd,
    );

    // 初始状态推送
    let _ = tx_ui_push
        .send(UiPush::Status {
            state: state_machine::SystemState::Idle,
            text: controller::STATUS_SELECT_DOCS.to_string(),
        })
        .await;

    log::info!("DocuVoice Core Started. State: {:?}", controller.state());

    // 主事件循环，处理各组件事件
    loop {
        tokio::select! {
            // 监听 Ctrl+C 信号
            _ = signal::ctrl_c() => {
                log::info!("Received Ctrl+C, shutting down...");
                break;
            }

            Some(event) = rx_ui_event.recv() => {
                controller.handle_ui_event(event).await;
            }

            Some(event) = rx_rec_event.recv() => {
                controller.handle_recognizer_event(event).await;
            }

            Some(event) = rx_answer.recv() => {
                controller.handle_answer_event(event).await;
            }

            Some(event) = rx_play_event.recv() => {
                controller.handle_playback_event(event).await;
            }

            // 电平数据直接转发给UI，不经过控制器
            Some(levels) = rx_levels.recv() => {
                let _ = tx_ui_push.send(UiPush::Levels(levels)).await;
            }
        }
    }

    // 停止外部资源，再释放通道让工作任务退出
    controller.shutdown().await;
    drop(controller);
    drop(tx_ui_push);
    playback.stop();

    Ok(())
}
