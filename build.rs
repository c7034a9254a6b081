use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Deserialize)]
struct Config {
    application: Application,
    ui: Bridge,
    recognizer: Bridge,
    backend: Backend,
    tts: Tts,
    audio: Audio,
}

#[derive(Deserialize)]
struct Application {
    name: String,
    version: String,
}

#[derive(Deserialize)]
struct Bridge {
    local_port: u16,
    remote_port: u16,
}

#[derive(Deserialize)]
struct Backend {
    base_url: String,
    api_token: String,
    device_id: String,
    client_id: String,
}

#[derive(Deserialize)]
struct Tts {
    url: String,
    api_key: String,
    voice_language: String,
    voice_name: String,
    voice_gender: String,
    audio_encoding: String,
}

#[derive(Deserialize)]
struct Audio {
    capture_device: String,
    playback_device: String,
    capture_sample_rate: u32,
    capture_channels: u32,
    capture_period_size: usize,
    playback_sample_rate: u32,
    playback_channels: u32,
    playback_period_size: usize,
    stream_format: String,
    stream_sample_rate: u32,
    stream_channels: u32,
}

// 在编译时读取 config.toml 并设置环境变量
fn main() {
    println!("cargo:rerun-if-changed=config.toml");

    let config_path = Path::new("config.toml");
    if !config_path.exists() {
        panic!("config.toml not found!");
    }

    let config_str = fs::read_to_string(config_path).expect("Failed to read config.toml");
    let config: Config = toml::from_str(&config_str).expect("Failed to parse config.toml");

    // 应用信息
    println!("cargo:rustc-env=APP_NAME={}", config.application.name);
    println!("cargo:rustc-env=APP_VERSION={}", config.application.version);

    // UI 桥配置
    println!("cargo:rustc-env=UI_LOCAL_PORT={}", config.ui.local_port);
    println!("cargo:rustc-env=UI_REMOTE_PORT={}", config.ui.remote_port);

    // 识别器桥配置
    println!("cargo:rustc-env=REC_LOCAL_PORT={}", config.recognizer.local_port);
    println!("cargo:rustc-env=REC_REMOTE_PORT={}", config.recognizer.remote_port);

    // 后端配置
    println!("cargo:rustc-env=BACKEND_BASE_URL={}", config.backend.base_url);
    println!("cargo:rustc-env=BACKEND_API_TOKEN={}", config.backend.api_token);
    println!("cargo:rustc-env=DEVICE_ID={}", config.backend.device_id);
    println!("cargo:rustc-env=CLIENT_ID={}", config.backend.client_id);

    // TTS 配置
    println!("cargo:rustc-env=TTS_URL={}", config.tts.url);
    println!("cargo:rustc-env=TTS_API_KEY={}", config.tts.api_key);
    println!("cargo:rustc-env=TTS_VOICE_LANGUAGE={}", config.tts.voice_language);
    println!("cargo:rustc-env=TTS_VOICE_NAME={}", config.tts.voice_name);
    println!("cargo:rustc-env=TTS_VOICE_GENDER={}", config.tts.voice_gender);
    println!("cargo:rustc-env=TTS_AUDIO_ENCODING={}", config.tts.audio_encoding);

    // 音频配置
    println!("cargo:rustc-env=AUDIO_CAPTURE_DEVICE={}", config.audio.capture_device);
    println!("cargo:rustc-env=AUDIO_PLAYBACK_DEVICE={}", config.audio.playback_device);
    println!("cargo:rustc-env=AUDIO_CAPTURE_SAMPLE_RATE={}", config.audio.capture_sample_rate);
    println!("cargo:rustc-env=AUDIO_CAPTURE_CHANNELS={}", config.audio.capture_channels);
    println!("cargo:rustc-env=AUDIO_CAPTURE_PERIOD_SIZE={}", config.audio.capture_period_size);
    println!("cargo:rustc-env=AUDIO_PLAYBACK_SAMPLE_RATE={}", config.audio.playback_sample_rate);
    println!("cargo:rustc-env=AUDIO_PLAYBACK_CHANNELS={}", config.audio.playback_channels);
    println!("cargo:rustc-env=AUDIO_PLAYBACK_PERIOD_SIZE={}", config.audio.playback_period_size);
    println!("cargo:rustc-env=AUDIO_STREAM_FORMAT={}", config.audio.stream_format);
    println!("cargo:rustc-env=AUDIO_STREAM_SAMPLE_RATE={}", config.audio.stream_sample_rate);
    println!("cargo:rustc-env=AUDIO_STREAM_CHANNELS={}", config.audio.stream_channels);
}
