use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    // UI进程配置
    pub ui_local_port: u16,
    pub ui_remote_port: u16,

    // 识别器进程配置
    pub rec_local_port: u16,
    pub rec_remote_port: u16,

    // 后端配置（静态部分）
    pub backend_base_url: &'static str,
    pub backend_api_token: &'static str,

    // 设备标识（动态部分，可在运行时修改）
    pub device_id: String,
    pub client_id: String,

    // TTS 服务配置
    pub tts_url: &'static str,
    pub tts_api_key: &'static str,
    pub tts_voice_language: &'static str,
    pub tts_voice_name: &'static str,
    pub tts_voice_gender: &'static str,
    pub tts_audio_encoding: &'static str,

    // 音频配置
    pub capture_device: &'static str,
    pub playback_device: &'static str,
    pub capture_sample_rate: u32,
    pub capture_channels: u32,
    pub capture_period_size: usize,
    pub playback_sample_rate: u32,
    pub playback_channels: u32,
    pub playback_period_size: usize,
    pub stream_format: &'static str,
    pub stream_sample_rate: u32,
    pub stream_channels: u32,
}

impl Config {
    /// 从编译时设置的环境变量创建配置
    /// 所有参数都在编译时从 config.toml 中读取
    pub fn new() -> Result<Self, &'static str> {
        Ok(Self {
            // UI进程配置
            ui_local_port: env!("UI_LOCAL_PORT").parse()
                .map_err(|_| "Failed to parse UI_LOCAL_PORT")?,
            ui_remote_port: env!("UI_REMOTE_PORT").parse()
                .map_err(|_| "Failed to parse UI_REMOTE_PORT")?,

            // 识别器进程配置
            rec_local_port: env!("REC_LOCAL_PORT").parse()
                .map_err(|_| "Failed to parse REC_LOCAL_PORT")?,
            rec_remote_port: env!("REC_REMOTE_PORT").parse()
                .map_err(|_| "Failed to parse REC_REMOTE_PORT")?,

            // 后端配置
            backend_base_url: env!("BACKEND_BASE_URL"),
            backend_api_token: env!("BACKEND_API_TOKEN"),

            // 设备标识初始化为config.toml中的值
            device_id: env!("DEVICE_ID").to_string(),
            client_id: env!("CLIENT_ID").to_string(),

            // TTS 服务配置
            tts_url: env!("TTS_URL"),
            tts_api_key: env!("TTS_API_KEY"),
            tts_voice_language: env!("TTS_VOICE_LANGUAGE"),
            tts_voice_name: env!("TTS_VOICE_NAME"),
            tts_voice_gender: env!("TTS_VOICE_GENDER"),
            tts_audio_encoding: env!("TTS_AUDIO_ENCODING"),

            // 音频配置
            capture_device: env!("AUDIO_CAPTURE_DEVICE"),
            playback_device: env!("AUDIO_PLAYBACK_DEVICE"),
            capture_sample_rate: env!("AUDIO_CAPTURE_SAMPLE_RATE").parse()
                .map_err(|_| "Failed to parse AUDIO_CAPTURE_SAMPLE_RATE")?,
            capture_channels: env!("AUDIO_CAPTURE_CHANNELS").parse()
                .map_err(|_| "Failed to parse AUDIO_CAPTURE_CHANNELS")?,
            capture_period_size: env!("AUDIO_CAPTURE_PERIOD_SIZE").parse()
                .map_err(|_| "Failed to parse AUDIO_CAPTURE_PERIOD_SIZE")?,
            playback_sample_rate: env!("AUDIO_PLAYBACK_SAMPLE_RATE").parse()
                .map_err(|_| "Failed to parse AUDIO_PLAYBACK_SAMPLE_RATE")?,
            playback_channels: env!("AUDIO_PLAYBACK_CHANNELS").parse()
                .map_err(|_| "Failed to parse AUDIO_PLAYBACK_CHANNELS")?,
            playback_period_size: env!("AUDIO_PLAYBACK_PERIOD_SIZE").parse()
                .map_err(|_| "Failed to parse AUDIO_PLAYBACK_PERIOD_SIZE")?,
            stream_format: env!("AUDIO_STREAM_FORMAT"),
            stream_sample_rate: env!("AUDIO_STREAM_SAMPLE_RATE").parse()
                .map_err(|_| "Failed to parse AUDIO_STREAM_SAMPLE_RATE")?,
            stream_channels: env!("AUDIO_STREAM_CHANNELS").parse()
                .map_err(|_| "Failed to parse AUDIO_STREAM_CHANNELS")?,
        })
    }
}
