use serde::Deserialize;

/// Gesture / selection message from the UI process.
///
/// `{"type":"press"}`, `{"type":"release"}`, `{"type":"interrupt"}`,
/// `{"type":"select_documents","documents":["id1","id2"]}`
#[derive(Deserialize, Debug, Clone)]
pub struct UiMessage {
    #[serde(rename = "type")]
    pub msg_type: String,
    pub documents: Option<Vec<String>>,
}

/// Event message from the speech-recognition process.
///
/// `{"type":"result","text":"..."}`, `{"type":"end"}`,
/// `{"type":"error","reason":"not-allowed"}`
#[derive(Deserialize, Debug, Clone)]
pub struct RecognizerMessage {
    #[serde(rename = "type")]
    pub msg_type: String,
    pub text: Option<String>,
    pub reason: Option<String>,
}

/// Response body of the question-answering endpoint.
#[derive(Deserialize, Debug, Clone)]
pub struct AnswerResponse {
    pub answer: String,
    #[serde(default)]
    pub relevant_sections: Vec<RelevantSection>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct RelevantSection {
    pub id: String,
    pub content: String,
    pub similarity: f32,
}

/// Response body of the text-to-speech endpoint. The synthesized audio
/// arrives base64-encoded; a missing field means the service produced
/// no audio and is treated as an error by the caller.
#[derive(Deserialize, Debug, Clone)]
pub struct TtsResponse {
    #[serde(rename = "audioContent")]
    pub audio_content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_answer_response() {
        let json = r#"{
            "answer": "It is a summary.",
            "relevant_sections": [
                {"id": "doc-1#3", "content": "chunk text", "similarity": 0.87}
            ]
        }"#;
        let resp: AnswerResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.answer, "It is a summary.");
        assert_eq!(resp.relevant_sections.len(), 1);
        assert!((resp.relevant_sections[0].similarity - 0.87).abs() < 1e-6);
    }

    #[test]
    fn answer_response_sections_default_to_empty() {
        let resp: AnswerResponse = serde_json::from_str(r#"{"answer":"ok"}"#).unwrap();
        assert!(resp.relevant_sections.is_empty());
    }

    #[test]
    fn parses_ui_message_with_documents() {
        let msg: UiMessage =
            serde_json::from_str(r#"{"type":"select_documents","documents":["a","b"]}"#).unwrap();
        assert_eq!(msg.msg_type, "select_documents");
        assert_eq!(msg.documents.as_deref(), Some(&["a".to_string(), "b".to_string()][..]));
    }

    #[test]
    fn tts_response_without_audio_content() {
        let resp: TtsResponse = serde_json::from_str(r#"{}"#).unwrap();
        assert!(resp.audio_content.is_none());
    }
}
