//! # 長時間録音の非同期認識
//!
//! 音声はURLで渡し、結果は `callbackUrl` に通知される。
//!
//! ```text
//! {"recording": {"url": "...", "callbackUrl": "...", ...}, "timestamp": ..., "nonce": ..., "signature": ...}
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::Serialize;
use serde_json::Map;

use crate::error::RecognitionError;
use crate::handler::{require, Handler, ModalityHandler};
use crate::response::Recognition;

/// 非同期音声認識の既定URL
pub const SPEECH_ASYNC_API_URL: &str =
    "http://api.open.tuputech.com/v3/recognition/speech/recording/async/";

/// 全ての認識結果をコールバックするルール
pub const CALLBACK_RULE_ALL: &str = "all";

/// 非同期音声認識の任意パラメータ。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeechAsyncOptions {
    /// コールバックルール（未指定 = サービス既定、`"all"` = 全結果）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callback_rule: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub room_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub forum_id: Option<String>,
    /// コールバックにそのまま返される任意情報
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_info: Option<BTreeMap<String, String>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Recording<'a> {
    url: &'a str,
    callback_url: &'a str,
    #[serde(flatten)]
    options: &'a SpeechAsyncOptions,
}

/// 非同期音声認識ハンドラ。
#[derive(Debug, Clone)]
pub struct SpeechAsyncHandler {
    inner: Handler,
}

impl SpeechAsyncHandler {
    /// 秘密鍵PEMを読み込んで作成する。
    pub fn new(private_key_path: impl AsRef<Path>) -> Result<Self, RecognitionError> {
        Ok(Self::from_handler(Handler::new(
            private_key_path,
            SPEECH_ASYNC_API_URL,
        )?))
    }

    /// 構築済みの汎用ハンドラから作成する。
    pub fn from_handler(inner: Handler) -> Self {
        Self { inner }
    }

    /// 録音URLの認識を依頼する。
    pub async fn perform(
        &self,
        secret_id: &str,
        speech_url: &str,
        callback_url: &str,
        options: &SpeechAsyncOptions,
    ) -> Result<Recognition, RecognitionError> {
        require("シークレットID", secret_id)?;
        require("音声URL", speech_url)?;
        require("コールバックURL", callback_url)?;

        let recording = serde_json::to_value(Recording {
            url: speech_url,
            callback_url,
            options,
        })
        .map_err(|e| RecognitionError::Assembly(format!("recordingのシリアライズに失敗: {e}")))?;

        let mut payload = Map::new();
        payload.insert("recording".to_string(), recording);
        self.inner.recognize_json(secret_id, payload).await
    }
}

impl ModalityHandler for SpeechAsyncHandler {
    fn handler(&self) -> &Handler {
        &self.inner
    }

    fn handler_mut(&mut self) -> &mut Handler {
        &mut self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{start_signed_service, test_handler};

    const OK_JSON: &str = r#"{"code":0,"message":"ok","requestId":"r-1"}"#;

    /// recordingオブジェクトと署名パラメータが1つのJSONで届くことを確認
    #[tokio::test]
    async fn test_recording_body() {
        let mock = start_signed_service(OK_JSON).await;
        let handler = SpeechAsyncHandler::from_handler(test_handler(&mock.url));
        let options = SpeechAsyncOptions {
            callback_rule: Some(CALLBACK_RULE_ALL.to_string()),
            room_id: Some("room-9".to_string()),
            custom_info: Some(BTreeMap::from([("k".to_string(), "v".to_string())])),
            ..Default::default()
        };

        let recognition = handler
            .perform("abc123", "http://e/long.mp3", "http://cb/notify", &options)
            .await
            .unwrap();
        assert_eq!(
            recognition.parse().unwrap().others["requestId"],
            serde_json::json!("r-1")
        );

        let requests = mock.requests();
        let body = requests[0].json.as_ref().unwrap();
        let recording = &body["recording"];
        assert_eq!(recording["url"], "http://e/long.mp3");
        assert_eq!(recording["callbackUrl"], "http://cb/notify");
        assert_eq!(recording["callbackRule"], "all");
        assert_eq!(recording["roomId"], "room-9");
        assert_eq!(recording["customInfo"]["k"], "v");
        assert!(recording.get("userId").is_none());
        assert!(body["signature"].is_string());
    }

    /// 必須パラメータが空なら送信しないことを確認
    #[tokio::test]
    async fn test_recording_requires_urls() {
        let mock = start_signed_service(OK_JSON).await;
        let handler = SpeechAsyncHandler::from_handler(test_handler(&mock.url));
        let options = SpeechAsyncOptions::default();

        for (url, callback) in [("", "http://cb"), ("http://e/a.mp3", "")] {
            let err = handler
                .perform("abc123", url, callback, &options)
                .await
                .unwrap_err();
            assert!(matches!(err, RecognitionError::InvalidInput(_)));
        }
        assert!(mock.requests().is_empty());
    }
}
