//! # 音声ストリーム認識
//!
//! 配信中の音声ストリームを継続的に認識する。終了・状態照会は同じベースURL配下の
//! `close/`, `search/` に送る。送信先は呼び出しごとに決まり、既定設定は変更しない。

use std::path::Path;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::RecognitionError;
use crate::handler::{require, Handler, ModalityHandler};
use crate::response::Recognition;

/// ストリーム認識の既定URL
pub const SPEECH_STREAM_API_URL: &str =
    "http://api.open.tuputech.com/v3/recognition/speech/stream/";

/// コールバックしない
pub const CALLBACK_NONE: u8 = 0;
/// 全ての認識結果をコールバックする
pub const CALLBACK_ALL_RECOGNITION: u8 = 1;
/// 終了状態のみコールバックする
pub const CALLBACK_END_STATUS: u8 = 2;

const CLOSE_PATH: &str = "close/";
const SEARCH_PATH: &str = "search/";

fn is_zero(value: &u8) -> bool {
    *value == 0
}

/// ストリーム認識の任意パラメータ。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeechStreamOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub room_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub forum_id: Option<String>,
    /// [`CALLBACK_NONE`] / [`CALLBACK_ALL_RECOGNITION`] / [`CALLBACK_END_STATUS`]
    #[serde(skip_serializing_if = "is_zero")]
    pub callback_rules: u8,
    /// 違反音声の直前1分のリンクを返す
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub return_pre_speech: bool,
    /// 実行するタスクID（空 = サービス既定）
    #[serde(skip)]
    pub tasks: Vec<String>,
}

#[derive(Serialize)]
struct StreamEntry<'a> {
    url: &'a str,
    callback: &'a str,
    #[serde(flatten)]
    options: &'a SpeechStreamOptions,
}

/// 音声ストリーム認識ハンドラ。
#[derive(Debug, Clone)]
pub struct SpeechStreamHandler {
    inner: Handler,
}

impl SpeechStreamHandler {
    /// 秘密鍵PEMを読み込んで作成する。
    pub fn new(private_key_path: impl AsRef<Path>) -> Result<Self, RecognitionError> {
        Ok(Self::from_handler(Handler::new(
            private_key_path,
            SPEECH_STREAM_API_URL,
        )?))
    }

    /// 構築済みの汎用ハンドラから作成する。
    pub fn from_handler(inner: Handler) -> Self {
        Self { inner }
    }

    /// ストリーム認識を開始する。
    pub async fn start(
        &self,
        secret_id: &str,
        stream_url: &str,
        callback_url: &str,
        options: &SpeechStreamOptions,
    ) -> Result<Recognition, RecognitionError> {
        require("シークレットID", secret_id)?;
        require("ストリームURL", stream_url)?;
        require("コールバックURL", callback_url)?;

        let entry = serde_json::to_value(StreamEntry {
            url: stream_url,
            callback: callback_url,
            options,
        })
        .map_err(|e| RecognitionError::Assembly(format!("speechStreamのシリアライズに失敗: {e}")))?;

        let mut payload = Map::new();
        payload.insert("speechStream".to_string(), Value::Array(vec![entry]));
        if !options.tasks.is_empty() {
            payload.insert("tasks".to_string(), serde_json::json!(options.tasks));
        }
        self.inner.recognize_json(secret_id, payload).await
    }

    /// 認識タスクを終了する。
    pub async fn close(
        &self,
        secret_id: &str,
        request_id: &str,
    ) -> Result<Recognition, RecognitionError> {
        require("シークレットID", secret_id)?;
        require("リクエストID", request_id)?;

        let mut payload = Map::new();
        payload.insert(
            "speechStream".to_string(),
            serde_json::json!([{ "requestId": request_id }]),
        );
        let target = self.inner.target().join(CLOSE_PATH);
        self.inner
            .recognize_json_at(&target, secret_id, payload)
            .await
    }

    /// 認識タスクの状態を照会する。
    pub async fn query_status(
        &self,
        secret_id: &str,
        request_id: &str,
    ) -> Result<Recognition, RecognitionError> {
        require("シークレットID", secret_id)?;
        require("リクエストID", request_id)?;

        let mut payload = Map::new();
        payload.insert(
            "requestId".to_string(),
            Value::String(request_id.to_string()),
        );
        let target = self.inner.target().join(SEARCH_PATH);
        self.inner
            .recognize_json_at(&target, secret_id, payload)
            .await
    }
}

impl ModalityHandler for SpeechStreamHandler {
    fn handler(&self) -> &Handler {
        &self.inner
    }

    fn handler_mut(&mut self) -> &mut Handler {
        &mut self.inner
    }
}
