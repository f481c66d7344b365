//! # 長い動画の非同期認識
//!
//! ベースURL `.../v3/recognition/video/` 配下の4つのエンドポイントを使う。
//!
//! | 操作 | パス | ボディ |
//! |------|------|--------|
//! | 認識依頼 | `asyncscan/` | `video`, `callbackUrl`, 任意パラメータ |
//! | タスク終了 | `close/` | `videoId` |
//! | 結果照会 | `result/` | `videoId` |
//! | 処理速度照会 | `rate/` | 署名パラメータのみ |
//!
//! 送信先は呼び出しごとに決まり、既定設定は変更しない。

use std::collections::BTreeMap;
use std::path::Path;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::RecognitionError;
use crate::handler::{require, Handler, ModalityHandler};
use crate::response::Recognition;

/// 動画認識APIのベースURL
pub const VIDEO_API_URL: &str = "http://api.open.tuputech.com/v3/recognition/video/";

const ASYNC_SCAN_PATH: &str = "asyncscan/";
const RESULT_PATH: &str = "result/";
const CLOSE_PATH: &str = "close/";
const RATE_PATH: &str = "rate/";

fn is_zero_u8(value: &u8) -> bool {
    *value == 0
}

fn is_zero_f64(value: &f64) -> bool {
    *value == 0.0
}

/// タスクごとのコールバック条件。
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskCallbackRule {
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub review: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub offset: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub total: bool,
    #[serde(skip_serializing_if = "is_zero_u8")]
    pub label: u8,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub face_id: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub type_name: Vec<String>,
    #[serde(skip_serializing_if = "is_zero_f64")]
    pub similarity: f64,
}

/// 非同期動画認識の任意パラメータ。
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoAsyncOptions {
    /// 認識中の結果を逐次コールバックする
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub real_time_callback: bool,
    /// 音声トラックも認識する
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub audio: bool,
    /// フレーム抽出間隔（秒）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interval: Option<u8>,
    /// 実行するタスクID
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub task: Vec<String>,
    /// タスクID → コールバック条件
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callback_rules: Option<BTreeMap<String, Vec<TaskCallbackRule>>>,
    /// コールバックにそのまま返される任意情報
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_info: Option<Map<String, Value>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AsyncScanRequest<'a> {
    video: &'a str,
    callback_url: &'a str,
    #[serde(flatten)]
    options: &'a VideoAsyncOptions,
}

/// 非同期動画認識ハンドラ。
///
/// 設定する送信先URLは各操作のパスを含まないベースURL。
#[derive(Debug, Clone)]
pub struct VideoAsyncHandler {
    inner: Handler,
}

impl VideoAsyncHandler {
    /// 秘密鍵PEMを読み込んで作成する。
    pub fn new(private_key_path: impl AsRef<Path>) -> Result<Self, RecognitionError> {
        Ok(Self::from_handler(Handler::new(private_key_path, VIDEO_API_URL)?))
    }

    /// 構築済みの汎用ハンドラから作成する。
    pub fn from_handler(inner: Handler) -> Self {
        Self { inner }
    }

    async fn send(
        &self,
        path: &str,
        secret_id: &str,
        payload: Map<String, Value>,
    ) -> Result<Recognition, RecognitionError> {
        let target = self.inner.target().join(path);
        self.inner
            .recognize_json_at(&target, secret_id, payload)
            .await
    }

    /// 動画URLの認識を依頼する。
    pub async fn perform(
        &self,
        secret_id: &str,
        video_url: &str,
        callback_url: &str,
        options: &VideoAsyncOptions,
    ) -> Result<Recognition, RecognitionError> {
        require("シークレットID", secret_id)?;
        require("動画URL", video_url)?;
        require("コールバックURL", callback_url)?;

        let request = AsyncScanRequest {
            video: video_url,
            callback_url,
            options,
        };
        let payload = match serde_json::to_value(request) {
            Ok(Value::Object(map)) => map,
            Ok(other) => {
                return Err(RecognitionError::Assembly(format!(
                    "JSONオブジェクトではありません: {other}"
                )))
            }
            Err(e) => {
                return Err(RecognitionError::Assembly(format!(
                    "リクエストのシリアライズに失敗: {e}"
                )))
            }
        };
        self.send(ASYNC_SCAN_PATH, secret_id, payload).await
    }

    /// 認識タスクを終了する。
    pub async fn close_task(
        &self,
        secret_id: &str,
        video_id: &str,
    ) -> Result<Recognition, RecognitionError> {
        self.send_video_id(CLOSE_PATH, secret_id, video_id).await
    }

    /// 認識結果を照会する。
    pub async fn query_result(
        &self,
        secret_id: &str,
        video_id: &str,
    ) -> Result<Recognition, RecognitionError> {
        self.send_video_id(RESULT_PATH, secret_id, video_id).await
    }

    /// シークレットIDの処理速度を照会する。
    pub async fn query_rate(&self, secret_id: &str) -> Result<Recognition, RecognitionError> {
        require("シークレットID", secret_id)?;
        self.send(RATE_PATH, secret_id, Map::new()).await
    }

    async fn send_video_id(
        &self,
        path: &str,
        secret_id: &str,
        video_id: &str,
    ) -> Result<Recognition, RecognitionError> {
        require("シークレットID", secret_id)?;
        require("動画ID", video_id)?;

        let mut payload = Map::new();
        payload.insert("videoId".to_string(), Value::String(video_id.to_string()));
        self.send(path, secret_id, payload).await
    }
}

impl ModalityHandler for VideoAsyncHandler {
    fn handler(&self) -> &Handler {
        &self.inner
    }

    fn handler_mut(&mut self) -> &mut Handler {
        &mut self.inner
    }
}
