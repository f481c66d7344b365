//! # TUPU 共有型定義
//!
//! 認識リクエストに載せるデータリソースと、レスポンスのエンベロープ・認識結果を
//! Rust構造体として提供する。
//!
//! ## データリソース
//! 1つのデータリソースは次のいずれか1つだけを表す。
//! - リモートURL（プレーンなフォームフィールドとして送信）
//! - ローカルファイルパス（ファイルパートとして送信）
//! - メモリ上のバイナリ + ファイル名（ファイルパートとして送信）

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use zeroize::Zeroize;

// ---------------------------------------------------------------------------
// モダリティ
// ---------------------------------------------------------------------------

/// 認識パイプラインの種別。
///
/// リクエスト中のデータフィールド名を決定する。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Modality {
    /// 画像
    Image,
    /// 音声
    Speech,
    /// 動画
    Video,
    /// テキスト
    Text,
}

impl Modality {
    /// リクエスト中のフィールド名 ("image", "speech", "video", "text")
    pub fn field_name(self) -> &'static str {
        match self {
            Modality::Image => "image",
            Modality::Speech => "speech",
            Modality::Video => "video",
            Modality::Text => "text",
        }
    }
}

impl fmt::Display for Modality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.field_name())
    }
}

// ---------------------------------------------------------------------------
// データリソース
// ---------------------------------------------------------------------------

/// データの取得元。必ず1種類だけを保持する。
#[derive(Clone, PartialEq, Eq)]
pub enum DataSource {
    /// リモートURL
    RemoteUrl(String),
    /// ローカルファイルパス
    LocalPath(PathBuf),
    /// メモリ上のバイナリ
    InMemory {
        /// バイナリ本体
        buffer: Vec<u8>,
        /// 送信時のファイル名
        file_name: String,
    },
}

impl DataSource {
    /// 選択された種別の必須値が空でないか。
    pub fn is_populated(&self) -> bool {
        match self {
            DataSource::RemoteUrl(url) => !url.is_empty(),
            DataSource::LocalPath(path) => !path.as_os_str().is_empty(),
            DataSource::InMemory { buffer, file_name } => {
                !buffer.is_empty() && !file_name.is_empty()
            }
        }
    }
}

impl fmt::Debug for DataSource {
    // バイナリ本体は長さのみ出力する
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataSource::RemoteUrl(url) => f.debug_tuple("RemoteUrl").field(url).finish(),
            DataSource::LocalPath(path) => f.debug_tuple("LocalPath").field(path).finish(),
            DataSource::InMemory { buffer, file_name } => f
                .debug_struct("InMemory")
                .field("len", &buffer.len())
                .field("file_name", file_name)
                .finish(),
        }
    }
}

/// 1件のデータリソース（記述子）。
///
/// フィールド名はモダリティが決め、呼び出し側は変更できない。
/// `side_channel` はデータパートの直後に書き出される補助フィールド
/// （`tag`, `interval`, `maxFrames` 等）。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataInfo {
    modality: Modality,
    source: DataSource,
    side_channel: BTreeMap<String, String>,
}

impl DataInfo {
    fn with_source(modality: Modality, source: DataSource) -> Option<Self> {
        if !source.is_populated() {
            return None;
        }
        Some(Self {
            modality,
            source,
            side_channel: BTreeMap::new(),
        })
    }

    /// リモートURLのデータリソースを作成する。URLが空なら `None`。
    pub fn remote(modality: Modality, url: impl Into<String>) -> Option<Self> {
        Self::with_source(modality, DataSource::RemoteUrl(url.into()))
    }

    /// ローカルファイルのデータリソースを作成する。パスが空なら `None`。
    pub fn local(modality: Modality, path: impl Into<PathBuf>) -> Option<Self> {
        Self::with_source(modality, DataSource::LocalPath(path.into()))
    }

    /// バイナリのデータリソースを作成する。バイナリまたはファイル名が空なら `None`。
    pub fn binary(modality: Modality, buffer: Vec<u8>, file_name: impl Into<String>) -> Option<Self> {
        Self::with_source(
            modality,
            DataSource::InMemory {
                buffer,
                file_name: file_name.into(),
            },
        )
    }

    /// モダリティ
    pub fn modality(&self) -> Modality {
        self.modality
    }

    /// 送信時のフィールド名
    pub fn field_name(&self) -> &'static str {
        self.modality.field_name()
    }

    /// データの取得元
    pub fn source(&self) -> &DataSource {
        &self.source
    }

    /// 補助フィールド
    pub fn side_channel(&self) -> &BTreeMap<String, String> {
        &self.side_channel
    }

    /// 送信可能な状態か（リセット・バッファ消去後は `false`）。
    pub fn is_valid(&self) -> bool {
        self.source.is_populated()
    }

    /// 補助フィールドを設定する。同じキーは上書きされる。
    pub fn set_meta(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.side_channel.insert(key.into(), value.into());
    }

    /// 補助フィールドを設定して自身を返す。
    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_meta(key, value);
        self
    }

    /// `tag` を設定して自身を返す。空文字列は無視する。
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.set_tag(tag);
        self
    }

    /// `tag` を設定する。空文字列は無視する。
    pub fn set_tag(&mut self, tag: impl Into<String>) {
        let tag = tag.into();
        if !tag.is_empty() {
            self.side_channel.insert("tag".to_string(), tag);
        }
    }

    /// 設定済みの `tag`
    pub fn tag(&self) -> Option<&str> {
        self.side_channel.get("tag").map(String::as_str)
    }

    /// バイナリを確保領域ごとゼロ埋めしてから解放する。
    pub fn clear_buffer(&mut self) {
        if let DataSource::InMemory { buffer, .. } = &mut self.source {
            buffer.zeroize();
            *buffer = Vec::new();
        }
    }

    /// 全フィールドを空にする。再利用前に呼ぶ。
    pub fn reset(&mut self) {
        self.clear_buffer();
        match &mut self.source {
            DataSource::RemoteUrl(url) => url.clear(),
            DataSource::LocalPath(path) => *path = PathBuf::new(),
            DataSource::InMemory { file_name, .. } => file_name.clear(),
        }
        self.side_channel.clear();
    }

    /// 取得元と補助フィールドに分解する。
    pub fn into_parts(self) -> (Modality, DataSource, BTreeMap<String, String>) {
        (self.modality, self.source, self.side_channel)
    }
}

// ---------------------------------------------------------------------------
// レスポンスエンベロープ
// ---------------------------------------------------------------------------

/// サービスが返す外殻 `{"json": "...", "signature": "..."}`。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    /// 文字列化された認識結果JSON
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub json: Option<String>,
    /// `json` に対するBase64署名
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
}

// ---------------------------------------------------------------------------
// 認識結果
// ---------------------------------------------------------------------------

/// これ未満のタイムスタンプは秒単位とみなしてミリ秒に換算する。
const SECONDS_TIMESTAMP_LIMIT: i64 = 100_000_000_000;

/// 検証済みJSONから組み立てた認識結果。
///
/// `timestamp_millis` は常にミリ秒。サービスは秒・ミリ秒のどちらも返すため、
/// パース時に統一する。
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RecognitionResult {
    /// 結果コード（0 = 成功）
    pub code: i64,
    /// 結果メッセージ
    pub message: String,
    /// レスポンス生成時刻（UNIXミリ秒）
    pub timestamp_millis: i64,
    /// サービス側ノンス
    pub nonce: String,
    /// タスクID → タスク結果オブジェクト
    pub tasks: BTreeMap<String, Value>,
    /// 上記以外のトップレベル値
    pub others: BTreeMap<String, Value>,
}

impl RecognitionResult {
    /// 表示用の秒単位タイムスタンプ
    pub fn timestamp_secs(&self) -> i64 {
        self.timestamp_millis / 1000
    }
}

fn normalize_timestamp(raw: i64) -> i64 {
    if raw.abs() < SECONDS_TIMESTAMP_LIMIT {
        raw.saturating_mul(1000)
    } else {
        raw
    }
}

fn as_integer(value: &Value) -> Option<i64> {
    value
        .as_i64()
        .or_else(|| value.as_f64().map(|f| f as i64))
}

/// 認識結果JSON文字列をパースする。
///
/// 空文字列、JSONとして不正、またはオブジェクトでない場合は `None`。
/// `timestamp`, `nonce`, `code`, `message` 以外のキーは、値がオブジェクトなら
/// `tasks` に、それ以外は `others` に振り分ける。既知キーでも型が合わない値は
/// `others` に入る。
pub fn parse_result(s: &str) -> Option<RecognitionResult> {
    if s.is_empty() {
        return None;
    }
    let data: serde_json::Map<String, Value> = serde_json::from_str(s).ok()?;

    let mut result = RecognitionResult::default();
    for (key, value) in data {
        match (key.as_str(), &value) {
            ("timestamp", v) if as_integer(v).is_some() => {
                result.timestamp_millis = as_integer(v).map(normalize_timestamp).unwrap_or_default();
            }
            ("code", v) if as_integer(v).is_some() => {
                result.code = as_integer(v).unwrap_or_default();
            }
            ("nonce", Value::String(nonce)) => result.nonce = nonce.clone(),
            ("message", Value::String(message)) => result.message = message.clone(),
            (_, Value::Object(_)) => {
                result.tasks.insert(key, value);
            }
            _ => {
                result.others.insert(key, value);
            }
        }
    }
    Some(result)
}
