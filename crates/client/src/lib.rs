//! # TUPU 認識クライアント
//!
//! TUPUコンテンツ認識サービス（画像・音声・動画・テキスト）へ署名付きリクエストを送り、
//! サービス署名を検証した結果を返す。
//!
//! ## 1往復の流れ
//! 1. データリソース（URL / ローカルパス / バイナリ）を [`DataInfo`] で作る
//! 2. `timestamp`, `nonce` と `"{secret_id},{timestamp},{nonce}"` への署名を生成
//! 3. multipartまたはJSONのボディを組み立てて `{url}{secret_id}` にPOST
//! 4. エンベロープ `{"json", "signature"}` の署名を検証して [`Recognition`] を返す
//!
//! 再試行・接続プール制御・レート制限は行わない。
//!
//! ## モジュール
//! - [`config`] — 既定設定と呼び出し単位の送信先
//! - [`signing`] — 署名パラメータ
//! - [`assembler`] — リクエスト組み立て
//! - [`response`] — エンベロープ検証
//! - [`handler`] — 汎用ハンドラ
//! - [`image`], [`speech`], [`video`], [`text`] — モダリティ別ハンドラ

pub mod assembler;
pub mod config;
pub mod error;
pub mod handler;
pub mod image;
pub mod response;
pub mod signing;
pub mod speech;
pub mod text;
pub mod video;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use config::{
    ClientConfig, RequestTarget, DEFAULT_TIMEOUT_SECS, DEFAULT_USER_AGENT, ROOT_API_URL,
};
pub use error::RecognitionError;
pub use handler::{Handler, ModalityHandler};
pub use image::ImageHandler;
pub use response::Recognition;
pub use speech::{SpeechAsyncHandler, SpeechStreamHandler, SpeechSyncHandler};
pub use text::{TextItem, TextSyncHandler};
pub use video::{VideoAsyncHandler, VideoSyncHandler};

pub use tupu_crypto::{Signer, Verifier};
pub use tupu_types::{parse_result, DataInfo, DataSource, Modality, RecognitionResult};
