//! # レスポンス処理
//!
//! エンベロープ `{"json": "...", "signature": "..."}` を取り出し、
//! `json` 文字列のバイト列に対してサービス署名を検証する。
//!
//! ステータスコードはボディの処理結果に関係なく常に保持する。
//! エンベロープがパースできない場合の扱いはステータスで分かれる。
//! - 400 または 299以下: [`RecognitionError::MissingBody`]
//! - それ以外: [`RecognitionError::MalformedEnvelope`]（パーサのエラーをそのまま返す）

use tupu_crypto::Verifier;
use tupu_types::{parse_result, RecognitionResult, ResponseEnvelope};

use crate::error::RecognitionError;

/// 署名検証済みの認識結果。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recognition {
    /// 検証済みの認識結果JSON
    pub json: String,
    /// HTTPステータスコード
    pub status_code: u16,
}

impl Recognition {
    /// 認識結果JSONをパースする。
    pub fn parse(&self) -> Option<RecognitionResult> {
        parse_result(&self.json)
    }
}

/// HTTPレスポンスを読み切ってから検証する。
///
/// ボディは所有権ごと消費されるため、どの経路でも接続は解放される。
pub async fn process_response(
    response: reqwest::Response,
    verifier: &Verifier,
) -> Result<Recognition, RecognitionError> {
    let status = response.status().as_u16();
    let body = response
        .bytes()
        .await
        .map_err(|e| RecognitionError::BodyRead {
            status,
            message: e.to_string(),
        })?;
    process_envelope(status, &body, verifier)
}

/// 受信済みのボディからエンベロープを取り出して検証する。
pub fn process_envelope(
    status: u16,
    body: &[u8],
    verifier: &Verifier,
) -> Result<Recognition, RecognitionError> {
    let envelope: ResponseEnvelope = serde_json::from_slice(body).map_err(|e| {
        if status == 400 || status <= 299 {
            RecognitionError::MissingBody { status }
        } else {
            RecognitionError::MalformedEnvelope {
                status,
                message: e.to_string(),
            }
        }
    })?;

    let json = envelope.json.ok_or(RecognitionError::NoResult { status })?;
    let signature = envelope
        .signature
        .ok_or(RecognitionError::NoSignature { status })?;

    if let Err(e) = verifier.verify(json.as_bytes(), &signature) {
        tracing::warn!(status, "レスポンス署名の検証に失敗しました");
        return Err(RecognitionError::SignatureVerification {
            status,
            reason: e.to_string(),
            payload: json,
        });
    }

    tracing::debug!(status, "レスポンス署名を検証しました");
    Ok(Recognition {
        json,
        status_code: status,
    })
}
