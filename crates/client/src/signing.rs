//! # 署名パラメータ
//!
//! リクエストごとに `timestamp`, `nonce`, `signature`（必要なら `uid`）を生成する。
//!
//! 署名対象: `"{secret_id},{timestamp},{nonce}"` のUTF-8バイト列

use std::time::{SystemTime, UNIX_EPOCH};

use rand::Rng;
use serde_json::{Map, Value};
use tupu_crypto::Signer;

use crate::error::RecognitionError;

/// 1リクエスト分の署名パラメータ。保存・再利用しない。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigningParams {
    /// UNIX秒
    pub timestamp: i64,
    /// ランダムな10進数文字列
    pub nonce: String,
    /// Base64署名
    pub signature: String,
    /// サブユーザーID
    pub uid: Option<String>,
}

impl SigningParams {
    /// フォームフィールドとして書き出す順のキーと値
    pub fn fields(&self) -> Vec<(&'static str, String)> {
        let mut fields = vec![
            ("timestamp", self.timestamp.to_string()),
            ("nonce", self.nonce.clone()),
            ("signature", self.signature.clone()),
        ];
        if let Some(uid) = &self.uid {
            fields.push(("uid", uid.clone()));
        }
        fields
    }

    /// JSONボディに文字列値として書き込む。同名のキーは上書きされる。
    pub fn write_json(&self, body: &mut Map<String, Value>) {
        for (key, value) in self.fields() {
            body.insert(key.to_string(), Value::String(value));
        }
    }
}

/// 署名対象の文字列を組み立てる。
pub fn signing_message(secret_id: &str, timestamp: i64, nonce: &str) -> String {
    format!("{secret_id},{timestamp},{nonce}")
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}

/// 現在時刻と新しいノンスで署名パラメータを生成する。
///
/// `uid` は空でない場合のみ含める。
pub fn build_signing_params(
    signer: &Signer,
    secret_id: &str,
    uid: Option<&str>,
) -> Result<SigningParams, RecognitionError> {
    if secret_id.is_empty() {
        return Err(RecognitionError::InvalidInput(
            "シークレットIDが空です".to_string(),
        ));
    }

    let timestamp = unix_now();
    let nonce = rand::thread_rng().gen::<u32>().to_string();
    let signature = signer
        .sign(signing_message(secret_id, timestamp, &nonce).as_bytes())
        .map_err(|e| RecognitionError::Sign(e.to_string()))?;

    Ok(SigningParams {
        timestamp,
        nonce,
        signature,
        uid: uid.filter(|u| !u.is_empty()).map(str::to_string),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::test_keys;

    /// 生成した署名が対応する公開鍵で検証できることを確認
    #[test]
    fn test_signature_verifies() {
        let (signer, verifier) = test_keys();
        let params = build_signing_params(&signer, "abc123", None).unwrap();

        let message = signing_message("abc123", params.timestamp, &params.nonce);
        assert!(verifier.verify(message.as_bytes(), &params.signature).is_ok());
        assert!(params.nonce.parse::<u32>().is_ok());
        assert!(params.timestamp > 1_600_000_000);
    }

    /// 空のシークレットIDが拒否されることを確認
    #[test]
    fn test_empty_secret_id_rejected() {
        let (signer, _) = test_keys();
        let result = build_signing_params(&signer, "", None);
        assert!(matches!(result, Err(RecognitionError::InvalidInput(_))));
    }

    /// uidの有無でフィールドが変わることを確認
    #[test]
    fn test_fields_with_uid() {
        let (signer, _) = test_keys();

        let without = build_signing_params(&signer, "abc123", Some("")).unwrap();
        let keys: Vec<_> = without.fields().into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, ["timestamp", "nonce", "signature"]);

        let with = build_signing_params(&signer, "abc123", Some("user-1")).unwrap();
        let mut body = Map::new();
        with.write_json(&mut body);
        assert_eq!(body["uid"], Value::String("user-1".into()));
        assert_eq!(body["timestamp"], Value::String(with.timestamp.to_string()));
    }
}
