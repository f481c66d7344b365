//! # クライアントエラー型
//!
//! 全ての失敗は呼び出し元に返し、内部で再試行しない。
//! [`RecognitionError::status_code`] がベストエフォートのステータスコードを返す。

/// ローカル検証エラーのステータスコード
pub const LOCAL_ERROR_STATUS: u16 = 400;

/// 認識リクエストのエラー型。
#[derive(Debug, thiserror::Error)]
pub enum RecognitionError {
    /// 空のシークレットID・空のデータリスト・不正な記述子
    #[error("不正な入力: {0}")]
    InvalidInput(String),
    /// 1リクエストあたりのデータ数上限を超過
    #[error("データ数が上限を超えています: {count} > {limit}")]
    TooManyItems {
        /// 渡されたデータ数
        count: usize,
        /// 設定された上限
        limit: usize,
    },
    /// 秘密鍵・公開鍵の読み込みに失敗
    #[error("鍵の読み込みに失敗: {0}")]
    KeyLoad(String),
    /// リクエスト署名の生成に失敗
    #[error("リクエスト署名の生成に失敗: {0}")]
    Sign(String),
    /// ファイル読み込み失敗・不正なデータリソース
    #[error("リクエストの組み立てに失敗: {0}")]
    Assembly(String),
    /// 接続・送信に失敗（レスポンスなし）
    #[error("HTTP送信に失敗: {0}")]
    Transport(String),
    /// レスポンスボディの読み込みに失敗
    #[error("レスポンスボディの読み込みに失敗 (status {status}): {message}")]
    BodyRead {
        /// HTTPステータスコード
        status: u16,
        /// 失敗理由
        message: String,
    },
    /// エンベロープに `json` がない
    #[error("認識結果が含まれていません (status {status})")]
    NoResult {
        /// HTTPステータスコード
        status: u16,
    },
    /// エンベロープに `signature` がない
    #[error("サーバー署名が含まれていません (status {status})")]
    NoSignature {
        /// HTTPステータスコード
        status: u16,
    },
    /// 成功またはクライアントエラーのステータスでボディがパースできない
    #[error("有効なレスポンスボディがありません (status {status})")]
    MissingBody {
        /// HTTPステータスコード
        status: u16,
    },
    /// 上記以外のステータスでボディがパースできない
    #[error("レスポンスエンベロープのパースに失敗 (status {status}): {message}")]
    MalformedEnvelope {
        /// HTTPステータスコード
        status: u16,
        /// パーサのエラー
        message: String,
    },
    /// レスポンス署名の検証に失敗。`payload` は信頼してはならない。
    #[error("レスポンス署名の検証に失敗 (status {status}): {reason}")]
    SignatureVerification {
        /// HTTPステータスコード
        status: u16,
        /// 失敗理由
        reason: String,
        /// 未検証の認識結果JSON
        payload: String,
    },
}

impl RecognitionError {
    /// ベストエフォートのステータスコード。
    ///
    /// - ローカルで検出した失敗: 400
    /// - 接続レベルの失敗: 0
    /// - レスポンスを受信した後の失敗: そのステータスコード
    pub fn status_code(&self) -> u16 {
        match self {
            RecognitionError::InvalidInput(_)
            | RecognitionError::TooManyItems { .. }
            | RecognitionError::KeyLoad(_)
            | RecognitionError::Sign(_)
            | RecognitionError::Assembly(_) => LOCAL_ERROR_STATUS,
            RecognitionError::Transport(_) => 0,
            RecognitionError::BodyRead { status, .. }
            | RecognitionError::NoResult { status }
            | RecognitionError::NoSignature { status }
            | RecognitionError::MissingBody { status }
            | RecognitionError::MalformedEnvelope { status, .. }
            | RecognitionError::SignatureVerification { status, .. } => *status,
        }
    }

    /// 署名検証に失敗した未検証ペイロード
    pub fn unverified_payload(&self) -> Option<&str> {
        match self {
            RecognitionError::SignatureVerification { payload, .. } => Some(payload),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// ローカル・接続・レスポンス後の失敗でステータスコードが変わることを確認
    #[test]
    fn test_status_code_mapping() {
        assert_eq!(RecognitionError::InvalidInput("x".into()).status_code(), 400);
        assert_eq!(
            RecognitionError::TooManyItems { count: 11, limit: 10 }.status_code(),
            400
        );
        assert_eq!(RecognitionError::Assembly("x".into()).status_code(), 400);
        assert_eq!(RecognitionError::Transport("refused".into()).status_code(), 0);
        assert_eq!(RecognitionError::NoSignature { status: 200 }.status_code(), 200);
        assert_eq!(
            RecognitionError::MalformedEnvelope {
                status: 502,
                message: "x".into()
            }
            .status_code(),
            502
        );
    }

    /// 未検証ペイロードが署名検証エラーからのみ取り出せることを確認
    #[test]
    fn test_unverified_payload() {
        let err = RecognitionError::SignatureVerification {
            status: 200,
            reason: "mismatch".into(),
            payload: "{\"code\":0}".into(),
        };
        assert_eq!(err.unverified_payload(), Some("{\"code\":0}"));
        assert!(RecognitionError::NoResult { status: 200 }
            .unverified_payload()
            .is_none());
    }
}
