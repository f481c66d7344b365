//! # 認識ハンドラ
//!
//! 署名鍵・検証鍵・HTTPクライアント・既定設定を保持し、
//! 署名 → 組み立て → 送信 → 検証 の1往復を実行する。
//!
//! 各モダリティのハンドラはこの [`Handler`] に送信先とペイロードを渡すだけの薄い層。

use std::path::Path;

use serde_json::{Map, Value};
use tupu_crypto::{Signer, Verifier};
use tupu_types::DataInfo;

use crate::assembler::{assemble_json, assemble_multipart};
use crate::config::{ClientConfig, RequestTarget};
use crate::error::RecognitionError;
use crate::response::{process_response, Recognition};
use crate::signing::{build_signing_params, SigningParams};

/// 汎用認識ハンドラ。
///
/// 鍵は構築後に変更されないため、`&Handler` を複数の同時呼び出しで共有できる。
/// 設定の変更は `&mut self` を要求する。
#[derive(Debug, Clone)]
pub struct Handler {
    client: reqwest::Client,
    signer: Signer,
    verifier: Verifier,
    config: ClientConfig,
}

impl Handler {
    /// 秘密鍵PEMを読み込み、指定URLを既定の送信先とするハンドラを作る。
    pub fn new(
        private_key_path: impl AsRef<Path>,
        api_url: impl Into<String>,
    ) -> Result<Self, RecognitionError> {
        Self::with_config(private_key_path, ClientConfig::with_api_url(api_url))
    }

    /// 秘密鍵PEMを読み込み、設定を指定してハンドラを作る。
    pub fn with_config(
        private_key_path: impl AsRef<Path>,
        config: ClientConfig,
    ) -> Result<Self, RecognitionError> {
        let signer = tupu_crypto::load_signer(private_key_path)
            .map_err(|e| RecognitionError::KeyLoad(e.to_string()))?;
        let verifier =
            tupu_crypto::load_verifier().map_err(|e| RecognitionError::KeyLoad(e.to_string()))?;
        Ok(Self::from_keys(signer, verifier, config))
    }

    /// 読み込み済みの鍵からハンドラを作る。
    pub fn from_keys(signer: Signer, verifier: Verifier, config: ClientConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            signer,
            verifier,
            config,
        }
    }

    /// HTTPクライアントを差し替える。
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    /// 現在の設定
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// 既定の送信先URLを変更する。
    pub fn set_server_url(&mut self, url: impl Into<String>) {
        self.config.api_url = url.into();
    }

    /// 既定のタイムアウト（秒）を変更する。0は無視する。
    pub fn set_timeout(&mut self, timeout_secs: u64) {
        if timeout_secs != 0 {
            self.config.timeout_secs = timeout_secs;
        }
    }

    /// サブユーザーIDを設定する。空文字列は無視する。
    pub fn set_uid(&mut self, uid: impl Into<String>) {
        let uid = uid.into();
        if !uid.is_empty() {
            self.config.uid = Some(uid);
        }
    }

    /// `User-Agent` を変更する。空文字列は無視する。
    pub fn set_user_agent(&mut self, user_agent: impl Into<String>) {
        let user_agent = user_agent.into();
        if !user_agent.is_empty() {
            self.config.user_agent = user_agent;
        }
    }

    /// 1リクエストあたりのデータ数上限を設定する（`None` = 無制限）。
    pub fn set_max_items(&mut self, max_items: Option<usize>) {
        self.config.max_items = max_items;
    }

    /// 現在の設定から作った送信先
    pub fn target(&self) -> RequestTarget {
        self.config.target()
    }

    /// 新しい署名パラメータを生成する。
    pub fn signing_params(&self, secret_id: &str) -> Result<SigningParams, RecognitionError> {
        build_signing_params(&self.signer, secret_id, self.config.uid.as_deref())
    }

    // -----------------------------------------------------------------------
    // multipart
    // -----------------------------------------------------------------------

    /// 既定の送信先にmultipartで認識リクエストを送る。
    pub async fn recognize(
        &self,
        secret_id: &str,
        items: Vec<DataInfo>,
        tasks: &[String],
    ) -> Result<Recognition, RecognitionError> {
        self.recognize_at(&self.target(), secret_id, items, tasks)
            .await
    }

    /// 指定の送信先にmultipartで認識リクエストを送る。
    pub async fn recognize_at(
        &self,
        target: &RequestTarget,
        secret_id: &str,
        items: Vec<DataInfo>,
        tasks: &[String],
    ) -> Result<Recognition, RecognitionError> {
        if secret_id.is_empty() {
            return Err(RecognitionError::InvalidInput(
                "シークレットIDが空です".to_string(),
            ));
        }
        if items.is_empty() {
            return Err(RecognitionError::InvalidInput(
                "データリソースが指定されていません".to_string(),
            ));
        }
        if let Some(limit) = self.config.max_items {
            if items.len() > limit {
                return Err(RecognitionError::TooManyItems {
                    count: items.len(),
                    limit,
                });
            }
        }

        let params = self.signing_params(secret_id)?;
        let request = assemble_multipart(
            &self.client,
            target,
            secret_id,
            &self.config.user_agent,
            &params,
            items,
            tasks,
        )
        .await?;
        self.send(request).await
    }

    // -----------------------------------------------------------------------
    // JSON
    // -----------------------------------------------------------------------

    /// 既定の送信先にJSONで認識リクエストを送る。
    pub async fn recognize_json(
        &self,
        secret_id: &str,
        payload: Map<String, Value>,
    ) -> Result<Recognition, RecognitionError> {
        self.recognize_json_at(&self.target(), secret_id, payload)
            .await
    }

    /// 指定の送信先にJSONで認識リクエストを送る。
    pub async fn recognize_json_at(
        &self,
        target: &RequestTarget,
        secret_id: &str,
        payload: Map<String, Value>,
    ) -> Result<Recognition, RecognitionError> {
        let params = self.signing_params(secret_id)?;
        let request = assemble_json(
            &self.client,
            target,
            secret_id,
            &self.config.user_agent,
            &params,
            payload,
        )?;
        self.send(request).await
    }

    async fn send(&self, request: reqwest::Request) -> Result<Recognition, RecognitionError> {
        let url = request.url().clone();
        let response = self.client.execute(request).await.map_err(|e| {
            tracing::warn!(%url, error = %e, "認識サービスへの送信に失敗しました");
            RecognitionError::Transport(e.to_string())
        })?;
        tracing::info!(%url, status = response.status().as_u16(), "認識サービスが応答しました");
        process_response(response, &self.verifier).await
    }
}

// ---------------------------------------------------------------------------
// モダリティ共通
// ---------------------------------------------------------------------------

/// モダリティ別ハンドラの共通操作。
pub trait ModalityHandler {
    /// 内部の汎用ハンドラ
    fn handler(&self) -> &Handler;

    /// 内部の汎用ハンドラ（可変）
    fn handler_mut(&mut self) -> &mut Handler;

    /// 既定の送信先URLを変更する。
    fn set_server_url(&mut self, url: &str) {
        self.handler_mut().set_server_url(url);
    }

    /// 既定のタイムアウト（秒）を変更する。0は無視する。
    fn set_timeout(&mut self, timeout_secs: u64) {
        self.handler_mut().set_timeout(timeout_secs);
    }

    /// サブユーザーIDを設定する。
    fn set_uid(&mut self, uid: &str) {
        self.handler_mut().set_uid(uid);
    }
}

/// `items` が全て指定のモダリティか確認する。
pub(crate) fn ensure_modality(
    items: &[DataInfo],
    modality: tupu_types::Modality,
) -> Result<(), RecognitionError> {
    match items.iter().position(|item| item.modality() != modality) {
        Some(index) => Err(RecognitionError::InvalidInput(format!(
            "インデックス [{index}] のデータリソースは {modality} ではありません"
        ))),
        None => Ok(()),
    }
}

/// 空の値が混じっていれば、そのインデックスでエラーにする。
pub(crate) fn wrap_items<T, F>(
    values: impl IntoIterator<Item = T>,
    mut wrap: F,
) -> Result<Vec<DataInfo>, RecognitionError>
where
    F: FnMut(T) -> Option<DataInfo>,
{
    values
        .into_iter()
        .enumerate()
        .map(|(index, value)| {
            wrap(value).ok_or_else(|| {
                RecognitionError::InvalidInput(format!(
                    "インデックス [{index}] のデータリソースが空です"
                ))
            })
        })
        .collect()
}

/// 非空で必須の文字列パラメータを確認する。
pub(crate) fn require(name: &str, value: &str) -> Result<(), RecognitionError> {
    if value.is_empty() {
        return Err(RecognitionError::InvalidInput(format!("{name} が空です")));
    }
    Ok(())
}

/// ファイル名の拡張子（小文字化、`.` 付き）が許可リストにあるか確認する。
pub(crate) fn ensure_extension(file_name: &str, allowed: &[&str]) -> Result<(), RecognitionError> {
    let extension = Path::new(file_name)
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy().to_lowercase()))
        .unwrap_or_default();
    if allowed.contains(&extension.as_str()) {
        return Ok(());
    }
    Err(RecognitionError::InvalidInput(format!(
        "対応していないファイル形式です: {file_name} (対応形式: {})",
        allowed.join(" ")
    )))
}
