//! # テキスト同期認識
//!
//! テキストはJSONの `text` 配列で送る。

use std::path::Path;

use serde::Serialize;
use serde_json::Map;

use crate::error::RecognitionError;
use crate::handler::{require, Handler, ModalityHandler};
use crate::response::Recognition;

/// テキスト認識の既定URL
pub const TEXT_API_URL: &str = "http://api.open.tuputech.com/v3/recognition/text/";

/// 認識するテキスト1件。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TextItem {
    /// 本文
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub forum_id: Option<String>,
}

impl TextItem {
    /// 本文のみのテキスト
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Self::default()
        }
    }
}

/// テキスト同期認識ハンドラ。
#[derive(Debug, Clone)]
pub struct TextSyncHandler {
    inner: Handler,
}

impl TextSyncHandler {
    /// 秘密鍵PEMを読み込んで作成する。
    pub fn new(private_key_path: impl AsRef<Path>) -> Result<Self, RecognitionError> {
        Ok(Self::from_handler(Handler::new(private_key_path, TEXT_API_URL)?))
    }

    /// 構築済みの汎用ハンドラから作成する。
    pub fn from_handler(inner: Handler) -> Self {
        Self { inner }
    }

    /// テキストを認識する。
    pub async fn perform(
        &self,
        secret_id: &str,
        items: &[TextItem],
    ) -> Result<Recognition, RecognitionError> {
        require("シークレットID", secret_id)?;
        if items.is_empty() {
            return Err(RecognitionError::InvalidInput(
                "テキストが指定されていません".to_string(),
            ));
        }
        if let Some(index) = items.iter().position(|item| item.content.is_empty()) {
            return Err(RecognitionError::InvalidInput(format!(
                "インデックス [{index}] のテキストが空です"
            )));
        }

        let text = serde_json::to_value(items)
            .map_err(|e| RecognitionError::Assembly(format!("textのシリアライズに失敗: {e}")))?;
        let mut payload = Map::new();
        payload.insert("text".to_string(), text);
        self.inner.recognize_json(secret_id, payload).await
    }
}

impl ModalityHandler for TextSyncHandler {
    fn handler(&self) -> &Handler {
        &self.inner
    }

    fn handler_mut(&mut self) -> &mut Handler {
        &mut self.inner
    }
}
