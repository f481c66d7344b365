//! # 画像認識
//!
//! 画像はmultipartの `image` フィールドで送る。1リクエストに複数枚を載せられる。
//!
//! ## タグの割り当て
//! `tags[i]` を `i` 番目の画像に付け、タグが足りない分は最後のタグを使い回す。
//! 例: 画像3枚・`tags = ["a"]` → `["a", "a", "a"]`
//!
//! 位置指定のタグはデータリソース自身のタグより優先する。空のタグは書き出さない。

use std::path::{Path, PathBuf};

use tupu_types::{DataInfo, Modality};

use crate::config::ROOT_API_URL;
use crate::error::RecognitionError;
use crate::handler::{ensure_modality, wrap_items, Handler, ModalityHandler};
use crate::response::Recognition;

/// 画像認識の既定URL
pub const IMAGE_API_URL: &str = ROOT_API_URL;

/// 位置に応じたタグを付ける（最後のタグを繰り返す）。
pub fn apply_tags(items: &mut [DataInfo], tags: &[String]) {
    let mut current: Option<&str> = None;
    for (index, item) in items.iter_mut().enumerate() {
        if let Some(tag) = tags.get(index) {
            current = Some(tag.as_str());
        }
        if let Some(tag) = current {
            item.set_tag(tag);
        }
    }
}

/// 画像認識ハンドラ。
#[derive(Debug, Clone)]
pub struct ImageHandler {
    inner: Handler,
}

impl ImageHandler {
    /// 秘密鍵PEMを読み込んで作成する。
    pub fn new(private_key_path: impl AsRef<Path>) -> Result<Self, RecognitionError> {
        Ok(Self::from_handler(Handler::new(private_key_path, IMAGE_API_URL)?))
    }

    /// 構築済みの汎用ハンドラから作成する。
    pub fn from_handler(inner: Handler) -> Self {
        Self { inner }
    }

    /// 画像データリソースで認識する。
    pub async fn perform(
        &self,
        secret_id: &str,
        mut images: Vec<DataInfo>,
        tags: &[String],
    ) -> Result<Recognition, RecognitionError> {
        ensure_modality(&images, Modality::Image)?;
        apply_tags(&mut images, tags);
        self.inner.recognize(secret_id, images, &[]).await
    }

    /// 画像URLで認識する。
    pub async fn perform_with_url<S: Into<String>>(
        &self,
        secret_id: &str,
        urls: impl IntoIterator<Item = S>,
        tags: &[String],
    ) -> Result<Recognition, RecognitionError> {
        let images = wrap_items(urls, |url| DataInfo::remote(Modality::Image, url))?;
        self.perform(secret_id, images, tags).await
    }

    /// ローカル画像ファイルで認識する。
    pub async fn perform_with_path<P: Into<PathBuf>>(
        &self,
        secret_id: &str,
        paths: impl IntoIterator<Item = P>,
        tags: &[String],
    ) -> Result<Recognition, RecognitionError> {
        let images = wrap_items(paths, |path| DataInfo::local(Modality::Image, path))?;
        self.perform(secret_id, images, tags).await
    }

    /// `(ファイル名, バイナリ)` の組で認識する。
    pub async fn perform_with_binary<S: Into<String>>(
        &self,
        secret_id: &str,
        binary: impl IntoIterator<Item = (S, Vec<u8>)>,
        tags: &[String],
    ) -> Result<Recognition, RecognitionError> {
        let images = wrap_items(binary, |(name, buf)| {
            DataInfo::binary(Modality::Image, buf, name)
        })?;
        self.perform(secret_id, images, tags).await
    }
}

impl ModalityHandler for ImageHandler {
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

    const OK_JSON: &str = r#"{"code":0,"message":"ok","timestamp":1700000000}"#;

    fn tags(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    /// URL1件・タスクなしの送信フィールドを確認
    #[tokio::test]
    async fn test_single_url_fields() {
        let mock = start_signed_service(OK_JSON).await;
        let handler = ImageHandler::from_handler(test_handler(&mock.url));

        let recognition = handler
            .perform_with_url("abc123", ["http://example.com/1.jpg"], &[])
            .await
            .unwrap();
        assert_eq!(recognition.status_code, 200);

        let requests = mock.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].path, "/v3/recognition/abc123");
        assert_eq!(
            requests[0].field_names(),
            ["timestamp", "nonce", "signature", "image"]
        );
    }

    /// タグが足りない分は最後のタグが使い回されることを確認
    #[tokio::test]
    async fn test_last_tag_carries_forward() {
        let mock = start_signed_service(OK_JSON).await;
        let handler = ImageHandler::from_handler(test_handler(&mock.url));
        let urls = ["http://e/1.jpg", "http://e/2.jpg", "http://e/3.jpg"];

        handler
            .perform_with_url("abc123", urls, &tags(&["a"]))
            .await
            .unwrap();
        handler
            .perform_with_url("abc123", urls, &tags(&["a", "b"]))
            .await
            .unwrap();

        let requests = mock.requests();
        assert_eq!(requests[0].texts("tag"), ["a", "a", "a"]);
        assert_eq!(
            requests[0].field_names()[3..],
            ["image", "tag", "image", "tag", "image", "tag"]
        );
        assert_eq!(requests[1].texts("tag"), ["a", "b", "b"]);
    }

    /// 位置指定のタグが自身のタグより優先され、タグなしなら自身のタグが残ることを確認
    #[test]
    fn test_apply_tags_precedence() {
        let mut items = vec![
            DataInfo::remote(Modality::Image, "http://e/1.jpg")
                .unwrap()
                .with_tag("own"),
            DataInfo::remote(Modality::Image, "http://e/2.jpg")
                .unwrap()
                .with_tag("own"),
        ];
        apply_tags(&mut items, &tags(&["pos"]));
        assert_eq!(items[0].tag(), Some("pos"));
        assert_eq!(items[1].tag(), Some("pos"));

        let mut untouched = vec![DataInfo::remote(Modality::Image, "http://e/1.jpg")
            .unwrap()
            .with_tag("own")];
        apply_tags(&mut untouched, &[]);
        assert_eq!(untouched[0].tag(), Some("own"));
    }

    /// バイナリ画像がファイル名付きで届くことを確認
    #[tokio::test]
    async fn test_binary_image() {
        let mock = start_signed_service(OK_JSON).await;
        let handler = ImageHandler::from_handler(test_handler(&mock.url));

        handler
            .perform_with_binary("abc123", [("1.jpg", vec![0xFF, 0xD8, 0xFF])], &[])
            .await
            .unwrap();

        let requests = mock.requests();
        let image = requests[0]
            .fields
            .iter()
            .find(|f| f.name == "image")
            .unwrap();
        assert_eq!(image.file_name.as_deref(), Some("1.jpg"));
        assert_eq!(image.data, [0xFF, 0xD8, 0xFF]);
    }

    /// 空のURLと他モダリティのデータが送信前に拒否されることを確認
    #[tokio::test]
    async fn test_rejects_invalid_items() {
        let mock = start_signed_service(OK_JSON).await;
        let handler = ImageHandler::from_handler(test_handler(&mock.url));

        let err = handler
            .perform_with_url("abc123", ["http://e/1.jpg", ""], &[])
            .await
            .unwrap_err();
        assert!(matches!(err, RecognitionError::InvalidInput(_)));

        let speech = vec![DataInfo::remote(Modality::Speech, "http://e/1.mp3").unwrap()];
        let err = handler.perform("abc123", speech, &[]).await.unwrap_err();
        assert!(matches!(err, RecognitionError::InvalidInput(_)));
        assert!(mock.requests().is_empty());
    }

    /// トレイト経由の設定変更が既定の送信先に反映されることを確認
    #[tokio::test]
    async fn test_set_server_url() {
        let mock = start_signed_service(OK_JSON).await;
        let mut handler = ImageHandler::from_handler(test_handler("http://127.0.0.1:9/"));
        handler.set_server_url(&format!("{}image/", mock.url));
        handler.set_timeout(3);

        handler
            .perform_with_url("abc123", ["http://e/1.jpg"], &[])
            .await
            .unwrap();
        let requests = mock.requests();
        assert_eq!(requests[0].path, "/v3/recognition/image/abc123");
        assert_eq!(requests[0].header("timeout"), Some("3"));
    }
}
