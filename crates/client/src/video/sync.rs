//! # 短い動画の同期認識
//!
//! `tag`, `interval`, `maxFrames` は動画ごとの補助フィールドとして、
//! `tasks` は `task` フィールドの繰り返しとして書き出す。

use std::path::{Path, PathBuf};

use tupu_types::{DataInfo, Modality};

use crate::error::RecognitionError;
use crate::handler::{ensure_extension, ensure_modality, wrap_items, Handler, ModalityHandler};
use crate::response::Recognition;

/// 同期動画認識の既定URL
pub const VIDEO_SYNC_API_URL: &str = "http://api.open.tuputech.com/v3/recognition/video/syncscan/";

/// バイナリ送信で受け付ける拡張子
pub const VIDEO_EXTENSIONS: &[&str] = &[
    ".mkv", ".mp4", ".wmv", ".rmvb", ".flv", ".3gp", ".ts", ".mov", ".gif", ".m3u8", ".mpg",
    ".mpeg", ".mxf",
];

/// 同期動画認識の任意パラメータ。未指定の項目は送らない。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VideoSyncOptions {
    /// 動画ごとのタグ
    pub tag: Option<String>,
    /// フレーム抽出間隔（秒）
    pub interval: Option<u8>,
    /// 最大フレーム数
    pub max_frames: Option<u16>,
    /// 実行するタスクID
    pub tasks: Vec<String>,
}

impl VideoSyncOptions {
    fn annotate(&self, mut item: DataInfo) -> DataInfo {
        if let Some(tag) = &self.tag {
            item.set_tag(tag.as_str());
        }
        if let Some(interval) = self.interval {
            item.set_meta("interval", interval.to_string());
        }
        if let Some(max_frames) = self.max_frames {
            item.set_meta("maxFrames", max_frames.to_string());
        }
        item
    }
}

/// 同期動画認識ハンドラ。
#[derive(Debug, Clone)]
pub struct VideoSyncHandler {
    inner: Handler,
}

impl VideoSyncHandler {
    /// 秘密鍵PEMを読み込んで作成する。
    pub fn new(private_key_path: impl AsRef<Path>) -> Result<Self, RecognitionError> {
        Ok(Self::from_handler(Handler::new(
            private_key_path,
            VIDEO_SYNC_API_URL,
        )?))
    }

    /// 構築済みの汎用ハンドラから作成する。
    pub fn from_handler(inner: Handler) -> Self {
        Self { inner }
    }

    /// 動画データリソースで認識する。
    pub async fn perform(
        &self,
        secret_id: &str,
        videos: Vec<DataInfo>,
        options: &VideoSyncOptions,
    ) -> Result<Recognition, RecognitionError> {
        ensure_modality(&videos, Modality::Video)?;
        let videos = videos
            .into_iter()
            .map(|video| options.annotate(video))
            .collect();
        self.inner.recognize(secret_id, videos, &options.tasks).await
    }

    /// 動画URLで認識する。
    pub async fn perform_with_url<S: Into<String>>(
        &self,
        secret_id: &str,
        urls: impl IntoIterator<Item = S>,
        options: &VideoSyncOptions,
    ) -> Result<Recognition, RecognitionError> {
        let videos = wrap_items(urls, |url| DataInfo::remote(Modality::Video, url))?;
        self.perform(secret_id, videos, options).await
    }

    /// ローカル動画ファイルで認識する。
    pub async fn perform_with_path<P: Into<PathBuf>>(
        &self,
        secret_id: &str,
        paths: impl IntoIterator<Item = P>,
        options: &VideoSyncOptions,
    ) -> Result<Recognition, RecognitionError> {
        let videos = wrap_items(paths, |path| DataInfo::local(Modality::Video, path))?;
        self.perform(secret_id, videos, options).await
    }

    /// `(ファイル名, バイナリ)` の組で認識する。
    ///
    /// ファイル名の拡張子が [`VIDEO_EXTENSIONS`] にない場合は送信前に失敗する。
    pub async fn perform_with_binary<S: Into<String>>(
        &self,
        secret_id: &str,
        binary: impl IntoIterator<Item = (S, Vec<u8>)>,
        options: &VideoSyncOptions,
    ) -> Result<Recognition, RecognitionError> {
        let mut videos = Vec::new();
        for (index, (name, buf)) in binary.into_iter().enumerate() {
            let name: String = name.into();
            ensure_extension(&name, VIDEO_EXTENSIONS)?;
            let video = DataInfo::binary(Modality::Video, buf, name).ok_or_else(|| {
                RecognitionError::InvalidInput(format!(
                    "インデックス [{index}] のデータリソースが空です"
                ))
            })?;
            videos.push(video);
        }
        self.perform(secret_id, videos, options).await
    }
}

impl ModalityHandler for VideoSyncHandler {
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

    /// オプションが動画ごとの補助フィールドとtaskフィールドになることを確認
    #[tokio::test]
    async fn test_video_options_fields() {
        let mock = start_signed_service(OK_JSON).await;
        let handler = VideoSyncHandler::from_handler(test_handler(&mock.url));
        let options = VideoSyncOptions {
            tag: Some("live".to_string()),
            interval: Some(2),
            max_frames: Some(50),
            tasks: vec!["t-porn".to_string()],
        };

        handler
            .perform_with_url("abc123", ["http://e/1.mp4", "http://e/2.mp4"], &options)
            .await
            .unwrap();

        let requests = mock.requests();
        let captured = &requests[0];
        assert_eq!(captured.texts("task"), ["t-porn"]);
        assert_eq!(captured.texts("video"), ["http://e/1.mp4", "http://e/2.mp4"]);
        assert_eq!(captured.texts("tag"), ["live", "live"]);
        assert_eq!(captured.texts("interval"), ["2", "2"]);
        assert_eq!(captured.texts("maxFrames"), ["50", "50"]);

        let names = captured.field_names();
        let first_video = names.iter().position(|n| *n == "video").unwrap();
        assert_eq!(names[first_video - 1], "task");
        assert_eq!(
            names[first_video + 1..first_video + 4].to_vec(),
            ["interval", "maxFrames", "tag"]
        );
    }

    /// 未指定のオプションが送られないことを確認
    #[tokio::test]
    async fn test_video_default_options() {
        let mock = start_signed_service(OK_JSON).await;
        let handler = VideoSyncHandler::from_handler(test_handler(&mock.url));

        handler
            .perform_with_url("abc123", ["http://e/1.mp4"], &VideoSyncOptions::default())
            .await
            .unwrap();

        let requests = mock.requests();
        assert_eq!(
            requests[0].field_names(),
            ["timestamp", "nonce", "signature", "video"]
        );
    }

    /// 拡張子の判定を確認
    #[tokio::test]
    async fn test_video_binary_extensions() {
        let mock = start_signed_service(OK_JSON).await;
        let handler = VideoSyncHandler::from_handler(test_handler(&mock.url));
        let options = VideoSyncOptions::default();

        handler
            .perform_with_binary("abc123", [("clip.MPEG", vec![0u8; 8])], &options)
            .await
            .unwrap();
        let err = handler
            .perform_with_binary("abc123", [("clip.avi", vec![0u8; 8])], &options)
            .await
            .unwrap_err();
        assert!(matches!(err, RecognitionError::InvalidInput(_)));
        assert_eq!(mock.requests().len(), 1);
    }
}
