//! # 短い音声の同期認識

use std::path::{Path, PathBuf};

use tupu_types::{DataInfo, Modality};

use crate::error::RecognitionError;
use crate::handler::{ensure_extension, ensure_modality, wrap_items, Handler, ModalityHandler};
use crate::response::Recognition;

/// 同期音声認識の既定URL
pub const SPEECH_SYNC_API_URL: &str = "http://api.open.tuputech.com/v3/recognition/speech/";

/// バイナリ送信で受け付ける拡張子
pub const SPEECH_EXTENSIONS: &[&str] = &[".amr", ".mp3", ".wmv", ".wav", ".flv"];

/// 同期音声認識ハンドラ。
#[derive(Debug, Clone)]
pub struct SpeechSyncHandler {
    inner: Handler,
}

impl SpeechSyncHandler {
    /// 秘密鍵PEMを読み込んで作成する。
    pub fn new(private_key_path: impl AsRef<Path>) -> Result<Self, RecognitionError> {
        Ok(Self::from_handler(Handler::new(
            private_key_path,
            SPEECH_SYNC_API_URL,
        )?))
    }

    /// 構築済みの汎用ハンドラから作成する。
    pub fn from_handler(inner: Handler) -> Self {
        Self { inner }
    }

    /// 音声データリソースで認識する。
    pub async fn perform(
        &self,
        secret_id: &str,
        speeches: Vec<DataInfo>,
    ) -> Result<Recognition, RecognitionError> {
        ensure_modality(&speeches, Modality::Speech)?;
        self.inner.recognize(secret_id, speeches, &[]).await
    }

    /// 音声URLで認識する。
    pub async fn perform_with_url<S: Into<String>>(
        &self,
        secret_id: &str,
        urls: impl IntoIterator<Item = S>,
    ) -> Result<Recognition, RecognitionError> {
        let speeches = wrap_items(urls, |url| DataInfo::remote(Modality::Speech, url))?;
        self.perform(secret_id, speeches).await
    }

    /// ローカル音声ファイルで認識する。
    pub async fn perform_with_path<P: Into<PathBuf>>(
        &self,
        secret_id: &str,
        paths: impl IntoIterator<Item = P>,
    ) -> Result<Recognition, RecognitionError> {
        let speeches = wrap_items(paths, |path| DataInfo::local(Modality::Speech, path))?;
        self.perform(secret_id, speeches).await
    }

    /// `(ファイル名, バイナリ)` の組で認識する。
    ///
    /// ファイル名の拡張子が [`SPEECH_EXTENSIONS`] にない場合は送信前に失敗する。
    pub async fn perform_with_binary<S: Into<String>>(
        &self,
        secret_id: &str,
        binary: impl IntoIterator<Item = (S, Vec<u8>)>,
    ) -> Result<Recognition, RecognitionError> {
        let mut speeches = Vec::new();
        for (index, (name, buf)) in binary.into_iter().enumerate() {
            let name: String = name.into();
            ensure_extension(&name, SPEECH_EXTENSIONS)?;
            let speech = DataInfo::binary(Modality::Speech, buf, name).ok_or_else(|| {
                RecognitionError::InvalidInput(format!(
                    "インデックス [{index}] のデータリソースが空です"
                ))
            })?;
            speeches.push(speech);
        }
        self.perform(secret_id, speeches).await
    }
}

impl ModalityHandler for SpeechSyncHandler {
    fn handler(&self) -> &Handler {
        &self.inner
    }

    fn handler_mut(&mut self) -> &mut Handler {
        &mut self.inner
    }
}
