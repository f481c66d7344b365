//! # 音声認識
//!
//! | 種別 | ハンドラ | ボディ |
//! |------|---------|--------|
//! | 短い音声（同期） | [`SpeechSyncHandler`] | multipart (`speech`) |
//! | 長時間録音（非同期） | [`SpeechAsyncHandler`] | JSON (`recording`) |
//! | ストリーム | [`SpeechStreamHandler`] | JSON (`speechStream`) |

pub mod recording;
pub mod stream;
pub mod sync;

pub use recording::{
    SpeechAsyncHandler, SpeechAsyncOptions, CALLBACK_RULE_ALL, SPEECH_ASYNC_API_URL,
};
pub use stream::{
    SpeechStreamHandler, SpeechStreamOptions, CALLBACK_ALL_RECOGNITION, CALLBACK_END_STATUS,
    CALLBACK_NONE, SPEECH_STREAM_API_URL,
};
pub use sync::{SpeechSyncHandler, SPEECH_EXTENSIONS, SPEECH_SYNC_API_URL};

/// 音声 低俗・不適切発言
pub const SPEECH_VULGAR_TASK_ID: &str = "5c8213b9bc807806aab0a574";
/// 音声 内容分析
pub const SPEECH_ANALYSIS_TASK_ID: &str = "5caee6b2a76925c55a09a6d2";
/// 音声 文字起こし
pub const SPEECH_TRANSLATION_TASK_ID: &str = "5ca1bd6b3872ecc9afb99132";
/// 音声 話者の性別
pub const SPEECH_GENDER_TASK_ID: &str = "5f59e4b71b29fa890e5472fb";
