//! # 動画認識
//!
//! | 種別 | ハンドラ | ボディ |
//! |------|---------|--------|
//! | 短い動画（同期） | [`VideoSyncHandler`] | multipart (`video`) |
//! | 長い動画（非同期） | [`VideoAsyncHandler`] | JSON |

pub mod scan;
pub mod sync;

pub use scan::{TaskCallbackRule, VideoAsyncHandler, VideoAsyncOptions, VIDEO_API_URL};
pub use sync::{VideoSyncHandler, VideoSyncOptions, VIDEO_EXTENSIONS, VIDEO_SYNC_API_URL};
