//! # リクエスト組み立て
//!
//! 署名パラメータとデータリソースから送信可能な `reqwest::Request` を作る。
//!
//! ## multipartボディのフィールド順
//! 1. `timestamp`, `nonce`, `signature`, (`uid`)
//! 2. `task`（0個以上、繰り返し）
//! 3. データごとに: データパート → そのデータの補助フィールド
//!
//! ## データパートの表現
//! | 取得元 | 表現 |
//! |--------|------|
//! | リモートURL | プレーンなフィールド（値 = URL） |
//! | ローカルパス | ファイルパート（ファイル名 = basename） |
//! | バイナリ | ファイルパート（ファイル名 = 指定名） |
//!
//! 1件でも組み立てに失敗したら、リクエストは作られず何も送信されない。

use reqwest::header::USER_AGENT;
use reqwest::multipart::{Form, Part};
use serde_json::{Map, Value};
use tupu_types::{DataInfo, DataSource};

use crate::config::RequestTarget;
use crate::error::RecognitionError;
use crate::signing::SigningParams;

/// ファイルパートのContent-Type
const FILE_PART_MIME: &str = "application/octet-stream";

/// 1件分のデータパート
enum Encoded {
    /// プレーンなフィールド
    Field(String),
    /// ファイルパート
    File(Part),
}

/// 1件のデータリソースをデータパートに変換する。
///
/// ローカルファイルはここで全て読み込むため、I/Oエラーは送信前に表面化する。
async fn encode_source(index: usize, source: DataSource) -> Result<Encoded, RecognitionError> {
    if !source.is_populated() {
        return Err(RecognitionError::Assembly(format!(
            "インデックス [{index}] のデータリソースが不正です"
        )));
    }

    let (bytes, file_name) = match source {
        DataSource::RemoteUrl(url) => return Ok(Encoded::Field(url)),
        DataSource::LocalPath(path) => {
            let bytes = tokio::fs::read(&path).await.map_err(|e| {
                RecognitionError::Assembly(format!(
                    "インデックス [{index}] のファイル {} を読み込めません: {e}",
                    path.display()
                ))
            })?;
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            (bytes, file_name)
        }
        DataSource::InMemory { buffer, file_name } => (buffer, file_name),
    };

    let part = Part::bytes(bytes)
        .file_name(file_name)
        .mime_str(FILE_PART_MIME)
        .map_err(|e| RecognitionError::Assembly(e.to_string()))?;
    Ok(Encoded::File(part))
}

/// multipartリクエストを組み立てる。
///
/// `items` はこの関数に所有権ごと渡され、返り値のリクエストにのみ中身が残る。
pub async fn assemble_multipart(
    client: &reqwest::Client,
    target: &RequestTarget,
    secret_id: &str,
    user_agent: &str,
    params: &SigningParams,
    items: Vec<DataInfo>,
    tasks: &[String],
) -> Result<reqwest::Request, RecognitionError> {
    let mut form = Form::new();
    for (key, value) in params.fields() {
        form = form.text(key, value);
    }
    for task in tasks {
        form = form.text("task", task.clone());
    }

    let count = items.len();
    for (index, item) in items.into_iter().enumerate() {
        let (modality, source, side_channel) = item.into_parts();
        let field = modality.field_name();

        form = match encode_source(index, source).await? {
            Encoded::Field(value) => form.text(field, value),
            Encoded::File(part) => form.part(field, part),
        };
        for (key, value) in side_channel {
            form = form.text(key, value);
        }
    }

    tracing::debug!(
        secret_id,
        url = %target.url,
        items = count,
        tasks = tasks.len(),
        "multipartリクエストを組み立てました"
    );

    client
        .post(target.endpoint(secret_id))
        .header(USER_AGENT, user_agent)
        .header("Timeout", target.timeout_header())
        .timeout(target.local_deadline())
        .multipart(form)
        .build()
        .map_err(|e| RecognitionError::Assembly(format!("リクエストの構築に失敗: {e}")))
}

/// JSONリクエストを組み立てる。
///
/// 呼び出し元のペイロードに署名パラメータをマージした1つのオブジェクトを送る。
pub fn assemble_json(
    client: &reqwest::Client,
    target: &RequestTarget,
    secret_id: &str,
    user_agent: &str,
    params: &SigningParams,
    mut payload: Map<String, Value>,
) -> Result<reqwest::Request, RecognitionError> {
    params.write_json(&mut payload);

    let body = serde_json::to_vec(&Value::Object(payload))
        .map_err(|e| RecognitionError::Assembly(format!("JSONのシリアライズに失敗: {e}")))?;

    tracing::debug!(secret_id, url = %target.url, "JSONリクエストを組み立てました");

    client
        .post(target.endpoint(secret_id))
        .header(reqwest::header::CONTENT_TYPE, "application/json")
        .header(USER_AGENT, user_agent)
        .header("Timeout", target.timeout_header())
        .timeout(target.local_deadline())
        .body(body)
        .build()
        .map_err(|e| RecognitionError::Assembly(format!("リクエストの構築に失敗: {e}")))
}
