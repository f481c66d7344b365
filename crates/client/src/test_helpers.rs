//! # テスト用共通ヘルパー
//!
//! テスト鍵ペアと、受信したリクエストを記録するモック認識サービス。

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, OnceLock};

use axum::extract::{FromRequest, Multipart, Request, State};
use axum::http::StatusCode;
use tupu_crypto::{RsaPrivateKey, Signer, Verifier};

use crate::config::ClientConfig;
use crate::handler::Handler;

/// テスト用RSA秘密鍵（プロセス内で1回だけ生成）
pub fn test_key() -> &'static RsaPrivateKey {
    static KEY: OnceLock<RsaPrivateKey> = OnceLock::new();
    KEY.get_or_init(|| RsaPrivateKey::new(&mut rand::thread_rng(), 1024).unwrap())
}

/// テスト鍵の署名者・検証者ペア
pub fn test_keys() -> (Signer, Verifier) {
    let key = test_key().clone();
    let verifier = Verifier::from_public_key(key.to_public_key());
    (Signer::from_private_key(key), verifier)
}

/// テスト鍵で構築したハンドラ
pub fn test_handler(api_url: &str) -> Handler {
    let (signer, verifier) = test_keys();
    Handler::from_keys(signer, verifier, ClientConfig::with_api_url(api_url))
}

/// テスト鍵で署名したエンベロープ
pub fn signed_envelope(json: &str) -> String {
    let (signer, _) = test_keys();
    serde_json::json!({
        "json": json,
        "signature": signer.sign(json.as_bytes()).unwrap(),
    })
    .to_string()
}

// ---------------------------------------------------------------------------
// モック認識サービス
// ---------------------------------------------------------------------------

/// multipartの1パート
#[derive(Debug, Clone)]
pub struct CapturedField {
    pub name: String,
    pub file_name: Option<String>,
    pub data: Vec<u8>,
}

/// モックが受信した1リクエスト
#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub path: String,
    pub headers: BTreeMap<String, String>,
    pub fields: Vec<CapturedField>,
    pub json: Option<serde_json::Value>,
}

impl CapturedRequest {
    /// ヘッダ値（小文字名）
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    /// 受信順のフィールド名
    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }

    /// 指定名の全フィールドの文字列値
    pub fn texts(&self, name: &str) -> Vec<String> {
        self.fields
            .iter()
            .filter(|f| f.name == name)
            .map(|f| String::from_utf8_lossy(&f.data).into_owned())
            .collect()
    }
}

#[derive(Clone)]
struct MockState {
    status: StatusCode,
    body: String,
    requests: Arc<Mutex<Vec<CapturedRequest>>>,
}

/// 起動済みモックサービス
pub struct MockService {
    /// `http://127.0.0.1:{port}/v3/recognition/`
    pub url: String,
    requests: Arc<Mutex<Vec<CapturedRequest>>>,
}

impl MockService {
    /// これまでに受信したリクエスト
    pub fn requests(&self) -> Vec<CapturedRequest> {
        self.requests.lock().unwrap().clone()
    }
}

async fn capture(State(state): State<MockState>, request: Request) -> (StatusCode, String) {
    let path = request.uri().path().to_string();
    let headers: BTreeMap<String, String> = request
        .headers()
        .iter()
        .map(|(k, v)| {
            (
                k.as_str().to_string(),
                v.to_str().unwrap_or_default().to_string(),
            )
        })
        .collect();
    let is_multipart = headers
        .get("content-type")
        .is_some_and(|v| v.starts_with("multipart/form-data"));

    let mut captured = CapturedRequest {
        path,
        headers,
        fields: Vec::new(),
        json: None,
    };
    if is_multipart {
        let mut multipart = Multipart::from_request(request, &()).await.unwrap();
        while let Some(field) = multipart.next_field().await.unwrap() {
            let name = field.name().unwrap_or_default().to_string();
            let file_name = field.file_name().map(str::to_string);
            let data = field.bytes().await.unwrap().to_vec();
            captured.fields.push(CapturedField {
                name,
                file_name,
                data,
            });
        }
    } else {
        let bytes = axum::body::to_bytes(request.into_body(), usize::MAX)
            .await
            .unwrap();
        captured.json = serde_json::from_slice(&bytes).ok();
    }

    state.requests.lock().unwrap().push(captured);
    (state.status, state.body)
}

/// 全パスで指定ステータス・ボディを返すモックサービスを起動する。
pub async fn start_mock_service(status: u16, body: String) -> MockService {
    let requests = Arc::new(Mutex::new(Vec::new()));
    let state = MockState {
        status: StatusCode::from_u16(status).unwrap(),
        body,
        requests: requests.clone(),
    };
    let app = axum::Router::new().fallback(capture).with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;

    MockService {
        url: format!("http://127.0.0.1:{port}/v3/recognition/"),
        requests,
    }
}

/// 署名済みの成功レスポンスを返すモックサービスを起動する。
pub async fn start_signed_service(json: &str) -> MockService {
    start_mock_service(200, signed_envelope(json)).await
}

/// 接続を受け付けないURL
pub async fn closed_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("http://127.0.0.1:{port}/v3/recognition/")
}
