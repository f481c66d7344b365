//! # tupu-cli
//!
//! 1回の認識を実行し、ステータスコードと検証済みの結果を表示する。
//!
//! ```text
//! tupu-cli --key rsa_private_key.pem --secret-id <id> image --url http://.../a.jpg --tag t1
//! tupu-cli --key rsa_private_key.pem --secret-id <id> speech --path voice.mp3
//! tupu-cli --key rsa_private_key.pem --secret-id <id> video --url http://.../v.mp4 --interval 2
//! tupu-cli --key rsa_private_key.pem --secret-id <id> text "こんにちは"
//! ```

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tupu_client::speech::SPEECH_SYNC_API_URL;
use tupu_client::text::TEXT_API_URL;
use tupu_client::video::{VideoSyncOptions, VIDEO_SYNC_API_URL};
use tupu_client::{
    ClientConfig, Handler, ImageHandler, ModalityHandler, Recognition, RecognitionError,
    SpeechSyncHandler, TextItem, TextSyncHandler, VideoSyncHandler, ROOT_API_URL,
};

#[derive(Parser)]
#[command(name = "tupu-cli")]
#[command(about = "TUPU content recognition client")]
struct Cli {
    /// RSA秘密鍵（PKCS#1 PEM）のパス
    #[arg(long)]
    key: PathBuf,

    /// シークレットID
    #[arg(long)]
    secret_id: String,

    /// 送信先URL（省略時はモダリティごとの既定URL）
    #[arg(long)]
    server_url: Option<String>,

    /// タイムアウト（秒）
    #[arg(long)]
    timeout: Option<u64>,

    /// サブユーザーID
    #[arg(long)]
    uid: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// 画像認識
    Image {
        #[command(flatten)]
        sources: Sources,
        /// 画像ごとのタグ（後ろの画像には最後のタグが引き継がれる）
        #[arg(long = "tag")]
        tags: Vec<String>,
    },
    /// 音声同期認識
    Speech {
        #[command(flatten)]
        sources: Sources,
    },
    /// 短い動画の同期認識
    Video {
        #[command(flatten)]
        sources: Sources,
        #[arg(long)]
        interval: Option<u8>,
        #[arg(long)]
        max_frames: Option<u16>,
        #[arg(long = "task")]
        tasks: Vec<String>,
    },
    /// テキスト認識
    Text {
        #[arg(required = true)]
        contents: Vec<String>,
    },
}

/// URLまたはローカルパス。どちらか一方のみ指定できる。
#[derive(Args)]
struct Sources {
    #[arg(long = "url", conflicts_with = "paths", required_unless_present = "paths")]
    urls: Vec<String>,
    #[arg(long = "path")]
    paths: Vec<PathBuf>,
}

impl Cli {
    /// 引数から設定を作る。タイムアウト0・空のuidは無視する。
    fn client_config(&self, default_url: &str) -> ClientConfig {
        let mut config = ClientConfig::with_api_url(
            self.server_url.clone().unwrap_or_else(|| default_url.to_string()),
        );
        if let Some(timeout) = self.timeout.filter(|t| *t != 0) {
            config.timeout_secs = timeout;
        }
        config.uid = self.uid.clone().filter(|u| !u.is_empty());
        config
    }

    fn handler(&self, default_url: &str) -> anyhow::Result<Handler> {
        Ok(Handler::with_config(&self.key, self.client_config(default_url))?)
    }
}

async fn run(cli: &Cli) -> Result<Recognition, anyhow::Error> {
    let secret_id = cli.secret_id.as_str();
    let result = match &cli.command {
        Command::Image { sources, tags } => {
            let handler = ImageHandler::from_handler(cli.handler(ROOT_API_URL)?);
            tracing::debug!(url = %handler.handler().config().api_url, "画像認識");
            if sources.paths.is_empty() {
                handler.perform_with_url(secret_id, sources.urls.iter().cloned(), tags).await
            } else {
                handler.perform_with_path(secret_id, sources.paths.iter().cloned(), tags).await
            }
        }
        Command::Speech { sources } => {
            let handler = SpeechSyncHandler::from_handler(cli.handler(SPEECH_SYNC_API_URL)?);
            if sources.paths.is_empty() {
                handler.perform_with_url(secret_id, sources.urls.iter().cloned()).await
            } else {
                handler.perform_with_path(secret_id, sources.paths.iter().cloned()).await
            }
        }
        Command::Video {
            sources,
            interval,
            max_frames,
            tasks,
        } => {
            let handler = VideoSyncHandler::from_handler(cli.handler(VIDEO_SYNC_API_URL)?);
            let options = VideoSyncOptions {
                interval: *interval,
                max_frames: *max_frames,
                tasks: tasks.clone(),
                ..Default::default()
            };
            if sources.paths.is_empty() {
                handler
                    .perform_with_url(secret_id, sources.urls.iter().cloned(), &options)
                    .await
            } else {
                handler
                    .perform_with_path(secret_id, sources.paths.iter().cloned(), &options)
                    .await
            }
        }
        Command::Text { contents } => {
            let handler = TextSyncHandler::from_handler(cli.handler(TEXT_API_URL)?);
            let items: Vec<TextItem> = contents.iter().map(TextItem::new).collect();
            handler.perform(secret_id, &items).await
        }
    };

    match result {
        Ok(recognition) => Ok(recognition),
        Err(e) => {
            report_failure(&e);
            Err(e.into())
        }
    }
}

fn report_failure(error: &RecognitionError) {
    eprintln!("ステータスコード: {}", error.status_code());
    if let Some(payload) = error.unverified_payload() {
        eprintln!("未検証のレスポンス: {payload}");
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let recognition = run(&cli).await?;

    println!("ステータスコード: {}", recognition.status_code);
    match recognition.parse() {
        Some(result) => {
            println!("code: {}, message: {}", result.code, result.message);
            println!("timestamp: {}", result.timestamp_secs());
            for (task_id, value) in &result.tasks {
                println!("{task_id}: {}", serde_json::to_string_pretty(value)?);
            }
        }
        None => println!("{}", recognition.json),
    }
    Ok(())
}
