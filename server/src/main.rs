//! 判断サーバーエントリポイント
//!
//! 設定を読み込み、TCP サーバーを起動して待ち受けます。

use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use rover_link_common::utils::path;
use rover_link_common::LogLevel;
use rover_link_server::{decision, ServerSettings, TcpServer};
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

/// 既定の設定ファイル名
const CONFIG_FILE_NAME: &str = "server.toml";

#[derive(Parser, Debug)]
#[command(name = "rover-link-server")]
#[command(version, about = "ローバー遠隔制御リンクの判断サーバー")]
struct Args {
    /// 設定ファイル（.toml / .json）
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// バインドアドレス
    #[arg(short, long)]
    bind: Option<String>,

    /// ポート番号
    #[arg(short, long)]
    port: Option<u16>,

    /// 返信するコマンド文字列（複数指定で順番に返す）
    #[arg(short, long)]
    reply: Vec<String>,

    /// 最大接続数
    #[arg(long)]
    max_connections: Option<usize>,

    /// 実行時間（秒、省略時は無制限）
    #[arg(short, long)]
    duration: Option<u64>,

    /// ログレベル（trace / debug / info / warn / error）
    #[arg(long)]
    log_level: Option<String>,
}

fn main() {
    let args = Args::parse();

    if let Err(e) = run(args) {
        eprintln!("サーバーの実行中にエラーが発生しました: {:#}", e);
        log::error!("サーバーの実行中にエラーが発生しました: {:#}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<()> {
    let mut settings = match &args.config {
        Some(path) => ServerSettings::load(path)
            .with_context(|| format!("設定ファイルを読み込めません: {}", path.display()))?,
        None => match path::existing(&path::default_config_file(CONFIG_FILE_NAME)) {
            Some(path) => ServerSettings::load(&path)
                .with_context(|| format!("設定ファイルを読み込めません: {}", path.display()))?,
            None => ServerSettings::default(),
        },
    };

    if let Some(bind) = &args.bind {
        settings.network.bind_address = bind.clone();
    }
    if let Some(port) = args.port {
        settings.network.port = port;
    }
    if !args.reply.is_empty() {
        settings.decision.replies = args.reply.clone();
    }
    if let Some(max_connections) = args.max_connections {
        settings.network.max_connections = max_connections;
    }
    if let Some(level) = &args.log_level {
        settings.logging.level =
            LogLevel::parse(level).with_context(|| format!("不明なログレベル: {}", level))?;
    }
    settings.validate().context("設定値が不正です")?;

    rover_link_common::initialize(settings.logging.level)
        .context("ロガーの初期化に失敗しました")?;

    let policy = decision::from_settings(&settings.decision);
    let mut server = TcpServer::new(settings.network.clone(), policy);
    let addr = server.start().context("サーバーを起動できません")?;
    info!("判断サーバーを起動しました: {} (返信: {:?})", addr, settings.decision.replies);

    let deadline = args.duration.map(|secs| Instant::now() + Duration::from_secs(secs));
    while server.is_running() {
        if deadline.map_or(false, |d| Instant::now() >= d) {
            break;
        }
        thread::sleep(Duration::from_millis(200));
    }

    server.stop();
    info!("判断サーバーを終了しました");
    Ok(())
}
