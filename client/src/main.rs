//! クライアントエントリポイント
//!
//! ホストのシミュレーションループを模したヘッドレスのドライバ。
//! 一定間隔でティックを進め、判断サーバー（またはローカル入力）のコマンドを
//! 移動意図に変換してログに出力します。

use anyhow::{Context, Result};
use clap::Parser;
use log::{info, warn};
use rover_link_client::{App, ClientSettings, ControlMode, FrameSource, StaticFrameSource};
use rover_link_common::utils::path;
use rover_link_common::{decode, LogLevel};
use std::io::BufRead;
use std::path::PathBuf;
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

/// 既定の設定ファイル名
const CONFIG_FILE_NAME: &str = "client.toml";

#[derive(Parser, Debug)]
#[command(name = "rover-link-client")]
#[command(version, about = "ローバー遠隔制御リンク（ヘッドレスドライバ）")]
struct Args {
    /// 設定ファイル（.toml / .json）
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// 判断サーバーのホスト
    #[arg(long)]
    host: Option<String>,

    /// 判断サーバーのポート
    #[arg(short, long)]
    port: Option<u16>,

    /// フレームの送信間隔（秒）
    #[arg(short, long)]
    interval: Option<f32>,

    /// 操作モード（remote / local）
    #[arg(short, long)]
    mode: Option<ControlMode>,

    /// 送信するフレームのファイル（省略時は代替フレーム）
    #[arg(short, long)]
    frame: Option<PathBuf>,

    /// ティックレート（Hz）
    #[arg(long, default_value = "50")]
    tick_rate: u32,

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
        eprintln!("クライアントの実行中にエラーが発生しました: {:#}", e);
        log::error!("クライアントの実行中にエラーが発生しました: {:#}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<()> {
    let mut settings = load_settings(args.config.as_ref())?;
    apply_overrides(&mut settings, &args)?;

    rover_link_common::initialize(settings.logging.level)
        .context("ロガーの初期化に失敗しました")?;

    let frames: Box<dyn FrameSource> = match &args.frame {
        Some(path) => Box::new(
            StaticFrameSource::from_file(path)
                .with_context(|| format!("フレームを読み込めません: {}", path.display()))?,
        ),
        None => Box::new(StaticFrameSource::placeholder()),
    };

    let mut app = App::new(&settings, frames).context("リンクの初期化に失敗しました")?;

    // ローカルモードでは標準入力の各行をコマンド文字列として扱う
    let local_lines = if app.mode() == ControlMode::Local {
        info!("標準入力からコマンド文字列を読み込みます（例: FFl）");
        Some(spawn_stdin_reader())
    } else {
        None
    };

    let tick = Duration::from_secs_f64(1.0 / f64::from(args.tick_rate.max(1)));
    let deadline = args.duration.map(|secs| Instant::now() + Duration::from_secs(secs));
    let mut last = Instant::now();

    info!(
        "ドライバを開始します: {} Hz, 送信間隔 {} 秒",
        args.tick_rate.max(1),
        settings.rate.send_interval_secs
    );

    loop {
        if let Some(lines) = &local_lines {
            while let Ok(line) = lines.try_recv() {
                if let Some(local) = app.local_input() {
                    local.set_command(decode(line.trim().as_bytes()));
                }
            }
        }

        let now = Instant::now();
        let delta_time = now.duration_since(last).as_secs_f32();
        last = now;

        let intent = app.step(delta_time);
        if app.ticks() % u64::from(args.tick_rate.max(1)) == 0 {
            info!("移動意図: {}", intent);
        }

        if deadline.map_or(false, |d| now >= d) {
            break;
        }

        thread::sleep(tick);
    }

    info!("ドライバを終了します ({} ティック)", app.ticks());
    Ok(())
}

/// 設定を読み込む（指定がなければ既定の場所、それもなければ既定値）
fn load_settings(config: Option<&PathBuf>) -> Result<ClientSettings> {
    if let Some(path) = config {
        return ClientSettings::load(path)
            .with_context(|| format!("設定ファイルを読み込めません: {}", path.display()));
    }

    match path::existing(&path::default_config_file(CONFIG_FILE_NAME)) {
        Some(path) => ClientSettings::load(&path)
            .with_context(|| format!("設定ファイルを読み込めません: {}", path.display())),
        None => Ok(ClientSettings::default()),
    }
}

/// コマンドライン引数で設定を上書き
fn apply_overrides(settings: &mut ClientSettings, args: &Args) -> Result<()> {
    if let Some(host) = &args.host {
        settings.network.host = host.clone();
    }
    if let Some(port) = args.port {
        settings.network.port = port;
    }
    if let Some(interval) = args.interval {
        settings.rate.send_interval_secs = interval;
    }
    if let Some(mode) = args.mode {
        settings.control.mode = mode;
    }
    if let Some(level) = &args.log_level {
        settings.logging.level = LogLevel::parse(level)
            .with_context(|| format!("不明なログレベル: {}", level))?;
    }

    settings.validate().context("設定値が不正です")?;
    Ok(())
}

/// 標準入力を読むスレッドを起動
fn spawn_stdin_reader() -> mpsc::Receiver<String> {
    let (sender, receiver) = mpsc::channel();
    thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            match line {
                Ok(line) => {
                    if sender.send(line).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    warn!("標準入力を読み込めません: {}", e);
                    break;
                }
            }
        }
    });
    receiver
}
