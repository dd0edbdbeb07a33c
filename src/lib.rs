pub mod engine;
pub mod env;
pub mod export;
pub mod playback;
pub mod render;
pub mod script;

pub use engine::{Engine, EngineConfig};
pub use env::{EnvSignals, EnvironmentSignalProvider, SharedSignals, StaticSignals};
pub use export::{DirectorySink, ExportTheme, FileDownloadSink, MemorySink};
pub use playback::{ChannelScheduler, Key, KeyContext, Playback, Scheduler, TimerToken};
pub use render::{Frame, Stencil};
pub use script::{Accent, ScenarioMode, Step, build_script};

use log::warn;
use std::env as std_env;

// ========================================
// コマンドライン引数構造体
// ========================================

/// コマンドライン引数の設定
#[derive(Debug)]
pub struct CliArgs {
    pub mode: ScenarioMode,
    pub export_theme: ExportTheme,
    pub out_dir: String,
    /// エクスポート前に進めておく再生位置(省略時は末尾まで)
    pub at: Option<usize>,
    pub config_path: Option<String>,
    pub log_level: LogLevel,
}

#[derive(Debug, Clone)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl Default for CliArgs {
    fn default() -> Self {
        Self {
            mode: ScenarioMode::HumanPresent,
            export_theme: ExportTheme::Light,
            out_dir: ".".to_string(),
            at: None,
            config_path: None,
            log_level: LogLevel::Info,
        }
    }
}

pub fn parse_args() -> CliArgs {
    let args: Vec<String> = std_env::args().collect();
    let mut cli_args = CliArgs::default();

    for arg in args.iter().skip(1) {
        match arg.as_str() {
            "--mode=human" => cli_args.mode = ScenarioMode::HumanPresent,
            "--mode=delegated" => cli_args.mode = ScenarioMode::Delegated,
            "--theme=light" => cli_args.export_theme = ExportTheme::Light,
            "--theme=dark" => cli_args.export_theme = ExportTheme::Dark,
            "--log-level=off" => cli_args.log_level = LogLevel::Off,
            "--log-level=error" => cli_args.log_level = LogLevel::Error,
            "--log-level=warn" => cli_args.log_level = LogLevel::Warn,
            "--log-level=info" => cli_args.log_level = LogLevel::Info,
            "--log-level=debug" => cli_args.log_level = LogLevel::Debug,
            "--log-level=trace" => cli_args.log_level = LogLevel::Trace,
            "--help" | "-h" => {
                show_help();
                std::process::exit(0);
            }
            other => {
                if let Some(dir) = other.strip_prefix("--out=") {
                    cli_args.out_dir = dir.to_string();
                } else if let Some(path) = other.strip_prefix("--config=") {
                    cli_args.config_path = Some(path.to_string());
                } else if let Some(n) = other.strip_prefix("--at=") {
                    match n.parse::<usize>() {
                        Ok(v) => cli_args.at = Some(v),
                        Err(_) => warn!("ignoring invalid --at value: {n}"),
                    }
                } else {
                    warn!("ignoring unknown argument: {other}");
                }
            }
        }
    }
    cli_args
}

pub fn show_help() {
    println!(
        "Emaki Sequence Diagram Exporter

USAGE:
    emaki [OPTIONS]

OPTIONS:
    --mode=MODE              Scenario mode (human/delegated, default: human)
    --theme=THEME            Export theme (light/dark, default: light)
    --out=DIR                Output directory (default: current directory)
    --at=N                   Playback position before export (default: last step)
    --config=FILE            Engine config JSON file
    --log-level=LEVEL        Set log level (off/error/warn/info/debug/trace)
    --help, -h               Show this help"
    );
}

/// ログレベルを初期化する関数
pub fn init_logger(log_level: &LogLevel) {
    use env_logger::Builder;
    use log::LevelFilter;
    use std::sync::Once;

    static INIT: Once = Once::new();

    INIT.call_once(|| {
        let level = match log_level {
            LogLevel::Off => LevelFilter::Off,
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        };

        Builder::from_default_env()
            .filter_level(level)
            .format_timestamp_secs()
            .try_init()
            .ok();
    });
}
