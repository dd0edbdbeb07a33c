use colored::*;
use log::info;

use emaki::{
    ChannelScheduler, DirectorySink, Engine, EngineConfig, EnvSignals, StaticSignals,
};

fn main() {
    let cli_args = emaki::parse_args();
    emaki::init_logger(&cli_args.log_level);

    if let Err(e) = run(&cli_args) {
        eprintln!("{}", format!("error: {e}").red().bold());
        std::process::exit(1);
    }
}

fn run(args: &emaki::CliArgs) -> Result<(), String> {
    let config = match &args.config_path {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .map_err(|e| format!("failed to read {path}: {e}"))?;
            serde_json::from_str::<EngineConfig>(&text)
                .map_err(|e| format!("invalid config {path}: {e}"))?
        }
        None => EngineConfig::default(),
    };

    // CLIは静的な書き出しのみなので自動再生タイマーは受信しない
    let (scheduler, _timer_rx) = ChannelScheduler::new();

    let mut engine = Engine::new(
        config,
        Box::new(scheduler),
        Box::new(StaticSignals(EnvSignals::default())),
        Box::new(DirectorySink::new(&args.out_dir)),
    );

    engine.set_mode(args.mode);
    let position = args
        .at
        .unwrap_or(engine.script().len())
        .min(engine.script().len());
    for _ in 0..position {
        engine.next();
    }

    engine.render();
    engine.export_svg(args.export_theme);
    engine.export_png(args.export_theme);

    info!(
        "exported {} diagram ({}) at step {} / {}",
        engine.mode().label(),
        args.export_theme.as_str(),
        engine.playback().current,
        engine.script().len()
    );
    Ok(())
}
