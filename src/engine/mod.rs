// ========================================
// Engine Facade
// ========================================
//
// 台本生成 → 再生状態機械 → レイアウト → エクスポートを束ねる。
// データは一方向に流れ、状態遷移は呼び出しスレッド上で同期的に完結する。
// 保留タイマーはモード切替・リセット・アンマウントで必ず先にキャンセルする。

use serde::{Deserialize, Serialize};

use crate::env::EnvironmentSignalProvider;
use crate::export::{self, ARTIFACT_PREFIX, ExportTheme, FileDownloadSink};
use crate::playback::{Key, KeyContext, Playback, Scheduler, TimerToken};
use crate::render::layout::build_frame;
use crate::render::stencil::Frame;
use crate::render::svg;
use crate::script::{ScenarioMode, Step, build_script};

fn default_interval() -> u64 {
    1800
}

/// エンジン設定。JSONから読み込めるようserdeでデシリアライズ可能。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub auto_play_on_mount: bool,
    #[serde(default = "default_interval")]
    pub step_interval_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            auto_play_on_mount: false,
            step_interval_ms: default_interval(),
        }
    }
}

pub struct Engine {
    config: EngineConfig,
    mode: ScenarioMode,
    script: Vec<Step>,
    playback: Playback,
    pending: Option<TimerToken>,
    scheduler: Box<dyn Scheduler>,
    signals: Box<dyn EnvironmentSignalProvider>,
    sink: Box<dyn FileDownloadSink>,
    /// 直近でレンダリングしたFrame。エクスポートはこれを複製して使う。
    frame: Option<Frame>,
}

impl Engine {
    pub fn new(
        config: EngineConfig,
        scheduler: Box<dyn Scheduler>,
        signals: Box<dyn EnvironmentSignalProvider>,
        sink: Box<dyn FileDownloadSink>,
    ) -> Self {
        let mode = ScenarioMode::HumanPresent;
        let mut engine = Self {
            script: build_script(mode),
            mode,
            playback: Playback::new(),
            pending: None,
            scheduler,
            signals,
            sink,
            frame: None,
            config,
        };
        if engine.config.auto_play_on_mount {
            engine.toggle_play();
        }
        engine
    }

    pub fn mode(&self) -> ScenarioMode {
        self.mode
    }

    pub fn script(&self) -> &[Step] {
        &self.script
    }

    pub fn playback(&self) -> Playback {
        self.playback
    }

    /// 台本を作り直し、再生状態を {0, false} に戻す。常に成功する。
    pub fn set_mode(&mut self, mode: ScenarioMode) {
        self.cancel_pending();
        self.mode = mode;
        self.script = build_script(mode);
        self.playback.reset();
        self.frame = None;
        log::debug!("scenario mode -> {}", mode.as_str());
    }

    pub fn next(&mut self) {
        self.playback.next(self.script.len());
    }

    pub fn prev(&mut self) {
        self.playback.prev();
    }

    pub fn reset(&mut self) {
        self.cancel_pending();
        self.playback.reset();
    }

    /// 再生/一時停止を切り替える。末尾では何も起きない(進める物がない)。
    pub fn toggle_play(&mut self) {
        if self.playback.playing {
            self.cancel_pending();
            self.playback.playing = false;
            return;
        }
        if self.playback.current >= self.script.len() {
            return;
        }
        self.playback.playing = true;
        self.arm_timer();
    }

    /// ホストのイベントループがタイマー満了を届ける。
    /// 保留中のトークン以外(キャンセル済み・旧モードの物)は無視する。
    pub fn on_timer(&mut self, token: TimerToken) {
        if self.pending != Some(token) {
            log::trace!("stale timer token {token} ignored");
            return;
        }
        self.pending = None;
        if !self.playback.playing {
            return;
        }
        self.next();
        if self.playback.current < self.script.len() {
            self.arm_timer();
        } else {
            // 末尾に到達したら自然停止
            self.playback.playing = false;
        }
    }

    /// Space → 再生切替、← / → → 前後ステップ。
    /// テキスト入力中やキャンバスが画面外の間は何もしない。
    pub fn handle_key(&mut self, key: Key, ctx: &KeyContext) {
        if ctx.text_entry_focused || !ctx.canvas_in_viewport {
            return;
        }
        match key {
            Key::Space => self.toggle_play(),
            Key::ArrowRight => self.next(),
            Key::ArrowLeft => self.prev(),
        }
    }

    /// 現在の台本・再生状態・環境シグナルからFrameを計算して保持する
    pub fn render(&mut self) -> &Frame {
        let signals = self.signals.current();
        self.frame
            .insert(build_frame(&self.script, self.mode, self.playback, signals))
    }

    /// ベクタエクスポート。レンダリング済みFrameが無ければログだけ残して何もしない。
    pub fn export_svg(&mut self, theme: ExportTheme) {
        let Some(frame) = self.frame.as_ref() else {
            log::warn!("svg export skipped: no rendered diagram");
            return;
        };
        let themed = export::retheme(frame, theme);
        let name = export::filename(ARTIFACT_PREFIX, self.mode, theme, "svg");
        let doc = svg::serialize(&themed);
        if let Err(e) = self.sink.deliver(doc.as_bytes(), &name, "image/svg+xml") {
            log::error!("svg export failed: {e}");
        }
    }

    /// ラスタエクスポート。中間SVGのデコードに失敗しても落とさずログに残す。
    pub fn export_png(&mut self, theme: ExportTheme) {
        let Some(frame) = self.frame.as_ref() else {
            log::warn!("png export skipped: no rendered diagram");
            return;
        };
        let themed = export::retheme(frame, theme);
        let name = export::filename(ARTIFACT_PREFIX, self.mode, theme, "png");
        let doc = svg::serialize(&themed);
        match export::rasterize(&doc, themed.width, themed.height) {
            Ok(png) => {
                if let Err(e) = self.sink.deliver(&png, &name, "image/png") {
                    log::error!("png export failed: {e}");
                }
            }
            Err(e) => log::error!("png export failed: {e}"),
        }
    }

    /// エンジンの破棄。保留タイマーを止め、以後のエクスポートをno-opにする。
    pub fn unmount(&mut self) {
        self.cancel_pending();
        self.playback.playing = false;
        self.frame = None;
    }

    fn arm_timer(&mut self) {
        self.pending = Some(self.scheduler.schedule(self.config.step_interval_ms));
    }

    fn cancel_pending(&mut self) {
        if let Some(token) = self.pending.take() {
            self.scheduler.cancel(token);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::{EnvSignals, StaticSignals};
    use crate::export::MemorySink;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Default)]
    struct FakeSchedulerState {
        scheduled: Vec<(TimerToken, u64)>,
        cancelled: Vec<TimerToken>,
        next: TimerToken,
    }

    struct FakeScheduler(Rc<RefCell<FakeSchedulerState>>);

    impl Scheduler for FakeScheduler {
        fn schedule(&mut self, delay_ms: u64) -> TimerToken {
            let mut s = self.0.borrow_mut();
            let token = s.next;
            s.next += 1;
            s.scheduled.push((token, delay_ms));
            token
        }

        fn cancel(&mut self, token: TimerToken) {
            self.0.borrow_mut().cancelled.push(token);
        }
    }

    fn engine_with(config: EngineConfig) -> (Engine, Rc<RefCell<FakeSchedulerState>>, MemorySink) {
        let state = Rc::new(RefCell::new(FakeSchedulerState::default()));
        let sink = MemorySink::new();
        let engine = Engine::new(
            config,
            Box::new(FakeScheduler(Rc::clone(&state))),
            Box::new(StaticSignals(EnvSignals::default())),
            Box::new(sink.clone()),
        );
        (engine, state, sink)
    }

    fn engine() -> (Engine, Rc<RefCell<FakeSchedulerState>>, MemorySink) {
        engine_with(EngineConfig::default())
    }

    #[test]
    fn test_initial_state() {
        let (engine, state, _) = engine();
        assert_eq!(engine.playback(), Playback { current: 0, playing: false });
        assert!(state.borrow().scheduled.is_empty());
    }

    #[test]
    fn test_auto_play_on_mount_schedules_timer() {
        let (engine, state, _) = engine_with(EngineConfig {
            auto_play_on_mount: true,
            step_interval_ms: 1000,
        });
        assert!(engine.playback().playing);
        assert_eq!(state.borrow().scheduled, vec![(0, 1000)]);
    }

    #[test]
    fn test_next_clamps_at_script_length() {
        let (mut engine, _, _) = engine();
        for _ in 0..11 {
            engine.next();
        }
        assert_eq!(engine.playback().current, 11);
        engine.next(); // 12回目
        assert_eq!(engine.playback().current, 11);
    }

    #[test]
    fn test_set_mode_resets_and_cancels_timer() {
        let (mut engine, state, _) = engine();
        for _ in 0..7 {
            engine.next();
        }
        engine.toggle_play();
        let armed = state.borrow().scheduled.last().copied().unwrap().0;

        engine.set_mode(ScenarioMode::Delegated);
        assert_eq!(engine.playback(), Playback { current: 0, playing: false });
        assert!(state.borrow().cancelled.contains(&armed));
        assert_eq!(engine.mode(), ScenarioMode::Delegated);
    }

    #[test]
    fn test_toggle_play_is_noop_at_end() {
        let (mut engine, state, _) = engine();
        for _ in 0..11 {
            engine.next();
        }
        engine.toggle_play();
        assert!(!engine.playback().playing);
        assert!(state.borrow().scheduled.is_empty());
    }

    #[test]
    fn test_auto_advance_walks_to_end_and_stops() {
        let (mut engine, state, _) = engine_with(EngineConfig {
            auto_play_on_mount: false,
            step_interval_ms: 1000,
        });
        engine.toggle_play();

        let mut fired = 0;
        loop {
            let token = {
                let s = state.borrow();
                match s.scheduled.get(fired) {
                    Some((t, delay)) => {
                        assert_eq!(*delay, 1000);
                        *t
                    }
                    None => break,
                }
            };
            engine.on_timer(token);
            fired += 1;
        }

        assert_eq!(fired, 11);
        assert_eq!(engine.playback(), Playback { current: 11, playing: false });
    }

    #[test]
    fn test_stale_timer_does_not_advance() {
        let (mut engine, state, _) = engine();
        engine.toggle_play();
        let old = state.borrow().scheduled[0].0;
        engine.reset();

        engine.on_timer(old);
        assert_eq!(engine.playback(), Playback { current: 0, playing: false });
    }

    #[test]
    fn test_reset_from_any_state() {
        let (mut engine, _, _) = engine();
        engine.next();
        engine.next();
        engine.toggle_play();
        engine.reset();
        assert_eq!(engine.playback(), Playback { current: 0, playing: false });
    }

    #[test]
    fn test_keyboard_mapping_and_filtering() {
        let (mut engine, _, _) = engine();
        let active = KeyContext::default();

        engine.handle_key(Key::ArrowRight, &active);
        assert_eq!(engine.playback().current, 1);
        engine.handle_key(Key::ArrowLeft, &active);
        assert_eq!(engine.playback().current, 0);
        engine.handle_key(Key::Space, &active);
        assert!(engine.playback().playing);
        engine.handle_key(Key::Space, &active);
        assert!(!engine.playback().playing);

        // テキスト入力中は奪わない
        engine.handle_key(Key::ArrowRight, &KeyContext {
            text_entry_focused: true,
            canvas_in_viewport: true,
        });
        assert_eq!(engine.playback().current, 0);

        // ビューポート外では反応しない
        engine.handle_key(Key::ArrowRight, &KeyContext {
            text_entry_focused: false,
            canvas_in_viewport: false,
        });
        assert_eq!(engine.playback().current, 0);
    }

    #[test]
    fn test_export_svg_delivers_named_file() {
        let (mut engine, _, sink) = engine();
        engine.set_mode(ScenarioMode::Delegated);
        for _ in 0..11 {
            engine.next();
        }
        engine.render();
        engine.export_svg(ExportTheme::Dark);

        let got = sink.deliveries();
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].filename, "ap2-sequence-delegated-dark.svg");
        assert_eq!(got[0].mime, "image/svg+xml");
        let doc = String::from_utf8(got[0].bytes.clone()).unwrap();
        assert!(doc.contains("#0b1220")); // エクスポートテーマの背景
        assert!(!doc.contains("transition"));
    }

    #[test]
    fn test_export_png_delivers_bitmap() {
        let (mut engine, _, sink) = engine();
        engine.render();
        engine.export_png(ExportTheme::Light);

        let got = sink.deliveries();
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].filename, "ap2-sequence-human-light.png");
        assert_eq!(got[0].mime, "image/png");
        assert_eq!(&got[0].bytes[..4], &[0x89, b'P', b'N', b'G']);
    }

    #[test]
    fn test_export_after_unmount_is_silent_noop() {
        let (mut engine, _, sink) = engine();
        engine.render();
        engine.unmount();
        engine.export_svg(ExportTheme::Dark);
        engine.export_png(ExportTheme::Dark);
        assert!(sink.deliveries().is_empty());
    }

    #[test]
    fn test_export_before_render_is_silent_noop() {
        let (mut engine, _, sink) = engine();
        engine.export_svg(ExportTheme::Light);
        assert!(sink.deliveries().is_empty());
    }

    #[test]
    fn test_config_deserializes_with_defaults() {
        let config: EngineConfig = serde_json::from_str("{}").unwrap();
        assert!(!config.auto_play_on_mount);
        assert_eq!(config.step_interval_ms, 1800);

        let config: EngineConfig =
            serde_json::from_str(r#"{"auto_play_on_mount":true,"step_interval_ms":500}"#).unwrap();
        assert!(config.auto_play_on_mount);
        assert_eq!(config.step_interval_ms, 500);
    }
}
