// ========================================
// Playback State Machine Module
// ========================================
//
// 台本上の現在位置と再生状態を管理する。状態遷移は呼び出し側から見て
// 常に同期的・原子的に適用される。自動前進はワンショットタイマーの
// 連鎖で実現し、タイマーはモード切替・リセット・アンマウントで必ず
// キャンセルされる(古いタイマーが古いインデックスを進めない)。

use std::collections::HashSet;
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

/// 再生状態。不変条件: 0 <= current <= 台本長。
/// playing が true なのは自動前進タイマーが保留中の間だけ。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Playback {
    pub current: usize,
    pub playing: bool,
}

impl Playback {
    pub fn new() -> Self {
        Self {
            current: 0,
            playing: false,
        }
    }

    /// 上限で冪等
    pub fn next(&mut self, len: usize) {
        self.current = (self.current + 1).min(len);
    }

    /// 下限で冪等
    pub fn prev(&mut self) {
        self.current = self.current.saturating_sub(1);
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

impl Default for Playback {
    fn default() -> Self {
        Self::new()
    }
}

pub type TimerToken = u64;

/// キャンセル可能なワンショットタイマーの注入口。
/// 満了はホスト側のイベントループが `Engine::on_timer(token)` で届ける。
/// テストでは偽物のスケジューラでトークンを手動発火できる。
pub trait Scheduler {
    fn schedule(&mut self, delay_ms: u64) -> TimerToken;
    fn cancel(&mut self, token: TimerToken);
}

/// スレッド + チャネルで setTimeout 相当を再現する実スケジューラ。
/// 満了トークンは Receiver に流れ、状態遷移自体はホストスレッドで行う。
pub struct ChannelScheduler {
    tx: mpsc::Sender<TimerToken>,
    next: TimerToken,
    cancelled: Arc<Mutex<HashSet<TimerToken>>>,
}

impl ChannelScheduler {
    pub fn new() -> (Self, mpsc::Receiver<TimerToken>) {
        let (tx, rx) = mpsc::channel();
        (
            Self {
                tx,
                next: 1,
                cancelled: Arc::new(Mutex::new(HashSet::new())),
            },
            rx,
        )
    }
}

impl Scheduler for ChannelScheduler {
    fn schedule(&mut self, delay_ms: u64) -> TimerToken {
        let token = self.next;
        self.next += 1;
        let tx = self.tx.clone();
        let cancelled = Arc::clone(&self.cancelled);
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(delay_ms));
            // キャンセル済みなら送らない。エントリは発火時点で掃除される
            if !cancelled.lock().unwrap().remove(&token) {
                let _ = tx.send(token);
            }
        });
        token
    }

    fn cancel(&mut self, token: TimerToken) {
        self.cancelled.lock().unwrap().insert(token);
    }
}

/// キーボードショートカット
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Space,
    ArrowRight,
    ArrowLeft,
}

/// キー入力のフィルタ条件。テキスト入力中は奪わない、
/// キャンバスがビューポート外なら反応しない。
#[derive(Debug, Clone, Copy)]
pub struct KeyContext {
    pub text_entry_focused: bool,
    pub canvas_in_viewport: bool,
}

impl Default for KeyContext {
    fn default() -> Self {
        Self {
            text_entry_focused: false,
            canvas_in_viewport: true,
        }
    }
}
