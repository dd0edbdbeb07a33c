// 環境シグナル(ダークテーマ / reduced motion)の注入口。
// エンジンはこれらを毎フレーム読み取るだけで、所有も変更もしない。
// ブラウザのグローバル状態を直接覗く代わりに購読可能なproviderとして抽象化する。

use std::sync::{Arc, Mutex};

/// 外部から供給される UI コンテキスト。非同期にいつでも変わりうる。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EnvSignals {
    pub dark: bool,
    pub reduced_motion: bool,
}

pub type SubscriptionId = u64;

pub type SignalListener = Box<dyn Fn(EnvSignals) + Send>;

pub trait EnvironmentSignalProvider {
    fn current(&self) -> EnvSignals;
    fn subscribe(&mut self, listener: SignalListener) -> SubscriptionId;
    fn unsubscribe(&mut self, id: SubscriptionId);
}

/// 値が変化しない固定シグナル。CLIやテストで使う。
pub struct StaticSignals(pub EnvSignals);

impl EnvironmentSignalProvider for StaticSignals {
    fn current(&self) -> EnvSignals {
        self.0
    }

    // 値は変化しないので通知は一度も発生しない
    fn subscribe(&mut self, _listener: SignalListener) -> SubscriptionId {
        0
    }

    fn unsubscribe(&mut self, _id: SubscriptionId) {}
}

struct SharedInner {
    signals: EnvSignals,
    listeners: Vec<(SubscriptionId, SignalListener)>,
    next_id: SubscriptionId,
}

/// ホスト側から更新できる共有シグナル。`set` で値を差し替えると
/// 登録済みリスナー全員に新しい値を通知する。ハンドルは自由にクローンできる。
#[derive(Clone)]
pub struct SharedSignals {
    inner: Arc<Mutex<SharedInner>>,
}

impl SharedSignals {
    pub fn new(initial: EnvSignals) -> Self {
        Self {
            inner: Arc::new(Mutex::new(SharedInner {
                signals: initial,
                listeners: Vec::new(),
                next_id: 1,
            })),
        }
    }

    pub fn set(&self, signals: EnvSignals) {
        let mut inner = self.inner.lock().unwrap();
        if inner.signals == signals {
            return;
        }
        inner.signals = signals;
        log::debug!(
            "env signals changed: dark={} reduced_motion={}",
            signals.dark,
            signals.reduced_motion
        );
        for (_, listener) in &inner.listeners {
            listener(signals);
        }
    }
}

impl EnvironmentSignalProvider for SharedSignals {
    fn current(&self) -> EnvSignals {
        self.inner.lock().unwrap().signals
    }

    fn subscribe(&mut self, listener: SignalListener) -> SubscriptionId {
        let mut inner = self.inner.lock().unwrap();
        let id = inner.next_id;
        inner.next_id += 1;
        inner.listeners.push((id, listener));
        id
    }

    fn unsubscribe(&mut self, id: SubscriptionId) {
        let mut inner = self.inner.lock().unwrap();
        inner.listeners.retain(|(lid, _)| *lid != id);
    }
}
