//! 기법별 세션.
//!
//! 각 세션은 자신의 상태 머신과 I/O 루프를 소유한다.
//! 공통 부품:
//!
//! - [`RunGate`]: 실행 세대를 여닫는 게이트. `stop` 이후 늦게 도착한 응답이
//!   공유 상태를 건드리지 못하게 막는다.
//! - [`Signal`]: `watch` 채널 기반 상태 신호 (세션 상태, 연결 상태)

pub mod long_polling;
pub mod push_channel;
pub mod short_polling;

use async_trait::async_trait;
use rtcompare_core::error::CoreError;
use rtcompare_core::models::metrics::Technique;
use rtcompare_core::models::session::SessionState;
use std::time::Duration;
use tokio::sync::watch;

pub use long_polling::LongPollingSession;
pub use push_channel::PushChannelSession;
pub use short_polling::ShortPollingSession;

/// 세 기법 세션의 공통 인터페이스
#[async_trait]
pub trait TechniqueSession: Send + Sync {
    /// 담당 기법
    fn technique(&self) -> Technique;

    /// 현재 상태
    fn state(&self) -> SessionState;

    /// 상태 변경 구독
    fn subscribe_state(&self) -> watch::Receiver<SessionState>;

    /// 설정된 기본값으로 시작 (숏/롱 폴링 `start`, 푸시 `connect`)
    async fn activate(&self) -> Result<(), CoreError>;

    /// 중지 (이미 비활성이면 no-op)
    async fn deactivate(&self);
}

// ============================================================
// 상태 신호
// ============================================================

/// `watch` 채널 위의 값 신호. 구독자가 없어도 값은 갱신된다.
#[derive(Debug)]
pub struct Signal<T> {
    tx: watch::Sender<T>,
}

impl<T: Copy + PartialEq + Send + Sync> Signal<T> {
    pub fn new(initial: T) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx }
    }

    pub fn get(&self) -> T {
        *self.tx.borrow()
    }

    /// 값이 바뀐 경우에만 구독자에게 알린다
    pub fn set(&self, value: T) {
        self.tx.send_if_modified(|current| {
            if *current == value {
                false
            } else {
                *current = value;
                true
            }
        });
    }

    pub fn subscribe(&self) -> watch::Receiver<T> {
        self.tx.subscribe()
    }
}

impl Signal<SessionState> {
    /// 실행 중이 아닐 때만 `next`로 전이 (원자적)
    ///
    /// 이미 실행 중이면 `false`.
    pub fn try_begin(&self, next: SessionState) -> bool {
        self.tx.send_if_modified(|current| {
            if current.is_running() {
                false
            } else {
                *current = next;
                true
            }
        })
    }
}

// ============================================================
// 실행 게이트
// ============================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RunEpoch {
    generation: u64,
    open: bool,
}

/// 실행 세대 게이트
///
/// `open()`마다 새 세대를 열고 그 세대의 [`RunTicket`]을 발급한다.
/// `close()`는 현재 세대를 닫는다. 닫힌 세대의 티켓은 다시 살아나지 않는다.
#[derive(Debug)]
pub struct RunGate {
    tx: watch::Sender<RunEpoch>,
}

impl RunGate {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(RunEpoch {
            generation: 0,
            open: false,
        });
        Self { tx }
    }

    /// 새 세대 열기
    pub fn open(&self) -> RunTicket {
        let mut generation = 0;
        self.tx.send_modify(|epoch| {
            epoch.generation += 1;
            epoch.open = true;
            generation = epoch.generation;
        });
        RunTicket {
            generation,
            rx: self.tx.subscribe(),
        }
    }

    /// 현재 세대 닫기
    ///
    /// 반환 시점 이후로는 어떤 티켓의 `commit`도 실행되지 않는다.
    /// 진행 중인 `commit`이 있으면 끝날 때까지 기다린다.
    pub fn close(&self) -> bool {
        self.tx.send_if_modified(|epoch| {
            if epoch.open {
                epoch.open = false;
                true
            } else {
                false
            }
        })
    }

    pub fn is_open(&self) -> bool {
        self.tx.borrow().open
    }
}

impl Default for RunGate {
    fn default() -> Self {
        Self::new()
    }
}

/// 한 실행 세대에 속한 태스크가 들고 다니는 티켓
#[derive(Debug, Clone)]
pub struct RunTicket {
    generation: u64,
    rx: watch::Receiver<RunEpoch>,
}

impl RunTicket {
    /// 발급된 세대가 아직 열려 있는지
    pub fn is_live(&self) -> bool {
        let epoch = self.rx.borrow();
        epoch.open && epoch.generation == self.generation
    }

    /// 세대가 살아 있을 때만 `f` 실행
    ///
    /// `f`가 도는 동안 게이트의 읽기 borrow를 잡고 있으므로 `close()`와 경합하지 않는다.
    /// `f` 안에서 같은 게이트를 닫으면 교착된다.
    pub fn commit<R>(&self, f: impl FnOnce() -> R) -> Option<R> {
        let epoch = self.rx.borrow();
        if epoch.open && epoch.generation == self.generation {
            Some(f())
        } else {
            None
        }
    }

    /// `duration`만큼 대기. 도중에 세대가 닫히면 즉시 `false`.
    pub async fn sleep(&mut self, duration: Duration) -> bool {
        let deadline = tokio::time::sleep(duration);
        tokio::pin!(deadline);
        loop {
            if !self.is_live() {
                return false;
            }
            tokio::select! {
                _ = &mut deadline => return self.is_live(),
                changed = self.rx.changed() => {
                    if changed.is_err() {
                        return false;
                    }
                }
            }
        }
    }

    /// 세대가 닫힐 때까지 대기
    pub async fn closed(&mut self) {
        while self.is_live() {
            if self.rx.changed().await.is_err() {
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signal_try_begin_rejects_running() {
        let signal = Signal::new(SessionState::Inactive);
        assert!(signal.try_begin(SessionState::Waiting));
        assert_eq!(signal.get(), SessionState::Waiting);
        assert!(!signal.try_begin(SessionState::Active));

        signal.set(SessionState::Error);
        assert!(signal.try_begin(SessionState::Starting));
    }

    #[test]
    fn closed_generation_never_commits() {
        let gate = RunGate::new();
        let first = gate.open();
        assert!(first.is_live());
        assert!(gate.close());
        assert!(!gate.close());
        assert_eq!(first.commit(|| 1), None);

        // 새 세대가 열려도 이전 티켓은 죽은 채로 남는다
        let second = gate.open();
        assert!(!first.is_live());
        assert_eq!(second.commit(|| 2), Some(2));
    }

    #[tokio::test(start_paused = true)]
    async fn sleep_wakes_on_close() {
        let gate = RunGate::new();
        let mut ticket = gate.open();

        let sleeper = tokio::spawn(async move { ticket.sleep(Duration::from_secs(60)).await });
        tokio::task::yield_now().await;
        gate.close();

        assert!(!sleeper.await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn sleep_completes_while_open() {
        let gate = RunGate::new();
        let mut ticket = gate.open();
        assert!(ticket.sleep(Duration::from_millis(50)).await);
        assert!(gate.is_open());
    }

    #[tokio::test]
    async fn closed_returns_after_close() {
        let gate = RunGate::new();
        let mut ticket = gate.open();
        let waiter = tokio::spawn(async move { ticket.closed().await });
        gate.close();
        waiter.await.unwrap();
    }
}
