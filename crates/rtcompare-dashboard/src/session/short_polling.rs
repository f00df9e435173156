//! 숏 폴링 세션.
//!
//! 고정 주기로 대기 알림을 조회한다. 주기마다 독립된 태스크에서 요청하므로
//! 이전 주기가 끝나지 않았으면 주기가 겹칠 수 있다.

use async_trait::async_trait;
use parking_lot::Mutex;
use rtcompare_core::error::CoreError;
use rtcompare_core::models::metrics::Technique;
use rtcompare_core::models::session::SessionState;
use rtcompare_core::ports::dashboard_api::DashboardApi;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::{RunGate, RunTicket, Signal, TechniqueSession};
use crate::state::DashboardState;

/// 숏 폴링 세션
pub struct ShortPollingSession {
    api: Arc<dyn DashboardApi>,
    dashboard: Arc<DashboardState>,
    default_interval_ms: u64,
    state: Signal<SessionState>,
    gate: RunGate,
    ticker: Mutex<Option<JoinHandle<()>>>,
}

impl ShortPollingSession {
    pub fn new(
        api: Arc<dyn DashboardApi>,
        dashboard: Arc<DashboardState>,
        default_interval_ms: u64,
    ) -> Self {
        Self {
            api,
            dashboard,
            default_interval_ms,
            state: Signal::new(SessionState::Inactive),
            gate: RunGate::new(),
            ticker: Mutex::new(None),
        }
    }

    /// 폴링 시작: 즉시 1회 조회 후 `interval_ms` 주기로 반복
    pub fn start(&self, interval_ms: u64) -> Result<(), CoreError> {
        if interval_ms == 0 {
            return Err(CoreError::InvalidConfig(
                "숏 폴링 주기는 0보다 커야 함".to_string(),
            ));
        }
        // 상태 전이와 게이트 열기를 `stop()`과 직렬화
        let mut ticker = self.ticker.lock();
        if !self.state.try_begin(SessionState::Active) {
            return Err(CoreError::InvalidConfig(
                "숏 폴링이 이미 실행 중".to_string(),
            ));
        }

        let ticket = self.gate.open();
        let handle = tokio::spawn(Self::run(
            self.api.clone(),
            self.dashboard.clone(),
            ticket,
            Duration::from_millis(interval_ms),
        ));
        if let Some(previous) = ticker.replace(handle) {
            previous.abort();
        }
        drop(ticker);

        info!("숏 폴링 시작 (주기 {interval_ms}ms)");
        Ok(())
    }

    /// 폴링 중지 (멱등)
    ///
    /// 진행 중인 요청은 끝까지 가지만 결과는 버려진다.
    pub fn stop(&self) {
        let mut ticker = self.ticker.lock();
        let was_open = self.gate.close();
        if let Some(handle) = ticker.take() {
            handle.abort();
        }
        self.state.set(SessionState::Inactive);
        drop(ticker);
        if was_open {
            info!("숏 폴링 중지");
        }
    }

    pub fn state(&self) -> SessionState {
        self.state.get()
    }

    async fn run(
        api: Arc<dyn DashboardApi>,
        dashboard: Arc<DashboardState>,
        mut ticket: RunTicket,
        interval: Duration,
    ) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = ticket.closed() => break,
            }
            if !ticket.is_live() {
                break;
            }
            tokio::spawn(Self::cycle(api.clone(), dashboard.clone(), ticket.clone()));
        }
        debug!("숏 폴링 스케줄 종료");
    }

    /// 1회 조회. 실패는 로그만 남기고 건너뛴다.
    async fn cycle(api: Arc<dyn DashboardApi>, dashboard: Arc<DashboardState>, ticket: RunTicket) {
        let started = Instant::now();
        match api.fetch_short_polling().await {
            Ok(notifications) => {
                let latency = started.elapsed();
                let count = notifications.len();
                let recorded = ticket.commit(|| {
                    dashboard.record_cycle(Technique::ShortPolling, notifications, latency)
                });
                match recorded {
                    Some(()) => debug!(
                        "숏 폴링 응답: 알림 {count}건, {}ms",
                        latency.as_millis()
                    ),
                    None => debug!("중지 후 도착한 숏 폴링 응답 폐기"),
                }
            }
            Err(e) => warn!("숏 폴링 요청 실패, 이번 주기 건너뜀: {e}"),
        }
    }
}

#[async_trait]
impl TechniqueSession for ShortPollingSession {
    fn technique(&self) -> Technique {
        Technique::ShortPolling
    }

    fn state(&self) -> SessionState {
        self.state.get()
    }

    fn subscribe_state(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    async fn activate(&self) -> Result<(), CoreError> {
        self.start(self.default_interval_ms)
    }

    async fn deactivate(&self) {
        self.stop();
    }
}

impl Drop for ShortPollingSession {
    fn drop(&mut self) {
        self.gate.close();
        if let Some(handle) = self.ticker.get_mut().take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{notifications, transport_error, ScriptedApi};
    use assert_matches::assert_matches;
    use rtcompare_core::models::notification::NotificationSource;

    fn session(api: Arc<ScriptedApi>) -> (ShortPollingSession, Arc<DashboardState>) {
        let dashboard = Arc::new(DashboardState::new(20));
        (
            ShortPollingSession::new(api, dashboard.clone(), 5_000),
            dashboard,
        )
    }

    #[tokio::test(start_paused = true)]
    async fn two_cycles_count_requests_and_notifications() {
        let api = Arc::new(
            ScriptedApi::new().short_responses(vec![Ok(notifications(1..=2)), Ok(vec![])]),
        );
        let (session, dashboard) = session(api.clone());

        session.start(1_000).unwrap();
        assert_eq!(session.state(), SessionState::Active);

        // t=0 즉시 1회, t=1000 2회
        tokio::time::sleep(Duration::from_millis(1_500)).await;
        session.stop();

        assert_eq!(ScriptedApi::calls(&api.short_calls), 2);
        let short = dashboard.metrics(Technique::ShortPolling);
        assert_eq!(short.request_count, 2);
        assert_eq!(short.notification_count, 2);

        let entries = dashboard.log_entries();
        assert_eq!(entries.len(), 2);
        assert!(entries
            .iter()
            .all(|e| e.source == NotificationSource::ShortPolling));
        assert_eq!(session.state(), SessionState::Inactive);
    }

    #[tokio::test(start_paused = true)]
    async fn latency_is_latest_sample() {
        let api = Arc::new(ScriptedApi::new().short_latency(Duration::from_millis(40)));
        let (session, dashboard) = session(api);

        session.start(1_000).unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        session.stop();

        let short = dashboard.metrics(Technique::ShortPolling);
        assert_eq!(short.request_count, 1);
        assert!((short.average_latency_ms - 40.0).abs() < 1.0);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_cycle_is_skipped_and_schedule_continues() {
        let api = Arc::new(
            ScriptedApi::new().short_responses(vec![Err(transport_error()), Ok(notifications(7..=7))]),
        );
        let (session, dashboard) = session(api.clone());

        session.start(1_000).unwrap();
        tokio::time::sleep(Duration::from_millis(1_500)).await;
        session.stop();

        assert_eq!(ScriptedApi::calls(&api.short_calls), 2);
        let short = dashboard.metrics(Technique::ShortPolling);
        assert_eq!(short.request_count, 1);
        assert_eq!(short.notification_count, 1);
        assert_eq!(session.state(), SessionState::Inactive);
    }

    #[tokio::test(start_paused = true)]
    async fn response_after_stop_is_discarded() {
        let api = Arc::new(
            ScriptedApi::new()
                .short_latency(Duration::from_secs(3))
                .short_responses(vec![Ok(notifications(1..=3))]),
        );
        let (session, dashboard) = session(api.clone());

        session.start(10_000).unwrap();
        tokio::time::sleep(Duration::from_secs(1)).await;
        session.stop();

        // 요청은 t=3s에 완료되지만 반영되지 않아야 한다
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(ScriptedApi::calls(&api.short_calls), 1);
        assert!(dashboard.metrics(Technique::ShortPolling).is_zero());
        assert_eq!(dashboard.log_len(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn cycles_may_overlap() {
        // 요청이 주기보다 오래 걸리면 다음 주기가 기다리지 않고 시작된다
        let api = Arc::new(ScriptedApi::new().short_latency(Duration::from_millis(2_500)));
        let (session, dashboard) = session(api.clone());

        session.start(1_000).unwrap();
        tokio::time::sleep(Duration::from_millis(2_100)).await;
        assert_eq!(ScriptedApi::calls(&api.short_calls), 3);
        assert_eq!(dashboard.metrics(Technique::ShortPolling).request_count, 0);

        tokio::time::sleep(Duration::from_millis(1_000)).await;
        session.stop();
        assert_eq!(dashboard.metrics(Technique::ShortPolling).request_count, 1);
    }

    #[tokio::test]
    async fn start_rejects_invalid_interval_and_double_start() {
        let api = Arc::new(ScriptedApi::new());
        let (session, _dashboard) = session(api);

        assert_matches!(session.start(0), Err(CoreError::InvalidConfig(_)));
        assert_eq!(session.state(), SessionState::Inactive);

        session.start(1_000).unwrap();
        assert_matches!(session.start(1_000), Err(CoreError::InvalidConfig(_)));
        assert_eq!(session.state(), SessionState::Active);

        session.stop();
        session.stop();
        assert_eq!(session.state(), SessionState::Inactive);
    }

    #[tokio::test]
    async fn activate_uses_default_interval() {
        let api = Arc::new(ScriptedApi::new());
        let (session, _dashboard) = session(api);
        session.activate().await.unwrap();
        assert_eq!(TechniqueSession::state(&session), SessionState::Active);
        session.deactivate().await;
        assert_eq!(TechniqueSession::state(&session), SessionState::Inactive);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_start_and_stop_agree_on_state() {
        let api = Arc::new(ScriptedApi::new().short_latency(Duration::from_millis(5)));
        let (session, _dashboard) = session(api);
        let session = Arc::new(session);

        for _ in 0..200 {
            let starter = tokio::spawn({
                let session = session.clone();
                async move {
                    let _ = session.start(1_000);
                }
            });
            let stopper = tokio::spawn({
                let session = session.clone();
                async move { session.stop() }
            });
            starter.await.unwrap();
            stopper.await.unwrap();

            // 비활성으로 보고하면 실행 세대도 닫혀 있어야 한다
            assert_eq!(
                session.state() == SessionState::Inactive,
                !session.gate.is_open()
            );
            session.stop();
        }
    }
}
