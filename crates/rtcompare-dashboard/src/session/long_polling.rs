//! 롱 폴링 세션.
//!
//! 한 번에 요청 하나만 보내는 명시적 루프. 응답을 받으면 짧게 쉬고(기본 50ms)
//! 다시 요청하며, 실패하면 더 길게 쉰 뒤(기본 1000ms) 재시도한다.
//!
//! 중지/재시작이 빠르게 반복돼도 요청이 겹치지 않도록, 요청 슬롯을
//! 세션 수명 동안 공유하는 `Mutex`로 잡는다.

use async_trait::async_trait;
use parking_lot::Mutex;
use rtcompare_core::config::LongPollingConfig;
use rtcompare_core::error::CoreError;
use rtcompare_core::models::metrics::Technique;
use rtcompare_core::models::session::SessionState;
use rtcompare_core::ports::dashboard_api::DashboardApi;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{RunGate, RunTicket, Signal, TechniqueSession};
use crate::state::DashboardState;

/// 루프 태스크가 공유하는 부분
struct Shared {
    api: Arc<dyn DashboardApi>,
    dashboard: Arc<DashboardState>,
    config: LongPollingConfig,
    state: Signal<SessionState>,
    /// 진행 중 요청 슬롯
    in_flight: tokio::sync::Mutex<()>,
}

/// 롱 폴링 세션
pub struct LongPollingSession {
    shared: Arc<Shared>,
    gate: RunGate,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl LongPollingSession {
    pub fn new(
        api: Arc<dyn DashboardApi>,
        dashboard: Arc<DashboardState>,
        config: LongPollingConfig,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                api,
                dashboard,
                config,
                state: Signal::new(SessionState::Inactive),
                in_flight: tokio::sync::Mutex::new(()),
            }),
            gate: RunGate::new(),
            task: Mutex::new(None),
        }
    }

    /// 롱 폴링 시작 (`Inactive → Waiting`)
    pub fn start(&self) -> Result<(), CoreError> {
        // 상태 전이와 게이트 열기를 `stop()`과 직렬화
        let mut task = self.task.lock();
        if !self.shared.state.try_begin(SessionState::Waiting) {
            return Err(CoreError::InvalidConfig(
                "롱 폴링이 이미 실행 중".to_string(),
            ));
        }

        let ticket = self.gate.open();
        // 이전 루프는 중단하지 않는다. 진행 중 요청이 끝나면 스스로 종료한다.
        task.replace(tokio::spawn(Self::run(self.shared.clone(), ticket)));
        drop(task);

        info!("롱 폴링 시작");
        Ok(())
    }

    /// 롱 폴링 중지 (멱등)
    pub fn stop(&self) {
        let mut task = self.task.lock();
        let was_open = self.gate.close();
        task.take();
        self.shared.state.set(SessionState::Inactive);
        drop(task);
        if was_open {
            info!("롱 폴링 중지");
        }
    }

    pub fn state(&self) -> SessionState {
        self.shared.state.get()
    }

    async fn run(shared: Arc<Shared>, mut ticket: RunTicket) {
        loop {
            // 이전 세대의 요청이 아직 진행 중이면 끝날 때까지 대기
            let slot = tokio::select! {
                slot = shared.in_flight.lock() => slot,
                _ = ticket.closed() => break,
            };

            if ticket
                .commit(|| shared.state.set(SessionState::Active))
                .is_none()
            {
                break;
            }

            let client_id = format!("client-{}", Uuid::new_v4());
            let started = Instant::now();
            let result = shared.api.fetch_long_polling(&client_id).await;
            drop(slot);

            let delay = match result {
                Ok(notifications) => {
                    let latency = started.elapsed();
                    let count = notifications.len();
                    let recorded = ticket.commit(|| {
                        shared
                            .dashboard
                            .record_cycle(Technique::LongPolling, notifications, latency);
                        shared.state.set(SessionState::Waiting);
                    });
                    if recorded.is_none() {
                        debug!("중지 후 도착한 롱 폴링 응답 폐기");
                        break;
                    }
                    debug!(
                        "롱 폴링 응답: 알림 {count}건, {}ms ({client_id})",
                        latency.as_millis()
                    );
                    shared.config.rearm_delay()
                }
                Err(e) => {
                    let recovered = ticket.commit(|| {
                        shared.state.set(SessionState::Error);
                        shared.state.set(SessionState::Waiting);
                    });
                    if recovered.is_none() {
                        debug!("중지 후 도착한 롱 폴링 실패 무시: {e}");
                        break;
                    }
                    warn!(
                        "롱 폴링 요청 실패, {}ms 후 재시도: {e}",
                        shared.config.failure_backoff_ms
                    );
                    shared.config.failure_backoff()
                }
            };

            if !ticket.sleep(delay).await {
                break;
            }
        }
        debug!("롱 폴링 루프 종료");
    }
}

#[async_trait]
impl TechniqueSession for LongPollingSession {
    fn technique(&self) -> Technique {
        Technique::LongPolling
    }

    fn state(&self) -> SessionState {
        self.shared.state.get()
    }

    fn subscribe_state(&self) -> watch::Receiver<SessionState> {
        self.shared.state.subscribe()
    }

    async fn activate(&self) -> Result<(), CoreError> {
        self.start()
    }

    async fn deactivate(&self) {
        self.stop();
    }
}

impl Drop for LongPollingSession {
    fn drop(&mut self) {
        self.gate.close();
    }
}
