//! 대시보드 코디네이터.
//!
//! 세 세션과 재조정기를 묶어 전체 시작/중지/리셋을 제공하고
//! 표시 계층이 읽어 갈 [`DashboardView`]를 만든다.

use parking_lot::Mutex;
use rtcompare_core::config::AppConfig;
use rtcompare_core::error::CoreError;
use rtcompare_core::models::metrics::Technique;
use rtcompare_core::models::session::{ConnectionStatus, SessionState};
use rtcompare_core::ports::dashboard_api::DashboardApi;
use rtcompare_core::ports::push_transport::PushTransport;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::reconciler::MetricsReconciler;
use crate::session::{
    LongPollingSession, PushChannelSession, ShortPollingSession, TechniqueSession,
};
use crate::state::DashboardState;
use crate::view::{ChartSeries, DashboardView, TechniqueView};

/// 세션 상태 구독 묶음
#[derive(Debug, Clone)]
pub struct SessionWatchers {
    pub short: watch::Receiver<SessionState>,
    pub long: watch::Receiver<SessionState>,
    pub push: watch::Receiver<SessionState>,
    pub push_status: watch::Receiver<ConnectionStatus>,
}

/// 실행 중인 재조정 태스크
struct ReconcilerTask {
    shutdown_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

/// 대시보드 코디네이터
pub struct DashboardCoordinator {
    api: Arc<dyn DashboardApi>,
    dashboard: Arc<DashboardState>,
    short: ShortPollingSession,
    long: LongPollingSession,
    push: PushChannelSession,
    reconciler: Arc<MetricsReconciler>,
    reconciler_task: Mutex<Option<ReconcilerTask>>,
}

impl DashboardCoordinator {
    pub fn new(
        api: Arc<dyn DashboardApi>,
        transport: Arc<dyn PushTransport>,
        config: &AppConfig,
    ) -> Self {
        let dashboard = Arc::new(DashboardState::new(config.log.capacity));

        let short = ShortPollingSession::new(
            api.clone(),
            dashboard.clone(),
            config.short_polling.interval_ms,
        );
        let long = LongPollingSession::new(
            api.clone(),
            dashboard.clone(),
            config.long_polling.clone(),
        );
        let push = PushChannelSession::new(
            transport,
            dashboard.clone(),
            config.server.push_topic.clone(),
        );
        let reconciler = Arc::new(MetricsReconciler::new(
            api.clone(),
            dashboard.clone(),
            config.reconcile_interval(),
        ));

        Self {
            api,
            dashboard,
            short,
            long,
            push,
            reconciler,
            reconciler_task: Mutex::new(None),
        }
    }

    /// 공유 상태
    pub fn dashboard(&self) -> &Arc<DashboardState> {
        &self.dashboard
    }

    /// 표시 순서(short, long, push)의 세션 목록
    fn sessions(&self) -> [&dyn TechniqueSession; 3] {
        [&self.short, &self.long, &self.push]
    }

    // ============================================================
    // 초기화 / 재조정
    // ============================================================

    /// 초기 스냅샷 조회 후 상태 채우기. 실패하면 빈 상태로 시작한다.
    pub async fn initialize(&self) {
        match self.api.fetch_initial_snapshot().await {
            Ok(snapshot) => {
                let count = snapshot.latest_notifications.len();
                self.dashboard.seed(snapshot);
                info!("초기 스냅샷 로드: 최신 알림 {count}건");
            }
            Err(e) => warn!("초기 스냅샷 조회 실패, 빈 상태로 시작: {e}"),
        }
    }

    /// 주기 재조정 태스크 시작 (이미 실행 중이면 무시)
    pub fn start_reconciler(&self) {
        let mut task = self.reconciler_task.lock();
        if task.is_some() {
            warn!("메트릭 재조정이 이미 실행 중");
            return;
        }

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let reconciler = self.reconciler.clone();
        let handle = tokio::spawn(async move { reconciler.run(shutdown_rx).await });
        *task = Some(ReconcilerTask {
            shutdown_tx,
            handle,
        });
    }

    /// 재조정 1회 즉시 실행
    pub async fn refresh(&self) {
        self.reconciler.reconcile_once().await;
    }

    /// 재조정 태스크 종료 + 모든 세션 중지
    pub async fn shutdown(&self) {
        let task = self.reconciler_task.lock().take();
        if let Some(task) = task {
            let _ = task.shutdown_tx.send(true);
            if let Err(e) = task.handle.await {
                warn!("재조정 태스크 종료 에러: {e}");
            }
        }
        self.stop_all().await;
        info!("대시보드 종료");
    }

    // ============================================================
    // 전체 제어
    // ============================================================

    /// 세 세션을 각각 시작. 하나가 실패해도 나머지는 시작한다.
    ///
    /// 실패한 기법과 에러를 반환한다.
    pub async fn start_all(&self) -> Vec<(Technique, CoreError)> {
        let mut failures = Vec::new();
        for session in self.sessions() {
            if let Err(e) = session.activate().await {
                warn!("{} 시작 실패: {e}", session.technique());
                failures.push((session.technique(), e));
            }
        }
        info!("전체 시작 완료 (실패 {}건)", failures.len());
        failures
    }

    /// 세 세션을 각각 중지 (이미 비활성이어도 무방)
    pub async fn stop_all(&self) {
        for session in self.sessions() {
            session.deactivate().await;
        }
        info!("전체 중지 완료");
    }

    /// 전체 중지 → 백엔드 리셋 → 로컬 메트릭/로그 초기화
    ///
    /// 백엔드 리셋이 실패해도 로컬 초기화는 수행한다.
    pub async fn reset_all(&self) {
        self.stop_all().await;
        if let Err(e) = self.api.reset().await {
            warn!("백엔드 리셋 실패, 로컬 초기화는 계속: {e}");
        }
        self.dashboard.clear_local();
        info!("대시보드 리셋 완료");
    }

    /// 알림 로그와 표시 카운터만 비우기
    pub fn clear_notifications(&self) {
        self.dashboard.clear_log();
    }

    // ============================================================
    // 기법별 제어
    // ============================================================

    pub fn start_short(&self, interval_ms: u64) -> Result<(), CoreError> {
        self.short.start(interval_ms)
    }

    pub fn stop_short(&self) {
        self.short.stop();
    }

    pub fn start_long(&self) -> Result<(), CoreError> {
        self.long.start()
    }

    pub fn stop_long(&self) {
        self.long.stop();
    }

    pub async fn connect_push(&self) -> Result<(), CoreError> {
        self.push.connect().await
    }

    pub async fn disconnect_push(&self) {
        self.push.disconnect().await;
    }

    // ============================================================
    // 조회
    // ============================================================

    pub fn state_of(&self, technique: Technique) -> SessionState {
        match technique {
            Technique::ShortPolling => self.short.state(),
            Technique::LongPolling => self.long.state(),
            Technique::PushChannel => self.push.state(),
        }
    }

    pub fn subscribe_states(&self) -> SessionWatchers {
        SessionWatchers {
            short: self.short.subscribe_state(),
            long: self.long.subscribe_state(),
            push: self.push.subscribe_state(),
            push_status: self.push.subscribe_status(),
        }
    }

    /// 현재 상태의 읽기 전용 스냅샷
    pub fn view(&self) -> DashboardView {
        let techniques: Vec<TechniqueView> = self
            .sessions()
            .iter()
            .map(|session| {
                let technique = session.technique();
                TechniqueView {
                    technique,
                    label: technique.source().label(),
                    state: session.state(),
                    metrics: self.dashboard.metrics(technique),
                }
            })
            .collect();

        DashboardView {
            chart: ChartSeries::from_techniques(&techniques),
            techniques,
            push_status: self.push.connection_status(),
            notifications: self.dashboard.log_entries(),
            display_counter: self.dashboard.display_counter(),
            waiting_clients: self.dashboard.waiting_clients(),
        }
    }
}
