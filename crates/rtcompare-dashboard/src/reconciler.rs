//! 메트릭 재조정기.
//!
//! 고정 주기로 백엔드 권위 메트릭을 조회해 로컬 값을 기법 단위로 통째로 덮어쓴다.
//! 롱 폴링 대기 클라이언트 수도 함께 갱신한다. 조회 실패는 로그만 남기고 이전 값을 유지한다.

use rtcompare_core::ports::dashboard_api::DashboardApi;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::state::DashboardState;

/// 1회 재조정 결과
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileOutcome {
    /// 권위 메트릭이 적용됐는지
    pub metrics_applied: bool,
    /// 대기 클라이언트 수가 갱신됐는지
    pub stats_applied: bool,
}

/// 권위 메트릭 재조정기
pub struct MetricsReconciler {
    api: Arc<dyn DashboardApi>,
    dashboard: Arc<DashboardState>,
    interval: Duration,
}

impl MetricsReconciler {
    pub fn new(api: Arc<dyn DashboardApi>, dashboard: Arc<DashboardState>, interval: Duration) -> Self {
        Self {
            api,
            dashboard,
            interval,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// 1회 재조정
    ///
    /// 메트릭 조회와 통계 조회는 서로 독립적으로 실패한다.
    /// 조회 도중 로컬 리셋이 일어나면 결과를 버린다.
    pub async fn reconcile_once(&self) -> ReconcileOutcome {
        let epoch = self.dashboard.reset_epoch();
        let (metrics, stats) = tokio::join!(
            self.api.fetch_metrics(),
            self.api.fetch_long_polling_stats()
        );

        let mut outcome = ReconcileOutcome::default();

        match metrics {
            Ok(snapshot) => {
                outcome.metrics_applied = self.dashboard.apply_authoritative(&snapshot, epoch);
                if outcome.metrics_applied {
                    debug!("권위 메트릭 적용: {}개 기법", snapshot.entries.len());
                } else {
                    debug!("리셋 이전에 조회한 메트릭 폐기");
                }
            }
            Err(e) => warn!("권위 메트릭 조회 실패, 이전 값 유지: {e}"),
        }

        match stats {
            Ok(stats) => {
                outcome.stats_applied = self
                    .dashboard
                    .set_waiting_clients(stats.waiting_clients, epoch);
            }
            Err(e) => warn!("롱 폴링 통계 조회 실패: {e}"),
        }

        outcome
    }

    /// 종료 신호까지 주기 실행 (첫 재조정은 즉시)
    pub async fn run(&self, mut shutdown_rx: watch::Receiver<bool>) {
        info!("메트릭 재조정 시작: 주기 {}ms", self.interval.as_millis());
        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    self.reconcile_once().await;
                }
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        break;
                    }
                }
            }
        }
        info!("메트릭 재조정 종료");
    }
}
