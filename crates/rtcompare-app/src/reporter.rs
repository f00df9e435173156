//! 주기 리포터.
//!
//! 대시보드 뷰를 주기적으로 로그(또는 JSON)로 출력하는 표시 계층 대용.

use rtcompare_dashboard::coordinator::DashboardCoordinator;
use rtcompare_dashboard::view::DashboardView;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// 출력 형식
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    /// 사람이 읽는 한 줄 요약
    Text,
    /// `DashboardView` JSON 한 줄
    Json,
}

/// 주기 리포터
pub struct Reporter {
    coordinator: Arc<DashboardCoordinator>,
    interval: Duration,
    format: ReportFormat,
}

impl Reporter {
    pub fn new(
        coordinator: Arc<DashboardCoordinator>,
        interval: Duration,
        format: ReportFormat,
    ) -> Self {
        Self {
            coordinator,
            interval,
            format,
        }
    }

    /// 종료 신호까지 주기 출력
    pub async fn run(&self, mut shutdown_rx: watch::Receiver<bool>) {
        let mut interval = tokio::time::interval(self.interval);
        // 첫 틱은 초기 스냅샷 직후라 의미가 없다
        interval.tick().await;

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    self.report(&self.coordinator.view());
                }
                _ = shutdown_rx.changed() => {
                    info!("리포터 종료");
                    break;
                }
            }
        }
    }

    fn report(&self, view: &DashboardView) {
        match self.format {
            ReportFormat::Text => {
                for line in render(view) {
                    info!("{line}");
                }
            }
            ReportFormat::Json => match serde_json::to_string(view) {
                Ok(json) => println!("{json}"),
                Err(e) => warn!("대시보드 뷰 직렬화 실패: {e}"),
            },
        }
        debug!("리포트 출력 (알림 로그 {}건)", view.notifications.len());
    }
}

/// 요약 줄 + 최근 알림 최대 3건
pub fn render(view: &DashboardView) -> Vec<String> {
    let mut lines = vec![view.summary_line()];
    for entry in view.notifications.iter().take(3) {
        lines.push(format!(
            "  #{} [{}] {} ({})",
            entry.notification.id,
            entry.source,
            entry.notification.message,
            entry.observed_at.format("%H:%M:%S")
        ));
    }
    lines
}
