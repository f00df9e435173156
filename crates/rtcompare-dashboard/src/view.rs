//! 표시 계층에 넘기는 읽기 전용 뷰.
//!
//! 차트 시리즈는 항상 short, long, push 순서를 따른다.

use rtcompare_core::models::metrics::{Technique, TechniqueMetrics};
use rtcompare_core::models::notification::LoggedNotification;
use rtcompare_core::models::session::{ConnectionStatus, SessionState};
use serde::Serialize;

/// 기법 1개의 표시 정보
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TechniqueView {
    pub technique: Technique,
    pub label: &'static str,
    pub state: SessionState,
    pub metrics: TechniqueMetrics,
}

/// 막대 차트용 시리즈
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChartSeries {
    pub labels: Vec<&'static str>,
    pub requests: Vec<u64>,
    pub latency_ms: Vec<f64>,
}

impl ChartSeries {
    pub fn from_techniques(techniques: &[TechniqueView]) -> Self {
        let mut series = ChartSeries::default();
        for view in techniques {
            series.labels.push(view.label);
            series.requests.push(view.metrics.request_count);
            series.latency_ms.push(view.metrics.average_latency_ms);
        }
        series
    }
}

/// 대시보드 전체 스냅샷
#[derive(Debug, Clone, Serialize)]
pub struct DashboardView {
    /// short, long, push 순서
    pub techniques: Vec<TechniqueView>,
    pub push_status: ConnectionStatus,
    /// 최신순
    pub notifications: Vec<LoggedNotification>,
    pub display_counter: u64,
    pub waiting_clients: Option<u32>,
    pub chart: ChartSeries,
}

impl DashboardView {
    pub fn technique(&self, technique: Technique) -> Option<&TechniqueView> {
        self.techniques.iter().find(|v| v.technique == technique)
    }

    /// 모든 세션이 비활성이고 메트릭이 0인지
    pub fn is_idle_and_zero(&self) -> bool {
        self.techniques
            .iter()
            .all(|v| v.state == SessionState::Inactive && v.metrics.is_zero())
    }

    /// 한 줄 요약 (로그용)
    pub fn summary_line(&self) -> String {
        let parts: Vec<String> = self
            .techniques
            .iter()
            .map(|v| {
                format!(
                    "{}[{}] 요청 {} / 알림 {} / {:.1}ms",
                    v.label,
                    v.state,
                    v.metrics.request_count,
                    v.metrics.notification_count,
                    v.metrics.average_latency_ms
                )
            })
            .collect();
        let waiting = self
            .waiting_clients
            .map(|n| n.to_string())
            .unwrap_or_else(|| "-".to_string());
        format!(
            "{} | 푸시 연결 {} | 대기 클라이언트 {} | 알림 {}건",
            parts.join(", "),
            self.push_status,
            waiting,
            self.display_counter
        )
    }
}
