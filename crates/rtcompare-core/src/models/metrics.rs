//! 기법별 성능 메트릭 모델.
//!
//! 로컬 관찰값(`TechniqueMetrics`)과 백엔드 권위 스냅샷(`MetricsSnapshot`)의
//! 공통 표현, 그리고 백엔드 JSON 레코드 디코딩.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

use super::notification::{Notification, NotificationSource};

/// 비교 대상 전달 기법
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Technique {
    /// 고정 주기 폴링
    #[serde(rename = "short")]
    ShortPolling,
    /// 롱 폴링
    #[serde(rename = "long")]
    LongPolling,
    /// 영속 푸시 채널 (백엔드는 "websocket" 키 사용)
    #[serde(rename = "push", alias = "websocket", alias = "ws")]
    PushChannel,
}

impl Technique {
    /// 표시 순서 고정 목록 (short, long, push)
    pub const ALL: [Technique; 3] = [
        Technique::ShortPolling,
        Technique::LongPolling,
        Technique::PushChannel,
    ];

    /// 와이어 키 → 기법
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "short" => Some(Technique::ShortPolling),
            "long" => Some(Technique::LongPolling),
            "push" | "websocket" | "ws" => Some(Technique::PushChannel),
            _ => None,
        }
    }

    /// 이 기법으로 관찰한 알림에 붙는 출처 태그
    pub fn source(&self) -> NotificationSource {
        match self {
            Technique::ShortPolling => NotificationSource::ShortPolling,
            Technique::LongPolling => NotificationSource::LongPolling,
            Technique::PushChannel => NotificationSource::PushChannel,
        }
    }
}

impl std::fmt::Display for Technique {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.source().label())
    }
}

/// 기법별 메트릭
///
/// 푸시 채널의 `request_count`는 수신 메시지 수를 의미한다.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TechniqueMetrics {
    /// 요청 수 (푸시 채널은 메시지 수)
    pub request_count: u64,
    /// 수신 알림 수
    pub notification_count: u64,
    /// 지연 시간 (밀리초): 로컬은 마지막 샘플, 백엔드는 평균
    pub average_latency_ms: f64,
}

impl TechniqueMetrics {
    /// 0으로 초기화된 메트릭
    pub fn zero() -> Self {
        Self::default()
    }

    /// 모든 필드가 0인지
    pub fn is_zero(&self) -> bool {
        self.request_count == 0 && self.notification_count == 0 && self.average_latency_ms == 0.0
    }
}

/// 백엔드 성능 메트릭 레코드 (`techniqueMetrics` 배열 원소)
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TechniqueMetricsRecord {
    /// "short" | "long" | "websocket"
    pub technique: String,
    #[serde(default)]
    pub request_count: u64,
    #[serde(default)]
    pub notification_count: u64,
    #[serde(default)]
    pub average_latency: f64,
}

/// 백엔드 메트릭 요약 (`/api/dashboard/realtime`, `/api/dashboard/data`의 `metrics` 필드)
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSummary {
    #[serde(default)]
    pub technique_metrics: Vec<TechniqueMetricsRecord>,
}

/// 권위 메트릭 스냅샷: 기법 → 메트릭
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    pub entries: BTreeMap<Technique, TechniqueMetrics>,
}

impl MetricsSnapshot {
    /// 빈 스냅샷
    pub fn new() -> Self {
        Self::default()
    }

    /// 항목 추가 (빌더)
    pub fn with(mut self, technique: Technique, metrics: TechniqueMetrics) -> Self {
        self.entries.insert(technique, metrics);
        self
    }

    /// 기법별 메트릭 조회
    pub fn get(&self, technique: Technique) -> Option<&TechniqueMetrics> {
        self.entries.get(&technique)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl From<MetricsSummary> for MetricsSnapshot {
    fn from(summary: MetricsSummary) -> Self {
        let mut snapshot = MetricsSnapshot::new();
        for record in summary.technique_metrics {
            let Some(technique) = Technique::from_key(&record.technique) else {
                debug!("알 수 없는 기법 키 무시: {}", record.technique);
                continue;
            };
            snapshot.entries.insert(
                technique,
                TechniqueMetrics {
                    request_count: record.request_count,
                    notification_count: record.notification_count,
                    average_latency_ms: record.average_latency.max(0.0),
                },
            );
        }
        snapshot
    }
}

/// 롱 폴링 보조 통계 (`/api/long-polling/stats`)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LongPollingStats {
    /// 현재 서버에서 대기 중인 클라이언트 수
    #[serde(default)]
    pub waiting_clients: u32,
}

/// 대시보드 초기 스냅샷 (`/api/dashboard/data`)
#[derive(Debug, Clone, Default)]
pub struct DashboardSnapshot {
    pub metrics: MetricsSnapshot,
    pub latest_notifications: Vec<Notification>,
}
