//! 알림 모델.
//!
//! 백엔드가 생성하고 각 기법이 관찰하는 알림과,
//! 로그에 기록될 때 붙는 출처 태그.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 백엔드 알림 (세 기법 모두 같은 JSON 형태로 수신)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    /// 단조 증가하는 고유 ID
    pub id: i64,
    /// 알림 본문
    pub message: String,
    /// 백엔드 생성 시각
    pub created_at: DateTime<Utc>,
    /// 백엔드 전달 완료 플래그 (표시용, 선택)
    #[serde(default)]
    pub delivered: bool,
}

/// 알림을 관찰한 경로
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationSource {
    ShortPolling,
    LongPolling,
    PushChannel,
    /// 초기 스냅샷 등 특정 기법에 속하지 않는 항목
    System,
}

impl NotificationSource {
    /// 표시용 라벨
    pub fn label(&self) -> &'static str {
        match self {
            NotificationSource::ShortPolling => "Short Polling",
            NotificationSource::LongPolling => "Long Polling",
            NotificationSource::PushChannel => "Push Channel",
            NotificationSource::System => "System",
        }
    }
}

impl std::fmt::Display for NotificationSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// 알림 로그 항목: 삽입 후 변경되지 않는다
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoggedNotification {
    /// 원본 알림
    pub notification: Notification,
    /// 관찰 경로
    pub source: NotificationSource,
    /// 클라이언트가 관찰한 시각
    pub observed_at: DateTime<Utc>,
}

impl LoggedNotification {
    /// 현재 시각으로 로그 항목 생성
    pub fn new(notification: Notification, source: NotificationSource) -> Self {
        Self {
            notification,
            source,
            observed_at: Utc::now(),
        }
    }
}
