//! 백엔드 요청/응답 포트.
//!
//! 구현: `rtcompare-network` crate (reqwest)

use async_trait::async_trait;

use crate::error::CoreError;
use crate::models::metrics::{DashboardSnapshot, LongPollingStats, MetricsSnapshot};
use crate::models::notification::Notification;

/// 대시보드 백엔드 API
///
/// 모든 메서드는 한 번의 왕복만 수행한다. 재시도/백오프는 호출하는 세션의 몫이다.
#[async_trait]
pub trait DashboardApi: Send + Sync {
    /// 숏 폴링: 대기 중인 알림 조회 (비어 있을 수 있음)
    async fn fetch_short_polling(&self) -> Result<Vec<Notification>, CoreError>;

    /// 롱 폴링: 데이터가 생기거나 서버 타임아웃까지 대기하는 조회
    ///
    /// `client_id`는 요청마다 새로 생성된 식별자.
    async fn fetch_long_polling(&self, client_id: &str) -> Result<Vec<Notification>, CoreError>;

    /// 권위 메트릭 스냅샷 조회
    async fn fetch_metrics(&self) -> Result<MetricsSnapshot, CoreError>;

    /// 롱 폴링 보조 통계 조회
    async fn fetch_long_polling_stats(&self) -> Result<LongPollingStats, CoreError>;

    /// 대시보드 초기 스냅샷 조회
    async fn fetch_initial_snapshot(&self) -> Result<DashboardSnapshot, CoreError>;

    /// 백엔드 카운터 리셋
    async fn reset(&self) -> Result<(), CoreError>;
}
