//! HTTP REST API 클라이언트.
//!
//! `DashboardApi` 포트 구현. 요청당 한 번의 왕복만 수행하며
//! 재시도는 호출하는 세션이 결정한다.

use async_trait::async_trait;
use rtcompare_core::error::CoreError;
use rtcompare_core::models::metrics::{
    DashboardSnapshot, LongPollingStats, MetricsSnapshot, MetricsSummary,
};
use rtcompare_core::models::notification::Notification;
use rtcompare_core::ports::dashboard_api::DashboardApi;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

const SHORT_POLLING_PATH: &str = "/api/short-polling/notifications";
const LONG_POLLING_PATH: &str = "/api/long-polling/notifications";
const LONG_POLLING_STATS_PATH: &str = "/api/long-polling/stats";
const REALTIME_PATH: &str = "/api/dashboard/realtime";
const DASHBOARD_DATA_PATH: &str = "/api/dashboard/data";
const RESET_PATH: &str = "/api/dashboard/reset";

/// `/api/dashboard/realtime` 응답
#[derive(Debug, Deserialize)]
struct RealtimeResponse {
    #[serde(default)]
    metrics: Option<MetricsSummary>,
}

/// `/api/dashboard/data` 응답
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DashboardDataResponse {
    #[serde(default)]
    metrics: Option<MetricsSummary>,
    #[serde(default)]
    latest_notifications: Vec<Notification>,
}

/// REST API 클라이언트: `DashboardApi` 포트 구현
pub struct HttpDashboardApi {
    client: reqwest::Client,
    base_url: String,
}

impl HttpDashboardApi {
    /// 새 HTTP API 클라이언트 생성
    ///
    /// `timeout`은 롱 폴링의 서버 측 대기 시간보다 길게 잡아야 한다.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, CoreError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CoreError::Transport(format!("HTTP 클라이언트 빌드 실패: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// 기본 URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// 응답 상태 코드 확인 및 에러 매핑
    async fn check_response(
        &self,
        resp: reqwest::Response,
    ) -> Result<reqwest::Response, CoreError> {
        let status = resp.status();

        if status.is_success() {
            return Ok(resp);
        }

        let path = resp.url().path().to_string();
        let text = resp.text().await.unwrap_or_else(|e| {
            tracing::warn!("응답 본문 읽기 실패: {e}");
            String::new()
        });

        match status.as_u16() {
            404 => Err(CoreError::NotFound {
                resource_type: "API".to_string(),
                id: path,
            }),
            503 => Err(CoreError::ServiceUnavailable(text)),
            _ => Err(CoreError::Transport(format!("API 에러 ({status}): {text}"))),
        }
    }

    /// GET 요청 후 JSON 디코딩
    async fn get_json<T: DeserializeOwned>(&self, url: &str, what: &str) -> Result<T, CoreError> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| CoreError::Transport(format!("{what} 요청 실패: {e}")))?;

        let resp = self.check_response(resp).await?;
        resp.json::<T>()
            .await
            .map_err(|e| CoreError::Protocol(format!("{what} 응답 파싱 실패: {e}")))
    }
}

#[async_trait]
impl DashboardApi for HttpDashboardApi {
    async fn fetch_short_polling(&self) -> Result<Vec<Notification>, CoreError> {
        let notifications: Vec<Notification> = self
            .get_json(&self.url(SHORT_POLLING_PATH), "숏 폴링")
            .await?;
        debug!("숏 폴링 응답: {}건", notifications.len());
        Ok(notifications)
    }

    async fn fetch_long_polling(&self, client_id: &str) -> Result<Vec<Notification>, CoreError> {
        let url = format!("{}?clientId={}", self.url(LONG_POLLING_PATH), client_id);
        let notifications: Vec<Notification> = self.get_json(&url, "롱 폴링").await?;
        debug!("롱 폴링 응답: client_id={client_id}, {}건", notifications.len());
        Ok(notifications)
    }

    async fn fetch_metrics(&self) -> Result<MetricsSnapshot, CoreError> {
        let resp: RealtimeResponse = self.get_json(&self.url(REALTIME_PATH), "메트릭").await?;
        Ok(resp.metrics.map(MetricsSnapshot::from).unwrap_or_default())
    }

    async fn fetch_long_polling_stats(&self) -> Result<LongPollingStats, CoreError> {
        self.get_json(&self.url(LONG_POLLING_STATS_PATH), "롱 폴링 통계")
            .await
    }

    async fn fetch_initial_snapshot(&self) -> Result<DashboardSnapshot, CoreError> {
        let resp: DashboardDataResponse = self
            .get_json(&self.url(DASHBOARD_DATA_PATH), "초기 스냅샷")
            .await?;
        Ok(DashboardSnapshot {
            metrics: resp.metrics.map(MetricsSnapshot::from).unwrap_or_default(),
            latest_notifications: resp.latest_notifications,
        })
    }

    async fn reset(&self) -> Result<(), CoreError> {
        debug!("백엔드 리셋 요청");
        let resp = self
            .client
            .post(self.url(RESET_PATH))
            .send()
            .await
            .map_err(|e| CoreError::Transport(format!("리셋 요청 실패: {e}")))?;

        self.check_response(resp).await?;
        Ok(())
    }
}
