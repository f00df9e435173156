//! 애플리케이션 설정 구조체.
//!
//! 백엔드 URL, 기법별 주기/지연, 재조정 주기, 알림 로그 용량 등
//! 런타임 설정을 정의한다. `ConfigManager`를 통해 JSON 파일에서 로드.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::CoreError;

/// 최상위 애플리케이션 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// 백엔드 연결 설정
    pub server: ServerConfig,
    /// 숏 폴링 설정
    #[serde(default)]
    pub short_polling: ShortPollingConfig,
    /// 롱 폴링 설정
    #[serde(default)]
    pub long_polling: LongPollingConfig,
    /// 메트릭 재조정 설정
    #[serde(default)]
    pub reconciler: ReconcilerConfig,
    /// 알림 로그 설정
    #[serde(default)]
    pub log: NotificationLogConfig,
}

// ============================================================
// 서버 설정
// ============================================================

/// 백엔드 연결 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// 백엔드 기본 URL (예: "http://localhost:8080")
    pub base_url: String,
    /// HTTP 요청 타임아웃 (밀리초): 롱 폴링 서버 대기보다 길어야 함
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// 푸시 채널 WebSocket 경로 (SockJS 엔드포인트의 raw WebSocket 경로)
    #[serde(default = "default_push_path")]
    pub push_path: String,
    /// 구독할 알림 토픽
    #[serde(default = "default_push_topic")]
    pub push_topic: String,
}

// ============================================================
// 기법별 설정
// ============================================================

/// 숏 폴링 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShortPollingConfig {
    /// 폴링 주기 (밀리초)
    #[serde(default = "default_short_interval_ms")]
    pub interval_ms: u64,
}

impl Default for ShortPollingConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_short_interval_ms(),
        }
    }
}

/// 롱 폴링 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LongPollingConfig {
    /// 성공 응답 후 재요청 지연 (밀리초)
    #[serde(default = "default_rearm_delay_ms")]
    pub rearm_delay_ms: u64,
    /// 실패 후 재시도 지연 (밀리초)
    #[serde(default = "default_failure_backoff_ms")]
    pub failure_backoff_ms: u64,
}

impl Default for LongPollingConfig {
    fn default() -> Self {
        Self {
            rearm_delay_ms: default_rearm_delay_ms(),
            failure_backoff_ms: default_failure_backoff_ms(),
        }
    }
}

impl LongPollingConfig {
    pub fn rearm_delay(&self) -> Duration {
        Duration::from_millis(self.rearm_delay_ms)
    }

    pub fn failure_backoff(&self) -> Duration {
        Duration::from_millis(self.failure_backoff_ms)
    }
}

/// 메트릭 재조정 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcilerConfig {
    /// 권위 메트릭 조회 주기 (밀리초)
    #[serde(default = "default_reconcile_interval_ms")]
    pub interval_ms: u64,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_reconcile_interval_ms(),
        }
    }
}

/// 알림 로그 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationLogConfig {
    /// 보관할 최대 항목 수
    #[serde(default = "default_log_capacity")]
    pub capacity: usize,
}

impl Default for NotificationLogConfig {
    fn default() -> Self {
        Self {
            capacity: default_log_capacity(),
        }
    }
}

// ============================================================
// AppConfig impl
// ============================================================

impl AppConfig {
    /// 기본 설정값 반환
    pub fn default_config() -> Self {
        Self {
            server: ServerConfig {
                base_url: "http://localhost:8080".to_string(),
                request_timeout_ms: default_request_timeout_ms(),
                push_path: default_push_path(),
                push_topic: default_push_topic(),
            },
            short_polling: ShortPollingConfig::default(),
            long_polling: LongPollingConfig::default(),
            reconciler: ReconcilerConfig::default(),
            log: NotificationLogConfig::default(),
        }
    }

    /// 값 유효성 검증
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.server.base_url.trim().is_empty() {
            return Err(CoreError::Config("server.base_url이 비어 있음".to_string()));
        }
        if !self.server.push_path.starts_with('/') {
            return Err(CoreError::Config(format!(
                "server.push_path는 '/'로 시작해야 함: {}",
                self.server.push_path
            )));
        }
        if self.short_polling.interval_ms == 0 {
            return Err(CoreError::Config(
                "short_polling.interval_ms는 0보다 커야 함".to_string(),
            ));
        }
        if self.reconciler.interval_ms == 0 {
            return Err(CoreError::Config(
                "reconciler.interval_ms는 0보다 커야 함".to_string(),
            ));
        }
        if self.log.capacity == 0 {
            return Err(CoreError::Config("log.capacity는 0보다 커야 함".to_string()));
        }
        Ok(())
    }

    /// HTTP 요청 타임아웃을 Duration으로 반환
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.server.request_timeout_ms)
    }

    /// 재조정 주기를 Duration으로 반환
    pub fn reconcile_interval(&self) -> Duration {
        Duration::from_millis(self.reconciler.interval_ms)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::default_config()
    }
}

// ============================================================
// 기본값 함수
// ============================================================

fn default_request_timeout_ms() -> u64 {
    60_000
}
fn default_push_path() -> String {
    "/ws/websocket".to_string()
}
fn default_push_topic() -> String {
    "/topic/notifications".to_string()
}
fn default_short_interval_ms() -> u64 {
    5_000
}
fn default_rearm_delay_ms() -> u64 {
    50
}
fn default_failure_backoff_ms() -> u64 {
    1_000
}
fn default_reconcile_interval_ms() -> u64 {
    2_000
}
fn default_log_capacity() -> usize {
    20
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_design_values() {
        let config = AppConfig::default_config();
        assert_eq!(config.long_polling.rearm_delay(), Duration::from_millis(50));
        assert_eq!(config.long_polling.failure_backoff(), Duration::from_secs(1));
        assert_eq!(config.reconcile_interval(), Duration::from_secs(2));
        assert_eq!(config.log.capacity, 20);
        assert_eq!(config.server.push_topic, "/topic/notifications");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_json_uses_defaults() {
        let json = r#"{"server": {"base_url": "http://example.com:9000"}}"#;
        let config: AppConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.server.base_url, "http://example.com:9000");
        assert_eq!(config.server.push_path, "/ws/websocket");
        assert_eq!(config.short_polling.interval_ms, 5_000);
        assert_eq!(config.reconciler.interval_ms, 2_000);
    }

    #[test]
    fn validate_rejects_zero_values() {
        let mut config = AppConfig::default_config();
        config.short_polling.interval_ms = 0;
        assert!(matches!(config.validate(), Err(CoreError::Config(_))));

        let mut config = AppConfig::default_config();
        config.log.capacity = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default_config();
        config.server.base_url = "  ".to_string();
        assert!(config.validate().is_err());

        let mut config = AppConfig::default_config();
        config.server.push_path = "ws".to_string();
        assert!(config.validate().is_err());
    }
}
