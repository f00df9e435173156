//! 세션 라이프사이클 상태.

use serde::{Deserialize, Serialize};

/// 기법 세션 상태
///
/// `Inactive → Starting → Active ⇄ Waiting → Inactive`,
/// `Error`는 `Starting`/`Active`/`Waiting`에서 도달 가능.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    #[default]
    Inactive,
    Starting,
    Active,
    Waiting,
    Error,
}

impl SessionState {
    /// 실행 중(시작 요청을 거부해야 하는) 상태인지
    pub fn is_running(&self) -> bool {
        matches!(
            self,
            SessionState::Starting | SessionState::Active | SessionState::Waiting
        )
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionState::Inactive => write!(f, "Inactive"),
            SessionState::Starting => write!(f, "Starting"),
            SessionState::Active => write!(f, "Active"),
            SessionState::Waiting => write!(f, "Waiting"),
            SessionState::Error => write!(f, "Error"),
        }
    }
}

/// 푸시 채널 연결 상태 (세션 상태와 별도 신호)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    /// 연결 없음
    #[default]
    Closed,
    /// 핸드셰이크 진행 중
    Connecting,
    /// 연결됨 + 구독 완료
    Connected,
    /// 연결 실패 또는 서버 측 종료
    Failed,
}

impl std::fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionStatus::Closed => write!(f, "Closed"),
            ConnectionStatus::Connecting => write!(f, "Connecting"),
            ConnectionStatus::Connected => write!(f, "Connected"),
            ConnectionStatus::Failed => write!(f, "Failed"),
        }
    }
}
