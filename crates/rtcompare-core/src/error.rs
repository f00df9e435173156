//! rtcompare 핵심 에러 타입.
//!
//! 모든 라이브러리 crate가 이 타입을 그대로 공유한다.
//! 바이너리(`rtcompare-app`)만 최상위에서 `anyhow`로 감싼다.

use thiserror::Error;

/// 코어 레이어 에러.
///
/// 전송 실패는 세션 내부에서 복구(로그 후 사이클 스킵/백오프)되고,
/// 설정/연결 상태 에러는 호출자에게 거부된 작업으로 보고된다.
#[derive(Debug, Error)]
pub enum CoreError {
    /// 요청/연결 실패 (연결 거부, 타임아웃, 5xx 등)
    #[error("전송 실패: {0}")]
    Transport(String),

    /// 잘못된 설정 또는 이미 활성 상태인 세션 시작 시도
    #[error("잘못된 설정: {0}")]
    InvalidConfig(String),

    /// 이미 푸시 채널이 연결되어 있음
    #[error("이미 연결됨: {0}")]
    AlreadyConnected(String),

    /// 연결되어 있지 않음
    #[error("연결되지 않음: {0}")]
    NotConnected(String),

    /// 응답 본문/프레임 해석 실패
    #[error("프로토콜 에러: {0}")]
    Protocol(String),

    /// 리소스를 찾을 수 없음 (404)
    #[error("{resource_type} 미발견: {id}")]
    NotFound {
        /// 리소스 종류 (예: "API")
        resource_type: String,
        /// 리소스 식별자
        id: String,
    },

    /// 서비스 일시 불가 (503)
    #[error("서비스 일시 불가: {0}")]
    ServiceUnavailable(String),

    /// 설정 파일 에러
    #[error("설정 에러: {0}")]
    Config(String),

    /// JSON 직렬화/역직렬화 실패
    #[error("직렬화 에러: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O 에러
    #[error("I/O 에러: {0}")]
    Io(#[from] std::io::Error),
}

impl CoreError {
    /// 네트워크 계열(로컬 복구 대상) 에러인지 판별
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            CoreError::Transport(_)
                | CoreError::ServiceUnavailable(_)
                | CoreError::NotFound { .. }
                | CoreError::Protocol(_)
        )
    }
}
