//! 푸시 채널 포트.
//!
//! 구현: `rtcompare-network` crate (tokio-tungstenite + STOMP)

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::CoreError;
use crate::models::notification::Notification;

/// 푸시 채널로 수신한 이벤트
#[derive(Debug, Clone)]
pub enum PushEvent {
    /// 토픽에 발행된 알림 1건
    Notification(Notification),
    /// 서버가 보낸 에러 프레임 또는 해석 불가 메시지
    Error(String),
}

/// 연결 해제 핸들
#[async_trait]
pub trait PushConnection: Send + Sync {
    /// 전송 계층 연결 종료 (이미 닫혔으면 no-op)
    async fn close(&self) -> Result<(), CoreError>;
}

/// 구독 결과: 이벤트 수신 채널 + 연결 핸들
///
/// 채널이 닫히면(`recv()`가 `None`) 서버 측 연결이 끊긴 것이다.
pub struct PushSubscription {
    pub events: mpsc::Receiver<PushEvent>,
    pub connection: Box<dyn PushConnection>,
}

impl std::fmt::Debug for PushSubscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PushSubscription").finish_non_exhaustive()
    }
}

/// 푸시 전송 계층
#[async_trait]
pub trait PushTransport: Send + Sync {
    /// 연결 수립 + 핸드셰이크 + 단일 토픽 구독
    ///
    /// 핸드셰이크/구독까지 성공해야 `Ok`를 반환한다.
    async fn subscribe(&self, topic: &str) -> Result<PushSubscription, CoreError>;
}
