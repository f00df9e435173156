//! 푸시 채널 세션.
//!
//! 전송 계층 연결 + 단일 토픽 구독 후 수신 메시지를 하나씩 기록한다.
//! 자동 재연결은 없다. 연결 실패나 서버 측 종료 후에는 `connect()`를 다시 호출해야 한다.

use async_trait::async_trait;
use parking_lot::Mutex;
use rtcompare_core::error::CoreError;
use rtcompare_core::models::metrics::Technique;
use rtcompare_core::models::session::{ConnectionStatus, SessionState};
use rtcompare_core::ports::push_transport::{
    PushConnection, PushEvent, PushSubscription, PushTransport,
};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::{RunGate, RunTicket, Signal, TechniqueSession};
use crate::state::DashboardState;

/// 수신 태스크와 공유하는 신호
struct Signals {
    state: Signal<SessionState>,
    status: Signal<ConnectionStatus>,
}

impl Signals {
    fn set(&self, state: SessionState, status: ConnectionStatus) {
        self.state.set(state);
        self.status.set(status);
    }
}

/// 수립된 연결
struct Link {
    connection: Box<dyn PushConnection>,
    pump: JoinHandle<()>,
}

impl Link {
    async fn shutdown(self) {
        self.pump.abort();
        if let Err(e) = self.connection.close().await {
            warn!("푸시 채널 종료 실패: {e}");
        }
    }
}

/// 푸시 채널 세션
pub struct PushChannelSession {
    transport: Arc<dyn PushTransport>,
    dashboard: Arc<DashboardState>,
    topic: String,
    signals: Arc<Signals>,
    gate: RunGate,
    /// 시작 전이(`try_begin` + 게이트 열기)와 해제 전이를 직렬화
    control: Mutex<()>,
    link: Mutex<Option<Link>>,
}

impl PushChannelSession {
    pub fn new(
        transport: Arc<dyn PushTransport>,
        dashboard: Arc<DashboardState>,
        topic: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            dashboard,
            topic: topic.into(),
            signals: Arc::new(Signals {
                state: Signal::new(SessionState::Inactive),
                status: Signal::new(ConnectionStatus::Closed),
            }),
            gate: RunGate::new(),
            control: Mutex::new(()),
            link: Mutex::new(None),
        }
    }

    /// 연결 + 구독
    ///
    /// 핸드셰이크 실패 시 `Error`/`Failed`로 전이하고 에러를 반환한다.
    /// 핸드셰이크 중에 `disconnect()`가 호출되면 늦게 수립된 연결은 닫고 버린다.
    pub async fn connect(&self) -> Result<(), CoreError> {
        let (ticket, stale) = {
            let _control = self.control.lock();
            if !self.signals.state.try_begin(SessionState::Starting) {
                return Err(CoreError::AlreadyConnected(
                    "푸시 채널이 이미 연결됨".to_string(),
                ));
            }
            let ticket = self.gate.open();
            self.signals.status.set(ConnectionStatus::Connecting);
            (ticket, self.link.lock().take())
        };

        // 서버 측 종료로 남은 이전 연결 정리
        if let Some(stale) = stale {
            stale.shutdown().await;
        }
        if !ticket.is_live() {
            info!("이전 연결 정리 중 해제 요청됨");
            return Err(CoreError::NotConnected(
                "연결 준비 중 연결 해제됨".to_string(),
            ));
        }
        info!("푸시 채널 연결 시도 (토픽 {})", self.topic);

        let subscription = match self.transport.subscribe(&self.topic).await {
            Ok(subscription) => subscription,
            Err(e) => {
                let reported = ticket.commit(|| {
                    self.signals
                        .set(SessionState::Error, ConnectionStatus::Failed)
                });
                if reported.is_some() {
                    warn!("푸시 채널 연결 실패: {e}");
                }
                return Err(e);
            }
        };

        let PushSubscription { events, connection } = subscription;
        let pump = tokio::spawn(Self::pump(
            events,
            self.dashboard.clone(),
            self.signals.clone(),
            ticket.clone(),
        ));
        let link = Link { connection, pump };

        // 게이트가 열려 있을 때만 연결을 넘겨받는다. 닫혔으면 link를 돌려받아 정리.
        let mut pending = Some(link);
        let accepted = ticket.commit(|| {
            *self.link.lock() = pending.take();
            self.signals
                .set(SessionState::Active, ConnectionStatus::Connected);
        });

        match (accepted, pending) {
            (Some(()), _) => {
                info!("푸시 채널 연결 완료");
                Ok(())
            }
            (None, Some(late)) => {
                info!("연결 중 해제 요청됨, 늦게 수립된 연결 폐기");
                late.shutdown().await;
                Err(CoreError::NotConnected(
                    "핸드셰이크 중 연결 해제됨".to_string(),
                ))
            }
            (None, None) => Err(CoreError::NotConnected(
                "핸드셰이크 중 연결 해제됨".to_string(),
            )),
        }
    }

    /// 연결 해제 (멱등)
    pub async fn disconnect(&self) {
        let (was_open, link) = {
            let _control = self.control.lock();
            let was_open = self.gate.close();
            self.signals
                .set(SessionState::Inactive, ConnectionStatus::Closed);
            (was_open, self.link.lock().take())
        };
        if let Some(link) = link {
            link.shutdown().await;
        }
        if was_open {
            info!("푸시 채널 연결 해제");
        }
    }

    pub fn state(&self) -> SessionState {
        self.signals.state.get()
    }

    pub fn connection_status(&self) -> ConnectionStatus {
        self.signals.status.get()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<ConnectionStatus> {
        self.signals.status.subscribe()
    }

    /// 수신 루프: 알림마다 메시지 +1, 알림 +1, 지연 0
    async fn pump(
        mut events: mpsc::Receiver<PushEvent>,
        dashboard: Arc<DashboardState>,
        signals: Arc<Signals>,
        ticket: RunTicket,
    ) {
        while let Some(event) = events.recv().await {
            match event {
                PushEvent::Notification(notification) => {
                    let id = notification.id;
                    if ticket.commit(|| dashboard.record_push(notification)).is_none() {
                        return;
                    }
                    debug!("푸시 알림 수신: {id}");
                }
                PushEvent::Error(message) => warn!("푸시 채널 에러: {message}"),
            }
        }

        let failed = ticket.commit(|| signals.set(SessionState::Error, ConnectionStatus::Failed));
        if failed.is_some() {
            warn!("서버가 푸시 채널 연결을 종료함");
        }
    }
}

#[async_trait]
impl TechniqueSession for PushChannelSession {
    fn technique(&self) -> Technique {
        Technique::PushChannel
    }

    fn state(&self) -> SessionState {
        self.signals.state.get()
    }

    fn subscribe_state(&self) -> watch::Receiver<SessionState> {
        self.signals.state.subscribe()
    }

    async fn activate(&self) -> Result<(), CoreError> {
        self.connect().await
    }

    async fn deactivate(&self) {
        self.disconnect().await;
    }
}

impl Drop for PushChannelSession {
    fn drop(&mut self) {
        self.gate.close();
        if let Some(link) = self.link.get_mut().take() {
            link.pump.abort();
        }
    }
}
