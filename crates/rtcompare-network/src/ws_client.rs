//! WebSocket 푸시 클라이언트.
//!
//! `tokio-tungstenite` 위에 STOMP 1.2로 단일 토픽을 구독하는 `PushTransport` 포트 구현.
//! 자동 재연결은 하지 않는다. 재연결은 세션의 수동 `connect()` 몫이다.

use async_trait::async_trait;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use rtcompare_core::error::CoreError;
use rtcompare_core::models::notification::Notification;
use rtcompare_core::ports::push_transport::{
    PushConnection, PushEvent, PushSubscription, PushTransport,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};
use url::Url;

use crate::stomp::{parse_frames, StompCommand, StompFrame};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;

/// 구독 ID (토픽 하나만 구독)
const SUBSCRIPTION_ID: &str = "sub-0";

/// 이벤트 채널 용량
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// STOMP-over-WebSocket 푸시 클라이언트: `PushTransport` 포트 구현
pub struct StompPushClient {
    ws_url: String,
    host: String,
}

impl StompPushClient {
    /// 새 푸시 클라이언트 생성
    ///
    /// `base_url`의 http/https 스킴을 ws/wss로 바꾸고 경로를 `push_path`로 교체한다.
    pub fn new(base_url: &str, push_path: &str) -> Result<Self, CoreError> {
        let mut url = Url::parse(base_url)
            .map_err(|e| CoreError::Config(format!("잘못된 서버 URL: {base_url}: {e}")))?;

        let scheme = match url.scheme() {
            "http" | "ws" => "ws",
            "https" | "wss" => "wss",
            other => {
                return Err(CoreError::Config(format!(
                    "지원하지 않는 URL 스킴: {other}"
                )))
            }
        };
        url.set_scheme(scheme)
            .map_err(|_| CoreError::Config(format!("URL 스킴 변경 실패: {base_url}")))?;
        url.set_path(push_path);
        url.set_query(None);

        let host = url.host_str().unwrap_or("localhost").to_string();

        Ok(Self {
            ws_url: url.to_string(),
            host,
        })
    }

    /// WebSocket 접속 URL
    pub fn ws_url(&self) -> &str {
        &self.ws_url
    }

    /// CONNECTED 프레임 대기
    async fn await_connected(read: &mut SplitStream<WsStream>) -> Result<(), CoreError> {
        while let Some(msg) = read.next().await {
            match msg {
                Ok(Message::Text(text)) => {
                    for frame in parse_frames(text.as_str())? {
                        match frame.command {
                            StompCommand::Connected => {
                                debug!(
                                    "STOMP 핸드셰이크 완료: version={}",
                                    frame.get_header("version").unwrap_or("?")
                                );
                                return Ok(());
                            }
                            StompCommand::Error => {
                                let reason = frame
                                    .get_header("message")
                                    .unwrap_or(frame.body.as_str())
                                    .to_string();
                                return Err(CoreError::Transport(format!(
                                    "STOMP 핸드셰이크 거부: {reason}"
                                )));
                            }
                            other => debug!("핸드셰이크 중 프레임 무시: {}", other.as_str()),
                        }
                    }
                }
                Ok(Message::Close(_)) => break,
                Ok(_) => {} // Ping/Pong/Binary 무시
                Err(e) => {
                    return Err(CoreError::Transport(format!("WebSocket 수신 에러: {e}")));
                }
            }
        }
        Err(CoreError::Transport(
            "STOMP 핸드셰이크 중 연결 종료".to_string(),
        ))
    }

    /// 수신 루프: MESSAGE 프레임을 알림 이벤트로 변환
    async fn read_loop(mut read: SplitStream<WsStream>, tx: mpsc::Sender<PushEvent>) {
        while let Some(msg) = read.next().await {
            let text = match msg {
                Ok(Message::Text(text)) => text,
                Ok(Message::Close(_)) => {
                    debug!("서버가 WebSocket 종료");
                    break;
                }
                Ok(_) => continue,
                Err(e) => {
                    warn!("WebSocket 수신 에러: {e}");
                    break;
                }
            };

            let frames = match parse_frames(text.as_str()) {
                Ok(frames) => frames,
                Err(e) => {
                    warn!("STOMP 프레임 해석 실패: {e}");
                    if tx.send(PushEvent::Error(e.to_string())).await.is_err() {
                        break;
                    }
                    continue;
                }
            };

            for frame in frames {
                let event = match frame.command {
                    StompCommand::Message => {
                        match serde_json::from_str::<Notification>(&frame.body) {
                            Ok(notification) => PushEvent::Notification(notification),
                            Err(e) => PushEvent::Error(format!("알림 본문 해석 실패: {e}")),
                        }
                    }
                    StompCommand::Error => PushEvent::Error(
                        frame
                            .get_header("message")
                            .unwrap_or(frame.body.as_str())
                            .to_string(),
                    ),
                    other => {
                        debug!("프레임 무시: {}", other.as_str());
                        continue;
                    }
                };
                if tx.send(event).await.is_err() {
                    debug!("푸시 이벤트 채널 닫힘, 수신 루프 종료");
                    return;
                }
            }
        }
        debug!("WebSocket 수신 루프 종료");
    }
}

#[async_trait]
impl PushTransport for StompPushClient {
    async fn subscribe(&self, topic: &str) -> Result<PushSubscription, CoreError> {
        info!("푸시 채널 연결: {}", self.ws_url);

        let (ws_stream, _) = tokio_tungstenite::connect_async(self.ws_url.as_str())
            .await
            .map_err(|e| CoreError::Transport(format!("WebSocket 연결 실패: {e}")))?;

        let (mut write, mut read) = ws_stream.split();

        send_frame(&mut write, &StompFrame::connect(&self.host)).await?;
        Self::await_connected(&mut read).await?;
        send_frame(&mut write, &StompFrame::subscribe(SUBSCRIPTION_ID, topic)).await?;
        info!("토픽 구독 완료: {topic}");

        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let reader = tokio::spawn(Self::read_loop(read, tx));

        Ok(PushSubscription {
            events: rx,
            connection: Box::new(StompConnection {
                write: Mutex::new(write),
                reader,
                closed: AtomicBool::new(false),
            }),
        })
    }
}

async fn send_frame(write: &mut WsSink, frame: &StompFrame) -> Result<(), CoreError> {
    write
        .send(Message::text(frame.encode()))
        .await
        .map_err(|e| CoreError::Transport(format!("STOMP {} 전송 실패: {e}", frame.command.as_str())))
}

/// 수립된 STOMP 연결: `PushConnection` 구현
struct StompConnection {
    write: Mutex<WsSink>,
    reader: JoinHandle<()>,
    closed: AtomicBool,
}

#[async_trait]
impl PushConnection for StompConnection {
    async fn close(&self) -> Result<(), CoreError> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        let mut write = self.write.lock().await;
        // 서버가 이미 끊었을 수 있으므로 전송 실패는 무시
        if let Err(e) = send_frame(&mut write, &StompFrame::disconnect()).await {
            debug!("DISCONNECT 전송 생략: {e}");
        }
        if let Err(e) = write.send(Message::Close(None)).await {
            debug!("WebSocket 종료 프레임 전송 생략: {e}");
        }
        self.reader.abort();
        info!("푸시 채널 연결 종료");
        Ok(())
    }
}

impl Drop for StompConnection {
    fn drop(&mut self) {
        self.reader.abort();
    }
}
