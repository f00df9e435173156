//! # rtcompare-network
//!
//! 백엔드와의 네트워크 어댑터.
//! REST 폴링 엔드포인트와 STOMP-over-WebSocket 푸시 채널을 담당하며
//! `rtcompare-core`의 포트(`DashboardApi`, `PushTransport`)를 구현한다.
//!
//! ## 사용 예시
//!
//! ```rust,ignore
//! use rtcompare_network::http_client::HttpDashboardApi;
//! use rtcompare_network::ws_client::StompPushClient;
//!
//! let api = HttpDashboardApi::new("http://localhost:8080", Duration::from_secs(60))?;
//! let push = StompPushClient::new("http://localhost:8080", "/ws/websocket")?;
//! ```

pub mod http_client;
pub mod stomp;
pub mod ws_client;
