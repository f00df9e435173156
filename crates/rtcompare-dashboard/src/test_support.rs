//! 테스트용 포트 구현 (스크립트된 백엔드 API / 푸시 전송 계층).

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use rtcompare_core::error::CoreError;
use rtcompare_core::models::metrics::{
    DashboardSnapshot, LongPollingStats, MetricsSnapshot, Technique, TechniqueMetrics,
};
use rtcompare_core::models::notification::Notification;
use rtcompare_core::ports::dashboard_api::DashboardApi;
use rtcompare_core::ports::push_transport::{
    PushConnection, PushEvent, PushSubscription, PushTransport,
};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

pub(crate) fn notification(id: i64) -> Notification {
    Notification {
        id,
        message: format!("알림 {id}"),
        created_at: Utc::now(),
        delivered: false,
    }
}

pub(crate) fn notifications(ids: std::ops::RangeInclusive<i64>) -> Vec<Notification> {
    ids.map(notification).collect()
}

pub(crate) fn transport_error() -> CoreError {
    CoreError::Transport("connection refused".to_string())
}

pub(crate) fn metrics(request_count: u64, notification_count: u64, latency: f64) -> TechniqueMetrics {
    TechniqueMetrics {
        request_count,
        notification_count,
        average_latency_ms: latency,
    }
}

pub(crate) fn snapshot_of(entries: &[(Technique, TechniqueMetrics)]) -> MetricsSnapshot {
    entries
        .iter()
        .fold(MetricsSnapshot::new(), |s, (t, m)| s.with(*t, *m))
}

type Script<T> = Mutex<VecDeque<Result<T, CoreError>>>;

/// 엔드포인트별 응답을 순서대로 돌려주는 API. 스크립트가 비면 빈 성공 응답.
#[derive(Default)]
pub(crate) struct ScriptedApi {
    short: Script<Vec<Notification>>,
    long: Script<Vec<Notification>>,
    metrics: Script<MetricsSnapshot>,
    stats: Script<LongPollingStats>,
    initial: Script<DashboardSnapshot>,
    reset_fails: bool,
    short_latency: Duration,
    long_latency: Duration,
    metrics_latency: Duration,

    pub short_calls: AtomicUsize,
    pub long_calls: AtomicUsize,
    pub metrics_calls: AtomicUsize,
    pub reset_calls: AtomicUsize,
    pub client_ids: Mutex<Vec<String>>,
    long_depth: AtomicUsize,
    pub long_max_depth: AtomicUsize,
}

impl ScriptedApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn short_responses(self, responses: Vec<Result<Vec<Notification>, CoreError>>) -> Self {
        *self.short.lock() = responses.into();
        self
    }

    pub fn long_responses(self, responses: Vec<Result<Vec<Notification>, CoreError>>) -> Self {
        *self.long.lock() = responses.into();
        self
    }

    pub fn metrics_responses(self, responses: Vec<Result<MetricsSnapshot, CoreError>>) -> Self {
        *self.metrics.lock() = responses.into();
        self
    }

    pub fn stats_responses(self, responses: Vec<Result<LongPollingStats, CoreError>>) -> Self {
        *self.stats.lock() = responses.into();
        self
    }

    pub fn initial_response(self, response: Result<DashboardSnapshot, CoreError>) -> Self {
        self.initial.lock().push_back(response);
        self
    }

    pub fn failing_reset(mut self) -> Self {
        self.reset_fails = true;
        self
    }

    pub fn short_latency(mut self, latency: Duration) -> Self {
        self.short_latency = latency;
        self
    }

    pub fn long_latency(mut self, latency: Duration) -> Self {
        self.long_latency = latency;
        self
    }

    pub fn metrics_latency(mut self, latency: Duration) -> Self {
        self.metrics_latency = latency;
        self
    }

    pub fn calls(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

async fn simulate(latency: Duration) {
    if !latency.is_zero() {
        tokio::time::sleep(latency).await;
    }
}

#[async_trait]
impl DashboardApi for ScriptedApi {
    async fn fetch_short_polling(&self) -> Result<Vec<Notification>, CoreError> {
        self.short_calls.fetch_add(1, Ordering::SeqCst);
        let next = self.short.lock().pop_front();
        simulate(self.short_latency).await;
        next.unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn fetch_long_polling(&self, client_id: &str) -> Result<Vec<Notification>, CoreError> {
        self.long_calls.fetch_add(1, Ordering::SeqCst);
        self.client_ids.lock().push(client_id.to_string());
        let depth = self.long_depth.fetch_add(1, Ordering::SeqCst) + 1;
        self.long_max_depth.fetch_max(depth, Ordering::SeqCst);

        let next = self.long.lock().pop_front();
        simulate(self.long_latency).await;

        self.long_depth.fetch_sub(1, Ordering::SeqCst);
        next.unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn fetch_metrics(&self) -> Result<MetricsSnapshot, CoreError> {
        self.metrics_calls.fetch_add(1, Ordering::SeqCst);
        let next = self.metrics.lock().pop_front();
        simulate(self.metrics_latency).await;
        next.unwrap_or_else(|| Ok(MetricsSnapshot::new()))
    }

    async fn fetch_long_polling_stats(&self) -> Result<LongPollingStats, CoreError> {
        let next = self.stats.lock().pop_front();
        next.unwrap_or_else(|| Ok(LongPollingStats::default()))
    }

    async fn fetch_initial_snapshot(&self) -> Result<DashboardSnapshot, CoreError> {
        let next = self.initial.lock().pop_front();
        next.unwrap_or_else(|| Ok(DashboardSnapshot::default()))
    }

    async fn reset(&self) -> Result<(), CoreError> {
        self.reset_calls.fetch_add(1, Ordering::SeqCst);
        if self.reset_fails {
            Err(CoreError::ServiceUnavailable("reset".to_string()))
        } else {
            Ok(())
        }
    }
}

/// 구독마다 이벤트 송신 핸들을 보관하는 푸시 전송 계층
#[derive(Default)]
pub(crate) struct ScriptedTransport {
    outcomes: Script<()>,
    handshake_delay: Duration,
    close_delay: Duration,
    senders: Mutex<Vec<mpsc::Sender<PushEvent>>>,
    pub subscribe_calls: AtomicUsize,
    pub topics: Mutex<Vec<String>>,
    pub closes: Arc<AtomicUsize>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// 구독 결과 스크립트 (비면 성공)
    pub fn outcomes(self, outcomes: Vec<Result<(), CoreError>>) -> Self {
        *self.outcomes.lock() = outcomes.into();
        self
    }

    pub fn handshake_delay(mut self, delay: Duration) -> Self {
        self.handshake_delay = delay;
        self
    }

    /// 연결 종료에 걸리는 시간
    pub fn close_delay(mut self, delay: Duration) -> Self {
        self.close_delay = delay;
        self
    }

    /// 가장 최근 구독의 송신 핸들
    pub fn sender(&self) -> Option<mpsc::Sender<PushEvent>> {
        self.senders.lock().last().cloned()
    }

    /// 서버 측 연결 종료 흉내
    pub fn drop_senders(&self) {
        self.senders.lock().clear();
    }

    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

struct ScriptedConnection {
    closed: AtomicBool,
    closes: Arc<AtomicUsize>,
    close_delay: Duration,
}

#[async_trait]
impl PushConnection for ScriptedConnection {
    async fn close(&self) -> Result<(), CoreError> {
        simulate(self.close_delay).await;
        if !self.closed.swap(true, Ordering::SeqCst) {
            self.closes.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }
}

#[async_trait]
impl PushTransport for ScriptedTransport {
    async fn subscribe(&self, topic: &str) -> Result<PushSubscription, CoreError> {
        self.subscribe_calls.fetch_add(1, Ordering::SeqCst);
        self.topics.lock().push(topic.to_string());
        let outcome = self.outcomes.lock().pop_front();
        simulate(self.handshake_delay).await;
        outcome.unwrap_or(Ok(()))?;

        let (tx, rx) = mpsc::channel(16);
        self.senders.lock().push(tx);
        Ok(PushSubscription {
            events: rx,
            connection: Box::new(ScriptedConnection {
                closed: AtomicBool::new(false),
                closes: self.closes.clone(),
                close_delay: self.close_delay,
            }),
        })
    }
}
