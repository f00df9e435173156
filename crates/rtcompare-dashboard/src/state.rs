//! 공유 대시보드 상태.
//!
//! 세 세션과 재조정기가 `Arc<DashboardState>`로 공유한다.
//! 모든 읽기-수정-쓰기는 `.await` 없는 짧은 임계 구역 안에서 끝난다.

use parking_lot::{Mutex, RwLock};
use rtcompare_core::models::metrics::{
    DashboardSnapshot, MetricsSnapshot, Technique, TechniqueMetrics,
};
use rtcompare_core::models::notification::{
    LoggedNotification, Notification, NotificationSource,
};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::debug;

use crate::metrics_store::MetricsStore;
use crate::notification_log::NotificationLog;

/// 알림 로그 + 표시 카운터 (같은 락으로 보호)
#[derive(Debug)]
struct LogState {
    log: NotificationLog,
    display_counter: u64,
}

impl LogState {
    fn append(&mut self, notification: Notification, source: NotificationSource) {
        self.log.push(LoggedNotification::new(notification, source));
        self.display_counter = self.display_counter.saturating_add(1);
    }
}

/// 프로세스 단위 대시보드 상태
#[derive(Debug)]
pub struct DashboardState {
    metrics: RwLock<MetricsStore>,
    log: Mutex<LogState>,
    /// 롱 폴링 서버 대기 클라이언트 수 (재조정기가 갱신)
    waiting_clients: RwLock<Option<u32>>,
    /// 로컬 초기화마다 증가. 초기화 이전에 조회한 권위 값을 걸러낸다.
    reset_epoch: AtomicU64,
}

impl DashboardState {
    pub fn new(log_capacity: usize) -> Self {
        Self {
            metrics: RwLock::new(MetricsStore::new()),
            log: Mutex::new(LogState {
                log: NotificationLog::new(log_capacity),
                display_counter: 0,
            }),
            waiting_clients: RwLock::new(None),
            reset_epoch: AtomicU64::new(0),
        }
    }

    // ============================================================
    // 세션 측 기록
    // ============================================================

    /// 폴링 1주기 결과 기록: 메트릭 갱신 + 알림 로그 추가
    pub fn record_cycle(
        &self,
        technique: Technique,
        notifications: Vec<Notification>,
        latency: Duration,
    ) {
        let count = notifications.len() as u64;
        self.metrics.write().record_cycle(technique, count, latency);

        if !notifications.is_empty() {
            let source = technique.source();
            let mut log = self.log.lock();
            for notification in notifications {
                log.append(notification, source);
            }
        }
    }

    /// 푸시 메시지 1건 기록
    pub fn record_push(&self, notification: Notification) {
        self.metrics.write().record_message(Technique::PushChannel);
        self.log
            .lock()
            .append(notification, NotificationSource::PushChannel);
    }

    // ============================================================
    // 재조정 / 초기화
    // ============================================================

    /// 현재 리셋 에포크
    pub fn reset_epoch(&self) -> u64 {
        self.reset_epoch.load(Ordering::SeqCst)
    }

    /// 권위 스냅샷 적용
    ///
    /// `epoch`이 현재 에포크와 다르면(조회 후 리셋됨) 적용하지 않고 `false`.
    pub fn apply_authoritative(&self, snapshot: &MetricsSnapshot, epoch: u64) -> bool {
        let mut metrics = self.metrics.write();
        if self.reset_epoch() != epoch {
            return false;
        }
        metrics.apply_snapshot(snapshot);
        true
    }

    /// 대기 클라이언트 수 갱신 (에포크 검사는 `apply_authoritative`와 동일)
    pub fn set_waiting_clients(&self, waiting: u32, epoch: u64) -> bool {
        let mut slot = self.waiting_clients.write();
        if self.reset_epoch() != epoch {
            return false;
        }
        *slot = Some(waiting);
        true
    }

    /// 초기 스냅샷으로 상태 채우기
    ///
    /// 최신 알림은 `System` 출처로 기록하며, 가장 최신 항목이 로그 맨 앞에 온다.
    pub fn seed(&self, snapshot: DashboardSnapshot) {
        self.metrics.write().apply_snapshot(&snapshot.metrics);

        let mut latest = snapshot.latest_notifications;
        latest.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        let mut log = self.log.lock();
        for notification in latest {
            log.append(notification, NotificationSource::System);
        }
        debug!("초기 스냅샷 적용: 로그 {}건", log.log.len());
    }

    /// 로컬 상태 전체 초기화: 메트릭 0, 로그/카운터/대기 수 초기화, 에포크 증가
    pub fn clear_local(&self) {
        {
            let mut metrics = self.metrics.write();
            self.reset_epoch.fetch_add(1, Ordering::SeqCst);
            metrics.reset();
        }
        *self.waiting_clients.write() = None;
        self.clear_log();
    }

    /// 알림 로그와 표시 카운터만 초기화
    pub fn clear_log(&self) {
        let mut log = self.log.lock();
        log.log.clear();
        log.display_counter = 0;
    }

    // ============================================================
    // 조회
    // ============================================================

    pub fn metrics(&self, technique: Technique) -> TechniqueMetrics {
        self.metrics.read().get(technique)
    }

    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.read().snapshot()
    }

    /// 알림 로그 (최신순)
    pub fn log_entries(&self) -> Vec<LoggedNotification> {
        self.log.lock().log.to_vec()
    }

    pub fn log_len(&self) -> usize {
        self.log.lock().log.len()
    }

    /// 표시 카운터 (마지막 초기화 이후 기록된 알림 수)
    pub fn display_counter(&self) -> u64 {
        self.log.lock().display_counter
    }

    pub fn waiting_clients(&self) -> Option<u32> {
        *self.waiting_clients.read()
    }
}
