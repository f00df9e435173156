//! 기법별 메트릭 저장소.
//!
//! 세션의 낙관적 갱신과 재조정기의 권위 덮어쓰기를 모두 받는 순수 데이터 구조.
//! 동기화는 호출 측(`DashboardState`)이 담당한다.

use rtcompare_core::models::metrics::{MetricsSnapshot, Technique, TechniqueMetrics};
use std::collections::BTreeMap;
use std::time::Duration;

/// 기법별 메트릭 저장소 (세 기법 항상 존재)
#[derive(Debug, Clone, PartialEq)]
pub struct MetricsStore {
    entries: BTreeMap<Technique, TechniqueMetrics>,
}

impl MetricsStore {
    /// 세 기법 모두 0으로 초기화된 저장소
    pub fn new() -> Self {
        Self {
            entries: Technique::ALL
                .iter()
                .map(|t| (*t, TechniqueMetrics::zero()))
                .collect(),
        }
    }

    /// 기법별 메트릭 조회
    pub fn get(&self, technique: Technique) -> TechniqueMetrics {
        self.entries.get(&technique).copied().unwrap_or_default()
    }

    /// 폴링 1주기 완료 기록
    ///
    /// 요청 +1, 알림 +N, 지연 시간은 마지막 샘플로 교체 (클라이언트 측 평균 없음).
    pub fn record_cycle(&mut self, technique: Technique, notifications: u64, latency: Duration) {
        let entry = self.entries.entry(technique).or_default();
        entry.request_count = entry.request_count.saturating_add(1);
        entry.notification_count = entry.notification_count.saturating_add(notifications);
        entry.average_latency_ms = latency.as_secs_f64() * 1_000.0;
    }

    /// 푸시 메시지 1건 기록 (메시지 +1, 알림 +1, 지연 0)
    pub fn record_message(&mut self, technique: Technique) {
        let entry = self.entries.entry(technique).or_default();
        entry.request_count = entry.request_count.saturating_add(1);
        entry.notification_count = entry.notification_count.saturating_add(1);
        entry.average_latency_ms = 0.0;
    }

    /// 권위 스냅샷 적용: 스냅샷에 있는 기법만 통째로 교체
    ///
    /// 교체된 기법 수를 반환한다.
    pub fn apply_snapshot(&mut self, snapshot: &MetricsSnapshot) -> usize {
        for (technique, metrics) in &snapshot.entries {
            self.entries.insert(*technique, *metrics);
        }
        snapshot.entries.len()
    }

    /// 모든 기법 0으로 초기화
    pub fn reset(&mut self) {
        for metrics in self.entries.values_mut() {
            *metrics = TechniqueMetrics::zero();
        }
    }

    /// 모든 기법이 0인지
    pub fn is_zero(&self) -> bool {
        self.entries.values().all(TechniqueMetrics::is_zero)
    }

    /// 현재 값의 스냅샷
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            entries: self.entries.clone(),
        }
    }

    /// 표시 순서(short, long, push)로 순회
    pub fn iter(&self) -> impl Iterator<Item = (Technique, TechniqueMetrics)> + '_ {
        self.entries.iter().map(|(t, m)| (*t, *m))
    }
}

impl Default for MetricsStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_store_has_all_techniques_zeroed() {
        let store = MetricsStore::new();
        assert_eq!(store.iter().count(), 3);
        assert!(store.is_zero());
        let order: Vec<_> = store.iter().map(|(t, _)| t).collect();
        assert_eq!(order, Technique::ALL.to_vec());
    }

    #[test]
    fn record_cycle_replaces_latency() {
        let mut store = MetricsStore::new();
        store.record_cycle(Technique::ShortPolling, 2, Duration::from_millis(120));
        store.record_cycle(Technique::ShortPolling, 0, Duration::from_millis(30));

        let short = store.get(Technique::ShortPolling);
        assert_eq!(short.request_count, 2);
        assert_eq!(short.notification_count, 2);
        assert_eq!(short.average_latency_ms, 30.0);
        assert!(store.get(Technique::LongPolling).is_zero());
    }

    #[test]
    fn record_message_has_zero_latency() {
        let mut store = MetricsStore::new();
        for _ in 0..3 {
            store.record_message(Technique::PushChannel);
        }
        let push = store.get(Technique::PushChannel);
        assert_eq!(push.request_count, 3);
        assert_eq!(push.notification_count, 3);
        assert_eq!(push.average_latency_ms, 0.0);
    }

    #[test]
    fn snapshot_replaces_whole_entry() {
        let mut store = MetricsStore::new();
        store.record_cycle(Technique::LongPolling, 5, Duration::from_millis(900));
        store.record_cycle(Technique::ShortPolling, 1, Duration::from_millis(10));

        let snapshot = MetricsSnapshot::new().with(
            Technique::LongPolling,
            TechniqueMetrics {
                request_count: 3,
                notification_count: 0,
                average_latency_ms: 450.5,
            },
        );
        assert_eq!(store.apply_snapshot(&snapshot), 1);

        let long = store.get(Technique::LongPolling);
        assert_eq!(long.request_count, 3);
        assert_eq!(long.notification_count, 0);
        assert_eq!(long.average_latency_ms, 450.5);
        // 스냅샷에 없는 기법은 그대로
        assert_eq!(store.get(Technique::ShortPolling).request_count, 1);
    }

    #[test]
    fn applying_same_snapshot_twice_is_idempotent() {
        let snapshot = MetricsSnapshot::new()
            .with(
                Technique::ShortPolling,
                TechniqueMetrics {
                    request_count: 10,
                    notification_count: 4,
                    average_latency_ms: 12.0,
                },
            )
            .with(Technique::PushChannel, TechniqueMetrics::zero());

        let mut store = MetricsStore::new();
        store.record_message(Technique::PushChannel);
        store.apply_snapshot(&snapshot);
        let once = store.clone();
        store.apply_snapshot(&snapshot);
        assert_eq!(store, once);
    }

    #[test]
    fn reset_zeroes_everything() {
        let mut store = MetricsStore::new();
        store.record_cycle(Technique::ShortPolling, 3, Duration::from_millis(5));
        store.record_message(Technique::PushChannel);
        store.reset();
        assert!(store.is_zero());
        assert_eq!(store.iter().count(), 3);
    }
}
