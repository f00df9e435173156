//! 알림 로그.
//!
//! 세 기법이 관찰한 알림을 최신순으로 보관하는 고정 용량 로그 (메모리 전용).
//! 용량을 넘으면 가장 오래된 항목부터 밀려난다.

use rtcompare_core::models::notification::LoggedNotification;
use std::collections::VecDeque;

/// 기본 보관 용량
pub const DEFAULT_CAPACITY: usize = 20;

/// 최신순 알림 로그
#[derive(Debug, Clone)]
pub struct NotificationLog {
    /// 앞쪽이 최신
    entries: VecDeque<LoggedNotification>,
    capacity: usize,
}

impl NotificationLog {
    /// 새 로그 생성 (용량 최소 1)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// 항목 추가: 가득 찼으면 가장 오래된 항목을 제거하고 반환
    pub fn push(&mut self, entry: LoggedNotification) -> Option<LoggedNotification> {
        self.entries.push_front(entry);
        if self.entries.len() > self.capacity {
            self.entries.pop_back()
        } else {
            None
        }
    }

    /// 최신순 순회
    pub fn iter(&self) -> impl Iterator<Item = &LoggedNotification> {
        self.entries.iter()
    }

    /// 가장 최근 항목
    pub fn latest(&self) -> Option<&LoggedNotification> {
        self.entries.front()
    }

    /// 최신순 복제본
    pub fn to_vec(&self) -> Vec<LoggedNotification> {
        self.entries.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// 로그 비우기
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl Default for NotificationLog {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
