//! # rtcompare-dashboard
//!
//! 숏 폴링, 롱 폴링, 푸시 채널을 동시에 실행하며 기법별 메트릭을 집계한다.
//! 세션이 낙관적으로 기록한 로컬 값은 주기적으로 조회한 백엔드 권위 값으로 덮어쓴다.
//!
//! ## 구조
//!
//! - [`metrics_store`]: 기법별 카운터와 병합 연산
//! - [`notification_log`]: 최신순 고정 용량 알림 로그
//! - [`state`]: 공유 대시보드 상태 (`Arc`로 주입)
//! - [`session`]: 기법별 세션 (상태 머신 + I/O 루프)
//! - [`reconciler`]: 권위 메트릭 재조정
//! - [`coordinator`]: 전체 시작/중지/리셋 및 표시용 뷰

pub mod coordinator;
pub mod metrics_store;
pub mod notification_log;
pub mod reconciler;
pub mod session;
pub mod state;
pub mod view;

#[cfg(test)]
pub(crate) mod test_support;
