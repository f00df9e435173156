//! rtcompare 도메인 모델.
//!
//! 백엔드와 주고받는 데이터 구조체와 세션 상태 타입을 정의한다.
//! 와이어 포맷을 가진 모델은 `serde` Serialize/Deserialize를 구현한다.

pub mod metrics;
pub mod notification;
pub mod session;
