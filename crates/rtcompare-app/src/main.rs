//! # rtcompare-app
//!
//! rtcompare 바이너리 진입점.
//! 설정 로드, 어댑터 와이어링, 코디네이터/재조정기/리포터 실행, 라이프사이클 관리.

mod lifecycle;
mod reporter;

use anyhow::{anyhow, Result};
use clap::Parser;
use rtcompare_core::config::AppConfig;
use rtcompare_core::config_manager::{ConfigManager, ConfigOverrides};
use rtcompare_core::ports::dashboard_api::DashboardApi;
use rtcompare_core::ports::push_transport::PushTransport;
use rtcompare_dashboard::coordinator::DashboardCoordinator;
use rtcompare_network::http_client::HttpDashboardApi;
use rtcompare_network::ws_client::StompPushClient;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::lifecycle::LifecycleManager;
use crate::reporter::{ReportFormat, Reporter};

/// 실시간 전달 기법 비교 하니스
///
/// 숏 폴링, 롱 폴링, 푸시 채널을 같은 백엔드에 동시에 붙여 메트릭을 비교한다.
#[derive(Parser, Debug)]
#[command(name = "rtcompare")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// 백엔드 URL (기본: 설정 파일 값, 없으면 http://localhost:8080)
    #[arg(long, short = 's')]
    server: Option<String>,

    /// 숏 폴링 주기 (밀리초)
    #[arg(long)]
    short_interval: Option<u64>,

    /// 설정 파일 경로 (기본: 플랫폼 설정 디렉토리의 config.json)
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// 로그 레벨 (trace, debug, info, warn, error)
    #[arg(long, short = 'l', default_value = "info")]
    log_level: String,

    /// 시작하자마자 세 기법 모두 실행
    #[arg(long)]
    start_all: bool,

    /// 시작 전에 백엔드와 로컬 카운터 리셋
    #[arg(long)]
    reset: bool,

    /// 리포트 출력 주기 (초)
    #[arg(long, default_value = "5")]
    report_interval: u64,

    /// 리포트를 JSON으로 출력
    #[arg(long)]
    json: bool,
}

/// 설정 로드 + CLI 오버라이드
///
/// `--config`를 지정했는데 읽지 못하면 에러. 기본 경로 실패는 기본 설정으로 대체한다.
/// CLI 오버라이드는 설정 파일에 기록하지 않는다.
fn load_config(args: &Args) -> Result<AppConfig> {
    let overrides = ConfigOverrides {
        base_url: args.server.clone(),
        short_interval_ms: args.short_interval,
    };

    let manager = match &args.config {
        Some(path) => Some(
            ConfigManager::with_path(path.clone())
                .map_err(|e| anyhow!("설정 파일 로드 실패: {e}"))?,
        ),
        None => ConfigManager::new()
            .map_err(|e| warn!("설정 관리자 초기화 실패, 기본 설정 사용: {e}"))
            .ok(),
    };

    let stored = match manager {
        Some(manager) => {
            info!("설정 파일: {}", manager.config_path().display());
            manager.get()
        }
        None => AppConfig::default_config(),
    };
    overrides
        .apply(stored)
        .map_err(|e| anyhow!("설정 검증 실패: {e}"))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // tracing 초기화
    let log_filter = format!(
        "rtcompare={},rtcompare_app={},rtcompare_core={},rtcompare_network={},rtcompare_dashboard={}",
        args.log_level, args.log_level, args.log_level, args.log_level, args.log_level
    );
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_filter)),
        )
        .init();

    info!("rtcompare 시작");

    let config = load_config(&args)?;
    info!(
        "서버: {} (숏 폴링 {}ms, 재조정 {}ms)",
        config.server.base_url, config.short_polling.interval_ms, config.reconciler.interval_ms
    );

    // ── 어댑터 생성 (DI 와이어링) ──
    let api: Arc<dyn DashboardApi> = Arc::new(
        HttpDashboardApi::new(&config.server.base_url, config.request_timeout())
            .map_err(|e| anyhow!("HTTP 클라이언트 생성 실패: {e}"))?,
    );
    let transport: Arc<dyn PushTransport> = Arc::new(
        StompPushClient::new(&config.server.base_url, &config.server.push_path)
            .map_err(|e| anyhow!("푸시 클라이언트 생성 실패: {e}"))?,
    );
    let coordinator = Arc::new(DashboardCoordinator::new(api, transport, &config));
    let lifecycle = Arc::new(LifecycleManager::new());

    // ── 초기화 ──
    if args.reset {
        coordinator.reset_all().await;
    }
    coordinator.initialize().await;
    coordinator.start_reconciler();

    if args.start_all {
        for (technique, e) in coordinator.start_all().await {
            error!("{technique} 시작 실패: {e}");
        }
    }

    // ── 리포터 ──
    let format = if args.json {
        ReportFormat::Json
    } else {
        ReportFormat::Text
    };
    let reporter = Reporter::new(
        coordinator.clone(),
        Duration::from_secs(args.report_interval.max(1)),
        format,
    );
    let report_shutdown_rx = lifecycle.subscribe();
    let report_task = tokio::spawn(async move {
        reporter.run(report_shutdown_rx).await;
    });

    info!("rtcompare 실행 중 (Ctrl+C로 종료)");

    // OS 시그널 대기
    lifecycle.wait_for_signal().await;

    coordinator.shutdown().await;
    if let Err(e) = report_task.await {
        warn!("리포터 태스크 종료 에러: {e}");
    }

    info!("rtcompare 종료");
    Ok(())
}
