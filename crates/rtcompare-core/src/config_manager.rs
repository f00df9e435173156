//! 설정 파일 관리.
//!
//! 파일에 저장된 기본값 위에 실행 단위 오버라이드(CLI)를 얹어 유효 설정을 만든다.
//! 오버라이드는 파일에 기록하지 않는다.

use crate::config::AppConfig;
use crate::error::CoreError;
use directories::ProjectDirs;
use parking_lot::RwLock;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const CONFIG_FILE_NAME: &str = "config.json";

/// 저장 시 먼저 쓰는 임시 파일 확장자
const TEMP_EXTENSION: &str = "json.tmp";

/// 실행 단위 설정 오버라이드
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    /// 백엔드 기본 URL
    pub base_url: Option<String>,
    /// 숏 폴링 주기 (밀리초)
    pub short_interval_ms: Option<u64>,
}

impl ConfigOverrides {
    pub fn is_empty(&self) -> bool {
        self.base_url.is_none() && self.short_interval_ms.is_none()
    }

    /// 설정에 오버라이드를 적용하고 검증
    pub fn apply(&self, mut config: AppConfig) -> Result<AppConfig, CoreError> {
        if let Some(url) = &self.base_url {
            config.server.base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(interval) = self.short_interval_ms {
            config.short_polling.interval_ms = interval;
        }
        config.validate()?;
        if !self.is_empty() {
            debug!("설정 오버라이드 적용: {self:?}");
        }
        Ok(config)
    }
}

/// 설정 관리자
#[derive(Debug)]
pub struct ConfigManager {
    stored: RwLock<AppConfig>,
    path: PathBuf,
}

impl ConfigManager {
    /// 플랫폼 기본 경로로 생성. 파일이 없으면 기본 설정을 기록한다.
    pub fn new() -> Result<Self, CoreError> {
        Self::with_path(Self::default_path()?)
    }

    /// 지정 경로로 생성
    pub fn with_path(path: PathBuf) -> Result<Self, CoreError> {
        let stored = if path.exists() {
            let config = read_config(&path)?;
            config.validate()?;
            config
        } else {
            let config = AppConfig::default_config();
            write_config(&path, &config)?;
            info!("기본 설정 파일 생성: {}", path.display());
            config
        };

        Ok(Self {
            stored: RwLock::new(stored),
            path,
        })
    }

    /// 플랫폼 설정 디렉토리의 `config.json`
    ///
    /// - Linux: `~/.config/rtcompare/config.json`
    /// - macOS: `~/Library/Application Support/dev.rtcompare.rtcompare/config.json`
    pub fn default_path() -> Result<PathBuf, CoreError> {
        ProjectDirs::from("dev", "rtcompare", "rtcompare")
            .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
            .ok_or_else(|| CoreError::Config("홈 디렉토리를 찾을 수 없습니다".to_string()))
    }

    pub fn config_path(&self) -> &Path {
        &self.path
    }

    /// 파일에 저장된 설정 (복제본)
    pub fn get(&self) -> AppConfig {
        self.stored.read().clone()
    }

    /// 저장된 설정을 수정하고 파일에 기록
    ///
    /// 검증이나 기록에 실패하면 메모리 값도 바뀌지 않는다.
    pub fn update_with<F>(&self, updater: F) -> Result<AppConfig, CoreError>
    where
        F: FnOnce(&mut AppConfig),
    {
        let mut stored = self.stored.write();
        let mut next = stored.clone();
        updater(&mut next);
        next.validate()?;
        write_config(&self.path, &next)?;
        *stored = next.clone();
        debug!("설정 저장: {}", self.path.display());
        Ok(next)
    }
}

fn read_config(path: &Path) -> Result<AppConfig, CoreError> {
    let content = fs::read_to_string(path)
        .map_err(|e| CoreError::Config(format!("설정 파일 읽기 실패: {}: {e}", path.display())))?;
    serde_json::from_str(&content)
        .map_err(|e| CoreError::Config(format!("설정 파일 파싱 실패: {}: {e}", path.display())))
}

/// 임시 파일에 쓴 뒤 rename: 중간에 실패해도 기존 파일은 온전하다
fn write_config(path: &Path, config: &AppConfig) -> Result<(), CoreError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| {
            CoreError::Config(format!("설정 디렉토리 생성 실패: {}: {e}", parent.display()))
        })?;
    }

    let temp = path.with_extension(TEMP_EXTENSION);
    let content = serde_json::to_string_pretty(config)?;
    fs::write(&temp, content)
        .and_then(|()| fs::rename(&temp, path))
        .map_err(|e| CoreError::Config(format!("설정 파일 저장 실패: {}: {e}", path.display())))
}
