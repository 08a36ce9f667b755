// region:    --- Imports
use std::env;
use std::fmt::Display;
use std::str::FromStr;
use tracing::{info, warn};

// endregion: --- Imports

/// 관리자 계정으로 지정되는 기본 이메일
pub const DEFAULT_ADMIN_EMAIL: &str = "admin@auction.local";

// region:    --- Config
/// 환경 변수 기반 서비스 설정
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    /// 설정되지 않으면 인메모리 저장소를 사용
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    /// 설정되지 않으면 Kafka 변경 중계를 끈다
    pub kafka_brokers: Option<String>,
    pub admin_email: String,
    pub image_gen_url: Option<String>,
    pub image_gen_api_key: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 3000,
            database_url: None,
            database_max_connections: 5,
            kafka_brokers: None,
            admin_email: DEFAULT_ADMIN_EMAIL.to_string(),
            image_gen_url: None,
            image_gen_api_key: None,
        }
    }
}

impl Config {
    /// 환경 변수에서 설정 로드
    pub fn load() -> Self {
        let defaults = Self::default();
        Self {
            port: try_load("PORT", defaults.port),
            database_url: optional("DATABASE_URL"),
            database_max_connections: try_load(
                "DATABASE_MAX_CONNECTIONS",
                defaults.database_max_connections,
            ),
            kafka_brokers: optional("KAFKA_BROKERS"),
            admin_email: try_load("ADMIN_EMAIL", defaults.admin_email),
            image_gen_url: optional("IMAGE_GEN_URL"),
            image_gen_api_key: optional("IMAGE_GEN_API_KEY"),
        }
    }
}

// endregion: --- Config

// region:    --- Helpers
fn optional(key: &str) -> Option<String> {
    match env::var(key) {
        Ok(value) if !value.trim().is_empty() => Some(value),
        _ => {
            info!("{:<12} --> {key} 미설정", "Config");
            None
        }
    }
}

fn try_load<T>(key: &str, default: T) -> T
where
    T: FromStr + Display,
    T::Err: Display,
{
    match env::var(key) {
        Ok(raw) => raw.parse().unwrap_or_else(|e| {
            warn!("{:<12} --> 잘못된 {key} 값({e}), 기본값 사용: {default}", "Config");
            default
        }),
        Err(_) => {
            info!("{:<12} --> {key} 미설정, 기본값 사용: {default}", "Config");
            default
        }
    }
}

// endregion: --- Helpers
