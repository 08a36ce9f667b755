use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// region:    --- Role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    /// 지정된 관리자 이메일이면 관리자, 그 외는 일반 사용자
    pub fn for_email(email: &str, admin_email: &str) -> Self {
        if email.trim().eq_ignore_ascii_case(admin_email.trim()) {
            Role::Admin
        } else {
            Role::User
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            other => Err(format!("알 수 없는 역할: {other}")),
        }
    }
}

// endregion: --- Role

// region:    --- Profile
/// 사용자 프로필 문서
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: String,
    pub email: String,
    pub display_name: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub won_auctions: Vec<String>,
}

/// 인증 제공자에 저장되는 계정 정보
#[derive(Debug, Clone)]
pub struct Identity {
    pub uid: String,
    pub email: String,
    pub password_hash: String,
}

/// 가입 시 함께 기록되는 계정 + 프로필
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub uid: String,
    pub email: String,
    pub password_hash: String,
    pub display_name: String,
    pub role: Role,
}

// endregion: --- Profile

// region:    --- Session
/// 인증된 세션. 역할은 로그인 시점에 한 번 조회해 보관
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub token: String,
    pub user_id: String,
    pub email: String,
    pub display_name: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl Session {
    pub fn is_admin(&self) -> bool {
        match self.role {
            Role::Admin => true,
            Role::User => false,
        }
    }
}

/// 로그인/로그아웃 알림
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    SignedIn { user_id: String, role: Role },
    SignedOut { user_id: String },
}

// endregion: --- Session


// endregion: --- Tests
