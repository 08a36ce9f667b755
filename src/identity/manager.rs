/// 인증 / 세션 관리
/// 1. 가입
/// 2. 로그인
/// 3. 로그아웃
/// 4. 세션 / 프로필 조회
// region:    --- Imports
use super::model::{NewAccount, Profile, Role, Session, SessionEvent};
use super::password::{hash_password, verify_password};
use crate::error::AppError;
use crate::store::AccountStore;
use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{info, warn};
use uuid::Uuid;

// endregion: --- Imports

const MIN_PASSWORD_LEN: usize = 6;

// region:    --- Commands
/// 가입 명령
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignUpCommand {
    pub email: String,
    pub password: String,
    pub display_name: String,
}

/// 로그인 명령
#[derive(Debug, Clone, Deserialize)]
pub struct SignInCommand {
    pub email: String,
    pub password: String,
}

// endregion: --- Commands

// region:    --- Identity Manager
pub struct IdentityManager {
    store: Arc<dyn AccountStore>,
    admin_email: String,
    events: broadcast::Sender<SessionEvent>,
}

impl IdentityManager {
    pub fn new(store: Arc<dyn AccountStore>, admin_email: impl Into<String>) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            store,
            admin_email: admin_email.into(),
            events,
        }
    }

    /// 로그인/로그아웃 알림 구독
    pub fn subscribe_sessions(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// 1. 가입
    pub async fn sign_up(&self, cmd: SignUpCommand) -> Result<Session, AppError> {
        info!("{:<12} --> 가입 요청: {}", "Identity", cmd.email);
        validate_email(&cmd.email)?;
        if cmd.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AppError::validation(format!(
                "비밀번호는 {MIN_PASSWORD_LEN}자 이상이어야 합니다."
            )));
        }
        let display_name = cmd.display_name.trim().to_string();
        if display_name.is_empty() {
            return Err(AppError::validation("표시 이름을 입력해 주세요."));
        }

        let password = cmd.password;
        let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
            .await
            .map_err(|e| AppError::Backend(e.to_string()))??;

        let role = Role::for_email(&cmd.email, &self.admin_email);
        let profile = self
            .store
            .create_account(NewAccount {
                uid: Uuid::new_v4().to_string(),
                email: cmd.email,
                password_hash,
                display_name,
                role,
            })
            .await?;
        info!(
            "{:<12} --> 가입 완료: id={}, role={}",
            "Identity", profile.id, profile.role
        );

        self.open_session(profile).await
    }

    /// 2. 로그인
    pub async fn sign_in(&self, cmd: SignInCommand) -> Result<Session, AppError> {
        info!("{:<12} --> 로그인 요청: {}", "Identity", cmd.email);
        let invalid = || AppError::auth("이메일 또는 비밀번호가 올바르지 않습니다.");

        let identity = self
            .store
            .find_identity(&cmd.email)
            .await?
            .ok_or_else(invalid)?;

        let password = cmd.password;
        let hash = identity.password_hash.clone();
        let verified = tokio::task::spawn_blocking(move || verify_password(&password, &hash))
            .await
            .map_err(|e| AppError::Backend(e.to_string()))?;
        if !verified {
            warn!("{:<12} --> 비밀번호 불일치: {}", "Identity", cmd.email);
            return Err(invalid());
        }

        // 역할은 세션 생성 시점에 프로필에서 한 번만 읽는다
        let profile = self
            .store
            .get_profile(&identity.uid)
            .await?
            .ok_or_else(|| AppError::auth("프로필이 존재하지 않습니다."))?;

        self.open_session(profile).await
    }

    /// 3. 로그아웃 (없는 토큰은 무시)
    pub async fn sign_out(&self, token: &str) -> Result<(), AppError> {
        if let Some(session) = self.store.delete_session(token).await? {
            info!("{:<12} --> 로그아웃: {}", "Identity", session.user_id);
            let _ = self.events.send(SessionEvent::SignedOut {
                user_id: session.user_id,
            });
        }
        Ok(())
    }

    /// 4. 세션 조회
    pub async fn current_session(&self, token: &str) -> Result<Option<Session>, AppError> {
        self.store.get_session(token).await
    }

    pub async fn get_user_profile(&self, user_id: &str) -> Result<Option<Profile>, AppError> {
        self.store.get_profile(user_id).await
    }

    /// 관리자 사용자 목록
    pub async fn list_profiles(&self, actor: &Session) -> Result<Vec<Profile>, AppError> {
        match actor.role {
            Role::Admin => self.store.list_profiles().await,
            Role::User => Err(AppError::forbidden("관리자만 사용자 목록을 볼 수 있습니다.")),
        }
    }

    async fn open_session(&self, profile: Profile) -> Result<Session, AppError> {
        let session = Session {
            token: Uuid::new_v4().to_string(),
            user_id: profile.id,
            email: profile.email,
            display_name: profile.display_name,
            role: profile.role,
            created_at: Utc::now(),
        };
        self.store.insert_session(session.clone()).await?;
        let _ = self.events.send(SessionEvent::SignedIn {
            user_id: session.user_id.clone(),
            role: session.role,
        });
        Ok(session)
    }
}

fn validate_email(email: &str) -> Result<(), AppError> {
    let email = email.trim();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(()),
        _ => Err(AppError::validation("올바른 이메일 주소가 아닙니다.")),
    }
}

// endregion: --- Identity Manager

// region:    --- Tests
#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_ADMIN_EMAIL;
    use crate::store::MemoryStore;

    fn manager() -> IdentityManager {
        IdentityManager::new(Arc::new(MemoryStore::new()), DEFAULT_ADMIN_EMAIL)
    }

    fn sign_up(email: &str) -> SignUpCommand {
        SignUpCommand {
            email: email.to_string(),
            password: "password1".to_string(),
            display_name: "테스터".to_string(),
        }
    }

    #[tokio::test]
    async fn test_sign_up_assigns_role_by_email() {
        let identity = manager();

        let admin = identity.sign_up(sign_up(DEFAULT_ADMIN_EMAIL)).await.unwrap();
        assert_eq!(admin.role, Role::Admin);
        assert!(admin.is_admin());

        let user = identity.sign_up(sign_up("user@auction.local")).await.unwrap();
        assert_eq!(user.role, Role::User);

        let profile = identity
            .get_user_profile(&user.user_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(profile.display_name, "테스터");
        assert!(profile.won_auctions.is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_sign_up_is_auth_error() {
        let identity = manager();
        identity.sign_up(sign_up("dup@auction.local")).await.unwrap();
        let err = identity
            .sign_up(sign_up("DUP@auction.local"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Auth(_)));
    }

    #[tokio::test]
    async fn test_sign_up_validation() {
        let identity = manager();
        let err = identity.sign_up(sign_up("not-an-email")).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let err = identity
            .sign_up(SignUpCommand {
                password: "123".to_string(),
                ..sign_up("short@auction.local")
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_sign_in_and_out() {
        let identity = manager();
        let mut events = identity.subscribe_sessions();
        identity.sign_up(sign_up("login@auction.local")).await.unwrap();

        let err = identity
            .sign_in(SignInCommand {
                email: "login@auction.local".to_string(),
                password: "wrong-password".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Auth(_)));

        let err = identity
            .sign_in(SignInCommand {
                email: "nobody@auction.local".to_string(),
                password: "password1".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Auth(_)));

        let session = identity
            .sign_in(SignInCommand {
                email: "login@auction.local".to_string(),
                password: "password1".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(
            identity.current_session(&session.token).await.unwrap(),
            Some(session.clone())
        );

        identity.sign_out(&session.token).await.unwrap();
        assert!(identity
            .current_session(&session.token)
            .await
            .unwrap()
            .is_none());
        identity.sign_out(&session.token).await.unwrap();

        // 가입 / 로그인 / 로그아웃 순서로 알림
        assert!(matches!(
            events.recv().await.unwrap(),
            SessionEvent::SignedIn { .. }
        ));
        assert!(matches!(
            events.recv().await.unwrap(),
            SessionEvent::SignedIn { .. }
        ));
        assert_eq!(
            events.recv().await.unwrap(),
            SessionEvent::SignedOut {
                user_id: session.user_id.clone()
            }
        );
    }

    #[tokio::test]
    async fn test_only_admin_lists_profiles() {
        let identity = manager();
        let admin = identity.sign_up(sign_up(DEFAULT_ADMIN_EMAIL)).await.unwrap();
        let user = identity.sign_up(sign_up("user@auction.local")).await.unwrap();

        assert_eq!(identity.list_profiles(&admin).await.unwrap().len(), 2);
        assert!(matches!(
            identity.list_profiles(&user).await.unwrap_err(),
            AppError::Forbidden(_)
        ));
    }
}

// endregion: --- Tests
