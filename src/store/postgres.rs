/// PostgreSQL 문서 저장소
// region:    --- Imports
use super::queries;
use super::{
    normalize_email, AccountStore, AuctionStore, BidOutcome, BidWrite, CompletionOutcome,
    DeleteSummary, MessageWrite,
};
use crate::auction::model::{
    Auction, AuctionStatus, Bid, ChatMessage, NewAuction, Review, ReviewSlot,
};
use crate::database::DatabaseManager;
use crate::error::AppError;
use crate::identity::model::{Identity, NewAccount, Profile, Role, Session};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

// endregion: --- Imports

// region:    --- Rows
#[derive(FromRow)]
struct AuctionRow {
    id: String,
    title: String,
    description: String,
    current_lowest_bid: i64,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    secret_key: Option<String>,
    status: String,
    winner_id: Option<String>,
    winner_review: Option<serde_json::Value>,
    admin_review: Option<serde_json::Value>,
    created_by: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<AuctionRow> for Auction {
    type Error = AppError;

    fn try_from(row: AuctionRow) -> Result<Self, Self::Error> {
        Ok(Auction {
            id: row.id,
            title: row.title,
            description: row.description,
            current_lowest_bid: row.current_lowest_bid,
            start_time: row.start_time,
            end_time: row.end_time,
            secret_key: row.secret_key,
            status: row.status.parse().map_err(AppError::Backend)?,
            winner_id: row.winner_id,
            winner_review: row.winner_review.map(serde_json::from_value).transpose()?,
            admin_review: row.admin_review.map(serde_json::from_value).transpose()?,
            created_by: row.created_by,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(FromRow)]
struct BidRow {
    id: String,
    auction_id: String,
    auction_title: String,
    bidder_id: String,
    bidder_name: String,
    amount: i64,
    bid_time: DateTime<Utc>,
}

impl From<BidRow> for Bid {
    fn from(row: BidRow) -> Self {
        Bid {
            id: row.id,
            auction_id: row.auction_id,
            auction_title: row.auction_title,
            bidder_id: row.bidder_id,
            bidder_name: row.bidder_name,
            amount: row.amount,
            timestamp: row.bid_time,
        }
    }
}

#[derive(FromRow)]
struct MessageRow {
    id: String,
    auction_id: String,
    text: String,
    sender_id: String,
    sender_name: String,
    sender_photo: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<MessageRow> for ChatMessage {
    fn from(row: MessageRow) -> Self {
        ChatMessage {
            id: row.id,
            auction_id: row.auction_id,
            text: row.text,
            sender_id: row.sender_id,
            sender_name: row.sender_name,
            sender_photo: row.sender_photo,
            timestamp: row.created_at,
        }
    }
}

#[derive(FromRow)]
struct ProfileRow {
    id: String,
    email: String,
    display_name: String,
    role: String,
    created_at: DateTime<Utc>,
    won_auctions: Vec<String>,
}

impl TryFrom<ProfileRow> for Profile {
    type Error = AppError;

    fn try_from(row: ProfileRow) -> Result<Self, Self::Error> {
        Ok(Profile {
            id: row.id,
            email: row.email,
            display_name: row.display_name,
            role: row.role.parse::<Role>().map_err(AppError::Backend)?,
            created_at: row.created_at,
            won_auctions: row.won_auctions,
        })
    }
}

#[derive(FromRow)]
struct IdentityRow {
    uid: String,
    email: String,
    password_hash: String,
}

#[derive(FromRow)]
struct SessionRow {
    token: String,
    user_id: String,
    email: String,
    display_name: String,
    role: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<SessionRow> for Session {
    type Error = AppError;

    fn try_from(row: SessionRow) -> Result<Self, Self::Error> {
        Ok(Session {
            token: row.token,
            user_id: row.user_id,
            email: row.email,
            display_name: row.display_name,
            role: row.role.parse::<Role>().map_err(AppError::Backend)?,
            created_at: row.created_at,
        })
    }
}

// endregion: --- Rows

// region:    --- Postgres Store
pub struct PostgresStore {
    db_manager: Arc<DatabaseManager>,
}

impl PostgresStore {
    pub fn new(db_manager: Arc<DatabaseManager>) -> Self {
        Self { db_manager }
    }
}

// endregion: --- Postgres Store

// region:    --- Auction Store
#[async_trait]
impl AuctionStore for PostgresStore {
    async fn insert_auction(
        &self,
        input: NewAuction,
        status: AuctionStatus,
        created_by: &str,
    ) -> Result<Auction, AppError> {
        info!("{:<12} --> 경매 생성: {}", "PgStore", input.title);
        let row = sqlx::query_as::<_, AuctionRow>(queries::INSERT_AUCTION)
            .bind(Uuid::new_v4().to_string())
            .bind(&input.title)
            .bind(&input.description)
            .bind(input.starting_bid)
            .bind(input.start_time)
            .bind(input.end_time)
            .bind(&input.secret_key)
            .bind(status.as_str())
            .bind(created_by)
            .fetch_one(self.db_manager.pool())
            .await?;
        row.try_into()
    }

    async fn get_auction(&self, auction_id: &str) -> Result<Option<Auction>, AppError> {
        sqlx::query_as::<_, AuctionRow>(queries::GET_AUCTION)
            .bind(auction_id)
            .fetch_optional(self.db_manager.pool())
            .await?
            .map(Auction::try_from)
            .transpose()
    }

    async fn list_auctions(&self) -> Result<Vec<Auction>, AppError> {
        sqlx::query_as::<_, AuctionRow>(queries::LIST_AUCTIONS)
            .fetch_all(self.db_manager.pool())
            .await?
            .into_iter()
            .map(Auction::try_from)
            .collect()
    }

    async fn list_unsettled_ended(&self, now: DateTime<Utc>) -> Result<Vec<String>, AppError> {
        Ok(sqlx::query_scalar::<_, String>(queries::LIST_UNSETTLED_ENDED)
            .bind(now)
            .fetch_all(self.db_manager.pool())
            .await?)
    }

    async fn place_bid(&self, bid: BidWrite) -> Result<BidOutcome, AppError> {
        self.db_manager
            .transaction::<_, _, AppError>(move |tx| {
                Box::pin(async move {
                    // 최저가 조건부 갱신이 실패하면 아무것도 쓰지 않는다
                    let lowered = sqlx::query_scalar::<_, i64>(queries::LOWER_CURRENT_BID)
                        .bind(bid.amount)
                        .bind(&bid.auction_id)
                        .fetch_optional(&mut **tx)
                        .await?;

                    if lowered.is_none() {
                        let state = sqlx::query_as::<_, (i64, bool)>(queries::GET_BID_STATE)
                            .bind(&bid.auction_id)
                            .fetch_optional(&mut **tx)
                            .await?;
                        debug!("{:<12} --> 입찰 거절: {:?}", "PgStore", state);
                        return Ok(match state {
                            Some((_, true)) => BidOutcome::Closed,
                            Some((current_lowest_bid, false)) => {
                                BidOutcome::Rejected { current_lowest_bid }
                            }
                            None => BidOutcome::AuctionMissing,
                        });
                    }

                    let row = sqlx::query_as::<_, BidRow>(queries::UPSERT_BID)
                        .bind(Uuid::new_v4().to_string())
                        .bind(&bid.auction_id)
                        .bind(&bid.auction_title)
                        .bind(&bid.bidder_id)
                        .bind(&bid.bidder_name)
                        .bind(bid.amount)
                        .fetch_one(&mut **tx)
                        .await?;
                    Ok(BidOutcome::Placed(row.into()))
                })
            })
            .await
    }

    async fn bids_for_auction(&self, auction_id: &str) -> Result<Vec<Bid>, AppError> {
        Ok(sqlx::query_as::<_, BidRow>(queries::GET_AUCTION_BIDS)
            .bind(auction_id)
            .fetch_all(self.db_manager.pool())
            .await?
            .into_iter()
            .map(Bid::from)
            .collect())
    }

    async fn bid_for_bidder(
        &self,
        auction_id: &str,
        bidder_id: &str,
    ) -> Result<Option<Bid>, AppError> {
        Ok(sqlx::query_as::<_, BidRow>(queries::GET_BIDDER_BID)
            .bind(auction_id)
            .bind(bidder_id)
            .fetch_optional(self.db_manager.pool())
            .await?
            .map(Bid::from))
    }

    async fn complete_auction(&self, auction_id: &str) -> Result<CompletionOutcome, AppError> {
        let auction_id = auction_id.to_string();
        self.db_manager
            .transaction::<_, _, AppError>(move |tx| {
                Box::pin(async move {
                    // 행 잠금 이후에는 새 입찰이 최저가를 바꿀 수 없다
                    let status = sqlx::query_scalar::<_, String>(queries::LOCK_AUCTION_STATUS)
                        .bind(&auction_id)
                        .fetch_optional(&mut **tx)
                        .await?;
                    match status.as_deref() {
                        None | Some("COMPLETED") => return Ok(CompletionOutcome::Skipped),
                        Some(_) => {}
                    }

                    let winner = sqlx::query_as::<_, BidRow>(queries::GET_WINNING_BID)
                        .bind(&auction_id)
                        .fetch_optional(&mut **tx)
                        .await?
                        .map(Bid::from);
                    let winner_id = winner.as_ref().map(|bid| bid.bidder_id.clone());

                    let completed = sqlx::query_scalar::<_, String>(queries::COMPLETE_AUCTION)
                        .bind(&auction_id)
                        .bind(&winner_id)
                        .fetch_optional(&mut **tx)
                        .await?;
                    if completed.is_none() {
                        return Ok(CompletionOutcome::Skipped);
                    }

                    if let Some(winner_id) = &winner_id {
                        sqlx::query(queries::APPEND_WON_AUCTION)
                            .bind(&auction_id)
                            .bind(winner_id)
                            .execute(&mut **tx)
                            .await?;
                    }
                    Ok(CompletionOutcome::Completed { winner })
                })
            })
            .await
    }

    async fn set_review(
        &self,
        auction_id: &str,
        slot: ReviewSlot,
        review: Review,
    ) -> Result<bool, AppError> {
        let sql = match slot {
            ReviewSlot::WinnerReview => queries::SET_WINNER_REVIEW,
            ReviewSlot::AdminReview => queries::SET_ADMIN_REVIEW,
        };
        let result = sqlx::query(sql)
            .bind(auction_id)
            .bind(serde_json::to_value(&review)?)
            .execute(self.db_manager.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_auction_cascade(
        &self,
        auction_id: &str,
    ) -> Result<Option<DeleteSummary>, AppError> {
        let auction_id = auction_id.to_string();
        self.db_manager
            .transaction::<_, _, AppError>(move |tx| {
                Box::pin(async move {
                    let exists = sqlx::query_scalar::<_, String>(queries::LOCK_AUCTION)
                        .bind(&auction_id)
                        .fetch_optional(&mut **tx)
                        .await?;
                    if exists.is_none() {
                        return Ok(None);
                    }

                    let bids = sqlx::query(queries::DELETE_AUCTION_BIDS)
                        .bind(&auction_id)
                        .execute(&mut **tx)
                        .await?
                        .rows_affected();
                    let messages = sqlx::query(queries::DELETE_AUCTION_MESSAGES)
                        .bind(&auction_id)
                        .execute(&mut **tx)
                        .await?
                        .rows_affected();
                    sqlx::query(queries::DELETE_AUCTION)
                        .bind(&auction_id)
                        .execute(&mut **tx)
                        .await?;

                    Ok(Some(DeleteSummary { bids, messages }))
                })
            })
            .await
    }

    async fn insert_message(
        &self,
        message: MessageWrite,
    ) -> Result<Option<ChatMessage>, AppError> {
        self.db_manager
            .transaction::<_, _, AppError>(move |tx| {
                Box::pin(async move {
                    // 공유 잠금: 연쇄 삭제(FOR UPDATE)는 이 쓰기가 커밋될 때까지 기다린다
                    let exists = sqlx::query_scalar::<_, String>(queries::SHARE_LOCK_AUCTION)
                        .bind(&message.auction_id)
                        .fetch_optional(&mut **tx)
                        .await?;
                    if exists.is_none() {
                        debug!(
                            "{:<12} --> 메시지 거절: 없는 경매 {}",
                            "PgStore", message.auction_id
                        );
                        return Ok(None);
                    }

                    let row = sqlx::query_as::<_, MessageRow>(queries::INSERT_MESSAGE)
                        .bind(Uuid::new_v4().to_string())
                        .bind(&message.auction_id)
                        .bind(&message.text)
                        .bind(&message.sender_id)
                        .bind(&message.sender_name)
                        .bind(&message.sender_photo)
                        .fetch_one(&mut **tx)
                        .await?;
                    Ok(Some(ChatMessage::from(row)))
                })
            })
            .await
    }

    async fn list_messages(&self, auction_id: &str) -> Result<Vec<ChatMessage>, AppError> {
        Ok(sqlx::query_as::<_, MessageRow>(queries::LIST_MESSAGES)
            .bind(auction_id)
            .fetch_all(self.db_manager.pool())
            .await?
            .into_iter()
            .map(ChatMessage::from)
            .collect())
    }
}

// endregion: --- Auction Store

// region:    --- Account Store
#[async_trait]
impl AccountStore for PostgresStore {
    async fn create_account(&self, account: NewAccount) -> Result<Profile, AppError> {
        let email = normalize_email(&account.email);
        self.db_manager
            .transaction::<_, _, AppError>(move |tx| {
                Box::pin(async move {
                    let inserted = sqlx::query_scalar::<_, String>(queries::INSERT_IDENTITY)
                        .bind(&account.uid)
                        .bind(&email)
                        .bind(&account.password_hash)
                        .fetch_optional(&mut **tx)
                        .await?;
                    if inserted.is_none() {
                        return Err(AppError::auth("이미 가입된 이메일입니다."));
                    }

                    let row = sqlx::query_as::<_, ProfileRow>(queries::INSERT_PROFILE)
                        .bind(&account.uid)
                        .bind(&email)
                        .bind(&account.display_name)
                        .bind(account.role.as_str())
                        .fetch_one(&mut **tx)
                        .await?;
                    Profile::try_from(row)
                })
            })
            .await
    }

    async fn find_identity(&self, email: &str) -> Result<Option<Identity>, AppError> {
        Ok(sqlx::query_as::<_, IdentityRow>(queries::FIND_IDENTITY)
            .bind(normalize_email(email))
            .fetch_optional(self.db_manager.pool())
            .await?
            .map(|row| Identity {
                uid: row.uid,
                email: row.email,
                password_hash: row.password_hash,
            }))
    }

    async fn get_profile(&self, user_id: &str) -> Result<Option<Profile>, AppError> {
        sqlx::query_as::<_, ProfileRow>(queries::GET_PROFILE)
            .bind(user_id)
            .fetch_optional(self.db_manager.pool())
            .await?
            .map(Profile::try_from)
            .transpose()
    }

    async fn list_profiles(&self) -> Result<Vec<Profile>, AppError> {
        sqlx::query_as::<_, ProfileRow>(queries::LIST_PROFILES)
            .fetch_all(self.db_manager.pool())
            .await?
            .into_iter()
            .map(Profile::try_from)
            .collect()
    }

    async fn insert_session(&self, session: Session) -> Result<(), AppError> {
        sqlx::query(queries::INSERT_SESSION)
            .bind(&session.token)
            .bind(&session.user_id)
            .bind(&session.email)
            .bind(&session.display_name)
            .bind(session.role.as_str())
            .bind(session.created_at)
            .execute(self.db_manager.pool())
            .await?;
        Ok(())
    }

    async fn get_session(&self, token: &str) -> Result<Option<Session>, AppError> {
        sqlx::query_as::<_, SessionRow>(queries::GET_SESSION)
            .bind(token)
            .fetch_optional(self.db_manager.pool())
            .await?
            .map(Session::try_from)
            .transpose()
    }

    async fn delete_session(&self, token: &str) -> Result<Option<Session>, AppError> {
        sqlx::query_as::<_, SessionRow>(queries::DELETE_SESSION)
            .bind(token)
            .fetch_optional(self.db_manager.pool())
            .await?
            .map(Session::try_from)
            .transpose()
    }
}

// endregion: --- Account Store
