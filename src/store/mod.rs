/// 문서 저장소 추상화
/// 경매 / 입찰 / 채팅 문서와 계정 / 프로필 / 세션 문서를 다루는 두 개의 트레이트로 나눈다.
/// 여러 문서를 건드리는 연산(입찰, 종료, 연쇄 삭제, 가입)은 구현체에서 하나의 트랜잭션으로 처리한다.
// region:    --- Imports
use crate::auction::model::{Auction, AuctionStatus, Bid, ChatMessage, NewAuction, Review, ReviewSlot};
use crate::error::AppError;
use crate::identity::model::{Identity, NewAccount, Profile, Session};
use async_trait::async_trait;

// endregion: --- Imports

// region:    --- Modules
pub mod memory;
pub mod postgres;
mod queries;
#[cfg(test)]
pub(crate) mod testing;

pub use memory::MemoryStore;
pub use postgres::PostgresStore;

// endregion: --- Modules

// region:    --- Write Models
/// 입찰 쓰기 요청
#[derive(Debug, Clone)]
pub struct BidWrite {
    pub auction_id: String,
    pub auction_title: String,
    pub bidder_id: String,
    pub bidder_name: String,
    pub amount: i64,
}

/// 입찰 쓰기 결과
#[derive(Debug, Clone, PartialEq)]
pub enum BidOutcome {
    /// 입찰 문서 갱신 + 최저가 갱신 완료
    Placed(Bid),
    /// 저장된 최저가가 이미 입찰가 이하
    Rejected { current_lowest_bid: i64 },
    /// 종료 시각이 지났거나 종료 처리된 경매
    Closed,
    AuctionMissing,
}

/// 종료 전이 결과
#[derive(Debug, Clone, PartialEq)]
pub enum CompletionOutcome {
    /// 이번 호출로 종료됨. 낙찰자는 같은 쓰기 안에서 결정된다
    Completed { winner: Option<Bid> },
    /// 이미 종료되었거나 경매가 없음
    Skipped,
}

/// 연쇄 삭제 결과
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct DeleteSummary {
    pub bids: u64,
    pub messages: u64,
}

impl DeleteSummary {
    /// 경매 문서를 포함한 삭제 문서 수
    pub fn documents(&self) -> u64 {
        self.bids + self.messages + 1
    }
}

#[derive(Debug, Clone)]
pub struct MessageWrite {
    pub auction_id: String,
    pub text: String,
    pub sender_id: String,
    pub sender_name: String,
    pub sender_photo: Option<String>,
}

// endregion: --- Write Models

// region:    --- Auction Store
#[async_trait]
pub trait AuctionStore: Send + Sync {
    /// 생성/수정 시각은 저장소 시계로 기록
    async fn insert_auction(
        &self,
        input: NewAuction,
        status: AuctionStatus,
        created_by: &str,
    ) -> Result<Auction, AppError>;

    async fn get_auction(&self, auction_id: &str) -> Result<Option<Auction>, AppError>;

    /// 시작 시각 내림차순
    async fn list_auctions(&self) -> Result<Vec<Auction>, AppError>;

    /// 종료 시각이 지났지만 종료 처리되지 않은 경매 id
    async fn list_unsettled_ended(
        &self,
        now: chrono::DateTime<chrono::Utc>,
    ) -> Result<Vec<String>, AppError>;

    /// 입찰자 문서 upsert + 최저가 갱신을 하나의 원자적 쓰기로 처리.
    /// 저장된 최저가가 입찰가보다 클 때만 적용된다.
    async fn place_bid(&self, bid: BidWrite) -> Result<BidOutcome, AppError>;

    /// 입찰가 오름차순
    async fn bids_for_auction(&self, auction_id: &str) -> Result<Vec<Bid>, AppError>;

    async fn bid_for_bidder(
        &self,
        auction_id: &str,
        bidder_id: &str,
    ) -> Result<Option<Bid>, AppError>;

    /// 종료 전이. 낙찰자 선정과 상태 기록을 하나의 원자적 쓰기로 처리한다.
    /// 낙찰자가 있으면 해당 프로필의 낙찰 목록에 (중복 없이) 추가
    async fn complete_auction(&self, auction_id: &str) -> Result<CompletionOutcome, AppError>;

    /// 경매가 없으면 false
    async fn set_review(
        &self,
        auction_id: &str,
        slot: ReviewSlot,
        review: Review,
    ) -> Result<bool, AppError>;

    /// 입찰 / 메시지 / 경매를 하나의 배치로 삭제. 경매가 없으면 None
    async fn delete_auction_cascade(
        &self,
        auction_id: &str,
    ) -> Result<Option<DeleteSummary>, AppError>;

    /// 경매가 없으면 None (삭제와 겹친 쓰기는 남지 않는다)
    async fn insert_message(
        &self,
        message: MessageWrite,
    ) -> Result<Option<ChatMessage>, AppError>;

    /// 작성 시각 오름차순
    async fn list_messages(&self, auction_id: &str) -> Result<Vec<ChatMessage>, AppError>;
}

// endregion: --- Auction Store

// region:    --- Account Store
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// 계정과 프로필을 함께 기록. 이메일 중복이면 AuthError
    async fn create_account(&self, account: NewAccount) -> Result<Profile, AppError>;

    async fn find_identity(&self, email: &str) -> Result<Option<Identity>, AppError>;

    async fn get_profile(&self, user_id: &str) -> Result<Option<Profile>, AppError>;

    async fn list_profiles(&self) -> Result<Vec<Profile>, AppError>;

    async fn insert_session(&self, session: Session) -> Result<(), AppError>;

    async fn get_session(&self, token: &str) -> Result<Option<Session>, AppError>;

    /// 삭제된 세션 반환
    async fn delete_session(&self, token: &str) -> Result<Option<Session>, AppError>;
}

// endregion: --- Account Store

/// 이메일 정규화 (중복 가입 판정 기준)
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
