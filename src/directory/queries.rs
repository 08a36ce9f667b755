/// 경매 조회
/// 읽기 경로는 항상 현재 시각 기준으로 상태를 다시 계산한다.
// region:    --- Imports
use super::AuctionDirectory;
use crate::auction::model::{Auction, Bid, ChatMessage, Review};
use crate::error::AppError;
use crate::store::AuctionStore;
use chrono::{DateTime, Utc};
use tracing::info;

// endregion: --- Imports

/// 시작 시각 내림차순 + 상태 재계산
pub(crate) async fn load_auctions(
    store: &dyn AuctionStore,
    now: DateTime<Utc>,
) -> Result<Vec<Auction>, AppError> {
    let mut auctions: Vec<Auction> = store
        .list_auctions()
        .await?
        .into_iter()
        .map(|auction| auction.with_derived_status(now))
        .collect();
    auctions.sort_by(|a, b| b.start_time.cmp(&a.start_time));
    Ok(auctions)
}

// region:    --- Query Handlers
impl AuctionDirectory {
    /// 모든 경매 조회
    pub async fn list_auctions(&self) -> Result<Vec<Auction>, AppError> {
        info!("{:<12} --> 모든 경매 조회", "Query");
        load_auctions(&*self.store, Utc::now()).await
    }

    /// 경매 조회 (없으면 None)
    pub async fn get_auction_by_id(&self, auction_id: &str) -> Result<Option<Auction>, AppError> {
        info!("{:<12} --> 경매 조회 id: {}", "Query", auction_id);
        Ok(self
            .store
            .get_auction(auction_id)
            .await?
            .map(|auction| auction.with_derived_status(Utc::now())))
    }

    /// 경매 입찰 조회 (입찰가 오름차순)
    pub async fn get_bids_for_auction(&self, auction_id: &str) -> Result<Vec<Bid>, AppError> {
        info!("{:<12} --> 경매 입찰 조회 id: {}", "Query", auction_id);
        self.store.bids_for_auction(auction_id).await
    }

    /// 사용자 입찰 조회
    /// 전체 경매를 훑어 경매당 하나의 입찰을 모은다 (최신순)
    pub async fn get_bids_for_user(&self, user_id: &str) -> Result<Vec<Bid>, AppError> {
        info!("{:<12} --> 사용자 입찰 조회 id: {}", "Query", user_id);
        let mut bids = Vec::new();
        for auction in self.store.list_auctions().await? {
            if let Some(bid) = self.store.bid_for_bidder(&auction.id, user_id).await? {
                bids.push(bid);
            }
        }
        bids.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(bids)
    }

    /// 사용자가 받은 후기 조회 (최신순)
    pub async fn get_reviews_for_user(&self, user_id: &str) -> Result<Vec<Review>, AppError> {
        info!("{:<12} --> 사용자 후기 조회 id: {}", "Query", user_id);
        let mut reviews: Vec<Review> = self
            .store
            .list_auctions()
            .await?
            .into_iter()
            .flat_map(|auction| [auction.winner_review, auction.admin_review])
            .flatten()
            .filter(|review| review.reviewed_user_id == user_id)
            .collect();
        reviews.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(reviews)
    }

    /// 경매 채팅 조회 (작성 순)
    pub async fn list_messages(&self, auction_id: &str) -> Result<Vec<ChatMessage>, AppError> {
        info!("{:<12} --> 채팅 조회 id: {}", "Query", auction_id);
        self.store.list_messages(auction_id).await
    }
}

// endregion: --- Query Handlers
