/// 테스트용 저장소 래퍼
/// 인메모리 저장소에 위임하면서 특정 시점에 끼어드는 쓰기나 실패를 주입한다.
// region:    --- Imports
use super::{
    AuctionStore, BidOutcome, BidWrite, CompletionOutcome, DeleteSummary, MemoryStore,
    MessageWrite,
};
use crate::auction::model::{
    Auction, AuctionStatus, Bid, ChatMessage, NewAuction, Review, ReviewSlot,
};
use crate::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex};

// endregion: --- Imports

pub(crate) struct HookedStore {
    pub inner: Arc<MemoryStore>,
    /// 입찰 조회 직후 또는 종료 전이 직전에 한 번 기록되는 입찰
    late_bid: Mutex<Option<BidWrite>>,
    /// 종료 전이가 실패하는 경매
    failing_completion: Mutex<Option<String>>,
}

impl HookedStore {
    pub fn new(inner: Arc<MemoryStore>) -> Self {
        Self {
            inner,
            late_bid: Mutex::new(None),
            failing_completion: Mutex::new(None),
        }
    }

    pub fn land_bid_before_completion(&self, bid: BidWrite) {
        *self.late_bid.lock().unwrap() = Some(bid);
    }

    pub fn fail_completion_of(&self, auction_id: &str) {
        *self.failing_completion.lock().unwrap() = Some(auction_id.to_string());
    }

    async fn place_late_bid(&self) -> Result<(), AppError> {
        let pending = self.late_bid.lock().unwrap().take();
        if let Some(bid) = pending {
            self.inner.place_bid(bid).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl AuctionStore for HookedStore {
    async fn insert_auction(
        &self,
        input: NewAuction,
        status: AuctionStatus,
        created_by: &str,
    ) -> Result<Auction, AppError> {
        self.inner.insert_auction(input, status, created_by).await
    }

    async fn get_auction(&self, auction_id: &str) -> Result<Option<Auction>, AppError> {
        self.inner.get_auction(auction_id).await
    }

    async fn list_auctions(&self) -> Result<Vec<Auction>, AppError> {
        self.inner.list_auctions().await
    }

    async fn list_unsettled_ended(&self, now: DateTime<Utc>) -> Result<Vec<String>, AppError> {
        self.inner.list_unsettled_ended(now).await
    }

    async fn place_bid(&self, bid: BidWrite) -> Result<BidOutcome, AppError> {
        self.inner.place_bid(bid).await
    }

    async fn bids_for_auction(&self, auction_id: &str) -> Result<Vec<Bid>, AppError> {
        let bids = self.inner.bids_for_auction(auction_id).await?;
        self.place_late_bid().await?;
        Ok(bids)
    }

    async fn bid_for_bidder(
        &self,
        auction_id: &str,
        bidder_id: &str,
    ) -> Result<Option<Bid>, AppError> {
        self.inner.bid_for_bidder(auction_id, bidder_id).await
    }

    async fn complete_auction(&self, auction_id: &str) -> Result<CompletionOutcome, AppError> {
        let failing = self.failing_completion.lock().unwrap().clone();
        if failing.as_deref() == Some(auction_id) {
            return Err(AppError::Backend(format!("종료 기록 실패: {auction_id}")));
        }
        self.place_late_bid().await?;
        self.inner.complete_auction(auction_id).await
    }

    async fn set_review(
        &self,
        auction_id: &str,
        slot: ReviewSlot,
        review: Review,
    ) -> Result<bool, AppError> {
        self.inner.set_review(auction_id, slot, review).await
    }

    async fn delete_auction_cascade(
        &self,
        auction_id: &str,
    ) -> Result<Option<DeleteSummary>, AppError> {
        self.inner.delete_auction_cascade(auction_id).await
    }

    async fn insert_message(
        &self,
        message: MessageWrite,
    ) -> Result<Option<ChatMessage>, AppError> {
        self.inner.insert_message(message).await
    }

    async fn list_messages(&self, auction_id: &str) -> Result<Vec<ChatMessage>, AppError> {
        self.inner.list_messages(auction_id).await
    }
}
