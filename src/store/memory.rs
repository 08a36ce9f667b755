/// 인메모리 문서 저장소
/// DATABASE_URL 없이 실행할 때와 테스트에서 사용한다.
/// 모든 컬렉션을 하나의 락으로 감싸 다중 문서 쓰기를 원자적으로 처리한다.
// region:    --- Imports
use super::{
    normalize_email, AccountStore, AuctionStore, BidOutcome, BidWrite, CompletionOutcome,
    DeleteSummary, MessageWrite,
};
use crate::auction::model::{
    determine_winner, Auction, AuctionStatus, Bid, ChatMessage, NewAuction, Review, ReviewSlot,
};
use crate::error::AppError;
use crate::identity::model::{Identity, NewAccount, Profile, Session};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

// endregion: --- Imports

// region:    --- Memory Store
#[derive(Default)]
struct Collections {
    auctions: HashMap<String, Auction>,
    /// (auction_id, bidder_id) -> 입찰
    bids: HashMap<(String, String), Bid>,
    messages: HashMap<String, Vec<ChatMessage>>,
    identities: HashMap<String, Identity>,
    profiles: HashMap<String, Profile>,
    sessions: HashMap<String, Session>,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Collections>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 전체 문서 수 (경매 + 입찰 + 메시지)
    #[cfg(test)]
    pub(crate) async fn auction_document_count(&self) -> usize {
        let inner = self.inner.read().await;
        inner.auctions.len()
            + inner.bids.len()
            + inner.messages.values().map(Vec::len).sum::<usize>()
    }
}

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

// endregion: --- Memory Store

// region:    --- Auction Store
#[async_trait]
impl AuctionStore for MemoryStore {
    async fn insert_auction(
        &self,
        input: NewAuction,
        status: AuctionStatus,
        created_by: &str,
    ) -> Result<Auction, AppError> {
        let now = Utc::now();
        let auction = Auction {
            id: new_id(),
            title: input.title,
            description: input.description,
            current_lowest_bid: input.starting_bid,
            start_time: input.start_time,
            end_time: input.end_time,
            secret_key: input.secret_key,
            status,
            winner_id: None,
            winner_review: None,
            admin_review: None,
            created_by: created_by.to_string(),
            created_at: now,
            updated_at: now,
        };

        let mut inner = self.inner.write().await;
        inner.auctions.insert(auction.id.clone(), auction.clone());
        Ok(auction)
    }

    async fn get_auction(&self, auction_id: &str) -> Result<Option<Auction>, AppError> {
        Ok(self.inner.read().await.auctions.get(auction_id).cloned())
    }

    async fn list_auctions(&self) -> Result<Vec<Auction>, AppError> {
        let mut auctions: Vec<Auction> =
            self.inner.read().await.auctions.values().cloned().collect();
        auctions.sort_by(|a, b| b.start_time.cmp(&a.start_time));
        Ok(auctions)
    }

    async fn list_unsettled_ended(&self, now: DateTime<Utc>) -> Result<Vec<String>, AppError> {
        Ok(self
            .inner
            .read()
            .await
            .auctions
            .values()
            .filter(|a| a.status != AuctionStatus::Completed && a.end_time <= now)
            .map(|a| a.id.clone())
            .collect())
    }

    async fn place_bid(&self, bid: BidWrite) -> Result<BidOutcome, AppError> {
        let mut inner = self.inner.write().await;
        let now = Utc::now();

        let Some(auction) = inner.auctions.get_mut(&bid.auction_id) else {
            return Ok(BidOutcome::AuctionMissing);
        };
        if auction.status == AuctionStatus::Completed || auction.end_time <= now {
            debug!("{:<12} --> 입찰 거절: 종료된 경매", "MemoryStore");
            return Ok(BidOutcome::Closed);
        }
        if auction.current_lowest_bid <= bid.amount {
            debug!(
                "{:<12} --> 입찰 거절: 저장된 최저가 {}",
                "MemoryStore", auction.current_lowest_bid
            );
            return Ok(BidOutcome::Rejected {
                current_lowest_bid: auction.current_lowest_bid,
            });
        }
        auction.current_lowest_bid = bid.amount;
        auction.updated_at = now;

        let key = (bid.auction_id.clone(), bid.bidder_id.clone());
        let stored = match inner.bids.get_mut(&key) {
            Some(existing) => {
                existing.amount = bid.amount;
                existing.bidder_name = bid.bidder_name;
                existing.auction_title = bid.auction_title;
                existing.timestamp = now;
                existing.clone()
            }
            None => {
                let created = Bid {
                    id: new_id(),
                    auction_id: bid.auction_id,
                    auction_title: bid.auction_title,
                    bidder_id: bid.bidder_id,
                    bidder_name: bid.bidder_name,
                    amount: bid.amount,
                    timestamp: now,
                };
                inner.bids.insert(key, created.clone());
                created
            }
        };
        Ok(BidOutcome::Placed(stored))
    }

    async fn bids_for_auction(&self, auction_id: &str) -> Result<Vec<Bid>, AppError> {
        let mut bids: Vec<Bid> = self
            .inner
            .read()
            .await
            .bids
            .values()
            .filter(|b| b.auction_id == auction_id)
            .cloned()
            .collect();
        bids.sort_by(|a, b| a.amount.cmp(&b.amount).then(a.timestamp.cmp(&b.timestamp)));
        Ok(bids)
    }

    async fn bid_for_bidder(
        &self,
        auction_id: &str,
        bidder_id: &str,
    ) -> Result<Option<Bid>, AppError> {
        Ok(self
            .inner
            .read()
            .await
            .bids
            .get(&(auction_id.to_string(), bidder_id.to_string()))
            .cloned())
    }

    async fn complete_auction(&self, auction_id: &str) -> Result<CompletionOutcome, AppError> {
        let mut inner = self.inner.write().await;
        let winner = determine_winner(
            inner
                .bids
                .iter()
                .filter(|((id, _), _)| id == auction_id)
                .map(|(_, bid)| bid),
        )
        .cloned();

        let Some(auction) = inner.auctions.get_mut(auction_id) else {
            return Ok(CompletionOutcome::Skipped);
        };
        if auction.status == AuctionStatus::Completed {
            return Ok(CompletionOutcome::Skipped);
        }
        auction.status = AuctionStatus::Completed;
        auction.winner_id = winner.as_ref().map(|bid| bid.bidder_id.clone());
        auction.updated_at = Utc::now();

        if let Some(bid) = &winner {
            if let Some(profile) = inner.profiles.get_mut(&bid.bidder_id) {
                if !profile.won_auctions.iter().any(|id| id == auction_id) {
                    profile.won_auctions.push(auction_id.to_string());
                }
            }
        }
        Ok(CompletionOutcome::Completed { winner })
    }

    async fn set_review(
        &self,
        auction_id: &str,
        slot: ReviewSlot,
        review: Review,
    ) -> Result<bool, AppError> {
        let mut inner = self.inner.write().await;
        let Some(auction) = inner.auctions.get_mut(auction_id) else {
            return Ok(false);
        };
        match slot {
            ReviewSlot::WinnerReview => auction.winner_review = Some(review),
            ReviewSlot::AdminReview => auction.admin_review = Some(review),
        }
        auction.updated_at = Utc::now();
        Ok(true)
    }

    async fn delete_auction_cascade(
        &self,
        auction_id: &str,
    ) -> Result<Option<DeleteSummary>, AppError> {
        let mut inner = self.inner.write().await;
        if inner.auctions.remove(auction_id).is_none() {
            return Ok(None);
        }
        let before = inner.bids.len();
        inner.bids.retain(|(id, _), _| id != auction_id);
        let bids = (before - inner.bids.len()) as u64;
        let messages = inner
            .messages
            .remove(auction_id)
            .map(|m| m.len() as u64)
            .unwrap_or(0);
        Ok(Some(DeleteSummary { bids, messages }))
    }

    async fn insert_message(
        &self,
        message: MessageWrite,
    ) -> Result<Option<ChatMessage>, AppError> {
        let mut inner = self.inner.write().await;
        if !inner.auctions.contains_key(&message.auction_id) {
            debug!(
                "{:<12} --> 메시지 거절: 없는 경매 {}",
                "MemoryStore", message.auction_id
            );
            return Ok(None);
        }

        let stored = ChatMessage {
            id: new_id(),
            auction_id: message.auction_id,
            text: message.text,
            sender_id: message.sender_id,
            sender_name: message.sender_name,
            sender_photo: message.sender_photo,
            timestamp: Utc::now(),
        };
        inner
            .messages
            .entry(stored.auction_id.clone())
            .or_default()
            .push(stored.clone());
        Ok(Some(stored))
    }

    async fn list_messages(&self, auction_id: &str) -> Result<Vec<ChatMessage>, AppError> {
        Ok(self
            .inner
            .read()
            .await
            .messages
            .get(auction_id)
            .cloned()
            .unwrap_or_default())
    }
}

// endregion: --- Auction Store

// region:    --- Account Store
#[async_trait]
impl AccountStore for MemoryStore {
    async fn create_account(&self, account: NewAccount) -> Result<Profile, AppError> {
        let email = normalize_email(&account.email);
        let mut inner = self.inner.write().await;
        if inner.identities.contains_key(&email) {
            return Err(AppError::auth("이미 가입된 이메일입니다."));
        }

        let profile = Profile {
            id: account.uid.clone(),
            email: email.clone(),
            display_name: account.display_name,
            role: account.role,
            created_at: Utc::now(),
            won_auctions: Vec::new(),
        };
        inner.identities.insert(
            email.clone(),
            Identity {
                uid: account.uid,
                email,
                password_hash: account.password_hash,
            },
        );
        inner.profiles.insert(profile.id.clone(), profile.clone());
        Ok(profile)
    }

    async fn find_identity(&self, email: &str) -> Result<Option<Identity>, AppError> {
        Ok(self
            .inner
            .read()
            .await
            .identities
            .get(&normalize_email(email))
            .cloned())
    }

    async fn get_profile(&self, user_id: &str) -> Result<Option<Profile>, AppError> {
        Ok(self.inner.read().await.profiles.get(user_id).cloned())
    }

    async fn list_profiles(&self) -> Result<Vec<Profile>, AppError> {
        let mut profiles: Vec<Profile> =
            self.inner.read().await.profiles.values().cloned().collect();
        profiles.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(profiles)
    }

    async fn insert_session(&self, session: Session) -> Result<(), AppError> {
        self.inner
            .write()
            .await
            .sessions
            .insert(session.token.clone(), session);
        Ok(())
    }

    async fn get_session(&self, token: &str) -> Result<Option<Session>, AppError> {
        Ok(self.inner.read().await.sessions.get(token).cloned())
    }

    async fn delete_session(&self, token: &str) -> Result<Option<Session>, AppError> {
        Ok(self.inner.write().await.sessions.remove(token))
    }
}

// endregion: --- Account Store


// endregion: --- Tests
