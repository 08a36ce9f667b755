/// 경매 관련 커맨드 처리
/// 1. 경매 생성
/// 2. 입찰
/// 3. 상태 전이 (종료 시 낙찰자 결정)
/// 4. 경매 삭제 (입찰 / 채팅 연쇄 삭제)
/// 5. 후기 작성
/// 6. 채팅 작성
// region:    --- Imports
use super::AuctionDirectory;
use crate::auction::events::ChangeEvent;
use crate::auction::model::{
    derive_status, Auction, AuctionStatus, Bid, ChatMessage, NewAuction, Review, ReviewSlot,
};
use crate::error::AppError;
use crate::identity::model::{Role, Session};
use crate::store::{BidOutcome, BidWrite, CompletionOutcome, DeleteSummary, MessageWrite};
use chrono::Utc;
use serde::Deserialize;
use tracing::{info, warn};

// endregion: --- Imports

const MAX_MESSAGE_LEN: usize = 1000;

// region:    --- Commands
/// 입찰 명령
#[derive(Debug, Clone)]
pub struct PlaceBidCommand {
    pub auction_id: String,
    pub bidder_id: String,
    pub bidder_name: String,
    pub amount: i64,
    /// 호출자가 알고 있는 현재 최저가
    pub known_lowest_bid: i64,
    pub secret_key: Option<String>,
}

/// 후기 작성 명령
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewCommand {
    pub slot: ReviewSlot,
    pub rating: u8,
    #[serde(default)]
    pub comment: String,
}

/// 채팅 작성 명령
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostMessageCommand {
    pub text: String,
    #[serde(default)]
    pub sender_photo: Option<String>,
}

// endregion: --- Commands

fn require_admin(actor: &Session, action: &str) -> Result<(), AppError> {
    match actor.role {
        Role::Admin => Ok(()),
        Role::User => {
            warn!(
                "{:<12} --> 권한 없음: {} ({})",
                "Command", action, actor.user_id
            );
            Err(AppError::forbidden(format!(
                "관리자만 {action} 할 수 있습니다."
            )))
        }
    }
}

fn auction_not_found(auction_id: &str) -> AppError {
    AppError::not_found(format!("경매를 찾을 수 없습니다: {auction_id}"))
}

// region:    --- Command Handlers
impl AuctionDirectory {
    /// 1. 경매 생성
    pub async fn create_auction(
        &self,
        actor: &Session,
        input: NewAuction,
    ) -> Result<Auction, AppError> {
        info!("{:<12} --> 경매 생성 요청: {}", "Command", input.title);
        require_admin(actor, "경매를 생성")?;

        if input.title.trim().is_empty() {
            return Err(AppError::validation("경매 제목을 입력해 주세요."));
        }
        if input.end_time <= input.start_time {
            return Err(AppError::validation(
                "종료 시각은 시작 시각 이후여야 합니다.",
            ));
        }
        if input.starting_bid <= 0 {
            return Err(AppError::validation("시작 입찰가는 0보다 커야 합니다."));
        }

        let status = derive_status(input.start_time, input.end_time, Utc::now());
        let input = NewAuction {
            secret_key: input.secret_key.filter(|key| !key.is_empty()),
            ..input
        };
        let auction = self
            .store
            .insert_auction(input, status, &actor.user_id)
            .await?;

        self.hub.publish(ChangeEvent::AuctionUpserted {
            auction_id: auction.id.clone(),
        });
        info!(
            "{:<12} --> 경매 생성 완료 id: {}, status: {}",
            "Command", auction.id, status
        );
        Ok(auction)
    }

    /// 2. 입찰
    /// 입찰자 문서 upsert 와 최저가 갱신은 저장소에서 하나의 원자적 쓰기로 처리
    pub async fn submit_bid(&self, cmd: PlaceBidCommand) -> Result<Bid, AppError> {
        info!(
            "{:<12} --> 입찰 요청 처리 시작: auction={}, bidder={}, amount={}",
            "Command", cmd.auction_id, cmd.bidder_id, cmd.amount
        );

        if cmd.amount >= cmd.known_lowest_bid {
            return Err(AppError::validation(format!(
                "입찰가는 현재 최저가({})보다 낮아야 합니다.",
                cmd.known_lowest_bid
            )));
        }
        if cmd.amount <= 0 {
            return Err(AppError::validation("입찰가는 0보다 커야 합니다."));
        }

        let auction = self
            .store
            .get_auction(&cmd.auction_id)
            .await?
            .ok_or_else(|| auction_not_found(&cmd.auction_id))?;

        match auction.effective_status(Utc::now()) {
            AuctionStatus::Live => {}
            AuctionStatus::StartingSoon => {
                return Err(AppError::validation("경매가 아직 시작되지 않았습니다."))
            }
            AuctionStatus::Completed => {
                return Err(AppError::validation("경매가 이미 종료되었습니다."))
            }
        }
        if !auction.unlocks_with(cmd.secret_key.as_deref()) {
            return Err(AppError::forbidden("비공개 경매 키가 올바르지 않습니다."));
        }

        let outcome = self
            .store
            .place_bid(BidWrite {
                auction_id: auction.id.clone(),
                auction_title: auction.title.clone(),
                bidder_id: cmd.bidder_id.clone(),
                bidder_name: cmd.bidder_name,
                amount: cmd.amount,
            })
            .await?;

        match outcome {
            BidOutcome::Placed(bid) => {
                self.hub.publish(ChangeEvent::BidPlaced {
                    auction_id: bid.auction_id.clone(),
                    bidder_id: bid.bidder_id.clone(),
                });
                info!(
                    "{:<12} --> 입찰 성공: 현재 최저가 {}",
                    "Command", bid.amount
                );
                Ok(bid)
            }
            BidOutcome::Rejected { current_lowest_bid } => {
                info!(
                    "{:<12} --> 입찰 실패: 현재 최저가가 더 낮거나 같음 ({})",
                    "Command", current_lowest_bid
                );
                Err(AppError::validation(format!(
                    "입찰가는 현재 최저가({current_lowest_bid})보다 낮아야 합니다."
                )))
            }
            BidOutcome::Closed => {
                info!("{:<12} --> 입찰 실패: 종료된 경매", "Command");
                Err(AppError::validation("경매가 이미 종료되었습니다."))
            }
            BidOutcome::AuctionMissing => Err(auction_not_found(&cmd.auction_id)),
        }
    }

    /// 3. 상태 전이 (관리자)
    pub async fn update_auction_status(
        &self,
        actor: &Session,
        auction_id: &str,
        status: AuctionStatus,
    ) -> Result<Auction, AppError> {
        info!(
            "{:<12} --> 상태 전이 요청 id: {}, status: {}",
            "Command", auction_id, status
        );
        require_admin(actor, "경매 상태를 변경")?;

        let auction = self
            .store
            .get_auction(auction_id)
            .await?
            .ok_or_else(|| auction_not_found(auction_id))?;

        match (auction.status, status) {
            (AuctionStatus::Completed, AuctionStatus::Completed) => {
                info!("{:<12} --> 이미 종료된 경매: {}", "Command", auction_id);
            }
            (AuctionStatus::Completed, _) => {
                return Err(AppError::validation("종료된 경매는 다시 열 수 없습니다."));
            }
            (_, AuctionStatus::Completed) => {
                self.complete_auction(auction_id).await?;
            }
            // 시작 예정 / 진행 중은 시간으로만 결정되므로 기록하지 않는다
            (_, AuctionStatus::StartingSoon | AuctionStatus::Live) => {}
        }

        self.get_auction_by_id(auction_id)
            .await?
            .ok_or_else(|| auction_not_found(auction_id))
    }

    /// 종료 전이 + 낙찰자 결정
    /// 스케줄러와 관리자 상태 전이에서 호출. 이미 종료된 경매면 false
    pub async fn complete_auction(&self, auction_id: &str) -> Result<bool, AppError> {
        let winner = match self.store.complete_auction(auction_id).await? {
            CompletionOutcome::Completed { winner } => winner,
            CompletionOutcome::Skipped => return Ok(false),
        };

        self.hub.publish(ChangeEvent::AuctionUpserted {
            auction_id: auction_id.to_string(),
        });
        match winner {
            Some(bid) => info!(
                "{:<12} --> 경매 종료 id: {}, 낙찰자: {} ({})",
                "Command", auction_id, bid.bidder_id, bid.amount
            ),
            None => info!("{:<12} --> 경매 종료 id: {}, 낙찰자 없음", "Command", auction_id),
        }
        Ok(true)
    }

    /// 4. 경매 삭제 (관리자)
    pub async fn delete_auction(
        &self,
        actor: &Session,
        auction_id: &str,
    ) -> Result<DeleteSummary, AppError> {
        info!("{:<12} --> 경매 삭제 요청 id: {}", "Command", auction_id);
        require_admin(actor, "경매를 삭제")?;

        let summary = self
            .store
            .delete_auction_cascade(auction_id)
            .await?
            .ok_or_else(|| auction_not_found(auction_id))?;

        self.hub.publish(ChangeEvent::AuctionDeleted {
            auction_id: auction_id.to_string(),
        });
        info!(
            "{:<12} --> 경매 삭제 완료 id: {}, 입찰 {}건, 메시지 {}건",
            "Command", auction_id, summary.bids, summary.messages
        );
        Ok(summary)
    }

    /// 5. 후기 작성
    /// 낙찰자 후기는 낙찰자만, 관리자 후기는 관리자만 작성
    pub async fn submit_review(
        &self,
        actor: &Session,
        auction_id: &str,
        cmd: ReviewCommand,
    ) -> Result<Review, AppError> {
        info!(
            "{:<12} --> 후기 작성 요청 id: {}, slot: {:?}",
            "Command", auction_id, cmd.slot
        );
        if !(1..=5).contains(&cmd.rating) {
            return Err(AppError::validation("평점은 1에서 5 사이여야 합니다."));
        }

        let auction = self
            .store
            .get_auction(auction_id)
            .await?
            .ok_or_else(|| auction_not_found(auction_id))?;
        let Some(winner_id) = auction.winner_id.clone() else {
            return Err(AppError::validation(
                "낙찰자가 결정된 경매에만 후기를 남길 수 있습니다.",
            ));
        };

        let reviewed_user_id = match cmd.slot {
            ReviewSlot::WinnerReview => {
                if actor.user_id != winner_id {
                    return Err(AppError::forbidden("낙찰자만 후기를 남길 수 있습니다."));
                }
                auction.created_by.clone()
            }
            ReviewSlot::AdminReview => {
                require_admin(actor, "낙찰자 후기를 작성")?;
                winner_id
            }
        };

        let review = Review {
            rating: cmd.rating,
            comment: cmd.comment.trim().to_string(),
            reviewer_id: actor.user_id.clone(),
            reviewer_name: actor.display_name.clone(),
            reviewed_user_id,
            timestamp: Utc::now(),
        };
        if !self
            .store
            .set_review(auction_id, cmd.slot, review.clone())
            .await?
        {
            return Err(auction_not_found(auction_id));
        }

        self.hub.publish(ChangeEvent::AuctionUpserted {
            auction_id: auction_id.to_string(),
        });
        Ok(review)
    }

    /// 6. 채팅 작성
    pub async fn post_message(
        &self,
        actor: &Session,
        auction_id: &str,
        cmd: PostMessageCommand,
    ) -> Result<ChatMessage, AppError> {
        let text = cmd.text.trim();
        if text.is_empty() {
            return Err(AppError::validation("메시지를 입력해 주세요."));
        }
        if text.chars().count() > MAX_MESSAGE_LEN {
            return Err(AppError::validation(format!(
                "메시지는 {MAX_MESSAGE_LEN}자를 넘을 수 없습니다."
            )));
        }

        let message = self
            .store
            .insert_message(MessageWrite {
                auction_id: auction_id.to_string(),
                text: text.to_string(),
                sender_id: actor.user_id.clone(),
                sender_name: actor.display_name.clone(),
                sender_photo: cmd.sender_photo,
            })
            .await?
            .ok_or_else(|| auction_not_found(auction_id))?;

        self.hub.publish(ChangeEvent::MessagePosted {
            auction_id: auction_id.to_string(),
        });
        Ok(message)
    }
}

// endregion: --- Command Handlers

// region:    --- Tests
#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::ChangeHub;
    use crate::store::testing::HookedStore;
    use crate::store::{AccountStore, MemoryStore};
    use chrono::Duration;
    use std::sync::Arc;
    use tokio::sync::mpsc;

    struct Fixture {
        store: Arc<MemoryStore>,
        directory: AuctionDirectory,
        admin: Session,
    }

    fn session(user_id: &str, role: Role) -> Session {
        Session {
            token: format!("token-{user_id}"),
            user_id: user_id.to_string(),
            email: format!("{user_id}@auction.local"),
            display_name: user_id.to_uppercase(),
            role,
            created_at: Utc::now(),
        }
    }

    fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let directory = AuctionDirectory::new(store.clone(), ChangeHub::new());
        Fixture {
            store,
            directory,
            admin: session("admin", Role::Admin),
        }
    }

    fn new_auction(start_offset: Duration, end_offset: Duration, starting_bid: i64) -> NewAuction {
        let now = Utc::now();
        NewAuction {
            title: "중고 노트북".to_string(),
            description: "역경매".to_string(),
            starting_bid,
            start_time: now + start_offset,
            end_time: now + end_offset,
            secret_key: None,
        }
    }

    fn live(starting_bid: i64) -> NewAuction {
        new_auction(Duration::hours(-1), Duration::hours(1), starting_bid)
    }

    fn bid(auction: &Auction, bidder: &str, amount: i64, known: i64) -> PlaceBidCommand {
        PlaceBidCommand {
            auction_id: auction.id.clone(),
            bidder_id: bidder.to_string(),
            bidder_name: bidder.to_uppercase(),
            amount,
            known_lowest_bid: known,
            secret_key: None,
        }
    }

    #[tokio::test]
    async fn test_create_auction_validation_and_status() {
        let f = fixture();

        let err = f
            .directory
            .create_auction(
                &f.admin,
                new_auction(Duration::hours(1), Duration::hours(1), 100),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let err = f
            .directory
            .create_auction(&session("u1", Role::User), live(100))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));

        let upcoming = f
            .directory
            .create_auction(
                &f.admin,
                new_auction(Duration::hours(1), Duration::hours(2), 100),
            )
            .await
            .unwrap();
        assert_eq!(upcoming.status, AuctionStatus::StartingSoon);
        assert_eq!(upcoming.created_by, "admin");

        let running = f.directory.create_auction(&f.admin, live(100)).await.unwrap();
        assert_eq!(running.status, AuctionStatus::Live);

        // 시작 시각 내림차순
        let listed = f.directory.list_auctions().await.unwrap();
        assert_eq!(listed[0].id, upcoming.id);
        assert_eq!(listed[1].id, running.id);

        assert!(f
            .directory
            .get_auction_by_id("missing")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_bid_scenario_upserts_single_document() {
        let f = fixture();
        let auction = f.directory.create_auction(&f.admin, live(20000)).await.unwrap();

        let first = f
            .directory
            .submit_bid(bid(&auction, "u1", 15000, 20000))
            .await
            .unwrap();
        assert_eq!(first.amount, 15000);

        let err = f
            .directory
            .submit_bid(bid(&auction, "u2", 15500, 15000))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let second = f
            .directory
            .submit_bid(bid(&auction, "u1", 14000, 15000))
            .await
            .unwrap();
        assert_eq!(second.id, first.id);
        assert!(second.timestamp >= first.timestamp);

        let stored = f.directory.get_auction_by_id(&auction.id).await.unwrap().unwrap();
        assert_eq!(stored.current_lowest_bid, 14000);

        let bids = f.directory.get_bids_for_auction(&auction.id).await.unwrap();
        assert_eq!(bids.len(), 1);
        assert_eq!(bids[0].bidder_id, "u1");
        assert_eq!(bids[0].amount, 14000);
    }

    #[tokio::test]
    async fn test_rejected_bid_writes_nothing() {
        let f = fixture();
        let auction = f.directory.create_auction(&f.admin, live(20000)).await.unwrap();
        let before = f.store.auction_document_count().await;

        for amount in [20000, 25000] {
            let err = f
                .directory
                .submit_bid(bid(&auction, "u1", amount, 20000))
                .await
                .unwrap_err();
            assert!(matches!(err, AppError::Validation(_)));
        }
        // 호출자가 오래된 최저가를 알고 있어도 저장된 최저가 기준으로 거절
        f.directory
            .submit_bid(bid(&auction, "u1", 10000, 20000))
            .await
            .unwrap();
        let err = f
            .directory
            .submit_bid(bid(&auction, "u2", 12000, 20000))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        assert_eq!(f.store.auction_document_count().await, before + 1);
        let stored = f.directory.get_auction_by_id(&auction.id).await.unwrap().unwrap();
        assert_eq!(stored.current_lowest_bid, 10000);
    }

    #[tokio::test]
    async fn test_bid_requires_live_auction_and_secret_key() {
        let f = fixture();
        let upcoming = f
            .directory
            .create_auction(
                &f.admin,
                new_auction(Duration::hours(1), Duration::hours(2), 100),
            )
            .await
            .unwrap();
        let err = f
            .directory
            .submit_bid(bid(&upcoming, "u1", 50, 100))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let private = f
            .directory
            .create_auction(
                &f.admin,
                NewAuction {
                    secret_key: Some("open-sesame".to_string()),
                    ..live(100)
                },
            )
            .await
            .unwrap();
        let err = f
            .directory
            .submit_bid(bid(&private, "u1", 50, 100))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));

        let placed = f
            .directory
            .submit_bid(PlaceBidCommand {
                secret_key: Some("open-sesame".to_string()),
                ..bid(&private, "u1", 50, 100)
            })
            .await
            .unwrap();
        assert_eq!(placed.amount, 50);

        let err = f
            .directory
            .submit_bid(PlaceBidCommand {
                auction_id: "missing".to_string(),
                ..bid(&private, "u1", 10, 50)
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_completion_picks_lowest_bidder() {
        let f = fixture();
        let winner = f
            .store
            .create_account(crate::identity::model::NewAccount {
                uid: "userB".to_string(),
                email: "userb@auction.local".to_string(),
                password_hash: "hash".to_string(),
                display_name: "B".to_string(),
                role: Role::User,
            })
            .await
            .unwrap();
        let auction = f.directory.create_auction(&f.admin, live(1000)).await.unwrap();

        for (bidder, amount, known) in [("userA", 100, 1000), ("userC", 95, 100), ("userB", 90, 95)] {
            f.directory
                .submit_bid(bid(&auction, bidder, amount, known))
                .await
                .unwrap();
        }
        assert_eq!(f.directory.get_bids_for_auction(&auction.id).await.unwrap().len(), 3);

        let completed = f
            .directory
            .update_auction_status(&f.admin, &auction.id, AuctionStatus::Completed)
            .await
            .unwrap();
        assert_eq!(completed.status, AuctionStatus::Completed);
        assert_eq!(completed.winner_id.as_deref(), Some("userB"));

        // 두 번째 종료 요청은 아무것도 바꾸지 않는다
        let again = f
            .directory
            .update_auction_status(&f.admin, &auction.id, AuctionStatus::Completed)
            .await
            .unwrap();
        assert_eq!(again.winner_id.as_deref(), Some("userB"));
        let profile = f.store.get_profile(&winner.id).await.unwrap().unwrap();
        assert_eq!(profile.won_auctions, vec![auction.id.clone()]);

        let err = f
            .directory
            .update_auction_status(&f.admin, &auction.id, AuctionStatus::Live)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_completion_counts_bid_landing_during_settlement() {
        let store = Arc::new(HookedStore::new(Arc::new(MemoryStore::new())));
        let directory = AuctionDirectory::new(store.clone(), ChangeHub::new());
        let admin = session("admin", Role::Admin);
        let auction = directory.create_auction(&admin, live(1000)).await.unwrap();
        directory
            .submit_bid(bid(&auction, "early", 900, 1000))
            .await
            .unwrap();

        // 종료 처리가 시작된 뒤 커밋되는 더 낮은 입찰
        store.land_bid_before_completion(BidWrite {
            auction_id: auction.id.clone(),
            auction_title: auction.title.clone(),
            bidder_id: "late".to_string(),
            bidder_name: "LATE".to_string(),
            amount: 500,
        });
        assert!(directory.complete_auction(&auction.id).await.unwrap());

        let completed = directory.get_auction_by_id(&auction.id).await.unwrap().unwrap();
        assert_eq!(completed.current_lowest_bid, 500);
        assert_eq!(completed.winner_id.as_deref(), Some("late"));
        let bids = directory.get_bids_for_auction(&auction.id).await.unwrap();
        assert_eq!(bids[0].bidder_id, "late");
        assert_eq!(bids[0].amount, completed.current_lowest_bid);
    }

    #[tokio::test]
    async fn test_completion_without_bids_has_no_winner() {
        let f = fixture();
        let auction = f.directory.create_auction(&f.admin, live(1000)).await.unwrap();

        let err = f
            .directory
            .update_auction_status(&session("u1", Role::User), &auction.id, AuctionStatus::Completed)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));

        let completed = f
            .directory
            .update_auction_status(&f.admin, &auction.id, AuctionStatus::Completed)
            .await
            .unwrap();
        assert_eq!(completed.status, AuctionStatus::Completed);
        assert!(completed.winner_id.is_none());
    }

    #[tokio::test]
    async fn test_delete_cascades_bids_and_messages() {
        let f = fixture();
        let auction = f.directory.create_auction(&f.admin, live(1000)).await.unwrap();
        let other = f.directory.create_auction(&f.admin, live(1000)).await.unwrap();

        let mut known = 1000;
        for (i, bidder) in ["u1", "u2", "u3"].iter().enumerate() {
            let amount = 900 - i as i64 * 10;
            f.directory
                .submit_bid(bid(&auction, bidder, amount, known))
                .await
                .unwrap();
            known = amount;
        }
        for text in ["안녕하세요", "가격 문의"] {
            f.directory
                .post_message(
                    &session("u1", Role::User),
                    &auction.id,
                    PostMessageCommand {
                        text: text.to_string(),
                        sender_photo: None,
                    },
                )
                .await
                .unwrap();
        }
        f.directory
            .submit_bid(bid(&other, "u1", 500, 1000))
            .await
            .unwrap();

        let before = f.store.auction_document_count().await;
        let summary = f.directory.delete_auction(&f.admin, &auction.id).await.unwrap();
        assert_eq!(summary, DeleteSummary { bids: 3, messages: 2 });
        assert_eq!(summary.documents(), 6);
        assert_eq!(f.store.auction_document_count().await, before - 6);

        assert!(f.directory.get_auction_by_id(&auction.id).await.unwrap().is_none());
        assert!(f.directory.get_bids_for_auction(&auction.id).await.unwrap().is_empty());
        assert!(f.directory.list_messages(&auction.id).await.unwrap().is_empty());
        assert_eq!(f.directory.get_bids_for_auction(&other.id).await.unwrap().len(), 1);

        let err = f.directory.delete_auction(&f.admin, &auction.id).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_reviews_are_slot_gated() {
        let f = fixture();
        let winner = session("winner", Role::User);
        let auction = f.directory.create_auction(&f.admin, live(1000)).await.unwrap();

        let review = ReviewCommand {
            slot: ReviewSlot::WinnerReview,
            rating: 5,
            comment: "좋은 거래".to_string(),
        };
        let err = f
            .directory
            .submit_review(&winner, &auction.id, review.clone())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        f.directory
            .submit_bid(bid(&auction, "winner", 800, 1000))
            .await
            .unwrap();
        f.directory.complete_auction(&auction.id).await.unwrap();

        let err = f
            .directory
            .submit_review(&session("stranger", Role::User), &auction.id, review.clone())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));

        let err = f
            .directory
            .submit_review(
                &winner,
                &auction.id,
                ReviewCommand {
                    rating: 6,
                    ..review.clone()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let written = f
            .directory
            .submit_review(&winner, &auction.id, review.clone())
            .await
            .unwrap();
        assert_eq!(written.reviewed_user_id, "admin");

        let err = f
            .directory
            .submit_review(
                &winner,
                &auction.id,
                ReviewCommand {
                    slot: ReviewSlot::AdminReview,
                    ..review.clone()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));

        f.directory
            .submit_review(
                &f.admin,
                &auction.id,
                ReviewCommand {
                    slot: ReviewSlot::AdminReview,
                    rating: 4,
                    comment: "빠른 응답".to_string(),
                },
            )
            .await
            .unwrap();

        let for_admin = f.directory.get_reviews_for_user("admin").await.unwrap();
        assert_eq!(for_admin.len(), 1);
        assert_eq!(for_admin[0].rating, 5);
        let for_winner = f.directory.get_reviews_for_user("winner").await.unwrap();
        assert_eq!(for_winner.len(), 1);
        assert_eq!(for_winner[0].reviewer_id, "admin");
    }

    #[tokio::test]
    async fn test_bids_for_user_one_per_auction_newest_first() {
        let f = fixture();
        let a1 = f.directory.create_auction(&f.admin, live(1000)).await.unwrap();
        let a2 = f.directory.create_auction(&f.admin, live(1000)).await.unwrap();

        f.directory.submit_bid(bid(&a1, "u1", 900, 1000)).await.unwrap();
        f.directory.submit_bid(bid(&a2, "u1", 950, 1000)).await.unwrap();
        f.directory.submit_bid(bid(&a1, "u1", 800, 900)).await.unwrap();
        f.directory.submit_bid(bid(&a2, "u2", 700, 950)).await.unwrap();

        let bids = f.directory.get_bids_for_user("u1").await.unwrap();
        assert_eq!(bids.len(), 2);
        assert_eq!(bids[0].auction_id, a1.id);
        assert_eq!(bids[0].amount, 800);
        assert_eq!(bids[1].auction_id, a2.id);
        assert!(bids[0].timestamp >= bids[1].timestamp);
    }

    #[tokio::test]
    async fn test_post_message_validation() {
        let f = fixture();
        let user = session("u1", Role::User);
        let auction = f.directory.create_auction(&f.admin, live(1000)).await.unwrap();

        let err = f
            .directory
            .post_message(
                &user,
                &auction.id,
                PostMessageCommand {
                    text: "   ".to_string(),
                    sender_photo: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let err = f
            .directory
            .post_message(
                &user,
                "missing",
                PostMessageCommand {
                    text: "hi".to_string(),
                    sender_photo: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        for text in ["first", "second"] {
            f.directory
                .post_message(
                    &user,
                    &auction.id,
                    PostMessageCommand {
                        text: text.to_string(),
                        sender_photo: Some("avatar.png".to_string()),
                    },
                )
                .await
                .unwrap();
        }
        let messages = f.directory.list_messages(&auction.id).await.unwrap();
        let texts: Vec<&str> = messages.iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["first", "second"]);
        assert_eq!(messages[0].sender_name, "U1");
    }

    #[tokio::test]
    async fn test_auction_subscription_sees_bids_and_delete() {
        let f = fixture();
        let auction = f.directory.create_auction(&f.admin, live(1000)).await.unwrap();

        let (tx, mut rx) = mpsc::unbounded_channel();
        let sub = f
            .directory
            .subscribe_to_auction(&auction.id, move |update| {
                let _ = tx.send(update);
            })
            .await
            .unwrap();

        let initial = rx.recv().await.unwrap().unwrap();
        assert_eq!(initial.current_lowest_bid, 1000);

        f.directory.submit_bid(bid(&auction, "u1", 900, 1000)).await.unwrap();
        let updated = rx.recv().await.unwrap().unwrap();
        assert_eq!(updated.current_lowest_bid, 900);

        f.directory.delete_auction(&f.admin, &auction.id).await.unwrap();
        assert!(rx.recv().await.unwrap().is_none());
        // 삭제 알림 이후 구독은 끝난다
        assert!(rx.recv().await.is_none());
        drop(sub);

        let err = f
            .directory
            .subscribe_to_auction("missing", |_| {})
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_chat_subscription_redelivers_and_ends_on_delete() {
        let f = fixture();
        let user = session("u1", Role::User);
        let auction = f.directory.create_auction(&f.admin, live(1000)).await.unwrap();
        let other = f.directory.create_auction(&f.admin, live(1000)).await.unwrap();
        let post = |text: &str| PostMessageCommand {
            text: text.to_string(),
            sender_photo: None,
        };
        f.directory
            .post_message(&user, &auction.id, post("first"))
            .await
            .unwrap();

        let (tx, mut rx) = mpsc::unbounded_channel();
        let _sub = f
            .directory
            .subscribe_messages(&auction.id, move |messages| {
                let texts: Vec<String> = messages.into_iter().map(|m| m.text).collect();
                let _ = tx.send(texts);
            })
            .await
            .unwrap();
        assert_eq!(rx.recv().await.unwrap(), vec!["first"]);

        f.directory
            .post_message(&user, &auction.id, post("second"))
            .await
            .unwrap();
        assert_eq!(rx.recv().await.unwrap(), vec!["first", "second"]);

        // 다른 경매의 채팅은 전달되지 않고, 삭제되면 구독이 끝난다
        f.directory
            .post_message(&user, &other.id, post("elsewhere"))
            .await
            .unwrap();
        f.directory.delete_auction(&f.admin, &auction.id).await.unwrap();
        assert!(rx.recv().await.is_none());

        let err = f
            .directory
            .subscribe_messages("missing", |_| {})
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_list_subscription_stops_after_unsubscribe() {
        let f = fixture();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let sub = f.directory.subscribe_auctions(move |auctions| {
            let _ = tx.send(auctions.len());
        });
        assert_eq!(rx.recv().await.unwrap(), 0);

        f.directory.create_auction(&f.admin, live(1000)).await.unwrap();
        assert_eq!(rx.recv().await.unwrap(), 1);

        sub.unsubscribe();
        f.directory.create_auction(&f.admin, live(1000)).await.unwrap();
        // 태스크가 중단되면 송신측이 drop 되어 채널이 닫힌다
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_list_subscription_rederives_status_on_tick() {
        let f = fixture();
        f.directory
            .create_auction(
                &f.admin,
                NewAuction {
                    start_time: Utc::now() + Duration::milliseconds(1500),
                    end_time: Utc::now() + Duration::hours(1),
                    ..live(1000)
                },
            )
            .await
            .unwrap();

        let (tx, mut rx) = mpsc::unbounded_channel();
        let _sub = f.directory.subscribe_auctions(move |auctions| {
            let _ = tx.send(auctions[0].status);
        });
        assert_eq!(rx.recv().await.unwrap(), AuctionStatus::StartingSoon);

        // 변경 알림 없이 1초 주기 재계산만으로 상태가 바뀐다
        let status = tokio::time::timeout(std::time::Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(status, AuctionStatus::Live);
    }
}

// endregion: --- Tests
