/// 경매 디렉터리 & 생명주기 관리
/// 경매 목록/상세/채팅 실시간 구독, 명령(commands), 조회(queries)로 나뉜다.
// region:    --- Imports
use crate::auction::events::ChangeEvent;
use crate::auction::model::{Auction, ChatMessage};
use crate::error::AppError;
use crate::feed::{ChangeHub, Subscription};
use crate::store::AuctionStore;
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{debug, error, info};

// endregion: --- Imports

// region:    --- Modules
pub mod commands;
pub mod queries;

// endregion: --- Modules

/// 상태 재계산 주기
const STATUS_TICK: Duration = Duration::from_secs(1);

// region:    --- Auction Directory
pub struct AuctionDirectory {
    store: Arc<dyn AuctionStore>,
    hub: ChangeHub,
}

impl AuctionDirectory {
    pub fn new(store: Arc<dyn AuctionStore>, hub: ChangeHub) -> Self {
        Self { store, hub }
    }

    /// 경매 목록 구독
    /// 시작 시각 내림차순 목록을 즉시 한 번, 이후 변경 알림과 1초 주기 재계산마다 전달한다.
    /// 직전에 전달한 목록과 같으면 생략
    pub fn subscribe_auctions<F>(&self, callback: F) -> Subscription
    where
        F: Fn(Vec<Auction>) + Send + Sync + 'static,
    {
        let store = Arc::clone(&self.store);
        let mut changes = self.hub.subscribe();
        info!("{:<12} --> 경매 목록 구독 시작", "Directory");

        let handle = tokio::spawn(async move {
            let mut ticker = interval(STATUS_TICK);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker.tick().await;
            let mut last: Option<Vec<Auction>> = None;

            loop {
                match queries::load_auctions(&*store, Utc::now()).await {
                    Ok(auctions) => {
                        if last.as_ref() != Some(&auctions) {
                            callback(auctions.clone());
                            last = Some(auctions);
                        }
                    }
                    Err(e) => error!("{:<12} --> 경매 목록 조회 실패: {}", "Directory", e),
                }

                if !wait_for_change(&mut ticker, &mut changes, |e| e.touches_auction()).await {
                    break;
                }
            }
        });
        Subscription::new(handle)
    }

    /// 단일 경매 구독
    /// 구독 시점에 없는 경매는 NotFound, 구독 중 삭제되면 None 을 한 번 전달하고 종료
    pub async fn subscribe_to_auction<F>(
        &self,
        auction_id: &str,
        callback: F,
    ) -> Result<Subscription, AppError>
    where
        F: Fn(Option<Auction>) + Send + Sync + 'static,
    {
        if self.store.get_auction(auction_id).await?.is_none() {
            return Err(AppError::not_found(format!(
                "경매를 찾을 수 없습니다: {auction_id}"
            )));
        }

        let store = Arc::clone(&self.store);
        let mut changes = self.hub.subscribe();
        let auction_id = auction_id.to_string();
        info!("{:<12} --> 경매 구독 시작 id: {}", "Directory", auction_id);

        let handle = tokio::spawn(async move {
            let mut ticker = interval(STATUS_TICK);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker.tick().await;
            let mut last: Option<Auction> = None;

            loop {
                match store.get_auction(&auction_id).await {
                    Ok(Some(auction)) => {
                        let auction = auction.with_derived_status(Utc::now());
                        if last.as_ref() != Some(&auction) {
                            callback(Some(auction.clone()));
                            last = Some(auction);
                        }
                    }
                    Ok(None) => {
                        debug!("{:<12} --> 구독 중인 경매 삭제됨: {}", "Directory", auction_id);
                        callback(None);
                        break;
                    }
                    Err(e) => error!("{:<12} --> 경매 조회 실패: {}", "Directory", e),
                }

                let filter = |e: &ChangeEvent| e.touches_auction() && e.auction_id() == auction_id;
                if !wait_for_change(&mut ticker, &mut changes, filter).await {
                    break;
                }
            }
        });
        Ok(Subscription::new(handle))
    }

    /// 경매 채팅 구독 (작성 순 전체 목록 전달, 경매가 삭제되면 종료)
    pub async fn subscribe_messages<F>(
        &self,
        auction_id: &str,
        callback: F,
    ) -> Result<Subscription, AppError>
    where
        F: Fn(Vec<ChatMessage>) + Send + Sync + 'static,
    {
        if self.store.get_auction(auction_id).await?.is_none() {
            return Err(AppError::not_found(format!(
                "경매를 찾을 수 없습니다: {auction_id}"
            )));
        }

        let store = Arc::clone(&self.store);
        let mut changes = self.hub.subscribe();
        let auction_id = auction_id.to_string();

        let handle = tokio::spawn(async move {
            match store.list_messages(&auction_id).await {
                Ok(messages) => callback(messages),
                Err(e) => error!("{:<12} --> 채팅 조회 실패: {}", "Directory", e),
            }

            loop {
                match changes.recv().await {
                    Ok(ChangeEvent::MessagePosted { auction_id: id }) if id == auction_id => {}
                    Ok(ChangeEvent::AuctionDeleted { auction_id: id }) if id == auction_id => break,
                    Ok(_) => continue,
                    Err(RecvError::Lagged(skipped)) => {
                        debug!("{:<12} --> 채팅 알림 {}건 유실, 재조회", "Directory", skipped);
                    }
                    Err(RecvError::Closed) => break,
                }

                match store.list_messages(&auction_id).await {
                    Ok(messages) => callback(messages),
                    Err(e) => error!("{:<12} --> 채팅 조회 실패: {}", "Directory", e),
                }
            }
        });
        Ok(Subscription::new(handle))
    }
}

/// 다음 재계산 시점까지 대기. 허브가 닫히면 false
async fn wait_for_change<P>(
    ticker: &mut tokio::time::Interval,
    changes: &mut tokio::sync::broadcast::Receiver<ChangeEvent>,
    relevant: P,
) -> bool
where
    P: Fn(&ChangeEvent) -> bool,
{
    loop {
        tokio::select! {
            _ = ticker.tick() => return true,
            event = changes.recv() => match event {
                Ok(event) if relevant(&event) => return true,
                Ok(_) => continue,
                // 유실된 알림은 재조회로 복구
                Err(RecvError::Lagged(_)) => return true,
                Err(RecvError::Closed) => return false,
            },
        }
    }
}

// endregion: --- Auction Directory
