/// 경매 종료 스케줄러
/// 읽기 경로의 상태는 시간으로 계산되므로 여기서는 상태를 기록하지 않는다.
/// 종료 시각이 지난 경매의 종료 전이(낙찰자 결정)만 서버 쪽에서 한 번 수행한다.
// region:    --- Imports
use crate::directory::AuctionDirectory;
use crate::error::AppError;
use crate::store::AuctionStore;
use chrono::Utc;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration};
use tracing::{debug, error, info};

// endregion: --- Imports

// region:    --- Auction Scheduler
pub struct AuctionScheduler {
    store: Arc<dyn AuctionStore>,
    directory: Arc<AuctionDirectory>,
}

impl AuctionScheduler {
    pub fn new(store: Arc<dyn AuctionStore>, directory: Arc<AuctionDirectory>) -> Self {
        Self { store, directory }
    }

    /// 스케줄러 시작 (1초마다 실행)
    pub fn start(self) -> JoinHandle<()> {
        info!("{:<12} --> 경매 종료 스케줄러 시작", "Scheduler");
        tokio::spawn(async move {
            let mut interval = interval(Duration::from_secs(1));
            loop {
                interval.tick().await;
                if let Err(e) = self.settle_ended_auctions().await {
                    error!(
                        "{:<12} --> 경매 종료 처리 중 오류 발생: {:?}",
                        "Scheduler", e
                    );
                }
            }
        })
    }

    /// 종료 시각이 지난 경매 종료 처리. 새로 종료된 경매 수 반환
    pub async fn settle_ended_auctions(&self) -> Result<usize, AppError> {
        let ended = self.store.list_unsettled_ended(Utc::now()).await?;
        let mut settled = 0;
        for auction_id in ended {
            match self.directory.complete_auction(&auction_id).await {
                Ok(true) => settled += 1,
                Ok(false) => {}
                // 한 경매의 실패가 나머지 정산을 막지 않는다
                Err(e) => error!(
                    "{:<12} --> 경매 종료 처리 실패 id: {}, {:?}",
                    "Scheduler", auction_id, e
                ),
            }
        }
        if settled > 0 {
            debug!("{:<12} --> {}건 종료 처리", "Scheduler", settled);
        }
        Ok(settled)
    }
}

// endregion: --- Auction Scheduler


// endregion: --- Tests
