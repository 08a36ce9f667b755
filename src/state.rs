// region:    --- Imports
use crate::config::Config;
use crate::database::DatabaseManager;
use crate::directory::AuctionDirectory;
use crate::error::AppError;
use crate::feed::ChangeHub;
use crate::identity::IdentityManager;
use crate::imagegen::ImageGenerator;
use crate::message_broker::{KafkaRelay, CHANGES_TOPIC};
use crate::scheduler::AuctionScheduler;
use crate::store::{AccountStore, AuctionStore, MemoryStore, PostgresStore};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::info;

// endregion: --- Imports

// region:    --- App State
/// 핸들러에 주입되는 애플리케이션 상태
pub struct AppState {
    pub config: Config,
    pub directory: Arc<AuctionDirectory>,
    pub identity: Arc<IdentityManager>,
    pub images: ImageGenerator,
    auctions: Arc<dyn AuctionStore>,
}

impl AppState {
    /// 설정에 따라 저장소와 변경 중계를 구성
    pub async fn new(config: Config) -> Result<Arc<Self>, AppError> {
        let (auctions, accounts): (Arc<dyn AuctionStore>, Arc<dyn AccountStore>) =
            match &config.database_url {
                Some(url) => {
                    let db_manager = Arc::new(
                        DatabaseManager::connect(url, config.database_max_connections).await?,
                    );
                    db_manager.initialize_database().await?;
                    let store = Arc::new(PostgresStore::new(db_manager));
                    info!("{:<12} --> PostgreSQL 저장소 사용", "State");
                    let auctions: Arc<dyn AuctionStore> = store.clone();
                    let accounts: Arc<dyn AccountStore> = store;
                    (auctions, accounts)
                }
                None => {
                    let store = Arc::new(MemoryStore::new());
                    info!("{:<12} --> 인메모리 저장소 사용", "State");
                    let auctions: Arc<dyn AuctionStore> = store.clone();
                    let accounts: Arc<dyn AccountStore> = store;
                    (auctions, accounts)
                }
            };

        let mut hub = ChangeHub::new();
        if let Some(brokers) = &config.kafka_brokers {
            let relay = KafkaRelay::new(brokers)?;
            relay.create_topic(CHANGES_TOPIC, 5, 1).await?;
            let (relay_tx, relay_rx) = mpsc::unbounded_channel();
            hub = hub.with_relay(relay_tx);
            relay.start(relay_rx, hub.clone());
            info!("{:<12} --> Kafka 변경 중계 시작: {}", "State", brokers);
        }

        Ok(Self::assemble(config, auctions, accounts, hub))
    }

    /// 인메모리 저장소 + 로컬 허브 (테스트 / 로컬 실행)
    pub fn in_memory(config: Config) -> Arc<Self> {
        let store = Arc::new(MemoryStore::new());
        Self::assemble(config, store.clone(), store, ChangeHub::new())
    }

    fn assemble(
        config: Config,
        auctions: Arc<dyn AuctionStore>,
        accounts: Arc<dyn AccountStore>,
        hub: ChangeHub,
    ) -> Arc<Self> {
        let directory = Arc::new(AuctionDirectory::new(Arc::clone(&auctions), hub));
        let identity = Arc::new(IdentityManager::new(accounts, config.admin_email.clone()));
        let images = ImageGenerator::new(
            config.image_gen_url.clone(),
            config.image_gen_api_key.clone(),
        );
        Arc::new(Self {
            config,
            directory,
            identity,
            images,
            auctions,
        })
    }

    /// 경매 종료 스케줄러
    pub fn scheduler(&self) -> AuctionScheduler {
        AuctionScheduler::new(Arc::clone(&self.auctions), Arc::clone(&self.directory))
    }
}

// endregion: --- App State
