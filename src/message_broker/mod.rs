/// Kafka 변경 중계
/// 여러 인스턴스가 같은 저장소를 쓸 때 한 인스턴스의 변경 알림을 다른 인스턴스 구독자에게 전달한다.
// region:    --- Imports
use crate::auction::events::ChangeEvent;
use crate::error::AppError;
use crate::feed::ChangeHub;
use rdkafka::admin::{AdminClient, AdminOptions, NewTopic, TopicReplication};
use rdkafka::client::DefaultClientContext;
use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::message::Message;
use rdkafka::producer::{FutureProducer, FutureRecord};
use rdkafka::ClientConfig;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

// endregion: --- Imports

pub const CHANGES_TOPIC: &str = "auction-changes";

/// 발행 인스턴스를 표시한 변경 이벤트
#[derive(Debug, Serialize, Deserialize)]
pub struct RelayEnvelope {
    pub origin: String,
    pub event: ChangeEvent,
}

// region:    --- Kafka Producer
#[derive(Clone)]
pub struct KafkaProducer {
    producer: Arc<FutureProducer>,
}

/// KafkaProducer 구현
impl KafkaProducer {
    pub fn new(brokers: &str) -> Result<Self, AppError> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", brokers)
            .set("message.timeout.ms", "5000")
            .create()?;

        Ok(KafkaProducer {
            producer: Arc::new(producer),
        })
    }

    /// 메시지 전송
    pub async fn send_message(&self, topic: &str, key: &str, value: &str) -> Result<(), String> {
        debug!(
            "{:<12} --> Kafka 메시지 전송: topic={}, key={}",
            "Producer", topic, key
        );
        let record = FutureRecord::to(topic).key(key).payload(value);

        self.producer
            .send(record, std::time::Duration::from_secs(0))
            .await
            .map_err(|(e, _)| format!("Error sending message: {:?}", e))?;

        Ok(())
    }
}

// endregion: --- Kafka Producer

// region:    --- Kafka Consumer
pub struct KafkaConsumer {
    consumer: Arc<StreamConsumer>,
}

/// KafkaConsumer 구현
impl KafkaConsumer {
    /// 인스턴스마다 고유한 group.id 로 모든 변경을 받는다
    pub fn new(brokers: &str, group_id: &str) -> Result<Self, AppError> {
        let consumer: StreamConsumer = ClientConfig::new()
            .set("bootstrap.servers", brokers)
            .set("group.id", group_id)
            .set("enable.auto.commit", "true")
            .set("auto.offset.reset", "latest")
            .set("session.timeout.ms", "6000")
            .set("allow.auto.create.topics", "true")
            .create()?;

        Ok(KafkaConsumer {
            consumer: Arc::new(consumer),
        })
    }

    /// 변경 이벤트 소비
    pub async fn consume_envelopes<F>(&self, topic: &str, handler: F) -> Result<(), AppError>
    where
        F: Fn(RelayEnvelope) + Send + 'static,
    {
        info!(
            "{:<12} --> Kafka 변경 소비 시작: topic={}",
            "Consumer", topic
        );
        self.consumer.subscribe(&[topic])?;

        loop {
            match self.consumer.recv().await {
                Ok(message) => {
                    debug!(
                        "{:<12} --> 메시지 수신: topic={}, partition={}, offset={}",
                        "Consumer",
                        message.topic(),
                        message.partition(),
                        message.offset()
                    );

                    if let Some(payload) = message.payload() {
                        match serde_json::from_slice::<RelayEnvelope>(payload) {
                            Ok(envelope) => handler(envelope),
                            Err(e) => error!("{:<12} --> deserialize 오류: {:?}", "Consumer", e),
                        }
                    } else {
                        warn!("{:<12} --> 빈 페이로드 수신", "Consumer");
                    }
                }
                Err(e) => error!("{:<12} --> 메시지 수신 오류: {:?}", "Consumer", e),
            }
        }
    }
}

// endregion: --- Kafka Consumer

// region:    --- Kafka Relay
pub struct KafkaRelay {
    instance_id: String,
    brokers: String,
    producer: KafkaProducer,
    consumer: Arc<KafkaConsumer>,
}

impl KafkaRelay {
    pub fn new(brokers: &str) -> Result<Self, AppError> {
        let instance_id = Uuid::new_v4().to_string();
        let group_id = format!("auction-changes-{instance_id}");
        Ok(Self {
            producer: KafkaProducer::new(brokers)?,
            consumer: Arc::new(KafkaConsumer::new(brokers, &group_id)?),
            brokers: brokers.to_string(),
            instance_id,
        })
    }

    /// 토픽 생성 (이미 있으면 경고만 남김)
    pub async fn create_topic(
        &self,
        topic_name: &str,
        num_partitions: i32,
        replication_factor: i32,
    ) -> Result<(), AppError> {
        info!("{:<12} --> Kafka 토픽 생성 시작: {}", "Relay", topic_name);

        let admin_client: AdminClient<DefaultClientContext> = ClientConfig::new()
            .set("bootstrap.servers", &self.brokers)
            .create()?;

        let new_topic = NewTopic::new(
            topic_name,
            num_partitions,
            TopicReplication::Fixed(replication_factor),
        );

        let results = admin_client
            .create_topics(&[new_topic], &AdminOptions::new())
            .await?;
        for result in results {
            match result {
                Ok(topic) => info!("{:<12} --> Kafka 토픽 생성 성공: {}", "Relay", topic),
                Err((topic, code)) => {
                    warn!("{:<12} --> Kafka 토픽 생성 건너뜀: {} ({:?})", "Relay", topic, code)
                }
            }
        }
        Ok(())
    }

    /// 로컬 변경 -> Kafka, Kafka(다른 인스턴스) -> 로컬 허브
    pub fn start(self, mut local: mpsc::UnboundedReceiver<ChangeEvent>, hub: ChangeHub) {
        let origin = self.instance_id.clone();
        let producer = self.producer.clone();
        tokio::spawn(async move {
            while let Some(event) = local.recv().await {
                let key = event.auction_id().to_string();
                let envelope = RelayEnvelope {
                    origin: origin.clone(),
                    event,
                };
                let payload = match serde_json::to_string(&envelope) {
                    Ok(payload) => payload,
                    Err(e) => {
                        error!("{:<12} --> serialize 오류: {:?}", "Relay", e);
                        continue;
                    }
                };
                if let Err(e) = producer.send_message(CHANGES_TOPIC, &key, &payload).await {
                    error!("{:<12} --> 변경 중계 실패: {}", "Relay", e);
                }
            }
        });

        let instance_id = self.instance_id;
        let consumer = Arc::clone(&self.consumer);
        tokio::spawn(async move {
            let result = consumer
                .consume_envelopes(CHANGES_TOPIC, move |envelope| {
                    if envelope.origin != instance_id {
                        hub.publish_remote(envelope.event);
                    }
                })
                .await;
            if let Err(e) = result {
                error!("{:<12} --> 변경 소비 오류: {:?}", "Relay", e);
            }
        });
    }
}

// endregion: --- Kafka Relay


// endregion: --- Tests
