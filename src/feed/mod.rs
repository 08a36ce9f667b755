/// 변경 알림 허브
/// 저장소 쓰기가 커밋된 뒤 발행되는 ChangeEvent 를 구독자에게 전달한다.
/// Kafka 중계가 붙어 있으면 로컬 이벤트를 다른 인스턴스로도 보낸다.
// region:    --- Imports
use crate::auction::events::ChangeEvent;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

// endregion: --- Imports

const HUB_CAPACITY: usize = 256;

// region:    --- Change Hub
#[derive(Clone)]
pub struct ChangeHub {
    tx: broadcast::Sender<ChangeEvent>,
    relay: Option<mpsc::UnboundedSender<ChangeEvent>>,
}

impl Default for ChangeHub {
    fn default() -> Self {
        Self::new()
    }
}

impl ChangeHub {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(HUB_CAPACITY);
        Self { tx, relay: None }
    }

    /// 로컬 이벤트를 외부 중계로도 보내도록 연결
    pub fn with_relay(mut self, relay: mpsc::UnboundedSender<ChangeEvent>) -> Self {
        self.relay = Some(relay);
        self
    }

    /// 이 인스턴스에서 발생한 변경 발행
    pub fn publish(&self, event: ChangeEvent) {
        debug!("{:<12} --> 변경 발행: {:?}", "ChangeHub", event);
        if let Some(relay) = &self.relay {
            if relay.send(event.clone()).is_err() {
                warn!("{:<12} --> 중계 채널이 닫혀 있음", "ChangeHub");
            }
        }
        // 구독자가 없으면 실패하지만 무시
        let _ = self.tx.send(event);
    }

    /// 다른 인스턴스에서 중계된 변경 발행 (재중계하지 않음)
    pub fn publish_remote(&self, event: ChangeEvent) {
        debug!("{:<12} --> 원격 변경 수신: {:?}", "ChangeHub", event);
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.tx.subscribe()
    }
}

// endregion: --- Change Hub

// region:    --- Subscription
/// 실시간 구독 핸들. unsubscribe 하거나 drop 하면 콜백이 멈춘다.
#[derive(Debug)]
#[must_use = "구독 핸들을 버리면 구독이 즉시 해지됩니다"]
pub struct Subscription {
    handle: JoinHandle<()>,
}

impl Subscription {
    pub fn new(handle: JoinHandle<()>) -> Self {
        Self { handle }
    }

    pub fn unsubscribe(self) {
        self.handle.abort();
    }

    /// 구독 태스크가 아직 살아 있는지
    #[cfg(test)]
    pub(crate) fn is_active(&self) -> bool {
        !self.handle.is_finished()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

// endregion: --- Subscription


// endregion: --- Tests
