use serde::{Deserialize, Serialize};

/// 저장소 변경 알림 이벤트
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ChangeEvent {
    // 경매 생성/수정 (상태 전이, 후기 포함)
    AuctionUpserted { auction_id: String },
    // 경매 및 하위 문서 삭제
    AuctionDeleted { auction_id: String },
    // 입찰 (최저가 갱신)
    BidPlaced {
        auction_id: String,
        bidder_id: String,
    },
    // 채팅 메시지
    MessagePosted { auction_id: String },
}

impl ChangeEvent {
    pub fn auction_id(&self) -> &str {
        match self {
            ChangeEvent::AuctionUpserted { auction_id }
            | ChangeEvent::AuctionDeleted { auction_id }
            | ChangeEvent::BidPlaced { auction_id, .. }
            | ChangeEvent::MessagePosted { auction_id } => auction_id,
        }
    }

    /// 경매 문서 자체에 영향을 주는 이벤트인지
    pub fn touches_auction(&self) -> bool {
        !matches!(self, ChangeEvent::MessagePosted { .. })
    }
}
