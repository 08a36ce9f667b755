use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

// region:    --- Auction Status
/// 경매 상태 (시작 예정 -> 진행 중 -> 종료, 역방향 전이 없음)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AuctionStatus {
    StartingSoon,
    Live,
    Completed,
}

impl AuctionStatus {
    /// 저장소 컬럼 값
    pub fn as_str(&self) -> &'static str {
        match self {
            AuctionStatus::StartingSoon => "STARTING_SOON",
            AuctionStatus::Live => "LIVE",
            AuctionStatus::Completed => "COMPLETED",
        }
    }
}

impl fmt::Display for AuctionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuctionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "STARTING_SOON" => Ok(AuctionStatus::StartingSoon),
            "LIVE" => Ok(AuctionStatus::Live),
            "COMPLETED" => Ok(AuctionStatus::Completed),
            other => Err(format!("알 수 없는 경매 상태: {other}")),
        }
    }
}

/// 시작/종료 시각과 현재 시각으로 상태 계산
pub fn derive_status(
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    now: DateTime<Utc>,
) -> AuctionStatus {
    if now < start_time {
        AuctionStatus::StartingSoon
    } else if now >= end_time {
        AuctionStatus::Completed
    } else {
        AuctionStatus::Live
    }
}

// endregion: --- Auction Status

// region:    --- Auction
/// 경매 문서
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Auction {
    pub id: String,
    pub title: String,
    pub description: String,
    pub current_lowest_bid: i64,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    /// 비공개 경매 키. 외부로는 공개 여부만 노출
    #[serde(rename = "isPrivate", serialize_with = "serialize_is_private")]
    pub secret_key: Option<String>,
    pub status: AuctionStatus,
    pub winner_id: Option<String>,
    pub winner_review: Option<Review>,
    pub admin_review: Option<Review>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn serialize_is_private<S: Serializer>(key: &Option<String>, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_bool(key.is_some())
}

impl Auction {
    /// 종료 처리가 끝난 경매는 시간과 무관하게 종료 상태 유지
    pub fn effective_status(&self, now: DateTime<Utc>) -> AuctionStatus {
        match self.status {
            AuctionStatus::Completed => AuctionStatus::Completed,
            _ => derive_status(self.start_time, self.end_time, now),
        }
    }

    /// 읽기 시점 상태를 반영한 사본
    pub fn with_derived_status(mut self, now: DateTime<Utc>) -> Self {
        self.status = self.effective_status(now);
        self
    }

    pub fn is_private(&self) -> bool {
        self.secret_key.is_some()
    }

    /// 비공개 경매 키 확인 (공개 경매는 항상 통과)
    pub fn unlocks_with(&self, key: Option<&str>) -> bool {
        match &self.secret_key {
            None => true,
            Some(secret) => key == Some(secret.as_str()),
        }
    }
}

/// 경매 생성 입력
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAuction {
    pub title: String,
    pub description: String,
    /// 시작(최대) 입찰가
    pub starting_bid: i64,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    #[serde(default)]
    pub secret_key: Option<String>,
}

// endregion: --- Auction

// region:    --- Bid
/// 입찰 문서. (경매, 입찰자) 당 하나만 존재
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bid {
    pub id: String,
    pub auction_id: String,
    pub auction_title: String,
    pub bidder_id: String,
    pub bidder_name: String,
    pub amount: i64,
    pub timestamp: DateTime<Utc>,
}

/// 양수 입찰가 중 최저가 입찰자를 낙찰자로 선정 (같은 금액이면 먼저 입찰한 쪽)
pub fn determine_winner<'a, I>(bids: I) -> Option<&'a Bid>
where
    I: IntoIterator<Item = &'a Bid>,
{
    bids.into_iter()
        .filter(|bid| bid.amount > 0)
        .min_by_key(|bid| (bid.amount, bid.timestamp))
}

// endregion: --- Bid

// region:    --- Review
/// 후기 슬롯
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ReviewSlot {
    /// 낙찰자가 관리자에게 남기는 후기
    WinnerReview,
    /// 관리자가 낙찰자에게 남기는 후기
    AdminReview,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub rating: u8,
    pub comment: String,
    pub reviewer_id: String,
    pub reviewer_name: String,
    pub reviewed_user_id: String,
    pub timestamp: DateTime<Utc>,
}

// endregion: --- Review

// region:    --- Chat Message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: String,
    pub auction_id: String,
    pub text: String,
    pub sender_id: String,
    pub sender_name: String,
    pub sender_photo: Option<String>,
    pub timestamp: DateTime<Utc>,
}

// endregion: --- Chat Message


// endregion: --- Tests
