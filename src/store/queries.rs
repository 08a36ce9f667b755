/// 경매 컬럼 목록
macro_rules! auction_columns {
    () => {
        "id, title, description, current_lowest_bid, start_time, end_time, secret_key, status, winner_id, winner_review, admin_review, created_by, created_at, updated_at"
    };
}

/// 경매 생성
pub const INSERT_AUCTION: &str = concat!(
    "INSERT INTO auctions (id, title, description, current_lowest_bid, start_time, end_time, secret_key, status, created_by, created_at, updated_at)
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, now(), now())
    RETURNING ",
    auction_columns!()
);

/// 경매 조회
pub const GET_AUCTION: &str = concat!("SELECT ", auction_columns!(), " FROM auctions WHERE id = $1");

/// 모든 경매 조회
pub const LIST_AUCTIONS: &str = concat!(
    "SELECT ",
    auction_columns!(),
    " FROM auctions ORDER BY start_time DESC"
);

/// 종료 시각이 지난 미정산 경매
pub const LIST_UNSETTLED_ENDED: &str =
    "SELECT id FROM auctions WHERE status <> 'COMPLETED' AND end_time <= $1";

/// 최저가 조건부 갱신 (역경매: 더 낮은 금액만 허용, 종료 시각 이후 불가)
pub const LOWER_CURRENT_BID: &str = r#"
    UPDATE auctions SET current_lowest_bid = $1, updated_at = now()
    WHERE id = $2 AND current_lowest_bid > $1 AND status <> 'COMPLETED' AND end_time > now()
    RETURNING current_lowest_bid
"#;

/// 입찰 거절 사유 조회 (현재 최저가, 종료 여부)
pub const GET_BID_STATE: &str = r#"
    SELECT current_lowest_bid, (status = 'COMPLETED' OR end_time <= now()) AS closed
    FROM auctions WHERE id = $1
"#;

/// 입찰자 문서 upsert
pub const UPSERT_BID: &str = r#"
    INSERT INTO bids (id, auction_id, auction_title, bidder_id, bidder_name, amount, bid_time)
    VALUES ($1, $2, $3, $4, $5, $6, now())
    ON CONFLICT (auction_id, bidder_id) DO UPDATE
    SET amount = EXCLUDED.amount,
        bidder_name = EXCLUDED.bidder_name,
        auction_title = EXCLUDED.auction_title,
        bid_time = EXCLUDED.bid_time
    RETURNING id, auction_id, auction_title, bidder_id, bidder_name, amount, bid_time
"#;

/// 경매 입찰 조회 (입찰가 오름차순)
pub const GET_AUCTION_BIDS: &str = r#"
    SELECT id, auction_id, auction_title, bidder_id, bidder_name, amount, bid_time
    FROM bids
    WHERE auction_id = $1
    ORDER BY amount ASC, bid_time ASC
"#;

/// 입찰자 입찰 조회
pub const GET_BIDDER_BID: &str = r#"
    SELECT id, auction_id, auction_title, bidder_id, bidder_name, amount, bid_time
    FROM bids
    WHERE auction_id = $1 AND bidder_id = $2
"#;

/// 종료 전이 전 경매 행 잠금 (진행 중인 입찰 쓰기와 직렬화)
pub const LOCK_AUCTION_STATUS: &str = "SELECT status FROM auctions WHERE id = $1 FOR UPDATE";

/// 낙찰 입찰 (양수 최저가, 같은 금액이면 먼저 입찰한 쪽)
pub const GET_WINNING_BID: &str = r#"
    SELECT id, auction_id, auction_title, bidder_id, bidder_name, amount, bid_time
    FROM bids
    WHERE auction_id = $1 AND amount > 0
    ORDER BY amount ASC, bid_time ASC
    LIMIT 1
"#;

/// 종료 전이 (이미 종료된 경매는 건드리지 않음)
pub const COMPLETE_AUCTION: &str = r#"
    UPDATE auctions SET status = 'COMPLETED', winner_id = $2, updated_at = now()
    WHERE id = $1 AND status <> 'COMPLETED'
    RETURNING id
"#;

/// 낙찰 목록에 중복 없이 추가
pub const APPEND_WON_AUCTION: &str = r#"
    UPDATE profiles SET won_auctions = array_append(won_auctions, $1)
    WHERE id = $2 AND NOT ($1 = ANY(won_auctions))
"#;

/// 낙찰자 후기 기록
pub const SET_WINNER_REVIEW: &str =
    "UPDATE auctions SET winner_review = $2, updated_at = now() WHERE id = $1";

/// 관리자 후기 기록
pub const SET_ADMIN_REVIEW: &str =
    "UPDATE auctions SET admin_review = $2, updated_at = now() WHERE id = $1";

/// 연쇄 삭제
pub const DELETE_AUCTION_BIDS: &str = "DELETE FROM bids WHERE auction_id = $1";
pub const DELETE_AUCTION_MESSAGES: &str = "DELETE FROM messages WHERE auction_id = $1";
pub const DELETE_AUCTION: &str = "DELETE FROM auctions WHERE id = $1";
pub const LOCK_AUCTION: &str = "SELECT id FROM auctions WHERE id = $1 FOR UPDATE";

/// 채팅 작성 중 삭제 방지
pub const SHARE_LOCK_AUCTION: &str = "SELECT id FROM auctions WHERE id = $1 FOR SHARE";

/// 채팅 메시지 작성
pub const INSERT_MESSAGE: &str = r#"
    INSERT INTO messages (id, auction_id, text, sender_id, sender_name, sender_photo)
    VALUES ($1, $2, $3, $4, $5, $6)
    RETURNING id, auction_id, text, sender_id, sender_name, sender_photo, created_at
"#;

/// 채팅 메시지 조회 (작성 순)
pub const LIST_MESSAGES: &str = r#"
    SELECT id, auction_id, text, sender_id, sender_name, sender_photo, created_at
    FROM messages
    WHERE auction_id = $1
    ORDER BY created_at ASC
"#;

/// 계정 생성 (이메일 중복이면 아무것도 하지 않음)
pub const INSERT_IDENTITY: &str = r#"
    INSERT INTO identities (uid, email, password_hash)
    VALUES ($1, $2, $3)
    ON CONFLICT (email) DO NOTHING
    RETURNING uid
"#;

/// 프로필 생성
pub const INSERT_PROFILE: &str = r#"
    INSERT INTO profiles (id, email, display_name, role, created_at, won_auctions)
    VALUES ($1, $2, $3, $4, now(), '{}')
    RETURNING id, email, display_name, role, created_at, won_auctions
"#;

pub const FIND_IDENTITY: &str = "SELECT uid, email, password_hash FROM identities WHERE email = $1";

pub const GET_PROFILE: &str =
    "SELECT id, email, display_name, role, created_at, won_auctions FROM profiles WHERE id = $1";

pub const LIST_PROFILES: &str =
    "SELECT id, email, display_name, role, created_at, won_auctions FROM profiles ORDER BY created_at DESC";

pub const INSERT_SESSION: &str = r#"
    INSERT INTO sessions (token, user_id, email, display_name, role, created_at)
    VALUES ($1, $2, $3, $4, $5, $6)
"#;

pub const GET_SESSION: &str =
    "SELECT token, user_id, email, display_name, role, created_at FROM sessions WHERE token = $1";

pub const DELETE_SESSION: &str = r#"
    DELETE FROM sessions WHERE token = $1
    RETURNING token, user_id, email, display_name, role, created_at
"#;
