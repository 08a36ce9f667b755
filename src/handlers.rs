// region:    --- Imports
use crate::auction::model::{Auction, AuctionStatus, NewAuction};
use crate::directory::commands::{PlaceBidCommand, PostMessageCommand, ReviewCommand};
use crate::error::AppError;
use crate::identity::manager::{SignInCommand, SignUpCommand};
use crate::identity::model::Session;
use crate::imagegen::ImageRequest;
use crate::state::AppState;
use axum::extract::{DefaultBodyLimit, Path, State};
use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderMap, StatusCode};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::IntoResponse;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_stream::{Stream, StreamExt};
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

// endregion: --- Imports

type SharedState = State<Arc<AppState>>;

// region:    --- Router
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/auth/signup", post(handle_sign_up))
        .route("/auth/login", post(handle_sign_in))
        .route("/auth/logout", post(handle_sign_out))
        .route("/auth/session", get(handle_get_session))
        .route(
            "/auctions",
            get(handle_get_auctions).post(handle_create_auction),
        )
        .route(
            "/auctions/:id",
            get(handle_get_auction).delete(handle_delete_auction),
        )
        .route(
            "/auctions/:id/bids",
            get(handle_get_auction_bids).post(handle_bid),
        )
        .route("/auctions/:id/status", put(handle_update_status))
        .route("/auctions/:id/reviews", post(handle_submit_review))
        .route(
            "/auctions/:id/messages",
            get(handle_get_messages).post(handle_post_message),
        )
        .route("/stream/auctions", get(handle_stream_auctions))
        .route("/stream/auctions/:id", get(handle_stream_auction))
        .route(
            "/stream/auctions/:id/messages",
            get(handle_stream_messages),
        )
        .route("/users", get(handle_get_users))
        .route("/users/:id", get(handle_get_user))
        .route("/users/:id/bids", get(handle_get_user_bids))
        .route("/users/:id/reviews", get(handle_get_user_reviews))
        .route("/images/generate", post(handle_generate_image))
        .layer(cors)
        .layer(DefaultBodyLimit::max(1024 * 1024))
        .with_state(state)
}

// endregion: --- Router

// region:    --- Session
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
}

/// 요청 헤더의 토큰으로 세션 확인
async fn require_session(state: &AppState, headers: &HeaderMap) -> Result<Session, AppError> {
    let token = bearer_token(headers).ok_or_else(|| AppError::auth("로그인이 필요합니다."))?;
    state
        .identity
        .current_session(token)
        .await?
        .ok_or_else(|| AppError::auth("세션이 만료되었습니다. 다시 로그인해 주세요."))
}

fn auction_not_found(auction_id: &str) -> AppError {
    AppError::not_found(format!("경매를 찾을 수 없습니다: {auction_id}"))
}

// endregion: --- Session

// region:    --- Auth Handlers
/// 가입
pub async fn handle_sign_up(
    State(state): SharedState,
    Json(cmd): Json<SignUpCommand>,
) -> Result<impl IntoResponse, AppError> {
    let session = state.identity.sign_up(cmd).await?;
    Ok((StatusCode::CREATED, Json(session)))
}

/// 로그인
pub async fn handle_sign_in(
    State(state): SharedState,
    Json(cmd): Json<SignInCommand>,
) -> Result<Json<Session>, AppError> {
    Ok(Json(state.identity.sign_in(cmd).await?))
}

/// 로그아웃
pub async fn handle_sign_out(
    State(state): SharedState,
    headers: HeaderMap,
) -> Result<StatusCode, AppError> {
    if let Some(token) = bearer_token(&headers) {
        state.identity.sign_out(token).await?;
    }
    Ok(StatusCode::NO_CONTENT)
}

/// 현재 세션 조회
pub async fn handle_get_session(
    State(state): SharedState,
    headers: HeaderMap,
) -> Result<Json<Session>, AppError> {
    Ok(Json(require_session(&state, &headers).await?))
}

// endregion: --- Auth Handlers

// region:    --- Command Handlers
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BidRequest {
    pub amount: i64,
    /// 화면에 표시된 현재 최저가
    pub current_lowest_bid: i64,
    #[serde(default)]
    pub secret_key: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: AuctionStatus,
}

/// 경매 생성 (관리자)
pub async fn handle_create_auction(
    State(state): SharedState,
    headers: HeaderMap,
    Json(input): Json<NewAuction>,
) -> Result<impl IntoResponse, AppError> {
    let actor = require_session(&state, &headers).await?;
    let auction = state.directory.create_auction(&actor, input).await?;
    Ok((StatusCode::CREATED, Json(auction)))
}

/// 입찰 요청 처리. 입찰자는 세션에서 가져온다
pub async fn handle_bid(
    State(state): SharedState,
    Path(auction_id): Path<String>,
    headers: HeaderMap,
    Json(req): Json<BidRequest>,
) -> Result<impl IntoResponse, AppError> {
    let actor = require_session(&state, &headers).await?;
    info!(
        "{:<12} --> 입찰 요청: auction={}, bidder={}",
        "Handler", auction_id, actor.user_id
    );

    let bid = state
        .directory
        .submit_bid(PlaceBidCommand {
            auction_id,
            bidder_id: actor.user_id,
            bidder_name: actor.display_name,
            amount: req.amount,
            known_lowest_bid: req.current_lowest_bid,
            secret_key: req.secret_key,
        })
        .await?;
    Ok((StatusCode::OK, Json(bid)))
}

/// 상태 전이 (관리자)
pub async fn handle_update_status(
    State(state): SharedState,
    Path(auction_id): Path<String>,
    headers: HeaderMap,
    Json(req): Json<StatusRequest>,
) -> Result<Json<Auction>, AppError> {
    let actor = require_session(&state, &headers).await?;
    Ok(Json(
        state
            .directory
            .update_auction_status(&actor, &auction_id, req.status)
            .await?,
    ))
}

/// 경매 삭제 (관리자)
pub async fn handle_delete_auction(
    State(state): SharedState,
    Path(auction_id): Path<String>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    let actor = require_session(&state, &headers).await?;
    let summary = state.directory.delete_auction(&actor, &auction_id).await?;
    Ok(Json(summary))
}

/// 후기 작성
pub async fn handle_submit_review(
    State(state): SharedState,
    Path(auction_id): Path<String>,
    headers: HeaderMap,
    Json(cmd): Json<ReviewCommand>,
) -> Result<impl IntoResponse, AppError> {
    let actor = require_session(&state, &headers).await?;
    let review = state
        .directory
        .submit_review(&actor, &auction_id, cmd)
        .await?;
    Ok((StatusCode::CREATED, Json(review)))
}

/// 채팅 작성
pub async fn handle_post_message(
    State(state): SharedState,
    Path(auction_id): Path<String>,
    headers: HeaderMap,
    Json(cmd): Json<PostMessageCommand>,
) -> Result<impl IntoResponse, AppError> {
    let actor = require_session(&state, &headers).await?;
    let message = state
        .directory
        .post_message(&actor, &auction_id, cmd)
        .await?;
    Ok((StatusCode::CREATED, Json(message)))
}

/// 이미지 생성
pub async fn handle_generate_image(
    State(state): SharedState,
    Json(req): Json<ImageRequest>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.images.generate(req).await?))
}

// endregion: --- Command Handlers

// region:    --- Query Handlers
/// 모든 경매 조회
pub async fn handle_get_auctions(State(state): SharedState) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.directory.list_auctions().await?))
}

/// 경매 조회
pub async fn handle_get_auction(
    State(state): SharedState,
    Path(auction_id): Path<String>,
) -> Result<Json<Auction>, AppError> {
    state
        .directory
        .get_auction_by_id(&auction_id)
        .await?
        .map(Json)
        .ok_or_else(|| auction_not_found(&auction_id))
}

/// 경매 입찰 조회
pub async fn handle_get_auction_bids(
    State(state): SharedState,
    Path(auction_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.directory.get_bids_for_auction(&auction_id).await?))
}

/// 경매 채팅 조회
pub async fn handle_get_messages(
    State(state): SharedState,
    Path(auction_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.directory.list_messages(&auction_id).await?))
}

/// 사용자 목록 (관리자)
pub async fn handle_get_users(
    State(state): SharedState,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    let actor = require_session(&state, &headers).await?;
    Ok(Json(state.identity.list_profiles(&actor).await?))
}

/// 사용자 프로필 조회
pub async fn handle_get_user(
    State(state): SharedState,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    state
        .identity
        .get_user_profile(&user_id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found(format!("사용자를 찾을 수 없습니다: {user_id}")))
}

/// 사용자 입찰 조회
pub async fn handle_get_user_bids(
    State(state): SharedState,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.directory.get_bids_for_user(&user_id).await?))
}

/// 사용자 후기 조회
pub async fn handle_get_user_reviews(
    State(state): SharedState,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.directory.get_reviews_for_user(&user_id).await?))
}

// endregion: --- Query Handlers

// region:    --- Stream Handlers
/// 경매 목록 실시간 스트림 (SSE)
/// 클라이언트 연결이 끊기면 스트림과 함께 구독 핸들이 drop 되어 구독이 해지된다
pub async fn handle_stream_auctions(
    State(state): SharedState,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    info!("{:<12} --> 경매 목록 스트림 연결", "HandlerSSE");
    let (tx, rx) = mpsc::unbounded_channel();
    let subscription = state.directory.subscribe_auctions(move |auctions| {
        let _ = tx.send(auctions);
    });

    let stream = UnboundedReceiverStream::new(rx).map(move |auctions| {
        let _subscription = &subscription;
        Event::default().event("auctions").json_data(auctions)
    });
    Sse::new(stream).keep_alive(KeepAlive::default())
}

/// 단일 경매 실시간 스트림 (SSE). 삭제되면 deleted 이벤트 후 종료
pub async fn handle_stream_auction(
    State(state): SharedState,
    Path(auction_id): Path<String>,
) -> Result<Sse<impl Stream<Item = Result<Event, axum::Error>>>, AppError> {
    info!("{:<12} --> 경매 스트림 연결 id: {}", "HandlerSSE", auction_id);
    let (tx, rx) = mpsc::unbounded_channel();
    let subscription = state
        .directory
        .subscribe_to_auction(&auction_id, move |auction| {
            let _ = tx.send(auction);
        })
        .await?;

    let stream = UnboundedReceiverStream::new(rx).map(move |auction| {
        let _subscription = &subscription;
        match auction {
            Some(auction) => Event::default().event("auction").json_data(auction),
            None => Ok(Event::default().event("deleted").data(auction_id.as_str())),
        }
    });
    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

/// 경매 채팅 실시간 스트림 (SSE)
pub async fn handle_stream_messages(
    State(state): SharedState,
    Path(auction_id): Path<String>,
) -> Result<Sse<impl Stream<Item = Result<Event, axum::Error>>>, AppError> {
    let (tx, rx) = mpsc::unbounded_channel();
    let subscription = state
        .directory
        .subscribe_messages(&auction_id, move |messages| {
            let _ = tx.send(messages);
        })
        .await?;

    let stream = UnboundedReceiverStream::new(rx).map(move |messages| {
        let _subscription = &subscription;
        Event::default().event("messages").json_data(messages)
    });
    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

// endregion: --- Stream Handlers
