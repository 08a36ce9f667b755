// region:    --- Imports
use reverse_auction::config::Config;
use reverse_auction::handlers;
use reverse_auction::state::AppState;
use tokio::net::TcpListener;
use tracing::{error, info};

// endregion: --- Imports

// region:    --- Main
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // logging 초기화
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .without_time()
        .with_target(false)
        .init();

    let config = Config::load();
    let port = config.port;

    // 저장소, 디렉터리, 인증 관리자 구성
    let state = match AppState::new(config).await {
        Ok(state) => state,
        Err(e) => {
            error!("{:<12} --> 서비스 초기화 실패: {:?}", "Main", e);
            return Err(e.into());
        }
    };
    info!("{:<12} --> 서비스 초기화 성공", "Main");

    // 종료 시각이 지난 경매 정산
    state.scheduler().start();

    let routes_all = handlers::router(state);

    let listener = TcpListener::bind(("0.0.0.0", port)).await?;
    info!(
        "{:<12} --> Web Server: Listening on {}",
        "Main",
        listener.local_addr()?
    );

    // 서버 실행
    if let Err(err) = axum::serve(listener, routes_all.into_make_service()).await {
        error!("{:<12} --> Server error: {}", "Main", err);
    }
    Ok(())
}
// endregion: --- Main
