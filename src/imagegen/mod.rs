/// 경매 대표 이미지 생성
/// 외부 생성 엔드포인트에 제목/설명으로 만든 프롬프트를 보내고 data URI 를 돌려준다.
// region:    --- Imports
use crate::error::AppError;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

// endregion: --- Imports

// region:    --- Models
#[derive(Debug, Clone, Deserialize)]
pub struct ImageRequest {
    pub title: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ImageResponse {
    pub image_url: String,
}

#[derive(Serialize)]
struct GenerationRequest<'a> {
    prompt: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerationResponse {
    media: Option<GeneratedMedia>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeneratedMedia {
    url: Option<String>,
}

// endregion: --- Models

// region:    --- Image Generator
pub struct ImageGenerator {
    client: Client,
    endpoint: Option<String>,
    api_key: Option<String>,
}

impl ImageGenerator {
    pub fn new(endpoint: Option<String>, api_key: Option<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint,
            api_key,
        }
    }

    pub async fn generate(&self, request: ImageRequest) -> Result<ImageResponse, AppError> {
        let endpoint = self
            .endpoint
            .as_deref()
            .ok_or_else(|| AppError::ImageGeneration("생성 엔드포인트가 설정되지 않았습니다.".to_string()))?;
        info!("{:<12} --> 이미지 생성 요청: {}", "ImageGen", request.title);

        let prompt = build_prompt(&request);
        let mut http = self
            .client
            .post(endpoint)
            .json(&GenerationRequest { prompt: &prompt });
        if let Some(key) = &self.api_key {
            http = http.bearer_auth(key);
        }

        let response = http
            .send()
            .await
            .map_err(|e| AppError::ImageGeneration(e.to_string()))?
            .error_for_status()
            .map_err(|e| AppError::ImageGeneration(e.to_string()))?;

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let body = response
            .bytes()
            .await
            .map_err(|e| AppError::ImageGeneration(e.to_string()))?;

        let image_url = media_from_body(&content_type, &body)?;
        Ok(ImageResponse { image_url })
    }
}

fn build_prompt(request: &ImageRequest) -> String {
    format!(
        "Generate a realistic product photo for an auction listing.\nTitle: {}\nDescription: {}",
        request.title.trim(),
        request.description.trim()
    )
}

/// 이미지 바이트는 data URI 로 감싸고, JSON 은 media.url 을 꺼낸다
fn media_from_body(content_type: &str, body: &[u8]) -> Result<String, AppError> {
    let mime = content_type.split(';').next().unwrap_or_default().trim();
    if mime.starts_with("image/") {
        if body.is_empty() {
            return Err(AppError::ImageGeneration("생성된 이미지가 없습니다.".to_string()));
        }
        return Ok(format!("data:{mime};base64,{}", STANDARD.encode(body)));
    }

    let parsed: GenerationResponse = serde_json::from_slice(body)
        .map_err(|e| AppError::ImageGeneration(format!("응답 해석 실패: {e}")))?;
    match parsed.media.and_then(|media| media.url) {
        Some(url) if !url.is_empty() => Ok(url),
        _ => {
            warn!("{:<12} --> 응답에 이미지가 없음", "ImageGen");
            Err(AppError::ImageGeneration("생성된 이미지가 없습니다.".to_string()))
        }
    }
}

// endregion: --- Image Generator


// endregion: --- Tests
