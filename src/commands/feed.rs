//! Position Feed
//!
//! Third-party tracking feed polled by the track view. Public, no bearer.

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use serde::Deserialize;

use super::http::{check_status, decode, transport, Auth};
use crate::error::{ApiError, ApiResult};
use crate::models::Position;

#[async_trait]
pub trait PositionFeed: Send + Sync {
    async fn current_position(&self) -> ApiResult<Position>;
}

#[derive(Deserialize)]
struct FeedResponse {
    iss_position: FeedPosition,
    timestamp: i64,
}

// The feed sends coordinates as strings
#[derive(Deserialize)]
struct FeedPosition {
    latitude: String,
    longitude: String,
}

pub struct OpenNotifyFeed {
    client: reqwest::Client,
    url: String,
}

impl OpenNotifyFeed {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }
}

#[async_trait]
impl PositionFeed for OpenNotifyFeed {
    async fn current_position(&self) -> ApiResult<Position> {
        let response = self.client.get(&self.url).send().await.map_err(transport)?;
        let response = check_status(response, Auth::Anonymous).await?;
        let body: FeedResponse = decode(response).await?;
        into_position(body)
    }
}

fn into_position(body: FeedResponse) -> ApiResult<Position> {
    let latitude = parse_coordinate(&body.iss_position.latitude)?;
    let longitude = parse_coordinate(&body.iss_position.longitude)?;
    let timestamp = Utc
        .timestamp_opt(body.timestamp, 0)
        .single()
        .ok_or_else(|| ApiError::Decode(format!("bad timestamp {}", body.timestamp)))?;

    Ok(Position {
        latitude,
        longitude,
        timestamp,
    })
}

fn parse_coordinate(raw: &str) -> ApiResult<f64> {
    raw.trim()
        .parse::<f64>()
        .map_err(|_| ApiError::Decode(format!("bad coordinate {:?}", raw)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feed_payload_parsed() {
        let body: FeedResponse = serde_json::from_str(
            r#"{"message":"success","timestamp":1700000000,"iss_position":{"latitude":"-12.5000","longitude":"101.25"}}"#,
        )
        .unwrap();
        let position = into_position(body).unwrap();

        assert_eq!(position.latitude, -12.5);
        assert_eq!(position.longitude, 101.25);
        assert_eq!(position.timestamp.timestamp(), 1_700_000_000);
    }

    #[test]
    fn test_bad_coordinate_is_decode_error() {
        let body = FeedResponse {
            iss_position: FeedPosition {
                latitude: "north".to_string(),
                longitude: "0".to_string(),
            },
            timestamp: 0,
        };
        assert!(matches!(into_position(body), Err(ApiError::Decode(_))));
    }
}
