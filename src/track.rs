//! Position Tracker
//!
//! Public view polling the position feed on a fixed interval. A failed poll
//! keeps the last good position and shows an error until the next success.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

use crate::commands::PositionFeed;
use crate::models::Position;

pub const FEED_ERROR: &str = "Failed to fetch ISS position. Please try again later.";

#[derive(Debug, Clone, PartialEq)]
pub struct TrackState {
    pub position: Option<Position>,
    /// True until the first poll settles
    pub loading: bool,
    pub error: Option<String>,
    pub updates: u64,
}

impl Default for TrackState {
    fn default() -> Self {
        Self {
            position: None,
            loading: true,
            error: None,
            updates: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Latitude,
    Longitude,
}

/// `12.3456° N`, four decimals, hemisphere from the sign
pub fn format_coordinate(value: f64, axis: Axis) -> String {
    let hemisphere = match (axis, value >= 0.0) {
        (Axis::Latitude, true) => "N",
        (Axis::Latitude, false) => "S",
        (Axis::Longitude, true) => "E",
        (Axis::Longitude, false) => "W",
    };
    format!("{:.4}° {}", value.abs(), hemisphere)
}

pub struct Tracker {
    feed: Arc<dyn PositionFeed>,
    interval: Duration,
    state: watch::Sender<TrackState>,
}

impl Tracker {
    pub fn new(feed: Arc<dyn PositionFeed>, interval: Duration) -> Self {
        Self {
            feed,
            interval,
            state: watch::Sender::new(TrackState::default()),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<TrackState> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> TrackState {
        self.state.borrow().clone()
    }

    pub async fn poll_once(&self) -> Option<Position> {
        match self.feed.current_position().await {
            Ok(position) => {
                tracing::debug!(
                    "Position {}, {}",
                    format_coordinate(position.latitude, Axis::Latitude),
                    format_coordinate(position.longitude, Axis::Longitude)
                );
                self.state.send_modify(|state| {
                    state.position = Some(position);
                    state.loading = false;
                    state.error = None;
                    state.updates += 1;
                });
                Some(position)
            }
            Err(e) => {
                tracing::warn!("Position feed failed: {}", e);
                self.state.send_modify(|state| {
                    state.loading = false;
                    state.error = Some(FEED_ERROR.to_string());
                });
                None
            }
        }
    }

    /// Poll immediately, then every interval, until `shutdown` resolves
    pub async fn run<F>(&self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = ticker.tick() => {
                    self.poll_once().await;
                }
            }
        }
        tracing::info!("Tracker stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};

    use crate::error::{ApiError, ApiResult};

    struct ScriptedFeed {
        replies: Mutex<VecDeque<ApiResult<Position>>>,
        polls: AtomicUsize,
    }

    impl ScriptedFeed {
        fn new(replies: Vec<ApiResult<Position>>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                polls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl PositionFeed for ScriptedFeed {
        async fn current_position(&self) -> ApiResult<Position> {
            self.polls.fetch_add(1, Ordering::SeqCst);
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(position(0.0, 0.0)))
        }
    }

    fn position(latitude: f64, longitude: f64) -> Position {
        Position {
            latitude,
            longitude,
            timestamp: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
        }
    }

    #[test]
    fn test_format_coordinate_hemispheres() {
        assert_eq!(format_coordinate(12.34567, Axis::Latitude), "12.3457° N");
        assert_eq!(format_coordinate(-0.5, Axis::Latitude), "0.5000° S");
        assert_eq!(format_coordinate(101.25, Axis::Longitude), "101.2500° E");
        assert_eq!(format_coordinate(-45.0, Axis::Longitude), "45.0000° W");
    }

    #[tokio::test]
    async fn test_failed_poll_keeps_last_position() {
        let feed = Arc::new(ScriptedFeed::new(vec![
            Ok(position(10.0, 20.0)),
            Err(ApiError::Transport("down".to_string())),
        ]));
        let tracker = Tracker::new(feed, Duration::from_secs(5));
        assert!(tracker.snapshot().loading);

        tracker.poll_once().await;
        tracker.poll_once().await;

        let state = tracker.snapshot();
        assert!(!state.loading);
        assert_eq!(state.position.map(|p| p.latitude), Some(10.0));
        assert_eq!(state.error.as_deref(), Some(FEED_ERROR));
        assert_eq!(state.updates, 1);
    }

    #[tokio::test]
    async fn test_success_clears_error() {
        let feed = Arc::new(ScriptedFeed::new(vec![
            Err(ApiError::Transport("down".to_string())),
            Ok(position(1.0, 2.0)),
        ]));
        let tracker = Tracker::new(feed, Duration::from_secs(5));

        tracker.poll_once().await;
        assert!(tracker.snapshot().position.is_none());
        tracker.poll_once().await;

        let state = tracker.snapshot();
        assert!(state.error.is_none());
        assert_eq!(state.position.map(|p| p.longitude), Some(2.0));
    }

    #[tokio::test]
    async fn test_run_polls_until_shutdown() {
        let feed = Arc::new(ScriptedFeed::new(Vec::new()));
        let tracker = Tracker::new(feed.clone(), Duration::from_millis(5));
        let mut updates = tracker.subscribe();

        tracker
            .run(async move {
                let _ = updates.wait_for(|s| s.updates >= 3).await;
            })
            .await;

        assert!(feed.polls.load(Ordering::SeqCst) >= 3);
        assert!(tracker.snapshot().updates >= 3);
    }
}
