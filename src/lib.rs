pub mod config;
pub mod crawler;
pub mod error;
pub mod extract;
pub mod logging;
pub mod pacing;
pub mod report;
pub mod session;
pub mod showtime;
pub mod transport;

pub use crawler::{CrawlConfig, Crawler, FilmSelection, RevealKey};
pub use error::CrawlError;
pub use transport::{HttpRequest, HttpResponse, ReqwestTransport};

use serde::Serialize;

/// A film as listed in the booking entry page's film selector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Film {
    pub id: String,
    pub title: String,
}

/// One screening, fully walked down to the room reveal step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScreeningRow {
    pub cinema: String,
    pub room: String,
    pub room_label: String,
    pub film_id: String,
    pub film_title: String,
    pub date: String,
    pub time: String,
    pub version: String,
    pub audio: String,
    pub showtime_id: String,
    pub ts: Option<i64>, // unix seconds, None when the key carried no number
    pub reservation_url: String,
}

/// Trait the crawler issues every request through.
///
/// The production implementation is [`ReqwestTransport`]; tests plug in a
/// canned implementation so the whole booking flow runs offline.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    /// Send one request and return the full response, or fail for the run.
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, CrawlError>;
}
