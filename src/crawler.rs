//! Walks the booking flow film by film to find out which room every
//! screening is played in.
//!
//! The flow has four stages, each enumerating from the previous one:
//!
//! 1. seed: booking entry page, lists the films and opens the session;
//! 2. days: JSON object keyed by the days a film is shown;
//! 3. showtimes: JSON object mapping showtime keys to labels for one day;
//! 4. reveal: booking continuation POST whose page shows the room.
//!
//! Requests are strictly sequential, each one paced and carrying the session
//! cookies collected so far.

use crate::extract::{extract_films, extract_reservation_link, extract_room};
use crate::pacing::Pacer;
use crate::session::SessionState;
use crate::showtime::{ShowtimeKey, ShowtimeLabel};
use crate::transport::{HttpRequest, HttpResponse};
use crate::{CrawlError, Film, ScreeningRow, Transport};
use reqwest::Url;
use reqwest::header::{self, HeaderName};
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::{debug, info, warn};

pub const DEFAULT_DELAY: Duration = Duration::from_millis(250);

const ACCEPT_HTML: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";
const ACCEPT_JSON: &str = "application/json,text/javascript,*/*;q=0.1";
const X_REQUESTED_WITH: HeaderName = HeaderName::from_static("x-requested-with");

/// Which films of the entry page get crawled.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum FilmSelection {
    #[default]
    All,
    /// Only the film at this position of the selector.
    Index(usize),
    /// Only films with these ids, kept in page order.
    Ids(Vec<String>),
}

impl FilmSelection {
    pub fn apply(&self, films: Vec<Film>) -> Vec<Film> {
        match self {
            FilmSelection::All => films,
            FilmSelection::Index(i) => films.into_iter().nth(*i).into_iter().collect(),
            FilmSelection::Ids(ids) => films
                .into_iter()
                .filter(|f| ids.iter().any(|id| *id == f.id))
                .collect(),
        }
    }
}

/// Value posted as the `showtime` field of the reveal step.
///
/// Deployments differ: some expect the internal id from the key, others the
/// whole composite key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum RevealKey {
    #[default]
    InternalId,
    RawKey,
}

#[derive(Debug, Clone)]
pub struct CrawlConfig {
    pub base_url: Url,
    /// Cinema slug, first path segment under the base URL.
    pub cinema: String,
    pub delay: Duration,
    pub film_selection: FilmSelection,
    pub reveal_key: RevealKey,
}

impl CrawlConfig {
    pub fn new(base_url: &str, cinema: &str) -> Result<Self, CrawlError> {
        let base_url =
            Url::parse(base_url).map_err(|e| CrawlError::Url(format!("{base_url}: {e}")))?;
        let slug = cinema.trim_matches('/');
        if !is_valid_slug(slug) {
            return Err(CrawlError::Url(format!("invalid cinema slug {cinema:?}")));
        }
        Ok(Self {
            base_url,
            cinema: slug.to_string(),
            delay: DEFAULT_DELAY,
            film_selection: FilmSelection::default(),
            reveal_key: RevealKey::default(),
        })
    }

    /// `<base_url>/<cinema>/`, the root every endpoint hangs off.
    fn cinema_root(&self) -> Result<Url, CrawlError> {
        let mut base = self.base_url.clone();
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        join(&base, &format!("{}/", self.cinema))
    }
}

pub struct Crawler<T: Transport> {
    transport: T,
    config: CrawlConfig,
    session: SessionState,
    pacer: Pacer,
    rows: Vec<ScreeningRow>,
}

impl<T: Transport> Crawler<T> {
    pub fn new(transport: T, config: CrawlConfig) -> Self {
        let pacer = Pacer::new(config.delay);
        Self {
            transport,
            config,
            session: SessionState::new(),
            pacer,
            rows: Vec::new(),
        }
    }

    /// Crawl every selected film and collect one row per revealed showtime.
    ///
    /// Returns the number of rows collected. On error the rows gathered so
    /// far stay available through [`Crawler::rows`].
    pub async fn run(&mut self) -> Result<usize, CrawlError> {
        let root = self.config.cinema_root()?;

        let films = self.seed(&root).await?;
        if films.is_empty() {
            return Err(CrawlError::NoFilms);
        }
        let listed = films.len();
        let films = self.config.film_selection.apply(films);
        if films.is_empty() {
            return Err(CrawlError::FilmSelection(listed));
        }
        info!(
            delay_ms = self.pacer.delay().as_millis() as u64,
            "{} film(s) listed, crawling {}",
            listed,
            films.len()
        );

        for film in &films {
            info!(film_id = %film.id, "film: {}", film.title);
            let days = self.fetch_days(&root, film).await?;
            if days.is_empty() {
                info!(film_id = %film.id, "no days scheduled, skipping film");
                continue;
            }

            for day in &days {
                info!(film_id = %film.id, "day: {day}");
                let showtimes = self.fetch_showtimes(&root, film, day).await?;
                if showtimes.is_empty() {
                    info!(film_id = %film.id, day = %day, "no showtimes, skipping day");
                    continue;
                }

                for (key, label) in &showtimes {
                    let row = self.reveal(&root, film, day, key, label).await?;
                    let room = if row.room_label.is_empty() {
                        "unknown"
                    } else {
                        row.room_label.as_str()
                    };
                    info!(film_id = %film.id, day = %day, time = %row.time, "room: {room}");
                    self.rows.push(row);
                }
            }
        }

        info!(
            "crawl finished: {} row(s), {} request(s)",
            self.rows.len(),
            self.requests()
        );
        Ok(self.rows.len())
    }

    pub fn rows(&self) -> &[ScreeningRow] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<ScreeningRow> {
        self.rows
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    /// Requests issued so far, each one paced.
    pub fn requests(&self) -> u64 {
        self.pacer.admitted()
    }

    async fn seed(&mut self, root: &Url) -> Result<Vec<Film>, CrawlError> {
        let url = join(root, "reservation/")?;
        let request = HttpRequest::get(url).with_header(header::ACCEPT, ACCEPT_HTML);
        let resp = self.exchange(request).await?;
        let films = extract_films(&resp.body);
        debug!(cookies = self.session.len(), "session seeded");
        Ok(films)
    }

    async fn fetch_days(&mut self, root: &Url, film: &Film) -> Result<Vec<String>, CrawlError> {
        let mut url = join(root, "reservation/ajax/days")?;
        url.query_pairs_mut().append_pair("film", &film.id);
        let request = json_request(url);
        let resp = self.exchange(request).await?;
        Ok(json_object(&resp, "days").into_iter().map(|(day, _)| day).collect())
    }

    async fn fetch_showtimes(
        &mut self,
        root: &Url,
        film: &Film,
        day: &str,
    ) -> Result<Vec<(String, String)>, CrawlError> {
        let mut url = join(root, "reservation/ajax/showtimes")?;
        url.query_pairs_mut()
            .append_pair("film", &film.id)
            .append_pair("day", day);
        let request = json_request(url);
        let resp = self.exchange(request).await?;
        Ok(json_object(&resp, "showtimes")
            .into_iter()
            .map(|(key, label)| {
                let label = match label {
                    Value::String(s) => s,
                    other => other.to_string(),
                };
                (key, label)
            })
            .collect())
    }

    async fn reveal(
        &mut self,
        root: &Url,
        film: &Film,
        day: &str,
        raw_key: &str,
        raw_label: &str,
    ) -> Result<ScreeningRow, CrawlError> {
        let key = ShowtimeKey::decode(raw_key);
        let label = ShowtimeLabel::decode(raw_label);
        if let Some(at) = key.starts_at() {
            debug!(showtime = %raw_key, "starts at {at}");
        }

        let showtime = match self.config.reveal_key {
            RevealKey::InternalId => key.internal_id.clone(),
            RevealKey::RawKey => raw_key.to_string(),
        };
        let url = join(root, "reservation/")?;
        let form = vec![
            ("film".to_string(), film.id.clone()),
            ("day".to_string(), day.to_string()),
            ("showtime".to_string(), showtime),
            ("step".to_string(), "seats".to_string()),
        ];
        let request =
            HttpRequest::post_form(url.clone(), form).with_header(header::ACCEPT, ACCEPT_HTML);
        debug!(
            showtime = request.form_value("showtime").unwrap_or(""),
            "revealing room"
        );
        let resp = self.exchange(request).await?;

        let room = extract_room(&resp.body);
        if room.is_unknown() {
            warn!(showtime = %raw_key, "room not found in booking page");
        }
        let link = extract_reservation_link(&resp.body);
        let version = if label.version.is_empty() {
            key.version
        } else {
            label.version
        };

        Ok(ScreeningRow {
            cinema: self.config.cinema.clone(),
            room: room.number,
            room_label: room.label,
            film_id: film.id.clone(),
            film_title: film.title.clone(),
            date: day.to_string(),
            time: label.time,
            version,
            audio: label.audio,
            showtime_id: key.internal_id,
            ts: key.ts,
            reservation_url: resolve_link(&url, &link),
        })
    }

    /// Paced request/response exchange carrying the session both ways.
    async fn exchange(&mut self, mut request: HttpRequest) -> Result<HttpResponse, CrawlError> {
        self.pacer.wait().await;
        self.session.attach(&mut request.headers);
        debug!(method = %request.method, url = %request.url, "request");
        let resp = self.transport.send(request).await?;
        debug!(status = %resp.status, bytes = resp.body.len(), "response");
        self.session.record(&resp.headers);
        Ok(resp)
    }
}

/// A single relative path segment: no scheme, query, fragment or nesting.
fn is_valid_slug(slug: &str) -> bool {
    !slug.is_empty()
        && slug != "."
        && slug != ".."
        && slug
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

fn join(base: &Url, path: &str) -> Result<Url, CrawlError> {
    base.join(path)
        .map_err(|e| CrawlError::Url(format!("{base} + {path}: {e}")))
}

fn json_request(url: Url) -> HttpRequest {
    HttpRequest::get(url)
        .with_header(header::ACCEPT, ACCEPT_JSON)
        .with_header(X_REQUESTED_WITH, "XMLHttpRequest")
}

/// Body of a JSON stage as an object, preserving the server's key order.
///
/// An empty array counts as an empty object; anything else that is not an
/// object is logged and treated as empty.
fn json_object(resp: &HttpResponse, stage: &str) -> Map<String, Value> {
    let body = resp.body.trim_start();
    if !resp.is_json() && !body.starts_with('{') && !body.starts_with('[') {
        warn!(stage, content_type = resp.content_type(), "expected JSON, got something else");
        return Map::new();
    }

    match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(map)) => map,
        Ok(Value::Array(items)) if items.is_empty() => Map::new(),
        Ok(other) => {
            warn!(stage, "unexpected JSON payload: {}", preview(&other.to_string()));
            Map::new()
        }
        Err(e) => {
            warn!(stage, "invalid JSON ({e}): {}", preview(body));
            Map::new()
        }
    }
}

fn preview(s: &str) -> String {
    s.chars().take(200).collect()
}

fn resolve_link(page: &Url, link: &str) -> String {
    if link.is_empty() {
        return String::new();
    }
    page.join(link)
        .map(|u| u.to_string())
        .unwrap_or_else(|_| link.to_string())
}
