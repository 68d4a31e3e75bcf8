use crate::report::OutputFormat;
use crate::{CrawlConfig, CrawlError, FilmSelection, RevealKey};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Parser)]
#[command(name = "cinema-rooms")]
#[command(about = "Walk a cinema's booking flow and report which room each screening uses")]
pub struct Cli {
    /// Booking site origin, e.g. https://www.example-cinemas.fr
    #[arg(long, env = "CINEMA_BASE_URL")]
    pub base_url: String,

    /// Cinema slug, the first path segment of the booking pages
    #[arg(long, env = "CINEMA")]
    pub cinema: String,

    /// Pause before every request, in milliseconds
    #[arg(long, env = "CRAWL_DELAY_MS", default_value_t = 250)]
    pub delay_ms: u64,

    /// Report file
    #[arg(short, long, env = "OUTPUT", default_value = "screenings.csv")]
    pub output: PathBuf,

    /// Report format
    #[arg(long, env = "OUTPUT_FORMAT", value_enum, default_value_t = OutputFormat::Csv)]
    pub format: OutputFormat,

    /// HTTP request timeout, in seconds
    #[arg(long, env = "HTTP_TIMEOUT_SECS", default_value_t = 30)]
    pub timeout_secs: u64,

    /// Only crawl these film ids (repeatable)
    #[arg(long = "film-id", conflicts_with = "film_index")]
    pub film_ids: Vec<String>,

    /// Only crawl the film at this position of the film selector
    #[arg(long)]
    pub film_index: Option<usize>,

    /// Value posted as the showtime of the reveal step
    #[arg(long, value_enum, default_value_t = RevealKey::InternalId)]
    pub reveal_key: RevealKey,

    /// Debug logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    pub fn film_selection(&self) -> FilmSelection {
        match (self.film_index, self.film_ids.is_empty()) {
            (Some(i), _) => FilmSelection::Index(i),
            (None, false) => FilmSelection::Ids(self.film_ids.clone()),
            (None, true) => FilmSelection::All,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn crawl_config(&self) -> Result<CrawlConfig, CrawlError> {
        let mut config = CrawlConfig::new(&self.base_url, &self.cinema)?;
        config.delay = Duration::from_millis(self.delay_ms);
        config.film_selection = self.film_selection();
        config.reveal_key = self.reveal_key;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        let mut argv = vec![
            "cinema-rooms",
            "--base-url",
            "https://cinema.test",
            "--cinema",
            "lyon",
        ];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv)
    }

    #[test]
    fn defaults() {
        let cli = parse(&[]).unwrap();
        let config = cli.crawl_config().unwrap();
        assert_eq!(config.delay, Duration::from_millis(250));
        assert_eq!(config.film_selection, FilmSelection::All);
        assert_eq!(config.reveal_key, RevealKey::InternalId);
        assert_eq!(cli.output, PathBuf::from("screenings.csv"));
        assert_eq!(cli.format, OutputFormat::Csv);
        assert_eq!(cli.timeout(), Duration::from_secs(30));
    }

    #[test]
    fn film_filters() {
        let cli = parse(&["--film-id", "7", "--film-id", "9"]).unwrap();
        assert_eq!(
            cli.film_selection(),
            FilmSelection::Ids(vec!["7".into(), "9".into()])
        );

        let cli = parse(&["--film-index", "1", "--reveal-key", "raw-key"]).unwrap();
        assert_eq!(cli.film_selection(), FilmSelection::Index(1));
        assert_eq!(cli.reveal_key, RevealKey::RawKey);

        assert!(parse(&["--film-id", "7", "--film-index", "0"]).is_err());
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        let cli = Cli::try_parse_from(["cinema-rooms", "--base-url", "not a url", "--cinema", "x"])
            .unwrap();
        assert!(matches!(cli.crawl_config(), Err(CrawlError::Url(_))));
    }
}
