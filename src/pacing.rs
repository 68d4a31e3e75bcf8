use std::time::Duration;

/// Politeness gate in front of every outbound request.
///
/// Each request waits the full delay before it is sent, so the crawl never
/// issues requests faster than one per `delay` against the booking host.
#[derive(Debug, Clone)]
pub struct Pacer {
    delay: Duration,
    admitted: u64,
}

impl Pacer {
    pub fn new(delay: Duration) -> Self {
        Self { delay, admitted: 0 }
    }

    pub async fn wait(&mut self) {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.admitted += 1;
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Number of requests let through so far.
    pub fn admitted(&self) -> u64 {
        self.admitted
    }
}
