use std::sync::atomic::{AtomicUsize, Ordering};

use rand::Rng;

/// Desktop and mobile browser identities rotated across requests.
pub const DEFAULT_USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) Gecko/20100101 Firefox/121.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.2 Safari/605.1.15",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36 Edg/120.0.0.0",
    "Mozilla/5.0 (iPhone; CPU iPhone OS 17_2 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Mobile/15E148 MicroMessenger/8.0.44",
];

/// Hands out a different client identity per request.
///
/// The cursor starts at a random offset and advances on every call. Concurrent
/// callers may observe a slightly skewed distribution; that is harmless.
#[derive(Debug)]
pub struct UserAgentRotator {
    agents: Vec<String>,
    cursor: AtomicUsize,
}

impl UserAgentRotator {
    pub fn new(agents: Vec<String>) -> Self {
        let agents = if agents.is_empty() {
            DEFAULT_USER_AGENTS.iter().map(|s| s.to_string()).collect()
        } else {
            agents
        };
        let start = rand::rng().random_range(0..agents.len());
        Self {
            agents,
            cursor: AtomicUsize::new(start),
        }
    }

    pub fn next_agent(&self) -> &str {
        let index = self.cursor.fetch_add(1, Ordering::Relaxed) % self.agents.len();
        &self.agents[index]
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}

impl Default for UserAgentRotator {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}
