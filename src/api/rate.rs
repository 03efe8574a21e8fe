use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use axum::extract::{ConnectInfo, Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::api::state::AppState;
use crate::error::ErrorBody;

const WINDOW: Duration = Duration::from_secs(60);

// Stale windows are swept once the table grows past this many clients.
const SWEEP_THRESHOLD: usize = 1024;

/// Fixed-window request counter keyed by client address.
pub struct RateGate {
    limit: u32,
    windows: Mutex<HashMap<IpAddr, Window>>,
}

struct Window {
    opened: Instant,
    count: u32,
}

impl RateGate {
    pub fn new(limit: u32) -> Self {
        Self {
            limit,
            windows: Mutex::new(HashMap::new()),
        }
    }

    /// True when the request fits the client's current window.
    pub fn admit(&self, client: IpAddr, now: Instant) -> bool {
        let mut windows = self
            .windows
            .lock()
            .unwrap_or_else(|poison| poison.into_inner());

        if windows.len() > SWEEP_THRESHOLD {
            windows.retain(|_, window| now.duration_since(window.opened) < WINDOW);
        }

        let window = windows.entry(client).or_insert(Window {
            opened: now,
            count: 0,
        });
        if now.duration_since(window.opened) >= WINDOW {
            window.opened = now;
            window.count = 0;
        }
        if window.count >= self.limit {
            return false;
        }
        window.count += 1;
        true
    }
}

/// Router-wide rate limit. The client address comes from the connect info
/// extension; requests served without one share a single bucket.
pub async fn enforce_rate_limit(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let client = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED));

    if !state.rate_gate.admit(client, Instant::now()) {
        tracing::debug!(%client, "rate limit exceeded");
        return (
            StatusCode::TOO_MANY_REQUESTS,
            Json(ErrorBody {
                error: "too many requests".to_owned(),
            }),
        )
            .into_response();
    }

    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::{RateGate, WINDOW};
    use std::net::{IpAddr, Ipv4Addr};
    use std::time::{Duration, Instant};

    fn ip(last: u8) -> IpAddr {
        IpAddr::V4(Ipv4Addr::new(10, 0, 0, last))
    }

    #[test]
    fn admits_up_to_the_limit_then_refuses() {
        let gate = RateGate::new(5);
        let now = Instant::now();

        for _ in 0..5 {
            assert!(gate.admit(ip(1), now));
        }
        assert!(!gate.admit(ip(1), now));
        assert!(!gate.admit(ip(1), now + Duration::from_secs(30)));
    }

    #[test]
    fn window_resets_after_it_ages_out() {
        let gate = RateGate::new(2);
        let now = Instant::now();

        assert!(gate.admit(ip(1), now));
        assert!(gate.admit(ip(1), now));
        assert!(!gate.admit(ip(1), now));

        let later = now + WINDOW;
        assert!(gate.admit(ip(1), later));
        assert!(gate.admit(ip(1), later));
        assert!(!gate.admit(ip(1), later));
    }

    #[test]
    fn clients_are_counted_independently() {
        let gate = RateGate::new(1);
        let now = Instant::now();

        assert!(gate.admit(ip(1), now));
        assert!(!gate.admit(ip(1), now));
        assert!(gate.admit(ip(2), now));
        assert!(gate.admit(ip(3), now));
    }

    #[test]
    fn zero_limit_refuses_everything() {
        let gate = RateGate::new(0);
        assert!(!gate.admit(ip(1), Instant::now()));
    }
}
