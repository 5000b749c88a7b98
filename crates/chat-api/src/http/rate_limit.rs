use std::collections::{HashMap, HashSet, VecDeque};
use std::net::{IpAddr, SocketAddr};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use axum::extract::{ConnectInfo, Request, State};
use axum::middleware::Next;
use axum::response::Response;
use tracing::warn;

use super::AppState;
use super::errors::too_many_requests_response;

const WINDOW: Duration = Duration::from_secs(60);

/// Sliding one-minute window of chat requests per client address.
#[derive(Clone)]
pub struct RateLimiter {
    max_requests_per_minute: usize,
    entries: Arc<Mutex<HashMap<String, VecDeque<Instant>>>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RateLimitDecision {
    Allowed,
    Denied { retry_after_seconds: u64 },
}

impl RateLimiter {
    /// A limit of zero disables rate limiting.
    pub fn new(max_requests_per_minute: u32) -> Self {
        Self {
            max_requests_per_minute: usize::try_from(max_requests_per_minute)
                .unwrap_or(usize::MAX),
            entries: Arc::default(),
        }
    }

    pub fn spawn_pruner(&self, interval: Duration) -> tokio::task::JoinHandle<()> {
        let entries = Arc::clone(&self.entries);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                prune_entries(&entries, Instant::now());
            }
        })
    }

    fn check(&self, subject: &str) -> RateLimitDecision {
        self.check_at(subject, Instant::now())
    }

    fn check_at(&self, subject: &str, now: Instant) -> RateLimitDecision {
        if self.max_requests_per_minute == 0 {
            return RateLimitDecision::Allowed;
        }

        let cutoff = now.checked_sub(WINDOW).unwrap_or(now);
        let mut entries = self
            .entries
            .lock()
            .expect("rate limiter mutex should not be poisoned");

        let bucket = entries.entry(subject.to_string()).or_default();
        prune_bucket(bucket, cutoff);

        if bucket.len() >= self.max_requests_per_minute {
            let retry_after_seconds = bucket
                .front()
                .map(|first_seen| {
                    let elapsed = now.saturating_duration_since(*first_seen);
                    WINDOW.saturating_sub(elapsed).as_secs().max(1)
                })
                .unwrap_or(WINDOW.as_secs());
            return RateLimitDecision::Denied {
                retry_after_seconds,
            };
        }

        bucket.push_back(now);
        RateLimitDecision::Allowed
    }
}

fn prune_entries(entries: &Mutex<HashMap<String, VecDeque<Instant>>>, now: Instant) {
    let cutoff = now.checked_sub(WINDOW).unwrap_or(now);
    let mut state = entries
        .lock()
        .expect("rate limiter prune mutex should not be poisoned");

    state.retain(|_, bucket| {
        prune_bucket(bucket, cutoff);
        !bucket.is_empty()
    });
}

fn prune_bucket(bucket: &mut VecDeque<Instant>, cutoff: Instant) {
    while bucket.front().is_some_and(|front| *front <= cutoff) {
        bucket.pop_front();
    }
}

pub(super) async fn chat_rate_limit_middleware(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Response {
    let subject = request_subject(&req, &state.trusted_proxy_ips);

    match state.rate_limiter.check(&subject) {
        RateLimitDecision::Allowed => next.run(req).await,
        RateLimitDecision::Denied {
            retry_after_seconds,
        } => {
            warn!(
                subject = %subject,
                retry_after_seconds,
                "chat request denied by rate limit"
            );
            too_many_requests_response(retry_after_seconds)
        }
    }
}

fn request_subject(req: &Request, trusted_proxy_ips: &HashSet<IpAddr>) -> String {
    match client_ip(req, trusted_proxy_ips) {
        Some(ip) => format!("ip:{ip}"),
        None => "anonymous".to_string(),
    }
}

/// Peer address, or the first untrusted hop of `x-forwarded-for` when the
/// peer is a trusted proxy.
fn client_ip(req: &Request, trusted_proxy_ips: &HashSet<IpAddr>) -> Option<IpAddr> {
    let peer_ip = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|connect_info| connect_info.0.ip())?;

    if !trusted_proxy_ips.contains(&peer_ip) {
        return Some(peer_ip);
    }

    let mut chain = req
        .headers()
        .get_all("x-forwarded-for")
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|raw| raw.split(','))
        .filter_map(|entry| entry.trim().parse::<IpAddr>().ok())
        .collect::<Vec<_>>();
    chain.push(peer_ip);

    chain
        .into_iter()
        .rev()
        .find(|ip| !trusted_proxy_ips.contains(ip))
        .or(Some(peer_ip))
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::net::{IpAddr, SocketAddr};
    use std::time::{Duration, Instant};

    use axum::body::Body;
    use axum::extract::{ConnectInfo, Request};
    use axum::http::header::HeaderName;

    use super::{RateLimitDecision, RateLimiter, prune_entries, request_subject};

    fn request_from(peer: [u8; 4], forwarded_for: Option<&str>) -> Request {
        let mut request = Request::builder()
            .uri("/api/chat")
            .body(Body::empty())
            .expect("request builder should work");
        if let Some(forwarded_for) = forwarded_for {
            request.headers_mut().insert(
                HeaderName::from_static("x-forwarded-for"),
                forwarded_for.parse().expect("header value should parse"),
            );
        }
        request
            .extensions_mut()
            .insert(ConnectInfo(SocketAddr::from((peer, 8080))));
        request
    }

    #[test]
    fn denies_after_limit_within_window() {
        let limiter = RateLimiter::new(3);
        let start = Instant::now();

        for _ in 0..3 {
            assert_eq!(
                limiter.check_at("ip:1.2.3.4", start),
                RateLimitDecision::Allowed
            );
        }
        assert!(matches!(
            limiter.check_at("ip:1.2.3.4", start),
            RateLimitDecision::Denied {
                retry_after_seconds: 1..=60
            }
        ));
        assert_eq!(
            limiter.check_at("ip:5.6.7.8", start),
            RateLimitDecision::Allowed
        );
    }

    #[test]
    fn window_slides_forward() {
        let limiter = RateLimiter::new(1);
        let start = Instant::now();

        assert_eq!(limiter.check_at("ip:a", start), RateLimitDecision::Allowed);
        assert_ne!(limiter.check_at("ip:a", start), RateLimitDecision::Allowed);
        assert_eq!(
            limiter.check_at("ip:a", start + Duration::from_secs(61)),
            RateLimitDecision::Allowed
        );
    }

    #[test]
    fn zero_limit_disables_checks() {
        let limiter = RateLimiter::new(0);
        let start = Instant::now();
        for _ in 0..100 {
            assert_eq!(limiter.check_at("ip:a", start), RateLimitDecision::Allowed);
        }
    }

    #[test]
    fn idle_buckets_are_pruned() {
        let limiter = RateLimiter::new(5);
        let start = Instant::now();
        limiter.check_at("ip:idle", start);

        prune_entries(&limiter.entries, start + Duration::from_secs(120));
        let entries = limiter
            .entries
            .lock()
            .expect("test mutex should not be poisoned");
        assert!(entries.is_empty());
    }

    #[test]
    fn forwarded_header_is_ignored_from_untrusted_peers() {
        let request = request_from([10, 20, 30, 40], Some("203.0.113.99"));
        assert_eq!(request_subject(&request, &HashSet::new()), "ip:10.20.30.40");
    }

    #[test]
    fn forwarded_chain_is_used_behind_trusted_proxy() {
        let trusted = HashSet::from([IpAddr::from([10, 0, 0, 5])]);
        let request = request_from([10, 0, 0, 5], Some("198.51.100.20, 10.0.0.5"));
        assert_eq!(request_subject(&request, &trusted), "ip:198.51.100.20");
    }

    #[test]
    fn requests_without_peer_info_share_anonymous_bucket() {
        let request = Request::builder()
            .uri("/api/chat")
            .body(Body::empty())
            .expect("request builder should work");
        assert_eq!(request_subject(&request, &HashSet::new()), "anonymous");
    }
}
