use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use booking::booking::{BookingEngine, DEFAULT_CALENDAR_TIMEOUT, EngineSettings};
use booking::calendar::{CalendarService, HttpCalendarClient};
use booking::config::ApiConfig;
use booking::repos::Store;
use chat_api::http::{self, AppState, RateLimiter};
use tracing::{error, info};

const RATE_LIMIT_PRUNE_INTERVAL: Duration = Duration::from_secs(300);

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    init_tracing();

    let config = match ApiConfig::from_env() {
        Ok(cfg) => cfg,
        Err(err) => {
            error!("failed to read config: {err}");
            std::process::exit(1);
        }
    };

    let store = match Store::connect(&config.database_url, config.database_max_connections).await
    {
        Ok(store) => store,
        Err(err) => {
            error!("failed to connect to postgres: {err}");
            std::process::exit(1);
        }
    };

    let migrator = match sqlx::migrate::Migrator::new(config.migrations_dir.clone()).await {
        Ok(migrator) => migrator,
        Err(err) => {
            error!("failed to load migrations: {err}");
            std::process::exit(1);
        }
    };

    if let Err(err) = migrator.run(store.pool()).await {
        error!("failed to run migrations: {err}");
        std::process::exit(1);
    }

    let calendar: Option<Arc<dyn CalendarService>> = match config.calendar.as_ref() {
        Some(calendar_config) => match HttpCalendarClient::new(calendar_config) {
            Ok(client) => {
                info!(base_url = %calendar_config.base_url, "external calendar enabled");
                Some(Arc::new(client))
            }
            Err(err) => {
                error!("failed to build calendar client: {err}");
                std::process::exit(1);
            }
        },
        None => {
            info!("no calendar service configured, using local availability only");
            None
        }
    };
    let calendar_timeout = config
        .calendar
        .as_ref()
        .map(|calendar_config| Duration::from_millis(calendar_config.timeout_ms))
        .unwrap_or(DEFAULT_CALENDAR_TIMEOUT);

    let store = Arc::new(store);
    let engine = BookingEngine::new(
        store.clone(),
        store,
        calendar,
        EngineSettings {
            session_ttl_seconds: config.session_ttl_seconds,
            business_time_zone: config.business_time_zone,
            calendar_timeout,
        },
    );

    let rate_limiter = RateLimiter::new(config.chat_rate_limit_per_minute);
    let _pruner = rate_limiter.spawn_pruner(RATE_LIMIT_PRUNE_INTERVAL);

    let app = http::build_router(AppState {
        engine,
        rate_limiter,
        trusted_proxy_ips: config.trusted_proxy_ips.into_iter().collect(),
    });

    let addr: SocketAddr = match config.bind_addr.parse() {
        Ok(addr) => addr,
        Err(err) => {
            error!("invalid API_BIND_ADDR '{}': {err}", config.bind_addr);
            std::process::exit(1);
        }
    };

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(err) => {
            error!("failed to bind {addr}: {err}");
            std::process::exit(1);
        }
    };

    info!(
        "chat api listening on {}",
        listener.local_addr().unwrap_or(addr)
    );
    if let Err(err) = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    {
        error!("server stopped: {err}");
        std::process::exit(1);
    }
}

fn init_tracing() {
    let filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "chat_api=debug,booking=debug,tower_http=info".to_string());
    let json = std::env::var("LOG_FORMAT").is_ok_and(|format| format.eq_ignore_ascii_case("json"));

    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
