// File: services/opsdesk_backend/src/main.rs
mod app_state;
mod service_factory;

use axum::{routing::get, Router};
use opsdesk_codec::{SecretCipher, TokenSigner};
use opsdesk_common::models::OperatorProfile;
use opsdesk_common::services::ServiceFactory;
use opsdesk_common::{init_from_config, OperatorAuthState};
use opsdesk_config::{load_config, AppConfig};
use opsdesk_db::{OperatorRepository, SqlStore};
use opsdesk_gcal::{routes as gcal_routes, GcalState};
use opsdesk_meetings::{
    routes as meetings_routes, BookingService, ChannelSink, ClientIpPolicy, EventSink, EventWorker,
    LinkBuilder, MeetingsState, OperatorService, RateLimiter, ReminderScheduler, TokenPolicy,
    TurnstileVerifier,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::app_state::{health_handler, AppState};
use crate::service_factory::OpsdeskServiceFactory;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

async fn seed_operators(store: &SqlStore, config: &AppConfig) -> Result<(), BoxError> {
    for seed in &config.operators {
        store
            .upsert_operator(OperatorProfile {
                id: seed.id.clone(),
                display_name: seed.display_name.clone(),
                email: seed.email.clone(),
                active: true,
            })
            .await?;
    }
    if config.operators.is_empty() {
        warn!("No operators configured; the booking surface will answer 404 for every operator");
    } else {
        info!("Seeded {} operator(s)", config.operators.len());
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Could not listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let config = Arc::new(load_config()?);
    let _log_guard = init_from_config(&config.logging);

    let store = SqlStore::connect(&config.database).await?;
    seed_operators(&store, &config).await?;

    let signer = Arc::new(TokenSigner::new(&config.secrets.token_signing_secret));
    let cipher = Arc::new(SecretCipher::new(&config.secrets.encryption_secret)?);
    let factory = OpsdeskServiceFactory::new(&config, store.clone(), cipher.clone());

    let meetings_config = config.meetings.clone();
    let downstream_timeout = Duration::from_secs(meetings_config.downstream_timeout_secs);
    let links = LinkBuilder::new(&meetings_config.public_base_url);

    // Side effects run off the request path.
    let (sink, rx) = ChannelSink::new();
    let events: Arc<dyn EventSink> = Arc::new(sink);
    let worker = EventWorker::new(
        store.clone(),
        factory.calendar_service(),
        factory.notification_service(),
        links.clone(),
        downstream_timeout,
    );
    tokio::spawn(worker.run(rx));

    let reminders = ReminderScheduler::new(store.clone(), events.clone());
    tokio::spawn(reminders.run(Duration::from_secs(meetings_config.reminder_interval_secs)));

    let tokens = TokenPolicy::new(signer.clone(), meetings_config.view_token_ttl_days);
    let mut booking = BookingService::new(store.clone(), tokens, events, meetings_config.clone());
    if let Some(calendar) = factory.calendar_service() {
        booking = booking.with_calendar(calendar);
    }

    let turnstile = config
        .secrets
        .turnstile_secret
        .as_deref()
        .filter(|secret| !secret.is_empty())
        .map(|secret| TurnstileVerifier::new(secret, downstream_timeout));
    if turnstile.is_none() {
        info!("No turnstile secret configured; anti-automation check disabled");
    }

    let meetings_state = Arc::new(MeetingsState {
        booking,
        operator: OperatorService::new(store.clone(), meetings_config),
        rate_limiter: RateLimiter::from_config(store.clone(), &config.rate_limit),
        turnstile,
        links,
        client_ip: ClientIpPolicy::new(config.rate_limit.trusted_proxy_hops),
    });
    let gcal_state = Arc::new(GcalState {
        store: store.clone(),
        cipher,
        signer,
        config: config.gcal.clone().filter(|_| config.use_gcal),
    });
    let auth = OperatorAuthState::new(config.secrets.operator_api_secret.clone());

    let service_router = Router::new()
        .route("/", get(|| async { "Welcome to the Opsdesk API!" }))
        .route("/health", get(health_handler))
        .with_state(AppState {
            config: config.clone(),
            store,
        });

    let api_router = service_router
        .merge(meetings_routes::routes(meetings_state, auth.clone()))
        .merge(gcal_routes::routes(gcal_state, auth));

    #[allow(unused_mut)] // only mutated with the openapi feature
    let mut app = Router::new().nest("/api", api_router);

    #[cfg(feature = "openapi")]
    {
        use opsdesk_gcal::doc::GcalApiDoc;
        use opsdesk_meetings::doc::MeetingsApiDoc;
        use utoipa::OpenApi;
        use utoipa_swagger_ui::SwaggerUi;

        #[derive(OpenApi)]
        #[openapi(
            info(
                title = "Opsdesk API",
                version = "0.1.0",
                description = "Meeting scheduling for operations teams",
                license(name = "MIT", url = "https://opensource.org/licenses/MIT")
            ),
            tags((name = "Opsdesk", description = "Core service endpoints")),
            servers((url = "/api", description = "Main API Prefix")),
        )]
        struct ApiDoc;

        let mut openapi_doc = ApiDoc::openapi();
        openapi_doc.merge(MeetingsApiDoc::openapi());
        openapi_doc.merge(GcalApiDoc::openapi());
        info!("Adding Swagger UI at /api/docs");

        let swagger_ui = SwaggerUi::new("/api/docs").url("/api/docs/openapi.json", openapi_doc);
        app = app.merge(swagger_ui);
    }

    let app = app.layer(TraceLayer::new_for_http());

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Starting server at http://{}", addr);
    info!("API endpoints available at http://{}/api", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;
    Ok(())
}
