use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::{
    Router,
    routing::{delete, get, post, put},
};
use sqlx::Executor;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use warband_backend::{
    AppState,
    config::Config,
    middleware::{RateLimiter, auth_middleware, log_errors, rate_limit},
    routes,
};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().expect("Failed to load configuration");

    #[cfg(debug_assertions)]
    tracing::info!("Running in debug mode with CORS enabled");

    #[cfg(not(debug_assertions))]
    tracing::info!("Running in production mode with CORS disabled");

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .after_connect(|conn, _meta| {
            Box::pin(async move {
                conn.execute("SET application_name = 'warband_backend';")
                    .await?;
                Ok(())
            })
        })
        .connect(&config.database_url)
        .await
        .expect("Failed to connect to Postgres");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    let redis_client =
        redis::Client::open(config.redis_url.clone()).expect("Failed to create Redis client");
    let redis_arc = Arc::new(redis_client.clone());

    let state = AppState {
        pool,
        config: config.clone(),
        redis: redis_arc,
    };

    let rate_limiter = Arc::new(RateLimiter::new(redis_client, config.clone()));

    let public_routes = Router::new()
        .route("/users/request-code", post(routes::user::request_code))
        .route("/users/login", post(routes::user::login))
        .route("/groups/find", get(routes::group::find_groups));

    let protected_routes = Router::new()
        // account routes
        .route("/users/me", get(routes::user::get_me))
        .route("/users/update", put(routes::user::update_user))
        // friend routes
        .route("/friends", get(routes::friend::get_friends))
        .route("/friends/add", post(routes::friend::add_friend))
        .route("/friends/remove", post(routes::friend::remove_friend))
        .route("/friends/find", get(routes::friend::find_friends))
        // army list routes
        .route("/lists", get(routes::list::get_lists))
        .route("/lists/by-id", get(routes::list::get_list))
        .route("/lists/create", post(routes::list::create_list))
        .route("/lists/update", put(routes::list::update_list))
        .route("/lists/delete", delete(routes::list::delete_list))
        // game routes
        .route("/games/create", post(routes::game::create_game))
        .route("/games/mine", get(routes::game::get_my_games))
        .route("/games/by-id", get(routes::game::get_game))
        .route("/games/update", put(routes::game::update_game))
        .route("/games/delete", delete(routes::game::delete_game))
        .route("/games/join", post(routes::game::join_game))
        .route("/games/leave", post(routes::game::leave_game))
        .route("/games/set-list", put(routes::game::set_game_list))
        .route("/games/invite", post(routes::game::invite_to_game))
        .route("/games/invite/cancel", post(routes::game::cancel_invite))
        .route("/games/invite/accept", post(routes::game::accept_invite))
        .route("/games/invite/decline", post(routes::game::decline_invite))
        .route("/games/invites", get(routes::game::get_game_invites))
        .route(
            "/games/member/update",
            put(routes::game::update_game_member),
        )
        // group routes
        .route("/groups/create", post(routes::group::create_group))
        .route("/groups/mine", get(routes::group::get_my_groups))
        .route("/groups/by-id", get(routes::group::get_group))
        .route("/groups/update", put(routes::group::update_group))
        .route("/groups/delete", delete(routes::group::delete_group))
        .route("/groups/join", post(routes::group::join_group))
        .route("/groups/leave", post(routes::group::leave_group))
        .route("/groups/invite", post(routes::group::invite_to_group))
        .route(
            "/groups/invite/cancel",
            post(routes::group::cancel_group_invite),
        )
        .route(
            "/groups/invite/decline",
            post(routes::group::decline_group_invite),
        )
        .route("/groups/invites", get(routes::group::get_group_invites))
        .route(
            "/groups/member/update",
            put(routes::group::update_group_member),
        )
        .route(
            "/groups/member/remove",
            post(routes::group::remove_group_member),
        )
        // activity feed
        .route("/feed", get(routes::feed::get_feed))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let router = Router::new().nest(
        &config.api_base_uri.clone(),
        Router::new().merge(public_routes).merge(protected_routes),
    );

    let router = router.layer(axum::middleware::from_fn(log_errors)).layer(
        axum::middleware::from_fn_with_state(rate_limiter, rate_limit),
    );

    #[cfg(debug_assertions)]
    let router = {
        tracing::debug!("Adding CORS layer for development mode");
        let cors = tower_http::cors::CorsLayer::permissive();
        router.layer(cors)
    };

    let app = router.with_state(state.clone());

    let addr = SocketAddr::new(
        state.config.server_host.parse().unwrap_or_else(|_| {
            tracing::warn!("Invalid server_host, falling back to dual-stack default");
            IpAddr::V6(std::net::Ipv6Addr::UNSPECIFIED)
        }),
        state.config.server_port,
    );
    tracing::info!("Server listening on {}", addr);
    axum::serve(
        tokio::net::TcpListener::bind(&addr)
            .await
            .expect("Failed to bind"),
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .expect("Failed to start server");
}
