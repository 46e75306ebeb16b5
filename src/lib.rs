pub mod auth;
pub mod cli;
pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod mutation;
pub mod ownership;
pub mod paths;
pub mod provider;
pub mod state;
pub mod store;
pub mod sync;
pub mod warmer;

use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::SecurityConfig;
use crate::error::ApiError;
use crate::state::AppState;

/// Full application router: public routes plus the JWT-protected `/api/*` surface
pub fn app(state: AppState) -> Router {
    Router::new()
        // Public
        .route("/", get(handlers::public::root))
        .route("/health", get(handlers::public::health))
        // Protected API
        .merge(api_routes(state.clone()))
        .fallback(|| async { ApiError::not_found("Route not found") })
        .method_not_allowed_fallback(|| async { ApiError::MethodNotAllowed })
        // Global middleware
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(&state.config.security)),
        )
        .with_state(state)
}

fn api_routes(state: AppState) -> Router<AppState> {
    use handlers::protected::{comments, follow, frenlets, likes, nft, notifications, posts, profile, provider, warmer};

    Router::new()
        // Posts
        .route("/api/postUpload", post(posts::upload))
        .route("/api/postDelete", post(posts::delete))
        .route("/api/like", post(likes::like))
        .route("/api/deleteLike", post(likes::delete_like))
        .route("/api/sendComment", post(comments::send))
        .route("/api/deleteComment", post(comments::delete))
        // Profile and social graph
        .route("/api/updateFullname", post(profile::update_fullname))
        .route("/api/changeProfilePhoto", post(profile::change_profile_photo))
        .route("/api/follow", post(follow::follow))
        .route("/api/unfollow", post(follow::unfollow))
        // Frenlets
        .route("/api/frenlets/createTag", post(frenlets::tags::create))
        .route("/api/frenlets/deleteTag", post(frenlets::tags::delete))
        .route("/api/frenlets/sendFrenlet", post(frenlets::frenlet::send))
        .route("/api/frenlets/deleteFrenlet", post(frenlets::frenlet::delete))
        .route("/api/frenlets/sendReply", post(frenlets::replies::send))
        .route("/api/frenlets/deleteReply", post(frenlets::replies::delete))
        .route("/api/frenlets/repairMirrors", post(frenlets::replies::repair))
        // NFT
        .route("/api/nft/mint", post(nft::mint))
        .route("/api/nft/list", post(nft::list))
        .route("/api/nft/buy", post(nft::buy))
        // Notifications
        .route("/api/notifications/list", post(notifications::list))
        .route("/api/notifications/markSeen", post(notifications::mark_seen))
        // Feed provider
        .route("/api/provider/showcase", post(provider::showcase))
        .route("/api/provider/select", post(provider::select))
        .route("/api/provider/deal", post(provider::deal))
        .route("/api/provider/rate", post(provider::rate))
        // Ops
        .route(crate::warmer::WARMER_PATH, post(warmer::server_warmer))
        .route_layer(axum::middleware::from_fn_with_state(
            state,
            middleware::jwt_auth_middleware,
        ))
}

fn cors_layer(security: &SecurityConfig) -> CorsLayer {
    if !security.enable_cors {
        return CorsLayer::new();
    }

    let origins: Vec<HeaderValue> = security
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
}
