// handlers/protected/mod.rs - Protected handlers (JWT authentication required)
//
// Route Prefix: /api/*, POST only
// Middleware: `jwt_auth_middleware` injects `Extension<AuthUser>`
//
// Handlers that mutate more than one document take a per-user (or per-post)
// key from `AppState::locks` for the whole read-check-write sequence.

pub mod comments;
pub mod follow;
pub mod frenlets;
pub mod likes;
pub mod nft;
pub mod notifications;
pub mod posts;
pub mod profile;
pub mod provider;
pub mod validate;
pub mod warmer;
