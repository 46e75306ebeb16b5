// handlers/mod.rs - Two-tier handler layout
//
// Public (no auth) → Protected (JWT auth, every route under /api/*)

pub mod public;
pub mod protected;
