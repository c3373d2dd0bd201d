//! Library surface exposing the daemon's modules to integration tests,
//! mirroring `r2e-core`'s lib+`tests/integration.rs` split (this crate's
//! pipeline and route count make re-deriving the app inline per test, the
//! way `example-app`'s tests do, impractical).

pub mod health;
pub mod metrics;
pub mod pipeline;
pub mod response;
pub mod routes;
pub mod state;
