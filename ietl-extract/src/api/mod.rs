//! HTTP API handlers for ietl-extract

pub mod constructs;
pub mod health;
pub mod jobs;
pub mod requirements;
pub mod sse;

pub use constructs::construct_routes;
pub use health::health_routes;
pub use jobs::job_routes;
pub use requirements::requirement_routes;
pub use sse::event_stream;
