//! Presentation Layer

pub mod dto;
pub mod handlers;
pub mod middleware;
pub mod policy;
pub mod router;

pub use middleware::{AuthenticatedUser, GateState, request_gate};
pub use policy::{Access, RoutePolicy, RouteRule};
pub use router::{auth_router, auth_router_generic};
