//! Gateway: the HTTP webhook endpoint.
//!
//! `GET /webhook` answers the platform's subscription handshake; `POST /webhook` receives
//! messaging events, resolves a reply for each and sends it back out of band.

mod server;

pub use server::{router, run_gateway, GatewayState, VerifyParams, VERIFY_MISMATCH_BODY};
