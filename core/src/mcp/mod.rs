//! External process tool plumbing: protocol framing and the worker client

pub mod client;
pub mod protocol;

pub use client::WorkerClient;
pub use protocol::{Request, Response, RpcError, PROTOCOL_VERSION};
