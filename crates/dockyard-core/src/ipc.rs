//! Messages exchanged with the proxy's control endpoint.
//!
//! One JSON request per connection; the client half-closes after writing and
//! reads a single JSON response to EOF.

use crate::routing::RoutingTable;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum ProxyRequest {
    Ping,
    Apply(RoutingTable),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum ProxyResponse {
    Pong,
    Ok,
    Error(String),
}
