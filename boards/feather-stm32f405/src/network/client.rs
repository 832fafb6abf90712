#![deny(unsafe_code)]
#![deny(warnings)]
//! Network client trait
//!
//! A protocol client owns its configuration and runs one connection per
//! call. Reconnect policy (backoff, waiting for DHCP) stays with the caller.

use super::error::NetworkError;

/// Trait for network protocol clients
///
/// Implementors handle recoverable errors themselves (log and continue)
/// and only return once the connection is over.
pub trait NetworkClient {
    /// Output type for successful client operation
    type Output;

    /// Run the client until its connection ends
    fn run(
        &mut self,
        stack: &embassy_net::Stack<'static>,
    ) -> impl core::future::Future<Output = Result<Self::Output, NetworkError>>;
}
