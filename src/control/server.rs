use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::{debug, info, warn};

use crate::error::ControlError;
use crate::shutdown::ShutdownReceiver;

use super::handlers::{ControlState, handle_connection};

/// # Errors
///
/// Returns an error when the address cannot be bound.
pub async fn bind(addr: &str) -> Result<TcpListener, ControlError> {
    TcpListener::bind(addr)
        .await
        .map_err(|err| ControlError::Bind {
            addr: addr.to_owned(),
            source: err,
        })
}

/// Accepts connections until shutdown is broadcast; one task per connection.
pub async fn serve(listener: TcpListener, state: Arc<ControlState>, mut shutdown_rx: ShutdownReceiver) {
    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => {
                info!("Shutdown requested, no longer accepting connections.");
                break;
            }
            accepted = listener.accept() => match accepted {
                Ok((socket, peer)) => {
                    let state = Arc::clone(&state);
                    tokio::spawn(async move {
                        if let Err(err) = handle_connection(socket, &state).await {
                            debug!("Control connection from {} failed: {}", peer, err);
                        }
                    });
                }
                Err(err) => warn!("{}", ControlError::Accept { source: err }),
            },
        }
    }
}
