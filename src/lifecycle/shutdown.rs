//! Shutdown sequence.

use crate::lifecycle::startup::AppContext;

impl AppContext {
    /// Flush the auth log, then flush and close the logger.
    ///
    /// Closing the logger is the last action; nothing is logged afterwards.
    pub async fn shutdown(self) {
        tracing::info!("Shutting down");
        self.auth_writer.close().await;
        self.logger.shutdown().await;
    }
}
