//! Operations context for dependency injection

use repofetch_config::Config;
use repofetch_errors::{Error, OpsError};
use repofetch_events::{EventEmitter, EventSender};
use repofetch_net::{ArtifactDownloader, NetClient};
use repofetch_resolver::PackageSolver;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Operations context providing access to all run components
pub struct OpsCtx {
    /// Network client for metadata
    pub net: NetClient,
    /// Delivery engine for artifacts
    pub downloader: ArtifactDownloader,
    /// RPM dependency solver
    pub solver: Arc<dyn PackageSolver>,
    /// Event sender for progress reporting
    pub tx: EventSender,
    /// Loaded configuration
    pub config: Config,
    /// Run-level cancellation
    pub cancel: CancellationToken,
}

impl EventEmitter for OpsCtx {
    fn event_sender(&self) -> Option<&EventSender> {
        Some(&self.tx)
    }
}

impl OpsCtx {
    // No public constructor - use OpsContextBuilder instead

    /// Whether the run has been cancelled
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

/// Builder for operations context
pub struct OpsContextBuilder {
    net: Option<NetClient>,
    downloader: Option<ArtifactDownloader>,
    solver: Option<Arc<dyn PackageSolver>>,
    tx: Option<EventSender>,
    config: Option<Config>,
    cancel: Option<CancellationToken>,
}

impl OpsContextBuilder {
    /// Create new context builder
    #[must_use]
    pub fn new() -> Self {
        Self {
            net: None,
            downloader: None,
            solver: None,
            tx: None,
            config: None,
            cancel: None,
        }
    }

    /// Set network client
    #[must_use]
    pub fn with_net(mut self, net: NetClient) -> Self {
        self.net = Some(net);
        self
    }

    /// Set artifact downloader
    #[must_use]
    pub fn with_downloader(mut self, downloader: ArtifactDownloader) -> Self {
        self.downloader = Some(downloader);
        self
    }

    /// Set RPM solver
    #[must_use]
    pub fn with_solver(mut self, solver: Arc<dyn PackageSolver>) -> Self {
        self.solver = Some(solver);
        self
    }

    /// Set event sender
    #[must_use]
    pub fn with_event_sender(mut self, tx: EventSender) -> Self {
        self.tx = Some(tx);
        self
    }

    /// Set configuration
    #[must_use]
    pub fn with_config(mut self, config: Config) -> Self {
        self.config = Some(config);
        self
    }

    /// Set cancellation token; a fresh token is used when unset
    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Build the context
    ///
    /// # Errors
    ///
    /// Returns an error if any required component is missing.
    pub fn build(self) -> Result<OpsCtx, Error> {
        let net = self.net.ok_or_else(|| missing("net"))?;
        let downloader = self.downloader.ok_or_else(|| missing("downloader"))?;
        let solver = self.solver.ok_or_else(|| missing("solver"))?;
        let tx = self.tx.ok_or_else(|| missing("event_sender"))?;
        let config = self.config.ok_or_else(|| missing("config"))?;

        Ok(OpsCtx {
            net,
            downloader,
            solver,
            tx,
            config,
            cancel: self.cancel.unwrap_or_default(),
        })
    }
}

impl Default for OpsContextBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn missing(component: &str) -> Error {
    OpsError::MissingComponent {
        component: component.to_string(),
    }
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use repofetch_net::DeliveryConfig;
    use repofetch_resolver::ClosureSolver;

    #[test]
    fn test_missing_component_is_named() {
        let (tx, _rx) = repofetch_events::channel();
        let result = OpsContextBuilder::new()
            .with_event_sender(tx)
            .with_config(Config::default())
            .build();

        match result {
            Err(Error::Ops(OpsError::MissingComponent { component })) => {
                assert_eq!(component, "net");
            }
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("context built without a network client"),
        }
    }

    #[test]
    fn test_build_with_all_components() {
        let (tx, _rx) = repofetch_events::channel();
        let net = NetClient::with_defaults().unwrap();
        let ctx = OpsContextBuilder::new()
            .with_downloader(ArtifactDownloader::new(net.clone(), DeliveryConfig::default()))
            .with_net(net)
            .with_solver(Arc::new(ClosureSolver::new()))
            .with_event_sender(tx)
            .with_config(Config::default())
            .build()
            .unwrap();

        assert!(!ctx.is_cancelled());
        assert_eq!(ctx.solver.name(), "native");
    }
}
