//! Runtime settings for the checkout workflow.

use crate::domain::money::Currency;
use std::io::IsTerminal;
use std::time::Duration;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Which payment gateway the binary talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum GatewayKind {
    /// Deterministic in-process gateway; no network.
    #[default]
    Sandbox,
    /// Stripe REST API; needs a secret key.
    Stripe,
}

/// Knobs shared by the orchestrator, the charge executor and the reconciler.
#[derive(Debug, Clone)]
pub struct CheckoutConfig {
    /// Statement description sent with every charge.
    pub description: String,
    /// Currency used when a request does not name one.
    pub default_currency: Currency,
    /// Upper bound on a single gateway call. A charge that exceeds it is
    /// treated as having an unknown outcome.
    pub gateway_timeout: Duration,
    /// Intents untouched for this long are picked up by reconciliation.
    pub stale_after: Duration,
}

impl Default for CheckoutConfig {
    fn default() -> Self {
        Self {
            description: "Online store purchase".to_string(),
            default_currency: Currency::usd(),
            gateway_timeout: Duration::from_secs(30),
            stale_after: Duration::from_secs(300),
        }
    }
}

impl CheckoutConfig {
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_gateway_timeout(mut self, timeout: Duration) -> Self {
        self.gateway_timeout = timeout;
        self
    }

    pub fn with_stale_after(mut self, stale_after: Duration) -> Self {
        self.stale_after = stale_after;
        self
    }

    pub fn with_default_currency(mut self, currency: Currency) -> Self {
        self.default_currency = currency;
        self
    }
}

/// Installs the global tracing subscriber, writing to stderr.
///
/// `RUST_LOG` overrides `default_level`. Output stays free of ANSI codes
/// unless stderr is a terminal, so redirected logs remain greppable.
pub fn init_tracing(default_level: &str) -> Result<(), tracing_subscriber::util::TryInitError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{default_level},hyper=warn,reqwest=warn")));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_target(true)
                .with_ansi(std::io::stderr().is_terminal())
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .try_init()
}
