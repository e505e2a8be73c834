//! Live reachability checks for every configured service

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::config::Config;
use crate::notify::LineNotifier;
use crate::platforms::PlatformRegistry;
use crate::source::NotionSource;
use crate::transport::JsonTransport;

/// Result of probing one service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceCheck {
    pub service: String,
    pub ok: bool,
    pub message: String,
}

impl ServiceCheck {
    fn passed(service: &str, message: impl Into<String>) -> Self {
        Self {
            service: service.to_string(),
            ok: true,
            message: message.into(),
        }
    }

    fn failed(service: &str, message: impl Into<String>) -> Self {
        let message = message.into();
        warn!("{} check failed: {}", service, message);
        Self {
            service: service.to_string(),
            ok: false,
            message,
        }
    }
}

/// Query the source store, every publisher with credentials and the
/// notifier. Unconfigured services are skipped; nothing is published.
pub async fn probe_services(config: &Config, transport: Arc<dyn JsonTransport>) -> Vec<ServiceCheck> {
    let mut checks = Vec::new();

    if config.source.api_key.is_empty() || config.source.database_id.is_empty() {
        checks.push(ServiceCheck::failed("source", "not configured"));
    } else {
        let source = NotionSource::new(&config.source, transport.clone());
        checks.push(match source.probe().await {
            Ok(count) => ServiceCheck::passed("source", format!("{} pending post(s)", count)),
            Err(e) => ServiceCheck::failed("source", e.to_string()),
        });
    }

    let registry = PlatformRegistry::from_config(config, transport.clone());
    for kind in registry.kinds() {
        let Some(publisher) = registry.get(kind) else {
            continue;
        };
        debug!("Verifying {} account", kind);
        checks.push(match publisher.verify().await {
            Ok(info) => {
                let who = info
                    .name
                    .or(info.id)
                    .unwrap_or_else(|| "unnamed account".to_string());
                ServiceCheck::passed(kind.as_str(), format!("authenticated as {}", who))
            }
            Err(e) => ServiceCheck::failed(kind.as_str(), e.to_string()),
        });
    }

    if config.notifier.channel_access_token.is_empty() {
        checks.push(ServiceCheck::failed("notifier", "not configured"));
    } else {
        let notifier = LineNotifier::new(&config.notifier, transport);
        checks.push(match notifier.verify().await {
            Ok(info) => {
                let name = info
                    .get("displayName")
                    .and_then(Value::as_str)
                    .unwrap_or("bot");
                ServiceCheck::passed("notifier", format!("bot {}", name))
            }
            Err(e) => ServiceCheck::failed("notifier", e.to_string()),
        });
    }

    checks
}
