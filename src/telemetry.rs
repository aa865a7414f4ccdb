//! Dev-only tracing setup and log-safe report identifiers.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub const ENV_DEV_LOG: &str = "VALIDATOR_DEV_LOG";

/// `VALIDATOR_DEV_LOG=1` and a dev environment (debug build, or
/// `SHUTTLE_ENV` in local/development/dev).
pub fn dev_logging_enabled() -> bool {
    let on = std::env::var(ENV_DEV_LOG).ok().as_deref() == Some("1");
    if !on {
        return false;
    }
    if cfg!(debug_assertions) {
        return true;
    }
    matches!(
        std::env::var("SHUTTLE_ENV")
            .unwrap_or_default()
            .to_ascii_lowercase()
            .as_str(),
        "local" | "development" | "dev"
    )
}

/// Install a compact fmt subscriber when dev logging is on. No-op otherwise,
/// and a no-op if a global subscriber already exists.
pub fn enable_dev_tracing() {
    if !dev_logging_enabled() {
        return;
    }
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("validator=info,warn"));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .try_init();
}

/// First 6 bytes of SHA-256, hex. Identifies a report in logs without its text.
pub fn anon_hash(text: &str) -> String {
    use sha2::{Digest, Sha256};
    use std::fmt::Write as _;

    let digest = Sha256::digest(text.as_bytes());
    let mut out = String::with_capacity(12);
    for b in digest.iter().take(6) {
        let _ = write!(&mut out, "{b:02x}");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anon_hash_is_short_and_stable() {
        let a = anon_hash("Mangroves cut near the jetty");
        assert_eq!(a.len(), 12);
        assert_eq!(a, anon_hash("Mangroves cut near the jetty"));
        assert_ne!(a, anon_hash("Mangroves cut near the pier"));
        // sha256("") = e3b0c442 98fc...
        assert_eq!(anon_hash(""), "e3b0c44298fc");
    }
}
