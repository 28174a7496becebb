//! Structured logging setup
//!
//! `RUST_LOG` drives the filter (default `info`), `LOG_FORMAT` picks the
//! output (`json`, `compact`, anything else is pretty).

use std::env;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
  Json,
  Pretty,
  Compact,
}

impl LogFormat {
  pub fn parse(value: Option<&str>) -> Self {
    match value {
      Some("json") => LogFormat::Json,
      Some("compact") => LogFormat::Compact,
      _ => LogFormat::Pretty,
    }
  }
}

/// Build the env filter, keeping HTTP plumbing crates quiet
pub fn build_filter(level: &str) -> EnvFilter {
  let mut filter = EnvFilter::new(level);
  for directive in ["hyper=warn", "reqwest=warn", "sqlx=warn", "tower_http=info"] {
    if let Ok(d) = directive.parse() {
      filter = filter.add_directive(d);
    }
  }
  filter
}

/// Install the global subscriber. Fails if one is already set.
pub fn init_from_env() -> anyhow::Result<()> {
  let level = env::var("RUST_LOG").unwrap_or_else(|_| "info".into());
  let format = LogFormat::parse(env::var("LOG_FORMAT").ok().as_deref());
  let registry = tracing_subscriber::registry().with(build_filter(&level));

  match format {
    LogFormat::Json => registry
      .with(fmt::layer().json().with_current_span(false))
      .try_init()?,
    LogFormat::Compact => registry.with(fmt::layer().compact()).try_init()?,
    LogFormat::Pretty => registry.with(fmt::layer()).try_init()?,
  }

  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_log_format_parse() {
    assert_eq!(LogFormat::parse(Some("json")), LogFormat::Json);
    assert_eq!(LogFormat::parse(Some("compact")), LogFormat::Compact);
    assert_eq!(LogFormat::parse(Some("loud")), LogFormat::Pretty);
    assert_eq!(LogFormat::parse(None), LogFormat::Pretty);
  }

  #[test]
  fn test_filter_accepts_module_directives() {
    let filter = build_filter("recovance_lib=debug,info");
    assert!(filter.to_string().contains("recovance_lib=debug"));
  }
}
