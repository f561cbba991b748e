// src/config.rs
//
// Every operation re-reads the environment into an immutable `JoplinConfig`
// instead of caching it, so token/port changes take effect without a
// restart and handlers stay testable with an injected config.
use crate::error::ConnectorError;

/// Default port of the Joplin Web Clipper service.
pub const DEFAULT_PORT: u16 = 41184;

pub const TOKEN_ENV: &str = "JOPLIN_TOKEN";
pub const PORT_ENV: &str = "JOPLIN_PORT";
pub const AUTO_LAUNCH_ENV: &str = "JOPLIN_AUTO_LAUNCH";

#[derive(Debug, Clone)]
pub struct JoplinConfig {
    pub base_url: String,
    pub token: String,
    pub auto_launch: bool,
}

impl JoplinConfig {
    /// Resolve the configuration for a data operation. A missing or empty
    /// token is a fatal configuration error.
    pub fn from_env() -> Result<Self, ConnectorError> {
        let token = token_from_env().ok_or_else(|| {
            ConnectorError::Configuration(
                "JOPLIN_TOKEN environment variable not set. \
                 Get your token from: Joplin > Tools > Options > Web Clipper"
                    .to_string(),
            )
        })?;

        Ok(JoplinConfig {
            base_url: base_url_from_env(),
            token,
            auto_launch: auto_launch_enabled(),
        })
    }
}

pub fn token_from_env() -> Option<String> {
    std::env::var(TOKEN_ENV).ok().filter(|t| !t.is_empty())
}

pub fn base_url_from_env() -> String {
    base_url_for_port(parse_port(std::env::var(PORT_ENV).ok().as_deref()))
}

pub fn auto_launch_enabled() -> bool {
    parse_auto_launch(std::env::var(AUTO_LAUNCH_ENV).ok().as_deref())
}

pub(crate) fn base_url_for_port(port: u16) -> String {
    format!("http://localhost:{}", port)
}

fn parse_port(raw: Option<&str>) -> u16 {
    raw.and_then(|p| p.trim().parse::<u16>().ok())
        .unwrap_or(DEFAULT_PORT)
}

// Enabled iff unset or "true" (case-insensitive); any other value disables.
fn parse_auto_launch(raw: Option<&str>) -> bool {
    match raw {
        Some(value) => value.trim().eq_ignore_ascii_case("true"),
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn port_defaults_and_parses() {
        assert_eq!(parse_port(None), DEFAULT_PORT);
        assert_eq!(parse_port(Some("41185")), 41185);
        assert_eq!(parse_port(Some("not-a-port")), DEFAULT_PORT);
        assert_eq!(parse_port(Some(" 8080 ")), 8080);
    }

    #[test]
    fn auto_launch_defaults_on() {
        assert!(parse_auto_launch(None));
        assert!(parse_auto_launch(Some("true")));
        assert!(parse_auto_launch(Some("TRUE")));
        assert!(!parse_auto_launch(Some("false")));
        assert!(!parse_auto_launch(Some("0")));
        assert!(!parse_auto_launch(Some("yes")));
    }

    #[test]
    fn base_url_uses_port() {
        assert_eq!(base_url_for_port(41184), "http://localhost:41184");
    }
}
