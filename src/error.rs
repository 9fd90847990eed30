/*
 * ghharvest
 *
 * ghharvest is free software; you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation; either version 2 of the License, or
 * (at your option) any later version.
 *
 * ghharvest is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with ghharvest.  If not, see <http://www.gnu.org/licenses/>.
 *
 */

use chrono::{DateTime, SecondsFormat, Utc};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HarvestError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("GITHUB_TOKEN {0}")]
    MissingToken(&'static str),

    #[error("authentication failed ({status}): {message}")]
    Authentication { status: u16, message: String },

    #[error("API rate limit exceeded{}", reset_suffix(.reset))]
    RateLimit { reset: Option<DateTime<Utc>> },

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("unexpected status {status}: {message}")]
    UnexpectedStatus { status: u16, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type HarvestResult<T> = Result<T, HarvestError>;

impl HarvestError {
    /// Errors after which no further request with the same credential can succeed.
    pub fn is_fatal(&self) -> bool {
        matches!(self, HarvestError::Authentication { .. })
    }
}

/// Advice printed after a configuration failure, if any applies.
pub fn config_hint(err: &HarvestError) -> Option<&'static str> {
    match err {
        HarvestError::MissingToken(_) => {
            Some("Please ensure GITHUB_TOKEN is set in the environment or in a .env file.")
        }
        _ => None,
    }
}

fn reset_suffix(reset: &Option<DateTime<Utc>>) -> String {
    match reset {
        Some(at) => format!(
            ", quota resets at {}",
            at.to_rfc3339_opts(SecondsFormat::Secs, true)
        ),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limit_message_includes_reset_time() {
        let reset = DateTime::from_timestamp(1_700_000_000, 0);
        let err = HarvestError::RateLimit { reset };
        assert_eq!(
            err.to_string(),
            "API rate limit exceeded, quota resets at 2023-11-14T22:13:20Z"
        );
    }

    #[test]
    fn rate_limit_message_without_reset() {
        let err = HarvestError::RateLimit { reset: None };
        assert_eq!(err.to_string(), "API rate limit exceeded");
    }

    #[test]
    fn token_hint_only_for_missing_token() {
        assert!(config_hint(&HarvestError::MissingToken("not found")).is_some());
        assert!(config_hint(&HarvestError::Config("bad repo".into())).is_none());
        assert!(config_hint(&HarvestError::RateLimit { reset: None }).is_none());
    }

    #[test]
    fn only_authentication_is_fatal() {
        let auth = HarvestError::Authentication {
            status: 401,
            message: "Bad credentials".into(),
        };
        assert!(auth.is_fatal());
        assert!(!HarvestError::RateLimit { reset: None }.is_fatal());
        assert!(!HarvestError::MalformedResponse("x".into()).is_fatal());
    }
}
