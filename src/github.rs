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

use std::fmt;
use std::str::FromStr;
use std::thread;
use std::time::Duration;

use chrono::{DateTime, Utc};
use clap::ValueEnum;
use log::{debug, trace, warn};
use reqwest::StatusCode;
use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue, LINK, USER_AGENT};
use serde_json::Value;

use crate::config::Config;
use crate::error::{HarvestError, HarvestResult};
use crate::pages::{Page, PageSource, Record};

pub const GITHUB_API_URL: &str = "https://api.github.com";
const GITHUB_ACCEPT: &str = "application/vnd.github.v3+json";
const RATE_LIMIT_REMAINING: &str = "x-ratelimit-remaining";
const RATE_LIMIT_RESET: &str = "x-ratelimit-reset";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
#[value(rename_all = "snake_case")]
pub enum ResourceKind {
    Issues,
    PullRequests,
    Commits,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 3] = [
        ResourceKind::Issues,
        ResourceKind::PullRequests,
        ResourceKind::Commits,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ResourceKind::Issues => "issues",
            ResourceKind::PullRequests => "pull_requests",
            ResourceKind::Commits => "commits",
        }
    }

    /// Last path segment of the listing endpoint.
    pub fn endpoint(self) -> &'static str {
        match self {
            ResourceKind::Issues => "issues",
            ResourceKind::PullRequests => "pulls",
            ResourceKind::Commits => "commits",
        }
    }

    /// Extra query parameters sent with every page of this kind.
    pub fn filters(self) -> &'static [(&'static str, &'static str)] {
        match self {
            ResourceKind::Issues | ResourceKind::PullRequests => {
                &[("state", "all"), ("sort", "updated"), ("direction", "desc")]
            }
            ResourceKind::Commits => &[],
        }
    }

    pub fn file_name(self) -> String {
        format!("{}.json", self.name())
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An `owner/name` repository identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoId {
    pub owner: String,
    pub name: String,
}

impl FromStr for RepoId {
    type Err = HarvestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || {
            HarvestError::Config(format!("invalid repository '{}', expected OWNER/NAME", s))
        };
        let (owner, name) = s.trim().split_once('/').ok_or_else(invalid)?;
        if owner.is_empty() || name.is_empty() || name.contains('/') {
            return Err(invalid());
        }
        Ok(RepoId {
            owner: owner.to_string(),
            name: name.to_string(),
        })
    }
}

impl fmt::Display for RepoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

pub struct GithubClient {
    client: Client,
    api_url: String,
    repo: RepoId,
    page_delay: Duration,
}

impl GithubClient {
    pub fn new(config: &Config) -> HarvestResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static("ghharvest"));
        headers.insert(ACCEPT, HeaderValue::from_static(GITHUB_ACCEPT));

        let bearer_auth = format!("Bearer {}", config.credential.expose());
        let mut auth = HeaderValue::from_str(&bearer_auth).map_err(|_| {
            HarvestError::Config("token contains characters not allowed in a header".to_string())
        })?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);

        let client = Client::builder().default_headers(headers).build()?;

        Ok(Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            repo: config.repo.clone(),
            page_delay: config.page_delay,
        })
    }

    pub fn repo(&self) -> &RepoId {
        &self.repo
    }

    fn listing_url(&self, kind: ResourceKind) -> String {
        format!(
            "{}/repos/{}/{}/{}",
            self.api_url,
            self.repo.owner,
            self.repo.name,
            kind.endpoint()
        )
    }
}

impl PageSource for GithubClient {
    fn fetch_page(&self, kind: ResourceKind, page: u32, per_page: u32) -> HarvestResult<Page> {
        if page > 1 && !self.page_delay.is_zero() {
            thread::sleep(self.page_delay);
        }

        let url = self.listing_url(kind);
        let mut query: Vec<(&str, String)> = kind
            .filters()
            .iter()
            .map(|(key, value)| (*key, value.to_string()))
            .collect();
        query.push(("per_page", per_page.to_string()));
        query.push(("page", page.to_string()));

        debug!("GET {} page={} per_page={}", url, page, per_page);
        let response = self.client.get(&url).query(&query).send()?;

        let status = response.status();
        let headers = response.headers().clone();
        let text = response.text()?;
        trace!("Got {} response {:?}", status, text);

        check_status(status, &headers, &text)?;

        let records = parse_records(&text)?;
        if records.len() > per_page as usize {
            return Err(HarvestError::MalformedResponse(format!(
                "page {} holds {} records, more than the requested {}",
                page,
                records.len(),
                per_page
            )));
        }

        Ok(Page {
            records,
            has_next: next_link_hint(&headers),
        })
    }
}

/// Maps a non-success response to the matching error.
pub fn check_status(status: StatusCode, headers: &HeaderMap, body: &str) -> HarvestResult<()> {
    if status.is_success() {
        return Ok(());
    }

    let message = api_message(body);

    if status == StatusCode::TOO_MANY_REQUESTS
        || (status == StatusCode::FORBIDDEN && is_rate_limited(headers, &message))
    {
        let reset = rate_limit_reset(headers);
        warn!("Rate limited by GitHub API: {}", message);
        return Err(HarvestError::RateLimit { reset });
    }

    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(HarvestError::Authentication {
            status: status.as_u16(),
            message,
        });
    }

    Err(HarvestError::UnexpectedStatus {
        status: status.as_u16(),
        message,
    })
}

/// Extracts GitHub's `message` field, falling back to the raw body.
fn api_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| body.trim().chars().take(200).collect())
}

fn is_rate_limited(headers: &HeaderMap, message: &str) -> bool {
    let exhausted = headers
        .get(RATE_LIMIT_REMAINING)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim() == "0")
        .unwrap_or(false);
    exhausted || message.to_lowercase().contains("rate limit")
}

fn rate_limit_reset(headers: &HeaderMap) -> Option<DateTime<Utc>> {
    let secs = headers
        .get(RATE_LIMIT_RESET)?
        .to_str()
        .ok()?
        .trim()
        .parse::<i64>()
        .ok()?;
    DateTime::from_timestamp(secs, 0)
}

/// `None` without a `Link` header, otherwise whether it has a `rel="next"` entry.
pub fn next_link_hint(headers: &HeaderMap) -> Option<bool> {
    let link = headers.get(LINK)?.to_str().ok()?;
    Some(
        link.split(',')
            .any(|part| part.split(';').skip(1).any(|p| p.trim() == "rel=\"next\"")),
    )
}

/// Parses a listing body; it must be a JSON array of objects.
pub fn parse_records(body: &str) -> HarvestResult<Vec<Record>> {
    let value: Value = serde_json::from_str(body)
        .map_err(|e| HarvestError::MalformedResponse(format!("invalid JSON: {}", e)))?;

    let items = match value {
        Value::Array(items) => items,
        other => {
            return Err(HarvestError::MalformedResponse(format!(
                "expected a JSON array, got {}",
                json_type(&other)
            )));
        }
    };

    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| match item {
            Value::Object(map) => Ok(map),
            other => Err(HarvestError::MalformedResponse(format!(
                "element {} is {}, expected an object",
                index,
                json_type(&other)
            ))),
        })
        .collect()
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
