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
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::error::{HarvestError, HarvestResult};
use crate::github::{GITHUB_API_URL, RepoId, ResourceKind};

pub const DEFAULT_REPO: &str = "scikit-learn/scikit-learn";
/// The API refuses larger pages.
pub const MAX_PER_PAGE: u32 = 100;
const DEFAULT_PAGE_DELAY_MS: u64 = 1000;

#[derive(Parser, Debug)]
#[clap(version = env!("CARGO_PKG_VERSION"), about = "Collect GitHub issues, pull requests and commits into JSON datasets")]
pub struct Opts {
    /// GitHub access token
    #[clap(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub token: Option<String>,
    /// Repository to harvest
    #[clap(long, default_value = DEFAULT_REPO)]
    pub repo: String,
    /// Directory receiving the dataset files
    #[clap(long, default_value = ".")]
    pub output_dir: PathBuf,
    /// Records requested per page
    #[clap(long, default_value_t = MAX_PER_PAGE)]
    pub per_page: u32,
    /// Stop after this many records of each kind
    #[clap(long)]
    pub max_items: Option<usize>,
    /// Pause between two page requests, in milliseconds
    #[clap(long, default_value_t = DEFAULT_PAGE_DELAY_MS)]
    pub page_delay_ms: u64,
    /// Base URL of the REST API
    #[clap(long, default_value = GITHUB_API_URL)]
    pub api_url: String,
    /// Restrict the run to these resource kinds
    #[clap(long, value_enum, value_delimiter = ',')]
    pub kinds: Vec<ResourceKind>,
    /// Also write the fine-tuning task files
    #[clap(long)]
    pub derive_tasks: bool,
}

/// The access token. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: &str) -> HarvestResult<Self> {
        let token = token.trim();
        if token.is_empty() {
            return Err(HarvestError::MissingToken("is empty"));
        }
        Ok(Credential(token.to_string()))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub credential: Credential,
    pub repo: RepoId,
    pub api_url: String,
    pub output_dir: PathBuf,
    pub per_page: u32,
    pub max_items: Option<usize>,
    pub page_delay: Duration,
    /// Kinds to fetch, in canonical order and without duplicates.
    pub kinds: Vec<ResourceKind>,
    pub derive_tasks: bool,
}

impl Config {
    pub fn from_opts(opts: Opts) -> HarvestResult<Self> {
        let token = opts
            .token
            .ok_or(HarvestError::MissingToken("not found"))?;
        let credential = Credential::new(&token)?;

        let repo: RepoId = opts.repo.parse()?;

        if opts.per_page == 0 || opts.per_page > MAX_PER_PAGE {
            return Err(HarvestError::Config(format!(
                "per-page must be between 1 and {}, got {}",
                MAX_PER_PAGE, opts.per_page
            )));
        }

        if opts.max_items == Some(0) {
            return Err(HarvestError::Config(
                "max-items must be greater than zero".to_string(),
            ));
        }

        let kinds: Vec<ResourceKind> = if opts.kinds.is_empty() {
            ResourceKind::ALL.to_vec()
        } else {
            ResourceKind::ALL
                .into_iter()
                .filter(|kind| opts.kinds.contains(kind))
                .collect()
        };

        Ok(Config {
            credential,
            repo,
            api_url: opts.api_url,
            output_dir: opts.output_dir,
            per_page: opts.per_page,
            max_items: opts.max_items,
            page_delay: Duration::from_millis(opts.page_delay_ms),
            kinds,
            derive_tasks: opts.derive_tasks,
        })
    }

    pub fn destination(&self, kind: ResourceKind) -> PathBuf {
        self.output_dir.join(kind.file_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Opts {
        let mut argv = vec!["ghharvest"];
        argv.extend_from_slice(args);
        Opts::try_parse_from(argv).unwrap()
    }

    #[test]
    fn defaults_cover_every_kind() {
        let config = Config::from_opts(parse(&["--token", "abc"])).unwrap();
        assert_eq!(config.repo.to_string(), DEFAULT_REPO);
        assert_eq!(config.per_page, 100);
        assert_eq!(config.kinds, ResourceKind::ALL.to_vec());
        assert_eq!(config.page_delay, Duration::from_secs(1));
        assert_eq!(config.max_items, None);
        assert_eq!(
            config.destination(ResourceKind::Commits),
            PathBuf::from("./commits.json")
        );
    }

    #[test]
    fn missing_token_is_reported_as_such() {
        let mut opts = parse(&[]);
        opts.token = None;
        assert!(matches!(
            Config::from_opts(opts),
            Err(HarvestError::MissingToken(_))
        ));
    }

    #[test]
    fn blank_token_is_rejected() {
        assert!(matches!(
            Config::from_opts(parse(&["--token", "   "])),
            Err(HarvestError::MissingToken(_))
        ));
    }

    #[test]
    fn bad_repo_is_a_plain_config_error() {
        let err = Config::from_opts(parse(&["--token", "t", "--repo", "nope"])).unwrap_err();
        assert!(matches!(err, HarvestError::Config(_)));
        assert!(crate::error::config_hint(&err).is_none());
    }

    #[test]
    fn per_page_is_bounded() {
        assert!(Config::from_opts(parse(&["--token", "t", "--per-page", "101"])).is_err());
        assert!(Config::from_opts(parse(&["--token", "t", "--per-page", "0"])).is_err());
        assert!(Config::from_opts(parse(&["--token", "t", "--per-page", "30"])).is_ok());
    }

    #[test]
    fn kinds_are_deduplicated_in_canonical_order() {
        let opts = parse(&["--token", "t", "--kinds", "commits,issues,commits"]);
        let config = Config::from_opts(opts).unwrap();
        assert_eq!(
            config.kinds,
            vec![ResourceKind::Issues, ResourceKind::Commits]
        );
    }

    #[test]
    fn pull_requests_kind_uses_snake_case() {
        let opts = parse(&["--token", "t", "--kinds", "pull_requests"]);
        assert_eq!(opts.kinds, vec![ResourceKind::PullRequests]);
    }

    #[test]
    fn credential_is_redacted() {
        let credential = Credential::new(" secret ").unwrap();
        assert_eq!(credential.expose(), "secret");
        assert_eq!(format!("{:?}", credential), "Credential(***)");
    }
}
