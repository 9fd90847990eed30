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

pub mod config;
pub mod dataset;
pub mod error;
pub mod github;
pub mod harvest;
pub mod pages;
pub mod tasks;

pub use config::{Config, Credential, Opts};
pub use dataset::{load, persist};
pub use error::{HarvestError, HarvestResult};
pub use github::{GithubClient, RepoId, ResourceKind};
pub use pages::{Page, PageSource, Pages, Record, fetch_all};
