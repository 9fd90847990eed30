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

//! Fine-tuning task datasets derived from the raw records.

use std::sync::LazyLock;

use log::debug;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;

use crate::github::ResourceKind;
use crate::pages::Record;

static FIX_KEYWORDS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(fix(es|ed)?|bug|patch|correct(s|ed)?)\b").expect("valid fix keyword regex")
});

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CodeSearchItem {
    pub task: &'static str,
    pub id: Value,
    pub query: String,
    pub body: Value,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BugClassificationItem {
    pub task: &'static str,
    pub id: Value,
    pub pr_number: Value,
    pub title: String,
    pub labels: Vec<String>,
    pub diff_url: String,
    pub state: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommitItem {
    pub task: &'static str,
    pub sha: String,
    pub message: String,
    pub author: Option<String>,
}

/// One task file ready to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskDataset {
    pub file_name: &'static str,
    pub items: Vec<Value>,
}

fn str_field(record: &Record, key: &str) -> Option<String> {
    record.get(key).and_then(Value::as_str).map(str::to_string)
}

/// Issues that are not pull requests: title as query, body as answer.
pub fn code_search(issues: &[Record]) -> Vec<CodeSearchItem> {
    issues
        .iter()
        .filter(|issue| !issue.contains_key("pull_request"))
        .filter_map(|issue| {
            let item = CodeSearchItem {
                task: "code_search",
                id: issue.get("id")?.clone(),
                query: str_field(issue, "title")?,
                body: issue.get("body").cloned().unwrap_or(Value::Null),
                url: str_field(issue, "html_url")?,
            };
            Some(item)
        })
        .collect()
}

/// Pull requests with their label names; the diff is downloaded later from `diff_url`.
pub fn bug_classification(pulls: &[Record]) -> Vec<BugClassificationItem> {
    pulls
        .iter()
        .filter_map(|pr| {
            let labels: Vec<String> = pr
                .get("labels")
                .and_then(Value::as_array)
                .map(|labels| {
                    labels
                        .iter()
                        .filter_map(|l| l.get("name").and_then(Value::as_str))
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default();
            Some(BugClassificationItem {
                task: "bug_classification",
                id: pr.get("id")?.clone(),
                pr_number: pr.get("number")?.clone(),
                title: str_field(pr, "title")?,
                labels,
                diff_url: str_field(pr, "diff_url")?,
                state: pr.get("state").cloned().unwrap_or(Value::Null),
            })
        })
        .collect()
}

/// Splits non-merge commits into (commit message generation, code repair).
pub fn commit_datasets(commits: &[Record]) -> (Vec<CommitItem>, Vec<CommitItem>) {
    let mut commit_gen = Vec::new();
    let mut code_repair = Vec::new();

    for commit in commits {
        let parents = commit
            .get("parents")
            .and_then(Value::as_array)
            .map(Vec::len)
            .unwrap_or(0);
        if parents > 1 {
            continue;
        }

        let Some(sha) = str_field(commit, "sha") else {
            debug!("Skipping commit without sha");
            continue;
        };
        let details = commit.get("commit");
        let Some(message) = details
            .and_then(|c| c.get("message"))
            .and_then(Value::as_str)
            .map(str::to_string)
        else {
            debug!("Skipping commit {} without message", sha);
            continue;
        };
        let author = details
            .and_then(|c| c.get("author"))
            .and_then(|a| a.get("name"))
            .and_then(Value::as_str)
            .map(str::to_string);

        if FIX_KEYWORDS.is_match(&message) {
            code_repair.push(CommitItem {
                task: "code_repair",
                sha: sha.clone(),
                message: message.clone(),
                author: author.clone(),
            });
        }
        commit_gen.push(CommitItem {
            task: "commit_gen",
            sha,
            message,
            author,
        });
    }

    (commit_gen, code_repair)
}

fn to_values<T: Serialize>(items: Vec<T>) -> Vec<Value> {
    items
        .into_iter()
        .filter_map(|item| serde_json::to_value(item).ok())
        .collect()
}

/// Task files produced from the records of one kind.
pub fn derive(kind: ResourceKind, records: &[Record]) -> Vec<TaskDataset> {
    let datasets = match kind {
        ResourceKind::Issues => vec![TaskDataset {
            file_name: "task_1_code_search.jsonl",
            items: to_values(code_search(records)),
        }],
        ResourceKind::PullRequests => vec![TaskDataset {
            file_name: "task_3_bug_classification.jsonl",
            items: to_values(bug_classification(records)),
        }],
        ResourceKind::Commits => {
            let (commit_gen, code_repair) = commit_datasets(records);
            vec![
                TaskDataset {
                    file_name: "task_4_commit_gen.jsonl",
                    items: to_values(commit_gen),
                },
                TaskDataset {
                    file_name: "task_2_code_repair.jsonl",
                    items: to_values(code_repair),
                },
            ]
        }
    };

    for dataset in &datasets {
        debug!(
            "Derived {} items for {} from {} {}",
            dataset.items.len(),
            dataset.file_name,
            records.len(),
            kind
        );
    }
    datasets
}
