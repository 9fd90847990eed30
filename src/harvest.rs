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

use std::path::PathBuf;
use std::time::Duration;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use log::{debug, error, info, warn};

use crate::config::Config;
use crate::dataset::{persist, write_jsonl};
use crate::error::HarvestError;
use crate::github::ResourceKind;
use crate::pages::{PageSource, Record, fetch_all_with};
use crate::tasks;

#[derive(Debug)]
pub enum Outcome {
    Saved { records: usize, path: PathBuf },
    Failed(HarvestError),
    /// Not attempted because an earlier kind hit a fatal error.
    Skipped,
}

#[derive(Debug)]
pub struct KindReport {
    pub kind: ResourceKind,
    pub outcome: Outcome,
}

#[derive(Debug, Default)]
pub struct RunReport {
    pub kinds: Vec<KindReport>,
    pub task_files: Vec<PathBuf>,
    pub task_errors: Vec<HarvestError>,
}

impl RunReport {
    pub fn is_success(&self) -> bool {
        self.task_errors.is_empty()
            && self
                .kinds
                .iter()
                .all(|k| matches!(k.outcome, Outcome::Saved { .. }))
    }

    /// Every file written during the run.
    pub fn files(&self) -> Vec<PathBuf> {
        self.kinds
            .iter()
            .filter_map(|k| match &k.outcome {
                Outcome::Saved { path, .. } => Some(path.clone()),
                _ => None,
            })
            .chain(self.task_files.iter().cloned())
            .collect()
    }
}

fn spinner(progress: &MultiProgress, kind: ResourceKind) -> ProgressBar {
    let bar = progress.add(ProgressBar::new_spinner());
    if let Ok(style) = ProgressStyle::with_template("{spinner} {prefix:>13} {msg}") {
        bar.set_style(style);
    }
    bar.set_prefix(kind.name());
    bar.enable_steady_tick(Duration::from_millis(120));
    bar
}

/// Fetches and persists every configured kind, one after the other.
///
/// A failed kind leaves its destination untouched. An authentication failure
/// skips the kinds that follow it.
pub fn run<S: PageSource + ?Sized>(
    source: &S,
    config: &Config,
    progress: &MultiProgress,
) -> RunReport {
    let mut report = RunReport::default();
    let mut fetched: Vec<(ResourceKind, Vec<Record>)> = Vec::new();
    let mut abort = false;

    for &kind in &config.kinds {
        if abort {
            warn!("Skipping {} after a fatal error", kind);
            report.kinds.push(KindReport {
                kind,
                outcome: Outcome::Skipped,
            });
            continue;
        }

        info!("Collecting {} from {}", kind, config.repo);
        let bar = spinner(progress, kind);
        let on_page = |page: u32, total: usize| {
            bar.set_message(format!("page {}, {} records", page, total));
            debug!("{} page {} fetched, {} records so far", kind, page, total);
        };
        let result = fetch_all_with(source, kind, config.per_page, config.max_items, on_page);

        let outcome = match result {
            Ok(records) => {
                let path = config.destination(kind);
                match persist(&records, &path) {
                    Ok(()) => {
                        bar.finish_with_message(format!("{} records", records.len()));
                        info!("Saved {} {} to {}", records.len(), kind, path.display());
                        let count = records.len();
                        if config.derive_tasks {
                            fetched.push((kind, records));
                        }
                        Outcome::Saved {
                            records: count,
                            path,
                        }
                    }
                    Err(err) => {
                        bar.abandon_with_message("write failed");
                        error!("Could not write {}: {}", path.display(), err);
                        Outcome::Failed(err)
                    }
                }
            }
            Err(err) => {
                bar.abandon_with_message("failed");
                error!("Fetching {} failed: {}", kind, err);
                abort = err.is_fatal();
                Outcome::Failed(err)
            }
        };

        report.kinds.push(KindReport { kind, outcome });
    }

    for (kind, records) in &fetched {
        for dataset in tasks::derive(*kind, records) {
            let path = config.output_dir.join(dataset.file_name);
            match write_jsonl(&dataset.items, &path) {
                Ok(()) => {
                    info!("Saved {} items to {}", dataset.items.len(), path.display());
                    report.task_files.push(path);
                }
                Err(err) => {
                    error!("Could not write {}: {}", path.display(), err);
                    report.task_errors.push(err);
                }
            }
        }
    }

    report
}
