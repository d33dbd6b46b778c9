//! Bounded fan-out of page pipelines.
//!
//! Every page gets its own task; a shared semaphore with
//! [`PAGE_CONCURRENCY`] permits gates how many run at once. Permits are
//! owned by the task, so they are released when the task ends however it
//! ends, panics included. Results are collected in page order regardless of
//! completion order.

use crate::collaborators::Collaborators;
use crate::error::PageError;
use crate::model::PageUnit;
use crate::output::{PageMarkupResult, PageResult};
use crate::pipeline::page::{markup_page, process_page};
use crate::progress::ProgressCallback;
use futures::future::join_all;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{info, warn};

/// Maximum number of page pipelines in flight at once.
pub const PAGE_CONCURRENCY: usize = 4;

/// Run `job` once per unit, at most [`PAGE_CONCURRENCY`] at a time.
///
/// Output order equals input order. A task that dies yields
/// `Err((page_number, reason))` in its slot; the others are unaffected.
async fn fan_out<T, F, Fut>(units: Vec<PageUnit>, job: F) -> Vec<Result<T, (usize, String)>>
where
    T: Send + 'static,
    F: Fn(PageUnit) -> Fut,
    Fut: Future<Output = T> + Send + 'static,
{
    let semaphore = Arc::new(Semaphore::new(PAGE_CONCURRENCY));

    let handles: Vec<(usize, tokio::task::JoinHandle<T>)> = units
        .into_iter()
        .map(|unit| {
            let page = unit.page_number;
            let semaphore = Arc::clone(&semaphore);
            let work = job(unit);
            let handle = tokio::spawn(async move {
                let _permit = semaphore.acquire_owned().await;
                work.await
            });
            (page, handle)
        })
        .collect();

    let (pages, handles): (Vec<usize>, Vec<_>) = handles.into_iter().unzip();
    join_all(handles)
        .await
        .into_iter()
        .zip(pages)
        .map(|(joined, page)| joined.map_err(|e| (page, e.to_string())))
        .collect()
}

/// Index every page, reporting progress as pages finish.
pub async fn index_pages(
    units: Vec<PageUnit>,
    collaborators: &Collaborators,
    progress: Option<&ProgressCallback>,
) -> Vec<PageResult> {
    let total_pages = units.len();
    info!(
        "Indexing {} page(s), {} at a time",
        total_pages, PAGE_CONCURRENCY
    );

    let results = fan_out(units, |unit| {
        let collaborators = collaborators.clone();
        let progress = progress.cloned();
        async move {
            let page_num = unit.page_number;
            if let Some(ref cb) = progress {
                cb.on_page_start(page_num, total_pages);
            }
            let result = process_page(unit, &collaborators).await;
            if let Some(ref cb) = progress {
                match &result.error {
                    None => cb.on_page_complete(page_num, total_pages, result.entries.len()),
                    Some(e) => cb.on_page_error(page_num, total_pages, &e.to_string()),
                }
            }
            result
        }
    })
    .await;

    results
        .into_iter()
        .map(|joined| {
            joined.unwrap_or_else(|(page, detail)| {
                let error = PageError::TaskFailed { page, detail };
                warn!("{}", error);
                if let Some(cb) = progress {
                    cb.on_page_error(page, total_pages, &error.to_string());
                }
                PageResult::failure(error, 0)
            })
        })
        .collect()
}

/// Reconcile every page without describing or indexing anything.
pub async fn markup_pages(
    units: Vec<PageUnit>,
    collaborators: &Collaborators,
) -> Vec<PageMarkupResult> {
    let results = fan_out(units, |unit| {
        let collaborators = collaborators.clone();
        async move { markup_page(unit, &collaborators).await }
    })
    .await;

    results
        .into_iter()
        .map(|joined| {
            joined.unwrap_or_else(|(page, detail)| {
                let error = PageError::TaskFailed { page, detail };
                warn!("{}", error);
                PageMarkupResult {
                    page_num: page,
                    markup: String::new(),
                    error: Some(error),
                }
            })
        })
        .collect()
}
