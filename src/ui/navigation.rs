//! Navigation through the view prerequisite tree.
//!
//! To reach a view, walk its prerequisites back until one is already on
//! screen (or a root is passed), then replay the steps forward. Every hop must
//! show its view before the next one starts, so a broken step fails at that
//! hop instead of somewhere downstream.

use crate::error::{Error, Result};
use crate::wait::poll_until;

use super::View;

/// Names of the views from the root down to `view`, inclusive.
///
/// Pure: only prerequisites are consulted, the browser is not touched.
pub fn prerequisite_chain(view: &dyn View) -> Vec<&'static str> {
    let mut names = vec![view.name()];
    let mut next = view.prerequisite();
    while let Some(current) = next {
        names.push(current.name());
        next = current.prerequisite();
    }
    names.reverse();
    names
}

async fn arrive(view: &dyn View, destination: &'static str, hop: usize) -> Result<()> {
    tracing::info!(
        destination = destination,
        hop = hop,
        view = view.name(),
        path = view.path(),
        "navigation hop"
    );

    view.step().await.map_err(|source| Error::NavigationStep {
        target: destination,
        hop,
        view: view.name(),
        source: Box::new(source),
    })?;

    let what = format!("{} to be displayed", view.name());
    poll_until(view.session().wait(), &what, || view.is_displayed())
        .await
        .map_err(|_| {
            tracing::warn!(destination = destination, hop = hop, view = view.name(), "hop did not arrive");
            Error::Navigation {
                target: destination,
                hop,
                view: view.name(),
            }
        })
}

/// Drives the browser to `target` and returns it once it is displayed.
pub async fn navigate<V: View>(target: V) -> Result<V> {
    let destination = target.name();
    if target.is_displayed().await {
        tracing::debug!(view = destination, "already displayed");
        return Ok(target);
    }

    // Views still to pass through, nearest to the target first.
    let mut pending: Vec<Box<dyn View>> = Vec::new();
    let mut next = target.prerequisite();
    while let Some(view) = next {
        if view.is_displayed().await {
            tracing::debug!(view = view.name(), "navigation starts from displayed view");
            break;
        }
        next = view.prerequisite();
        pending.push(view);
    }
    pending.reverse();

    for (hop, view) in pending.iter().enumerate() {
        arrive(view.as_ref(), destination, hop).await?;
    }
    arrive(&target, destination, pending.len()).await?;

    Ok(target)
}
