//! Controller runner - builds the BatchJob controller future
//!
//! The controller watches BatchJobs and the SparkApplications they own, so an
//! engine state change triggers a reconcile of the owning job.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use futures::StreamExt;
use kube::api::DynamicObject;
use kube::runtime::watcher::Config as WatcherConfig;
use kube::runtime::Controller;
use kube::{Api, Client};

use batchjob_common::crd::BatchJob;
use batchjob_controller::{error_policy, reconcile, Context};
use batchjob_spark::spark_api_resource;

/// Watcher timeout (seconds) - must be less than client read_timeout (30s)
const WATCH_TIMEOUT_SECS: u32 = 25;

/// Build the BatchJob controller future
pub fn build_batchjob_controller(
    client: Client,
    namespace: Option<&str>,
    ctx: Arc<Context>,
) -> Pin<Box<dyn Future<Output = ()> + Send>> {
    let spark = spark_api_resource();
    let (jobs, apps): (Api<BatchJob>, Api<DynamicObject>) = match namespace {
        Some(ns) => (
            Api::namespaced(client.clone(), ns),
            Api::namespaced_with(client, ns, &spark),
        ),
        None => (Api::all(client.clone()), Api::all_with(client, &spark)),
    };

    let controller = Controller::new(jobs, WatcherConfig::default().timeout(WATCH_TIMEOUT_SECS))
        .owns_with(
            apps,
            spark,
            WatcherConfig::default().timeout(WATCH_TIMEOUT_SECS),
        )
        .shutdown_on_signal()
        .run(reconcile, error_policy, ctx)
        .for_each(log_reconcile_result("BatchJob"));

    Box::pin(controller)
}

fn log_reconcile_result<T: std::fmt::Debug, E: std::fmt::Debug>(
    controller_name: &'static str,
) -> impl Fn(Result<T, E>) -> std::future::Ready<()> {
    move |result| {
        match result {
            Ok(action) => tracing::debug!(?action, "{} reconciliation completed", controller_name),
            Err(e) => tracing::error!(error = ?e, "{} reconciliation error", controller_name),
        }
        std::future::ready(())
    }
}
