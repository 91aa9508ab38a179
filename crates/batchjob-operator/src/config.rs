//! Command line and environment configuration

use std::net::SocketAddr;

use batchjob_common::retry::RetryConfig;
use batchjob_common::{DEFAULT_LISTEN_ADDR, DEFAULT_SCHEDULER_NAME};
use batchjob_controller::{ControllerConfig, FailedSubmissionPolicy};
use batchjob_extender::{ExtenderConfig, UnplacedPodPolicy};
use clap::{ArgAction, Args, Parser, Subcommand};

/// BatchJob operator - queues Spark batch jobs until an external agent places them
#[derive(Parser, Debug)]
#[command(name = "batchjob-operator", version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    #[command(flatten)]
    pub run: RunArgs,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the reconciler and the extender API (default)
    Run,
    /// Print the BatchJob CRD as YAML and exit
    Crd,
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Address of the extender HTTP API
    #[arg(long, env = "BATCHJOB_LISTEN_ADDR", default_value = DEFAULT_LISTEN_ADDR)]
    pub listen_addr: SocketAddr,

    /// Scheduler name stamped on SparkApplication pods
    #[arg(long, env = "BATCHJOB_SCHEDULER_NAME", default_value = DEFAULT_SCHEDULER_NAME)]
    pub scheduler_name: String,

    /// What happens to jobs whose SparkApplication is rejected: terminal | requeue
    #[arg(long, env = "BATCHJOB_FAILED_SUBMISSION_POLICY", default_value = "terminal")]
    pub failed_submission_policy: FailedSubmissionPolicy,

    /// Eligibility of pods without a placement in the filter: allow-all | deny-all
    #[arg(long, env = "BATCHJOB_UNPLACED_POD_POLICY", default_value = "allow-all")]
    pub unplaced_pod_policy: UnplacedPodPolicy,

    /// Attempts for a status write that keeps conflicting
    #[arg(long, env = "BATCHJOB_STATUS_UPDATE_ATTEMPTS", default_value_t = 5)]
    pub status_update_attempts: u32,

    /// Consecutive failed reconciliations of a job before backing off until it changes
    #[arg(long, env = "BATCHJOB_RECONCILE_MAX_RETRIES", default_value_t = 8)]
    pub reconcile_max_retries: u32,

    /// Only watch BatchJobs in this namespace (all namespaces if unset)
    #[arg(long, env = "BATCHJOB_WATCH_NAMESPACE")]
    pub watch_namespace: Option<String>,

    /// Install or update the BatchJob CRD at startup
    #[arg(long, env = "BATCHJOB_INSTALL_CRDS")]
    pub install_crds: bool,

    /// Emit JSON log lines
    #[arg(long, env = "BATCHJOB_LOG_JSON", default_value_t = true, action = ArgAction::Set)]
    pub log_json: bool,
}

impl RunArgs {
    pub fn controller_config(&self) -> ControllerConfig {
        let defaults = ControllerConfig::default();
        ControllerConfig {
            scheduler_name: self.scheduler_name.clone(),
            failed_submission: self.failed_submission_policy,
            status_update_attempts: self.status_update_attempts,
            reconcile_retry: RetryConfig {
                max_attempts: self.reconcile_max_retries,
                ..defaults.reconcile_retry
            },
            ..defaults
        }
    }

    pub fn extender_config(&self) -> ExtenderConfig {
        ExtenderConfig {
            unplaced_pod_policy: self.unplaced_pod_policy,
        }
    }
}
