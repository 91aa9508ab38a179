//! SparkApplication compiler for BatchJobs
//!
//! Turns a placed `BatchJob` into the `sparkoperator.k8s.io/v1beta2`
//! `SparkApplication` that carries its placement. Pure compilation crate,
//! no API calls.

#![deny(missing_docs)]

mod compiler;
mod types;

pub use compiler::{compile_spark_application, spark_api_resource};
pub use types::{
    SparkApplication, SPARK_API_VERSION, SPARK_GROUP, SPARK_KIND, SPARK_PLURAL, SPARK_VERSION,
};
