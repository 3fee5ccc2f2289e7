//! Resource lifecycle for tests: unique names, finalizers, bounded batch
//! provisioning and the cluster the platform runs in.

pub mod blame;
pub mod cluster;
pub mod pool;
pub mod scope;

pub use blame::blame;
pub use cluster::{deploy_app, Cluster, OcCli};
pub use pool::{gather_finalizers, provision_batch, BatchOutcome, Provisioned, WorkerPool};
pub use scope::{Finalizer, TestScope};
