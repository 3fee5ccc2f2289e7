//! APIM Testsuite - end-to-end test kit for an API-management platform
//!
//! This library provides the pieces tests are written with: a client for the
//! mail-capture service, page objects for the admin portal with a navigation
//! engine that drives the browser between them, and fixtures that provision
//! and tear down cluster resources under a bounded worker pool.

pub mod browser;
pub mod config;
pub mod entity;
pub mod error;
pub mod fixtures;
pub mod mail;
pub mod ui;
pub mod wait;
pub mod widget;

pub use browser::{Browser, Locator, MockBrowser, Session, WebDriverBrowser};
pub use config::{SuiteConfig, Validate, ValidationResult};
pub use entity::{ApplicationPlan, Backend, Product};
pub use error::{Error, Result};
pub use fixtures::{
    blame, deploy_app, gather_finalizers, provision_batch, BatchOutcome, Cluster, Finalizer,
    OcCli, Provisioned, TestScope, WorkerPool,
};
pub use mail::{MailClient, Message, Messages};
pub use ui::{navigate, prerequisite_chain, View};
pub use wait::{poll_until, WaitConfig};

/// Installs a tracing subscriber writing through the test harness.
///
/// Honors `RUST_LOG`; safe to call from every test.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_test_writer()
        .try_init();
}
