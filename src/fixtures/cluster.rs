//! Cluster operations used by fixtures.
//!
//! Only four operations are needed: resolve the route host of a service,
//! instantiate a template, wait for a deployment and delete an app. The
//! [`OcCli`] implementation shells out to `oc`.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::process::Command;

use crate::config::ClusterConfig;
use crate::error::{Error, Result};
use crate::wait::{poll_until, WaitConfig};

use super::scope::TestScope;

/// The cluster the platform under test runs in.
#[async_trait]
pub trait Cluster: Send + Sync {
    /// Host of the first route exposing `service`.
    async fn route_host(&self, service: &str) -> Result<String>;

    /// Instantiates `template` with the given parameters.
    async fn new_app(&self, template: &Path, params: &[(String, String)]) -> Result<()>;

    /// Whether every replica of deployment `name` is ready.
    async fn deployment_ready(&self, name: &str) -> Result<bool>;

    /// Deletes resources of `kind` labelled `app={name}`.
    async fn delete_app(&self, name: &str, kind: &str) -> Result<()>;

    /// Waits until deployment `name` is ready.
    async fn wait_for_deployment(&self, name: &str, timeout: Duration) -> Result<()> {
        let config = WaitConfig {
            timeout,
            initial_poll: Duration::from_secs(1),
            max_poll: Duration::from_secs(10),
        };
        let what = format!("deployment {} to be ready", name);
        poll_until(&config, &what, || async move {
            match self.deployment_ready(name).await {
                Ok(ready) => ready,
                Err(e) => {
                    tracing::debug!(deployment = %name, error = %e, "readiness probe failed");
                    false
                }
            }
        })
        .await
    }
}

/// Host of the first route whose backend is `service`.
///
/// `routes` is the JSON list printed by `oc get route -o json`.
pub fn host_for_service(routes: &Value, service: &str) -> Option<String> {
    routes["items"]
        .as_array()?
        .iter()
        .find(|route| route["spec"]["to"]["name"].as_str() == Some(service))
        .and_then(|route| route["spec"]["host"].as_str())
        .map(str::to_string)
}

/// Whether a deployment (or deployment config) reports all replicas ready.
pub fn replicas_ready(deployment: &Value) -> bool {
    let wanted = deployment["spec"]["replicas"].as_u64().unwrap_or(1);
    let ready = deployment["status"]["readyReplicas"].as_u64().unwrap_or(0);
    ready >= wanted
}

/// `oc` command-line client.
#[derive(Debug, Clone)]
pub struct OcCli {
    binary: String,
    project: Option<String>,
}

impl OcCli {
    pub fn new(binary: impl Into<String>, project: Option<String>) -> Self {
        Self {
            binary: binary.into(),
            project,
        }
    }

    pub fn from_config(config: &ClusterConfig) -> Self {
        Self::new(config.cli.clone(), config.project.clone())
    }

    /// Full argument list for one invocation.
    fn args(&self, args: &[&str]) -> Vec<String> {
        let mut full = Vec::with_capacity(args.len() + 1);
        if let Some(project) = &self.project {
            full.push(format!("--namespace={}", project));
        }
        full.extend(args.iter().map(|arg| arg.to_string()));
        full
    }

    async fn run(&self, args: &[&str]) -> Result<String> {
        let args = self.args(args);
        tracing::debug!(cli = %self.binary, args = ?args, "running cluster command");

        let output = Command::new(&self.binary)
            .args(&args)
            .output()
            .await
            .map_err(|e| Error::Cluster(format!("failed to run {}: {}", self.binary, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::Cluster(format!(
                "{} {} failed: {}",
                self.binary,
                args.join(" "),
                stderr.trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    async fn run_json(&self, args: &[&str]) -> Result<Value> {
        let stdout = self.run(args).await?;
        Ok(serde_json::from_str(&stdout)?)
    }
}

#[async_trait]
impl Cluster for OcCli {
    async fn route_host(&self, service: &str) -> Result<String> {
        let routes = self.run_json(&["get", "route", "-o", "json"]).await?;
        host_for_service(&routes, service)
            .ok_or_else(|| Error::Cluster(format!("no route exposes service {}", service)))
    }

    async fn new_app(&self, template: &Path, params: &[(String, String)]) -> Result<()> {
        let file = format!("--file={}", template.display());
        let params: Vec<String> = params
            .iter()
            .map(|(key, value)| format!("--param={}={}", key, value))
            .collect();

        let mut args = vec!["new-app", file.as_str()];
        args.extend(params.iter().map(String::as_str));
        self.run(&args).await?;
        tracing::info!(template = %template.display(), "instantiated template");
        Ok(())
    }

    async fn deployment_ready(&self, name: &str) -> Result<bool> {
        let deployment = match self
            .run_json(&["get", &format!("deployment/{}", name), "-o", "json"])
            .await
        {
            Ok(deployment) => deployment,
            Err(_) => {
                self.run_json(&["get", &format!("dc/{}", name), "-o", "json"])
                    .await?
            }
        };
        Ok(replicas_ready(&deployment))
    }

    async fn delete_app(&self, name: &str, kind: &str) -> Result<()> {
        let selector = format!("app={}", name);
        self.run(&["delete", kind, "-l", &selector]).await?;
        tracing::info!(app = %name, kind = %kind, "deleted app");
        Ok(())
    }
}

/// Instantiates `template` as an app named by blaming `prefix`, waits for its
/// deployment and registers its deletion on `scope`.
///
/// `NAME` is added to `params`. The finalizer is registered before waiting,
/// so a deployment that never becomes ready is still removed.
pub async fn deploy_app(
    cluster: Arc<dyn Cluster>,
    scope: &mut TestScope,
    template: &Path,
    prefix: &str,
    params: &[(&str, String)],
    timeout: Duration,
) -> Result<String> {
    let name = scope.blame(prefix);
    let mut all_params = vec![("NAME".to_string(), name.clone())];
    all_params.extend(params.iter().map(|(k, v)| (k.to_string(), v.clone())));

    tracing::info!(app = %name, template = %template.display(), "deploying app");
    cluster.new_app(template, &all_params).await?;

    let deleting = Arc::clone(&cluster);
    let app = name.clone();
    scope.add_finalizer(format!("delete app {}", name), move || async move {
        deleting.delete_app(&app, "all").await
    });

    cluster.wait_for_deployment(&name, timeout).await?;
    Ok(name)
}
