//! Cluster Adapter (C12): the consumed interface a Tier-2 uses to create,
//! look up, and tear down deployments on its local cluster, and to report
//! its resource state to C7. `InMemoryCluster` stands in for a real
//! Kubernetes-backed adapter, which is out of scope for this crate.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::model::Resources;

#[derive(Clone, Debug)]
pub struct Deployment {
    pub deployment_uuid: Uuid,
    pub recipe_uuid: Uuid,
    pub application_key: String,
    pub created_at: DateTime<Utc>,
    pub active: bool,
}

impl Deployment {
    fn new(recipe_uuid: Uuid, application_key: String) -> Self {
        Self {
            deployment_uuid: Uuid::new_v4(),
            recipe_uuid,
            application_key,
            created_at: Utc::now(),
            active: false,
        }
    }

    pub fn expire(&mut self) {
        self.active = false;
    }

    pub fn asdict(&self, default_endpoint: &str) -> Value {
        json!({
            "deployment_uuid": self.deployment_uuid,
            "recipe_uuid": self.recipe_uuid,
            "application_key": self.application_key,
            "endpoint": default_endpoint,
            "active": self.active,
        })
    }
}

#[async_trait]
pub trait ClusterAdapter: Send + Sync {
    async fn get(
        &self,
        recipe_uuid: Uuid,
        application_key: &str,
        create: bool,
    ) -> Result<Option<Deployment>>;

    /// Install the chart backing `deployment` and mark it active.
    /// Cancellation or a timeout talking to the installer must surface
    /// as `Error::Timeout`; any other failure is a generic error.
    async fn deploy(&self, deployment: &mut Deployment) -> Result<()>;

    async fn expire(&self, recipe_uuid: Uuid, application_key: &str) -> Result<()>;

    async fn expire_inactive_deployments(&self, inactive_for: chrono::Duration);

    async fn get_resources(&self) -> Resources;
}

type DeploymentKey = (Uuid, String);

pub struct InMemoryCluster {
    deployments: RwLock<HashMap<DeploymentKey, Deployment>>,
    last_touched: RwLock<HashMap<DeploymentKey, DateTime<Utc>>>,
    cpu_ratio: f64,
    http: reqwest::Client,
    /// Endpoint a real adapter would `POST` a chart install request to.
    /// `None` (the default) skips the call and activates immediately,
    /// which is what every test that doesn't care about the install path
    /// wants.
    chart_install_url: Option<String>,
}

impl InMemoryCluster {
    pub fn new(cpu_ratio: f64) -> Self {
        Self {
            deployments: RwLock::new(HashMap::new()),
            last_touched: RwLock::new(HashMap::new()),
            cpu_ratio,
            http: reqwest::Client::new(),
            chart_install_url: None,
        }
    }

    /// Route deploys through a real HTTP call (e.g. a Helm-install sidecar)
    /// instead of activating immediately. Used by deployments that front
    /// this adapter with an actual installer, and by tests exercising the
    /// cancellation/timeout mapping.
    pub fn with_chart_install_url(mut self, url: impl Into<String>) -> Self {
        self.chart_install_url = Some(url.into());
        self
    }
}

#[async_trait]
impl ClusterAdapter for InMemoryCluster {
    async fn get(
        &self,
        recipe_uuid: Uuid,
        application_key: &str,
        create: bool,
    ) -> Result<Option<Deployment>> {
        let key = (recipe_uuid, application_key.to_string());
        {
            let deployments = self.deployments.read().await;
            if let Some(existing) = deployments.get(&key) {
                self.last_touched.write().await.insert(key, Utc::now());
                return Ok(Some(existing.clone()));
            }
        }
        if !create {
            return Ok(None);
        }
        let deployment = Deployment::new(recipe_uuid, application_key.to_string());
        self.deployments.write().await.insert(key.clone(), deployment.clone());
        self.last_touched.write().await.insert(key, Utc::now());
        Ok(Some(deployment))
    }

    async fn deploy(&self, deployment: &mut Deployment) -> Result<()> {
        if let Some(url) = &self.chart_install_url {
            let response = self
                .http
                .post(url)
                .timeout(std::time::Duration::from_secs(5))
                .send()
                .await;
            match response {
                Ok(response) if response.status().is_success() => {}
                Ok(response) => {
                    return Err(Error::Upstream(format!(
                        "chart install for {} returned {}",
                        deployment.deployment_uuid,
                        response.status()
                    )));
                }
                Err(e) if e.is_timeout() => {
                    return Err(Error::Timeout(format!("chart install: {e}")));
                }
                Err(e) => return Err(Error::Http(e)),
            }
        }

        deployment.active = true;
        let key = (deployment.recipe_uuid, deployment.application_key.clone());
        if let Some(stored) = self.deployments.write().await.get_mut(&key) {
            stored.active = true;
        }
        Ok(())
    }

    async fn expire(&self, recipe_uuid: Uuid, application_key: &str) -> Result<()> {
        let key = (recipe_uuid, application_key.to_string());
        let mut deployments = self.deployments.write().await;
        match deployments.get_mut(&key) {
            Some(deployment) => {
                deployment.expire();
                Ok(())
            }
            None => Err(Error::NotFound("deployment not found".into())),
        }
    }

    async fn expire_inactive_deployments(&self, inactive_for: chrono::Duration) {
        let cutoff = Utc::now() - inactive_for;
        let mut last_touched = self.last_touched.write().await;
        let mut deployments = self.deployments.write().await;
        let stale: Vec<DeploymentKey> = last_touched
            .iter()
            .filter(|(_, touched)| **touched < cutoff)
            .map(|(key, _)| key.clone())
            .collect();
        for key in stale {
            if let Some(deployment) = deployments.get_mut(&key) {
                deployment.expire();
            }
            last_touched.remove(&key);
        }
    }

    async fn get_resources(&self) -> Resources {
        let mut resources = Resources::default();
        resources.0.insert("cpu_ratio".into(), Value::from(self.cpu_ratio));
        resources
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn get_without_create_on_unknown_is_none() {
        let cluster = InMemoryCluster::new(0.5);
        let result = cluster.get(Uuid::new_v4(), "key", false).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn get_with_create_then_deploy_activates() {
        let cluster = InMemoryCluster::new(0.5);
        let recipe = Uuid::new_v4();
        let mut deployment = cluster.get(recipe, "key", true).await.unwrap().unwrap();
        assert!(!deployment.active);
        cluster.deploy(&mut deployment).await.unwrap();
        assert!(deployment.active);
    }

    #[tokio::test]
    async fn expire_unknown_deployment_is_not_found() {
        let cluster = InMemoryCluster::new(0.5);
        assert!(cluster.expire(Uuid::new_v4(), "key").await.is_err());
    }

    #[tokio::test]
    async fn deploy_maps_installer_timeout_to_timeout_error() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_delay(std::time::Duration::from_secs(10)))
            .mount(&server)
            .await;

        let cluster = InMemoryCluster::new(0.0).with_chart_install_url(server.uri());
        let recipe = Uuid::new_v4();
        let mut deployment = cluster.get(recipe, "key", true).await.unwrap().unwrap();
        let err = cluster.deploy(&mut deployment).await.unwrap_err();
        assert!(matches!(err, Error::Timeout(_)));
        assert_eq!(err.status(), axum::http::StatusCode::BAD_REQUEST);
        assert!(!deployment.active);
    }

    #[tokio::test]
    async fn deploy_maps_installer_error_response_to_upstream() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .respond_with(wiremock::ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let cluster = InMemoryCluster::new(0.0).with_chart_install_url(server.uri());
        let recipe = Uuid::new_v4();
        let mut deployment = cluster.get(recipe, "key", true).await.unwrap().unwrap();
        let err = cluster.deploy(&mut deployment).await.unwrap_err();
        assert!(matches!(err, Error::Upstream(_)));
        assert_eq!(err.status(), axum::http::StatusCode::INTERNAL_SERVER_ERROR);
    }
}
