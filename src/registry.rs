//! Cloudlet Registry (C4): the set of Tier-2 nodes a Tier-1 currently
//! believes are alive, keyed by UUID, with TTL-based expiry.

use std::collections::HashMap;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

use crate::model::{Cloudlet, CloudletReport, CloudletSummary};

pub struct CloudletRegistry {
    cloudlets: RwLock<HashMap<Uuid, Cloudlet>>,
}

impl CloudletRegistry {
    pub fn new() -> Self {
        Self {
            cloudlets: RwLock::new(HashMap::new()),
        }
    }

    /// Preseed the registry from a list of known cloudlets, read once at
    /// boot from a configuration file rather than reported via `POST
    /// /api/v1/cloudlets/`.
    pub fn from_cloudlets(cloudlets: Vec<Cloudlet>) -> Self {
        Self {
            cloudlets: RwLock::new(cloudlets.into_iter().map(|c| (c.uuid, c)).collect()),
        }
    }

    /// Insert or refresh a cloudlet from a `POST /api/v1/cloudlets/` body,
    /// stamping `last_update` to now regardless of what the caller sent.
    pub async fn upsert(&self, report: CloudletReport) -> Cloudlet {
        let cloudlet = Cloudlet {
            uuid: report.uuid,
            name: report.name,
            endpoint: report.endpoint,
            last_update: Utc::now(),
            local_networks: report.local_networks,
            accepted_clients: report.accepted_clients,
            rejected_clients: report.rejected_clients,
            locations: report.locations,
            resources: report.resources,
        };
        self.cloudlets.write().await.insert(cloudlet.uuid, cloudlet.clone());
        cloudlet
    }

    /// Snapshot of every known cloudlet, for the match pipeline to filter.
    pub async fn snapshot(&self) -> Vec<Cloudlet> {
        self.cloudlets.read().await.values().cloned().collect()
    }

    pub async fn summaries(&self) -> Vec<CloudletSummary> {
        self.cloudlets
            .read()
            .await
            .values()
            .map(Cloudlet::summary)
            .collect()
    }

    pub async fn get(&self, uuid: Uuid) -> Option<Cloudlet> {
        self.cloudlets.read().await.get(&uuid).cloned()
    }

    /// Remove every cloudlet whose `last_update` is older than `ttl`.
    pub async fn expire_stale(&self, ttl: Duration) {
        let cutoff = Utc::now() - chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::zero());
        let mut cloudlets = self.cloudlets.write().await;
        cloudlets.retain(|_, cloudlet| {
            let keep = cloudlet.last_update >= cutoff;
            if !keep {
                info!(uuid = %cloudlet.uuid, endpoint = %cloudlet.endpoint, "removing stale cloudlet");
            }
            keep
        });
    }

    pub async fn len(&self) -> usize {
        self.cloudlets.read().await.len()
    }
}

impl Default for CloudletRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Resources;
    use chrono::Duration as ChronoDuration;

    fn report(uuid: Uuid) -> CloudletReport {
        CloudletReport {
            uuid,
            name: String::new(),
            endpoint: "http://cloudlet".into(),
            resources: Resources::default(),
            locations: Vec::new(),
            local_networks: Vec::new(),
            accepted_clients: Vec::new(),
            rejected_clients: Vec::new(),
        }
    }

    #[tokio::test]
    async fn upsert_then_snapshot_roundtrips() {
        let registry = CloudletRegistry::new();
        let uuid = Uuid::new_v4();
        registry.upsert(report(uuid)).await;
        assert_eq!(registry.len().await, 1);
        assert_eq!(registry.get(uuid).await.unwrap().uuid, uuid);
    }

    #[tokio::test]
    async fn expire_stale_removes_old_entries_only() {
        let registry = CloudletRegistry::new();
        let fresh = Uuid::new_v4();
        let stale = Uuid::new_v4();
        registry.upsert(report(fresh)).await;
        registry.upsert(report(stale)).await;

        {
            let mut cloudlets = registry.cloudlets.write().await;
            cloudlets.get_mut(&stale).unwrap().last_update = Utc::now() - ChronoDuration::seconds(120);
        }

        registry.expire_stale(Duration::from_secs(60)).await;
        assert_eq!(registry.len().await, 1);
        assert!(registry.get(fresh).await.is_some());
        assert!(registry.get(stale).await.is_none());
    }
}
