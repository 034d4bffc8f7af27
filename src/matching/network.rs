//! Network matcher: yields cloudlets that claim a client's address as
//! local, passes through anything with no opinion, and drops cloudlets
//! that explicitly reject or fail to accept-list the client.

use tracing::debug;

use super::Matcher;
use crate::model::{Cloudlet, ClientInfo, DeploymentRecipe};

pub struct NetworkMatcher;

impl Matcher for NetworkMatcher {
    fn run(
        &self,
        client: &ClientInfo,
        _recipe: &DeploymentRecipe,
        candidates: &mut Vec<Cloudlet>,
    ) -> Vec<Cloudlet> {
        let mut yielded = Vec::new();

        for cloudlet in candidates.drain(..) {
            if cloudlet
                .rejected_clients
                .iter()
                .any(|net| net.contains(&client.ipaddress))
            {
                debug!(cloudlet = %cloudlet.name, "cloudlet rejects this client");
                continue;
            }

            if cloudlet
                .local_networks
                .iter()
                .any(|net| net.contains(&client.ipaddress))
            {
                debug!(cloudlet = %cloudlet.name, "client is on a local network");
                yielded.push(cloudlet);
                continue;
            }

            // An empty accept-list means "accept any client"; a non-empty
            // one must contain the client's address.
            if !cloudlet.accepted_clients.is_empty()
                && !cloudlet
                    .accepted_clients
                    .iter()
                    .any(|net| net.contains(&client.ipaddress))
            {
                debug!(cloudlet = %cloudlet.name, "cloudlet does not accept this client");
                continue;
            }

            yielded.push(cloudlet);
        }

        yielded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Resources;
    use std::net::IpAddr;
    use uuid::Uuid;

    fn base_cloudlet() -> Cloudlet {
        Cloudlet {
            uuid: Uuid::new_v4(),
            name: "c".into(),
            endpoint: "http://c".into(),
            last_update: chrono::Utc::now(),
            local_networks: Vec::new(),
            accepted_clients: Vec::new(),
            rejected_clients: Vec::new(),
            locations: Vec::new(),
            resources: Resources::default(),
        }
    }

    fn client(ip: &str) -> ClientInfo {
        ClientInfo {
            ipaddress: ip.parse::<IpAddr>().unwrap(),
            location: None,
            application_key: "k".into(),
        }
    }

    fn recipe() -> DeploymentRecipe {
        DeploymentRecipe {
            uuid: Uuid::new_v4(),
            restricted: false,
            chart_ref: "chart".into(),
        }
    }

    #[test]
    fn rejected_client_is_dropped() {
        let mut c = base_cloudlet();
        c.rejected_clients.push("10.0.0.0/24".parse().unwrap());
        let mut candidates = vec![c];
        let results = NetworkMatcher.run(&client("10.0.0.5"), &recipe(), &mut candidates);
        assert!(results.is_empty());
        assert!(candidates.is_empty());
    }

    #[test]
    fn empty_accept_list_accepts_everyone() {
        let candidates_in = vec![base_cloudlet()];
        let mut candidates = candidates_in.clone();
        let results = NetworkMatcher.run(&client("1.2.3.4"), &recipe(), &mut candidates);
        assert_eq!(results.len(), 1);
    }

    #[test]
    fn nonempty_accept_list_excludes_other_clients() {
        let mut c = base_cloudlet();
        c.accepted_clients.push("10.0.0.0/24".parse().unwrap());
        let mut candidates = vec![c];
        let results = NetworkMatcher.run(&client("8.8.8.8"), &recipe(), &mut candidates);
        assert!(results.is_empty());
    }

    #[test]
    fn local_network_match_is_yielded_first() {
        let mut c = base_cloudlet();
        c.local_networks.push("10.0.0.0/24".parse().unwrap());
        let mut candidates = vec![c];
        let results = NetworkMatcher.run(&client("10.0.0.5"), &recipe(), &mut candidates);
        assert_eq!(results.len(), 1);
    }
}
