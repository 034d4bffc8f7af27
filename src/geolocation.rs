//! IP Geolocation Lookup: the consumed interface Tier-1 uses to resolve a
//! client's IP address into a [`GeoPoint`] for the location matcher.
//! Loading an actual IP-geolocation database is out of scope for this
//! crate; `StaticGeoLookup` is the stand-in a deployment can swap for a
//! real lookup behind the same trait.

use std::net::IpAddr;

use crate::model::GeoPoint;

pub trait GeoLookup: Send + Sync {
    /// Resolve `ip` to a location, or `None` if it can't be placed (e.g.
    /// a private or loopback address, or a miss against the backing
    /// database).
    fn lookup(&self, ip: IpAddr) -> Option<GeoPoint>;
}

/// Looks nothing up; every address resolves to `None`. The default when
/// no geolocation backend is configured.
pub struct NoGeoLookup;

impl GeoLookup for NoGeoLookup {
    fn lookup(&self, _ip: IpAddr) -> Option<GeoPoint> {
        None
    }
}

/// Maps a fixed set of addresses to known locations. Used in tests and by
/// deployments that run behind a reverse proxy with a small, static set
/// of known client networks rather than a full MaxMind-style database.
#[derive(Default)]
pub struct StaticGeoLookup {
    known: std::collections::HashMap<IpAddr, GeoPoint>,
}

impl StaticGeoLookup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(mut self, ip: IpAddr, point: GeoPoint) -> Self {
        self.known.insert(ip, point);
        self
    }
}

impl GeoLookup for StaticGeoLookup {
    fn lookup(&self, ip: IpAddr) -> Option<GeoPoint> {
        self.known.get(&ip).copied()
    }
}
