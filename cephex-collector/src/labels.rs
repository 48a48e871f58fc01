//! Daemon-derived labels and the fixed-name rewrite.

use cephex_core::{DaemonName, LabelSet};

const DAEMON_PREFIX: &str = "ceph-";
const CLIENT_PREFIX: &str = "client.";
const RADOSGW_MARKER: &str = "radosgw";
const RGW_MARKER: &str = "rgw";
/// Dot-separated field of an `rgw.` daemon name holding the instance id.
const RGW_INSTANCE_FIELD: usize = 3;

const DATA_SYNC_PREFIX: &str = "data_sync_from_";
const DATA_SYNC_REWRITE: &str = "data_sync_from_zone_";

/// Labels every counter of `daemon` carries.
///
/// | daemon name                          | labels                     |
/// |--------------------------------------|----------------------------|
/// | `ceph-osd.0`                         | `ceph_daemon="osd.0"`      |
/// | `radosgw.gw1`                        | `instance_id="gw1"`        |
/// | `rgw.foo.node-00.hrgsea.2.9473`      | `instance_id="hrgsea"`     |
///
/// `None` when an `rgw` name has too few fields; the daemon's counters
/// cannot be labelled and are dropped.
pub fn extra_labels(daemon: &DaemonName) -> Option<LabelSet> {
    let name = daemon.as_str();
    let name = name.strip_prefix(DAEMON_PREFIX).unwrap_or(name);
    let name = name.strip_prefix(CLIENT_PREFIX).unwrap_or(name);

    if name.contains(RADOSGW_MARKER) {
        let instance = name.rsplit('.').next().unwrap_or(name);
        return Some(LabelSet::new().with("instance_id", instance));
    }
    if name.contains(RGW_MARKER) {
        let instance = name.split('.').nth(RGW_INSTANCE_FIELD)?;
        return Some(LabelSet::new().with("instance_id", instance));
    }
    Some(LabelSet::new().with("ceph_daemon", name))
}

/// Rewrite `data_sync_from_<zone>.<rest>` to `data_sync_from_zone_<rest>`
/// with a `source_zone` label. `None` for any other name.
///
/// The zone extends to the last dot, so zones may themselves contain dots.
pub fn fixed_name_metric(name: &str) -> Option<(LabelSet, String)> {
    let tail = name.strip_prefix(DATA_SYNC_PREFIX)?;
    let dot = tail.rfind('.')?;
    let (zone, rest) = (&tail[..dot], &tail[dot + 1..]);
    if zone.is_empty() {
        return None;
    }
    let labels = LabelSet::new().with("source_zone", zone);
    Some((labels, format!("{DATA_SYNC_REWRITE}{rest}")))
}
