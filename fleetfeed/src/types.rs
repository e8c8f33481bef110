//! Types that mirror the backend's JSON schema for server snapshots.

use serde::{Deserialize, Serialize};

/// 1/5/15 minute load averages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadAvg {
    pub load1: f64,
    pub load5: f64,
    pub load15: f64,
}

/// Usage of one mounted partition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartitionUsage {
    pub mount_point: String,
    pub fstype: String,
    pub total: u64,
    pub free: u64,
    pub used: u64,
    // transmitted explicitly; redisplay, never recompute from used/total
    pub used_percent: f64,
}

/// Detail record embedded in a snapshot: absolute totals behind the gauges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostDetail {
    pub cpu_info: Vec<String>,
    pub avg_stat: LoadAvg,
    #[serde(rename = "RAMTotal")]
    pub ram_total: u64,
    #[serde(rename = "RAMUsed")]
    pub ram_used: u64,
    pub swap_total: u64,
    pub swap_used: u64,
    pub disk_total: u64,
    pub disk_used: u64,
    pub disk_partitions: Vec<PartitionUsage>,
    // cumulative transfer counters since the server's agent started
    pub net_in_transfer: u64,
    pub net_out_transfer: u64,
}

/// One server's point-in-time telemetry.
///
/// A delivery is always a complete `Vec<ServerSnapshot>` describing every
/// server known to the backend at that moment; there are no delta updates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerSnapshot {
    pub name: String,
    pub group: String,
    pub id: String,
    /// Unix seconds of the server's last report to the backend.
    pub last_report_time: i64,
    /// Seconds since the server booted.
    pub uptime: u64,
    pub platform: String,

    pub cpu_percent: f64,
    #[serde(rename = "RAMPercent")]
    pub ram_percent: f64,
    #[serde(rename = "SWAPPercent")]
    pub swap_percent: f64,
    pub disk_percent: f64,
    /// Instantaneous rates in bytes per second.
    pub net_in_speed: u64,
    pub net_out_speed: u64,

    pub is_online: bool,
    pub loc: String,

    pub host_info: HostDetail,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_round_trips_backend_field_names() {
        let raw = r#"{
            "name": "web-01",
            "group": "edge",
            "id": "a1",
            "lastReportTime": 1700000000,
            "uptime": 86400,
            "platform": "debian 12",
            "cpuPercent": 12.5,
            "RAMPercent": 61.2,
            "SWAPPercent": 0.0,
            "diskPercent": 43.7,
            "netInSpeed": 1024,
            "netOutSpeed": 2048,
            "isOnline": true,
            "loc": "fi",
            "hostInfo": {
                "cpuInfo": ["AMD EPYC 7543"],
                "avgStat": {"load1": 0.4, "load5": 0.2, "load15": 0.1},
                "RAMTotal": 8589934592,
                "RAMUsed": 5261334938,
                "swapTotal": 0,
                "swapUsed": 0,
                "diskTotal": 107374182400,
                "diskUsed": 46923931648,
                "diskPartitions": [
                    {"mountPoint": "/", "fstype": "ext4", "total": 107374182400,
                     "free": 60450250752, "used": 46923931648, "usedPercent": 43.7}
                ],
                "netInTransfer": 123456789,
                "netOutTransfer": 987654321
            }
        }"#;
        let snap: ServerSnapshot = serde_json::from_str(raw).expect("deserialize snapshot");
        assert_eq!(snap.name, "web-01");
        assert_eq!(snap.ram_percent, 61.2);
        assert_eq!(snap.host_info.disk_partitions[0].mount_point, "/");

        let back = serde_json::to_value(&snap).expect("serialize snapshot");
        assert_eq!(back["RAMPercent"], 61.2);
        assert_eq!(back["hostInfo"]["RAMTotal"], 8_589_934_592_u64);
        assert_eq!(back["hostInfo"]["diskPartitions"][0]["usedPercent"], 43.7);
    }
}
