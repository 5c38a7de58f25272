//! Table rendering for the fleet status view.

use colored::Colorize;

use crate::fleet::FleetView;
use fls_common::types::DiscoveredInstance;

/// Render the fleet view as a fixed-width table.
pub fn fleet_table(view: &FleetView) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{:<22} {:<9} {:>8} {:>7} {:>6}\n",
        "INSTANCE", "STATUS", "WORKERS", "CPU", "CORES"
    ));

    if view.is_empty() {
        out.push_str("(no instances observed yet)\n");
        return out;
    }

    for status in view.entries() {
        // Pad before coloring so escape codes do not skew the columns.
        let label = format!("{:<9}", if status.running { "running" } else { "stopped" });
        let state = if status.running {
            label.as_str().green()
        } else {
            label.as_str().dimmed()
        };
        out.push_str(&format!(
            "{:<22} {} {:>8} {:>6.1}% {:>6}\n",
            status.instance_id, state, status.workers, status.cpu, status.cores
        ));
    }
    out
}

/// Render the discovery listing as a fixed-width table.
pub fn instances_table(instances: &[DiscoveredInstance]) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{:<22} {:<10} {:<16} {:<16}\n",
        "INSTANCE", "STATE", "PRIVATE", "PUBLIC"
    ));
    for instance in instances {
        out.push_str(&format!(
            "{:<22} {:<10} {:<16} {:<16}\n",
            instance.instance_id,
            instance.state,
            instance.private_address.as_deref().unwrap_or("-"),
            instance.public_address.as_deref().unwrap_or("-"),
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use fls_common::types::{InstanceId, StressStatus};

    #[test]
    fn test_fleet_table_rows_in_stable_order() {
        colored::control::set_override(false);

        let mut view = FleetView::new();
        view.observe(StressStatus {
            instance_id: InstanceId::new("i-bbb"),
            running: false,
            workers: 0,
            cpu: 3.0,
            cores: 4,
        });
        view.observe(StressStatus {
            instance_id: InstanceId::new("i-aaa"),
            running: true,
            workers: 4,
            cpu: 97.5,
            cores: 4,
        });

        let table = fleet_table(&view);
        let lines: Vec<&str> = table.lines().collect();
        assert!(lines[0].contains("INSTANCE"));
        assert!(lines[1].starts_with("i-aaa"));
        assert!(lines[1].contains("running"));
        assert!(lines[1].contains("97.5%"));
        assert!(lines[2].starts_with("i-bbb"));
        assert!(lines[2].contains("stopped"));
    }

    #[test]
    fn test_fleet_table_empty_view() {
        let table = fleet_table(&FleetView::new());
        assert!(table.contains("no instances observed yet"));
    }

    #[test]
    fn test_instances_table_dashes_for_missing_addresses() {
        let table = instances_table(&[DiscoveredInstance {
            instance_id: InstanceId::new("i-0abc123"),
            private_address: Some("10.0.0.5".to_string()),
            public_address: None,
            state: "running".to_string(),
        }]);
        assert!(table.contains("i-0abc123"));
        assert!(table.contains("10.0.0.5"));
        assert!(table.lines().nth(1).unwrap().contains(" - "));
    }
}
