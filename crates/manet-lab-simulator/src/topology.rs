use manet_lab_abstract::{
    ExperimentConfig, MacType, NodeSet, SetupError, WifiDevice, WifiStandard,
};
use std::net::Ipv4Addr;
use tracing::info;

/// Create the node set, refusing sizes that cannot hold `S` sinks and `S`
/// senders.
pub fn create_nodes(config: &ExperimentConfig) -> Result<NodeSet, SetupError> {
    let required = 2 * config.sinks;
    if config.nodes < required || config.nodes < 2 {
        return Err(SetupError::TopologyTooSmall {
            nodes: config.nodes,
            sinks: config.sinks,
            required: required.max(2),
        });
    }
    Ok(NodeSet::create(config.nodes))
}

/// Put an 802.11b ad-hoc interface on every node, transmitting at the
/// configured power.
pub fn install_wifi(nodes: &mut NodeSet, config: &ExperimentConfig) {
    let device = WifiDevice {
        standard: WifiStandard::Ieee80211b,
        mac: MacType::Adhoc,
        phy_mode: config.phy_mode.clone(),
        tx_power_start: config.tx_power,
        tx_power_end: config.tx_power,
    };
    for node in nodes.iter_mut() {
        node.device = Some(device.clone());
    }
    info!(
        "Installed {:?} ({}) at {} dBm on {} nodes",
        device.standard,
        device.phy_mode,
        config.tx_power,
        nodes.len()
    );
}

/// Number nodes consecutively from `base` + 1 within its /24.
pub fn assign_addresses(nodes: &mut NodeSet, base: Ipv4Addr) -> Result<(), SetupError> {
    let [a, b, c, first] = base.octets();
    if first as usize + nodes.len() > 254 {
        return Err(SetupError::AddressPoolExhausted {
            base,
            nodes: nodes.len(),
        });
    }
    for (offset, node) in nodes.iter_mut().enumerate() {
        node.address = Some(Ipv4Addr::new(a, b, c, first + offset as u8 + 1));
    }
    Ok(())
}
