//! Static monitor configuration.
//!
//! Everything here is supplied at startup: the fixed unit list, the
//! cross-source correspondence tables, and the timing constants. Nothing
//! is discovered at runtime (units missing from the fixed list still show
//! up if the queue source reports them, but their mappings must be
//! configured to get cross-source stats).

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// One configured physical unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitConfig {
    /// Identity in the queue source's namespace.
    pub id: String,
    /// Display label.
    pub label: String,
}

impl UnitConfig {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
        }
    }
}

/// Monitor configuration: unit list, identity tables and timing.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Units that always appear in the snapshot, even with empty queues.
    pub units: Vec<UnitConfig>,
    /// Unit id -> reception-side unit id.
    pub reception_map: Vec<(String, String)>,
    /// Unit id -> digital-channel group id.
    pub digital_map: Vec<(String, String)>,
    /// How often the fetch-and-aggregate cycle runs.
    pub refresh_interval: Duration,
    /// Per-fetcher timeout within one cycle.
    pub fetch_timeout: Duration,
    /// Age of the last commit beyond which the snapshot is stale.
    pub staleness_threshold: Duration,
    /// How often staleness is re-evaluated, independent of the refresh.
    pub staleness_check_interval: Duration,
}

impl Default for MonitorConfig {
    /// The production deployment's constants: three units, a 15 s refresh,
    /// a 300 s staleness threshold checked every 5 s.
    fn default() -> Self {
        Self {
            units: vec![
                UnitConfig::new("Ouro Verde", "OURO VERDE"),
                UnitConfig::new("Centro Cambui", "CENTRO CAMBUÍ"),
                UnitConfig::new("Campinas Shopping", "CAMPINAS SHOPPING"),
            ],
            reception_map: vec![
                ("Ouro Verde".into(), "2".into()),
                ("Centro Cambui".into(), "3".into()),
                ("Campinas Shopping".into(), "12".into()),
            ],
            digital_map: Vec::new(),
            refresh_interval: Duration::from_secs(15),
            fetch_timeout: Duration::from_secs(5),
            staleness_threshold: Duration::from_secs(300),
            staleness_check_interval: Duration::from_secs(5),
        }
    }
}
