//! Merging one cycle's per-source results into an [`AggregateSnapshot`].
//!
//! The aggregator is pure: it takes whatever each fetcher produced this
//! cycle (success or failure per source) and builds the unified per-unit
//! view. Commit gating - keeping the previous snapshot when every source
//! failed - is the monitor's job, not the aggregator's.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDateTime, Utc};
use tracing::warn;

use crate::config::MonitorConfig;
use crate::derive;
use crate::mapping::IdentityMapper;
use crate::record::{DigitalSnapshot, ReceptionSnapshot, SourceRecord};
use crate::snapshot::{AggregateSnapshot, SourceId, SourcesOk, UnitSnapshot};
use crate::source::FetchResult;

/// Everything the fetchers produced in one refresh cycle.
#[derive(Debug)]
pub struct CycleInput {
    pub live: FetchResult<Vec<SourceRecord>>,
    pub completed: FetchResult<Vec<SourceRecord>>,
    pub reception: FetchResult<ReceptionSnapshot>,
    pub digital: FetchResult<DigitalSnapshot>,
}

/// Merges per-source fetch results into unit snapshots.
#[derive(Debug, Clone)]
pub struct Aggregator {
    units: Vec<(String, String)>,
    mapper: IdentityMapper,
}

impl Aggregator {
    pub fn new(config: &MonitorConfig) -> Self {
        Self {
            units: config
                .units
                .iter()
                .map(|u| (u.id.clone(), u.label.clone()))
                .collect(),
            mapper: IdentityMapper::new(
                config.reception_map.iter().cloned(),
                config.digital_map.iter().cloned(),
            ),
        }
    }

    /// Build the merged snapshot for one cycle.
    ///
    /// `captured_at` stamps the snapshot; `local_now` is the wall-clock
    /// reference for wait-time derivation (source timestamps are local and
    /// zone-free). A failed source simply contributes nothing; a malformed
    /// or duplicate row is skipped and counted, never aborting the cycle.
    pub fn aggregate(
        &self,
        cycle: &CycleInput,
        captured_at: DateTime<Utc>,
        local_now: NaiveDateTime,
    ) -> AggregateSnapshot {
        let mut units: BTreeMap<String, UnitSnapshot> = self
            .units
            .iter()
            .map(|(id, label)| (id.clone(), UnitSnapshot::empty(id.clone(), label.clone())))
            .collect();
        let mut sources_ok = SourcesOk::none();
        let mut skipped: u32 = 0;

        if let Ok(rows) = &cycle.live {
            sources_ok.set(SourceId::LiveQueue);
            for row in rows {
                if row.id.trim().is_empty() || row.unit.trim().is_empty() {
                    warn!(id = %row.id, unit = %row.unit, "skipping malformed live row");
                    skipped += 1;
                    continue;
                }
                // Units the queue source knows but the config does not
                // still get a card, with an upper-cased fallback label.
                let unit = units.entry(row.unit.clone()).or_insert_with(|| {
                    UnitSnapshot::empty(row.unit.clone(), row.unit.to_uppercase())
                });
                if unit.patients.iter().any(|p| p.id == row.id) {
                    warn!(id = %row.id, unit = %row.unit, "skipping duplicate live row");
                    skipped += 1;
                    continue;
                }
                unit.patients.push(derive::derive_record(row, local_now));
            }
        }

        if let Ok(rows) = &cycle.completed {
            sources_ok.set(SourceId::CompletedToday);
            self.fold_completed(&mut units, rows);
        }

        if let Ok(reception) = &cycle.reception {
            sources_ok.set(SourceId::Reception);
            for unit in units.values_mut() {
                unit.cross.reception = self
                    .mapper
                    .reception_id(&unit.id)
                    .and_then(|id| reception.per_unit.get(id))
                    .copied();
            }
        }

        if let Ok(digital) = &cycle.digital {
            sources_ok.set(SourceId::DigitalChannel);
            for unit in units.values_mut() {
                unit.cross.digital = self
                    .mapper
                    .digital_group(&unit.id)
                    .and_then(|id| digital.groups.get(id))
                    .copied();
            }
        }

        AggregateSnapshot {
            captured_at,
            sources_ok,
            skipped_records: skipped,
            units,
        }
    }

    /// Fold completed-today rows into per-unit daily totals.
    ///
    /// The total counts every completed row for a known unit; the average
    /// only includes rows where both arrival and departure parse, so a
    /// missing timestamp never drags the mean toward zero. Rows for units
    /// absent from the snapshot are ignored - the completed query covers
    /// the whole day and can reference units no longer reporting live.
    fn fold_completed(&self, units: &mut BTreeMap<String, UnitSnapshot>, rows: &[SourceRecord]) {
        let mut sums: BTreeMap<&str, (u64, u64, u64)> = BTreeMap::new();
        for row in rows {
            if !units.contains_key(row.unit.as_str()) {
                continue;
            }
            let entry = sums.entry(row.unit.as_str()).or_default();
            entry.0 += 1;
            if let Some(wait) = row
                .departure
                .as_deref()
                .and_then(|dep| derive::completed_wait_minutes(&row.arrival, dep))
            {
                entry.1 += u64::from(wait);
                entry.2 += 1;
            }
        }

        for (unit_id, (total, wait_sum, wait_count)) in sums {
            if let Some(unit) = units.get_mut(unit_id) {
                unit.total_attended_today = total;
                if wait_count > 0 {
                    unit.average_wait_today = (wait_sum / wait_count) as u32;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::UnitConfig;
    use crate::record::{DigitalGroupStats, PatientStatus, ReceptionUnitStats};
    use crate::source::FetchError;
    use chrono::NaiveDate;

    fn local_now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, 10)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap()
    }

    fn config() -> MonitorConfig {
        MonitorConfig {
            units: vec![
                UnitConfig::new("Ouro Verde", "OURO VERDE"),
                UnitConfig::new("Centro Cambui", "CENTRO CAMBUÍ"),
            ],
            reception_map: vec![("Ouro Verde".into(), "2".into())],
            digital_map: vec![("Ouro Verde".into(), "g-1".into())],
            ..MonitorConfig::default()
        }
    }

    fn live_row(id: &str, unit: &str, arrival: &str) -> SourceRecord {
        SourceRecord {
            id: id.into(),
            unit: unit.into(),
            patient: format!("Patient {id}"),
            service: "Clinica Geral".into(),
            professional: "Dr. Souza".into(),
            arrival: arrival.into(),
            departure: None,
            status: "Espera".into(),
            age: None,
        }
    }

    fn completed_row(id: &str, unit: &str, arrival: &str, departure: Option<&str>) -> SourceRecord {
        SourceRecord {
            departure: departure.map(Into::into),
            status: "Finalizado".into(),
            ..live_row(id, unit, arrival)
        }
    }

    fn all_failed() -> CycleInput {
        CycleInput {
            live: Err(FetchError::Timeout),
            completed: Err(FetchError::Timeout),
            reception: Err(FetchError::Timeout),
            digital: Err(FetchError::Timeout),
        }
    }

    #[test]
    fn unit_with_mapped_reception_stats_and_ordered_patients() {
        let aggregator = Aggregator::new(&config());

        let mut reception = ReceptionSnapshot::default();
        reception.per_unit.insert(
            "2".into(),
            ReceptionUnitStats {
                queue_len: 4,
                avg_wait_minutes: 7,
                attended_today: 31,
            },
        );

        let cycle = CycleInput {
            live: Ok(vec![
                live_row("a", "Ouro Verde", "2026-03-10 09:50:00"),
                live_row("b", "Ouro Verde", "2026-03-10 09:57:00"),
            ]),
            completed: Err(FetchError::Timeout),
            reception: Ok(reception),
            digital: Err(FetchError::Timeout),
        };

        let snapshot = aggregator.aggregate(&cycle, Utc::now(), local_now());
        let unit = snapshot.unit("Ouro Verde").unwrap();

        assert_eq!(unit.patients.len(), 2);
        assert_eq!(unit.patients[0].wait_minutes, 10);
        assert_eq!(unit.patients[1].wait_minutes, 3);
        assert_eq!(unit.cross.reception.unwrap().queue_len, 4);

        assert!(snapshot.sources_ok.contains(SourceId::LiveQueue));
        assert!(snapshot.sources_ok.contains(SourceId::Reception));
        assert!(!snapshot.sources_ok.contains(SourceId::CompletedToday));
    }

    #[test]
    fn unmapped_unit_gets_no_data_stats() {
        let aggregator = Aggregator::new(&config());

        let mut reception = ReceptionSnapshot::default();
        // Id "3" exists in the reception feed but no unit maps to it here
        reception.per_unit.insert(
            "3".into(),
            ReceptionUnitStats {
                queue_len: 9,
                avg_wait_minutes: 2,
                attended_today: 5,
            },
        );

        let cycle = CycleInput {
            live: Ok(vec![]),
            completed: Err(FetchError::Timeout),
            reception: Ok(reception),
            digital: Err(FetchError::Timeout),
        };

        let snapshot = aggregator.aggregate(&cycle, Utc::now(), local_now());
        let unmapped = snapshot.unit("Centro Cambui").unwrap();
        assert_eq!(unmapped.cross.reception, None);
        // The mapped unit also gets None when its id is absent from the feed
        assert_eq!(snapshot.unit("Ouro Verde").unwrap().cross.reception, None);
    }

    #[test]
    fn configured_units_appear_even_with_all_sources_failed() {
        let aggregator = Aggregator::new(&config());
        let snapshot = aggregator.aggregate(&all_failed(), Utc::now(), local_now());

        assert_eq!(snapshot.units.len(), 2);
        assert!(!snapshot.sources_ok.any());
        assert_eq!(snapshot.unit("Ouro Verde").unwrap().queue_len(), 0);
    }

    #[test]
    fn unknown_unit_is_discovered_with_uppercased_label() {
        let aggregator = Aggregator::new(&config());
        let cycle = CycleInput {
            live: Ok(vec![live_row("x", "Nova Unidade", "2026-03-10 09:00:00")]),
            completed: Err(FetchError::Timeout),
            reception: Err(FetchError::Timeout),
            digital: Err(FetchError::Timeout),
        };

        let snapshot = aggregator.aggregate(&cycle, Utc::now(), local_now());
        let unit = snapshot.unit("Nova Unidade").unwrap();
        assert_eq!(unit.label, "NOVA UNIDADE");
        assert_eq!(unit.queue_len(), 1);
    }

    #[test]
    fn malformed_and_duplicate_rows_are_skipped_not_fatal() {
        let aggregator = Aggregator::new(&config());
        let cycle = CycleInput {
            live: Ok(vec![
                live_row("a", "Ouro Verde", "2026-03-10 09:00:00"),
                live_row("", "Ouro Verde", "2026-03-10 09:01:00"), // no id
                live_row("b", "", "2026-03-10 09:02:00"),          // no unit
                live_row("a", "Ouro Verde", "2026-03-10 09:03:00"), // duplicate
            ]),
            completed: Err(FetchError::Timeout),
            reception: Err(FetchError::Timeout),
            digital: Err(FetchError::Timeout),
        };

        let snapshot = aggregator.aggregate(&cycle, Utc::now(), local_now());
        assert_eq!(snapshot.skipped_records, 3);
        assert_eq!(snapshot.unit("Ouro Verde").unwrap().queue_len(), 1);
    }

    #[test]
    fn unparsable_arrival_keeps_the_record_with_placeholder() {
        let aggregator = Aggregator::new(&config());
        let cycle = CycleInput {
            live: Ok(vec![
                live_row("a", "Ouro Verde", "2026-03-10 09:00:00"),
                live_row("b", "Ouro Verde", "corrupted"),
            ]),
            completed: Err(FetchError::Timeout),
            reception: Err(FetchError::Timeout),
            digital: Err(FetchError::Timeout),
        };

        let snapshot = aggregator.aggregate(&cycle, Utc::now(), local_now());
        let unit = snapshot.unit("Ouro Verde").unwrap();
        assert_eq!(unit.queue_len(), 2);
        assert_eq!(unit.patients[1].wait_minutes, 0);
        assert_eq!(unit.patients[1].arrival_display, derive::ARRIVAL_PLACEHOLDER);
        assert_eq!(unit.patients[1].status, PatientStatus::Waiting);
    }

    #[test]
    fn completed_rows_fold_into_daily_totals() {
        let aggregator = Aggregator::new(&config());
        let cycle = CycleInput {
            live: Ok(vec![]),
            completed: Ok(vec![
                completed_row(
                    "c1",
                    "Ouro Verde",
                    "2026-03-10 08:00:00",
                    Some("2026-03-10 08:20:00"),
                ),
                completed_row(
                    "c2",
                    "Ouro Verde",
                    "2026-03-10 08:30:00",
                    Some("2026-03-10 09:10:00"),
                ),
                // Missing departure: counted in the total, excluded from the average
                completed_row("c3", "Ouro Verde", "2026-03-10 08:45:00", None),
            ]),
            reception: Err(FetchError::Timeout),
            digital: Err(FetchError::Timeout),
        };

        let snapshot = aggregator.aggregate(&cycle, Utc::now(), local_now());
        let unit = snapshot.unit("Ouro Verde").unwrap();
        assert_eq!(unit.total_attended_today, 3);
        assert_eq!(unit.average_wait_today, 30); // (20 + 40) / 2
    }

    #[test]
    fn digital_stats_attach_via_group_mapping() {
        let aggregator = Aggregator::new(&config());
        let mut digital = DigitalSnapshot::default();
        digital.groups.insert(
            "g-1".into(),
            DigitalGroupStats {
                queue_len: 6,
                avg_wait_secs: 95,
            },
        );

        let cycle = CycleInput {
            live: Ok(vec![]),
            completed: Err(FetchError::Timeout),
            reception: Err(FetchError::Timeout),
            digital: Ok(digital),
        };

        let snapshot = aggregator.aggregate(&cycle, Utc::now(), local_now());
        let unit = snapshot.unit("Ouro Verde").unwrap();
        assert_eq!(unit.cross.digital.unwrap().queue_len, 6);
        assert_eq!(snapshot.unit("Centro Cambui").unwrap().cross.digital, None);
    }
}
