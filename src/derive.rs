//! Wait-time, status and priority derivation.
//!
//! These run once per fetch cycle inside the aggregator, so every consumer
//! of a given snapshot sees the same derived values. All functions are
//! total: malformed input degrades to a defined fallback instead of
//! failing the row.

use chrono::NaiveDateTime;

use crate::record::{DerivedRecord, PatientStatus, PriorityFlags, SourceRecord};

/// Placeholder shown when an arrival timestamp cannot be parsed.
pub const ARRIVAL_PLACEHOLDER: &str = "--:--";

/// Age at or above which a patient is flagged as elderly.
const ELDERLY_AGE: u32 = 60;

/// Raw status code meaning "still waiting". Matched case-insensitively.
const WAITING_STATUS: &str = "espera";

/// Timestamp formats the queue source is known to emit.
const ARRIVAL_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

fn parse_arrival(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    ARRIVAL_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
}

/// Whole minutes elapsed between `arrival` and `now`.
///
/// Returns 0 when the arrival is missing or unparsable, and clamps clock
/// skew (arrival in the future) to 0. Never negative, never fails.
pub fn wait_minutes(arrival: &str, now: NaiveDateTime) -> u32 {
    let Some(arrival) = parse_arrival(arrival) else {
        return 0;
    };
    let elapsed = now.signed_duration_since(arrival);
    elapsed.num_minutes().max(0) as u32
}

/// Time-of-day component (`HH:MM`) of an arrival timestamp.
///
/// Returns [`ARRIVAL_PLACEHOLDER`] when the timestamp cannot be parsed.
pub fn format_arrival(arrival: &str) -> String {
    match parse_arrival(arrival) {
        Some(ts) => ts.format("%H:%M").to_string(),
        None => ARRIVAL_PLACEHOLDER.to_string(),
    }
}

/// Classify a raw source status code as waiting or in service.
///
/// Only the source's waiting code (`Espera`) maps to [`PatientStatus::Waiting`];
/// every other code, including unrecognized ones, is classified as
/// [`PatientStatus::InService`]. The live-queue query already excludes
/// completed and cancelled visits, so an unknown code here means the visit
/// has progressed past the waiting room.
pub fn classify_status(raw: &str) -> PatientStatus {
    if raw.trim().eq_ignore_ascii_case(WAITING_STATUS) {
        PatientStatus::Waiting
    } else {
        PatientStatus::InService
    }
}

/// Infer priority flags from the display name and age field.
///
/// Keyword matching is case-insensitive and best-effort: the source embeds
/// markers like "cadeirante" or "gestante" in the patient name, and the age
/// field is free text. Noisy data produces false negatives, never errors.
pub fn infer_priority(name: &str, age: Option<&str>) -> PriorityFlags {
    let lowered = name.to_lowercase();
    let age_years: Option<u32> = age.and_then(|a| a.trim().parse().ok());

    PriorityFlags {
        elderly: lowered.contains("idoso") || age_years.is_some_and(|a| a >= ELDERLY_AGE),
        wheelchair: lowered.contains("cadeirante"),
        pregnant: lowered.contains("gestante"),
    }
}

/// Derive all computed fields for one live record.
pub fn derive_record(record: &SourceRecord, now: NaiveDateTime) -> DerivedRecord {
    DerivedRecord {
        id: record.id.clone(),
        patient: record.patient.clone(),
        service: record.service.clone(),
        professional: record.professional.clone(),
        wait_minutes: wait_minutes(&record.arrival, now),
        arrival_display: format_arrival(&record.arrival),
        status: classify_status(&record.status),
        priority: infer_priority(&record.patient, record.age.as_deref()),
    }
}

/// Minutes between arrival and departure of a completed visit.
///
/// Returns `None` unless both timestamps are present and parsable - visits
/// missing either are excluded from daily averages rather than counted as
/// zero-wait.
pub fn completed_wait_minutes(arrival: &str, departure: &str) -> Option<u32> {
    let arrival = parse_arrival(arrival)?;
    let departure = parse_arrival(departure)?;
    let elapsed = departure.signed_duration_since(arrival);
    Some(elapsed.num_minutes().max(0) as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, 10)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    #[test]
    fn wait_minutes_floors_elapsed_time() {
        let now = at(10, 30);
        assert_eq!(wait_minutes("2026-03-10 10:20:00", now), 10);
        assert_eq!(wait_minutes("2026-03-10 10:20:30", now), 9);
        assert_eq!(wait_minutes("2026-03-10 10:30:00", now), 0);
    }

    #[test]
    fn wait_minutes_accepts_t_separator() {
        assert_eq!(wait_minutes("2026-03-10T10:00:00", at(10, 45)), 45);
    }

    #[test]
    fn wait_minutes_is_zero_for_bad_input() {
        let now = at(10, 0);
        assert_eq!(wait_minutes("", now), 0);
        assert_eq!(wait_minutes("   ", now), 0);
        assert_eq!(wait_minutes("not a date", now), 0);
        assert_eq!(wait_minutes("2026-99-99 10:00:00", now), 0);
    }

    #[test]
    fn wait_minutes_clamps_clock_skew_to_zero() {
        // Arrival in the future relative to "now"
        assert_eq!(wait_minutes("2026-03-10 11:00:00", at(10, 0)), 0);
    }

    #[test]
    fn format_arrival_extracts_time_of_day() {
        assert_eq!(format_arrival("2026-03-10 08:05:42"), "08:05");
        assert_eq!(format_arrival("2026-03-10T14:30:00"), "14:30");
    }

    #[test]
    fn format_arrival_placeholder_on_failure() {
        assert_eq!(format_arrival(""), ARRIVAL_PLACEHOLDER);
        assert_eq!(format_arrival("garbage"), ARRIVAL_PLACEHOLDER);
    }

    #[test]
    fn only_waiting_code_classifies_as_waiting() {
        assert_eq!(classify_status("Espera"), PatientStatus::Waiting);
        assert_eq!(classify_status("espera"), PatientStatus::Waiting);
        assert_eq!(classify_status("Em Atendimento"), PatientStatus::InService);
        // Unrecognized codes deterministically fall on the in-service side
        assert_eq!(classify_status("???"), PatientStatus::InService);
        assert_eq!(classify_status(""), PatientStatus::InService);
    }

    #[test]
    fn priority_keywords_are_case_insensitive() {
        let flags = infer_priority("Maria Silva (GESTANTE)", None);
        assert!(flags.pregnant);
        assert!(!flags.wheelchair);
        assert!(!flags.elderly);

        let flags = infer_priority("Joao Cadeirante", None);
        assert!(flags.wheelchair);
    }

    #[test]
    fn elderly_from_age_threshold() {
        assert!(infer_priority("Ana", Some("60")).elderly);
        assert!(infer_priority("Ana", Some("75")).elderly);
        assert!(!infer_priority("Ana", Some("59")).elderly);
        assert!(!infer_priority("Ana", Some("abc")).elderly);
        assert!(!infer_priority("Ana", None).elderly);
        // Keyword works even without a usable age
        assert!(infer_priority("Ana (idoso)", None).elderly);
    }

    #[test]
    fn derive_record_combines_all_fields() {
        let record = SourceRecord {
            id: "h1".into(),
            unit: "Ouro Verde".into(),
            patient: "Carlos (cadeirante)".into(),
            service: "Ortopedia".into(),
            professional: "Dra. Lima".into(),
            arrival: "2026-03-10 09:50:00".into(),
            departure: None,
            status: "Espera".into(),
            age: Some("64".into()),
        };

        let derived = derive_record(&record, at(10, 0));
        assert_eq!(derived.wait_minutes, 10);
        assert_eq!(derived.arrival_display, "09:50");
        assert_eq!(derived.status, PatientStatus::Waiting);
        assert!(derived.priority.wheelchair);
        assert!(derived.priority.elderly);
    }

    #[test]
    fn unparsable_arrival_still_yields_a_record() {
        let record = SourceRecord {
            id: "h2".into(),
            unit: "Ouro Verde".into(),
            patient: "Paula".into(),
            service: String::new(),
            professional: String::new(),
            arrival: "corrupted".into(),
            departure: None,
            status: "Espera".into(),
            age: None,
        };

        let derived = derive_record(&record, at(12, 0));
        assert_eq!(derived.wait_minutes, 0);
        assert_eq!(derived.arrival_display, ARRIVAL_PLACEHOLDER);
    }

    #[test]
    fn completed_wait_requires_both_timestamps() {
        assert_eq!(
            completed_wait_minutes("2026-03-10 09:00:00", "2026-03-10 09:25:00"),
            Some(25)
        );
        assert_eq!(completed_wait_minutes("", "2026-03-10 09:25:00"), None);
        assert_eq!(completed_wait_minutes("2026-03-10 09:00:00", ""), None);
        assert_eq!(completed_wait_minutes("bad", "worse"), None);
    }
}
