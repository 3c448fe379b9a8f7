//! Property tests for the tally ledger.
//!
//! Drives random submission sequences through [`Ledger::apply`] and checks
//! after every step that the counters agree with a recount of the entries.

use std::collections::HashMap;

use census_core::{Address, Nationality, RecordOutcome};
use census_store::Ledger;
use chrono::{Duration, TimeZone, Utc};
use proptest::prelude::*;

const COUNTRIES: &[&str] = &["France", "Japan", "Brazil", "Italy", "Spain", "france"];

/// (address index, upper-case the address?, country index)
fn submission() -> impl Strategy<Value = (u8, bool, usize)> {
    (0u8..6, any::<bool>(), 0..COUNTRIES.len())
}

fn address(idx: u8, upper: bool) -> Address {
    let raw = format!("0xAbC{idx:02}");
    let raw = if upper { raw.to_uppercase() } else { raw };
    Address::new(&raw).unwrap()
}

fn assert_consistent(ledger: &Ledger) -> Result<(), TestCaseError> {
    let mut recount: HashMap<&str, u64> = HashMap::new();
    for (_, entry) in ledger.entries() {
        *recount.entry(entry.nationality.as_str()).or_insert(0) += 1;
    }

    let stats = ledger.snapshot();
    prop_assert_eq!(stats.total, ledger.len() as u64);
    prop_assert_eq!(stats.tallied(), stats.total);
    for row in &stats.countries {
        prop_assert!(row.count > 0);
        prop_assert_eq!(Some(&row.count), recount.get(row.country.as_str()));
    }
    for (country, count) in &recount {
        prop_assert_eq!(stats.count_of(country), *count);
    }
    for country in COUNTRIES {
        let nationality = Nationality::new(*country).unwrap();
        let raw = ledger.tally(&nationality).unwrap_or(0);
        prop_assert_eq!(raw, recount.get(country).copied().unwrap_or(0));
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn counters_match_entries_after_every_step(
        steps in proptest::collection::vec(submission(), 1..64)
    ) {
        let mut ledger = Ledger::new();
        let start = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();

        for (i, (addr_idx, upper, country_idx)) in steps.into_iter().enumerate() {
            let nationality = Nationality::new(COUNTRIES[country_idx]).unwrap();
            ledger.apply(&address(addr_idx, upper), &nationality, start + Duration::seconds(i as i64));
            assert_consistent(&ledger)?;
        }
    }

    #[test]
    fn identical_resubmission_leaves_counts_unchanged(
        prefix in proptest::collection::vec(submission(), 0..32),
        (addr_idx, upper, country_idx) in submission(),
    ) {
        let mut ledger = Ledger::new();
        let now = Utc::now();
        for (a, u, c) in prefix {
            ledger.apply(&address(a, u), &Nationality::new(COUNTRIES[c]).unwrap(), now);
        }

        let nationality = Nationality::new(COUNTRIES[country_idx]).unwrap();
        ledger.apply(&address(addr_idx, upper), &nationality, now);
        let before = ledger.snapshot();

        let later = now + Duration::seconds(5);
        let outcome = ledger.apply(&address(addr_idx, !upper), &nationality, later);
        prop_assert_eq!(outcome, RecordOutcome::Refreshed);
        prop_assert_eq!(ledger.snapshot(), before);
        prop_assert_eq!(ledger.entry(&address(addr_idx, upper)).unwrap().recorded_at, later);
    }

    #[test]
    fn move_shifts_exactly_one_count(
        prefix in proptest::collection::vec(submission(), 0..32),
        addr_idx in 0u8..6,
        from_idx in 0..COUNTRIES.len(),
        to_idx in 0..COUNTRIES.len(),
    ) {
        prop_assume!(from_idx != to_idx);
        let mut ledger = Ledger::new();
        let now = Utc::now();
        for (a, u, c) in prefix {
            ledger.apply(&address(a, u), &Nationality::new(COUNTRIES[c]).unwrap(), now);
        }

        let from = Nationality::new(COUNTRIES[from_idx]).unwrap();
        let to = Nationality::new(COUNTRIES[to_idx]).unwrap();
        ledger.apply(&address(addr_idx, false), &from, now);
        let before = ledger.snapshot();

        let outcome = ledger.apply(&address(addr_idx, true), &to, now);
        prop_assert_eq!(outcome, RecordOutcome::Moved { from: from.clone() });

        let after = ledger.snapshot();
        prop_assert_eq!(after.total, before.total);
        prop_assert_eq!(after.count_of(from.as_str()), before.count_of(from.as_str()) - 1);
        prop_assert_eq!(after.count_of(to.as_str()), before.count_of(to.as_str()) + 1);
    }
}

#[test]
fn france_to_japan_keeps_total() {
    let mut ledger = Ledger::new();
    let now = Utc::now();
    let a = Address::new("0xA").unwrap();
    let france = Nationality::new("France").unwrap();
    let japan = Nationality::new("Japan").unwrap();

    ledger.apply(&a, &france, now);
    ledger.apply(&a, &japan, now);

    let stats = ledger.snapshot();
    assert_eq!(stats.total, 1);
    assert_eq!(stats.count_of("France"), 0);
    assert_eq!(stats.count_of("Japan"), 1);
    assert_eq!(ledger.tally(&france), Some(0));
}
