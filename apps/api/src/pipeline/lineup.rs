//! Daily lineup composition — deterministic, date-seeded slot assignment.
//!
//! Every shuffle is driven by a generator seeded from the date key (or a
//! per-quote sub-seed derived from it), never from global random state, so
//! recomputing a lineup for the same day and the same quote snapshot is
//! byte-identical. The composed lineup is cached for the rest of the
//! calendar day; day boundaries follow a fixed UTC+9 offset.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use chrono::{DateTime, FixedOffset, Utc};

use crate::models::quote::Quote;

/// Lineup day boundaries are fixed to this offset from UTC.
const LINEUP_UTC_OFFSET_HOURS: i32 = 9;

// ────────────────────────────────────────────────────────────────────────────
// Seeded generator
// ────────────────────────────────────────────────────────────────────────────

/// Small deterministic generator: a 32-bit string hash feeding a linear
/// congruential step. Same seed string, same sequence, on every platform.
pub struct SeededRng {
    state: u64,
}

impl SeededRng {
    pub fn from_seed(seed: &str) -> Self {
        let mut hash: i32 = 0;
        for c in seed.chars() {
            hash = hash
                .wrapping_shl(5)
                .wrapping_sub(hash)
                .wrapping_add(c as i32);
        }
        Self {
            state: u64::from(hash.unsigned_abs()),
        }
    }

    /// Uniform in [0, 1).
    fn next(&mut self) -> f64 {
        self.state = (self.state * 9301 + 49297) % 233280;
        self.state as f64 / 233280.0
    }

    fn next_below(&mut self, bound: usize) -> usize {
        (self.next() * bound as f64) as usize
    }

    /// Fisher-Yates shuffle driven by this generator.
    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        for i in (1..items.len()).rev() {
            let j = self.next_below(i + 1);
            items.swap(i, j);
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Composition
// ────────────────────────────────────────────────────────────────────────────

/// Assigns quotes to the given display slots for one calendar day.
///
/// Stages, all seeded from `date_key`:
/// 1. shuffle the snapshot once;
/// 2. primary assignment — a quote claims its own slot label, first writer
///    wins, so no label ever holds two quotes;
/// 3. gap filling — quotes without a usable label (unknown, absent, or
///    already bound) each pick one open slot through their own sub-seed,
///    keeping the pick independent of iteration-order artifacts;
/// 4. backfill — any slot still open takes any still-unused quote;
/// 5. one final date-keyed shuffle of the assembled ids for display order,
///    decoupled from slot-assignment order.
pub fn compose(quotes: &[Quote], date_key: &str, slot_labels: &[&str]) -> Vec<i64> {
    let mut shuffled: Vec<&Quote> = quotes.iter().collect();
    SeededRng::from_seed(date_key).shuffle(&mut shuffled);

    let mut bound: HashMap<&str, i64> = HashMap::new();
    let mut used: HashSet<i64> = HashSet::new();

    // Primary assignment
    for quote in &shuffled {
        let Some(label) = quote.slot_label.as_deref() else {
            continue;
        };
        let Some(slot) = slot_labels.iter().find(|s| **s == label) else {
            continue; // non-slot labels stay eligible as filler below
        };
        if !bound.contains_key(*slot) && !used.contains(&quote.id) {
            bound.insert(*slot, quote.id);
            used.insert(quote.id);
        }
    }

    // Gap filling
    for quote in &shuffled {
        if used.contains(&quote.id) {
            continue;
        }
        let mut open: Vec<&str> = slot_labels
            .iter()
            .copied()
            .filter(|slot| !bound.contains_key(slot))
            .collect();
        if open.is_empty() {
            break;
        }
        SeededRng::from_seed(&format!("{date_key}:{}", quote.id)).shuffle(&mut open);
        bound.insert(open[0], quote.id);
        used.insert(quote.id);
    }

    // Backfill
    for slot in slot_labels {
        if bound.contains_key(slot) {
            continue;
        }
        if let Some(quote) = shuffled.iter().find(|q| !used.contains(&q.id)) {
            bound.insert(*slot, quote.id);
            used.insert(quote.id);
        }
    }

    // Display order — iterate the fixed slot order, never the map
    let mut ids: Vec<i64> = slot_labels
        .iter()
        .filter_map(|slot| bound.get(*slot).copied())
        .collect();
    SeededRng::from_seed(date_key).shuffle(&mut ids);
    ids
}

// ────────────────────────────────────────────────────────────────────────────
// Per-day cache
// ────────────────────────────────────────────────────────────────────────────

/// Process-wide lineup cache. Only the current day's entry is retained;
/// inserting a new date key supersedes the previous day.
#[derive(Default)]
pub struct LineupCache {
    inner: Mutex<HashMap<String, Vec<i64>>>,
}

impl LineupCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, date_key: &str) -> Option<Vec<i64>> {
        self.inner
            .lock()
            .expect("lineup cache lock poisoned")
            .get(date_key)
            .cloned()
    }

    pub fn put(&self, date_key: &str, ids: Vec<i64>) {
        let mut inner = self.inner.lock().expect("lineup cache lock poisoned");
        inner.retain(|key, _| key == date_key);
        inner.insert(date_key.to_string(), ids);
    }
}

/// Today's date key at the fixed lineup offset, formatted `YYYY-MM-DD`.
pub fn current_date_key() -> String {
    date_key_at(Utc::now())
}

pub fn date_key_at(now: DateTime<Utc>) -> String {
    let offset = FixedOffset::east_opt(LINEUP_UTC_OFFSET_HOURS * 3600).expect("valid offset");
    now.with_timezone(&offset).format("%Y-%m-%d").to_string()
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::quote::SLOT_LABELS;
    use chrono::TimeZone;

    fn quote(id: i64, slot_label: Option<&str>) -> Quote {
        Quote {
            id,
            original: format!("original {id}"),
            interpreted: None,
            official: format!("official {id}"),
            likes: 0,
            reposts: 0,
            quoted_reposts: 0,
            slot_label: slot_label.map(String::from),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_same_key_and_snapshot_is_byte_identical() {
        let quotes: Vec<Quote> = (1..=15)
            .map(|i| quote(i, SLOT_LABELS.get((i as usize) % 9).copied()))
            .collect();
        let first = compose(&quotes, "2025-01-01", &SLOT_LABELS);
        let second = compose(&quotes, "2025-01-01", &SLOT_LABELS);
        assert_eq!(first, second);
    }

    #[test]
    fn test_output_is_unique_and_bounded() {
        let quotes: Vec<Quote> = (1..=30).map(|i| quote(i, Some("CF"))).collect();
        let ids = compose(&quotes, "2025-06-15", &SLOT_LABELS);

        assert_eq!(ids.len(), 9);
        let unique: HashSet<i64> = ids.iter().copied().collect();
        assert_eq!(unique.len(), ids.len(), "no quote appears twice");
    }

    #[test]
    fn test_fewer_quotes_than_slots_uses_them_all() {
        let quotes = vec![quote(1, Some("CF")), quote(2, None), quote(3, Some("SP"))];
        let ids = compose(&quotes, "2025-02-02", &SLOT_LABELS);

        assert_eq!(ids.len(), 3);
        let unique: HashSet<i64> = ids.iter().copied().collect();
        assert_eq!(unique, HashSet::from([1, 2, 3]));
    }

    #[test]
    fn test_non_slot_label_quote_is_still_filler_eligible() {
        // "SP" is not a lineup slot, but the quote must not be dropped
        let quotes = vec![quote(7, Some("SP"))];
        let ids = compose(&quotes, "2025-03-03", &SLOT_LABELS);
        assert_eq!(ids, vec![7]);
    }

    #[test]
    fn test_duplicate_labels_do_not_collide() {
        let quotes = vec![quote(1, Some("C")), quote(2, Some("C"))];
        let ids = compose(&quotes, "2025-04-04", &SLOT_LABELS);

        assert_eq!(ids.len(), 2, "second quote falls through to gap filling");
        let unique: HashSet<i64> = ids.iter().copied().collect();
        assert_eq!(unique, HashSet::from([1, 2]));
    }

    #[test]
    fn test_empty_snapshot_composes_empty_lineup() {
        assert!(compose(&[], "2025-05-05", &SLOT_LABELS).is_empty());
    }

    #[test]
    fn test_seeded_rng_sequences_repeat_per_seed() {
        let mut a = SeededRng::from_seed("2025-01-01");
        let mut b = SeededRng::from_seed("2025-01-01");
        let mut items_a: Vec<u32> = (0..20).collect();
        let mut items_b = items_a.clone();
        a.shuffle(&mut items_a);
        b.shuffle(&mut items_b);
        assert_eq!(items_a, items_b);
    }

    #[test]
    fn test_cache_retains_only_current_day() {
        let cache = LineupCache::new();
        cache.put("2025-01-01", vec![1, 2, 3]);
        cache.put("2025-01-02", vec![4, 5]);

        assert_eq!(cache.get("2025-01-02"), Some(vec![4, 5]));
        assert_eq!(cache.get("2025-01-01"), None, "old day superseded");
    }

    #[test]
    fn test_date_key_rolls_over_at_the_fixed_offset() {
        let before = Utc.with_ymd_and_hms(2025, 1, 1, 14, 59, 59).unwrap();
        let after = Utc.with_ymd_and_hms(2025, 1, 1, 15, 0, 0).unwrap();
        assert_eq!(date_key_at(before), "2025-01-01");
        assert_eq!(date_key_at(after), "2025-01-02");
    }
}
