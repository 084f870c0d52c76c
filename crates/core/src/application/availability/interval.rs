// Interval arithmetic over half-open time ranges
// Every function returns a normalized set: sorted, disjoint, non-adjacent

use crate::domain::TimeRange;

/// Sort, drop empty ranges, merge overlapping and adjacent ranges
pub fn normalize(ranges: impl IntoIterator<Item = TimeRange>) -> Vec<TimeRange> {
    let mut sorted: Vec<TimeRange> = ranges.into_iter().filter(|r| !r.is_empty()).collect();
    sorted.sort_unstable();

    let mut merged: Vec<TimeRange> = Vec::with_capacity(sorted.len());
    for range in sorted {
        match merged.last_mut() {
            Some(last) if range.start <= last.end => last.end = last.end.max(range.end),
            _ => merged.push(range),
        }
    }
    merged
}

/// Parts of `base` not covered by any of `cuts`
pub fn subtract(base: &[TimeRange], cuts: &[TimeRange]) -> Vec<TimeRange> {
    let base = normalize(base.iter().copied());
    let cuts = normalize(cuts.iter().copied());

    let mut out = Vec::with_capacity(base.len());
    let mut first_cut = 0;

    for range in base {
        let mut cursor = range.start;

        while first_cut < cuts.len() && cuts[first_cut].end <= cursor {
            first_cut += 1;
        }

        for cut in cuts[first_cut..].iter().take_while(|c| c.start < range.end) {
            if cut.start > cursor {
                out.push(TimeRange::from_bounds(cursor, cut.start));
            }
            cursor = cursor.max(cut.end);
            if cursor >= range.end {
                break;
            }
        }

        if cursor < range.end {
            out.push(TimeRange::from_bounds(cursor, range.end));
        }
    }

    normalize(out)
}

/// Ranges covered by both `a` and `b`
pub fn intersect(a: &[TimeRange], b: &[TimeRange]) -> Vec<TimeRange> {
    let a = normalize(a.iter().copied());
    let b = normalize(b.iter().copied());

    let mut out = Vec::new();
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        if let Some(common) = a[i].intersection(&b[j]) {
            out.push(common);
        }
        if a[i].end < b[j].end {
            i += 1;
        } else {
            j += 1;
        }
    }

    normalize(out)
}

/// Intersection of every set; empty when there are no sets
pub fn intersect_all(sets: &[Vec<TimeRange>]) -> Vec<TimeRange> {
    let Some((first, rest)) = sets.split_first() else {
        return Vec::new();
    };
    rest.iter()
        .fold(normalize(first.iter().copied()), |acc, set| intersect(&acc, set))
}

pub fn clip(ranges: &[TimeRange], window: TimeRange) -> Vec<TimeRange> {
    intersect(ranges, &[window])
}

pub fn total_duration(ranges: &[TimeRange]) -> i64 {
    normalize(ranges.iter().copied())
        .iter()
        .map(TimeRange::duration_ms)
        .sum()
}

/// Range of a normalized set that fully contains `target`
pub fn containing(ranges: &[TimeRange], target: &TimeRange) -> Option<TimeRange> {
    ranges.iter().copied().find(|r| r.contains(target))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn r(start: i64, end: i64) -> TimeRange {
        TimeRange::from_bounds(start, end)
    }

    #[test]
    fn test_normalize_merges_overlapping_and_adjacent() {
        let merged = normalize(vec![r(50, 60), r(0, 10), r(10, 20), r(15, 30), r(40, 40)]);
        assert_eq!(merged, vec![r(0, 30), r(50, 60)]);
    }

    #[test]
    fn test_subtract_splits_base() {
        let free = subtract(&[r(0, 100)], &[r(10, 20), r(15, 30), r(90, 120)]);
        assert_eq!(free, vec![r(0, 10), r(30, 90)]);
    }

    #[test]
    fn test_subtract_cut_covering_everything() {
        assert!(subtract(&[r(10, 20), r(30, 40)], &[r(0, 100)]).is_empty());
    }

    #[test]
    fn test_subtract_without_cuts_is_identity() {
        assert_eq!(subtract(&[r(30, 40), r(0, 10)], &[]), vec![r(0, 10), r(30, 40)]);
    }

    #[test]
    fn test_intersect() {
        let common = intersect(&[r(0, 10), r(20, 40)], &[r(5, 25), r(35, 50)]);
        assert_eq!(common, vec![r(5, 10), r(20, 25), r(35, 40)]);
    }

    #[test]
    fn test_intersect_all_empty_input() {
        assert!(intersect_all(&[]).is_empty());
        assert_eq!(
            intersect_all(&[vec![r(0, 10)], vec![r(5, 20)], vec![r(0, 7)]]),
            vec![r(5, 7)]
        );
    }

    #[test]
    fn test_clip_and_total_duration() {
        let clipped = clip(&[r(0, 10), r(20, 30)], r(5, 25));
        assert_eq!(clipped, vec![r(5, 10), r(20, 25)]);
        assert_eq!(total_duration(&clipped), 10);
        assert_eq!(total_duration(&[r(0, 10), r(5, 15)]), 15);
    }

    #[test]
    fn test_containing() {
        let set = vec![r(0, 10), r(20, 40)];
        assert_eq!(containing(&set, &r(25, 30)), Some(r(20, 40)));
        assert_eq!(containing(&set, &r(5, 25)), None);
    }

    fn arb_ranges() -> impl Strategy<Value = Vec<TimeRange>> {
        prop::collection::vec((0i64..1_000, 1i64..200), 0..12)
            .prop_map(|v| v.into_iter().map(|(s, len)| r(s, s + len)).collect())
    }

    fn is_normalized(ranges: &[TimeRange]) -> bool {
        ranges.iter().all(|r| !r.is_empty()) && ranges.windows(2).all(|w| w[0].end < w[1].start)
    }

    proptest! {
        #[test]
        fn prop_outputs_are_normalized(a in arb_ranges(), b in arb_ranges()) {
            prop_assert!(is_normalized(&normalize(a.clone())));
            prop_assert!(is_normalized(&subtract(&a, &b)));
            prop_assert!(is_normalized(&intersect(&a, &b)));
        }

        #[test]
        fn prop_subtract_disjoint_from_cuts(base in arb_ranges(), cuts in arb_ranges()) {
            let rest = subtract(&base, &cuts);
            prop_assert!(intersect(&rest, &cuts).is_empty());
        }

        #[test]
        fn prop_subtract_within_base(base in arb_ranges(), cuts in arb_ranges()) {
            let rest = subtract(&base, &cuts);
            prop_assert_eq!(intersect(&rest, &base), rest);
        }

        #[test]
        fn prop_subtract_and_intersect_partition_base(base in arb_ranges(), cuts in arb_ranges()) {
            let rest = total_duration(&subtract(&base, &cuts));
            let common = total_duration(&intersect(&base, &cuts));
            prop_assert_eq!(rest + common, total_duration(&base));
        }
    }
}
