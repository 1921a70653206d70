use bookly_core::FreeBusyWindow;
use chrono::{DateTime, Utc};

/// Normalize remote busy periods into a gap-free alternating free/busy
/// sequence covering `[range_start, range_end)`.
///
/// Busy periods may arrive unsorted and overlapping; they are clamped to the
/// queried range and merged before the free gaps are filled in.
pub fn normalize_windows(
    range_start: DateTime<Utc>,
    range_end: DateTime<Utc>,
    busy_periods: &[(DateTime<Utc>, DateTime<Utc>)],
) -> Vec<FreeBusyWindow> {
    if range_start >= range_end {
        return Vec::new();
    }

    let mut clamped: Vec<(DateTime<Utc>, DateTime<Utc>)> = busy_periods
        .iter()
        .map(|(start, end)| (*start.max(&range_start), *end.min(&range_end)))
        .filter(|(start, end)| start < end)
        .collect();
    clamped.sort();

    let mut merged: Vec<(DateTime<Utc>, DateTime<Utc>)> = Vec::with_capacity(clamped.len());
    for (start, end) in clamped {
        match merged.last_mut() {
            Some((_, last_end)) if start <= *last_end => {
                *last_end = (*last_end).max(end);
            }
            _ => merged.push((start, end)),
        }
    }

    let mut windows = Vec::with_capacity(merged.len() * 2 + 1);
    let mut cursor = range_start;
    for (start, end) in merged {
        if cursor < start {
            windows.push(FreeBusyWindow { start: cursor, end: start, busy: false });
        }
        windows.push(FreeBusyWindow { start, end, busy: true });
        cursor = end;
    }
    if cursor < range_end {
        windows.push(FreeBusyWindow { start: cursor, end: range_end, busy: false });
    }

    windows
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, TimeZone, Utc};

    use super::normalize_windows;

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, hour, minute, 0).unwrap()
    }

    #[test]
    fn empty_busy_list_yields_one_free_window() {
        let windows = normalize_windows(at(9, 0), at(17, 0), &[]);
        assert_eq!(windows.len(), 1);
        assert!(!windows[0].busy);
        assert_eq!(windows[0].start, at(9, 0));
        assert_eq!(windows[0].end, at(17, 0));
    }

    #[test]
    fn busy_periods_split_the_range() {
        let windows =
            normalize_windows(at(9, 0), at(12, 0), &[(at(10, 0), at(10, 30))]);

        assert_eq!(windows.len(), 3);
        assert!(!windows[0].busy);
        assert!(windows[1].busy);
        assert!(!windows[2].busy);
        assert_eq!(windows[1].start, at(10, 0));
        assert_eq!(windows[1].end, at(10, 30));
    }

    #[test]
    fn overlapping_and_unsorted_busy_periods_are_merged() {
        let windows = normalize_windows(
            at(9, 0),
            at(13, 0),
            &[(at(11, 0), at(12, 0)), (at(10, 0), at(11, 30)), (at(12, 0), at(12, 15))],
        );

        let busy: Vec<_> = windows.iter().filter(|w| w.busy).collect();
        assert_eq!(busy.len(), 1);
        assert_eq!(busy[0].start, at(10, 0));
        assert_eq!(busy[0].end, at(12, 15));
    }

    #[test]
    fn busy_periods_outside_the_range_are_clamped_away() {
        let windows =
            normalize_windows(at(9, 0), at(10, 0), &[(at(7, 0), at(8, 0)), (at(11, 0), at(12, 0))]);
        assert_eq!(windows.len(), 1);
        assert!(!windows[0].busy);
    }

    #[test]
    fn coverage_is_gap_free_and_ordered() {
        let windows = normalize_windows(
            at(8, 0),
            at(18, 0),
            &[(at(9, 0), at(9, 30)), (at(14, 0), at(15, 0))],
        );

        for pair in windows.windows(2) {
            assert_eq!(pair[0].end, pair[1].start);
            assert_ne!(pair[0].busy, pair[1].busy);
        }
        assert_eq!(windows.first().unwrap().start, at(8, 0));
        assert_eq!(windows.last().unwrap().end, at(18, 0));
    }

    #[test]
    fn inverted_range_yields_nothing() {
        assert!(normalize_windows(at(17, 0), at(9, 0), &[]).is_empty());
    }
}
