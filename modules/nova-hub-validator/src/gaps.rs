//! Pure gap-detection algorithm over a circular sequence space.

const SPACE: i32 = 1000;
const WRAP_THRESHOLD: i32 = 500;

/// One missing sequence index found while walking a route's history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Gap {
    /// The sequence immediately before the gap.
    pub after: i16,
    /// The sequence immediately after the gap.
    pub before: i16,
    pub expected_seq: i16,
    pub gap_size: i16,
}

/// Find every gap in a route's sequence history. `sequences` need not be
/// sorted or deduplicated; a single distinct value (or none) yields no gaps.
pub fn find_gaps(sequences: &[i16]) -> Vec<Gap> {
    let mut sorted: Vec<i32> = sequences.iter().map(|&s| s as i32).collect();
    sorted.sort_unstable();
    sorted.dedup();

    if sorted.len() < 2 {
        return Vec::new();
    }

    let ordered = reorder_for_wrap(&sorted);

    let mut gaps = Vec::new();
    for window in ordered.windows(2) {
        let (c, n) = (window[0], window[1]);
        let gap_size = if n > c {
            n - c - 1
        } else {
            (SPACE - c - 1) + n
        };

        if gap_size > 0 && gap_size < WRAP_THRESHOLD {
            for j in 0..gap_size {
                let expected = (c + 1 + j).rem_euclid(SPACE);
                gaps.push(Gap {
                    after: c as i16,
                    before: n as i16,
                    expected_seq: expected as i16,
                    gap_size: gap_size as i16,
                });
            }
        }
    }

    gaps
}

/// If the largest gap between consecutive sorted values exceeds both the
/// wrap threshold and the implicit "wrap gap" from last back to first, the
/// route wrapped mid-sequence: splice the list at that gap so the seam
/// lines up with the wrap, not with a hole.
fn reorder_for_wrap(sorted: &[i32]) -> Vec<i32> {
    let n = sorted.len();
    let first = sorted[0];
    let last = sorted[n - 1];
    let wrap_gap = (SPACE - last) + first;

    let mut max_gap = -1;
    let mut max_idx = 0;
    for i in 0..n - 1 {
        let gap = sorted[i + 1] - sorted[i] - 1;
        if gap > max_gap {
            max_gap = gap;
            max_idx = i;
        }
    }

    if max_gap > WRAP_THRESHOLD && max_gap > wrap_gap {
        let mut reordered = Vec::with_capacity(n);
        reordered.extend_from_slice(&sorted[max_idx + 1..]);
        reordered.extend_from_slice(&sorted[..=max_idx]);
        reordered
    } else {
        sorted.to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_sequence_has_no_gaps() {
        assert!(find_gaps(&[5]).is_empty());
    }

    #[test]
    fn duplicate_sequences_dedup_to_no_gaps() {
        assert!(find_gaps(&[5, 5, 5]).is_empty());
    }

    #[test]
    fn consecutive_sequences_have_no_gaps() {
        assert!(find_gaps(&[1, 2, 3]).is_empty());
    }

    #[test]
    fn missing_single_sequence_is_detected() {
        let gaps = find_gaps(&[1, 2, 4]);
        assert_eq!(gaps.len(), 1);
        assert_eq!(gaps[0].expected_seq, 3);
        assert_eq!(gaps[0].gap_size, 1);
    }

    #[test]
    fn sequence_500_after_100_is_a_gap_not_a_wrap() {
        let gaps = find_gaps(&[100, 500]);
        assert_eq!(gaps.len(), 399);
        assert_eq!(gaps[0].gap_size, 399);
        assert_eq!(gaps[0].expected_seq, 101);
        assert_eq!(gaps.last().unwrap().expected_seq, 499);
    }

    #[test]
    fn sequence_999_then_0_is_not_a_gap() {
        assert!(find_gaps(&[999, 0]).is_empty());
        assert!(find_gaps(&[0, 999]).is_empty());
    }

    #[test]
    fn wraps_reorder_around_the_true_seam() {
        // History: ..., 997, 998, 999, 0, 1, 2 — sorted puts 0,1,2 first.
        // The real gap (if any) is between 2 and 997, not between 2 and 0.
        let gaps = find_gaps(&[997, 998, 999, 0, 1, 2]);
        assert!(gaps.is_empty());
    }

    #[test]
    fn wrap_with_an_actual_gap_past_the_seam() {
        // 997, 999, 0, 1 — wraps at 999->0, but 997->999 has a 1-seq gap.
        let gaps = find_gaps(&[997, 999, 0, 1]);
        assert_eq!(gaps.len(), 1);
        assert_eq!(gaps[0].expected_seq, 998);
    }
}
