use thiserror::Error;

use crate::error::AppError;
use crate::models::ScheduleSlot;

/// First problem found in a course's weekly slots. Indices are positions in
/// the submitted list.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScheduleViolation {
    #[error("a course needs at least one schedule slot")]
    Empty,

    #[error("slot {index} ({slot}) starts after it ends")]
    InvertedRange { index: usize, slot: ScheduleSlot },

    #[error("slot {first} ({first_slot}) overlaps slot {second} ({second_slot})")]
    Overlap {
        first: usize,
        second: usize,
        first_slot: ScheduleSlot,
        second_slot: ScheduleSlot,
    },
}

impl From<ScheduleViolation> for AppError {
    fn from(violation: ScheduleViolation) -> Self {
        AppError::Validation(violation.to_string())
    }
}

/// Checks the slots of one course against each other.
///
/// Ranges are inclusive: `Mon 1~2` and `Mon 2~3` share period 2 and
/// collide. Slots of other courses in the same room or with the same
/// instructor are not considered.
pub fn validate_schedule(slots: &[ScheduleSlot]) -> Result<(), ScheduleViolation> {
    if slots.is_empty() {
        return Err(ScheduleViolation::Empty);
    }

    if let Some((index, slot)) = slots
        .iter()
        .enumerate()
        .find(|(_, s)| s.start_period > s.end_period)
    {
        return Err(ScheduleViolation::InvertedRange { index, slot: *slot });
    }

    for (i, a) in slots.iter().enumerate() {
        for (j, b) in slots.iter().enumerate().skip(i + 1) {
            if a.day == b.day && a.start_period <= b.end_period && b.start_period <= a.end_period {
                return Err(ScheduleViolation::Overlap {
                    first: i,
                    second: j,
                    first_slot: *a,
                    second_slot: *b,
                });
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Day;

    fn slot(day: Day, start: u32, end: u32) -> ScheduleSlot {
        ScheduleSlot::new(day, start, end)
    }

    #[test]
    fn test_accepts_disjoint_slots() {
        let slots = [slot(Day::Mon, 1, 2), slot(Day::Mon, 3, 4), slot(Day::Wed, 1, 2)];
        assert_eq!(validate_schedule(&slots), Ok(()));
    }

    #[test]
    fn test_single_period_slot_is_valid() {
        assert_eq!(validate_schedule(&[slot(Day::Fri, 5, 5)]), Ok(()));
    }

    #[test]
    fn test_rejects_empty() {
        assert_eq!(validate_schedule(&[]), Err(ScheduleViolation::Empty));
    }

    #[test]
    fn test_rejects_inverted_range() {
        let slots = [slot(Day::Mon, 1, 2), slot(Day::Tue, 4, 3)];
        assert_eq!(
            validate_schedule(&slots),
            Err(ScheduleViolation::InvertedRange { index: 1, slot: slots[1] })
        );
    }

    #[test]
    fn test_shared_boundary_period_overlaps() {
        let slots = [slot(Day::Mon, 1, 2), slot(Day::Mon, 2, 3)];
        assert!(matches!(
            validate_schedule(&slots),
            Err(ScheduleViolation::Overlap { first: 0, second: 1, .. })
        ));
    }

    #[test]
    fn test_reports_first_overlapping_pair() {
        let slots = [
            slot(Day::Tue, 1, 1),
            slot(Day::Mon, 3, 6),
            slot(Day::Mon, 1, 2),
            slot(Day::Mon, 4, 4),
        ];
        assert!(matches!(
            validate_schedule(&slots),
            Err(ScheduleViolation::Overlap { first: 1, second: 3, .. })
        ));
    }

    #[test]
    fn test_same_periods_on_different_days_are_fine() {
        let slots = [slot(Day::Mon, 1, 4), slot(Day::Tue, 1, 4), slot(Day::Sun, 1, 4)];
        assert!(validate_schedule(&slots).is_ok());
    }

    /// Exhaustive check of the rejection rule over small period ranges.
    #[test]
    fn test_matches_reference_rule_for_pairs() {
        for (a_start, a_end, b_start, b_end) in (1..=4u32).flat_map(|a| {
            (1..=4u32).flat_map(move |b| {
                (1..=4u32).flat_map(move |c| (1..=4u32).map(move |d| (a, b, c, d)))
            })
        }) {
            for same_day in [true, false] {
                let second_day = if same_day { Day::Mon } else { Day::Tue };
                let slots = [slot(Day::Mon, a_start, a_end), slot(second_day, b_start, b_end)];
                let expected_reject = a_start > a_end
                    || b_start > b_end
                    || (same_day && a_start <= b_end && b_start <= a_end);
                assert_eq!(
                    validate_schedule(&slots).is_err(),
                    expected_reject,
                    "slots {:?}",
                    slots
                );
            }
        }
    }
}
