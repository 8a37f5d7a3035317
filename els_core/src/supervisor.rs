//! Travel limits and feed direction.
//!
//! Left is the headstock side. Leadscrew position counts down toward the
//! headstock, so the left bound trips at or below its position and the right
//! bound at or above.

use core::fmt;

use crate::error::ElsError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    /// Toward the headstock.
    Left,
    /// Away from the headstock.
    Right,
}

impl Side {
    #[inline]
    pub fn toward_headstock(self) -> bool {
        matches!(self, Side::Left)
    }

    #[inline]
    pub fn of_motion(toward_headstock: bool) -> Self {
        if toward_headstock {
            Side::Left
        } else {
            Side::Right
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Side::Left => "left",
            Side::Right => "right",
        })
    }
}

/// Enabled travel bounds. `None` means the side is unlimited.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LimitState {
    pub left: Option<i32>,
    pub right: Option<i32>,
}

impl LimitState {
    /// The side that forbids one more step from `position` in the given
    /// direction, if any.
    #[inline]
    pub fn blocks(&self, position: i32, toward_headstock: bool) -> Option<Side> {
        if toward_headstock {
            self.left.filter(|l| position <= *l).map(|_| Side::Left)
        } else {
            self.right.filter(|r| position >= *r).map(|_| Side::Right)
        }
    }

    /// Latch `position` as the bound for `side`.
    pub fn set(&mut self, side: Side, position: i32) -> Result<(), ElsError> {
        match side {
            Side::Left => {
                if self.right.is_some_and(|r| position >= r) {
                    return Err(ElsError::InvalidCommand(
                        "left limit must be left of the right limit",
                    ));
                }
                self.left = Some(position);
            }
            Side::Right => {
                if self.left.is_some_and(|l| position <= l) {
                    return Err(ElsError::InvalidCommand(
                        "right limit must be right of the left limit",
                    ));
                }
                self.right = Some(position);
            }
        }
        Ok(())
    }

    pub fn clear(&mut self, side: Side) {
        match side {
            Side::Left => self.left = None,
            Side::Right => self.right = None,
        }
    }

    pub fn get(&self, side: Side) -> Option<i32> {
        match side {
            Side::Left => self.left,
            Side::Right => self.right,
        }
    }

    /// Move both bounds by `delta` (used when re-zeroing the position).
    pub fn shift(&mut self, delta: i32) {
        self.left = self.left.map(|l| l.saturating_add(delta));
        self.right = self.right.map(|r| r.saturating_add(delta));
    }
}

/// Spindle rotation sense and operator-selected feed direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirectionState {
    /// Spindle turning counter-clockwise (decoder counting forward).
    pub spin_ccw: bool,
    /// Operator asked to feed toward the headstock.
    pub feed_in: bool,
}

impl DirectionState {
    /// Whether synchronized motion currently moves the carriage toward the
    /// headstock. Reversing the spindle reverses the carriage.
    #[inline]
    pub fn feeding_in(&self) -> bool {
        self.spin_ccw == self.feed_in
    }
}

impl Default for DirectionState {
    fn default() -> Self {
        Self {
            spin_ccw: true,
            feed_in: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(true, true, true)]
    #[case(true, false, false)]
    #[case(false, true, false)]
    #[case(false, false, true)]
    fn feeding_in_truth_table(#[case] spin_ccw: bool, #[case] feed_in: bool, #[case] want: bool) {
        assert_eq!(DirectionState { spin_ccw, feed_in }.feeding_in(), want);
    }

    #[test]
    fn limits_block_only_their_own_direction() {
        let mut l = LimitState::default();
        l.set(Side::Right, 100).unwrap();
        assert_eq!(l.blocks(100, false), Some(Side::Right));
        assert_eq!(l.blocks(99, false), None);
        assert_eq!(l.blocks(100, true), None);
        assert_eq!(l.blocks(150, true), None);

        l.set(Side::Left, -20).unwrap();
        assert_eq!(l.blocks(-20, true), Some(Side::Left));
        assert_eq!(l.blocks(-19, true), None);
        assert_eq!(l.blocks(-20, false), None);
    }

    #[test]
    fn crossed_limits_are_refused() {
        let mut l = LimitState::default();
        l.set(Side::Right, 10).unwrap();
        assert!(matches!(l.set(Side::Left, 10), Err(ElsError::InvalidCommand(_))));
        assert!(matches!(l.set(Side::Left, 11), Err(ElsError::InvalidCommand(_))));
        assert_eq!(l.left, None);
        l.set(Side::Left, 9).unwrap();
        assert!(l.set(Side::Right, 9).is_err());
        assert_eq!(l.right, Some(10));
    }

    #[test]
    fn shift_moves_both_bounds() {
        let mut l = LimitState {
            left: Some(-5),
            right: Some(40),
        };
        l.shift(-10);
        assert_eq!(l.left, Some(-15));
        assert_eq!(l.right, Some(30));
        l.clear(Side::Left);
        assert_eq!(l.get(Side::Left), None);
    }
}
