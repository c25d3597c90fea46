//! Fractional sibling-position computation (spec.md §4.10 step 7).

/// A sibling page as seen by the position calculation: just its fractional
/// order key.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SiblingPosition {
    /// The sibling's `position` value.
    pub position: f64,
}

/// Where a newly uploaded file should be inserted relative to an existing
/// sibling, or appended to the tail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertPosition {
    /// Insert before `after_node_id`.
    Before,
    /// Insert after `after_node_id`.
    After,
    /// No position/afterNodeId given; append.
    Tail,
}

/// Inputs needed to compute the new page's `position`.
#[derive(Debug, Clone)]
pub struct PositionContext {
    /// The sibling named by `afterNodeId`, if it still exists.
    pub target: Option<SiblingPosition>,
    /// For `Before`: the sibling immediately preceding `target` by
    /// `position` ascending. For `After`: the sibling immediately
    /// following `target`.
    pub neighbor: Option<SiblingPosition>,
    /// The highest `position` among all siblings, for tail placement.
    pub last: Option<SiblingPosition>,
}

/// Compute the fractional `position` for a new sibling.
///
/// `afterNodeId` pointing at a page that no longer exists falls back to
/// tail placement symmetrically for both `Before` and `After` — the
/// distilled rule only states this explicitly for `Before`, but a vanished
/// target carries no ordering information either way, so a plain append is
/// the only non-arbitrary choice for `After` as well.
#[must_use]
pub fn compute_position(kind: InsertPosition, ctx: &PositionContext) -> f64 {
    match kind {
        InsertPosition::Before => match ctx.target {
            Some(target) => {
                let prev = ctx.neighbor.map_or(0.0, |n| n.position);
                (prev + target.position) / 2.0
            }
            None => tail_position(ctx.last),
        },
        InsertPosition::After => match ctx.target {
            Some(target) => {
                let next = ctx.neighbor.map_or(target.position + 2.0, |n| n.position);
                (target.position + next) / 2.0
            }
            None => tail_position(ctx.last),
        },
        InsertPosition::Tail => tail_position(ctx.last),
    }
}

fn tail_position(last: Option<SiblingPosition>) -> f64 {
    last.map_or(0.0, |l| l.position + 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn before_with_no_previous_sibling_halves_target() {
        let ctx = PositionContext { target: Some(SiblingPosition { position: 4.0 }), neighbor: None, last: None };
        assert_eq!(compute_position(InsertPosition::Before, &ctx), 2.0);
    }

    #[test]
    fn before_with_previous_sibling_takes_midpoint() {
        let ctx = PositionContext {
            target: Some(SiblingPosition { position: 4.0 }),
            neighbor: Some(SiblingPosition { position: 2.0 }),
            last: None,
        };
        assert_eq!(compute_position(InsertPosition::Before, &ctx), 3.0);
    }

    #[test]
    fn before_missing_target_falls_back_to_tail() {
        let ctx = PositionContext { target: None, neighbor: None, last: Some(SiblingPosition { position: 5.0 }) };
        assert_eq!(compute_position(InsertPosition::Before, &ctx), 6.0);
    }

    #[test]
    fn after_with_no_next_sibling_adds_two_then_halves() {
        let ctx = PositionContext { target: Some(SiblingPosition { position: 4.0 }), neighbor: None, last: None };
        assert_eq!(compute_position(InsertPosition::After, &ctx), 5.0);
    }

    #[test]
    fn after_with_next_sibling_takes_midpoint() {
        let ctx = PositionContext {
            target: Some(SiblingPosition { position: 4.0 }),
            neighbor: Some(SiblingPosition { position: 6.0 }),
            last: None,
        };
        assert_eq!(compute_position(InsertPosition::After, &ctx), 5.0);
    }

    #[test]
    fn after_missing_target_falls_back_to_tail() {
        let ctx = PositionContext { target: None, neighbor: None, last: None };
        assert_eq!(compute_position(InsertPosition::After, &ctx), 0.0);
    }

    #[test]
    fn tail_with_no_siblings_is_zero() {
        let ctx = PositionContext { target: None, neighbor: None, last: None };
        assert_eq!(compute_position(InsertPosition::Tail, &ctx), 0.0);
    }

    #[test]
    fn tail_with_siblings_is_last_plus_one() {
        let ctx = PositionContext { target: None, neighbor: None, last: Some(SiblingPosition { position: 7.5 }) };
        assert_eq!(compute_position(InsertPosition::Tail, &ctx), 8.5);
    }
}
