// ============================================================================
// spark-fields - Constants
// Flag bits carried by reactions
// ============================================================================

/// Reaction is an effect and is run by the scheduler
pub const EFFECT: u32 = 1 << 0;

/// Effect runs the moment one of its sources changes, even inside `batch`
pub const IMMEDIATE: u32 = 1 << 1;

/// A source changed since the last run
pub const DIRTY: u32 = 1 << 8;

/// Body is executing right now
pub const REACTION_IS_UPDATING: u32 = 1 << 9;

/// Disposed; never runs again
pub const DESTROYED: u32 = 1 << 10;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_are_distinct() {
        let all = [EFFECT, IMMEDIATE, DIRTY, REACTION_IS_UPDATING, DESTROYED];
        let combined = all.iter().fold(0, |acc, flag| acc | flag);
        assert_eq!(combined.count_ones() as usize, all.len());
    }
}
