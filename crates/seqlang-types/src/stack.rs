//! Stack growth for the recursive parser and evaluator.
//!
//! Deeply nested expressions recurse once per tree level. Wrapping each
//! level in [`ensure_sufficient_stack`] moves the recursion onto a fresh
//! heap-allocated segment whenever the current stack runs low.

/// Grow when less than this much stack remains.
const RED_ZONE: usize = 128 * 1024;

/// Size of each newly allocated segment.
const STACK_PER_RECURSION: usize = 1024 * 1024;

/// Run `f`, first growing the stack if the remaining space is below the
/// red zone.
#[inline]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(RED_ZONE, STACK_PER_RECURSION, f)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn depth(n: u64) -> u64 {
        ensure_sufficient_stack(|| if n == 0 { 0 } else { depth(n - 1) + 1 })
    }

    #[test]
    fn test_deep_recursion_does_not_overflow() {
        assert_eq!(depth(100_000), 100_000);
    }

    #[test]
    fn test_passes_results_through() {
        let result: Result<i32, &str> = ensure_sufficient_stack(|| Ok(7));
        assert_eq!(result, Ok(7));
    }
}
