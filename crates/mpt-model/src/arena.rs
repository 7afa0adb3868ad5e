//! Arena allocation context for lowering-phase scratch space.
//!
//! The row-lowering workers stage per-row cell lists in a bumpalo arena and
//! copy the finished rows out, so the transient allocations of a whole
//! segment are released in one O(1) reset at the segment boundary. This is a
//! throughput hint only; the sequential path behaves identically without it.

use bumpalo::Bump;

/// Arena context for segment-scoped scratch allocations.
///
/// Created once per parallel worker (`map_init`), reset between segments.
pub struct ArenaContext {
    bump: Bump,
}

impl ArenaContext {
    pub fn new() -> Self {
        Self { bump: Bump::new() }
    }

    /// Reset the arena for reuse (O(1) operation).
    ///
    /// Releases all scratch allocations without running destructors. Safe
    /// because the staged cell lists are plain data without Drop side
    /// effects.
    pub fn reset(&mut self) {
        self.bump.reset();
    }

    /// Allocate a scratch Vec in the arena.
    pub fn scratch_vec<T>(&self) -> bumpalo::collections::Vec<'_, T> {
        bumpalo::collections::Vec::new_in(&self.bump)
    }
}

impl Default for ArenaContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scratch_vec_roundtrip() {
        let ctx = ArenaContext::new();
        let mut vec = ctx.scratch_vec::<f64>();
        vec.push(1.0);
        vec.push(2.0);
        assert_eq!(vec.len(), 2);
        assert_eq!(vec[1], 2.0);
    }

    #[test]
    fn test_reset_allows_reuse() {
        let mut ctx = ArenaContext::new();
        {
            let mut vec = ctx.scratch_vec::<usize>();
            vec.extend(0..1000);
        }
        ctx.reset();
        let mut vec = ctx.scratch_vec::<usize>();
        vec.push(7);
        assert_eq!(vec[0], 7);
    }

    #[test]
    fn test_context_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<ArenaContext>();
    }
}
