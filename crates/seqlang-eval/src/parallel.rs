//! Chunked parallel `map` / `reduce` over sequences.
//!
//! A sequence of `n` elements is cut into contiguous chunks of
//! `ceil(n / P)` elements. Each chunk is evaluated in order on one worker;
//! results are stitched back in chunk order, so the outcome never depends on
//! scheduling. `reduce` folds every chunk from the neutral element and then
//! folds the partial results into each other left to right, so the neutral
//! element enters once per chunk. This matches the sequential fold whenever
//! the lambda is associative and the neutral element is an identity for it.

use crate::cancel::CancellationToken;
use crate::error::{EvalError, EvalResult};
use crate::value::{Num, Seq, Var};
use rayon::prelude::*;
use std::ops::Range;

/// Runs `map` and `reduce` over sequences on an owned rayon pool.
#[derive(Debug)]
pub struct SequenceEngine {
    parallelism: usize,
    /// `None` when running sequentially, either by request (`P = 1`) or
    /// because the pool could not be built.
    pool: Option<rayon::ThreadPool>,
}

impl SequenceEngine {
    /// An engine splitting work into `parallelism` chunks (at least 1).
    pub fn new(parallelism: usize) -> Self {
        let parallelism = parallelism.max(1);
        if parallelism == 1 {
            return Self::sequential();
        }
        match rayon::ThreadPoolBuilder::new()
            .num_threads(parallelism)
            .thread_name(|i| format!("seqlang-worker-{i}"))
            .build()
        {
            Ok(pool) => Self {
                parallelism,
                pool: Some(pool),
            },
            Err(e) => {
                tracing::warn!("failed to create thread pool ({e}), running sequentially");
                Self::sequential()
            }
        }
    }

    /// An engine that evaluates every element on the calling thread.
    pub fn sequential() -> Self {
        Self {
            parallelism: 1,
            pool: None,
        }
    }

    /// One chunk per available CPU.
    pub fn with_available_parallelism() -> Self {
        let cpus = std::thread::available_parallelism().map_or(1, |n| n.get());
        Self::new(cpus)
    }

    pub fn parallelism(&self) -> usize {
        self.parallelism
    }

    // ══════════════════════════════════════════════════════════════════════
    // map
    // ══════════════════════════════════════════════════════════════════════

    /// Apply `f` to every element, producing a list-derived sequence in the
    /// same order. Fails with the first error of the lowest failing chunk,
    /// or `Cancelled` if any chunk saw cancellation.
    pub fn map<F>(&self, seq: &Seq, f: F, cancel: &CancellationToken) -> EvalResult<Seq>
    where
        F: Fn(Var) -> EvalResult<Num> + Sync,
    {
        let size = seq.size();
        if size == 0 {
            return Ok(Seq::empty());
        }
        let Some(pool) = self.pool.as_ref() else {
            return Self::map_sequential(seq, f, cancel);
        };
        let chunks = chunk_ranges(size, self.parallelism);
        tracing::trace!(size, chunks = chunks.len(), "parallel map");
        let results: Vec<EvalResult<Vec<Var>>> = pool.install(|| {
            chunks
                .par_iter()
                .map(|range| map_chunk(seq, range.clone(), &f, cancel))
                .collect()
        });
        let parts = first_failure(results)?;
        let mut elements = Vec::with_capacity(size);
        for part in parts {
            elements.extend(part);
        }
        Ok(Seq::from_vec(elements))
    }

    /// [`map`](Self::map) on the calling thread, left to right.
    pub fn map_sequential<F>(seq: &Seq, f: F, cancel: &CancellationToken) -> EvalResult<Seq>
    where
        F: Fn(Var) -> EvalResult<Num>,
    {
        map_chunk(seq, 0..seq.size(), &f, cancel).map(Seq::from_vec)
    }

    // ══════════════════════════════════════════════════════════════════════
    // reduce
    // ══════════════════════════════════════════════════════════════════════

    /// Fold the sequence with `f(accumulator, element)` starting from
    /// `neutral`. An empty sequence yields `neutral`.
    pub fn reduce<F>(
        &self,
        seq: &Seq,
        neutral: Num,
        f: F,
        cancel: &CancellationToken,
    ) -> EvalResult<Num>
    where
        F: Fn(Num, Var) -> EvalResult<Num> + Sync,
    {
        let size = seq.size();
        if size == 0 {
            return Ok(neutral);
        }
        let Some(pool) = self.pool.as_ref() else {
            return Self::reduce_sequential(seq, neutral, f, cancel);
        };
        let chunks = chunk_ranges(size, self.parallelism);
        tracing::trace!(size, chunks = chunks.len(), "parallel reduce");
        let results: Vec<EvalResult<Num>> = pool.install(|| {
            chunks
                .par_iter()
                .map(|range| fold_chunk(seq, range.clone(), neutral, &f, cancel))
                .collect()
        });
        let mut partials = first_failure(results)?.into_iter();
        let Some(mut acc) = partials.next() else {
            return Ok(neutral);
        };
        for partial in partials {
            cancel.check()?;
            acc = f(acc, Var::Num(partial))?;
        }
        Ok(acc)
    }

    /// [`reduce`](Self::reduce) as a single left-to-right fold.
    pub fn reduce_sequential<F>(
        seq: &Seq,
        neutral: Num,
        f: F,
        cancel: &CancellationToken,
    ) -> EvalResult<Num>
    where
        F: Fn(Num, Var) -> EvalResult<Num>,
    {
        fold_chunk(seq, 0..seq.size(), neutral, &f, cancel)
    }
}

impl Default for SequenceEngine {
    fn default() -> Self {
        Self::with_available_parallelism()
    }
}

/// Contiguous ranges of at most `ceil(size / parts)` elements covering
/// `0..size`.
fn chunk_ranges(size: usize, parts: usize) -> Vec<Range<usize>> {
    let chunk = size.div_ceil(parts.max(1)).max(1);
    (0..size)
        .step_by(chunk)
        .map(|start| start..(start + chunk).min(size))
        .collect()
}

fn map_chunk<F>(
    seq: &Seq,
    range: Range<usize>,
    f: &F,
    cancel: &CancellationToken,
) -> EvalResult<Vec<Var>>
where
    F: Fn(Var) -> EvalResult<Num>,
{
    let mut out = Vec::with_capacity(range.len());
    for element in seq.elements_in(range) {
        cancel.check()?;
        out.push(Var::Num(f(element)?));
    }
    Ok(out)
}

fn fold_chunk<F>(
    seq: &Seq,
    range: Range<usize>,
    neutral: Num,
    f: &F,
    cancel: &CancellationToken,
) -> EvalResult<Num>
where
    F: Fn(Num, Var) -> EvalResult<Num>,
{
    let mut acc = neutral;
    for element in seq.elements_in(range) {
        cancel.check()?;
        acc = f(acc, element)?;
    }
    Ok(acc)
}

/// Unwrap per-chunk results. Cancellation anywhere wins; otherwise the
/// failure of the lowest chunk index is returned.
fn first_failure<T>(results: Vec<EvalResult<T>>) -> EvalResult<Vec<T>> {
    if results
        .iter()
        .any(|r| matches!(r, Err(EvalError::Cancelled)))
    {
        return Err(EvalError::Cancelled);
    }
    results.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use seqlang_types::{Error, ErrorType, Span, TokenPosition};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn int(i: i64) -> Num {
        Num::Integer(i)
    }

    fn square(v: Var) -> EvalResult<Num> {
        let n = v.as_num().unwrap_or(int(0));
        Ok(n.mul(n))
    }

    fn sum(acc: Num, v: Var) -> EvalResult<Num> {
        Ok(acc.add(v.as_num().unwrap_or(int(0))))
    }

    fn failure_at(i: i64) -> EvalError {
        let at = TokenPosition::new(1, i as u32);
        EvalError::Failed(Error::semantic(
            ErrorType::MapLambdaReturnsNotNumber,
            Span::point(at, 0),
            i.to_string(),
        ))
    }

    #[test]
    fn test_chunk_ranges_cover_everything() {
        assert_eq!(chunk_ranges(10, 3), vec![0..4, 4..8, 8..10]);
        assert_eq!(chunk_ranges(2, 8), vec![0..1, 1..2]);
        assert_eq!(chunk_ranges(5, 1), vec![0..5]);
    }

    #[test]
    fn test_map_preserves_order() {
        let engine = SequenceEngine::new(4);
        let cancel = CancellationToken::new();
        let out = engine
            .map(&Seq::range(1, 100), square, &cancel)
            .expect("map succeeds");
        let expected: Vec<Var> = (1..=100).map(|i| Var::Num(int(i * i))).collect();
        assert_eq!(out, Seq::from_vec(expected));
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let cancel = CancellationToken::new();
        let seq = Seq::range(-50, 1000);
        let sequential = SequenceEngine::sequential();
        let expected = sequential
            .reduce(&seq, int(0), sum, &cancel)
            .expect("reduce succeeds");
        for p in [2, 3, 7, 16] {
            let engine = SequenceEngine::new(p);
            assert_eq!(engine.parallelism(), p);
            let got = engine
                .reduce(&seq, int(0), sum, &cancel)
                .expect("reduce succeeds");
            assert_eq!(got, expected, "parallelism {p}");
        }
    }

    #[test]
    fn test_neutral_enters_once_per_chunk() {
        let cancel = CancellationToken::new();
        let seq = Seq::range(1, 5);
        let reduce_with = |p: usize| {
            SequenceEngine::new(p)
                .reduce(&seq, int(10), sum, &cancel)
                .expect("reduce succeeds")
        };
        // Chunks {1, 2, 3} and {4, 5}: (10 + 6) + (10 + 9).
        assert_eq!(reduce_with(2), int(35));
        // Five single-element chunks.
        assert_eq!(reduce_with(5), int(65));
        assert_eq!(reduce_with(1), int(25));
    }

    #[test]
    fn test_single_chunk_partial_is_the_result() {
        let cancel = CancellationToken::new();
        let engine = SequenceEngine::new(4);
        let got = engine
            .reduce(&Seq::range(7, 7), int(100), sum, &cancel)
            .expect("reduce succeeds");
        assert_eq!(got, int(107));
    }

    #[test]
    fn test_empty_sequence_short_circuits() {
        let engine = SequenceEngine::new(4);
        let cancel = CancellationToken::new();
        let calls = AtomicUsize::new(0);
        let mapped = engine
            .map(
                &Seq::empty(),
                |v| {
                    calls.fetch_add(1, Ordering::Relaxed);
                    square(v)
                },
                &cancel,
            )
            .expect("empty map");
        assert!(mapped.is_empty());
        let reduced = engine
            .reduce(&Seq::empty(), int(42), sum, &cancel)
            .expect("empty reduce");
        assert_eq!(reduced, int(42));
        assert_eq!(calls.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn test_lowest_chunk_error_wins() {
        let engine = SequenceEngine::new(4);
        let cancel = CancellationToken::new();
        // Elements 30 and 80 fail; they fall in chunks 1 and 3.
        let result = engine.map(
            &Seq::range(1, 100),
            |v| match v.as_num() {
                Some(Num::Integer(i)) if i == 30 || i == 80 => Err(failure_at(i)),
                _ => square(v),
            },
            &cancel,
        );
        assert_eq!(result, Err(failure_at(30)));
    }

    #[test]
    fn test_first_error_within_a_chunk_wins() {
        let cancel = CancellationToken::new();
        let result = SequenceEngine::reduce_sequential(
            &Seq::range(1, 10),
            int(0),
            |acc, v| match v.as_num() {
                Some(Num::Integer(i)) if i >= 4 => Err(failure_at(i)),
                _ => sum(acc, v),
            },
            &cancel,
        );
        assert_eq!(result, Err(failure_at(4)));
    }

    #[test]
    fn test_cancellation_beats_errors() {
        let results: Vec<EvalResult<i32>> =
            vec![Err(failure_at(1)), Ok(2), Err(EvalError::Cancelled)];
        assert_eq!(first_failure(results), Err(EvalError::Cancelled));
    }

    #[test]
    fn test_cancelled_token_stops_work() {
        let engine = SequenceEngine::new(3);
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = engine.map(&Seq::range(1, 1000), square, &cancel);
        assert_eq!(result, Err(EvalError::Cancelled));
    }

    #[test]
    fn test_cancel_mid_run() {
        let engine = SequenceEngine::new(2);
        let cancel = CancellationToken::new();
        let seen = AtomicUsize::new(0);
        let result = engine.reduce(
            &Seq::range(1, 100_000),
            int(0),
            |acc, v| {
                if seen.fetch_add(1, Ordering::Relaxed) == 100 {
                    cancel.cancel();
                }
                sum(acc, v)
            },
            &cancel,
        );
        assert_eq!(result, Err(EvalError::Cancelled));
        assert!(seen.load(Ordering::Relaxed) < 100_000);
    }

    #[test]
    fn test_parallelism_zero_means_one() {
        let engine = SequenceEngine::new(0);
        assert_eq!(engine.parallelism(), 1);
    }
}
