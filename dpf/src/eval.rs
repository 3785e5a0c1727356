//! Evaluation of DPF keys.
//!
//! Everything here is a pure tree walk over an immutable [`DpfKey`]: single
//! points ([`evaluate_at`]), batches ([`evaluate_batch`]), the whole domain
//! as a lazy iterator ([`full_domain_iter`]) or a rayon-parallel vector
//! ([`evaluate_domain_parallel`]), and incremental level-by-level resumption
//! through an [`EvaluationContext`].  Distinct keys and distinct contexts can
//! be evaluated from parallel threads without synchronization, since each
//! walk owns its own path state and treats the key as read-only.

use crate::error::Error;
use crate::key::DpfKey;
use crate::prg::Prg;
use crate::ring::ValueRing;
use rayon::prelude::*;
use std::collections::HashMap;
use utils::bit_decompose::{bit_at, bit_decompose};

/// How many levels [`evaluate_domain_parallel`] splits off the top of the
/// tree; each of the up to `2^PARALLEL_SPLIT_DEPTH` subtrees becomes one
/// rayon task.
const PARALLEL_SPLIT_DEPTH: usize = 6;

/// One step of the tree walk: expand the current seed and descend into the
/// child selected by `direction` (`false` = left), applying the level's
/// correction word iff the control bit before the descent was set.
#[inline(always)]
fn descend(
    prg: &Prg,
    key: &DpfKey,
    level: usize,
    seed: u128,
    control_bit: bool,
    direction: bool,
) -> (u128, bool) {
    let (children, bits) = prg.expand(seed);
    let d = direction as usize;
    let cw = &key.correction_words[level];
    if control_bit {
        let control_correction = if direction {
            cw.control_right
        } else {
            cw.control_left
        };
        (children[d] ^ cw.seed, bits[d] ^ control_correction)
    } else {
        (children[d], bits[d])
    }
}

/// Turn a leaf state into this party's output share.
#[inline(always)]
fn leaf_share(
    prg: &Prg,
    key: &DpfKey,
    ring: &ValueRing,
    seed: u128,
    control_bit: bool,
) -> u128 {
    let mut value = ring.reduce(prg.convert(seed));
    if control_bit {
        value = ring.add(value, key.value_correction);
    }
    if key.party_id == 1 {
        value = ring.neg(value);
    }
    value
}

/// Walk the key's tree along the top `depth` bits of `path` (most significant
/// first) and return the `(seed, control_bit)` state reached at that depth.
///
/// This is the stateless primitive underneath all evaluation entry points.
/// Pure and deterministic; `path` must be a valid `depth`-bit value.
pub fn eval_prefix(key: &DpfKey, path: u128, depth: usize) -> (u128, bool) {
    debug_assert!(depth <= key.params.log_domain_size as usize);
    let prg = Prg::new();
    let mut state = (key.root_seed, key.root_control_bit);
    for (level, direction) in bit_decompose::<u128, bool>(path, depth)
        .into_iter()
        .enumerate()
    {
        state = descend(&prg, key, level, state.0, state.1, direction);
    }
    state
}

/// Evaluate the key at a single domain point.
///
/// Returns this party's additive share of `f(index)` in `Z_{2^b}`; fails with
/// [`Error::InvalidArgument`] iff `index` lies outside the domain.
pub fn evaluate_at(key: &DpfKey, index: u128) -> Result<u128, Error> {
    if !key.params.domain_contains(index) {
        return Err(Error::InvalidArgument(format!(
            "index = {index} is outside the domain of size 2^{}",
            key.params.log_domain_size
        )));
    }
    let n = key.params.log_domain_size as usize;
    let prg = Prg::new();
    let ring = key.params.ring();
    let mut state = (key.root_seed, key.root_control_bit);
    for level in 0..n {
        state = descend(
            &prg,
            key,
            level,
            state.0,
            state.1,
            bit_at(index, level, n),
        );
    }
    Ok(leaf_share(&prg, key, &ring, state.0, state.1))
}

/// Evaluate the key at each of the given points.
///
/// The result equals independent [`evaluate_at`] calls; the whole batch fails
/// if any point is out of range.
pub fn evaluate_batch(key: &DpfKey, indices: &[u128]) -> Result<Vec<u128>, Error> {
    indices
        .iter()
        .map(|&index| evaluate_at(key, index))
        .collect()
}

/// Evaluate the key on the full domain `[0, 2^n)` as a lazy iterator.
///
/// The iterator performs a single depth-first traversal reusing shared path
/// prefixes, so producing all leaves costs one PRG expansion per tree node
/// rather than `n` per leaf.  It holds O(`n`) state, yields `(x, share)`
/// pairs in increasing `x` order, and can be dropped at any point; every call
/// starts a fresh traversal.
pub fn full_domain_iter(key: &DpfKey) -> FullDomainIterator<'_> {
    FullDomainIterator {
        prg: Prg::new(),
        ring: key.params.ring(),
        key,
        next_index: 0,
        stack: vec![(key.root_seed, key.root_control_bit, 0)],
    }
}

/// Lazy full-domain evaluation, created by [`full_domain_iter`].
pub struct FullDomainIterator<'a> {
    key: &'a DpfKey,
    prg: Prg,
    ring: ValueRing,
    next_index: u128,
    /// Pending subtrees as `(seed, control_bit, depth)`, top of the stack
    /// holding the leftmost unvisited path.
    stack: Vec<(u128, bool, u32)>,
}

impl Iterator for FullDomainIterator<'_> {
    type Item = (u128, u128);

    fn next(&mut self) -> Option<Self::Item> {
        let n = self.key.params.log_domain_size;
        while let Some((seed, control_bit, depth)) = self.stack.pop() {
            if depth == n {
                let index = self.next_index;
                self.next_index = self.next_index.wrapping_add(1);
                let share = leaf_share(&self.prg, self.key, &self.ring, seed, control_bit);
                return Some((index, share));
            }
            let (children, bits) = self.prg.expand(seed);
            let cw = &self.key.correction_words[depth as usize];
            let (mut left, mut right) = ((children[0], bits[0]), (children[1], bits[1]));
            if control_bit {
                left = (left.0 ^ cw.seed, left.1 ^ cw.control_left);
                right = (right.0 ^ cw.seed, right.1 ^ cw.control_right);
            }
            // right below left, so the left subtree is drained first
            self.stack.push((right.0, right.1, depth + 1));
            self.stack.push((left.0, left.1, depth + 1));
        }
        None
    }
}

/// Evaluate the key on the full domain into a vector, splitting the disjoint
/// top-level subtrees across rayon workers.
///
/// Produces exactly the shares of [`full_domain_iter`], in the same order.
/// Panics if the domain does not fit into a vector.
pub fn evaluate_domain_parallel(key: &DpfKey) -> Vec<u128> {
    let n = key.params.log_domain_size as usize;
    assert!(
        n < usize::BITS as usize,
        "domain of size 2^{n} cannot be materialized"
    );
    let split = n.min(PARALLEL_SPLIT_DEPTH);
    (0..1usize << split)
        .into_par_iter()
        .flat_map_iter(|prefix| {
            let prg = Prg::new();
            let ring = key.params.ring();
            let (seed, control_bit) = eval_prefix(key, prefix as u128, split);
            let mut shares = Vec::with_capacity(1 << (n - split));
            collect_subtree(&prg, key, &ring, seed, control_bit, split, &mut shares);
            shares
        })
        .collect()
}

/// Depth-first collection of all leaf shares below one `(seed, control_bit)`
/// node at `depth`.
fn collect_subtree(
    prg: &Prg,
    key: &DpfKey,
    ring: &ValueRing,
    seed: u128,
    control_bit: bool,
    depth: usize,
    shares: &mut Vec<u128>,
) {
    if depth == key.params.log_domain_size as usize {
        shares.push(leaf_share(prg, key, ring, seed, control_bit));
        return;
    }
    let (children, bits) = prg.expand(seed);
    let cw = &key.correction_words[depth];
    let (mut left, mut right) = ((children[0], bits[0]), (children[1], bits[1]));
    if control_bit {
        left = (left.0 ^ cw.seed, left.1 ^ cw.control_left);
        right = (right.0 ^ cw.seed, right.1 ^ cw.control_right);
    }
    collect_subtree(prg, key, ring, left.0, left.1, depth + 1, shares);
    collect_subtree(prg, key, ring, right.0, right.1, depth + 1, shares);
}

/// Cached tree-walk state for incremental, level-by-level evaluation of one
/// key.
///
/// The context starts at the root (frontier level 0) and only ever moves
/// forward: each [`EvaluationContext::evaluate_at_level`] call advances the
/// frontier and remembers the `(seed, control_bit)` state of every prefix it
/// evaluated.  The cache is append-only, so refining any previously explored
/// prefix resumes from its deepest cached ancestor, even one explored before
/// the frontier moved past it on another path.  Asking for a level behind
/// the frontier fails with [`Error::OutOfOrder`]; restarting requires a
/// fresh context.
///
/// A context is exclusively owned by the evaluating party; it is
/// single-writer and must not be shared across threads without external
/// synchronization.
#[derive(Debug)]
pub struct EvaluationContext<'a> {
    key: &'a DpfKey,
    prg: Prg,
    ring: ValueRing,
    frontier_level: usize,
    /// States of the explored path prefixes, keyed by `(level, prefix)`.
    /// Append-only; entries from superseded levels stay usable as ancestors.
    cache: HashMap<(usize, u128), (u128, bool)>,
}

impl<'a> EvaluationContext<'a> {
    /// Create a fresh context at the root of the key's tree.
    pub fn new(key: &'a DpfKey) -> Self {
        let mut cache = HashMap::new();
        cache.insert((0, 0), (key.root_seed, key.root_control_bit));
        Self {
            key,
            prg: Prg::new(),
            ring: key.params.ring(),
            frontier_level: 0,
            cache,
        }
    }

    /// The level the context has advanced to, in `[0, log_domain_size]`.
    pub fn get_frontier_level(&self) -> usize {
        self.frontier_level
    }

    /// Evaluate the given `level`-bit path prefixes, advancing the frontier
    /// to `level`.
    ///
    /// For `level == log_domain_size` the returned values are exactly the
    /// output shares of [`evaluate_at`].  For smaller levels they are the
    /// party-signed value extraction of the reached tree node: off the path
    /// to `alpha` the two parties' values cancel to 0, on it they differ
    /// pseudorandomly, which supports coarse-to-fine point location.
    ///
    /// Fails with [`Error::OutOfOrder`] if `level` lies behind the frontier
    /// (re-querying the frontier level itself is allowed), and with
    /// [`Error::InvalidArgument`] if `level` exceeds the tree depth or a
    /// prefix does not fit into `level` bits.
    pub fn evaluate_at_level(
        &mut self,
        level: usize,
        prefixes: &[u128],
    ) -> Result<Vec<u128>, Error> {
        let n = self.key.params.log_domain_size as usize;
        if level > n {
            return Err(Error::InvalidArgument(format!(
                "level = {level} exceeds the tree depth {n}"
            )));
        }
        if level < self.frontier_level {
            return Err(Error::OutOfOrder {
                requested: level,
                frontier: self.frontier_level,
            });
        }
        for &prefix in prefixes {
            if level < 128 && prefix >> level != 0 {
                return Err(Error::InvalidArgument(format!(
                    "prefix = {prefix} does not fit into {level} bits"
                )));
            }
        }

        let mut values = Vec::with_capacity(prefixes.len());
        for &prefix in prefixes {
            let (seed, control_bit) = self.state_for_prefix(prefix, level);
            self.cache.insert((level, prefix), (seed, control_bit));
            let mut value = self.ring.reduce(self.prg.convert(seed));
            if level == n && control_bit {
                value = self.ring.add(value, self.key.value_correction);
            }
            if self.key.party_id == 1 {
                value = self.ring.neg(value);
            }
            values.push(value);
        }

        if level > self.frontier_level {
            self.frontier_level = level;
        }
        Ok(values)
    }

    /// Compute the state of a `level`-bit prefix, resuming the walk from the
    /// deepest explored ancestor of the prefix, which may lie behind the
    /// frontier.  The root is always cached, so an unexplored path simply
    /// walks from level 0.
    fn state_for_prefix(&self, prefix: u128, level: usize) -> (u128, bool) {
        for depth in (0..=level).rev() {
            let skip = level - depth;
            let ancestor = if skip == 128 { 0 } else { prefix >> skip };
            if let Some(&(seed, control_bit)) = self.cache.get(&(depth, ancestor)) {
                let mut state = (seed, control_bit);
                for i in depth..level {
                    state = descend(
                        &self.prg,
                        self.key,
                        i,
                        state.0,
                        state.1,
                        bit_at(prefix, i, level),
                    );
                }
                return state;
            }
        }
        eval_prefix(self.key, prefix, level)
    }
}
