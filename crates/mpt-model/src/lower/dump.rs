//! Dump scheduler: run the lowering passes, sequentially or fork-join.
//!
//! The three passes are independent, so above a size threshold they run as
//! parallel tasks; constraint lowering is additionally split into
//! index-contiguous row segments. Every worker writes rows at predetermined
//! absolute indices, so the assembled order always equals the mechanism
//! model's enumeration order and the sequential and concurrent paths produce
//! identical models.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;

use once_cell::sync::Lazy;
#[cfg(feature = "parallel")]
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info};

use mpt_core::{MechanismModel, MptResult, TokenId, TokenIndexMap};

use crate::arena::ArenaContext;
use crate::lower::{
    lower_linear_objective, lower_linear_row, lower_quadratic_objective, lower_quadratic_row,
    lower_variables, retained_rows, LoweredRow,
};
use crate::model::tetrad::{QuadraticConstraint, QuadraticTetradModel};
use crate::model::triad::{LinearConstraint, LinearTriadModel};
use crate::model::{Constraint, ConstraintSource, RowCell};

/// Run the dump concurrently only when the row count exceeds this multiple
/// of the available parallelism.
const PARALLEL_ROW_FACTOR: usize = 4;

/// Smallest row segment a worker will take.
const MIN_SEGMENT: usize = 32;

static AVAILABLE_CORES: Lazy<usize> = Lazy::new(|| {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
});

/// Options for a dump run.
#[derive(Debug, Clone, Default)]
pub struct DumpOptions {
    fixed: HashMap<TokenId, f64>,
    concurrent: Option<bool>,
}

impl DumpOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Externally fix tokens to values; fixed tokens get no column and their
    /// contributions fold into right-hand sides and the objective constant.
    pub fn with_fixed(mut self, fixed: HashMap<TokenId, f64>) -> Self {
        self.fixed = fixed;
        self
    }

    /// Override the mechanism model's concurrency opt-in.
    pub fn with_concurrent(mut self, concurrent: bool) -> Self {
        self.concurrent = Some(concurrent);
        self
    }
}

/// What a dump run did, for logging and diagnostics.
#[derive(Debug, Clone, Serialize)]
pub struct DumpStats {
    pub rows: usize,
    pub columns: usize,
    /// Mechanism constraints absorbed into bounds or dropped as fully fixed.
    pub dropped_rows: usize,
    pub concurrent: bool,
    pub elapsed_ms: u128,
}

fn should_run_concurrently(requested: bool, rows: usize) -> bool {
    cfg!(feature = "parallel")
        && requested
        && *AVAILABLE_CORES > 2
        && rows >= PARALLEL_ROW_FACTOR * *AVAILABLE_CORES
}

/// Row segment size: a power of ten derived from the rows-per-worker ratio,
/// floored at [`MIN_SEGMENT`].
fn segment_size(rows: usize, workers: usize) -> usize {
    let ratio = (rows / workers.max(1)).max(1) as f64;
    let factor = ratio.log10().floor() as u32;
    if factor >= 1 {
        10usize.pow(factor).max(MIN_SEGMENT)
    } else {
        MIN_SEGMENT
    }
}

fn lower_rows_sequential<C, F>(retained: &[usize], lower: F) -> MptResult<Vec<LoweredRow<C>>>
where
    F: Fn(usize, usize, &ArenaContext) -> MptResult<LoweredRow<C>>,
{
    let mut ctx = ArenaContext::new();
    let mut rows = Vec::with_capacity(retained.len());
    for (row, &mech_index) in retained.iter().enumerate() {
        let lowered = lower(mech_index, row, &ctx)?;
        ctx.reset();
        rows.push(lowered);
    }
    Ok(rows)
}

/// Segmented fork-join over the retained rows.
///
/// Each worker owns a disjoint, index-contiguous segment and computes its
/// rows' absolute indices from the segment base, so concatenating the
/// segment outputs in order reproduces the enumeration order exactly.
#[cfg(feature = "parallel")]
fn lower_rows_parallel<C, F>(retained: &[usize], lower: F) -> MptResult<Vec<LoweredRow<C>>>
where
    C: Send,
    F: Fn(usize, usize, &ArenaContext) -> MptResult<LoweredRow<C>> + Sync,
{
    let segment = segment_size(retained.len(), AVAILABLE_CORES.saturating_sub(1));
    let segments: Vec<MptResult<Vec<LoweredRow<C>>>> = retained
        .par_chunks(segment)
        .enumerate()
        .map_init(ArenaContext::new, |ctx, (chunk_index, chunk)| {
            let base = chunk_index * segment;
            let mut rows = Vec::with_capacity(chunk.len());
            for (offset, &mech_index) in chunk.iter().enumerate() {
                rows.push(lower(mech_index, base + offset, ctx)?);
            }
            ctx.reset();
            Ok(rows)
        })
        .collect();

    let mut rows = Vec::with_capacity(retained.len());
    for segment_rows in segments {
        rows.extend(segment_rows?);
    }
    Ok(rows)
}

fn assemble<C: RowCell>(rows: Vec<LoweredRow<C>>) -> Constraint<C> {
    let mut constraints = Constraint::with_capacity(rows.len());
    for row in rows {
        constraints.push_row(row.cells, row.sign, row.rhs, row.name, ConstraintSource::Origin);
    }
    constraints
}

fn build_index_map(model: &MechanismModel, fixed: &HashMap<TokenId, f64>) -> TokenIndexMap {
    if fixed.is_empty() {
        TokenIndexMap::new(&model.tokens, None)
    } else {
        let exclude: HashSet<TokenId> = fixed.keys().copied().collect();
        TokenIndexMap::new(&model.tokens, Some(&exclude))
    }
}

/// Lower a mechanism model into a canonical linear model.
pub fn dump_linear(model: &MechanismModel, options: &DumpOptions) -> MptResult<LinearTriadModel> {
    dump_linear_with_stats(model, options).map(|(model, _)| model)
}

/// Lower a mechanism model into a canonical linear model, reporting what
/// the scheduler did.
pub fn dump_linear_with_stats(
    model: &MechanismModel,
    options: &DumpOptions,
) -> MptResult<(LinearTriadModel, DumpStats)> {
    let started = Instant::now();
    let map = Arc::new(build_index_map(model, &options.fixed));
    let retained = retained_rows(model, &map);
    let concurrent =
        should_run_concurrently(options.concurrent.unwrap_or(model.concurrent), retained.len());
    debug!(
        model = %model.name,
        rows = retained.len(),
        columns = map.len(),
        concurrent,
        "lowering mechanism model"
    );

    let lower_row = |mech_index: usize, row: usize, ctx: &ArenaContext| {
        lower_linear_row(
            &model.constraints[mech_index],
            row,
            &model.tokens,
            &map,
            &options.fixed,
            ctx,
        )
    };

    #[cfg(feature = "parallel")]
    let (variables, rows, objective) = if concurrent {
        let (variables, (rows, objective)) = rayon::join(
            || lower_variables(model, &map),
            || {
                rayon::join(
                    || lower_rows_parallel(&retained, lower_row),
                    || lower_linear_objective(model, &map, &options.fixed),
                )
            },
        );
        (variables, rows?, objective?)
    } else {
        (
            lower_variables(model, &map),
            lower_rows_sequential(&retained, lower_row)?,
            lower_linear_objective(model, &map, &options.fixed)?,
        )
    };
    #[cfg(not(feature = "parallel"))]
    let (variables, rows, objective) = (
        lower_variables(model, &map),
        lower_rows_sequential(&retained, lower_row)?,
        lower_linear_objective(model, &map, &options.fixed)?,
    );

    let stats = DumpStats {
        rows: rows.len(),
        columns: map.len(),
        dropped_rows: model.constraints.len() - rows.len(),
        concurrent,
        elapsed_ms: started.elapsed().as_millis(),
    };
    let triad = LinearTriadModel {
        name: model.name.clone(),
        variables,
        constraints: assemble(rows),
        objective,
        index_map: map,
    };
    info!(
        model = %triad.name,
        rows = stats.rows,
        columns = stats.columns,
        dropped = stats.dropped_rows,
        elapsed_ms = stats.elapsed_ms,
        "mechanism model lowered"
    );
    Ok((triad, stats))
}

/// Lower a mechanism model into a canonical quadratic model.
pub fn dump_quadratic(
    model: &MechanismModel,
    options: &DumpOptions,
) -> MptResult<QuadraticTetradModel> {
    dump_quadratic_with_stats(model, options).map(|(model, _)| model)
}

/// Lower a mechanism model into a canonical quadratic model, reporting what
/// the scheduler did.
pub fn dump_quadratic_with_stats(
    model: &MechanismModel,
    options: &DumpOptions,
) -> MptResult<(QuadraticTetradModel, DumpStats)> {
    let started = Instant::now();
    let map = Arc::new(build_index_map(model, &options.fixed));
    let retained = retained_rows(model, &map);
    let concurrent =
        should_run_concurrently(options.concurrent.unwrap_or(model.concurrent), retained.len());
    debug!(
        model = %model.name,
        rows = retained.len(),
        columns = map.len(),
        concurrent,
        "lowering mechanism model"
    );

    let lower_row = |mech_index: usize, row: usize, ctx: &ArenaContext| {
        lower_quadratic_row(
            &model.constraints[mech_index],
            row,
            &model.tokens,
            &map,
            &options.fixed,
            ctx,
        )
    };

    #[cfg(feature = "parallel")]
    let (variables, rows, objective) = if concurrent {
        let (variables, (rows, objective)) = rayon::join(
            || lower_variables(model, &map),
            || {
                rayon::join(
                    || lower_rows_parallel(&retained, lower_row),
                    || lower_quadratic_objective(model, &map, &options.fixed),
                )
            },
        );
        (variables, rows?, objective?)
    } else {
        (
            lower_variables(model, &map),
            lower_rows_sequential(&retained, lower_row)?,
            lower_quadratic_objective(model, &map, &options.fixed)?,
        )
    };
    #[cfg(not(feature = "parallel"))]
    let (variables, rows, objective) = (
        lower_variables(model, &map),
        lower_rows_sequential(&retained, lower_row)?,
        lower_quadratic_objective(model, &map, &options.fixed)?,
    );

    let stats = DumpStats {
        rows: rows.len(),
        columns: map.len(),
        dropped_rows: model.constraints.len() - rows.len(),
        concurrent,
        elapsed_ms: started.elapsed().as_millis(),
    };
    let tetrad = QuadraticTetradModel {
        name: model.name.clone(),
        variables,
        constraints: assemble(rows),
        objective,
        index_map: map,
    };
    info!(
        model = %tetrad.name,
        rows = stats.rows,
        columns = stats.columns,
        dropped = stats.dropped_rows,
        elapsed_ms = stats.elapsed_ms,
        "mechanism model lowered"
    );
    Ok((tetrad, stats))
}
