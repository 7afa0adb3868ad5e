//! Lowering passes: mechanism model to canonical matrix form.
//!
//! Three independent passes share the token index map: variable lowering
//! (bound tightening from pure single-token constraints), constraint
//! lowering (column re-indexing, fixed-token folding, coefficient clipping)
//! and objective aggregation. Each is a pure function of the mechanism
//! model, which is what makes the dump scheduler's fork-join safe.

pub mod dump;

use std::collections::HashMap;

use mpt_core::{
    MechConstraint, MechObjective, MechanismModel, MptError, MptResult, ObjectCategory, Sign,
    TokenId, TokenIndexMap, TokenList,
};

use crate::arena::ArenaContext;
use crate::model::tetrad::{QuadraticCell, QuadraticObjective, QuadraticTerm, Term};
use crate::model::triad::{LinearCell, LinearObjective, LinearTerm};
use crate::model::{Variable, VariableOrigin};
use crate::numeric::clip;

/// One lowered constraint row before assembly into the parallel arrays.
#[derive(Debug)]
pub(crate) struct LoweredRow<C> {
    pub(crate) cells: Vec<C>,
    pub(crate) sign: Sign,
    pub(crate) rhs: f64,
    pub(crate) name: String,
}

/// Candidate lower bound from a pure row `sum * x >= rhs` (or `=`).
fn lower_candidate(rhs: f64, sum: f64) -> f64 {
    if sum == 0.0 {
        // 0 >= rhs: binding only when rhs is positive (then unsatisfiable,
        // pinned at +inf and surfaced by the solve).
        if rhs > 0.0 {
            f64::INFINITY
        } else {
            f64::NEG_INFINITY
        }
    } else {
        rhs / sum
    }
}

/// Candidate upper bound from a pure row `sum * x <= rhs` (or `=`).
fn upper_candidate(rhs: f64, sum: f64) -> f64 {
    if sum == 0.0 {
        if rhs < 0.0 {
            f64::NEG_INFINITY
        } else {
            f64::INFINITY
        }
    } else {
        rhs / sum
    }
}

/// Emit one canonical variable per indexed token, with bounds tightened by
/// every pure single-token constraint that mentions it.
pub(crate) fn lower_variables(model: &MechanismModel, map: &TokenIndexMap) -> Vec<Variable> {
    let mut tightened: HashMap<TokenId, (f64, f64)> = HashMap::new();
    for constraint in &model.constraints {
        let Some(token) = constraint.pure_token() else {
            continue;
        };
        if map.col_of(token).is_none() {
            continue;
        }
        let sum: f64 = constraint.cells.iter().map(|c| c.coefficient).sum();
        let entry = tightened
            .entry(token)
            .or_insert((f64::NEG_INFINITY, f64::INFINITY));
        match constraint.sign {
            Sign::GreaterEqual => entry.0 = entry.0.max(lower_candidate(constraint.rhs, sum)),
            Sign::LessEqual => entry.1 = entry.1.min(upper_candidate(constraint.rhs, sum)),
            Sign::Equal => {
                entry.0 = entry.0.max(lower_candidate(constraint.rhs, sum));
                entry.1 = entry.1.min(upper_candidate(constraint.rhs, sum));
            }
        }
    }

    map.iter()
        .map(|(id, col)| {
            let token = model.tokens.token(id);
            let (candidate_lower, candidate_upper) = tightened
                .get(&id)
                .copied()
                .unwrap_or((f64::NEG_INFINITY, f64::INFINITY));
            Variable {
                index: col,
                lower_bound: token.lower_bound.max(candidate_lower),
                upper_bound: token.upper_bound.min(candidate_upper),
                kind: token.kind,
                name: token.name.clone(),
                initial: token.result,
                origin: VariableOrigin::Token(id),
            }
        })
        .collect()
}

/// Mechanism constraints that survive lowering as rows, in enumeration
/// order.
///
/// A constraint is dropped when it is empty, when it is a pure single-token
/// bound (absorbed by variable lowering), or when none of its cells touch an
/// indexed token (every token externally fixed; its effect lives entirely in
/// its own folded right-hand side, which goes with it).
pub(crate) fn retained_rows(model: &MechanismModel, map: &TokenIndexMap) -> Vec<usize> {
    model
        .constraints
        .iter()
        .enumerate()
        .filter(|(_, constraint)| {
            !constraint.is_empty()
                && constraint.pure_token().is_none()
                && constraint.cells.iter().any(|cell| {
                    map.col_of(cell.token).is_some()
                        || cell.partner.is_some_and(|p| map.col_of(p).is_some())
                })
        })
        .map(|(index, _)| index)
        .collect()
}

fn unknown_token_error(constraint_name: &str, tokens: &TokenList, id: TokenId) -> MptError {
    let name = tokens
        .get(id)
        .map(|t| t.name.clone())
        .unwrap_or_else(|| format!("#{}", id.value()));
    MptError::Validation(format!(
        "constraint '{constraint_name}' references token '{name}' that is neither indexed nor fixed"
    ))
}

/// Lower one retained constraint into a linear row at `row`.
pub(crate) fn lower_linear_row(
    constraint: &MechConstraint,
    row: usize,
    tokens: &TokenList,
    map: &TokenIndexMap,
    fixed: &HashMap<TokenId, f64>,
    ctx: &ArenaContext,
) -> MptResult<LoweredRow<LinearCell>> {
    let mut staged = ctx.scratch_vec::<LinearCell>();
    let mut rhs = constraint.rhs;
    for cell in &constraint.cells {
        if cell.partner.is_some() {
            return Err(MptError::Validation(format!(
                "constraint '{}' carries a bilinear term; lower it as a quadratic model",
                constraint.name
            )));
        }
        if let Some(col) = map.col_of(cell.token) {
            staged.push(LinearCell {
                row,
                col,
                coefficient: clip(cell.coefficient),
            });
        } else if let Some(&value) = fixed.get(&cell.token) {
            rhs -= cell.coefficient * value;
        } else {
            return Err(unknown_token_error(&constraint.name, tokens, cell.token));
        }
    }
    Ok(LoweredRow {
        cells: staged.iter().copied().collect(),
        sign: constraint.sign,
        rhs: clip(rhs),
        name: constraint.name.clone(),
    })
}

/// Lower one retained constraint into a quadratic row at `row`.
///
/// Bilinear cells with one fixed token degrade to linear cells on the
/// survivor; with both tokens fixed they fold into the right-hand side.
pub(crate) fn lower_quadratic_row(
    constraint: &MechConstraint,
    row: usize,
    tokens: &TokenList,
    map: &TokenIndexMap,
    fixed: &HashMap<TokenId, f64>,
    ctx: &ArenaContext,
) -> MptResult<LoweredRow<QuadraticCell>> {
    let mut staged = ctx.scratch_vec::<QuadraticCell>();
    let mut rhs = constraint.rhs;
    for cell in &constraint.cells {
        match cell.partner {
            None => {
                if let Some(col) = map.col_of(cell.token) {
                    staged.push(QuadraticCell {
                        row,
                        term: Term::Linear(col),
                        coefficient: clip(cell.coefficient),
                    });
                } else if let Some(&value) = fixed.get(&cell.token) {
                    rhs -= cell.coefficient * value;
                } else {
                    return Err(unknown_token_error(&constraint.name, tokens, cell.token));
                }
            }
            Some(partner) => match (map.col_of(cell.token), map.col_of(partner)) {
                (Some(col), Some(col2)) => {
                    staged.push(QuadraticCell {
                        row,
                        term: Term::Quadratic(col, col2),
                        coefficient: clip(cell.coefficient),
                    });
                }
                (Some(col), None) => {
                    let Some(&value) = fixed.get(&partner) else {
                        return Err(unknown_token_error(&constraint.name, tokens, partner));
                    };
                    staged.push(QuadraticCell {
                        row,
                        term: Term::Linear(col),
                        coefficient: clip(cell.coefficient * value),
                    });
                }
                (None, Some(col2)) => {
                    let Some(&value) = fixed.get(&cell.token) else {
                        return Err(unknown_token_error(&constraint.name, tokens, cell.token));
                    };
                    staged.push(QuadraticCell {
                        row,
                        term: Term::Linear(col2),
                        coefficient: clip(cell.coefficient * value),
                    });
                }
                (None, None) => {
                    let Some(&first) = fixed.get(&cell.token) else {
                        return Err(unknown_token_error(&constraint.name, tokens, cell.token));
                    };
                    let Some(&second) = fixed.get(&partner) else {
                        return Err(unknown_token_error(&constraint.name, tokens, partner));
                    };
                    rhs -= cell.coefficient * first * second;
                }
            },
        }
    }
    Ok(LoweredRow {
        cells: staged.iter().copied().collect(),
        sign: constraint.sign,
        rhs: clip(rhs),
        name: constraint.name.clone(),
    })
}

/// The category the aggregated objective optimizes.
///
/// A lone sub-objective speaks for the model; otherwise the model's overall
/// category wins and disagreeing sub-objectives contribute negated.
fn effective_category(objective: &MechObjective) -> ObjectCategory {
    match objective.sub_objects.as_slice() {
        [only] => only.category,
        _ => objective.category,
    }
}

/// Aggregate all sub-objectives into one dense linear objective.
pub(crate) fn lower_linear_objective(
    model: &MechanismModel,
    map: &TokenIndexMap,
    fixed: &HashMap<TokenId, f64>,
) -> MptResult<LinearObjective> {
    let effective = effective_category(&model.objective);
    let mut coefficients = vec![0.0; map.len()];
    let mut constant = 0.0;

    for sub in &model.objective.sub_objects {
        let sign = if sub.category == effective { 1.0 } else { -1.0 };
        for cell in &sub.cells {
            if cell.partner.is_some() {
                return Err(MptError::Validation(format!(
                    "sub-objective '{}' carries a bilinear term; lower it as a quadratic model",
                    sub.name
                )));
            }
            if let Some(col) = map.col_of(cell.token) {
                coefficients[col] += sign * cell.coefficient;
            } else if let Some(&value) = fixed.get(&cell.token) {
                constant += sign * cell.coefficient * value;
            } else {
                return Err(unknown_token_error(&sub.name, &model.tokens, cell.token));
            }
        }
        constant += sign * sub.constant;
    }

    Ok(LinearObjective {
        category: effective,
        cells: coefficients
            .into_iter()
            .enumerate()
            .map(|(col, coefficient)| LinearTerm {
                col,
                coefficient: clip(coefficient),
            })
            .collect(),
        constant: clip(constant),
    })
}

/// Aggregate all sub-objectives into one quadratic objective: a dense
/// linear part followed by the aggregated bilinear terms in column order.
pub(crate) fn lower_quadratic_objective(
    model: &MechanismModel,
    map: &TokenIndexMap,
    fixed: &HashMap<TokenId, f64>,
) -> MptResult<QuadraticObjective> {
    let effective = effective_category(&model.objective);
    let mut coefficients = vec![0.0; map.len()];
    let mut bilinear: hashbrown::HashMap<(usize, usize), f64> = hashbrown::HashMap::new();
    let mut constant = 0.0;

    for sub in &model.objective.sub_objects {
        let sign = if sub.category == effective { 1.0 } else { -1.0 };
        for cell in &sub.cells {
            match cell.partner {
                None => {
                    if let Some(col) = map.col_of(cell.token) {
                        coefficients[col] += sign * cell.coefficient;
                    } else if let Some(&value) = fixed.get(&cell.token) {
                        constant += sign * cell.coefficient * value;
                    } else {
                        return Err(unknown_token_error(&sub.name, &model.tokens, cell.token));
                    }
                }
                Some(partner) => match (map.col_of(cell.token), map.col_of(partner)) {
                    (Some(col), Some(col2)) => {
                        let key = (col.min(col2), col.max(col2));
                        *bilinear.entry(key).or_insert(0.0) += sign * cell.coefficient;
                    }
                    (Some(col), None) => {
                        let Some(&value) = fixed.get(&partner) else {
                            return Err(unknown_token_error(&sub.name, &model.tokens, partner));
                        };
                        coefficients[col] += sign * cell.coefficient * value;
                    }
                    (None, Some(col2)) => {
                        let Some(&value) = fixed.get(&cell.token) else {
                            return Err(unknown_token_error(&sub.name, &model.tokens, cell.token));
                        };
                        coefficients[col2] += sign * cell.coefficient * value;
                    }
                    (None, None) => {
                        let Some(&first) = fixed.get(&cell.token) else {
                            return Err(unknown_token_error(&sub.name, &model.tokens, cell.token));
                        };
                        let Some(&second) = fixed.get(&partner) else {
                            return Err(unknown_token_error(&sub.name, &model.tokens, partner));
                        };
                        constant += sign * cell.coefficient * first * second;
                    }
                },
            }
        }
        constant += sign * sub.constant;
    }

    let mut cells: Vec<QuadraticTerm> = coefficients
        .into_iter()
        .enumerate()
        .map(|(col, coefficient)| QuadraticTerm {
            term: Term::Linear(col),
            coefficient: clip(coefficient),
        })
        .collect();
    let mut pairs: Vec<((usize, usize), f64)> = bilinear.into_iter().collect();
    pairs.sort_by_key(|&(key, _)| key);
    cells.extend(pairs.into_iter().map(|((col, col2), coefficient)| {
        QuadraticTerm {
            term: Term::Quadratic(col, col2),
            coefficient: clip(coefficient),
        }
    }));

    Ok(QuadraticObjective {
        category: effective,
        cells,
        constant: clip(constant),
    })
}
