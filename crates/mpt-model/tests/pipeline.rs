//! End-to-end compilation pipeline tests: mechanism model through lowering,
//! normalization and the derived canonical forms.

use std::collections::HashMap;

use mpt_core::{
    MechCell, MechanismModel, ObjectCategory, Sign, TokenId, VariableKind,
};
use mpt_model::{
    dump_linear, dump_linear_with_stats, dump_quadratic, ConstraintSource, DumpOptions,
    LinearTriadModel, VariableOrigin,
};

/// min 3x + 5y subject to x + y <= 10, x >= 2, with y declared in [0, 6].
fn production_model() -> (MechanismModel, TokenId, TokenId) {
    let mut model = MechanismModel::new("production", ObjectCategory::Minimize);
    let x = model.add_token("x", VariableKind::UContinuous);
    let y = model.add_token_with_bounds("y", VariableKind::UContinuous, 0.0, 6.0);
    model.add_constraint(
        vec![MechCell::linear(x, 1.0), MechCell::linear(y, 1.0)],
        Sign::LessEqual,
        10.0,
        "capacity",
    );
    model.add_constraint(vec![MechCell::linear(x, 1.0)], Sign::GreaterEqual, 2.0, "floor");
    model.add_sub_object(
        ObjectCategory::Minimize,
        vec![MechCell::linear(x, 3.0), MechCell::linear(y, 5.0)],
        0.0,
        "cost",
    );
    (model, x, y)
}

fn row_activity(model: &LinearTriadModel, row: usize, point: &[f64]) -> f64 {
    model.constraints.lhs()[row]
        .iter()
        .map(|cell| cell.coefficient * point[cell.col])
        .sum()
}

fn row_holds(model: &LinearTriadModel, row: usize, point: &[f64]) -> bool {
    let activity = row_activity(model, row, point);
    let rhs = model.constraints.rhs()[row];
    match model.constraints.signs()[row] {
        Sign::LessEqual => activity <= rhs + 1e-9,
        Sign::GreaterEqual => activity >= rhs - 1e-9,
        Sign::Equal => (activity - rhs).abs() <= 1e-9,
    }
}

fn objective_value(model: &LinearTriadModel, point: &[f64]) -> f64 {
    model
        .objective
        .cells
        .iter()
        .map(|cell| cell.coefficient * point[cell.col])
        .sum::<f64>()
        + model.objective.constant
}

#[test]
fn pure_bound_becomes_variable_bound_not_row() {
    let (model, _, _) = production_model();
    let triad = dump_linear(&model, &DumpOptions::new()).unwrap();

    // The x >= 2 constraint is absorbed: one row remains.
    assert_eq!(triad.num_rows(), 1);
    assert_eq!(triad.constraints.names()[0], "capacity");
    assert_eq!(triad.variables[0].lower_bound, 2.0);
    assert_eq!(triad.variables[1].upper_bound, 6.0);
    assert_eq!(triad.constraints.sources()[0], ConstraintSource::Origin);
}

#[test]
fn fixing_a_token_folds_it_out_of_the_model() {
    let (model, x, y) = production_model();
    let fixed: HashMap<TokenId, f64> = [(x, 3.0)].into_iter().collect();
    let triad = dump_linear(&model, &DumpOptions::new().with_fixed(fixed)).unwrap();

    // x is gone: y takes column 0, and x + y <= 10 became y <= 7.
    assert_eq!(triad.num_cols(), 1);
    assert_eq!(triad.variables[0].name, "y");
    assert_eq!(triad.variables[0].origin, VariableOrigin::Token(y));
    assert_eq!(triad.num_rows(), 1);
    assert_eq!(triad.constraints.rhs()[0], 7.0);
    assert_eq!(triad.constraints.lhs()[0].len(), 1);
    assert_eq!(triad.constraints.lhs()[0][0].col, 0);

    // The pure bound on x was dropped along with its token.
    // The objective folded 3 * 3 into its constant.
    assert_eq!(triad.objective.constant, 9.0);
    assert_eq!(triad.objective.cells.len(), 1);
    assert_eq!(triad.objective.cells[0].coefficient, 5.0);
}

#[test]
fn lowering_is_deterministic_across_runs() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let (model, _, _) = production_model();
    let first = dump_linear(&model, &DumpOptions::new()).unwrap();
    let second = dump_linear(&model, &DumpOptions::new()).unwrap();
    assert_eq!(first, second);
}

#[test]
fn normalize_example_from_two_sided_bound() {
    let mut model = MechanismModel::new("two_sided", ObjectCategory::Minimize);
    model.add_token_with_bounds("v", VariableKind::Continuous, -5.0, 8.0);
    let mut triad = dump_linear(&model, &DumpOptions::new()).unwrap();

    triad.normalize();

    assert_eq!(triad.num_rows(), 2);
    assert_eq!(triad.constraints.names(), &["v_lb".to_string(), "v_ub".to_string()]);
    assert_eq!(triad.constraints.signs(), &[Sign::GreaterEqual, Sign::LessEqual]);
    assert_eq!(triad.constraints.rhs(), &[-5.0, 8.0]);
    assert!(triad
        .constraints
        .sources()
        .iter()
        .all(|&s| s == ConstraintSource::NormalizationBound));
    assert!(triad.variables[0].free());
    assert!(triad.is_normalized());
}

#[test]
fn solution_scatters_back_onto_tokens() {
    let (mut model, x, y) = production_model();
    let triad = dump_linear(&model, &DumpOptions::new()).unwrap();

    model.tokens.set_solution(&triad.index_map, &[2.0, 6.0]).unwrap();
    assert_eq!(model.tokens.token(x).result, Some(2.0));
    assert_eq!(model.tokens.token(y).result, Some(6.0));

    // A re-dump carries the results through as warm-start values.
    let warm = dump_linear(&model, &DumpOptions::new()).unwrap();
    assert_eq!(warm.variables[0].initial, Some(2.0));
    assert_eq!(warm.variables[1].initial, Some(6.0));
}

#[test]
fn dual_value_matches_primal_at_known_optimum() {
    // max 3x + 2y subject to x + y <= 4, x + 3y <= 6, x, y >= 0.
    // Optimum x* = 4, y* = 0 with value 12; dual y1* = 3, y2* = 0.
    let mut model = MechanismModel::new("lp", ObjectCategory::Maximize);
    let x = model.add_token("x", VariableKind::UContinuous);
    let y = model.add_token("y", VariableKind::UContinuous);
    model.add_constraint(
        vec![MechCell::linear(x, 1.0), MechCell::linear(y, 1.0)],
        Sign::LessEqual,
        4.0,
        "r1",
    );
    model.add_constraint(
        vec![MechCell::linear(x, 1.0), MechCell::linear(y, 3.0)],
        Sign::LessEqual,
        6.0,
        "r2",
    );
    model.add_sub_object(
        ObjectCategory::Maximize,
        vec![MechCell::linear(x, 3.0), MechCell::linear(y, 2.0)],
        0.0,
        "profit",
    );

    let mut triad = dump_linear(&model, &DumpOptions::new()).unwrap();
    triad.normalize();
    let dual = triad.dual();

    let primal_point = [4.0, 0.0];
    let dual_point = [3.0, 0.0];
    for row in 0..triad.num_rows() {
        assert!(row_holds(&triad, row, &primal_point));
    }
    for row in 0..dual.num_rows() {
        assert!(row_holds(&dual, row, &dual_point));
    }
    // Dual feasibility also needs the variable sign restrictions.
    for (variable, &value) in dual.variables.iter().zip(dual_point.iter()) {
        assert!(value >= variable.lower_bound - 1e-9);
        assert!(value <= variable.upper_bound + 1e-9);
    }

    let primal_value = objective_value(&triad, &primal_point);
    let dual_value = objective_value(&dual, &dual_point);
    assert!((primal_value - 12.0).abs() < 1e-9);
    assert!((primal_value - dual_value).abs() < 1e-9);
    assert_eq!(dual.objective.category, ObjectCategory::Minimize);
}

#[test]
fn farkas_system_admits_certificate_for_infeasible_model() {
    // x <= 1 together with x >= 2 is infeasible.
    let mut model = MechanismModel::new("clash", ObjectCategory::Minimize);
    let x = model.add_token("x", VariableKind::UContinuous);
    let y = model.add_token("y", VariableKind::UContinuous);
    model.add_constraint(
        vec![MechCell::linear(x, 1.0), MechCell::linear(y, 1.0)],
        Sign::LessEqual,
        1.0,
        "cap",
    );
    model.add_constraint(
        vec![MechCell::linear(x, 1.0), MechCell::linear(y, 1.0)],
        Sign::GreaterEqual,
        2.0,
        "demand",
    );
    model.add_sub_object(
        ObjectCategory::Minimize,
        vec![MechCell::linear(x, 1.0)],
        0.0,
        "cost",
    );

    let mut triad = dump_linear(&model, &DumpOptions::new()).unwrap();
    triad.normalize();
    let farkas = triad.farkas_dual();

    // y = (1, -1): cap priced against demand.
    let certificate = [1.0, -1.0];
    for row in 0..farkas.num_rows() {
        assert!(row_holds(&farkas, row, &certificate));
    }
    for (variable, &value) in farkas.variables.iter().zip(certificate.iter()) {
        assert!(value >= variable.lower_bound - 1e-9);
        assert!(value <= variable.upper_bound + 1e-9);
    }

    // Provenance lets the caller price the conflict per primal row.
    assert_eq!(farkas.variables[0].origin, VariableOrigin::DualOf { row: 0 });
    assert_eq!(farkas.variables[1].origin, VariableOrigin::DualOf { row: 1 });
}

#[test]
fn feasibility_optimum_is_zero_iff_feasible() {
    let (model, _, _) = production_model();
    let mut triad = dump_linear(&model, &DumpOptions::new()).unwrap();
    triad.normalize();
    let phase1 = triad.feasibility();

    // Normalization turned the tightened bounds into rows, so phase-1 sees
    // every original restriction. The feasible point x=2, y=0 extends with
    // slacks to satisfy every equality at zero artificial cost.
    let mut point = vec![0.0; phase1.num_cols()];
    point[0] = 2.0; // x
    point[1] = 0.0; // y
    for row in 0..phase1.num_rows() {
        let name = &phase1.constraints.names()[row];
        let slack_col = phase1
            .variables
            .iter()
            .find(|v| v.name == format!("{name}_slack"))
            .map(|v| v.index);
        if let Some(col) = slack_col {
            // Solve the equality row for its slack.
            let fixed_activity: f64 = phase1.constraints.lhs()[row]
                .iter()
                .filter(|cell| cell.col != col)
                .map(|cell| cell.coefficient * point[cell.col])
                .sum();
            let coefficient = phase1.constraints.lhs()[row]
                .iter()
                .find(|cell| cell.col == col)
                .unwrap()
                .coefficient;
            point[col] = (phase1.constraints.rhs()[row] - fixed_activity) / coefficient;
            assert!(point[col] >= -1e-9, "slack for {name} must stay non-negative");
        }
    }
    for row in 0..phase1.num_rows() {
        assert!(row_holds(&phase1, row, &point));
    }
    assert_eq!(objective_value(&phase1, &point), 0.0);
}

#[test]
fn quadratic_pipeline_round_trip() {
    let mut model = MechanismModel::new("quad", ObjectCategory::Minimize);
    let x = model.add_token("x", VariableKind::UContinuous);
    let y = model.add_token("y", VariableKind::UContinuous);
    model.add_constraint(
        vec![MechCell::quadratic(x, x, 1.0), MechCell::linear(y, 1.0)],
        Sign::LessEqual,
        9.0,
        "ball",
    );
    model.add_sub_object(
        ObjectCategory::Minimize,
        vec![MechCell::quadratic(x, y, 1.0), MechCell::linear(x, 2.0)],
        0.0,
        "energy",
    );

    let tetrad = dump_quadratic(&model, &DumpOptions::new()).unwrap();
    assert!(tetrad.contains_quadratic_cell());
    assert!(tetrad.dual().is_err());
    assert!(tetrad.farkas_dual().is_err());

    let phase1 = tetrad.feasibility();
    assert_eq!(phase1.num_cols(), 3);
    assert!(phase1.contains_quadratic_cell());
}

#[test]
fn linear_dump_rejects_bilinear_cells() {
    let mut model = MechanismModel::new("quad", ObjectCategory::Minimize);
    let x = model.add_token("x", VariableKind::UContinuous);
    model.add_constraint(
        vec![MechCell::quadratic(x, x, 1.0)],
        Sign::LessEqual,
        4.0,
        "square",
    );
    assert!(dump_linear(&model, &DumpOptions::new()).is_err());
}

#[test]
fn empty_model_lowers_to_empty_triad() {
    let model = MechanismModel::new("empty", ObjectCategory::Minimize);
    let (triad, stats) = dump_linear_with_stats(&model, &DumpOptions::new()).unwrap();
    assert_eq!(triad.num_rows(), 0);
    assert_eq!(triad.num_cols(), 0);
    assert_eq!(stats.rows, 0);
    assert_eq!(stats.columns, 0);
    assert!(triad.is_normalized());
}
