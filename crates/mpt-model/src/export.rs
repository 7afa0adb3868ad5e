//! LP text export for canonical models.
//!
//! A debugging/logging artifact: the format is the familiar LP layout
//! (objective, `Subject To`, `Bounds`, `Binaries`, `Generals`, `End`) and is
//! written for human eyes and external diff tools, not round-tripping.

use std::io::{self, Write};
use std::path::Path;

use anyhow::Context;

use crate::model::tetrad::{QuadraticTetradModel, Term};
use crate::model::triad::LinearTriadModel;
use crate::model::Variable;

/// Write one term's sign and coefficient; the caller follows with the
/// variable name(s). The leading term keeps its raw sign, later terms are
/// joined with ` + `/` - ` and print their magnitude.
fn write_coefficient<W: Write>(writer: &mut W, position: usize, coefficient: f64) -> io::Result<()> {
    if position == 0 {
        if coefficient != 1.0 {
            write!(writer, "{} ", coefficient)?;
        }
    } else {
        if coefficient < 0.0 {
            write!(writer, " - ")?;
        } else {
            write!(writer, " + ")?;
        }
        let magnitude = coefficient.abs();
        if magnitude != 1.0 {
            write!(writer, "{} ", magnitude)?;
        }
    }
    Ok(())
}

fn write_bounds<W: Write>(writer: &mut W, variables: &[Variable]) -> io::Result<()> {
    writeln!(writer, "Bounds")?;
    for variable in variables {
        let lower_inf = variable.lower_bound == f64::NEG_INFINITY;
        let upper_inf = variable.upper_bound == f64::INFINITY;
        if lower_inf && upper_inf {
            writeln!(writer, " {} free", variable.name)?;
        } else if lower_inf {
            writeln!(writer, " {} <= {}", variable.name, variable.upper_bound)?;
        } else if upper_inf {
            writeln!(writer, " {} >= {}", variable.name, variable.lower_bound)?;
        } else if variable.lower_bound == variable.upper_bound {
            writeln!(writer, " {} = {}", variable.name, variable.lower_bound)?;
        } else {
            writeln!(
                writer,
                " {} <= {} <= {}",
                variable.lower_bound, variable.name, variable.upper_bound
            )?;
        }
    }
    writeln!(writer)
}

fn write_integer_sections<W: Write>(writer: &mut W, variables: &[Variable]) -> io::Result<()> {
    if variables.iter().any(|v| v.kind.is_binary()) {
        writeln!(writer, "Binaries")?;
        for variable in variables.iter().filter(|v| v.kind.is_binary()) {
            write!(writer, " {}", variable.name)?;
        }
        writeln!(writer)?;
        writeln!(writer)?;
    }
    if variables.iter().any(|v| v.kind.is_not_binary_integer()) {
        writeln!(writer, "Generals")?;
        for variable in variables.iter().filter(|v| v.kind.is_not_binary_integer()) {
            write!(writer, " {}", variable.name)?;
        }
        writeln!(writer)?;
        writeln!(writer)?;
    }
    Ok(())
}

impl LinearTriadModel {
    /// Write the model in LP text form.
    pub fn export_lp<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writeln!(writer, "{}", self.objective.category)?;
        let mut position = 0;
        for cell in &self.objective.cells {
            if cell.coefficient == 0.0 {
                continue;
            }
            write_coefficient(writer, position, cell.coefficient)?;
            write!(writer, "{}", self.variables[cell.col].name)?;
            position += 1;
        }
        writeln!(writer)?;
        writeln!(writer)?;

        writeln!(writer, "Subject To")?;
        for row in 0..self.num_rows() {
            write!(writer, " {}: ", self.constraints.names()[row])?;
            let mut position = 0;
            for cell in &self.constraints.lhs()[row] {
                if cell.coefficient == 0.0 {
                    continue;
                }
                write_coefficient(writer, position, cell.coefficient)?;
                write!(writer, "{}", self.variables[cell.col].name)?;
                position += 1;
            }
            if position == 0 {
                write!(writer, "0")?;
            }
            writeln!(
                writer,
                " {} {}",
                self.constraints.signs()[row],
                self.constraints.rhs()[row]
            )?;
        }
        writeln!(writer)?;

        write_bounds(writer, &self.variables)?;
        write_integer_sections(writer, &self.variables)?;
        writeln!(writer, "End")?;
        Ok(())
    }

    /// Export to a `.lp` file.
    pub fn export_lp_to_path(&self, path: &Path) -> anyhow::Result<()> {
        let file = std::fs::File::create(path)
            .with_context(|| format!("creating LP file at {}", path.display()))?;
        let mut writer = io::BufWriter::new(file);
        self.export_lp(&mut writer)
            .with_context(|| format!("writing LP text to {}", path.display()))?;
        writer.flush().context("flushing LP writer")?;
        Ok(())
    }
}

impl QuadraticTetradModel {
    fn write_term<W: Write>(&self, writer: &mut W, term: Term) -> io::Result<()> {
        match term {
            Term::Linear(col) => write!(writer, "{}", self.variables[col].name),
            Term::Quadratic(col, col2) => write!(
                writer,
                "{} {}",
                self.variables[col].name, self.variables[col2].name
            ),
        }
    }

    /// Write the model in LP text form; bilinear terms print both names.
    pub fn export_lp<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writeln!(writer, "{}", self.objective.category)?;
        let mut position = 0;
        for cell in &self.objective.cells {
            if cell.coefficient == 0.0 {
                continue;
            }
            write_coefficient(writer, position, cell.coefficient)?;
            self.write_term(writer, cell.term)?;
            position += 1;
        }
        writeln!(writer)?;
        writeln!(writer)?;

        writeln!(writer, "Subject To")?;
        for row in 0..self.num_rows() {
            write!(writer, " {}: ", self.constraints.names()[row])?;
            let mut position = 0;
            for cell in &self.constraints.lhs()[row] {
                if cell.coefficient == 0.0 {
                    continue;
                }
                write_coefficient(writer, position, cell.coefficient)?;
                self.write_term(writer, cell.term)?;
                position += 1;
            }
            if position == 0 {
                write!(writer, "0")?;
            }
            writeln!(
                writer,
                " {} {}",
                self.constraints.signs()[row],
                self.constraints.rhs()[row]
            )?;
        }
        writeln!(writer)?;

        write_bounds(writer, &self.variables)?;
        write_integer_sections(writer, &self.variables)?;
        writeln!(writer, "End")?;
        Ok(())
    }

    /// Export to a `.lp` file.
    pub fn export_lp_to_path(&self, path: &Path) -> anyhow::Result<()> {
        let file = std::fs::File::create(path)
            .with_context(|| format!("creating LP file at {}", path.display()))?;
        let mut writer = io::BufWriter::new(file);
        self.export_lp(&mut writer)
            .with_context(|| format!("writing LP text to {}", path.display()))?;
        writer.flush().context("flushing LP writer")?;
        Ok(())
    }
}
