//! Sampling of `y = f(x)` over an evenly spaced range, for graphing.

use std::io::{self, Write};

use log::{debug, info};
use rayon::prelude::*;

use crate::ast::{ASTNode, Context, Evaluator, Parser};
use crate::error::{EvalError, PlotError};

/// Name the sampled value is bound to.
pub const PLOT_VARIABLE: &str = "x";

/// Most samples a single range may produce.
pub const MAX_SAMPLES: usize = 1_000_000;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleRange {
    start: f64,
    end: f64,
    step: f64,
}

impl Default for SampleRange {
    /// `-10` to `10` in steps of `0.1`: 201 samples.
    fn default() -> Self {
        Self {
            start: -10.0,
            end: 10.0,
            step: 0.1,
        }
    }
}

impl SampleRange {
    pub fn new(start: f64, end: f64, step: f64) -> Result<Self, PlotError> {
        if !start.is_finite() || !end.is_finite() || !step.is_finite() {
            return Err(PlotError::InvalidRange(format!(
                "bounds and step must be finite (got {} to {} step {})",
                start, end, step
            )));
        }
        if step <= 0.0 {
            return Err(PlotError::InvalidRange(format!(
                "step must be positive (got {})",
                step
            )));
        }
        if start > end {
            return Err(PlotError::InvalidRange(format!(
                "start {} is past end {}",
                start, end
            )));
        }
        let steps = whole_steps(start, end, step);
        if !steps.is_finite() || steps >= MAX_SAMPLES as f64 {
            return Err(PlotError::InvalidRange(format!(
                "{} to {} step {} exceeds {} samples",
                start, end, step, MAX_SAMPLES
            )));
        }
        Ok(Self { start, end, step })
    }

    pub fn start(&self) -> f64 {
        self.start
    }

    pub fn end(&self) -> f64 {
        self.end
    }

    pub fn step(&self) -> f64 {
        self.step
    }

    /// Number of samples, both ends included when `end` falls on a step.
    pub fn len(&self) -> usize {
        whole_steps(self.start, self.end, self.step) as usize + 1
    }

    /// A valid range always holds at least its start.
    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn points(&self) -> Vec<f64> {
        (0..self.len())
            .map(|i| self.start + i as f64 * self.step)
            .collect()
    }
}

fn whole_steps(start: f64, end: f64, step: f64) -> f64 {
    // Absorb rounding so that e.g. 20 / 0.1 counts 200 whole steps.
    ((end - start) / step + 1e-9).floor()
}

/// Sampled `(x, y)` pairs in ascending `x`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Curve {
    points: Vec<(f64, f64)>,
}

impl Curve {
    pub fn points(&self) -> &[(f64, f64)] {
        &self.points
    }

    pub fn xs(&self) -> Vec<f64> {
        self.points.iter().map(|(x, _)| *x).collect()
    }

    pub fn ys(&self) -> Vec<f64> {
        self.points.iter().map(|(_, y)| *y).collect()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Writes an `x,y` header followed by one row per sample.
    pub fn write_csv<W: Write>(&self, mut out: W) -> io::Result<()> {
        writeln!(out, "x,y")?;
        for (x, y) in &self.points {
            writeln!(out, "{},{}", x, y)?;
        }
        out.flush()
    }
}

/// Samples `expression` at every point of `range`, in order. The first
/// failing sample aborts the whole pass.
pub fn sample_curve(expression: &str, range: &SampleRange) -> Result<Curve, PlotError> {
    let ast = Parser::parse_expression(expression)?;
    let evaluator = Evaluator::new();
    let mut context = Context::new();
    let mut points = Vec::with_capacity(range.len());

    for x in range.points() {
        context.insert(PLOT_VARIABLE.to_string(), x);
        let y = evaluator
            .evaluate(&ast, &context)
            .map_err(|source| PlotError::Sample { x, source })?;
        points.push((x, y));
    }

    info!("Graphed expression: {} ({} samples)", expression, points.len());
    Ok(Curve { points })
}

/// Same result as [`sample_curve`], with samples evaluated on the rayon
/// pool. Each sample gets its own context, and a failure is reported for
/// the smallest failing `x`.
pub fn sample_curve_parallel(expression: &str, range: &SampleRange) -> Result<Curve, PlotError> {
    let ast = Parser::parse_expression(expression)?;
    let evaluator = Evaluator::new();

    let results: Vec<(f64, Result<f64, EvalError>)> = range
        .points()
        .into_par_iter()
        .map(|x| (x, evaluate_at(&evaluator, &ast, x)))
        .collect();
    debug!("Evaluated {} samples in parallel", results.len());

    let points = results
        .into_iter()
        .map(|(x, result)| {
            result
                .map(|y| (x, y))
                .map_err(|source| PlotError::Sample { x, source })
        })
        .collect::<Result<Vec<_>, _>>()?;

    info!("Graphed expression: {} ({} samples)", expression, points.len());
    Ok(Curve { points })
}

fn evaluate_at(evaluator: &Evaluator, ast: &ASTNode, x: f64) -> Result<f64, EvalError> {
    let context = Context::from([(PLOT_VARIABLE.to_string(), x)]);
    evaluator.evaluate(ast, &context)
}
