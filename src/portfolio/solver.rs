//! Sequential quadratic programming over the capped simplex
//!
//! Minimizes a smooth objective subject to
//! `Σ x = 1`, `0 ≤ x ≤ 1` and one linear inequality `a·x ≤ b`.
//!
//! Each iteration solves the QP subproblem
//! `min gᵀd + ½ μ‖d‖²` over the linearized feasible set. With a scaled
//! identity Hessian the subproblem is a Euclidean projection onto the simplex
//! intersected with the half-space, solved exactly by bisection on the
//! half-space multiplier. The step is then accepted by backtracking on an
//! L1 merit function. `μ` follows a Barzilai-Borwein curvature estimate and
//! stays at 1 for linear objectives.
//!
//! Once a step lands on a face of the feasible set, the iterate is pushed
//! along the reduced gradient of that face up to its next bound. For a linear
//! objective this walks vertex to vertex, so the stopping test is met within a
//! few iterations instead of after a slow projected-gradient approach.

use thiserror::Error;

const MU_MIN: f64 = 1e-8;
const MU_MAX: f64 = 1e8;
const ARMIJO: f64 = 1e-4;
const MAX_BACKTRACKS: usize = 30;
const BISECTION_STEPS: usize = 200;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SolverError {
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Empty problem")]
    Empty,

    #[error("Non-finite {0}")]
    NonFinite(&'static str),
}

/// Smooth function to minimize
pub trait Objective {
    fn value(&self, x: &[f64]) -> f64;
    fn gradient(&self, x: &[f64]) -> Vec<f64>;
}

/// `coefficients · x ≤ bound`
#[derive(Debug, Clone)]
pub struct LinearInequality {
    pub coefficients: Vec<f64>,
    pub bound: f64,
}

impl LinearInequality {
    pub fn evaluate(&self, x: &[f64]) -> f64 {
        dot(&self.coefficients, x)
    }

    pub fn violation(&self, x: &[f64]) -> f64 {
        (self.evaluate(x) - self.bound).max(0.0)
    }

    /// Smallest value of `a·x` reachable on the simplex
    fn min_on_simplex(&self) -> f64 {
        self.coefficients.iter().copied().fold(f64::INFINITY, f64::min)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum SolverStatus {
    /// Step and constraint violation below tolerance
    Converged,
    /// Iteration budget exhausted; best iterate returned
    IterationLimit,
    /// The inequality cannot be met on the simplex; least-violating iterate returned
    Infeasible,
    /// Line search could not reduce the merit function
    LineSearchFailed,
}

#[derive(Debug, Clone)]
pub struct SqpOutcome {
    pub x: Vec<f64>,
    pub status: SolverStatus,
    pub iterations: usize,
    pub objective: f64,
    pub constraint_violation: f64,
}

impl SqpOutcome {
    pub fn converged(&self) -> bool {
        self.status == SolverStatus::Converged
    }
}

#[derive(Debug, Clone)]
pub struct SqpSolver {
    max_iterations: usize,
    tolerance: f64,
}

/// Solution of one QP subproblem
struct Projection {
    point: Vec<f64>,
    /// Multiplier of the half-space, in projection units
    inequality_multiplier: f64,
    /// Multiplier of the sum constraint, in projection units
    equality_multiplier: f64,
}

impl SqpSolver {
    pub fn new(max_iterations: usize, tolerance: f64) -> Self {
        Self {
            max_iterations,
            tolerance,
        }
    }

    pub fn solve(
        &self,
        objective: &dyn Objective,
        constraint: &LinearInequality,
        x0: Vec<f64>,
    ) -> Result<SqpOutcome, SolverError> {
        let n = x0.len();
        if n == 0 {
            return Err(SolverError::Empty);
        }
        if constraint.coefficients.len() != n {
            return Err(SolverError::DimensionMismatch {
                expected: n,
                actual: constraint.coefficients.len(),
            });
        }
        if x0.iter().chain(&constraint.coefficients).any(|v| !v.is_finite()) || !constraint.bound.is_finite() {
            return Err(SolverError::NonFinite("problem data"));
        }

        // An unreachable bound is relaxed to the least violation possible so
        // the iterates still optimize among the least-risky allocations.
        let reachable = constraint.min_on_simplex();
        let infeasible = reachable > constraint.bound + self.tolerance;
        let working = if infeasible {
            tracing::warn!(
                bound = constraint.bound,
                reachable,
                "inequality constraint cannot be satisfied on the simplex"
            );
            LinearInequality {
                coefficients: constraint.coefficients.clone(),
                bound: reachable,
            }
        } else {
            constraint.clone()
        };

        let violation = |x: &[f64]| (x.iter().sum::<f64>() - 1.0).abs() + working.violation(x);

        let mut x = x0;
        let mut g = objective.gradient(&x);
        if g.len() != n {
            return Err(SolverError::DimensionMismatch { expected: n, actual: g.len() });
        }
        let mut f = objective.value(&x);
        if !f.is_finite() || g.iter().any(|v| !v.is_finite()) {
            return Err(SolverError::NonFinite("objective at starting point"));
        }

        let mut mu: f64 = 1.0;
        let mut penalty: f64 = 1.0;
        let mut best = (x.clone(), f, violation(&x));
        let mut status = SolverStatus::IterationLimit;
        let mut iterations = 0;

        while iterations < self.max_iterations {
            iterations += 1;

            let target: Vec<f64> = x.iter().zip(&g).map(|(xi, gi)| xi - gi / mu).collect();
            let qp = project(&target, &working, self.tolerance);
            let d: Vec<f64> = qp.point.iter().zip(&x).map(|(y, xi)| y - xi).collect();
            let step_norm = d.iter().fold(0.0f64, |m, v| m.max(v.abs()));

            if step_norm <= self.tolerance && violation(&x) <= self.tolerance {
                status = SolverStatus::Converged;
                break;
            }

            // Multipliers of the subproblem scale with the Hessian estimate
            let multipliers = mu * qp.inequality_multiplier.abs().max(qp.equality_multiplier.abs());
            penalty = penalty.max(1.5 * multipliers + 1.0);

            let current_merit = f + penalty * violation(&x);
            let slope = dot(&g, &d) - penalty * violation(&x);

            let mut alpha: f64 = 1.0;
            let mut accepted = None;
            for _ in 0..MAX_BACKTRACKS {
                let candidate: Vec<f64> = x.iter().zip(&d).map(|(xi, di)| xi + alpha * di).collect();
                let candidate_f = objective.value(&candidate);
                let merit = candidate_f + penalty * violation(&candidate);
                if candidate_f.is_finite() && merit <= current_merit + ARMIJO * alpha * slope.min(0.0) {
                    accepted = Some((candidate, candidate_f));
                    break;
                }
                alpha *= 0.5;
            }

            let Some((next, next_f)) = accepted else {
                status = SolverStatus::LineSearchFailed;
                break;
            };

            let (next, next_f) = self.extend_along_face(objective, &working, next, next_f);

            let next_g = objective.gradient(&next);
            let s: Vec<f64> = next.iter().zip(&x).map(|(a, b)| a - b).collect();
            let y: Vec<f64> = next_g.iter().zip(&g).map(|(a, b)| a - b).collect();
            let sy = dot(&s, &y);
            let ss = dot(&s, &s);
            if sy > 0.0 && ss > 0.0 {
                mu = (sy / ss).clamp(MU_MIN, MU_MAX);
            }

            let objective_change = (next_f - f).abs();
            x = next;
            g = next_g;
            f = next_f;

            let v = violation(&x);
            if is_better((f, v), (best.1, best.2), self.tolerance) {
                best = (x.clone(), f, v);
            }

            if objective_change <= self.tolerance * (1.0 + f.abs())
                && alpha * step_norm <= self.tolerance
                && v <= self.tolerance
            {
                status = SolverStatus::Converged;
                break;
            }
        }

        if infeasible {
            status = SolverStatus::Infeasible;
        }

        let (x, objective_value) = if status == SolverStatus::Converged {
            (x, f)
        } else {
            (best.0, best.1)
        };
        let constraint_violation =
            (x.iter().sum::<f64>() - 1.0).abs() + constraint.violation(&x);

        tracing::debug!(?status, iterations, objective = objective_value, "sqp finished");

        Ok(SqpOutcome {
            x,
            status,
            iterations,
            objective: objective_value,
            constraint_violation,
        })
    }

    /// Follows the steepest descent direction on the face active at `x` as far
    /// as the next bound, backtracking while the objective does not improve.
    /// A linear objective reaches the best end of the face in one move.
    fn extend_along_face(
        &self,
        objective: &dyn Objective,
        constraint: &LinearInequality,
        x: Vec<f64>,
        f: f64,
    ) -> (Vec<f64>, f64) {
        let active_tol = self.tolerance.max(1e-12);
        let g = objective.gradient(&x);
        let Some((direction, longest)) = face_direction(&x, &g, constraint, active_tol) else {
            return (x, f);
        };

        let base_violation = (x.iter().sum::<f64>() - 1.0).abs() + constraint.violation(&x);
        let mut tau = longest;
        for _ in 0..MAX_BACKTRACKS {
            let candidate: Vec<f64> = x
                .iter()
                .zip(&direction)
                .map(|(xi, di)| (xi + tau * di).max(0.0))
                .collect();
            let candidate_f = objective.value(&candidate);
            let candidate_violation =
                (candidate.iter().sum::<f64>() - 1.0).abs() + constraint.violation(&candidate);
            if candidate_f.is_finite()
                && candidate_f < f
                && candidate_violation <= base_violation.max(self.tolerance)
            {
                return (candidate, candidate_f);
            }
            tau *= 0.5;
        }
        (x, f)
    }
}

/// Descent direction on the face active at `x` and the longest step along it
/// that keeps every weight non-negative and the inequality satisfied.
///
/// The face fixes weights at or below `active_tol` and, when `a·x` is within
/// `active_tol` of the bound, keeps `a·x` constant.
fn face_direction(
    x: &[f64],
    g: &[f64],
    constraint: &LinearInequality,
    active_tol: f64,
) -> Option<(Vec<f64>, f64)> {
    let a = &constraint.coefficients;
    let free: Vec<usize> = (0..x.len()).filter(|&i| x[i] > active_tol).collect();
    if free.len() < 2 {
        return None;
    }
    let slack = constraint.bound - constraint.evaluate(x);
    let on_hyperplane = slack <= active_tol;

    // Orthonormal basis of the active constraint normals over the free weights
    let k = free.len() as f64;
    let mut basis = vec![vec![1.0 / k.sqrt(); free.len()]];
    if on_hyperplane {
        let restricted: Vec<f64> = free.iter().map(|&i| a[i]).collect();
        let along = dot(&restricted, &basis[0]);
        let residual: Vec<f64> = restricted
            .iter()
            .zip(&basis[0])
            .map(|(ai, ui)| ai - along * ui)
            .collect();
        let norm = dot(&residual, &residual).sqrt();
        if norm > 1e-12 * (1.0 + dot(&restricted, &restricted).sqrt()) {
            basis.push(residual.iter().map(|r| r / norm).collect());
        }
    }

    let mut reduced: Vec<f64> = free.iter().map(|&i| -g[i]).collect();
    for u in &basis {
        let c = dot(&reduced, u);
        for (r, ui) in reduced.iter_mut().zip(u) {
            *r -= c * ui;
        }
    }
    let scale = g.iter().fold(0.0f64, |m, v| m.max(v.abs())).max(1.0);
    if reduced.iter().all(|r| r.abs() <= 1e-12 * scale) {
        return None;
    }

    let mut direction = vec![0.0; x.len()];
    for (&i, r) in free.iter().zip(&reduced) {
        direction[i] = *r;
    }

    let mut longest = f64::INFINITY;
    for &i in &free {
        if direction[i] < 0.0 {
            longest = longest.min(x[i] / -direction[i]);
        }
    }
    let rate = dot(a, &direction);
    if !on_hyperplane && rate > 0.0 {
        longest = longest.min(slack / rate);
    }

    (longest.is_finite() && longest > 0.0).then_some((direction, longest))
}

/// Prefer feasible points, then lower objective
fn is_better(candidate: (f64, f64), incumbent: (f64, f64), tol: f64) -> bool {
    let (cf, cv) = candidate;
    let (bf, bv) = incumbent;
    match (cv <= tol, bv <= tol) {
        (true, false) => true,
        (false, true) => false,
        (true, true) => cf < bf,
        (false, false) => cv < bv,
    }
}

/// Euclidean projection of `v` onto `{x : Σx = 1, x ≥ 0, a·x ≤ b}`
fn project(v: &[f64], constraint: &LinearInequality, tol: f64) -> Projection {
    let a = &constraint.coefficients;
    let shifted = |lambda: f64| -> Vec<f64> { v.iter().zip(a).map(|(vi, ai)| vi - lambda * ai).collect() };

    let (point, theta) = project_simplex(v);
    if constraint.evaluate(&point) <= constraint.bound + tol * 1e-3 {
        return Projection {
            point,
            inequality_multiplier: 0.0,
            equality_multiplier: theta,
        };
    }

    // a·y(λ) is non-increasing in λ; bracket the root then bisect
    let mut lo: f64 = 0.0;
    let mut hi: f64 = 1.0;
    let mut upper = project_simplex(&shifted(hi));
    let mut expansions = 0;
    while constraint.evaluate(&upper.0) > constraint.bound && expansions < 60 {
        lo = hi;
        hi *= 2.0;
        upper = project_simplex(&shifted(hi));
        expansions += 1;
    }

    for _ in 0..BISECTION_STEPS {
        if hi - lo <= f64::EPSILON * hi.max(1.0) {
            break;
        }
        let mid = 0.5 * (lo + hi);
        let candidate = project_simplex(&shifted(mid));
        if constraint.evaluate(&candidate.0) > constraint.bound {
            lo = mid;
        } else {
            hi = mid;
            upper = candidate;
        }
    }

    Projection {
        point: upper.0,
        inequality_multiplier: hi,
        equality_multiplier: upper.1,
    }
}

/// Projection onto the probability simplex; returns the point and the shift θ
fn project_simplex(v: &[f64]) -> (Vec<f64>, f64) {
    let mut sorted = v.to_vec();
    sorted.sort_by(|a, b| b.total_cmp(a));

    let mut cumulative = 0.0;
    let mut theta = 0.0;
    for (j, u) in sorted.iter().enumerate() {
        cumulative += u;
        let candidate = (cumulative - 1.0) / (j + 1) as f64;
        if u - candidate > 0.0 {
            theta = candidate;
        }
    }

    (v.iter().map(|vi| (vi - theta).max(0.0)).collect(), theta)
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}
