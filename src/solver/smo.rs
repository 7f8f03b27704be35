//! Sequential Minimal Optimization (SMO) solver
//!
//! Solves the dual problem
//!
//! ```text
//!   min  0.5 a^T Q a + p^T a
//!   s.t. y^T a = delta,  0 <= a_i <= C_i
//! ```
//!
//! by repeatedly optimizing a pair of variables in closed form. Pairs are
//! chosen with second-order working-set selection (Fan, Chen and Lin, 2005).
//! The nu variant keeps the two sign classes apart, as needed when the
//! problem carries the extra constraint e^T a = const.

use crate::solver::qmatrix::QMatrix;
use crate::solver::shrinking::{be_shrunk, be_shrunk_nu, ActiveSet, AlphaStatus};
use log::{debug, warn};

/// Curvature used when the quadratic coefficient is not positive
const TAU: f64 = 1e-12;

/// Selection, shrinking and bias rules to use
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolverVariant {
    Standard,
    Nu,
}

/// Stopping and box settings for one solve
#[derive(Debug, Clone, Copy)]
pub struct SolverConfig {
    /// Upper bound for variables with y = +1
    pub cp: f64,
    /// Upper bound for variables with y = -1
    pub cn: f64,
    /// Tolerance on the maximal violating pair
    pub eps: f64,
    pub shrinking: bool,
}

/// Outcome of a solve besides the alphas
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolutionInfo {
    /// Dual objective value
    pub obj: f64,
    /// Bias of the decision function (the decision value is `sum - rho`)
    pub rho: f64,
    pub upper_bound_p: f64,
    pub upper_bound_n: f64,
    /// Nu variant only: the scale the solution must be divided by
    pub r: f64,
    pub iterations: usize,
}

/// SMO solver over any [`QMatrix`]
pub struct SmoSolver<'q, Q: QMatrix> {
    q: &'q mut Q,
    variant: SolverVariant,
    config: SolverConfig,
    qd: Vec<f64>,
    p: Vec<f64>,
    y: Vec<i8>,
    alpha: Vec<f64>,
    status: Vec<AlphaStatus>,
    g: Vec<f64>,
    /// Gradient contribution of variables at their upper bound
    g_bar: Vec<f64>,
    active: ActiveSet,
    unshrink: bool,
}

impl<'q, Q: QMatrix> SmoSolver<'q, Q> {
    /// Set up a solve with linear term `p`, labels `y` (±1) and a feasible
    /// starting point `alpha`
    pub fn new(
        q: &'q mut Q,
        variant: SolverVariant,
        config: SolverConfig,
        p: Vec<f64>,
        y: Vec<i8>,
        alpha: Vec<f64>,
    ) -> Self {
        let l = y.len();
        let qd = q.diagonal().to_vec();
        Self {
            q,
            variant,
            config,
            qd,
            p,
            y,
            alpha,
            status: vec![AlphaStatus::LowerBound; l],
            g: vec![0.0; l],
            g_bar: vec![0.0; l],
            active: ActiveSet::full(l),
            unshrink: false,
        }
    }

    /// Run to convergence and return the final alphas
    pub fn solve(mut self) -> (Vec<f64>, SolutionInfo) {
        let l = self.y.len();
        if l == 0 {
            return (Vec::new(), self.info(0.0, 0.0, 0.0, 0));
        }

        for i in 0..l {
            self.update_status(i);
        }
        self.init_gradient();

        let max_iter = 10_000_000usize.max(l.saturating_mul(100));
        let mut counter = l.min(1000) + 1;
        let mut iter = 0;

        while iter < max_iter {
            counter -= 1;
            if counter == 0 {
                counter = l.min(1000);
                if self.config.shrinking {
                    self.do_shrinking();
                }
            }

            let (i, j) = match self.select_working_set() {
                Some(pair) => pair,
                None => {
                    // optimal on the active set; check again on everything
                    self.reconstruct_gradient();
                    self.active.reset();
                    match self.select_working_set() {
                        Some(pair) => {
                            counter = 1;
                            pair
                        }
                        None => break,
                    }
                }
            };

            iter += 1;
            self.update_pair(i, j);
        }

        if iter >= max_iter {
            if !self.active.is_full() {
                self.reconstruct_gradient();
                self.active.reset();
            }
            warn!("reaching max number of iterations ({max_iter})");
        }

        let (rho, r) = match self.variant {
            SolverVariant::Standard => (self.calculate_rho(), 0.0),
            SolverVariant::Nu => self.calculate_rho_nu(),
        };

        let mut v = 0.0;
        for i in 0..l {
            v += self.alpha[i] * (self.g[i] + self.p[i]);
        }
        let obj = v / 2.0;

        debug!("optimization finished, #iter = {iter}, obj = {obj}, rho = {rho}");

        let info = self.info(obj, rho, r, iter);
        (self.alpha, info)
    }

    fn info(&self, obj: f64, rho: f64, r: f64, iterations: usize) -> SolutionInfo {
        SolutionInfo {
            obj,
            rho,
            upper_bound_p: self.config.cp,
            upper_bound_n: self.config.cn,
            r,
            iterations,
        }
    }

    fn c_of(&self, i: usize) -> f64 {
        if self.y[i] > 0 {
            self.config.cp
        } else {
            self.config.cn
        }
    }

    fn update_status(&mut self, i: usize) {
        self.status[i] = AlphaStatus::of(self.alpha[i], self.c_of(i));
    }

    fn is_upper(&self, i: usize) -> bool {
        self.status[i] == AlphaStatus::UpperBound
    }

    fn is_lower(&self, i: usize) -> bool {
        self.status[i] == AlphaStatus::LowerBound
    }

    fn is_free(&self, i: usize) -> bool {
        self.status[i] == AlphaStatus::Free
    }

    fn init_gradient(&mut self) {
        let l = self.y.len();
        self.g.copy_from_slice(&self.p);
        self.g_bar.iter_mut().for_each(|v| *v = 0.0);

        for i in 0..l {
            if self.is_lower(i) {
                continue;
            }
            let row = self.q.row(i);
            let alpha_i = self.alpha[i];
            for j in 0..l {
                self.g[j] += alpha_i * row[j];
            }
            if self.is_upper(i) {
                let c = self.c_of(i);
                for j in 0..l {
                    self.g_bar[j] += c * row[j];
                }
            }
        }
    }

    /// Rebuild the gradient of shrunk variables from `G_bar` and the free alphas
    fn reconstruct_gradient(&mut self) {
        if self.active.is_full() {
            return;
        }

        let inactive = self.active.inactive();
        for &j in &inactive {
            self.g[j] = self.g_bar[j] + self.p[j];
        }

        let free: Vec<usize> = self
            .active
            .members()
            .iter()
            .copied()
            .filter(|&i| self.is_free(i))
            .collect();
        if 2 * free.len() < self.active.len() {
            debug!("few free variables; disabling shrinking may be faster");
        }

        for i in free {
            let row = self.q.row(i);
            let alpha_i = self.alpha[i];
            for &j in &inactive {
                self.g[j] += alpha_i * row[j];
            }
        }
    }

    fn select_working_set(&mut self) -> Option<(usize, usize)> {
        match self.variant {
            SolverVariant::Standard => self.select_working_set_standard(),
            SolverVariant::Nu => self.select_working_set_nu(),
        }
    }

    /// Second-order selection
    ///
    /// i maximizes -y_i G_i over I_up; j minimizes the objective decrease
    /// estimate over I_low among pairs that violate optimality.
    fn select_working_set_standard(&mut self) -> Option<(usize, usize)> {
        let mut gmax = f64::NEG_INFINITY;
        let mut gmax2 = f64::NEG_INFINITY;
        let mut gmax_idx = None;

        for &t in self.active.members() {
            if self.y[t] == 1 {
                if !self.is_upper(t) && -self.g[t] >= gmax {
                    gmax = -self.g[t];
                    gmax_idx = Some(t);
                }
            } else if !self.is_lower(t) && self.g[t] >= gmax {
                gmax = self.g[t];
                gmax_idx = Some(t);
            }
        }

        let i = gmax_idx?;
        let row_i = self.q.row(i);
        let y_i = f64::from(self.y[i]);
        let mut gmin_idx = None;
        let mut obj_diff_min = f64::INFINITY;

        for &j in self.active.members() {
            if self.y[j] == 1 {
                if !self.is_lower(j) {
                    let grad_diff = gmax + self.g[j];
                    if self.g[j] >= gmax2 {
                        gmax2 = self.g[j];
                    }
                    if grad_diff > 0.0 {
                        let quad = self.qd[i] + self.qd[j] - 2.0 * y_i * row_i[j];
                        let obj_diff = -(grad_diff * grad_diff) / positive_or_tau(quad);
                        if obj_diff <= obj_diff_min {
                            gmin_idx = Some(j);
                            obj_diff_min = obj_diff;
                        }
                    }
                }
            } else if !self.is_upper(j) {
                let grad_diff = gmax - self.g[j];
                if -self.g[j] >= gmax2 {
                    gmax2 = -self.g[j];
                }
                if grad_diff > 0.0 {
                    let quad = self.qd[i] + self.qd[j] + 2.0 * y_i * row_i[j];
                    let obj_diff = -(grad_diff * grad_diff) / positive_or_tau(quad);
                    if obj_diff <= obj_diff_min {
                        gmin_idx = Some(j);
                        obj_diff_min = obj_diff;
                    }
                }
            }
        }

        if gmax + gmax2 < self.config.eps {
            return None;
        }
        gmin_idx.map(|j| (i, j))
    }

    /// Second-order selection restricted to pairs of equal sign
    fn select_working_set_nu(&mut self) -> Option<(usize, usize)> {
        let mut gmaxp = f64::NEG_INFINITY;
        let mut gmaxp2 = f64::NEG_INFINITY;
        let mut gmaxp_idx = None;
        let mut gmaxn = f64::NEG_INFINITY;
        let mut gmaxn2 = f64::NEG_INFINITY;
        let mut gmaxn_idx = None;

        for &t in self.active.members() {
            if self.y[t] == 1 {
                if !self.is_upper(t) && -self.g[t] >= gmaxp {
                    gmaxp = -self.g[t];
                    gmaxp_idx = Some(t);
                }
            } else if !self.is_lower(t) && self.g[t] >= gmaxn {
                gmaxn = self.g[t];
                gmaxn_idx = Some(t);
            }
        }

        let row_ip = gmaxp_idx.map(|ip| (ip, self.q.row(ip)));
        let row_in = gmaxn_idx.map(|in_| (in_, self.q.row(in_)));
        let mut gmin_idx = None;
        let mut obj_diff_min = f64::INFINITY;

        for &j in self.active.members() {
            if self.y[j] == 1 {
                if !self.is_lower(j) {
                    let grad_diff = gmaxp + self.g[j];
                    if self.g[j] >= gmaxp2 {
                        gmaxp2 = self.g[j];
                    }
                    if let (true, Some((ip, row))) = (grad_diff > 0.0, row_ip.as_ref()) {
                        let quad = self.qd[*ip] + self.qd[j] - 2.0 * row[j];
                        let obj_diff = -(grad_diff * grad_diff) / positive_or_tau(quad);
                        if obj_diff <= obj_diff_min {
                            gmin_idx = Some(j);
                            obj_diff_min = obj_diff;
                        }
                    }
                }
            } else if !self.is_upper(j) {
                let grad_diff = gmaxn - self.g[j];
                if -self.g[j] >= gmaxn2 {
                    gmaxn2 = -self.g[j];
                }
                if let (true, Some((in_, row))) = (grad_diff > 0.0, row_in.as_ref()) {
                    let quad = self.qd[*in_] + self.qd[j] - 2.0 * row[j];
                    let obj_diff = -(grad_diff * grad_diff) / positive_or_tau(quad);
                    if obj_diff <= obj_diff_min {
                        gmin_idx = Some(j);
                        obj_diff_min = obj_diff;
                    }
                }
            }
        }

        if (gmaxp + gmaxp2).max(gmaxn + gmaxn2) < self.config.eps {
            return None;
        }
        let j = gmin_idx?;
        let i = if self.y[j] == 1 { gmaxp_idx } else { gmaxn_idx }?;
        Some((i, j))
    }

    /// Closed-form update of alpha_i and alpha_j, clipped to the box
    fn update_pair(&mut self, i: usize, j: usize) {
        let l = self.y.len();
        let row_i = self.q.row(i);
        let row_j = self.q.row(j);
        let c_i = self.c_of(i);
        let c_j = self.c_of(j);
        let old_alpha_i = self.alpha[i];
        let old_alpha_j = self.alpha[j];
        let alpha = &mut self.alpha;

        if self.y[i] != self.y[j] {
            let quad = positive_or_tau(self.qd[i] + self.qd[j] + 2.0 * row_i[j]);
            let delta = (-self.g[i] - self.g[j]) / quad;
            let diff = alpha[i] - alpha[j];
            alpha[i] += delta;
            alpha[j] += delta;

            if diff > 0.0 {
                if alpha[j] < 0.0 {
                    alpha[j] = 0.0;
                    alpha[i] = diff;
                }
            } else if alpha[i] < 0.0 {
                alpha[i] = 0.0;
                alpha[j] = -diff;
            }
            if diff > c_i - c_j {
                if alpha[i] > c_i {
                    alpha[i] = c_i;
                    alpha[j] = c_i - diff;
                }
            } else if alpha[j] > c_j {
                alpha[j] = c_j;
                alpha[i] = c_j + diff;
            }
        } else {
            let quad = positive_or_tau(self.qd[i] + self.qd[j] - 2.0 * row_i[j]);
            let delta = (self.g[i] - self.g[j]) / quad;
            let sum = alpha[i] + alpha[j];
            alpha[i] -= delta;
            alpha[j] += delta;

            if sum > c_i {
                if alpha[i] > c_i {
                    alpha[i] = c_i;
                    alpha[j] = sum - c_i;
                }
            } else if alpha[j] < 0.0 {
                alpha[j] = 0.0;
                alpha[i] = sum;
            }
            if sum > c_j {
                if alpha[j] > c_j {
                    alpha[j] = c_j;
                    alpha[i] = sum - c_j;
                }
            } else if alpha[i] < 0.0 {
                alpha[i] = 0.0;
                alpha[j] = sum;
            }
        }

        let delta_i = self.alpha[i] - old_alpha_i;
        let delta_j = self.alpha[j] - old_alpha_j;
        for &k in self.active.members() {
            self.g[k] += row_i[k] * delta_i + row_j[k] * delta_j;
        }

        let was_upper_i = self.is_upper(i);
        let was_upper_j = self.is_upper(j);
        self.update_status(i);
        self.update_status(j);

        if was_upper_i != self.is_upper(i) {
            let sign = if was_upper_i { -1.0 } else { 1.0 };
            for k in 0..l {
                self.g_bar[k] += sign * c_i * row_i[k];
            }
        }
        if was_upper_j != self.is_upper(j) {
            let sign = if was_upper_j { -1.0 } else { 1.0 };
            for k in 0..l {
                self.g_bar[k] += sign * c_j * row_j[k];
            }
        }
    }

    fn do_shrinking(&mut self) {
        match self.variant {
            SolverVariant::Standard => self.do_shrinking_standard(),
            SolverVariant::Nu => self.do_shrinking_nu(),
        }
    }

    fn do_shrinking_standard(&mut self) {
        // gmax1: max { -y_i G_i | i in I_up }, gmax2: max { y_i G_i | i in I_low }
        let mut gmax1 = f64::NEG_INFINITY;
        let mut gmax2 = f64::NEG_INFINITY;

        for &i in self.active.members() {
            let g = self.g[i];
            if self.y[i] == 1 {
                if !self.is_upper(i) && -g >= gmax1 {
                    gmax1 = -g;
                }
                if !self.is_lower(i) && g >= gmax2 {
                    gmax2 = g;
                }
            } else {
                if !self.is_upper(i) && -g >= gmax2 {
                    gmax2 = -g;
                }
                if !self.is_lower(i) && g >= gmax1 {
                    gmax1 = g;
                }
            }
        }

        if !self.unshrink && gmax1 + gmax2 <= self.config.eps * 10.0 {
            self.unshrink = true;
            self.reconstruct_gradient();
            self.active.reset();
            debug!("unshrinking");
        }

        let (status, y, g) = (&self.status, &self.y, &self.g);
        self.active
            .retain(|i| !be_shrunk(status[i], y[i], g[i], gmax1, gmax2));
    }

    fn do_shrinking_nu(&mut self) {
        let mut gmax1 = f64::NEG_INFINITY; // max { -y_i G_i | y_i = +1, i in I_up }
        let mut gmax2 = f64::NEG_INFINITY; // max { y_i G_i | y_i = +1, i in I_low }
        let mut gmax3 = f64::NEG_INFINITY; // max { -y_i G_i | y_i = -1, i in I_up }
        let mut gmax4 = f64::NEG_INFINITY; // max { y_i G_i | y_i = -1, i in I_low }

        for &i in self.active.members() {
            let g = self.g[i];
            if !self.is_upper(i) {
                if self.y[i] == 1 {
                    gmax1 = gmax1.max(-g);
                } else {
                    gmax4 = gmax4.max(-g);
                }
            }
            if !self.is_lower(i) {
                if self.y[i] == 1 {
                    gmax2 = gmax2.max(g);
                } else {
                    gmax3 = gmax3.max(g);
                }
            }
        }

        if !self.unshrink && (gmax1 + gmax2).max(gmax3 + gmax4) <= self.config.eps * 10.0 {
            self.unshrink = true;
            self.reconstruct_gradient();
            self.active.reset();
            debug!("unshrinking");
        }

        let bounds = [gmax1, gmax2, gmax3, gmax4];
        let (status, y, g) = (&self.status, &self.y, &self.g);
        self.active
            .retain(|i| !be_shrunk_nu(status[i], y[i], g[i], bounds));
    }

    /// Bias: average of y_i G_i over free variables, else the midpoint of
    /// the feasible interval
    fn calculate_rho(&self) -> f64 {
        let mut nr_free = 0usize;
        let mut ub = f64::INFINITY;
        let mut lb = f64::NEG_INFINITY;
        let mut sum_free = 0.0;

        for &i in self.active.members() {
            let y_g = f64::from(self.y[i]) * self.g[i];
            match self.status[i] {
                AlphaStatus::UpperBound => {
                    if self.y[i] == -1 {
                        ub = ub.min(y_g);
                    } else {
                        lb = lb.max(y_g);
                    }
                }
                AlphaStatus::LowerBound => {
                    if self.y[i] == 1 {
                        ub = ub.min(y_g);
                    } else {
                        lb = lb.max(y_g);
                    }
                }
                AlphaStatus::Free => {
                    nr_free += 1;
                    sum_free += y_g;
                }
            }
        }

        if nr_free > 0 {
            sum_free / nr_free as f64
        } else {
            (ub + lb) / 2.0
        }
    }

    /// Returns `(rho, r)` for the nu formulation
    fn calculate_rho_nu(&self) -> (f64, f64) {
        let mut nr_free = [0usize; 2];
        let mut ub = [f64::INFINITY; 2];
        let mut lb = [f64::NEG_INFINITY; 2];
        let mut sum_free = [0.0; 2];

        for &i in self.active.members() {
            let side = usize::from(self.y[i] != 1);
            let g = self.g[i];
            match self.status[i] {
                AlphaStatus::UpperBound => lb[side] = lb[side].max(g),
                AlphaStatus::LowerBound => ub[side] = ub[side].min(g),
                AlphaStatus::Free => {
                    nr_free[side] += 1;
                    sum_free[side] += g;
                }
            }
        }

        let side_value = |s: usize| {
            if nr_free[s] > 0 {
                sum_free[s] / nr_free[s] as f64
            } else {
                (ub[s] + lb[s]) / 2.0
            }
        };
        let r1 = side_value(0);
        let r2 = side_value(1);

        ((r1 - r2) / 2.0, (r1 + r2) / 2.0)
    }
}

fn positive_or_tau(quad: f64) -> f64 {
    if quad > 0.0 {
        quad
    } else {
        TAU
    }
}
