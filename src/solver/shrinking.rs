//! Shrinking heuristic
//!
//! Variables stuck at a bound whose gradient says they will stay there are
//! dropped from the active set, so working-set selection and gradient
//! updates only touch the remaining ones. Shrunk gradients are rebuilt from
//! `G_bar` before the final optimality check, so shrinking only affects speed.

/// Position of an alpha within its box
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlphaStatus {
    LowerBound,
    UpperBound,
    Free,
}

impl AlphaStatus {
    pub fn of(alpha: f64, c: f64) -> Self {
        if alpha >= c {
            AlphaStatus::UpperBound
        } else if alpha <= 0.0 {
            AlphaStatus::LowerBound
        } else {
            AlphaStatus::Free
        }
    }
}

/// Variables currently considered by the solver
///
/// Members stay in ascending index order, which keeps selection ties
/// deterministic.
#[derive(Debug, Clone)]
pub struct ActiveSet {
    members: Vec<usize>,
    mask: Vec<bool>,
}

impl ActiveSet {
    /// All `n` variables active
    pub fn full(n: usize) -> Self {
        Self {
            members: (0..n).collect(),
            mask: vec![true; n],
        }
    }

    pub fn members(&self) -> &[usize] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.members.len() == self.mask.len()
    }

    /// Variables that have been shrunk
    pub fn inactive(&self) -> Vec<usize> {
        (0..self.mask.len()).filter(|&i| !self.mask[i]).collect()
    }

    /// Reactivate every variable
    pub fn reset(&mut self) {
        *self = Self::full(self.mask.len());
    }

    /// Keep only members for which `keep` holds
    pub fn retain<F: FnMut(usize) -> bool>(&mut self, mut keep: F) {
        let mask = &mut self.mask;
        self.members.retain(|&i| {
            let kept = keep(i);
            mask[i] = kept;
            kept
        });
    }
}

/// Shrinking test for the standard solver
///
/// `gmax1` is max { -y_i G_i : i in I_up }, `gmax2` is max { y_i G_i : i in I_low }.
pub fn be_shrunk(status: AlphaStatus, y: i8, g: f64, gmax1: f64, gmax2: f64) -> bool {
    match status {
        AlphaStatus::UpperBound => {
            if y == 1 {
                -g > gmax1
            } else {
                -g > gmax2
            }
        }
        AlphaStatus::LowerBound => {
            if y == 1 {
                g > gmax2
            } else {
                g > gmax1
            }
        }
        AlphaStatus::Free => false,
    }
}

/// Shrinking test for the nu solver, which tracks both signs separately
pub fn be_shrunk_nu(status: AlphaStatus, y: i8, g: f64, gmax: [f64; 4]) -> bool {
    let [gmax1, gmax2, gmax3, gmax4] = gmax;
    match status {
        AlphaStatus::UpperBound => {
            if y == 1 {
                -g > gmax1
            } else {
                -g > gmax4
            }
        }
        AlphaStatus::LowerBound => {
            if y == 1 {
                g > gmax2
            } else {
                g > gmax3
            }
        }
        AlphaStatus::Free => false,
    }
}
