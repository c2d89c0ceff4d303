use nalgebra::{DMatrix, DVector};

/// Reusable storage for the augmented ordinary kriging system
///
/// ```text
/// | C  1 | | w  |   | c |
/// | 1' 0 | | mu | = | 1 |
/// ```
///
/// where `C` is the neighbor block of the conditioning matrix and `c` holds the model
/// evaluated between the target and each neighbor.
#[derive(Clone, Debug)]
pub struct OrdinaryKrigingSystem {
    pub lhs: DMatrix<f64>,
    pub rhs: DVector<f64>,
    pub n_elems: usize,
}

impl OrdinaryKrigingSystem {
    /// Create a system sized for up to `n_elems` neighbors.
    pub fn new(n_elems: usize) -> Self {
        Self {
            lhs: DMatrix::zeros(n_elems + 1, n_elems + 1),
            rhs: DVector::zeros(n_elems + 1),
            n_elems,
        }
    }

    #[inline(always)]
    fn set_dim(&mut self, n_elems: usize) {
        if n_elems != self.n_elems {
            self.lhs.resize_mut(n_elems + 1, n_elems + 1, 0.0);
            self.rhs.resize_vertically_mut(n_elems + 1, 0.0);
            self.n_elems = n_elems;
        }
    }

    /// Fill the system for one target.
    ///
    /// # Arguments
    /// * `cond_mat` - model evaluated between every pair of conditioning points
    /// * `neighbors` - indices into `cond_mat` of the selected neighbors
    /// * `target_cov` - model evaluated between the target and each neighbor
    #[inline(always)]
    pub fn build_system(&mut self, cond_mat: &DMatrix<f64>, neighbors: &[usize], target_cov: &[f64]) {
        let m = neighbors.len();
        self.set_dim(m);

        for (a, &i) in neighbors.iter().enumerate() {
            for (b, &j) in neighbors.iter().enumerate() {
                self.lhs[(a, b)] = cond_mat[(i, j)];
            }
            self.lhs[(a, m)] = 1.0;
            self.lhs[(m, a)] = 1.0;
            self.rhs[a] = target_cov[a];
        }
        self.lhs[(m, m)] = 0.0;
        self.rhs[m] = 1.0;
    }

    /// Solve with LU, `None` if the system is singular.
    pub fn solve(&self) -> Option<SolvedOKSystem> {
        let m = self.n_elems;
        let solution = self.lhs.clone().lu().solve(&self.rhs)?;

        if solution.iter().any(|v| !v.is_finite()) {
            return None;
        }

        Some(SolvedOKSystem {
            weights: solution.rows(0, m).into_owned(),
            lagrange: solution[m],
            target_cov: self.rhs.rows(0, m).into_owned(),
        })
    }
}

#[derive(Clone, Debug)]
pub struct SolvedOKSystem {
    pub weights: DVector<f64>,
    pub lagrange: f64,
    target_cov: DVector<f64>,
}

impl SolvedOKSystem {
    #[inline(always)]
    pub fn estimate<I>(&self, values: I) -> f64
    where
        I: IntoIterator<Item = f64>,
    {
        self.weights.iter().zip(values).map(|(w, v)| w * v).sum()
    }

    #[inline(always)]
    pub fn variance(&self) -> f64 {
        self.weights.dot(&self.target_cov) + self.lagrange
    }

    pub fn weight_sum(&self) -> f64 {
        self.weights.sum()
    }
}
