//! Prediction
//!
//! Classification evaluates every one-vs-one decision function and votes;
//! one-class and regression evaluate the single decision function.

use crate::core::{FeatureVector, SvmType};
use crate::kernel::{Kernel, KernelFunction};
use crate::model::Model;
use crate::probability::{multiclass_probability, one_class_probability, sigmoid_predict};

/// Pairwise probabilities are kept away from 0 and 1
const MIN_PROB: f64 = 1e-7;

impl Model {
    /// Predicted label (classification), ±1 (one-class) or value (regression)
    pub fn predict(&self, x: &FeatureVector) -> f64 {
        self.predict_values(x).0
    }

    /// Prediction plus the raw decision values
    ///
    /// Classification yields one value per class pair in the order (0,1),
    /// (0,2), ..., (1,2), ...; a positive value favours the first class of
    /// the pair. One-class and regression yield a single value.
    pub fn predict_values(&self, x: &FeatureVector) -> (f64, Vec<f64>) {
        let kernel = KernelFunction::from_parameters(&self.param);

        match self.svm_type() {
            SvmType::OneClass | SvmType::EpsilonSvr | SvmType::NuSvr => {
                let coef = self.sv_coef.first().map(Vec::as_slice).unwrap_or(&[]);
                let mut sum = 0.0;
                for (c, sv) in coef.iter().zip(&self.support_vectors) {
                    sum += c * kernel.compute(x, sv);
                }
                sum -= self.rho.first().copied().unwrap_or(0.0);

                let label = if self.svm_type() == SvmType::OneClass {
                    if sum > 0.0 {
                        1.0
                    } else {
                        -1.0
                    }
                } else {
                    sum
                };
                (label, vec![sum])
            }
            SvmType::CSvc | SvmType::NuSvc => self.vote(x, &kernel),
        }
    }

    fn vote(&self, x: &FeatureVector, kernel: &KernelFunction) -> (f64, Vec<f64>) {
        let nr_class = self.nr_class;
        if nr_class < 2 {
            return (self.labels.first().copied().unwrap_or(0.0), Vec::new());
        }

        let kvalue: Vec<f64> = self
            .support_vectors
            .iter()
            .map(|sv| kernel.compute(x, sv))
            .collect();

        let mut start = vec![0; nr_class];
        for c in 1..nr_class {
            start[c] = start[c - 1] + self.n_sv[c - 1];
        }

        let mut votes = vec![0usize; nr_class];
        let mut dec_values = Vec::with_capacity(self.nr_decision_values());
        let mut p = 0;
        for i in 0..nr_class {
            for j in i + 1..nr_class {
                let (si, ci) = (start[i], self.n_sv[i]);
                let (sj, cj) = (start[j], self.n_sv[j]);
                let coef1 = &self.sv_coef[j - 1];
                let coef2 = &self.sv_coef[i];

                let mut sum = 0.0;
                for k in si..si + ci {
                    sum += coef1[k] * kvalue[k];
                }
                for k in sj..sj + cj {
                    sum += coef2[k] * kvalue[k];
                }
                sum -= self.rho[p];
                dec_values.push(sum);

                if sum > 0.0 {
                    votes[i] += 1;
                } else {
                    votes[j] += 1;
                }
                p += 1;
            }
        }

        // ties go to the lowest class index
        let mut winner = 0;
        for c in 1..nr_class {
            if votes[c] > votes[winner] {
                winner = c;
            }
        }
        (self.labels[winner], dec_values)
    }

    /// Prediction with a probability per class
    ///
    /// Classification returns one probability per entry of
    /// [`Model::labels`] and the label of the most probable class. A
    /// calibrated one-class model returns `[p, 1 - p]` for `+1` and `-1`.
    /// Without calibration data this falls back to [`Model::predict`] with
    /// all probability mass on the predicted class.
    pub fn predict_probability(&self, x: &FeatureVector) -> (f64, Vec<f64>) {
        if !self.check_probability_model() {
            return self.degenerate_distribution(x);
        }

        match self.svm_type() {
            SvmType::CSvc | SvmType::NuSvc => {
                let nr_class = self.nr_class;
                let (_, dec_values) = self.predict_values(x);

                let mut pairwise = vec![vec![0.0; nr_class]; nr_class];
                let mut k = 0;
                for i in 0..nr_class {
                    for j in i + 1..nr_class {
                        let p = sigmoid_predict(dec_values[k], self.prob_a[k], self.prob_b[k])
                            .clamp(MIN_PROB, 1.0 - MIN_PROB);
                        pairwise[i][j] = p;
                        pairwise[j][i] = 1.0 - p;
                        k += 1;
                    }
                }

                let prob = if nr_class == 2 {
                    vec![pairwise[0][1], pairwise[1][0]]
                } else {
                    multiclass_probability(&pairwise)
                };

                let mut best = 0;
                for c in 1..nr_class {
                    if prob[c] > prob[best] {
                        best = c;
                    }
                }
                (self.labels[best], prob)
            }
            SvmType::OneClass => {
                let (label, dec_values) = self.predict_values(x);
                let p = one_class_probability(&self.prob_density_marks, dec_values[0]);
                (label, vec![p, 1.0 - p])
            }
            // a regression model has no class distribution
            SvmType::EpsilonSvr | SvmType::NuSvr => self.degenerate_distribution(x),
        }
    }

    fn degenerate_distribution(&self, x: &FeatureVector) -> (f64, Vec<f64>) {
        let label = self.predict(x);
        let prob = match self.svm_type() {
            SvmType::CSvc | SvmType::NuSvc => self
                .labels
                .iter()
                .map(|&l| if l == label { 1.0 } else { 0.0 })
                .collect(),
            SvmType::OneClass => {
                if label > 0.0 {
                    vec![1.0, 0.0]
                } else {
                    vec![0.0, 1.0]
                }
            }
            SvmType::EpsilonSvr | SvmType::NuSvr => vec![1.0],
        };
        (label, prob)
    }
}
