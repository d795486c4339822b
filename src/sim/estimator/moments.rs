//! Running moments of per-history scores and the statistics derived from them.

/// Sums of the first four powers of per-history scores.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FourMoments {
    pub first: f64,
    pub second: f64,
    pub third: f64,
    pub fourth: f64,
}

impl FourMoments {
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds one history score into the moments.
    pub fn add_sample(&mut self, x: f64) {
        let x2 = x * x;
        self.first += x;
        self.second += x2;
        self.third += x2 * x;
        self.fourth += x2 * x2;
    }

    pub fn is_zero(&self) -> bool {
        self.first == 0. && self.second == 0. && self.third == 0. && self.fourth == 0.
    }

    /// Sample mean over `n` histories.
    pub fn mean(&self, n: u64) -> f64 {
        if n == 0 {
            return 0.;
        }
        self.first / n as f64
    }

    /// Unbiased sample variance over `n` histories.
    pub fn sample_variance(&self, n: u64) -> f64 {
        if n < 2 {
            return 0.;
        }
        let nf = n as f64;
        let mean = self.first / nf;
        (nf / (nf - 1.) * (self.second / nf - mean * mean)).max(0.)
    }

    /// Estimated variance of the sample mean.
    pub fn variance_of_mean(&self, n: u64) -> f64 {
        self.sample_variance(n) / n.max(1) as f64
    }

    /// Relative error of the sample mean.
    pub fn relative_error(&self, n: u64) -> f64 {
        let mean = self.mean(n);
        if mean == 0. {
            return 0.;
        }
        (self.variance_of_mean(n).sqrt() / mean).abs()
    }

    /// Relative variance of the variance.
    pub fn relative_vov(&self, n: u64) -> f64 {
        if n == 0 {
            return 0.;
        }
        let nf = n as f64;
        let (s1, s2, s3, s4) = (self.first, self.second, self.third, self.fourth);
        let denom = s2 - s1 * s1 / nf;
        if denom <= 0. {
            return 0.;
        }
        let numer = s4 - 4. * s1 * s3 / nf + 8. * s2 * s1 * s1 / (nf * nf)
            - 4. * s1.powi(4) / (nf * nf * nf)
            - s2 * s2 / nf;
        numer / (denom * denom)
    }

    /// Processes the moments into reportable statistics.
    ///
    /// `scale` multiplies the mean (estimator multiplier over normalization).
    pub fn process(&self, n: u64, scale: f64, elapsed_time: f64) -> ProcessedMoments {
        let relative_error = self.relative_error(n);
        ProcessedMoments {
            mean: self.mean(n) * scale,
            relative_error,
            relative_vov: self.relative_vov(n),
            figure_of_merit: figure_of_merit(relative_error, elapsed_time),
        }
    }
}

/// Figure of merit `1 / (RE^2 * time)`; zero when undefined.
pub fn figure_of_merit(relative_error: f64, elapsed_time: f64) -> f64 {
    if relative_error > 0. && elapsed_time > 0. {
        1. / (relative_error * relative_error * elapsed_time)
    } else {
        0.
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProcessedMoments {
    pub mean: f64,
    pub relative_error: f64,
    pub relative_vov: f64,
    pub figure_of_merit: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn moments(first: f64, second: f64, third: f64, fourth: f64) -> FourMoments {
        FourMoments {
            first,
            second,
            third,
            fourth,
        }
    }

    #[test]
    fn test_add_sample() {
        let mut m = FourMoments::new();
        assert!(m.is_zero());
        m.add_sample(2.);
        m.add_sample(1.);
        assert_eq!(m, moments(3., 5., 9., 17.));
    }

    #[test]
    fn test_mean() {
        let m = moments(10., 100., 0., 0.);
        assert!((m.mean(100) - 0.1).abs() < 1e-15);
        assert_eq!(m.mean(0), 0.);
    }

    #[test]
    fn test_relative_error() {
        let m = moments(10., 100., 0., 0.);
        assert!((m.relative_error(100) - 1.).abs() < 1e-12);
        assert_eq!(FourMoments::new().relative_error(100), 0.);
    }

    #[test]
    fn test_relative_vov() {
        let m = moments(10., 100., 1000., 10000.);
        assert!((m.relative_vov(100) - 0.97010101010101002).abs() < 1e-12);
    }

    #[test]
    fn test_figure_of_merit() {
        assert!((figure_of_merit(2., 1e3) - 2.5e-4).abs() < 1e-15);
        assert_eq!(figure_of_merit(0., 1e3), 0.);
        assert_eq!(figure_of_merit(1., 0.), 0.);
    }

    #[test]
    fn test_identical_samples_have_zero_error() {
        let mut m = FourMoments::new();
        for _ in 0..10 {
            m.add_sample(0.5);
        }
        assert!((m.mean(10) - 0.5).abs() < 1e-15);
        assert!(m.relative_error(10) < 1e-7);
        assert!(m.sample_variance(10) < 1e-15);
    }

    #[test]
    fn test_process() {
        let m = moments(10., 100., 1000., 10000.);
        let p = m.process(100, 4., 1e3);
        assert!((p.mean - 0.4).abs() < 1e-14);
        assert!((p.relative_error - 1.).abs() < 1e-12);
        assert!((p.figure_of_merit - 1e-3).abs() < 1e-12);
    }
}
