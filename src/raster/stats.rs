/// Summary statistics of a set of pixel values, NaN excluded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Statistics {
    pub max: f64,
    pub min: f64,
    pub median: f64,
    pub mean: f64,
    /// Population standard deviation.
    pub std: f64,
}

impl Statistics {
    /// `None` when every value is NaN.
    pub fn from_values(values: &[f64]) -> Option<Self> {
        let mut values: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
        if values.is_empty() {
            return None;
        }
        values.sort_by(f64::total_cmp);

        let n = values.len();
        let median = match n % 2 {
            1 => values[n / 2],
            _ => (values[n / 2 - 1] + values[n / 2]) / 2.0,
        };
        let mean = values.iter().sum::<f64>() / n as f64;
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n as f64;

        Some(Self {
            max: values[n - 1],
            min: values[0],
            median,
            mean,
            std: variance.sqrt(),
        })
    }

    pub(crate) fn lines_for(values: &[f64]) -> Vec<String> {
        match Self::from_values(values) {
            Some(stats) => vec![
                format!("[MAXIMUM]:          {:.2}", stats.max),
                format!("[MINIMUM]:          {:.2}", stats.min),
                format!("[MEDIAN]:           {:.2}", stats.median),
                format!("[MEAN]:             {:.2}", stats.mean),
                format!("[STD DEV]:          {:.2}", stats.std),
            ],
            None => vec!["[NO VALID DATA]".to_string()],
        }
    }
}
