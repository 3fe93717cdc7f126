/// Thresholds applied to CheckM-style completeness and contamination
/// estimates. All values are percentages (0-100).
#[derive(Debug, Clone, PartialEq)]
pub struct QualityThresholds {
    pub quality_threshold: f32,
    pub quality_weight: f32,
    pub min_completeness: f32,
    pub max_contamination: f32,
}

impl QualityThresholds {
    /// A genome fails if it is too incomplete, too contaminated, or its
    /// weighted quality (completeness - weight*contamination) is below the
    /// quality threshold.
    pub fn passes(&self, completeness: f32, contamination: f32) -> bool {
        completeness >= self.min_completeness
            && contamination <= self.max_contamination
            && completeness - self.quality_weight * contamination >= self.quality_threshold
    }

    pub fn quality(&self, completeness: f32, contamination: f32) -> f32 {
        completeness - self.quality_weight * contamination
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn thresholds() -> QualityThresholds {
        QualityThresholds {
            quality_threshold: 25.,
            quality_weight: 1.,
            min_completeness: 50.,
            max_contamination: 10.,
        }
    }

    #[test]
    fn test_good_quality_genome_passes() {
        init();
        // 95 - 1*3 = 92 >= 25
        assert!(thresholds().passes(95., 3.));
    }

    #[test]
    fn test_contamination_bound_trumps_weighted_score() {
        init();
        // Weighted score 48 >= 25, but contamination 12 > 10.
        assert!(!thresholds().passes(60., 12.));
    }

    #[test]
    fn test_completeness_bound() {
        init();
        assert!(!thresholds().passes(49.9, 0.));
    }

    #[test]
    fn test_weighted_quality_bound() {
        init();
        let t = QualityThresholds {
            quality_threshold: 50.,
            quality_weight: 5.,
            min_completeness: 50.,
            max_contamination: 10.,
        };
        // 80 - 5*8 = 40 < 50
        assert!(!t.passes(80., 8.));
        assert_eq!(40., t.quality(80., 8.));
    }
}
