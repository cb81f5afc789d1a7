//! Scenario tests for the classifier fed from real buffers

#[cfg(test)]
mod scenario_tests {
    use crate::logic::anomaly::types::AnomalyType;
    use crate::logic::anomaly::{AnomalyClassifier, AnomalyThresholds, RuleInput};
    use crate::logic::buffer::WindowedBuffer;
    use crate::logic::features::vector::test_vector;
    use crate::logic::features::FeatureExtractor;
    use crate::logic::source::Sample;

    fn scenario_thresholds() -> AnomalyThresholds {
        AnomalyThresholds {
            rssi_threshold_high: -50.0,
            rssi_threshold_low: -90.0,
            entropy_threshold: 0.8,
            ..Default::default()
        }
    }

    fn window(powers: &[f64], frequency_hz: u64) -> Vec<Sample> {
        powers
            .iter()
            .enumerate()
            .map(|(i, &p)| Sample {
                timestamp: i as f64 * 0.1,
                power_dbm: p,
                frequency_hz,
            })
            .collect()
    }

    /// 5 samples at -45 dBm, entropy 0.9 -> exactly one GhostEcho
    #[test]
    fn test_strong_high_entropy_is_single_ghost_echo() {
        let classifier = AnomalyClassifier::new(scenario_thresholds(), Vec::new());
        let samples = window(&[-45.0; 5], 433_920_000);
        let features = test_vector(-45.0, 0.9);
        let input = RuleInput { features: &features, samples: &samples, baseline_std: None };

        let events = classifier.classify(&input, 433_920_000, 0.0).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].anomaly_type, AnomalyType::GhostEcho);
        assert!((0.0..=1.0).contains(&events[0].confidence));
    }

    /// 5 samples at -95 dBm, entropy 0.85, low -90 -> VoidPulse
    #[test]
    fn test_weak_high_entropy_is_void_pulse() {
        let classifier = AnomalyClassifier::new(scenario_thresholds(), Vec::new());
        let samples = window(&[-95.0; 5], 433_920_000);
        let features = test_vector(-95.0, 0.85);
        let input = RuleInput { features: &features, samples: &samples, baseline_std: None };

        let events = classifier.classify(&input, 433_920_000, 0.0).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].anomaly_type, AnomalyType::VoidPulse);
        assert!((0.0..=1.0).contains(&events[0].confidence));
    }

    /// 433.92 MHz -> 434.05 MHz between cycles -> FrequencyShift
    #[test]
    fn test_center_move_of_130_khz_is_frequency_shift() {
        let classifier = AnomalyClassifier::new(scenario_thresholds(), Vec::new());
        let mut buffer = WindowedBuffer::new(10, 5);
        for s in window(&[-70.0, -71.0, -70.5, -69.5, -70.0], 434_050_000) {
            buffer.push(s);
        }
        let snapshot = buffer.snapshot();
        let features = FeatureExtractor::default().extract(&snapshot, 433_920_000).unwrap();
        let input = RuleInput { features: &features, samples: snapshot.as_slice(), baseline_std: None };

        let events = classifier.classify(&input, 433_920_000, 0.0).unwrap();
        assert!(events.iter().any(|e| e.anomaly_type == AnomalyType::FrequencyShift));
        assert_eq!(features.delta_freq_hz, 130_000);
    }

    /// Pathological inputs never escape [0, 1]
    #[test]
    fn test_confidence_clipped_for_extreme_means() {
        let classifier = AnomalyClassifier::new(scenario_thresholds(), Vec::new());
        for mean in [-500.0, -200.0, 0.0, 100.0, 1e9] {
            let mut features = test_vector(mean, 1.0);
            features.delta_freq_hz = i64::MIN;
            features.std_dev = 1e12;
            let input = RuleInput { features: &features, samples: &[], baseline_std: Some(1e-12) };
            for event in classifier.classify(&input, 433_920_000, 0.0).unwrap() {
                assert!((0.0..=1.0).contains(&event.confidence), "{:?}", event);
            }
        }
    }

    /// Buffer below minimum -> no features, no events, no error
    #[test]
    fn test_short_buffer_produces_nothing() {
        let mut buffer = WindowedBuffer::new(10, 5);
        for s in window(&[-45.0; 3], 433_920_000) {
            buffer.push(s);
        }
        assert!(FeatureExtractor::default().extract(&buffer.snapshot(), 433_920_000).is_none());
    }
}
