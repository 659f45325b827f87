use aerors::{
    AccuracyLevel, Activity, ActivityPoint, AeroAnalyzer, AnalysisError, AppConfig, CdaAssessment,
    CdaSource, PhysicalConstants, ReferenceCda, ReferenceSource, SpeedUnit,
};

/// Integration tests that run the complete analysis workflow

#[cfg(test)]
mod integration_tests {
    use super::*;

    fn metric_constants() -> PhysicalConstants {
        PhysicalConstants {
            speed_unit: SpeedUnit::MetersPerSecond,
            ..PhysicalConstants::default()
        }
    }

    /// Deterministic zero-mean power noise in [-8, 8] W
    fn noise(i: usize) -> f64 {
        ((i * 37) % 17) as f64 - 8.0
    }

    /// Flat ride at 7-12 m/s whose power follows the model at `cda` plus noise
    fn flat_ride(cda: f64) -> Vec<ActivityPoint> {
        let c = metric_constants();
        (0..680)
            .map(|i| {
                let v = 9.5 + 2.5 * (i as f64 / 35.0).sin();
                let power = 0.5 * c.air_density * cda * v.powi(3)
                    + c.crr * c.total_mass_kg * c.gravity * v
                    + noise(i);
                ActivityPoint::new(i as u32, power, v, 0.0)
            })
            .collect()
    }

    /// Rolling terrain at highway-like speeds, given in m/s
    fn rolling_ride() -> Vec<ActivityPoint> {
        (0..400)
            .map(|i| {
                let v = 16.0 + 2.0 * (i as f64 / 25.0).sin();
                let grade = 0.02 * (i as f64 / 60.0).sin();
                let power = 350.0 + 120.0 * (i as f64 / 60.0).sin();
                ActivityPoint::new(i as u32, power, v, grade)
            })
            .collect()
    }

    /// Test the complete workflow on a noisy flat ride
    #[test]
    fn test_noisy_flat_ride_workflow() {
        let analyzer = AeroAnalyzer::new(metric_constants());
        let activity = Activity::new("flat", flat_ride(0.32));

        let analysis = analyzer
            .analyze_with_reference(&activity, Some(ReferenceCda::supplied(0.32)))
            .unwrap();

        assert_eq!(analysis.components.len(), activity.points.len());
        assert!((analysis.regression.cda_estimate_m2 - 0.32).abs() < 0.015);
        assert!(!analysis.regression.clamped);
        assert!(analysis.regression.r_squared > 0.9);

        let cross = analysis.cross_validation.unwrap();
        assert!(cross.absolute_error_m2 < 0.015);
        assert_ne!(cross.assessment, CdaAssessment::NeedsImprovement);
        assert_eq!(analysis.reference.unwrap().source, ReferenceSource::Supplied);

        // Modeled power uses the default CdA, so a small bias remains
        let validation = analysis.validation;
        assert!(validation.mean_absolute_error_w < 25.0);
        assert!(validation.correlation.unwrap() > 0.95);
        assert!(validation.coverage_within_5w <= validation.coverage_within_10w);
        assert!(validation.coverage_within_10w <= validation.coverage_within_20w);
        assert_eq!(analysis.breakdown.cda_source, CdaSource::Default);
    }

    /// Exact model data grades as EXCELLENT end to end
    #[test]
    fn test_model_consistent_ride_is_excellent() {
        let c = metric_constants();
        let points: Vec<ActivityPoint> = (0..300)
            .map(|i| {
                let v = 8.0 + (i % 40) as f64 * 0.1;
                let power = 0.5 * c.air_density * c.default_cda_m2 * v.powi(3)
                    + c.crr * c.total_mass_kg * c.gravity * v;
                ActivityPoint::new(i as u32, power, v, 0.0)
            })
            .collect();

        let analysis = AeroAnalyzer::new(c)
            .analyze(&Activity::new("exact", points))
            .unwrap();
        assert_eq!(analysis.accuracy, AccuracyLevel::Excellent);
        assert_eq!(analysis.validation.coverage_within_5w, 100.0);
    }

    /// km/h input under the Auto policy produces the same split as m/s input
    #[test]
    fn test_auto_speed_unit_matches_metric_input() {
        let metric = Activity::new("metric", rolling_ride());
        let kmh = Activity::new(
            "kmh",
            rolling_ride()
                .into_iter()
                .map(|p| ActivityPoint {
                    speed_mps: p.speed_mps * 3.6,
                    ..p
                })
                .collect(),
        );

        let metric_analysis = AeroAnalyzer::new(metric_constants()).analyze(&metric).unwrap();
        let auto_analysis = AeroAnalyzer::new(PhysicalConstants::default())
            .analyze(&kmh)
            .unwrap();

        for (a, b) in metric_analysis.components.iter().zip(&auto_analysis.components) {
            assert!((a.total_modeled_w - b.total_modeled_w).abs() < 1e-6);
            assert!((a.gravity_w - b.gravity_w).abs() < 1e-6);
        }
        assert!(
            (metric_analysis.regression.cda_estimate_m2 - auto_analysis.regression.cda_estimate_m2)
                .abs()
                < 1e-9
        );
    }

    /// Gravity shows up in the breakdown on rolling terrain
    #[test]
    fn test_rolling_terrain_breakdown() {
        let analysis = AeroAnalyzer::new(metric_constants())
            .analyze(&Activity::new("hills", rolling_ride()))
            .unwrap();

        let breakdown = analysis.breakdown;
        assert_eq!(breakdown.moving_samples, 400);
        assert!(breakdown.avg_aero_w > breakdown.avg_rolling_w);
        assert!(breakdown.avg_gravity_w.abs() > 0.0);
        let climbing = analysis
            .components
            .iter()
            .filter(|c| c.gravity_w > 0.0)
            .count();
        let descending = analysis
            .components
            .iter()
            .filter(|c| c.gravity_w < 0.0)
            .count();
        assert!(climbing > 0 && descending > 0);
    }

    /// Sensor CdA becomes both the per-point drag area and the reference
    #[test]
    fn test_sensor_reference_drives_cross_validation() {
        let points: Vec<ActivityPoint> = flat_ride(0.32)
            .into_iter()
            .enumerate()
            .map(|(i, p)| p.with_measured_cda(if i % 2 == 0 { 0.31 } else { 0.33 }))
            .collect();

        let analysis = AeroAnalyzer::new(metric_constants())
            .analyze(&Activity::new("sensor", points))
            .unwrap();

        let reference = analysis.reference.unwrap();
        assert_eq!(reference.source, ReferenceSource::Measured);
        assert!((reference.cda_m2 - 0.32).abs() < 1e-9);
        assert!((reference.std_dev_m2 - 0.01).abs() < 1e-9);
        assert_eq!(analysis.breakdown.cda_source, CdaSource::Sensor);
        assert!(analysis.cross_validation.is_some());
        assert!(analysis.components.iter().all(|c| c.sensor_cda));
    }

    /// Config switches flow into the analyzer
    #[test]
    fn test_config_driven_analyzer() {
        let mut activity = Activity::new("suspect", flat_ride(0.32));
        activity.channels.insert(
            "unknown_61".to_string(),
            (0..600).map(|i| 0.315 + (i % 2) as f64 * 0.01).collect(),
        );

        let mut config = AppConfig::default();
        config.constants.speed_unit = SpeedUnit::MetersPerSecond;
        config.regression.min_samples = 1000;

        let err = AeroAnalyzer::from_config(&config).analyze(&activity).unwrap_err();
        assert!(matches!(err, AnalysisError::InsufficientData { required: 1000, .. }));

        config.regression.min_samples = 50;
        config.analysis.allow_suspected_reference = true;
        let analysis = AeroAnalyzer::from_config(&config).analyze(&activity).unwrap();
        assert!(matches!(
            analysis.reference.unwrap().source,
            ReferenceSource::Suspected { .. }
        ));
    }

    /// Parallel batch returns one result per activity in input order
    #[test]
    fn test_batch_analysis_order() {
        let activities: Vec<Activity> = (0..16)
            .map(|i| {
                let points = if i % 5 == 4 {
                    flat_ride(0.30).into_iter().take(10).collect()
                } else {
                    flat_ride(0.25 + i as f64 * 0.01)
                };
                Activity::new(format!("ride-{:02}", i), points)
            })
            .collect();

        let results = AeroAnalyzer::new(metric_constants()).analyze_batch(&activities);
        assert_eq!(results.len(), 16);

        for (i, result) in results.iter().enumerate() {
            if i % 5 == 4 {
                assert!(result.is_err());
            } else {
                let analysis = result.as_ref().unwrap();
                assert_eq!(analysis.activity_id, format!("ride-{:02}", i));
                let expected = 0.25 + i as f64 * 0.01;
                assert!((analysis.regression.cda_estimate_m2 - expected).abs() < 0.015);
            }
        }
    }

    /// JSON output uses the documented labels
    #[test]
    fn test_analysis_serializes_to_json() {
        let analysis = AeroAnalyzer::new(metric_constants())
            .analyze_with_reference(
                &Activity::new("json", flat_ride(0.32)),
                Some(ReferenceCda::supplied(0.40)),
            )
            .unwrap();

        let value = serde_json::to_value(&analysis).unwrap();
        assert_eq!(value["activity_id"], "json");
        assert_eq!(value["cross_validation"]["assessment"], "NEEDS_IMPROVEMENT");
        assert!(value["accuracy"].is_string());
        assert_eq!(
            value["components"].as_array().unwrap().len(),
            analysis.components.len()
        );
    }
}
