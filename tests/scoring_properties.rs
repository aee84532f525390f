//! Scoring Engine Property Tests
//!
//! Exercises the z-score and Mahalanobis engines through the public API
//! against small hand-built reference stores with known answers.

use nalgebra::DMatrix;
use normatep::config::NumericsConfig;
use normatep::reference::NormativeEntry;
use normatep::scoring::{self, ObservationSet};
use normatep::{
    Band, Cluster, KeyScheme, MahalanobisError, Measure, MeasurementDescriptor, NormativeConfig, Observation,
    ReferenceStore, Time, ZScoreError,
};

const TOLERANCE: f64 = 1e-9;

fn store_from_csv(stats: &str, cov: &str) -> ReferenceStore {
    ReferenceStore::from_csv_str(stats, cov, &NormativeConfig::default()).expect("valid reference tables")
}

/// Three correlated variables with non-zero means.
fn correlated_store() -> ReferenceStore {
    store_from_csv(
        "\
Variable,Normative_Mean,Normative_Std
A,1.0,2.0
B,-2.0,1.0
C,0.5,3.0
",
        "\
Variable,A,B,C
A,4.0,1.2,0.6
B,1.2,1.0,-0.3
C,0.6,-0.3,9.0
",
    )
}

// ============================================================================
// Z-score
// ============================================================================

#[test]
fn zscore_matches_formula_across_values() {
    let store = store_from_csv(
        "Variable,Normative_Mean,Normative_Std\nA,10,2\nB,-3.5,0.25\n",
        "Variable,A,B\nA,4,0\nB,0,0.0625\n",
    );
    for &(key, mean, std) in &[("A", 10.0, 2.0), ("B", -3.5, 0.25)] {
        for value in [-100.0, -1.0, 0.0, 0.3, mean, 14.0, 1e6] {
            let z = scoring::zscore(&store, key, value).unwrap();
            assert!((z - (value - mean) / std).abs() < TOLERANCE, "{key} at {value}");
        }
    }
}

#[test]
fn zscore_scenario_from_single_row_table() {
    let store = store_from_csv("Variable,Normative_Mean,Normative_Std\nA,10,2\n", "Variable,A\nA,4\n");
    assert!((scoring::zscore(&store, "A", 14.0).unwrap() - 2.0).abs() < TOLERANCE);
}

#[test]
fn zscore_zero_std_is_undefined() {
    let store = store_from_csv("Variable,Normative_Mean,Normative_Std\nB,5,0\n", "Variable,B\nB,0\n");
    assert_eq!(scoring::zscore(&store, "B", 5.0), Err(ZScoreError::Undefined("B".into())));
    assert_eq!(scoring::zscore(&store, "B", -2.0), Err(ZScoreError::Undefined("B".into())));
}

#[test]
fn zscore_unknown_key_is_not_found() {
    let store = correlated_store();
    assert_eq!(scoring::zscore(&store, "nope", 1.0), Err(ZScoreError::NotFound("nope".into())));
}

#[test]
fn score_rows_keeps_order_and_marks_failures() {
    let scheme = KeyScheme::default();
    let known = MeasurementDescriptor::new(Time::Early, Band::Alpha, Measure::Ersp, Cluster::ParietalLeft);
    let flat = MeasurementDescriptor::new(Time::Late, Band::Gamma, Measure::Nf, Cluster::ParietalRight);
    let unknown = MeasurementDescriptor::new(Time::Mid, Band::Beta, Measure::Rsp, Cluster::CentroParietalLeft);

    let entries = vec![
        NormativeEntry::for_descriptor(&scheme, known, 1.0, 0.5),
        NormativeEntry::for_descriptor(&scheme, flat, 2.0, 0.0),
    ];
    let keys = entries.iter().map(|e| e.variable.clone()).collect();
    let store = ReferenceStore::from_parts(
        scheme,
        NumericsConfig::default(),
        entries,
        keys,
        DMatrix::from_row_slice(2, 2, &[0.25, 0.0, 0.0, 0.0]),
    )
    .unwrap();

    let rows = [
        Observation::new(unknown, 3.0),
        Observation::new(known, 2.0),
        Observation::new(flat, 2.0),
        Observation::new(known, f64::INFINITY),
    ];
    let scored = scoring::score_rows(&store, &rows);

    let cells: Vec<String> = scored.iter().map(|r| r.display_score()).collect();
    assert_eq!(cells, vec!["N/A", "2.00", "undefined", "invalid"]);
    assert_eq!(scored[1].variable, "Early_Alpha_ERSP_Parietal Left");
}

// ============================================================================
// Mahalanobis
// ============================================================================

#[test]
fn d2_scenario_diagonal_covariance() {
    let store = store_from_csv(
        "Variable,Normative_Mean,Normative_Std\nA,0,2\nB,0,3\n",
        "Variable,A,B\nA,4,0\nB,0,9\n",
    );
    let subject = ObservationSet::new().with("A", 2.0).with("B", 3.0);
    assert!((scoring::d2(&store, &subject).unwrap() - 2.0).abs() < TOLERANCE);
}

#[test]
fn d2_is_zero_at_normative_mean() {
    let store = correlated_store();
    let subject = ObservationSet::new().with("A", 1.0).with("B", -2.0).with("C", 0.5);
    assert_eq!(scoring::d2(&store, &subject).unwrap(), 0.0);
}

#[test]
fn d2_ignores_observation_insertion_order() {
    let store = correlated_store();
    let forward: ObservationSet = [("A", 3.0), ("B", -1.0), ("C", 4.0)].into_iter().collect();
    let mut backward = ObservationSet::new();
    for (k, v) in [("C", 4.0), ("B", -1.0), ("A", 3.0)] {
        backward.insert(k, v);
    }
    let a = scoring::d2(&store, &forward).unwrap();
    let b = scoring::d2(&store, &backward).unwrap();
    assert!(a > 0.0);
    assert!((a - b).abs() < TOLERANCE);
}

#[test]
fn d2_matches_explicit_inverse() {
    let store = correlated_store();
    let subject = ObservationSet::new().with("A", 3.0).with("C", -1.0);

    let sigma = store.sub_covariance(&["A", "C"]).unwrap();
    let inv = sigma.try_inverse().unwrap();
    let diff = nalgebra::DVector::from_vec(vec![3.0 - 1.0, -1.0 - 0.5]);
    let expected = (diff.transpose() * inv * &diff)[(0, 0)];

    assert!((scoring::d2(&store, &subject).unwrap() - expected).abs() < TOLERANCE);
}

#[test]
fn d2_without_overlap_is_insufficient_data() {
    let store = correlated_store();
    let subject = ObservationSet::new().with("X", 1.0).with("Y", 2.0);
    assert_eq!(scoring::d2(&store, &subject), Err(MahalanobisError::InsufficientData));
}

#[test]
fn d2_with_duplicated_variable_is_singular() {
    // B is an exact copy of A
    let store = store_from_csv(
        "Variable,Normative_Mean,Normative_Std\nA,0,1\nB,0,1\nC,0,1\n",
        "Variable,A,B,C\nA,1,1,0\nB,1,1,0\nC,0,0,1\n",
    );
    let subject = ObservationSet::new().with("A", 0.5).with("B", 0.5).with("C", 0.1);
    match scoring::d2(&store, &subject) {
        Err(MahalanobisError::SingularCovariance { variables, .. }) => {
            assert_eq!(variables, vec!["A", "B", "C"]);
        }
        other => panic!("expected SingularCovariance, got {other:?}"),
    }

    // Dropping one of the pair makes the distance computable again
    let reduced = ObservationSet::new().with("A", 0.5).with("C", 0.1);
    let d2 = scoring::d2(&store, &reduced).unwrap();
    assert!((d2 - (0.25 + 0.01)).abs() < TOLERANCE);
}

#[test]
fn condition_threshold_comes_from_store_numerics() {
    let entries = vec![NormativeEntry::new("A", 0.0, 1.0), NormativeEntry::new("B", 0.0, 1.0)];
    let keys = vec!["A".to_string(), "B".to_string()];
    let cov = DMatrix::from_row_slice(2, 2, &[1.0, 0.0, 0.0, 1e-6]);
    let subject = ObservationSet::new().with("A", 1.0).with("B", 0.0);

    let lenient = ReferenceStore::from_parts(
        KeyScheme::default(),
        NumericsConfig::default(),
        entries.clone(),
        keys.clone(),
        cov.clone(),
    )
    .unwrap();
    assert!(scoring::d2(&lenient, &subject).is_ok());

    let strict = ReferenceStore::from_parts(
        KeyScheme::default(),
        NumericsConfig {
            max_condition_number: 1e3,
            ..NumericsConfig::default()
        },
        entries,
        keys,
        cov,
    )
    .unwrap();
    assert!(matches!(
        scoring::d2(&strict, &subject),
        Err(MahalanobisError::SingularCovariance { .. })
    ));
}

#[test]
fn assessment_reports_p_value_and_degrees_of_freedom() {
    let store = store_from_csv(
        "Variable,Normative_Mean,Normative_Std\nA,0,1\nB,0,1\n",
        "Variable,A,B\nA,1,0\nB,0,1\n",
    );
    let subject = ObservationSet::new().with("A", 1.0).with("B", 1.0).with("extra", 9.0);
    let a = scoring::assess(&store, &subject).unwrap();
    assert!((a.d2 - 2.0).abs() < TOLERANCE);
    assert_eq!(a.degrees_of_freedom, 2);
    assert_eq!(a.ignored, vec!["extra"]);
    // χ²(2) survival at 2 is e^-1
    assert!((a.p_value - (-1.0_f64).exp()).abs() < 1e-9);

    let json = serde_json::to_value(&a).unwrap();
    assert_eq!(json["degrees_of_freedom"], 2);
}
