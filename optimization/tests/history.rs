mod common;

use common::{quiet, Paraboloid};
use optimization::{
    GradientDescent, HistoryField, HistoryReservation, NewtonMethod, Optimizer, TagDocument,
    TrainingHistory,
};

#[test]
fn test_only_reserved_columns_are_allocated() {
    let reserve = HistoryReservation::default()
        .with(HistoryField::Evaluation)
        .with(HistoryField::TrainingRate);
    let history = TrainingHistory::new(&reserve, Some(50));
    for field in HistoryField::ALL.iter() {
        let expected = *field == HistoryField::Evaluation || *field == HistoryField::TrainingRate;
        assert_eq!(history.is_reserved(*field), expected);
        assert_eq!(history.len(*field), 0);
    }
    assert!(history.gradient().is_none());
    assert_eq!(history.evaluation(), Some(&[][..]));
}

#[test]
fn test_one_entry_per_epoch() {
    let mut p = Paraboloid::weighted(&[1.0, 3.0, 0.5], &[1.0, -1.0, 2.0]);
    let config = quiet()
        .to_builder()
        .with_maximum_epochs(4)
        .with_history(HistoryReservation::all())
        .build()
        .unwrap();
    let mut gd = GradientDescent::new(config);
    let results = gd.train(&mut p).unwrap();
    assert_eq!(results.epochs, 4);
    let history = gd.history();
    for field in [
        HistoryField::Parameters,
        HistoryField::ParametersNorm,
        HistoryField::Evaluation,
        HistoryField::Gradient,
        HistoryField::GradientNorm,
        HistoryField::TrainingDirection,
        HistoryField::TrainingRate,
        HistoryField::ElapsedTime,
    ]
    .iter()
    {
        assert_eq!(history.len(*field), 4, "{}", field.name());
    }
    // steepest descent keeps no approximation, no validation data, no population
    assert_eq!(history.len(HistoryField::InverseHessian), 0);
    assert_eq!(history.len(HistoryField::ValidationError), 0);
    assert_eq!(history.len(HistoryField::MeanEvaluation), 0);

    let evaluations = history.evaluation().unwrap();
    assert!(evaluations.windows(2).all(|w| w[1] <= w[0]));
    assert_eq!(*evaluations.last().unwrap(), results.evaluation);
    assert_eq!(history.parameters().unwrap()[3], results.parameters);
}

#[test]
fn test_history_is_replaced_by_the_next_run() {
    let mut p = Paraboloid::sum_squares(&[2.0, 2.0]);
    let config = quiet()
        .to_builder()
        .with_maximum_epochs(3)
        .reserve_history(HistoryField::Evaluation)
        .build()
        .unwrap();
    let mut gd = GradientDescent::new(config.clone());
    gd.train(&mut p).unwrap();
    gd.configure(config.to_builder().with_maximum_epochs(1).build().unwrap());
    gd.train(&mut p).unwrap();
    assert_eq!(gd.history().len(HistoryField::Evaluation), 1);
}

#[test]
fn test_export_format() {
    let mut p = Paraboloid::sum_squares(&[1.0, 1.0]);
    let config = quiet()
        .to_builder()
        .with_maximum_epochs(1)
        .reserve_history(HistoryField::Parameters)
        .reserve_history(HistoryField::InverseHessian)
        .build()
        .unwrap();
    let mut newton = NewtonMethod::new(config);
    newton.train(&mut p).unwrap();

    let text = newton.history().to_document().to_string();
    let doc = TagDocument::parse(&text).unwrap();
    assert_eq!(doc.name(), "TrainingHistory");
    let tags: Vec<&str> = doc.elements().iter().map(|(t, _)| t.as_str()).collect();
    assert_eq!(tags, vec!["ParametersHistory", "InverseHessianHistory"]);
    let inverse_hessian: Vec<f64> = doc
        .get("InverseHessianHistory")
        .unwrap()
        .split_whitespace()
        .map(|v| v.parse().unwrap())
        .collect();
    assert_eq!(inverse_hessian, vec![0.5, 0.0, 0.0, 0.5]);
    let parameters = doc.get("ParametersHistory").unwrap();
    assert_eq!(parameters.lines().count(), 1);
    assert_eq!(parameters.split_whitespace().count(), 2);
}
