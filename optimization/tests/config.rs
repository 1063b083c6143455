use optimization::solver::{
    ConjugateDirectionMethod, MutationMethod, RecombinationMethod, SelectionMethod,
};
use optimization::{
    ConjugateGradient, EvolutionaryAlgorithm, HistoryField, HistoryReservation,
    InverseHessianApproximationMethod, LineSearchKind, Optimizer, QuasiNewtonMethod, TagDocument,
    TrainingAlgorithm, TrainingConfig, TrainingError,
};

fn unusual() -> TrainingConfig {
    TrainingConfig::builder()
        .with_line_search(LineSearchKind::GoldenSection)
        .with_bracketing_factor(1.618_033_988_749_895)
        .with_first_training_rate(0.1 + 0.2)
        .with_training_rate_tolerance(1.0 / 3.0)
        .with_warning_parameters_norm(123.456)
        .with_warning_gradient_norm(7e-300)
        .with_warning_training_rate(f64::INFINITY)
        .with_error_parameters_norm(1e308)
        .with_error_gradient_norm(2.5)
        .with_error_training_rate(1e12)
        .with_minimum_parameters_increment_norm(std::f64::consts::PI)
        .with_minimum_evaluation_improvement(1e-17)
        .with_evaluation_goal(0.0)
        .with_gradient_norm_goal(5e-324)
        .with_maximum_epochs(12345)
        .with_maximum_time(0.5)
        .with_early_stopping(true)
        .with_history(
            HistoryReservation::default()
                .with(HistoryField::Evaluation)
                .with(HistoryField::InverseHessian),
        )
        .with_display(false)
        .with_display_period(3)
        .build()
        .unwrap()
}

#[test]
fn test_default_is_valid() {
    let config = TrainingConfig::default();
    assert_eq!(TrainingConfig::builder().build().unwrap(), config);
    assert_eq!(config.line_search(), LineSearchKind::BrentMethod);
    assert_eq!(config.bracketing_factor(), 1.5);
    assert_eq!(config.maximum_epochs(), 1000);
    assert_eq!(config.reserve().reserved().count(), 0);
}

#[test]
fn test_round_trip_is_exact() {
    let config = unusual();
    let text = config.to_string();
    assert!(text.starts_with("<TrainingConfig class='TrainingConfig'>"));
    assert!(text.contains("<BracketingFactor>\n1.618033988749895\n</BracketingFactor>"));
    let loaded: TrainingConfig = text.parse().unwrap();
    assert_eq!(loaded, config);
    assert_eq!(
        loaded.first_training_rate().to_bits(),
        config.first_training_rate().to_bits()
    );
}

#[test]
fn test_round_trip_through_file() {
    let path = std::env::temp_dir().join(format!("trainer-config-{}.xml", std::process::id()));
    let config = unusual();
    config.save(&path).unwrap();
    let loaded = TrainingConfig::load(&path).unwrap();
    std::fs::remove_file(&path).unwrap();
    assert_eq!(loaded, config);
}

#[test]
fn test_unreserved_history_flags_load_as_absent() {
    let config = TrainingConfig::builder()
        .reserve_history(HistoryField::Evaluation)
        .build()
        .unwrap();
    let text = config.to_string();
    assert!(text.contains("<ReserveParametersHistory>\n0\n</ReserveParametersHistory>"));
    let loaded: TrainingConfig = text.parse().unwrap();
    assert_eq!(loaded.reserve(), config.reserve());
    assert_eq!(
        loaded.reserve().reserved().collect::<Vec<_>>(),
        vec![HistoryField::Evaluation]
    );

    let mut reserve = HistoryReservation::all();
    reserve.reserve(HistoryField::Gradient, false);
    reserve.reserve(HistoryField::Gradient, false);
    assert!(!reserve.is_reserved(HistoryField::Gradient));
    assert_eq!(reserve.reserved().count(), HistoryField::ALL.len() - 1);
    reserve.reserve(HistoryField::Gradient, true);
    assert_eq!(reserve, HistoryReservation::all());
}

#[test]
fn test_invalid_values_are_rejected() {
    let cases = vec![
        (TrainingConfig::builder().with_bracketing_factor(1.0), "bracketing_factor"),
        (TrainingConfig::builder().with_bracketing_factor(f64::NAN), "bracketing_factor"),
        (TrainingConfig::builder().with_first_training_rate(0.0), "first_training_rate"),
        (
            TrainingConfig::builder().with_training_rate_tolerance(-1e-3),
            "training_rate_tolerance",
        ),
        (TrainingConfig::builder().with_evaluation_goal(-1.0), "evaluation_goal"),
        (TrainingConfig::builder().with_maximum_time(f64::NAN), "maximum_time"),
        (TrainingConfig::builder().with_error_gradient_norm(-5.0), "error_gradient_norm"),
        (TrainingConfig::builder().with_display_period(0), "display_period"),
    ];
    for (builder, expected) in cases {
        match builder.build() {
            Err(TrainingError::InvalidConfig { field, .. }) => assert_eq!(field, expected),
            other => panic!("{} accepted: {:?}", expected, other),
        }
    }
}

#[test]
fn test_loaded_values_are_validated() {
    let text = "<TrainingConfig class='TrainingConfig'>\n<BracketingFactor>\n0.5\n</BracketingFactor>\n</TrainingConfig>\n";
    assert!(matches!(
        text.parse::<TrainingConfig>(),
        Err(TrainingError::InvalidConfig {
            field: "bracketing_factor",
            ..
        })
    ));
    let text = "<TrainingConfig class='TrainingConfig'>\n<LineSearch>\nNewton\n</LineSearch>\n</TrainingConfig>\n";
    assert!(matches!(
        text.parse::<TrainingConfig>(),
        Err(TrainingError::InvalidValue { .. })
    ));
}

#[test]
fn test_unknown_tags_are_ignored() {
    let text = "<TrainingConfig class='TrainingConfig'>\n<Colour>\nblue\n</Colour>\n<MaximumEpochsNumber>\n5\n</MaximumEpochsNumber>\n</TrainingConfig>\n";
    let config: TrainingConfig = text.parse().unwrap();
    assert_eq!(config.maximum_epochs(), 5);
    assert_eq!(config.first_training_rate(), 0.01);

    let text = "<TrainingConfig class='TrainingConfig'>\n<NeuralNetwork class='MultilayerPerceptron'>\n<Layers>\n<Size>\n3\n</Size>\n</Layers>\n</NeuralNetwork>\n<MaximumTime>\n7\n</MaximumTime>\n</TrainingConfig>\n";
    let config: TrainingConfig = text.parse().unwrap();
    assert_eq!(config.maximum_time(), 7.0);
}

#[test]
fn test_mismatched_closing_tag_is_fatal() {
    let text = "<TrainingConfig class='TrainingConfig'>\n<MaximumTime>\n5\n</MaximumEpochsNumber>\n</TrainingConfig>\n";
    assert!(matches!(
        text.parse::<TrainingConfig>(),
        Err(TrainingError::MismatchedTag { .. })
    ));
}

#[test]
fn test_algorithm_documents_dispatch_on_class() {
    let algorithms: Vec<TrainingAlgorithm> = vec![
        QuasiNewtonMethod::new(unusual())
            .with_method(InverseHessianApproximationMethod::Dfp)
            .into(),
        ConjugateGradient::new(unusual())
            .with_method(ConjugateDirectionMethod::HestenesStiefel)
            .into(),
        EvolutionaryAlgorithm::new(unusual())
            .with_population_size(8)
            .with_selection(SelectionMethod::StochasticUniversalSampling)
            .with_recombination(RecombinationMethod::Line)
            .with_mutation(MutationMethod::Uniform)
            .with_mutation_rate(0.25)
            .with_elitism(false)
            .with_seed(42)
            .into(),
    ];
    for algorithm in algorithms {
        let text = algorithm.to_document().to_string();
        let doc = TagDocument::parse(&text).unwrap();
        assert_eq!(doc.class(), Some(algorithm.name()));
        let loaded = TrainingAlgorithm::from_document(&doc).unwrap();
        assert_eq!(loaded, algorithm);
    }
}

#[test]
fn test_algorithm_settings_tags() {
    let qn = QuasiNewtonMethod::default().with_method(InverseHessianApproximationMethod::Dfp);
    let doc = qn.to_document();
    assert_eq!(doc.get("InverseHessianApproximationMethod"), Some("DFP"));
    let cg = ConjugateGradient::default();
    assert_eq!(cg.to_document().get("TrainingDirectionMethod"), Some("PolakRibiere"));
}

#[test]
fn test_unknown_class() {
    let doc = TagDocument::new("TrainingAlgorithm", Some("LevenbergMarquardt"));
    assert!(matches!(
        TrainingAlgorithm::from_document(&doc),
        Err(TrainingError::UnknownClass(class)) if class == "LevenbergMarquardt"
    ));
}

#[test]
fn test_invalid_population_in_document() {
    let mut doc = EvolutionaryAlgorithm::default().to_document();
    doc.push("Unused", 0);
    let text = doc.to_string().replace(
        "<PopulationSize>\n20\n</PopulationSize>",
        "<PopulationSize>\n5\n</PopulationSize>",
    );
    assert!(matches!(
        TrainingAlgorithm::from_document(&TagDocument::parse(&text).unwrap()),
        Err(TrainingError::InvalidConfig {
            field: "population_size",
            ..
        })
    ));
}
