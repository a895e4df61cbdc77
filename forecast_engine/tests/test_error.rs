use forecast_engine::{EngineConfig, ForecastError};
use std::io;
use timeline::TimelineError;

#[test]
fn test_error_conversion() {
    let io_error = io::Error::new(io::ErrorKind::NotFound, "file not found");
    match ForecastError::from(io_error) {
        ForecastError::Io(_) => {}
        other => panic!("Expected Io variant, got {:?}", other),
    }

    let timeline_error = TimelineError::UnparseableDate {
        raw: "32/13/2024".to_string(),
    };
    let error = ForecastError::from(timeline_error);
    assert!(error.to_string().contains("32/13/2024"));

    let json_error = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
    assert!(matches!(
        ForecastError::from(json_error),
        ForecastError::Serialization(_)
    ));
}

#[test]
fn test_error_display() {
    let error = ForecastError::InsufficientHistory {
        required: 2,
        actual: 0,
    };
    assert_eq!(
        error.to_string(),
        "Insufficient history: need at least 2 observations, have 0"
    );

    let error = ForecastError::RemoteCall("connection reset".to_string());
    assert!(error.to_string().starts_with("Remote call error"));
}

#[test]
fn test_validation_classification() {
    assert!(ForecastError::Validation("x".into()).is_validation());
    assert!(ForecastError::InvalidParameter("x".into()).is_validation());
    assert!(!ForecastError::RemoteCall("x".into()).is_validation());
    assert!(!ForecastError::Synthesis("x".into()).is_validation());
}

#[test]
fn test_config_errors() {
    let err = EngineConfig::from_toml_str("[synthesis\n").unwrap_err();
    assert!(matches!(err, ForecastError::Config(_)));
}
