//! TypeScript binding checks
//!
//! Sample, status and upload types must carry `specta::Type` when the tauri
//! feature is enabled so a desktop shell can mirror them.

#[cfg(feature = "tauri")]
#[test]
fn exported_types_implement_specta_type() {
    use specta::Type;

    fn assert_type<T: Type>() {}

    assert_type::<sensorlink::TelemetrySample>();
    assert_type::<sensorlink::ConnectionStatus>();
    assert_type::<sensorlink::Feed>();
    assert_type::<sensorlink::ImuRecord>();
}

#[cfg(not(feature = "tauri"))]
#[test]
fn tauri_feature_disabled() {
    // Types still build without specta
    let status = sensorlink::ConnectionStatus::default();
    assert!(!status.is_fully_connected());
}
