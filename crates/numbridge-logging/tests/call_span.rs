use numbridge_logging::with_call_span;

#[test]
fn with_call_span_returns_value() {
    let value = with_call_span("libsolver", "minimize", || 7);
    assert_eq!(value, 7);
    let value = with_call_span("", "", || "done");
    assert_eq!(value, "done");
}
