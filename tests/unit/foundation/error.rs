use super::*;

#[test]
fn display_prefixes_are_stable() {
    assert!(
        CompileError::validation("x")
            .to_string()
            .contains("validation error:")
    );
    assert!(
        CompileError::track_creation("x")
            .to_string()
            .contains("track creation failed:")
    );
    assert!(
        CompileError::clip_load("clip.mp4", "gone")
            .to_string()
            .contains("clip load failed for 'clip.mp4': gone")
    );
    assert!(CompileError::export("x").to_string().contains("export failed:"));
    assert!(
        CompileError::image("x")
            .to_string()
            .contains("image load failed:")
    );
}

#[test]
fn other_preserves_source() {
    let base = std::io::Error::other("boom");
    let err = CompileError::Other(anyhow::Error::new(base));
    assert!(err.to_string().contains("boom"));
}

#[test]
fn wrap_export_keeps_export_and_cancel() {
    assert!(matches!(
        CompileError::wrap_export(CompileError::export("a")),
        CompileError::ExportFailed(m) if m == "a"
    ));
    assert!(matches!(
        CompileError::wrap_export(CompileError::Cancelled),
        CompileError::Cancelled
    ));
    assert!(matches!(
        CompileError::wrap_export(CompileError::validation("bad")),
        CompileError::ExportFailed(m) if m.contains("validation error: bad")
    ));
}
