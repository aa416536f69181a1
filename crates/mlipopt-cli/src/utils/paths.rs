use std::path::{Path, PathBuf};

/// `<stem><suffix>.<extension>` next to `path`.
fn sibling(path: &Path, suffix: &str, extension: &str) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    path.with_file_name(format!("{stem}{suffix}.{extension}"))
}

/// Default ensemble output for `cluster`: `<input stem>_clustered.xyz` beside the input.
pub fn clustered_output(input: &Path) -> PathBuf {
    sibling(input, "_clustered", "xyz")
}

/// Default report path: `<output stem>_summary.csv` beside the output.
pub fn summary_output(output: &Path) -> PathBuf {
    sibling(output, "_summary", "csv")
}
