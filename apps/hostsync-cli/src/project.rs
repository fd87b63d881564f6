//! Local project layout: requirement checks and template scaffolding.

use std::path::Path;

use anyhow::Context;

/// Content of the scaffolded asset.
pub const HELLO_ASSET: &str = "hello world\n";

/// Content of the scaffolded cloud code entry point.
pub const HELLO_CLOUD_CODE: &str =
    "Parse.Cloud.define(\"hello\", function(request, response) { response.success(\"world\"); });\n";

/// Cloud code entry point every code root must contain.
pub const ENTRY_POINT: &str = "main.js";

/// True when both roots are directories and the code root holds
/// `main.js`.
pub fn meets_requirements(code_root: &Path, asset_root: &Path) -> bool {
    code_root.is_dir() && asset_root.is_dir() && code_root.join(ENTRY_POINT).is_file()
}

/// Outcome of [`generate_template`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scaffold {
    Created,
    /// A root already exists; nothing was written.
    Refused,
}

/// Creates both roots with a hello-world asset and cloud function.
///
/// Refuses when either root already exists, so existing work is never
/// overwritten.
pub fn generate_template(code_root: &Path, asset_root: &Path) -> anyhow::Result<Scaffold> {
    if code_root.exists() || asset_root.exists() {
        return Ok(Scaffold::Refused);
    }

    std::fs::create_dir_all(asset_root)
        .with_context(|| format!("creating {}", asset_root.display()))?;
    std::fs::write(asset_root.join("hello.txt"), HELLO_ASSET)?;

    std::fs::create_dir_all(code_root)
        .with_context(|| format!("creating {}", code_root.display()))?;
    std::fs::write(code_root.join(ENTRY_POINT), HELLO_CLOUD_CODE)?;

    tracing::debug!(
        code_root = %code_root.display(),
        asset_root = %asset_root.display(),
        "template generated"
    );
    Ok(Scaffold::Created)
}
