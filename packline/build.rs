use grev::git_revision_auto;
use std::path::Path;

fn main() {
    let manifest_dir = std::env::var("CARGO_MANIFEST_DIR").unwrap_or_else(|_| ".".to_string());
    let workspace = Path::new(&manifest_dir).parent().unwrap_or(Path::new("."));

    let revision = match git_revision_auto(workspace) {
        Ok(Some(revision)) => revision,
        Ok(None) => "unknown".to_string(),
        Err(e) => {
            println!("cargo:warning=could not read git revision: {e}");
            "unknown".to_string()
        }
    };
    println!("cargo:rustc-env=GIT_REVISION={revision}");
}
