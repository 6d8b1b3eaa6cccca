use std::process::Command;

/// Run a git subcommand, returning trimmed stdout when it succeeds.
fn git(args: &[&str]) -> Option<String> {
    let output = Command::new("git").args(args).output().ok()?;
    output
        .status
        .success()
        .then(|| String::from_utf8_lossy(&output.stdout).trim().to_string())
}

fn main() {
    let hash = git(&["rev-parse", "--short", "HEAD"]).unwrap_or_else(|| "unknown".to_string());
    let dirty = git(&["status", "--porcelain"]).is_some_and(|status| !status.is_empty());
    let version = if dirty { format!("{hash}-dirty") } else { hash };

    println!("cargo:rustc-env=STADIUM_GIT_HASH={version}");
    for tracked in ["HEAD", "index"] {
        println!("cargo:rerun-if-changed=../../.git/{tracked}");
    }
}
