//! Validate a Cutline project document.

use std::path::PathBuf;

use cutline_project_model::LoadedProject;

pub fn run(path: PathBuf) -> anyhow::Result<()> {
    println!("Validating project at: {}", path.display());

    let loaded = LoadedProject::load(&path)
        .map_err(|e| anyhow::anyhow!("Failed to load project: {e}"))?;

    println!("  Title: {}", loaded.project.title);
    println!("  Version: {}", loaded.project.version);
    println!("  Tracks: {}", loaded.project.timeline.tracks.len());
    println!("  Items: {}", loaded.project.timeline.item_count());

    // Model invariants first, then asset reachability.
    let mut issues = loaded.project.validate();
    issues.extend(loaded.validate_assets());

    if issues.is_empty() {
        println!("  Assets: all reachable");
        println!("\nProject is valid.");
    } else {
        println!("\nValidation issues:");
        for issue in &issues {
            println!("  - {issue}");
        }
        println!(
            "\n{} issue(s) found. Project may not be fully usable.",
            issues.len()
        );
    }

    Ok(())
}
