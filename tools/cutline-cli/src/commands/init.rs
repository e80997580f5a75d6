//! Initialize a new Cutline project.

use std::path::PathBuf;

use cutline_project_model::LoadedProject;

pub fn run(name: String, output: PathBuf) -> anyhow::Result<()> {
    let project_dir = output.join(&name);
    println!("Creating project '{}' at {}", name, project_dir.display());

    let loaded = LoadedProject::create(&project_dir, &name)
        .map_err(|e| anyhow::anyhow!("Failed to create project: {e}"))?;

    println!("Project created successfully:");
    println!("  Directory: {}", loaded.root.display());
    for track in &loaded.project.timeline.tracks {
        println!("  Track: {} ({:?})", track.name, track.kind);
    }
    println!();
    println!("Directory structure:");
    println!("  {}/", name);
    println!("  ├── project.json (assets and timeline)");
    println!("  ├── assets/      (imported media)");
    println!("  └── exports/     (rendered output)");

    Ok(())
}
