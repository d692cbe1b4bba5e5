//! `bitforge clean`: remove build group outputs.

use bitforge_build::Orchestrator;
use bitforge_toolchain::SystemToolchain;

use crate::project::Project;
use crate::{CleanArgs, GlobalArgs};

/// Runs the `bitforge clean` command.
pub fn run(args: &CleanArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let project = Project::load(global)?;
    let toolchain = SystemToolchain::default();

    for group in project.groups(args.group.as_deref())? {
        let removed = Orchestrator::new(&group, &toolchain).clean()?;
        if !global.quiet {
            if removed {
                eprintln!("     Removed {}", group.obj_dir.display());
            } else {
                eprintln!("     Nothing to clean for {}", group.name);
            }
        }
    }
    Ok(0)
}
