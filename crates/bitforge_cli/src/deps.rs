//! `bitforge deps`: print the recorded header set of every source.

use bitforge_build::Orchestrator;
use bitforge_common::{HeaderSet, SourceFile};
use bitforge_toolchain::SystemToolchain;

use crate::project::Project;
use crate::{DepsArgs, GlobalArgs};

/// Runs the `bitforge deps` command.
pub fn run(args: &DepsArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let project = Project::load(global)?;

    for group in project.groups(args.group.as_deref())? {
        let toolchain = SystemToolchain::new(group.llvm_dir.clone());
        let orchestrator = Orchestrator::new(&group, &toolchain);

        if args.refresh {
            match orchestrator.extract_dependencies() {
                Ok(refreshed) => {
                    if !global.quiet {
                        eprintln!("   Refreshed {} record(s) in {}", refreshed.len(), group.name);
                    }
                }
                Err(e) => {
                    eprintln!("error: group '{}' failed: {e}", group.name);
                    return Ok(1);
                }
            }
        }

        println!("[{}]", group.name);
        for (source, headers) in orchestrator.recorded_dependencies()? {
            print!("{}", render_entry(&source, headers.as_ref()));
        }
    }
    Ok(0)
}

/// The listing of one source: its path, then one indented line per header.
pub fn render_entry(source: &SourceFile, headers: Option<&HeaderSet>) -> String {
    let mut out = format!("{}\n", source.path().display());
    match headers {
        None => out.push_str("    <no record>\n"),
        Some(headers) => {
            for header in headers {
                out.push_str(&format!("    {}\n", header.display()));
            }
        }
    }
    out
}
