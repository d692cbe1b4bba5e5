//! `bitforge build`: bring every selected group up to date.

use std::path::Path;

use bitforge_build::{BuildReport, Orchestrator};
use bitforge_config::ResolvedGroup;
use bitforge_toolchain::SystemToolchain;

use crate::project::Project;
use crate::{BuildArgs, GlobalArgs, ReportFormat};

/// Runs the `bitforge build` command.
///
/// Groups are built one after another; the first failing group stops the
/// command with exit code 1 after its diagnostics are printed.
pub fn run(args: &BuildArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let project = Project::load(global)?;
    let groups = project.groups(args.group.as_deref())?;
    tracing::debug!(root = %project.root.display(), groups = groups.len(), "loaded project");

    if !global.quiet {
        eprintln!("   Building {}", project.config.project.name);
    }

    let mut reports = Vec::with_capacity(groups.len());
    for mut group in groups {
        apply_overrides(&mut group, args);
        let toolchain = SystemToolchain::new(group.llvm_dir.clone());
        match Orchestrator::new(&group, &toolchain).build() {
            Ok(report) => {
                if !global.quiet && args.format == ReportFormat::Text {
                    eprintln!("{}", render_text(&report, &group.project_root));
                }
                reports.push(report);
            }
            Err(e) => {
                eprintln!("error: group '{}' failed: {e}", group.name);
                return Ok(1);
            }
        }
    }

    if args.format == ReportFormat::Json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    }
    Ok(0)
}

/// Applies command-line overrides to a resolved group.
pub fn apply_overrides(group: &mut ResolvedGroup, args: &BuildArgs) {
    if args.skip_link {
        group.skip_link = true;
    }
    if let Some(jobs) = args.jobs {
        group.jobs = Some(jobs);
    }
}

/// One-line summary of a group build. The module path is shown relative to
/// `root` when it lies inside the project.
pub fn render_text(report: &BuildReport, root: &Path) -> String {
    if report.is_up_to_date() {
        return format!("  Up-to-date {} ({} sources)", report.group, report.sources);
    }
    let mut parts = vec![
        format!("{} extracted", report.extracted.len()),
        format!("{} compiled", report.compiled.len()),
    ];
    if !report.pruned.is_empty() {
        parts.push(format!("{} pruned", report.pruned.len()));
    }
    if report.linked {
        if let Some(module) = &report.module {
            let shown = module.strip_prefix(root).unwrap_or(module);
            parts.push(format!("linked {}", shown.display()));
        }
    }
    format!("    Finished {}: {}", report.group, parts.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bitforge_build::Phase;
    use bitforge_config::{load_config_from_str, resolve_group};
    use std::path::PathBuf;

    fn args(skip_link: bool, jobs: Option<usize>) -> BuildArgs {
        BuildArgs {
            group: None,
            jobs,
            skip_link,
            format: ReportFormat::Text,
        }
    }

    #[test]
    fn overrides_apply() {
        let config = load_config_from_str(
            "[project]\nname = \"rt\"\n\n[toolchain]\njobs = 2\n\n[groups.mm]\ntarget = \"linux_x64\"\n",
        )
        .unwrap();
        let mut group = resolve_group(&config, Path::new("/p"), "mm").unwrap();
        apply_overrides(&mut group, &args(false, None));
        assert!(!group.skip_link);
        assert_eq!(group.jobs, Some(2));

        apply_overrides(&mut group, &args(true, Some(6)));
        assert!(group.skip_link);
        assert_eq!(group.jobs, Some(6));
    }

    #[test]
    fn render_up_to_date() {
        let report = BuildReport {
            group: "mm".to_string(),
            sources: 3,
            phases: vec![Phase::Done],
            ..Default::default()
        };
        assert_eq!(
            render_text(&report, Path::new("/p")),
            "  Up-to-date mm (3 sources)"
        );
    }

    #[test]
    fn render_rebuilt() {
        let report = BuildReport {
            group: "mm".to_string(),
            sources: 2,
            phases: vec![Phase::ExtractDeps, Phase::CompileUnits, Phase::Link, Phase::Done],
            extracted: vec!["a".to_string()],
            compiled: vec!["a".to_string()],
            pruned: vec!["old".to_string()],
            linked: true,
            module: Some(PathBuf::from("/p/build/bitcode/mm.bc")),
        };
        assert_eq!(
            render_text(&report, Path::new("/p")),
            "    Finished mm: 1 extracted, 1 compiled, 1 pruned, linked build/bitcode/mm.bc"
        );
        assert_eq!(
            render_text(&report, Path::new("/elsewhere")),
            "    Finished mm: 1 extracted, 1 compiled, 1 pruned, linked /p/build/bitcode/mm.bc"
        );
    }
}
