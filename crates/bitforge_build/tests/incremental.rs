//! End-to-end incremental builds against the scripted toolchain.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, UNIX_EPOCH};

use bitforge_build::{BuildError, BuildReport, Orchestrator, Phase};
use bitforge_config::{load_config_from_str, resolve_group, ResolvedGroup};
use bitforge_toolchain::{CallKind, FakeToolchain};
use tempfile::TempDir;

struct Project {
    dir: TempDir,
    toolchain: FakeToolchain,
}

impl Project {
    fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
            toolchain: FakeToolchain::new(),
        }
    }

    fn root(&self) -> &Path {
        self.dir.path()
    }

    fn group(&self, extra: &str) -> ResolvedGroup {
        let toml = format!(
            r#"
[project]
name = "rt"

[toolchain]
jobs = 4
{extra}

[groups.mm]
target = "linux_x64"
src_dirs = ["src"]
header_dirs = ["inc"]
"#
        );
        let config = load_config_from_str(&toml).unwrap();
        resolve_group(&config, self.root(), "mm").unwrap()
    }

    fn path(&self, rel: &str) -> PathBuf {
        self.root().join(rel)
    }

    fn write(&self, rel: &str, content: &str) {
        write_bumped(&self.path(rel), content);
    }

    fn build(&self, group: &ResolvedGroup) -> Result<BuildReport, BuildError> {
        self.toolchain.take_calls();
        Orchestrator::new(group, &self.toolchain).build()
    }

    fn read(&self, path: &Path) -> Vec<u8> {
        fs::read(path).unwrap()
    }
}

/// Writes `content` and gives the file a distinct modification time in the
/// past, so mtime-based detection sees every write regardless of clock
/// granularity and no input looks newer than the run reading it.
fn write_bumped(path: &Path, content: &str) {
    static TICK: AtomicU64 = AtomicU64::new(1);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
    let tick = TICK.fetch_add(1, Ordering::SeqCst);
    let file = fs::File::options().write(true).open(path).unwrap();
    file.set_modified(UNIX_EPOCH + Duration::from_secs(1_600_000_000 + tick * 10))
        .unwrap();
}

fn touch(path: &Path) {
    let content = fs::read_to_string(path).unwrap();
    write_bumped(path, &content);
}

/// Every file under `dir`, keyed by name.
fn snapshot(dir: &Path) -> BTreeMap<String, Vec<u8>> {
    fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .filter(|p| p.is_file())
        .map(|p| (p.file_name().unwrap().to_string_lossy().into_owned(), fs::read(&p).unwrap()))
        .collect()
}

fn two_units(project: &Project) {
    project.write("inc/h.h", "#define H 1\n");
    project.write("src/a.cpp", "#include \"h.h\"\nint a;\n");
    project.write("src/b.cpp", "int b;\n");
}

#[test]
fn end_to_end_scenario() {
    let project = Project::new();
    two_units(&project);
    let group = project.group("");
    let tc = &project.toolchain;

    // First build: everything runs.
    let report = project.build(&group).unwrap();
    assert_eq!(report.extracted, vec!["a", "b"]);
    assert_eq!(report.compiled, vec!["a", "b"]);
    assert!(report.linked);
    assert_eq!(
        report.phases,
        vec![Phase::ExtractDeps, Phase::CompileUnits, Phase::Link, Phase::Done]
    );
    let link_calls: Vec<_> = tc
        .calls()
        .into_iter()
        .filter(|c| c.kind == CallKind::Link)
        .collect();
    assert_eq!(link_calls.len(), 1);
    let objects = link_calls[0]
        .invocation
        .args
        .iter()
        .filter(|a| a.ends_with(".bc"))
        .count();
    assert_eq!(objects, 2);

    // Second build: nothing to do.
    let report = project.build(&group).unwrap();
    assert!(tc.calls().is_empty());
    assert_eq!(report.phases, vec![Phase::Done]);
    assert!(report.is_up_to_date());

    // Third build: the header changed.
    let b_obj = group.obj_dir.join("b.bc");
    let b_before = project.read(&b_obj);
    project.write("inc/h.h", "#define H 2\n");
    let report = project.build(&group).unwrap();
    assert_eq!(report.extracted, vec!["a"]);
    assert_eq!(report.compiled, vec!["a"]);
    assert!(report.linked);
    assert_eq!(tc.units(CallKind::Compile), vec!["a"]);
    assert_eq!(project.read(&b_obj), b_before);

    let a_obj = project.read(&group.obj_dir.join("a.bc"));
    assert!(String::from_utf8_lossy(&a_obj).contains("#define H 2"));
    let mut expected = b"; linked module\n".to_vec();
    expected.extend_from_slice(&a_obj);
    expected.extend_from_slice(&b_before);
    assert_eq!(project.read(&group.module_path), expected);
}

#[test]
fn second_build_is_byte_identical_noop() {
    let project = Project::new();
    two_units(&project);
    let group = project.group("");

    project.build(&group).unwrap();
    let objects = snapshot(&group.obj_dir);
    let module = project.read(&group.module_path);

    let report = project.build(&group).unwrap();
    assert_eq!(report.invocations(), 0);
    assert!(project.toolchain.calls().is_empty());
    assert_eq!(snapshot(&group.obj_dir), objects);
    assert_eq!(project.read(&group.module_path), module);
}

#[test]
fn header_change_leaves_unrelated_units_alone() {
    let project = Project::new();
    two_units(&project);
    project.write("inc/other.h", "int o;\n");
    project.write("src/c.cpp", "#include \"other.h\"\n");
    let group = project.group("");
    project.build(&group).unwrap();

    project.write("inc/other.h", "long o;\n");
    let report = project.build(&group).unwrap();
    assert_eq!(report.compiled, vec!["c"]);
    assert_eq!(project.toolchain.units(CallKind::Dependencies), vec!["c"]);
    assert_eq!(project.toolchain.count(CallKind::Link), 1);
}

#[test]
fn transitive_header_change_recompiles() {
    let project = Project::new();
    project.write("inc/outer.h", "#include \"inner.h\"\n");
    project.write("inc/inner.h", "int i;\n");
    project.write("src/a.cpp", "#include \"outer.h\"\n");
    project.write("src/b.cpp", "int b;\n");
    let group = project.group("");
    project.build(&group).unwrap();

    project.write("inc/inner.h", "long i;\n");
    let report = project.build(&group).unwrap();
    assert_eq!(report.compiled, vec!["a"]);
}

#[test]
fn deleted_header_recompiles_against_fallback() {
    let project = Project::new();
    project.write("inc1/h.h", "int first;\n");
    project.write("inc2/h.h", "int second;\n");
    project.write("src/a.c", "#include \"h.h\"\n");
    let toml = r#"
[project]
name = "rt"

[groups.mm]
target = "linux_x64"
src_dirs = ["src"]
header_dirs = ["inc1", "inc2"]
"#;
    let config = load_config_from_str(toml).unwrap();
    let group = resolve_group(&config, project.root(), "mm").unwrap();

    project.build(&group).unwrap();
    let record = fs::read_to_string(group.obj_dir.join("a.dep")).unwrap();
    assert_eq!(record, project.path("inc1/h.h").display().to_string());

    fs::remove_file(project.path("inc1/h.h")).unwrap();
    let report = project.build(&group).unwrap();
    assert_eq!(report.extracted, vec!["a"]);
    assert_eq!(report.compiled, vec!["a"]);
    let record = fs::read_to_string(group.obj_dir.join("a.dep")).unwrap();
    assert_eq!(record, project.path("inc2/h.h").display().to_string());
    let object = project.read(&group.obj_dir.join("a.bc"));
    assert!(String::from_utf8_lossy(&object).contains("int second;"));
}

#[test]
fn malformed_listing_aborts_and_keeps_record() {
    let project = Project::new();
    two_units(&project);
    let group = project.group("");
    project.build(&group).unwrap();
    let record = project.read(&group.obj_dir.join("a.dep"));
    let module = project.read(&group.module_path);

    touch(&project.path("src/a.cpp"));
    project.toolchain.emit_malformed_dependencies("a");
    let err = project.build(&group).unwrap_err();
    assert!(matches!(err, BuildError::MalformedDependencyOutput(_)));
    assert_eq!(project.read(&group.obj_dir.join("a.dep")), record);
    assert_eq!(project.toolchain.count(CallKind::Compile), 0);
    assert_eq!(project.toolchain.count(CallKind::Link), 0);
    assert_eq!(project.read(&group.module_path), module);

    project.toolchain.clear_failures();
    let report = project.build(&group).unwrap();
    assert_eq!(report.extracted, vec!["a"]);
    assert_eq!(report.compiled, vec!["a"]);
    assert!(report.linked);
}

#[test]
fn compile_failure_keeps_object_and_blocks_link() {
    let project = Project::new();
    two_units(&project);
    let group = project.group("");
    project.build(&group).unwrap();
    let b_obj = group.obj_dir.join("b.bc");
    let b_before = project.read(&b_obj);
    let module = project.read(&group.module_path);

    project.write("src/a.cpp", "#include \"h.h\"\nint a2;\n");
    project.write("src/b.cpp", "int b2;\n");
    project.toolchain.fail_unit("b");
    let err = project.build(&group).unwrap_err();
    match err {
        BuildError::Tool(e) => assert!(e.to_string().contains("injected failure")),
        other => panic!("unexpected error: {other}"),
    }
    // The sibling still finished; the link never started.
    assert_eq!(project.toolchain.units(CallKind::Compile), vec!["a", "b"]);
    assert_eq!(project.toolchain.count(CallKind::Link), 0);
    assert_eq!(project.read(&b_obj), b_before);
    assert!(!group.obj_dir.join("b.bc.tmp").exists());
    assert_eq!(project.read(&group.module_path), module);

    project.toolchain.clear_failures();
    let report = project.build(&group).unwrap();
    assert_eq!(report.compiled, vec!["b"]);
    assert!(report.linked);
    assert!(String::from_utf8_lossy(&project.read(&b_obj)).contains("int b2;"));
}

#[test]
fn link_failure_leaves_no_module() {
    let project = Project::new();
    two_units(&project);
    let group = project.group("");

    project.toolchain.set_fail_link(true);
    let err = project.build(&group).unwrap_err();
    assert!(matches!(err, BuildError::Tool(_)));
    assert!(!group.module_path.exists());
    assert!(!group.module_path.with_file_name("mm.bc.tmp").exists());

    project.toolchain.clear_failures();
    let report = project.build(&group).unwrap();
    assert!(report.compiled.is_empty());
    assert!(report.linked);
    assert_eq!(report.phases, vec![Phase::Link, Phase::Done]);
    assert!(group.module_path.is_file());
}

#[test]
fn removed_source_is_pruned_and_module_matches_clean_build() {
    let project = Project::new();
    two_units(&project);
    let group = project.group("");
    project.build(&group).unwrap();

    fs::remove_file(project.path("src/b.cpp")).unwrap();
    let report = project.build(&group).unwrap();
    assert_eq!(report.pruned, vec!["b"]);
    assert!(report.compiled.is_empty());
    assert!(report.linked);
    assert!(!group.obj_dir.join("b.bc").exists());
    assert!(!group.obj_dir.join("b.bc.stamp").exists());
    assert!(group.obj_dir.join("b.dep").is_file());
    let incremental = project.read(&group.module_path);

    Orchestrator::new(&group, &project.toolchain).clean().unwrap();
    project.build(&group).unwrap();
    assert_eq!(project.read(&group.module_path), incremental);
}

#[test]
fn removing_every_source_removes_module() {
    let project = Project::new();
    project.write("src/a.c", "int a;\n");
    let group = project.group("");
    project.build(&group).unwrap();
    assert!(group.module_path.exists());

    fs::remove_file(project.path("src/a.c")).unwrap();
    let report = project.build(&group).unwrap();
    assert_eq!(report.pruned, vec!["a"]);
    assert!(!group.module_path.exists());
}

#[test]
fn added_source_is_built_and_linked() {
    let project = Project::new();
    two_units(&project);
    let group = project.group("");
    project.build(&group).unwrap();

    project.write("src/c.c", "int c;\n");
    let report = project.build(&group).unwrap();
    assert_eq!(report.compiled, vec!["c"]);
    assert!(report.linked);
}

#[test]
fn flag_change_rebuilds_everything() {
    let project = Project::new();
    two_units(&project);
    project.build(&project.group("")).unwrap();

    let toml = r#"
[project]
name = "rt"

[toolchain]
jobs = 4

[groups.mm]
target = "linux_x64"
src_dirs = ["src"]
header_dirs = ["inc"]
compiler_args = ["-DNDEBUG"]
"#;
    let config = load_config_from_str(toml).unwrap();
    let group = resolve_group(&config, project.root(), "mm").unwrap();
    let report = project.build(&group).unwrap();
    assert_eq!(report.extracted, vec!["a", "b"]);
    assert_eq!(report.compiled, vec!["a", "b"]);
    assert!(report.linked);
}

#[test]
fn skip_link_produces_objects_only() {
    let project = Project::new();
    two_units(&project);
    let mut group = project.group("");
    group.skip_link = true;

    let report = project.build(&group).unwrap();
    assert_eq!(report.compiled, vec!["a", "b"]);
    assert!(!report.linked);
    assert!(report.module.is_none());
    assert!(!group.module_path.exists());
    assert_eq!(project.toolchain.count(CallKind::Link), 0);
    assert!(group.obj_dir.join("a.bc").is_file());
}

#[test]
fn mtime_detection_rebuilds_on_touch() {
    let project = Project::new();
    two_units(&project);
    let group = project.group("change_detection = \"mtime\"");
    project.build(&group).unwrap();

    touch(&project.path("inc/h.h"));
    let report = project.build(&group).unwrap();
    assert_eq!(report.compiled, vec!["a"]);
}

#[test]
fn content_detection_ignores_touch() {
    let project = Project::new();
    two_units(&project);
    let group = project.group("change_detection = \"content\"");
    project.build(&group).unwrap();

    touch(&project.path("inc/h.h"));
    touch(&project.path("src/b.cpp"));
    let report = project.build(&group).unwrap();
    assert!(report.is_up_to_date());

    project.write("inc/h.h", "#define H 3\n");
    let report = project.build(&group).unwrap();
    assert_eq!(report.compiled, vec!["a"]);
    assert!(report.linked);
}

#[test]
fn single_worker_matches_parallel_build() {
    let serial = Project::new();
    two_units(&serial);
    let mut group = serial.group("");
    group.jobs = Some(1);
    serial.build(&group).unwrap();

    let parallel = Project::new();
    two_units(&parallel);
    let group_parallel = parallel.group("");
    parallel.build(&group_parallel).unwrap();

    assert_eq!(
        serial.read(&group.module_path),
        parallel.read(&group_parallel.module_path)
    );
}
