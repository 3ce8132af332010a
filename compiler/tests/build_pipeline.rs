#![cfg(feature = "pipeline")]

use oneview_compiler::pipeline::registry_path;
use oneview_compiler::{BuildOptions, BuildPipeline, CompileOptions, ContextSpec, WatchState};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

struct Project {
    _dir: tempfile::TempDir,
    root: PathBuf,
}

impl Project {
    fn new() -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = dir.path().to_path_buf();
        Self { _dir: dir, root }
    }

    fn write(&self, relative: &str, contents: &str) {
        let path = self.root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    fn web(&self) -> ContextSpec {
        ContextSpec::new(
            "web",
            vec![
                self.root.join("views/web"),
                self.root.join("views/_system"),
            ],
            self.root.join("ts/views/web"),
        )
    }

    fn path(&self, relative: &str) -> PathBuf {
        self.root.join(relative)
    }
}

fn pipeline(project: &Project, options: BuildOptions) -> BuildPipeline {
    BuildPipeline::new([project.web()], options)
}

fn read(path: &Path) -> String {
    fs::read_to_string(path).unwrap_or_else(|err| panic!("reading {}: {err}", path.display()))
}

#[test]
fn test_second_build_is_a_no_op() {
    let project = Project::new();
    project.write("views/web/pages/home.blade.php", "<h1>@out($title)</h1>");
    project.write("views/web/components/button.blade.php", "<button @attr('id', $id)></button>");

    let first = pipeline(&project, BuildOptions::default()).build_all();
    assert!(first.is_success(), "first build failed: {:?}", first.contexts);
    assert_eq!(first.compiled(), 2);

    let registry = registry_path(&project.web());
    let before = read(&registry);

    let second = pipeline(&project, BuildOptions::default()).build_all();
    assert_eq!(second.compiled(), 0, "nothing changed, nothing to compile");
    assert_eq!(second.skipped(), 2);
    assert_eq!(read(&registry), before, "registry must be byte-identical");
}

#[test]
fn test_registry_lists_context_views() {
    let project = Project::new();
    project.write("views/web/pages/home.blade.php", "<h1>Home</h1>");
    project.write("views/web/components/button.blade.php", "<button></button>");

    let report = pipeline(&project, BuildOptions::default()).build_all();
    let registry_file = report.contexts[0].registry.clone().expect("registry written");
    assert_eq!(registry_file, project.path("ts/views/registry.web.ts"));

    let registry = read(&registry_file);
    let main_start = registry.find("export const mainViews").expect("main group");
    let main_end = main_start + registry[main_start..].find("};").unwrap();
    let main_group = &registry[main_start..main_end];

    assert_eq!(main_group.matches("() => import(").count(), 2);
    assert!(main_group.contains("\"pages.home\": () => import(\"./web/pages/home\")"));
    assert!(main_group.contains("\"components.button\": () => import(\"./web/components/button\")"));
    assert!(registry.contains("throw new Error(`View not found: ${name}`);"));
    let load_view = &registry[registry.find("export async function loadView").unwrap()..];
    assert!(load_view.contains("return module.default;"));
    assert!(project.path("ts/views/web/pages/home.ts").exists());
}

#[test]
fn test_shared_root_compiles_beside_context_output() {
    let project = Project::new();
    project.write("views/web/pages/home.blade.php", "home");
    project.write("views/_system/errors/404.blade.php", "missing");

    let report = pipeline(&project, BuildOptions::default()).build_all();
    assert_eq!(report.compiled(), 2);
    assert!(project.path("ts/views/_system/errors/404.ts").exists());

    let registry = read(&registry_path(&project.web()));
    assert!(registry.contains("export const systemViews: ViewRegistry"));
    assert!(registry.contains("\"errors.404\": () => import(\"./_system/errors/404\")"));
    assert!(registry.contains("  ...mainViews,\n  ...systemViews,\n"));
}

#[test]
fn test_force_rebuild_cleans_orphans() {
    let project = Project::new();
    project.write("views/web/pages/home.blade.php", "home");
    project.write("ts/views/web/old/gone.ts", "stale");
    project.write("ts/views/web/index.ts", "keep");

    let report = pipeline(&project, BuildOptions::default().with_force(true)).build_all();
    assert_eq!(report.compiled(), 1);
    assert!(!project.path("ts/views/web/old").exists());
    assert!(project.path("ts/views/web/index.ts").exists());
    let cleanup = report.contexts[0].cleanup.expect("cleanup ran");
    assert_eq!(cleanup.files_removed, 1);
}

#[test]
fn test_file_errors_do_not_stop_the_batch() {
    let project = Project::new();
    project.write("views/web/a.blade.php", "ok");
    fs::create_dir_all(project.path("views/web")).unwrap();
    fs::write(project.path("views/web/b.blade.php"), [0xff, 0xfe, 0x00]).unwrap();
    project.write("views/web/c.blade.php", "ok");

    let report = pipeline(&project, BuildOptions::default()).build_all();
    assert_eq!(report.compiled(), 2);
    assert_eq!(report.error_count(), 1);
    assert!(report.contexts[0].errors[0].message.contains("UTF-8"));
}

#[test]
fn test_source_maps_are_written_next_to_modules() {
    let project = Project::new();
    project.write("views/web/pages/home.blade.php", "<p>@out($x)</p>");

    let options = BuildOptions::default()
        .with_compile_options(CompileOptions::new().with_source_map(true));
    pipeline(&project, options).build_all();

    let map = read(&project.path("ts/views/web/pages/home.ts.map"));
    let value: serde_json::Value = serde_json::from_str(&map).unwrap();
    assert_eq!(value["mappings"][0]["directive"], "out");
    assert_eq!(value["mappings"][0]["source_offset"], 3);
}

#[test]
fn test_watch_recompiles_only_modified_file() {
    let project = Project::new();
    project.write("views/web/pages/home.blade.php", "<h1>@out($title)</h1>");
    project.write("views/web/components/button.blade.php", "<button></button>");

    let pipeline = pipeline(&project, BuildOptions::default());
    let mut state = WatchState::new();

    let first = pipeline.tick(&mut state, &["web"]);
    assert_eq!(first.compiled.len(), 2, "first sight counts as changed");
    assert_eq!(first.registries.len(), 1);

    let idle = pipeline.tick(&mut state, &["web"]);
    assert!(idle.is_idle());

    project.write("views/web/pages/home.blade.php", "<h2>@out($title)</h2>");
    let second = pipeline.tick(&mut state, &["web"]);
    assert_eq!(
        second.compiled,
        vec![project.path("views/web/pages/home.blade.php")]
    );
    assert_eq!(second.registries, vec![registry_path(&project.web())]);
    assert!(read(&project.path("ts/views/web/pages/home.ts")).contains("<h2>"));
}

#[test]
fn test_watch_new_shared_view_reaches_every_context_registry() {
    let project = Project::new();
    project.write("views/admin/dashboard.blade.php", "admin");
    project.write("views/web/pages/home.blade.php", "home");
    project.write("views/_system/errors/500.blade.php", "oops");

    let admin = ContextSpec::new(
        "admin",
        vec![
            project.path("views/admin"),
            project.path("views/_system"),
        ],
        project.path("ts/views/admin"),
    );
    let pipeline = BuildPipeline::new([admin.clone(), project.web()], BuildOptions::default());
    let mut state = WatchState::new();

    let first = pipeline.tick(&mut state, &["admin", "web"]);
    assert_eq!(first.registries.len(), 2);

    project.write("views/_system/errors/404.blade.php", "missing");
    let tick = pipeline.tick(&mut state, &["admin", "web"]);
    assert_eq!(
        tick.compiled,
        vec![project.path("views/_system/errors/404.blade.php")]
    );
    assert_eq!(
        tick.registries,
        vec![registry_path(&admin), registry_path(&project.web())]
    );
    assert!(read(&registry_path(&admin)).contains("\"errors.404\""));
    assert!(read(&registry_path(&project.web())).contains("\"errors.404\""));
}

#[test]
fn test_watch_loop_stops_when_cancelled() {
    let project = Project::new();
    project.write("views/web/pages/home.blade.php", "home");

    let pipeline = pipeline(&project, BuildOptions::default());
    let cancel = AtomicBool::new(false);
    let mut ticks = 0;

    pipeline.watch(&["web"], Duration::from_millis(1), &cancel, |tick| {
        ticks += 1;
        if ticks == 1 {
            assert_eq!(tick.compiled.len(), 1);
        }
        if ticks == 3 {
            cancel.store(true, Ordering::SeqCst);
        }
    });

    assert_eq!(ticks, 3);
}
