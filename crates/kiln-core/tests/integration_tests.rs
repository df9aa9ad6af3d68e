//! Integration tests for kiln-core: catalog → rules → validation → install.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};

use kiln_core::application::ApplicationError;
use kiln_core::prelude::*;

#[derive(Default)]
struct Disk {
    files: RwLock<BTreeMap<PathBuf, String>>,
}

impl Disk {
    fn with(files: &[(&str, &str)]) -> Arc<Self> {
        let disk = Self::default();
        for (path, content) in files {
            disk.files
                .write()
                .unwrap()
                .insert(PathBuf::from(path), content.to_string());
        }
        Arc::new(disk)
    }

    fn get(&self, path: &str) -> Option<String> {
        self.files.read().unwrap().get(Path::new(path)).cloned()
    }
}

impl Filesystem for Disk {
    fn read_to_string(&self, path: &Path) -> KilnResult<String> {
        self.get(&path.to_string_lossy()).ok_or_else(|| {
            ApplicationError::FileNotFound {
                path: path.to_path_buf(),
            }
            .into()
        })
    }

    fn write_file(&self, path: &Path, content: &str) -> KilnResult<()> {
        self.files
            .write()
            .unwrap()
            .insert(path.to_path_buf(), content.to_string());
        Ok(())
    }

    fn remove_file(&self, path: &Path) -> KilnResult<()> {
        self.files
            .write()
            .unwrap()
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| {
                ApplicationError::FileNotFound {
                    path: path.to_path_buf(),
                }
                .into()
            })
    }

    fn exists(&self, path: &Path) -> bool {
        self.files.read().unwrap().contains_key(path)
    }

    fn create_dir_all(&self, _path: &Path) -> KilnResult<()> {
        Ok(())
    }
}

#[derive(Default)]
struct Recorder {
    calls: Mutex<Vec<Vec<String>>>,
}

impl PackageInstaller for Recorder {
    fn install(&self, request: &PackageInstallRequest) -> KilnResult<()> {
        self.calls.lock().unwrap().push(request.command_line());
        Ok(())
    }
}

/// Adds a CSS import to the entry file and creates the stylesheet.
struct Tailwind(PluginDescriptor);

impl Plugin for Tailwind {
    fn descriptor(&self) -> &PluginDescriptor {
        &self.0
    }

    fn install(&self, _env: &mut LifecycleEnv<'_>) -> KilnResult<InstallOutcome> {
        Ok(InstallOutcome::packages(
            PackageSet::new().dev_dependency("tailwindcss", "^4.0.0"),
        ))
    }

    fn configure(&self, env: &mut LifecycleEnv<'_>) -> KilnResult<ConfigureOutcome> {
        let entry = format!("{}/main.{}", env.ctx.src_dir(), env.ctx.component_ext());
        env.writer.insert_before(&entry, "import App", "import './index.css'")?;
        Ok(ConfigureOutcome::files(vec![FileOperation::create(
            env.writer.resolve("src/index.css"),
            "@import \"tailwindcss\";\n",
        )]))
    }
}

/// Always fails while configuring, after writing a file.
struct Broken(PluginDescriptor);

impl Plugin for Broken {
    fn descriptor(&self) -> &PluginDescriptor {
        &self.0
    }

    fn install(&self, _env: &mut LifecycleEnv<'_>) -> KilnResult<InstallOutcome> {
        Ok(InstallOutcome::packages(PackageSet::new()))
    }

    fn configure(&self, env: &mut LifecycleEnv<'_>) -> KilnResult<ConfigureOutcome> {
        env.writer.write_file("vite.config.ts", "broken")?;
        Ok(ConfigureOutcome::failed("could not parse vite.config.ts"))
    }
}

fn descriptor(name: &str, category: Category) -> PluginDescriptor {
    PluginDescriptor::builder()
        .named(name, name, format!("{name} integration"))
        .in_category(category)
        .for_frameworks([Framework::React])
        .build()
        .unwrap()
}

fn catalog() -> Catalog {
    Catalog::new([
        Arc::new(Tailwind(descriptor("tailwindcss", Category::Css))) as Arc<dyn Plugin>,
        Arc::new(Tailwind(descriptor("unocss", Category::Css))),
        Arc::new(Broken(descriptor("broken-pwa", Category::Tooling))),
    ])
}

fn project() -> Arc<Disk> {
    Disk::with(&[
        ("/app/package.json", "{\"name\":\"app\"}"),
        ("/app/src/main.tsx", "import App from './App'\nrender(App)\n"),
        ("/app/vite.config.ts", "export default {}"),
    ])
}

fn ctx() -> ProjectContext {
    ProjectContext::builder(Framework::React, "/app")
        .typescript(true)
        .build()
        .unwrap()
}

#[test]
fn full_install_workflow() {
    let catalog = catalog();
    let disk = project();
    let installer = Arc::new(Recorder::default());
    let orchestrator =
        InstallationOrchestrator::new(disk.clone(), installer.clone(), InstallSettings::default());

    let request = InstallRequest::new(catalog.resolve(&["tailwindcss"]).unwrap());
    let report = orchestrator
        .run(&request, &ctx(), &catalog.rules().rules, &CancellationToken::new())
        .unwrap();

    assert!(report.success, "{}", report.summary());
    assert_eq!(
        disk.get("/app/src/main.tsx").unwrap(),
        "import './index.css'\nimport App from './App'\nrender(App)\n"
    );
    assert!(disk.get("/app/src/index.css").is_some());
    assert_eq!(
        installer.calls.lock().unwrap()[0],
        vec!["npm", "install", "--save-dev", "--silent", "tailwindcss@^4.0.0"]
    );
}

#[test]
fn failed_install_leaves_project_untouched() {
    let catalog = catalog();
    let disk = project();
    let orchestrator = InstallationOrchestrator::new(
        disk.clone(),
        Arc::new(Recorder::default()),
        InstallSettings::default(),
    );

    let request = InstallRequest::new(catalog.resolve(&["tailwindcss", "broken-pwa"]).unwrap());
    let report = orchestrator
        .run(&request, &ctx(), &catalog.rules().rules, &CancellationToken::new())
        .unwrap();

    assert!(!report.success);
    assert!(report.reverted);
    assert_eq!(disk.get("/app/vite.config.ts").unwrap(), "export default {}");
    assert_eq!(
        disk.get("/app/src/main.tsx").unwrap(),
        "import App from './App'\nrender(App)\n"
    );
    assert!(disk.get("/app/src/index.css").is_none());
}

#[test]
fn css_overlap_needs_no_override_but_is_reported() {
    let catalog = catalog();
    let service = CompatibilityService::new(Arc::new(catalog));

    let result = service
        .check(&["tailwindcss", "unocss"], &ctx(), &BTreeSet::new())
        .unwrap();

    assert!(result.valid);
    assert_eq!(result.warnings.len(), 1);
    assert!(result.warnings[0].allow_override);
}

#[test]
fn rules_serialize_with_uppercase_tags() {
    let json = catalog().rules().to_json().unwrap();
    assert!(json.contains("\"type\": \"EXCLUSIVE\""));
    assert!(json.contains("\"allowOverride\": true"));
}
