//! Plugins described entirely by data.
//!
//! A [`DeclarativePlugin`] is a descriptor, the packages to install and an
//! ordered list of [`FileAction`]s. Paths and content may use these
//! placeholders, filled from the project context:
//!
//! | placeholder        | value                                   |
//! |--------------------|-----------------------------------------|
//! | `{{EXT}}`          | `ts` or `js`                            |
//! | `{{JSX_EXT}}`      | `tsx`/`jsx` (or `ts`/`js` without JSX)  |
//! | `{{SRC_DIR}}`      | `src`, `src/app` (Angular), `app` (Next)|
//! | `{{PROJECT_NAME}}` | the project's name                      |

use serde::{Deserialize, Serialize};
use tracing::debug;

use kiln_core::{
    application::ports::{ConfigureOutcome, InstallOutcome, LifecycleEnv, Plugin},
    domain::{PackageSet, PluginDescriptor, ProjectContext},
    error::KilnResult,
};

/// One file effect, applied in order during `configure`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "kebab-case")]
pub enum FileAction {
    /// Create a file. An existing file is left alone unless `overwrite`.
    Create {
        path: String,
        content: String,
        #[serde(default)]
        overwrite: bool,
    },
    /// Append unless the content is already present.
    Append { path: String, content: String },
    /// Insert a line after the first line containing `anchor`.
    InsertAfter {
        path: String,
        anchor: String,
        content: String,
    },
    /// Insert a line before the first line containing `anchor`.
    InsertBefore {
        path: String,
        anchor: String,
        content: String,
    },
    /// Make sure a whole line is present.
    EnsureLine { path: String, line: String },
}

impl FileAction {
    pub fn create(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self::Create {
            path: path.into(),
            content: content.into(),
            overwrite: false,
        }
    }

    pub fn append(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self::Append {
            path: path.into(),
            content: content.into(),
        }
    }

    pub fn insert_after(
        path: impl Into<String>,
        anchor: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self::InsertAfter {
            path: path.into(),
            anchor: anchor.into(),
            content: content.into(),
        }
    }

    pub fn insert_before(
        path: impl Into<String>,
        anchor: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self::InsertBefore {
            path: path.into(),
            anchor: anchor.into(),
            content: content.into(),
        }
    }

    pub fn ensure_line(path: impl Into<String>, line: impl Into<String>) -> Self {
        Self::EnsureLine {
            path: path.into(),
            line: line.into(),
        }
    }

    pub fn path(&self) -> &str {
        match self {
            Self::Create { path, .. }
            | Self::Append { path, .. }
            | Self::InsertAfter { path, .. }
            | Self::InsertBefore { path, .. }
            | Self::EnsureLine { path, .. } => path,
        }
    }
}

/// Fill the placeholders listed in the module docs.
pub fn substitute(template: &str, ctx: &ProjectContext) -> String {
    template
        .replace("{{EXT}}", ctx.script_ext())
        .replace("{{JSX_EXT}}", ctx.component_ext())
        .replace("{{SRC_DIR}}", ctx.src_dir())
        .replace("{{PROJECT_NAME}}", &ctx.project_name)
}

#[derive(Debug, Clone)]
pub struct DeclarativePlugin {
    descriptor: PluginDescriptor,
    packages: PackageSet,
    actions: Vec<FileAction>,
    /// Packages whose presence means the plugin is already installed.
    markers: Vec<String>,
}

impl DeclarativePlugin {
    pub fn new(descriptor: PluginDescriptor) -> Self {
        Self {
            markers: vec![descriptor.name.clone()],
            descriptor,
            packages: PackageSet::new(),
            actions: Vec::new(),
        }
    }

    pub fn packages(mut self, packages: PackageSet) -> Self {
        self.packages = packages;
        self
    }

    pub fn action(mut self, action: FileAction) -> Self {
        self.actions.push(action);
        self
    }

    pub fn actions(mut self, actions: impl IntoIterator<Item = FileAction>) -> Self {
        self.actions.extend(actions);
        self
    }

    /// Replace the packages checked by `detect`.
    pub fn detected_by<I, S>(mut self, markers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.markers = markers.into_iter().map(Into::into).collect();
        self
    }

    pub fn package_set(&self) -> &PackageSet {
        &self.packages
    }

    pub fn file_actions(&self) -> &[FileAction] {
        &self.actions
    }
}

impl Plugin for DeclarativePlugin {
    fn descriptor(&self) -> &PluginDescriptor {
        &self.descriptor
    }

    fn detect(&self, _descriptor: &PluginDescriptor, ctx: &ProjectContext) -> bool {
        !self.markers.is_empty() && self.markers.iter().any(|m| ctx.has_dependency(m))
    }

    fn install(&self, _env: &mut LifecycleEnv<'_>) -> KilnResult<InstallOutcome> {
        Ok(InstallOutcome::packages(self.packages.clone()))
    }

    /// Every action goes through the writer in declaration order, so later
    /// actions see the files earlier ones created.
    fn configure(&self, env: &mut LifecycleEnv<'_>) -> KilnResult<ConfigureOutcome> {
        let ctx = env.ctx;

        for action in &self.actions {
            let path = substitute(action.path(), ctx);
            match action {
                FileAction::Create {
                    content, overwrite, ..
                } => {
                    if env.writer.exists(&path) && !overwrite {
                        debug!(plugin = %self.descriptor.name, %path, "File exists, not overwriting");
                        continue;
                    }
                    env.writer.write_file(&path, &substitute(content, ctx))?;
                }
                FileAction::Append { content, .. } => {
                    env.writer.append(&path, &substitute(content, ctx))?;
                }
                FileAction::InsertAfter {
                    anchor, content, ..
                } => {
                    env.writer
                        .insert_after(&path, anchor, &substitute(content, ctx))?;
                }
                FileAction::InsertBefore {
                    anchor, content, ..
                } => {
                    env.writer
                        .insert_before(&path, anchor, &substitute(content, ctx))?;
                }
                FileAction::EnsureLine { line, .. } => {
                    env.writer.ensure_line(&path, &substitute(line, ctx))?;
                }
            }
        }

        Ok(ConfigureOutcome::done())
    }
}
