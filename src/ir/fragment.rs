use std::sync::Arc;

use smol_str::SmolStr;

use super::spec::{
    EntitySpec, ExperienceSpec, ForeignModelSpec, IntegrationSpec, Loc, ServiceSpec, SurfaceSpec,
    WorkspaceSpec,
};
use crate::base::LineCol;

/// `use a.b` inside a fragment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UseDecl {
    pub module: SmolStr,
    pub pos: LineCol,
}

/// `app name "Title"`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppInfo {
    pub name: SmolStr,
    pub title: Option<String>,
    pub loc: Loc,
}

/// Everything one source file contributes, after lowering.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModuleFragment {
    pub module: SmolStr,
    /// Position of the `module` line, or the file start when it is missing.
    pub module_pos: LineCol,
    pub file: Arc<str>,
    pub uses: Vec<UseDecl>,
    pub app: Option<AppInfo>,
    pub entities: Vec<EntitySpec>,
    pub surfaces: Vec<SurfaceSpec>,
    pub workspaces: Vec<WorkspaceSpec>,
    pub experiences: Vec<ExperienceSpec>,
    pub services: Vec<ServiceSpec>,
    pub foreign_models: Vec<ForeignModelSpec>,
    pub integrations: Vec<IntegrationSpec>,
}

impl ModuleFragment {
    /// An empty fragment for `module` declared in `file`.
    pub fn new(module: impl Into<SmolStr>, file: impl Into<Arc<str>>) -> Self {
        Self {
            module: module.into(),
            module_pos: LineCol::default(),
            file: file.into(),
            uses: Vec::new(),
            app: None,
            entities: Vec::new(),
            surfaces: Vec::new(),
            workspaces: Vec::new(),
            experiences: Vec::new(),
            services: Vec::new(),
            foreign_models: Vec::new(),
            integrations: Vec::new(),
        }
    }

    pub fn loc(&self, pos: LineCol) -> Loc {
        Loc::new(self.file.clone(), pos)
    }

    /// Number of top-level declarations in the fragment.
    pub fn decl_count(&self) -> usize {
        self.entities.len()
            + self.surfaces.len()
            + self.workspaces.len()
            + self.experiences.len()
            + self.services.len()
            + self.foreign_models.len()
            + self.integrations.len()
    }
}
