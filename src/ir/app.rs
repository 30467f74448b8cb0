use smol_str::SmolStr;

use super::spec::{
    EntitySpec, ExperienceSpec, ForeignModelSpec, IntegrationSpec, ServiceSpec, SurfaceSpec,
    WorkspaceSpec,
};

/// The merged, linked application.
///
/// Built once by the linker and never mutated afterwards. Declarations keep
/// the module topological order, and within a module the source order.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "interchange", derive(serde::Serialize, serde::Deserialize))]
pub struct AppSpec {
    pub name: SmolStr,
    pub title: Option<String>,
    pub root: SmolStr,
    /// Modules in dependency order, dependencies first.
    pub modules: Vec<SmolStr>,
    pub entities: Vec<EntitySpec>,
    pub surfaces: Vec<SurfaceSpec>,
    pub workspaces: Vec<WorkspaceSpec>,
    pub experiences: Vec<ExperienceSpec>,
    pub services: Vec<ServiceSpec>,
    pub foreign_models: Vec<ForeignModelSpec>,
    pub integrations: Vec<IntegrationSpec>,
}

impl AppSpec {
    /// An application with no declarations, named after its root module.
    pub fn new(root: impl Into<SmolStr>) -> Self {
        let root = root.into();
        Self {
            name: root.clone(),
            title: None,
            modules: vec![root.clone()],
            root,
            entities: Vec::new(),
            surfaces: Vec::new(),
            workspaces: Vec::new(),
            experiences: Vec::new(),
            services: Vec::new(),
            foreign_models: Vec::new(),
            integrations: Vec::new(),
        }
    }

    pub fn entity(&self, name: &str) -> Option<&EntitySpec> {
        self.entities.iter().find(|e| e.name == name)
    }

    pub fn surface(&self, name: &str) -> Option<&SurfaceSpec> {
        self.surfaces.iter().find(|s| s.name == name)
    }

    pub fn workspace(&self, name: &str) -> Option<&WorkspaceSpec> {
        self.workspaces.iter().find(|w| w.name == name)
    }

    pub fn experience(&self, name: &str) -> Option<&ExperienceSpec> {
        self.experiences.iter().find(|e| e.name == name)
    }

    pub fn service(&self, name: &str) -> Option<&ServiceSpec> {
        self.services.iter().find(|s| s.name == name)
    }

    pub fn foreign_model(&self, name: &str) -> Option<&ForeignModelSpec> {
        self.foreign_models.iter().find(|f| f.name == name)
    }

    pub fn integration(&self, name: &str) -> Option<&IntegrationSpec> {
        self.integrations.iter().find(|i| i.name == name)
    }

    /// Serialize to pretty-printed JSON.
    #[cfg(feature = "interchange")]
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    #[cfg(feature = "interchange")]
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }
}
