use anyhow::{Context, Result};
use clap::Args;
use richtext_editor::{Editor, EditorConfig, ReferenceResolver, StaticResolver};
use richtext_policy::{PolicyConfig, PolicyRegistry};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

pub const DEFAULT_CONFIG_NAME: &str = "richtext.config.json";

/// Flags shared by every subcommand
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Custom attribute/class policy file
    #[arg(long, global = true)]
    pub policy: Option<PathBuf>,

    /// Editor config file (credentials, reference scheme, icon sprite)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Resolver fixtures: JSON object keyed by external id
    #[arg(long, global = true)]
    pub fixtures: Option<PathBuf>,

    /// More logging (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// Project file listing the inputs a session is built from. Paths are
/// relative to the directory holding the file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub editor_config: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fixtures: Option<PathBuf>,
}

impl Config {
    /// Load the project file from `cwd`, or an empty config when absent
    pub fn load(cwd: &Path) -> Result<Self> {
        let config_path = cwd.join(DEFAULT_CONFIG_NAME);
        if !config_path.exists() {
            return Ok(Config::default());
        }

        let content = std::fs::read_to_string(&config_path)?;
        let config: Config = serde_json::from_str(&content)
            .with_context(|| format!("invalid project file {}", config_path.display()))?;
        Ok(config.relative_to(cwd))
    }

    fn relative_to(self, dir: &Path) -> Self {
        let join = |p: Option<PathBuf>| p.map(|p| if p.is_absolute() { p } else { dir.join(p) });
        Self {
            policy: join(self.policy),
            editor_config: join(self.editor_config),
            fixtures: join(self.fixtures),
        }
    }

    /// Command-line flags win over the project file.
    pub fn with_overrides(self, args: &GlobalArgs) -> Self {
        Self {
            policy: args.policy.clone().or(self.policy),
            editor_config: args.config.clone().or(self.editor_config),
            fixtures: args.fixtures.clone().or(self.fixtures),
        }
    }

    pub fn policy(&self) -> Result<PolicyRegistry> {
        let config = match &self.policy {
            Some(path) => PolicyConfig::load(path).with_context(|| format!("cannot read policy {}", path.display()))?,
            None => PolicyConfig::default(),
        };
        Ok(PolicyRegistry::new(config))
    }

    pub fn editor_config(&self) -> Result<EditorConfig> {
        match &self.editor_config {
            Some(path) => EditorConfig::load(path).with_context(|| format!("cannot read config {}", path.display())),
            None => Ok(EditorConfig::default()),
        }
    }

    pub fn resolver(&self) -> Result<StaticResolver> {
        match &self.fixtures {
            Some(path) => {
                let resolver = StaticResolver::load(path)
                    .with_context(|| format!("cannot read fixtures {}", path.display()))?;
                debug!(entries = resolver.len(), "fixtures loaded");
                Ok(resolver)
            }
            None => Ok(StaticResolver::new()),
        }
    }

    /// Build an editing session with these inputs
    pub fn editor(&self) -> Result<Editor> {
        let resolver: Arc<dyn ReferenceResolver> = Arc::new(self.resolver()?);
        Ok(Editor::new(self.editor_config()?, self.policy()?, resolver))
    }
}

/// Load `path` into a session and apply every resolution the fixtures answer.
pub fn open(config: &Config, path: &Path) -> Result<Editor> {
    let source = std::fs::read_to_string(path).with_context(|| format!("cannot read {}", path.display()))?;
    let mut editor = config.editor()?;
    editor
        .load(&source)
        .with_context(|| format!("cannot load {}", path.display()))?;
    let resolved = editor.process_resolutions()?;
    debug!(path = %path.display(), resolved, "document opened");
    Ok(editor)
}
