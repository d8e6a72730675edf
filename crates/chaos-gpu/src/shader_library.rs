//! Named WGSL programs the pipeline is built from

use anyhow::{bail, Context, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Compute program advancing every particle's ring buffer
pub const UPDATE_PROGRAM: &str = "update";
pub const UPDATE_ENTRY: &str = "update_lorenz";

/// Full-screen vertex + fragment program
pub const VISUAL_PROGRAM: &str = "visual";
pub const VISUAL_VERTEX_ENTRY: &str = "vert_main";
pub const VISUAL_FRAGMENT_ENTRY: &str = "frag_main";

const PROGRAM_NAMES: [&str; 2] = [UPDATE_PROGRAM, VISUAL_PROGRAM];

#[derive(Clone, Debug)]
pub struct ShaderProgram {
    pub name: String,
    pub source: String,
}

impl ShaderProgram {
    /// Whether the source declares `fn <entry>(`
    pub fn declares_entry_point(&self, entry: &str) -> bool {
        self.source.match_indices("fn ").any(|(at, _)| {
            let rest = self.source[at + 3..].trim_start();
            rest.strip_prefix(entry)
                .is_some_and(|tail| tail.trim_start().starts_with('('))
        })
    }

    pub fn require_entry_point(&self, entry: &str) -> Result<()> {
        if !self.declares_entry_point(entry) {
            bail!("shader program '{}' has no entry point '{entry}'", self.name);
        }
        Ok(())
    }

    pub fn create_module(&self, device: &wgpu::Device) -> wgpu::ShaderModule {
        device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(&self.name),
            source: wgpu::ShaderSource::Wgsl(self.source.as_str().into()),
        })
    }
}

/// Programs keyed by name
#[derive(Clone, Debug, Default)]
pub struct ShaderLibrary {
    programs: BTreeMap<String, ShaderProgram>,
}

impl ShaderLibrary {
    /// Programs compiled into the binary
    pub fn embedded() -> Self {
        Self::from_programs([
            (UPDATE_PROGRAM, include_str!("shaders/update.wgsl")),
            (VISUAL_PROGRAM, include_str!("shaders/visual.wgsl")),
        ])
    }

    pub fn from_programs<'a>(programs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let programs = programs
            .into_iter()
            .map(|(name, source)| {
                (
                    name.to_string(),
                    ShaderProgram {
                        name: name.to_string(),
                        source: source.to_string(),
                    },
                )
            })
            .collect();
        Self { programs }
    }

    /// Load `<name>.wgsl` for every program the pipeline needs from `dir`.
    pub fn from_dir(dir: &Path) -> Result<Self> {
        if !dir.is_dir() {
            bail!("shader library {} not found", dir.display());
        }

        let mut programs = BTreeMap::new();
        for name in PROGRAM_NAMES {
            let path = dir.join(format!("{name}.wgsl"));
            let source = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read shader program {}", path.display()))?;
            programs.insert(
                name.to_string(),
                ShaderProgram {
                    name: name.to_string(),
                    source,
                },
            );
        }

        log::info!("✓ Loaded shader library from {}", dir.display());
        Ok(Self { programs })
    }

    /// `shaders/` next to the running executable
    pub fn default_dir() -> Result<PathBuf> {
        let exe = std::env::current_exe().context("cannot locate the running executable")?;
        let dir = exe
            .parent()
            .context("executable has no parent directory")?
            .join("shaders");
        Ok(dir)
    }

    pub fn program(&self, name: &str) -> Result<&ShaderProgram> {
        self.programs
            .get(name)
            .with_context(|| format!("shader library has no program named '{name}'"))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.programs.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_library_has_all_entry_points() {
        let library = ShaderLibrary::embedded();
        let update = library.program(UPDATE_PROGRAM).unwrap();
        update.require_entry_point(UPDATE_ENTRY).unwrap();

        let visual = library.program(VISUAL_PROGRAM).unwrap();
        visual.require_entry_point(VISUAL_VERTEX_ENTRY).unwrap();
        visual.require_entry_point(VISUAL_FRAGMENT_ENTRY).unwrap();
    }

    #[test]
    fn test_missing_program_is_an_error() {
        let library = ShaderLibrary::from_programs([(VISUAL_PROGRAM, "fn vert_main() {}")]);
        let err = library.program(UPDATE_PROGRAM).unwrap_err();
        assert!(err.to_string().contains("update"));
    }

    #[test]
    fn test_entry_point_detection() {
        let program = ShaderProgram {
            name: "t".into(),
            source: "@compute @workgroup_size(64)\nfn update_lorenz (@builtin(global_invocation_id) id: vec3<u32>) {}\nfn helper_update_lorenz2() {}".into(),
        };
        assert!(program.declares_entry_point("update_lorenz"));
        assert!(!program.declares_entry_point("update"));
        assert!(!program.declares_entry_point("frag_main"));
        assert!(program.require_entry_point("frag_main").is_err());
    }

    #[test]
    fn test_missing_directory_is_an_error() {
        let dir = std::env::temp_dir().join("chaos-gpu-no-such-shader-dir");
        assert!(ShaderLibrary::from_dir(&dir).is_err());
    }

    #[test]
    fn test_directory_missing_one_program_is_an_error() {
        let dir = std::env::temp_dir().join(format!("chaos-gpu-shaders-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("visual.wgsl"), "fn vert_main() {}").unwrap();

        let err = ShaderLibrary::from_dir(&dir).unwrap_err();
        assert!(format!("{err:#}").contains("update.wgsl"));

        std::fs::write(dir.join("update.wgsl"), "fn update_lorenz() {}").unwrap();
        let library = ShaderLibrary::from_dir(&dir).unwrap();
        assert_eq!(library.names().collect::<Vec<_>>(), vec!["update", "visual"]);

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
