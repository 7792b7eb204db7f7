//! Prompt library for the downstream synthesis collaborator.
//!
//! Owns a name -> text mapping loaded from a directory, with an explicit
//! reload operation. Lifecycle is tied to the pipeline instance; there is
//! no process-wide prompt state.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use magpie_core::MagpieResult;

/// Directory-backed prompt texts, keyed by file stem.
pub struct PromptLibrary {
    dir: PathBuf,
    prompts: HashMap<String, String>,
}

impl PromptLibrary {
    /// Create a library over a directory and load it. A missing directory
    /// yields an empty library, not an error.
    pub fn new(dir: impl AsRef<Path>) -> MagpieResult<Self> {
        let mut library = Self {
            dir: dir.as_ref().to_path_buf(),
            prompts: HashMap::new(),
        };
        library.reload()?;
        Ok(library)
    }

    /// Re-read every `.md` and `.txt` file in the directory. Returns the
    /// number of prompts loaded.
    pub fn reload(&mut self) -> MagpieResult<usize> {
        self.prompts.clear();

        if !self.dir.is_dir() {
            tracing::debug!(dir = %self.dir.display(), "prompt directory missing, library empty");
            return Ok(0);
        }

        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();
            let is_prompt = path
                .extension()
                .and_then(|e| e.to_str())
                .map(|ext| ext == "md" || ext == "txt")
                .unwrap_or(false);
            if !is_prompt {
                continue;
            }

            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                let text = std::fs::read_to_string(&path)?;
                self.prompts.insert(stem.to_string(), text);
            }
        }

        tracing::debug!(count = self.prompts.len(), "loaded prompts");
        Ok(self.prompts.len())
    }

    /// Look up a prompt by name.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.prompts.get(name).map(String::as_str)
    }

    /// Loaded prompt names.
    pub fn names(&self) -> Vec<&str> {
        self.prompts.keys().map(String::as_str).collect()
    }
}
