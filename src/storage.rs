use crate::errors::{AppError, AppResult};
use crate::models::Todo;
use std::path::{Path, PathBuf};
use tokio::fs;

const TODOS_FILE: &str = "todos.json";

/// Result of loading a project blob. `existed` distinguishes a brand-new
/// project (no file yet) from a file that was present but unreadable; both
/// fall back to an empty collection rather than surfacing an error.
#[derive(Debug, Clone)]
pub struct LoadedCollection {
    pub todos: Vec<Todo>,
    pub existed: bool,
}

/// Maps a project id to one durable JSON document: the full ordered array of
/// todo records, rewritten whole on every save.
#[derive(Debug, Clone)]
pub struct ProjectStorage {
    base_dir: PathBuf,
}

impl ProjectStorage {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn project_dir(&self, project: &str) -> PathBuf {
        self.base_dir.join(sanitize_component(project))
    }

    fn todos_path(&self, project: &str) -> PathBuf {
        self.project_dir(project).join(TODOS_FILE)
    }

    pub async fn load(&self, project: &str) -> AppResult<LoadedCollection> {
        let path = self.todos_path(project);
        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                return Ok(LoadedCollection {
                    todos: Vec::new(),
                    existed: false,
                });
            }
            Err(error) => {
                tracing::warn!(
                    project,
                    path = %path.to_string_lossy(),
                    error = %error,
                    "unreadable project blob; starting from an empty collection"
                );
                return Ok(LoadedCollection {
                    todos: Vec::new(),
                    existed: true,
                });
            }
        };

        match serde_json::from_slice::<Vec<Todo>>(&bytes) {
            Ok(todos) => Ok(LoadedCollection {
                todos,
                existed: true,
            }),
            Err(error) => {
                tracing::warn!(
                    project,
                    path = %path.to_string_lossy(),
                    error = %error,
                    "malformed project blob; starting from an empty collection"
                );
                Ok(LoadedCollection {
                    todos: Vec::new(),
                    existed: true,
                })
            }
        }
    }

    /// Overwrites the project blob via temp-file-then-rename so a crashed
    /// write never leaves a half-written `todos.json` behind.
    pub async fn save(&self, project: &str, todos: &[Todo]) -> AppResult<()> {
        let dir = self.project_dir(project);
        fs::create_dir_all(&dir)
            .await
            .map_err(|error| AppError::Io(error.to_string()))?;

        let bytes = serde_json::to_vec_pretty(todos)?;
        let tmp_path = dir.join(format!("{}.tmp", TODOS_FILE));
        fs::write(&tmp_path, bytes)
            .await
            .map_err(|error| AppError::Io(error.to_string()))?;
        fs::rename(&tmp_path, dir.join(TODOS_FILE))
            .await
            .map_err(|error| AppError::Io(error.to_string()))
    }

    /// Enumerates the storage namespace: every base-dir subdirectory holding
    /// a todos blob is a known project, whether or not it was ever loaded.
    pub async fn list_projects(&self) -> AppResult<Vec<String>> {
        let mut projects = Vec::new();
        let mut entries = match fs::read_dir(&self.base_dir).await {
            Ok(entries) => entries,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                return Ok(projects);
            }
            Err(error) => return Err(AppError::Io(error.to_string())),
        };

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|error| AppError::Io(error.to_string()))?
        {
            let file_type = entry
                .file_type()
                .await
                .map_err(|error| AppError::Io(error.to_string()))?;
            if !file_type.is_dir() {
                continue;
            }
            let has_blob = fs::try_exists(entry.path().join(TODOS_FILE))
                .await
                .unwrap_or(false);
            if !has_blob {
                continue;
            }
            match entry.file_name().into_string() {
                Ok(name) => projects.push(name),
                Err(raw) => {
                    tracing::warn!(
                        name = %raw.to_string_lossy(),
                        "skipping project directory with non-utf8 name"
                    );
                }
            }
        }

        projects.sort();
        Ok(projects)
    }

    /// Counts a project's records without activating it.
    pub async fn todo_count(&self, project: &str) -> AppResult<usize> {
        Ok(self.load(project).await?.todos.len())
    }
}

pub fn sanitize_component(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' {
            out.push(ch);
        } else {
            out.push('_');
        }
    }
    let cleaned = out.trim_matches('_').to_string();
    if cleaned.is_empty() {
        "project".to_string()
    } else {
        cleaned
    }
}
