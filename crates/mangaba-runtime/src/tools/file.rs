//! File tool confined to a base directory.

use crate::tools::Tool;
use async_trait::async_trait;
use mangaba_types::error::{MangabaError, MangabaResult, ToolErrorKind};
use mangaba_types::tool::ToolDefinition;
use std::path::{Component, Path, PathBuf};

/// Read/write/list tool rooted at a fixed directory.
///
/// Paths in arguments are interpreted relative to the root; absolute paths
/// and `..` components are rejected before touching the filesystem.
pub struct FileTool {
    root: PathBuf,
}

impl FileTool {
    /// Create a file tool rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn error(&self, kind: ToolErrorKind, detail: impl Into<String>) -> MangabaError {
        MangabaError::Tool {
            tool: "file".into(),
            kind,
            detail: detail.into(),
        }
    }

    /// Resolve a relative argument path against the root.
    fn resolve(&self, path: &str) -> MangabaResult<PathBuf> {
        let rel = Path::new(path);
        if rel.is_absolute() {
            return Err(self.error(
                ToolErrorKind::InvalidArgs,
                format!("absolute path not allowed: {path}"),
            ));
        }
        for component in rel.components() {
            if matches!(component, Component::ParentDir) {
                return Err(self.error(
                    ToolErrorKind::InvalidArgs,
                    format!("path traversal not allowed: {path}"),
                ));
            }
        }
        Ok(self.root.join(rel))
    }
}

#[async_trait]
impl Tool for FileTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "file".into(),
            description: "Read, write, or list files under the workspace directory".into(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "op": { "type": "string", "enum": ["read", "write", "list"] },
                    "path": { "type": "string", "description": "Path relative to the workspace" },
                    "content": { "type": "string", "description": "Content for write" }
                },
                "required": ["op", "path"]
            }),
        }
    }

    async fn invoke(&self, args: serde_json::Value) -> MangabaResult<String> {
        let op = args
            .get("op")
            .and_then(|v| v.as_str())
            .ok_or_else(|| self.error(ToolErrorKind::InvalidArgs, "missing 'op' argument"))?;
        let path = args
            .get("path")
            .and_then(|v| v.as_str())
            .ok_or_else(|| self.error(ToolErrorKind::InvalidArgs, "missing 'path' argument"))?;
        let full = self.resolve(path)?;

        match op {
            "read" => tokio::fs::read_to_string(&full)
                .await
                .map_err(|e| self.error(ToolErrorKind::Io, format!("read {path}: {e}"))),
            "write" => {
                let content = args.get("content").and_then(|v| v.as_str()).ok_or_else(|| {
                    self.error(ToolErrorKind::InvalidArgs, "missing 'content' for write")
                })?;
                if let Some(parent) = full.parent() {
                    tokio::fs::create_dir_all(parent)
                        .await
                        .map_err(|e| self.error(ToolErrorKind::Io, e.to_string()))?;
                }
                tokio::fs::write(&full, content)
                    .await
                    .map_err(|e| self.error(ToolErrorKind::Io, format!("write {path}: {e}")))?;
                Ok(format!("wrote {} bytes to {path}", content.len()))
            }
            "list" => {
                let mut entries = tokio::fs::read_dir(&full)
                    .await
                    .map_err(|e| self.error(ToolErrorKind::Io, format!("list {path}: {e}")))?;
                let mut names = Vec::new();
                while let Some(entry) = entries
                    .next_entry()
                    .await
                    .map_err(|e| self.error(ToolErrorKind::Io, e.to_string()))?
                {
                    names.push(entry.file_name().to_string_lossy().into_owned());
                }
                names.sort();
                Ok(names.join("\n"))
            }
            other => Err(self.error(
                ToolErrorKind::InvalidArgs,
                format!("unknown op '{other}' (expected read, write, or list)"),
            )),
        }
    }
}
