//! The `protoc` subprocess boundary.
//!
//! Descriptor sets are produced by the external protobuf compiler rather
//! than an in-process parser: `protoc` is invoked with the import roots and
//! sources, asked to emit a serialized [`FileDescriptorSet`] with imports
//! included, and its stderr is propagated verbatim on failure so the user
//! sees the real diagnostic.

use std::path::{Path, PathBuf};
use std::process::Command;

use prost::Message;
use prost_types::FileDescriptorSet;

use crate::error::{Error, Result};

/// Handle to the external protobuf compiler.
#[derive(Debug, Clone)]
pub struct Compiler {
    protoc: PathBuf,
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new()
    }
}

impl Compiler {
    /// A compiler resolving `protoc` from `PATH`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            protoc: PathBuf::from("protoc"),
        }
    }

    /// A compiler invoking a specific `protoc` binary.
    #[must_use]
    pub fn with_protoc(protoc: impl Into<PathBuf>) -> Self {
        Self {
            protoc: protoc.into(),
        }
    }

    /// Compile `sources` with `import_roots` as the proto search path and
    /// return the parsed descriptor set, imports included.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Compilation`] when the toolchain is unavailable or
    /// the sources don't parse (with the compiler's stderr attached), and
    /// [`Error::DescriptorDecode`] if the emitted set cannot be decoded.
    pub fn compile(
        &self,
        sources: &[PathBuf],
        import_roots: &[PathBuf],
    ) -> Result<FileDescriptorSet> {
        if sources.is_empty() {
            return Err(Error::Compilation("no .proto sources to compile".into()));
        }

        let out_dir = tempfile::tempdir()?;
        let out_file = out_dir.path().join("descriptor_set.bin");

        let mut cmd = Command::new(&self.protoc);
        cmd.arg("--include_imports")
            .arg(format!("--descriptor_set_out={}", out_file.display()));
        for root in import_roots {
            cmd.arg(format!("--proto_path={}", root.display()));
        }
        for source in sources {
            cmd.arg(source);
        }

        tracing::debug!(
            sources = sources.len(),
            roots = import_roots.len(),
            "invoking protoc"
        );

        let output = cmd.output().map_err(|e| {
            Error::Compilation(format!(
                "failed to run '{}': {e}; is protoc installed and on PATH?",
                self.protoc.display()
            ))
        })?;
        if !output.status.success() {
            return Err(Error::Compilation(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }

        let bytes = std::fs::read(&out_file)?;
        Ok(FileDescriptorSet::decode(bytes.as_slice())?)
    }
}

/// Recursively discover all `.proto` files beneath `dir`, sorted for
/// deterministic compilation order.
///
/// # Errors
///
/// Returns [`Error::Compilation`] when no `.proto` files exist under `dir`,
/// or [`Error::Io`] when the directory walk itself fails.
pub fn discover_proto_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut sources = Vec::new();
    for entry in walkdir::WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            e.into_io_error()
                .unwrap_or_else(|| std::io::Error::other("directory walk failed"))
        })?;
        if entry.file_type().is_file()
            && entry.path().extension().is_some_and(|ext| ext == "proto")
        {
            sources.push(entry.path().to_path_buf());
        }
    }
    if sources.is_empty() {
        return Err(Error::Compilation(format!(
            "no .proto files found under {}",
            dir.display()
        )));
    }
    Ok(sources)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discover_finds_nested_proto_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("a.proto"), "syntax = \"proto3\";").unwrap();
        std::fs::write(dir.path().join("nested/b.proto"), "syntax = \"proto3\";").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "not a proto").unwrap();

        let found = discover_proto_files(dir.path()).unwrap();
        let names: Vec<_> = found
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["a.proto", "b.proto"]);
    }

    #[test]
    fn discover_errors_on_empty_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("readme.md"), "no protos here").unwrap();

        let err = discover_proto_files(dir.path()).unwrap_err();
        assert!(
            err.to_string().contains("no .proto files"),
            "diagnostic names the problem: {err}"
        );
    }

    #[test]
    fn compile_with_missing_toolchain_mentions_protoc() {
        let compiler = Compiler::with_protoc("/nonexistent/protoc-binary");
        let err = compiler
            .compile(&[PathBuf::from("x.proto")], &[PathBuf::from(".")])
            .unwrap_err();
        assert!(
            err.to_string().contains("protoc"),
            "diagnostic names the toolchain: {err}"
        );
    }

    #[test]
    fn compile_rejects_empty_source_list() {
        let err = Compiler::new().compile(&[], &[]).unwrap_err();
        assert!(matches!(err, Error::Compilation(_)));
    }
}
