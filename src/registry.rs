//! Process-wide schema registry.
//!
//! Compiles the fiscal (primary) and diploma (secondary) XSDs exactly
//! once at startup and shares them read-only with every pipeline stage.
//! Schema compilation failure is the single unrecoverable error in the
//! system: the process refuses to start without both schemas.

use std::path::{Path, PathBuf};

use crate::error::StartupError;
use crate::libxml2::{LibXml2Wrapper, XmlSchemaPtr};

/// Default fiscal (primary) schema file name.
pub const DEFAULT_FISCAL_XSD: &str = "arquivofiscalizacao_v1-05.xsd";

/// Default diploma (secondary) schema file name.
pub const DEFAULT_DIPLOMA_XSD: &str = "diplomadigital_v1-05.xsd";

/// The two compiled schema definitions, immutable for the process
/// lifetime. Shared by reference (`Arc<SchemaRegistry>`), never copied,
/// and read-only for all concurrent users, so no locking is needed.
pub struct SchemaRegistry {
    wrapper: LibXml2Wrapper,
    fiscal: XmlSchemaPtr,
    diploma: XmlSchemaPtr,
    fiscal_path: PathBuf,
    diploma_path: PathBuf,
}

impl SchemaRegistry {
    /// Compile both schemas from their file paths.
    ///
    /// File-path compilation makes libxml2 resolve each schema's
    /// relative include/import references against that schema file's own
    /// directory, so the two compilations cannot contaminate each other
    /// through the process working directory.
    pub fn load(fiscal_path: &Path, diploma_path: &Path) -> Result<Self, StartupError> {
        let wrapper = LibXml2Wrapper::new();

        let fiscal = Self::compile(&wrapper, fiscal_path)?;
        let diploma = Self::compile(&wrapper, diploma_path)?;

        Ok(Self {
            wrapper,
            fiscal,
            diploma,
            fiscal_path: fiscal_path.to_path_buf(),
            diploma_path: diploma_path.to_path_buf(),
        })
    }

    fn compile(wrapper: &LibXml2Wrapper, path: &Path) -> Result<XmlSchemaPtr, StartupError> {
        if !path.is_file() {
            return Err(StartupError::SchemaNotFound {
                path: path.to_path_buf(),
            });
        }

        wrapper
            .parse_schema_file(path)
            .map_err(|e| StartupError::SchemaCompile {
                path: path.to_path_buf(),
                details: e.to_string(),
            })
    }

    /// Primary schema: validates every top-level fiscalization document,
    /// generic across both roles.
    pub fn fiscal_schema(&self) -> &XmlSchemaPtr {
        &self.fiscal
    }

    /// Secondary schema: validates remotely fetched diploma documents.
    pub fn diploma_schema(&self) -> &XmlSchemaPtr {
        &self.diploma
    }

    pub fn wrapper(&self) -> &LibXml2Wrapper {
        &self.wrapper
    }

    pub fn fiscal_path(&self) -> &Path {
        &self.fiscal_path
    }

    pub fn diploma_path(&self) -> &Path {
        &self.diploma_path
    }
}
