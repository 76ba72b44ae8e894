//! Wire-level result model for batch processing and export.
//!
//! Shapes follow the fiscalization API contract: per-file results carry
//! the classified role, institution and period metadata, an ordered list
//! of flat diploma records, and a report explaining why extraction was
//! skipped or records were flagged invalid. Records serialize as flat
//! string-keyed maps; remotely resolved records additionally carry a
//! `_validation_status` tag and, when invalid, their diagnostics.

use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::classify::Role;
use crate::fields::FieldCatalog;

/// Institution metadata extracted from the `IESEmissora` /
/// `IESRegistradora` sub-element. All fields optional at the element
/// level; absence yields the empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstitutionInfo {
    #[serde(rename = "Nome", default)]
    pub nome: String,
    #[serde(rename = "CodigoMEC", default)]
    pub codigo_mec: String,
    #[serde(rename = "CNPJ", default)]
    pub cnpj: String,
    #[serde(rename = "Logradouro", default)]
    pub logradouro: String,
    #[serde(rename = "Numero", default)]
    pub numero: String,
    #[serde(rename = "Bairro", default)]
    pub bairro: String,
    #[serde(rename = "Municipio", default)]
    pub municipio: String,
    #[serde(rename = "UF", default)]
    pub uf: String,
    #[serde(rename = "CEP", default)]
    pub cep: String,
}

impl InstitutionInfo {
    /// Flatten to the ordered key/value pairs used by the projector.
    pub fn flatten(&self) -> Vec<(&'static str, &str)> {
        vec![
            ("Nome", &self.nome),
            ("CodigoMEC", &self.codigo_mec),
            ("CNPJ", &self.cnpj),
            ("Logradouro", &self.logradouro),
            ("Numero", &self.numero),
            ("Bairro", &self.bairro),
            ("Municipio", &self.municipio),
            ("UF", &self.uf),
            ("CEP", &self.cep),
        ]
    }
}

/// Fiscalization period dates, extracted once per top-level document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    #[serde(rename = "DataInicioFiscalizacao", default)]
    pub inicio: String,
    #[serde(rename = "DataFimFiscalizacao", default)]
    pub fim: String,
}

impl DateRange {
    pub fn flatten(&self) -> Vec<(&'static str, &str)> {
        vec![
            ("DataInicioFiscalizacao", &self.inicio),
            ("DataFimFiscalizacao", &self.fim),
        ]
    }
}

/// Validation tag of a remotely resolved diploma record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordStatus {
    Valid,
    Invalid { errors: Vec<String> },
}

/// One diploma's flat data, tagged by originating role.
///
/// The two shapes carry different field sets and are never merged within
/// one record; both expose the same ordered flatten operation for the
/// tabular projector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiplomaRecord {
    /// Built from a remotely fetched diploma document (emissora flow);
    /// carries the secondary-schema validation tag.
    Emitted {
        fields: Vec<(String, String)>,
        status: RecordStatus,
    },
    /// Built from an inline `DiplomaFiscalizado` entry (registradora
    /// flow); inline entries carry no per-record validation tag.
    Registered { fields: Vec<(String, String)> },
}

impl DiplomaRecord {
    pub fn emitted(fields: Vec<(String, String)>, status: RecordStatus) -> Self {
        DiplomaRecord::Emitted { fields, status }
    }

    pub fn registered(fields: Vec<(String, String)>) -> Self {
        DiplomaRecord::Registered { fields }
    }

    /// Ordered key/value pairs of the record.
    pub fn flatten(&self) -> &[(String, String)] {
        match self {
            DiplomaRecord::Emitted { fields, .. } => fields,
            DiplomaRecord::Registered { fields } => fields,
        }
    }

    pub fn is_tagged_valid(&self) -> bool {
        matches!(
            self,
            DiplomaRecord::Emitted {
                status: RecordStatus::Valid,
                ..
            }
        )
    }

    pub fn is_tagged_invalid(&self) -> bool {
        matches!(
            self,
            DiplomaRecord::Emitted {
                status: RecordStatus::Invalid { .. },
                ..
            }
        )
    }
}

impl Serialize for DiplomaRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let fields = self.flatten();
        let extra = match self {
            DiplomaRecord::Emitted {
                status: RecordStatus::Valid,
                ..
            } => 1,
            DiplomaRecord::Emitted {
                status: RecordStatus::Invalid { .. },
                ..
            } => 2,
            DiplomaRecord::Registered { .. } => 0,
        };

        let mut map = serializer.serialize_map(Some(fields.len() + extra))?;
        for (key, value) in fields {
            map.serialize_entry(key, value)?;
        }
        match self {
            DiplomaRecord::Emitted {
                status: RecordStatus::Valid,
                ..
            } => {
                map.serialize_entry("_validation_status", "valid")?;
            }
            DiplomaRecord::Emitted {
                status: RecordStatus::Invalid { errors },
                ..
            } => {
                map.serialize_entry("_validation_status", "invalid")?;
                map.serialize_entry("_validation_errors", errors)?;
            }
            DiplomaRecord::Registered { .. } => {}
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for DiplomaRecord {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct RecordVisitor;

        impl<'de> Visitor<'de> for RecordVisitor {
            type Value = DiplomaRecord;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a flat string-keyed diploma record")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut fields = Vec::new();
                let mut status_tag: Option<String> = None;
                let mut errors: Vec<String> = Vec::new();

                while let Some(key) = access.next_key::<String>()? {
                    match key.as_str() {
                        "_validation_status" => {
                            status_tag = Some(access.next_value::<String>()?);
                        }
                        "_validation_errors" => {
                            errors = access.next_value::<Vec<String>>()?;
                        }
                        _ => {
                            let value = access.next_value::<String>()?;
                            fields.push((key, value));
                        }
                    }
                }

                Ok(match status_tag.as_deref() {
                    Some("invalid") => DiplomaRecord::Emitted {
                        fields,
                        status: RecordStatus::Invalid { errors },
                    },
                    Some(_) => DiplomaRecord::Emitted {
                        fields,
                        status: RecordStatus::Valid,
                    },
                    None => DiplomaRecord::Registered { fields },
                })
            }
        }

        deserializer.deserialize_map(RecordVisitor)
    }
}

/// Secondary-document validation failure recorded against its URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkValidationError {
    pub url: String,
    pub errors: Vec<String>,
}

/// Secondary-document fetch failure recorded against its URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkFetchError {
    pub url: String,
    pub error: String,
}

/// Outcome summary for one input item.
///
/// `ok` is true only when primary-schema validation passed and no role
/// mismatch was declared. Immutable once finalized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileReport {
    pub ok: bool,
    pub tipo: Role,
    pub errors: Vec<String>,
    #[serde(default)]
    pub validation_errors: Vec<LinkValidationError>,
    #[serde(default)]
    pub fetch_errors: Vec<LinkFetchError>,
    pub wrong_type: bool,
    /// Operator-facing backtrace for unhandled failures only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace: Option<String>,
}

/// Full result for one input item, aggregated by the batch orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileResult {
    pub filename: String,
    pub tipo: Role,
    #[serde(with = "empty_map_opt")]
    pub ies_info: Option<InstitutionInfo>,
    #[serde(with = "empty_map_opt")]
    pub dates_info: Option<DateRange>,
    pub diplomas: Vec<DiplomaRecord>,
    pub report: FileReport,
}

impl FileResult {
    /// Result for an item whose raw bytes failed to parse as XML.
    pub fn parse_failure(filename: String, diagnostic: String) -> Self {
        Self::failed(filename, diagnostic, None)
    }

    /// Result for an item that hit an unexpected failure mid-pipeline.
    pub fn unhandled(filename: String, diagnostic: String, trace: Option<String>) -> Self {
        Self::failed(filename, diagnostic, trace)
    }

    fn failed(filename: String, diagnostic: String, trace: Option<String>) -> Self {
        FileResult {
            filename,
            tipo: Role::Desconhecido,
            ies_info: None,
            dates_info: None,
            diplomas: Vec::new(),
            report: FileReport {
                ok: false,
                tipo: Role::Desconhecido,
                errors: vec![diagnostic],
                validation_errors: Vec::new(),
                fetch_errors: Vec::new(),
                wrong_type: false,
                trace,
            },
        }
    }
}

/// Result of a whole batch: one `FileResult` per input item, in input
/// order, plus the static field catalog snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct BatchResult {
    pub files: Vec<FileResult>,
    pub available_fields: FieldCatalog,
}

/// Serialize `None` as `{}` and read `{}` back as `None`, matching the
/// wire contract for absent institution/date metadata.
mod empty_map_opt {
    use serde::de::DeserializeOwned;
    use serde::ser::SerializeMap;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<T: Serialize, S: Serializer>(
        value: &Option<T>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(inner) => inner.serialize(serializer),
            None => serializer.serialize_map(Some(0))?.end(),
        }
    }

    pub fn deserialize<'de, T: DeserializeOwned, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<T>, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        match &value {
            serde_json::Value::Null => Ok(None),
            serde_json::Value::Object(map) if map.is_empty() => Ok(None),
            _ => serde_json::from_value(value)
                .map(Some)
                .map_err(serde::de::Error::custom),
        }
    }
}
