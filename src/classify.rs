//! Structural classification of a fiscalization document into its filer
//! role.
//!
//! Classification is a pure structural check on marker elements and does
//! not depend on schema validation: an invalid document can still be
//! classified.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::document::ParsedDocument;

/// Marker element present only in emissora filings.
const EMISSORA_MARKER: &str = "infArquivoFiscalizacaoEmissora";

/// Marker element present only in registradora filings.
const REGISTRADORA_MARKER: &str = "infArquivoFiscalizacaoRegistradora";

/// Declared filer category of a fiscalization document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Issuing institution filing; references per-diploma documents by URL.
    Emissora,
    /// Registering institution filing; embeds diploma entries inline.
    Registradora,
    /// Neither marker present.
    Desconhecido,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Emissora => "emissora",
            Role::Registradora => "registradora",
            Role::Desconhecido => "desconhecido",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parses the user-supplied expected role. Only the two concrete roles
/// are accepted; `desconhecido` is a classification outcome, not a
/// selectable expectation.
impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "emissora" => Ok(Role::Emissora),
            "registradora" => Ok(Role::Registradora),
            other => Err(format!("tipo desconhecido: '{other}'")),
        }
    }
}

/// Classify a parsed document by marker presence anywhere in the tree.
///
/// The emissora marker wins; the registradora marker is only consulted
/// when the emissora marker is absent. Valid filings carry exactly one.
pub fn classify(doc: &ParsedDocument) -> Role {
    if doc.find_descendant(EMISSORA_MARKER).is_some() {
        return Role::Emissora;
    }
    if doc.find_descendant(REGISTRADORA_MARKER).is_some() {
        return Role::Registradora;
    }
    Role::Desconhecido
}
