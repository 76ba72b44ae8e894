//! Role-conditional field extraction.
//!
//! Projects a validated fiscalization document into the flat record
//! model: institution metadata, the fiscalization period, and either
//! referenced diploma URLs (emissora) or inline diploma entries
//! (registradora). All text is whitespace-trimmed; a missing element
//! yields an empty string, never an error.

use crate::classify::Role;
use crate::document::{ParsedDocument, mec_child, text_at, text_at_descendant};
use crate::fields::{EMITTED_DIPLOMA_FIELDS, INSTITUTION_FIELDS, REGISTERED_DIPLOMA_FIELDS};
use crate::model::{DateRange, DiplomaRecord, InstitutionInfo};

/// Element holding institution metadata for each role.
fn institution_element_name(role: Role) -> Option<&'static str> {
    match role {
        Role::Emissora => Some("IESEmissora"),
        Role::Registradora => Some("IESRegistradora"),
        Role::Desconhecido => None,
    }
}

/// Extract institution metadata from the role's IES sub-element.
///
/// Returns `None` when the sub-element is absent entirely; individual
/// missing fields inside a present element become empty strings. An
/// absent IES element is empty metadata, not a validation defect.
pub fn extract_institution(doc: &ParsedDocument, role: Role) -> Option<InstitutionInfo> {
    let name = institution_element_name(role)?;
    let ies = doc.find_descendant(name)?;

    let mut info = InstitutionInfo::default();
    for spec in INSTITUTION_FIELDS {
        let value = text_at(ies, spec.path);
        match spec.key {
            "Nome" => info.nome = value,
            "CodigoMEC" => info.codigo_mec = value,
            "CNPJ" => info.cnpj = value,
            "Logradouro" => info.logradouro = value,
            "Numero" => info.numero = value,
            "Bairro" => info.bairro = value,
            "Municipio" => info.municipio = value,
            "UF" => info.uf = value,
            "CEP" => info.cep = value,
            _ => unreachable!("unknown institution field key"),
        }
    }
    Some(info)
}

/// Extract the fiscalization period dates from anywhere in the tree.
pub fn extract_dates(doc: &ParsedDocument) -> DateRange {
    DateRange {
        inicio: doc.text_of("DataInicioFiscalizacao"),
        fim: doc.text_of("DataFimFiscalizacao"),
    }
}

/// Discover referenced diploma-document URLs, in document order.
///
/// Only absolute `http`/`https` URLs are accepted; anything else is
/// silently skipped.
pub fn find_diploma_urls(doc: &ParsedDocument) -> Vec<String> {
    doc.find_descendants("URLXMLdoDiplomado")
        .iter()
        .filter_map(|node| {
            let url = node.text().trim().to_string();
            let lower = url.to_lowercase();
            if lower.starts_with("http://") || lower.starts_with("https://") {
                Some(url)
            } else {
                None
            }
        })
        .collect()
}

/// Flatten a fetched diploma document through the emitted-field table.
///
/// Best-effort: runs identically on valid and invalid documents, so an
/// invalid remote diploma still produces a (tagged) record.
pub fn extract_emitted_fields(doc: &ParsedDocument) -> Vec<(String, String)> {
    let Some(root) = doc.doc().root() else {
        return EMITTED_DIPLOMA_FIELDS
            .iter()
            .map(|spec| (spec.key.to_string(), String::new()))
            .collect();
    };

    EMITTED_DIPLOMA_FIELDS
        .iter()
        .map(|spec| (spec.key.to_string(), text_at_descendant(root, spec.path)))
        .collect()
}

/// Extract the inline diploma entries of a registradora filing, in
/// document order.
pub fn extract_registered_diplomas(doc: &ParsedDocument) -> Vec<DiplomaRecord> {
    doc.find_descendants("DiplomaFiscalizado")
        .iter()
        .map(|entry| {
            let fields = REGISTERED_DIPLOMA_FIELDS
                .iter()
                .map(|spec| {
                    let value = match spec.path.split_first() {
                        Some((first, rest)) => match mec_child(*entry, first) {
                            Some(child) => text_at(child, rest),
                            None => String::new(),
                        },
                        None => String::new(),
                    };
                    (spec.key.to_string(), value)
                })
                .collect();
            DiplomaRecord::registered(fields)
        })
        .collect()
}
