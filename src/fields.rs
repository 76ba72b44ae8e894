//! Static field catalog and the declarative extraction tables behind it.
//!
//! The catalog is the role-indexed list of exportable field identifiers
//! and display labels returned with every batch. Extraction is driven by
//! the descriptor tables below, so the set of keys a record can carry
//! and the set of ids the catalog advertises are checked against each
//! other in tests instead of drifting apart silently.

use serde::Serialize;

/// One extractable field: output key plus the namespace-qualified
/// element path that produces its value.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub key: &'static str,
    pub path: &'static [&'static str],
}

/// One exportable field as advertised to clients.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct FieldDef {
    pub id: &'static str,
    pub label: &'static str,
}

/// Fields of a diploma record built from a remotely fetched diploma
/// document (emissora flow). Paths are anchored at the first matching
/// descendant of the document root.
pub const EMITTED_DIPLOMA_FIELDS: &[FieldSpec] = &[
    FieldSpec { key: "Nome", path: &["Diplomado", "Nome"] },
    FieldSpec { key: "NomeSocial", path: &["Diplomado", "NomeSocial"] },
    FieldSpec { key: "CPF", path: &["Diplomado", "CPF"] },
    FieldSpec { key: "Sexo", path: &["Diplomado", "Sexo"] },
    FieldSpec { key: "DataNascimento", path: &["Diplomado", "DataNascimento"] },
    FieldSpec { key: "Nacionalidade", path: &["Diplomado", "Nacionalidade"] },
    FieldSpec { key: "NaturalMunicipio", path: &["Diplomado", "Naturalidade", "NomeMunicipio"] },
    FieldSpec { key: "NaturalUF", path: &["Diplomado", "Naturalidade", "UF"] },
    FieldSpec { key: "NomeCurso", path: &["DadosCurso", "NomeCurso"] },
    FieldSpec { key: "CodigoEMECCurso", path: &["DadosCurso", "CodigoEMECCurso"] },
    FieldSpec { key: "GrauConferido", path: &["DadosCurso", "GrauConferido"] },
    FieldSpec { key: "TituloConferido", path: &["DadosCurso", "TituloConferido", "Titulo"] },
    FieldSpec { key: "Modalidade", path: &["DadosCurso", "Modalidade"] },
    FieldSpec { key: "Habilitacao", path: &["DadosCurso", "Habilitacao"] },
    FieldSpec { key: "CodigoDiploma", path: &["DadosDiploma", "CodigoDiploma"] },
    FieldSpec { key: "DataExpedicao", path: &["DadosDiploma", "DataExpedicao"] },
    FieldSpec { key: "DataColacaoGrau", path: &["DadosDiploma", "DataColacaoGrau"] },
    FieldSpec { key: "DataRegistro", path: &["DadosRegistro", "DataRegistroDiploma"] },
    FieldSpec { key: "LivroRegistro", path: &["DadosRegistro", "LivroRegistro"] },
    FieldSpec { key: "FolhaRegistro", path: &["DadosRegistro", "FolhaRegistro"] },
    FieldSpec { key: "NumeroRegistro", path: &["DadosRegistro", "NumeroRegistro"] },
];

/// Fields of an inline diploma entry (registradora flow). Paths are
/// relative to the `DiplomaFiscalizado` element.
pub const REGISTERED_DIPLOMA_FIELDS: &[FieldSpec] = &[
    FieldSpec { key: "CodigoDiploma", path: &["CodigoDiploma"] },
    FieldSpec { key: "CPFDetentor", path: &["CPFDetentor"] },
    FieldSpec { key: "CodigoEMECEmissora", path: &["CodigoEMECEmissora"] },
    FieldSpec { key: "CodigoEMECCurso", path: &["CodigoEMECCurso"] },
    FieldSpec { key: "LivroRegistro", path: &["DadosRegistro", "LivroRegistro"] },
    FieldSpec { key: "NumeroRegistro", path: &["DadosRegistro", "NumeroRegistro"] },
    FieldSpec { key: "FolhaRegistro", path: &["DadosRegistro", "FolhaRegistro"] },
    FieldSpec { key: "DataColacaoGrau", path: &["DadosRegistro", "DataColacaoGrau"] },
    FieldSpec { key: "DataExpedicaoDiploma", path: &["DadosRegistro", "DataExpedicaoDiploma"] },
    FieldSpec { key: "DataRegistroDiploma", path: &["DadosRegistro", "DataRegistroDiploma"] },
    FieldSpec { key: "ResponsavelRegistroNome", path: &["DadosRegistro", "ResponsavelRegistro", "Nome"] },
    FieldSpec { key: "ResponsavelRegistroCPF", path: &["DadosRegistro", "ResponsavelRegistro", "CPF"] },
    FieldSpec { key: "IdDocumentacaoAcademica", path: &["IdDocumentacaoAcademica"] },
];

/// Institution metadata fields, relative to the `IESEmissora` /
/// `IESRegistradora` element.
pub const INSTITUTION_FIELDS: &[FieldSpec] = &[
    FieldSpec { key: "Nome", path: &["Nome"] },
    FieldSpec { key: "CodigoMEC", path: &["CodigoMEC"] },
    FieldSpec { key: "CNPJ", path: &["CNPJ"] },
    FieldSpec { key: "Logradouro", path: &["Endereco", "Logradouro"] },
    FieldSpec { key: "Numero", path: &["Endereco", "Numero"] },
    FieldSpec { key: "Bairro", path: &["Endereco", "Bairro"] },
    FieldSpec { key: "Municipio", path: &["Endereco", "NomeMunicipio"] },
    FieldSpec { key: "UF", path: &["Endereco", "UF"] },
    FieldSpec { key: "CEP", path: &["Endereco", "CEP"] },
];

/// Exportable fields for emissora batches, in catalog order.
pub const EMISSORA_CATALOG: &[FieldDef] = &[
    FieldDef { id: "Nome", label: "Nome do Diplomado" },
    FieldDef { id: "NomeSocial", label: "Nome Social" },
    FieldDef { id: "CPF", label: "CPF" },
    FieldDef { id: "Sexo", label: "Sexo" },
    FieldDef { id: "DataNascimento", label: "Data de Nascimento" },
    FieldDef { id: "Nacionalidade", label: "Nacionalidade" },
    FieldDef { id: "NaturalMunicipio", label: "Município de Nascimento" },
    FieldDef { id: "NaturalUF", label: "UF de Nascimento" },
    FieldDef { id: "NomeCurso", label: "Nome do Curso" },
    FieldDef { id: "CodigoEMECCurso", label: "Código EMEC do Curso" },
    FieldDef { id: "GrauConferido", label: "Grau Conferido" },
    FieldDef { id: "TituloConferido", label: "Título Conferido" },
    FieldDef { id: "Modalidade", label: "Modalidade" },
    FieldDef { id: "Habilitacao", label: "Habilitação" },
    FieldDef { id: "CodigoDiploma", label: "Código do Diploma" },
    FieldDef { id: "DataExpedicao", label: "Data de Expedição" },
    FieldDef { id: "DataColacaoGrau", label: "Data de Colação de Grau" },
    FieldDef { id: "DataRegistro", label: "Data de Registro" },
    FieldDef { id: "LivroRegistro", label: "Livro de Registro" },
    FieldDef { id: "FolhaRegistro", label: "Folha de Registro" },
    FieldDef { id: "NumeroRegistro", label: "Número de Registro" },
];

/// Exportable fields for registradora batches, in catalog order.
pub const REGISTRADORA_CATALOG: &[FieldDef] = &[
    FieldDef { id: "CodigoDiploma", label: "Código do Diploma" },
    FieldDef { id: "CPFDetentor", label: "CPF do Detentor" },
    FieldDef { id: "CodigoEMECEmissora", label: "Código EMEC Emissora" },
    FieldDef { id: "CodigoEMECCurso", label: "Código EMEC Curso" },
    FieldDef { id: "LivroRegistro", label: "Livro de Registro" },
    FieldDef { id: "NumeroRegistro", label: "Número de Registro" },
    FieldDef { id: "FolhaRegistro", label: "Folha de Registro" },
    FieldDef { id: "DataColacaoGrau", label: "Data de Colação de Grau" },
    FieldDef { id: "DataExpedicaoDiploma", label: "Data de Expedição" },
    FieldDef { id: "DataRegistroDiploma", label: "Data de Registro" },
    FieldDef { id: "ResponsavelRegistroNome", label: "Responsável - Nome" },
    FieldDef { id: "ResponsavelRegistroCPF", label: "Responsável - CPF" },
    FieldDef { id: "IdDocumentacaoAcademica", label: "ID Documentação Acadêmica" },
];

/// Static, role-indexed field catalog returned with every batch result.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct FieldCatalog {
    pub emissora: &'static [FieldDef],
    pub registradora: &'static [FieldDef],
}

/// The process-wide catalog snapshot. Fixed content, never derived from
/// the data.
pub const fn catalog() -> FieldCatalog {
    FieldCatalog {
        emissora: EMISSORA_CATALOG,
        registradora: REGISTRADORA_CATALOG,
    }
}
