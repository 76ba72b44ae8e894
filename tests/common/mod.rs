//! Shared fixtures: permissive test schemas, document builders, and an
//! in-process HTTP server for remote diploma documents.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::extract::State;
use axum::http::{StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use tempfile::TempDir;

use diploma_fiscal::document::MEC_NAMESPACE;
use diploma_fiscal::registry::{DEFAULT_DIPLOMA_XSD, DEFAULT_FISCAL_XSD, SchemaRegistry};

/// Accepts any content under an `ArquivoFiscalizacao` root in the MEC
/// namespace; any other root fails validation.
const FISCAL_TEST_XSD: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
           targetNamespace="http://portal.mec.gov.br/diplomadigital/arquivos-em-xsd"
           elementFormDefault="qualified">
    <xs:element name="ArquivoFiscalizacao">
        <xs:complexType>
            <xs:sequence>
                <xs:any processContents="skip" minOccurs="0" maxOccurs="unbounded"/>
            </xs:sequence>
        </xs:complexType>
    </xs:element>
</xs:schema>"#;

/// Same shape for the secondary schema: `DiplomaDigital` root required.
const DIPLOMA_TEST_XSD: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
           targetNamespace="http://portal.mec.gov.br/diplomadigital/arquivos-em-xsd"
           elementFormDefault="qualified">
    <xs:element name="DiplomaDigital">
        <xs:complexType>
            <xs:sequence>
                <xs:any processContents="skip" minOccurs="0" maxOccurs="unbounded"/>
            </xs:sequence>
        </xs:complexType>
    </xs:element>
</xs:schema>"#;

/// Write both test schemas into a fresh directory and compile them.
/// The returned `TempDir` must stay alive for the registry's paths to
/// remain meaningful in assertions.
pub fn test_registry() -> (TempDir, Arc<SchemaRegistry>) {
    let dir = tempfile::tempdir().expect("tempdir");
    let fiscal = write_schema(&dir, DEFAULT_FISCAL_XSD, FISCAL_TEST_XSD);
    let diploma = write_schema(&dir, DEFAULT_DIPLOMA_XSD, DIPLOMA_TEST_XSD);
    let registry = SchemaRegistry::load(&fiscal, &diploma).expect("compile test schemas");
    (dir, Arc::new(registry))
}

fn write_schema(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, content).expect("write schema");
    path
}

/// An emissora filing referencing the given diploma URLs.
pub fn emissora_xml(urls: &[String]) -> String {
    let url_elements: String = urls
        .iter()
        .map(|url| format!("<URLXMLdoDiplomado>{url}</URLXMLdoDiplomado>"))
        .collect();
    format!(
        r#"<ArquivoFiscalizacao xmlns="{MEC_NAMESPACE}">
  <infArquivoFiscalizacaoEmissora>
    <IESEmissora>
      <Nome>Universidade Emissora</Nome>
      <CodigoMEC>1001</CodigoMEC>
      <Endereco><NomeMunicipio>Campinas</NomeMunicipio><UF>SP</UF></Endereco>
    </IESEmissora>
    <DataInicioFiscalizacao>2024-01-01</DataInicioFiscalizacao>
    <DataFimFiscalizacao>2024-12-31</DataFimFiscalizacao>
    {url_elements}
  </infArquivoFiscalizacaoEmissora>
</ArquivoFiscalizacao>"#
    )
}

/// A registradora filing with one inline diploma entry per code.
pub fn registradora_xml(codes: &[&str]) -> String {
    let entries: String = codes
        .iter()
        .map(|code| {
            format!(
                "<DiplomaFiscalizado>
                   <CodigoDiploma>{code}</CodigoDiploma>
                   <CPFDetentor>00000000000</CPFDetentor>
                 </DiplomaFiscalizado>"
            )
        })
        .collect();
    format!(
        r#"<ArquivoFiscalizacao xmlns="{MEC_NAMESPACE}">
  <infArquivoFiscalizacaoRegistradora>
    <IESRegistradora>
      <Nome>Universidade Registradora</Nome>
      <Endereco><NomeMunicipio>Niteroi</NomeMunicipio><UF>RJ</UF></Endereco>
    </IESRegistradora>
    <DataInicioFiscalizacao>2024-02-01</DataInicioFiscalizacao>
    <DataFimFiscalizacao>2024-11-30</DataFimFiscalizacao>
    {entries}
  </infArquivoFiscalizacaoRegistradora>
</ArquivoFiscalizacao>"#
    )
}

/// A remote diploma document that passes the secondary schema.
pub fn diploma_xml(nome: &str) -> String {
    format!(
        r#"<DiplomaDigital xmlns="{MEC_NAMESPACE}">
  <Diplomado><Nome>{nome}</Nome><CPF>11111111111</CPF></Diplomado>
  <DadosCurso><NomeCurso>Engenharia</NomeCurso></DadosCurso>
</DiplomaDigital>"#
    )
}

/// A remote diploma document with the wrong root: parses, fails the
/// secondary schema.
pub fn invalid_diploma_xml(nome: &str) -> String {
    format!(
        r#"<OutroDocumento xmlns="{MEC_NAMESPACE}">
  <Diplomado><Nome>{nome}</Nome></Diplomado>
</OutroDocumento>"#
    )
}

/// A document with the wrong root for the primary schema: parses and
/// classifies, fails validation.
pub fn invalid_fiscal_xml() -> String {
    format!(
        r#"<DocumentoQualquer xmlns="{MEC_NAMESPACE}">
  <infArquivoFiscalizacaoEmissora/>
</DocumentoQualquer>"#
    )
}

/// One servable document: body plus an optional artificial delay
/// before responding.
#[derive(Clone)]
pub struct ServedFile {
    pub body: String,
    pub delay: Option<Duration>,
}

impl ServedFile {
    pub fn immediate(body: String) -> Self {
        Self { body, delay: None }
    }

    pub fn delayed(body: String, delay: Duration) -> Self {
        Self {
            body,
            delay: Some(delay),
        }
    }
}

async fn serve_file(
    State(files): State<Arc<HashMap<String, ServedFile>>>,
    uri: Uri,
) -> Response {
    match files.get(uri.path()) {
        Some(file) => {
            if let Some(delay) = file.delay {
                tokio::time::sleep(delay).await;
            }
            (StatusCode::OK, file.body.clone()).into_response()
        }
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// Serve a fixed path→body map over loopback HTTP; unknown paths are
/// 404. Returns the base URL.
pub async fn serve_files(files: Vec<(&str, String)>) -> String {
    serve_entries(
        files
            .into_iter()
            .map(|(path, body)| (path, ServedFile::immediate(body)))
            .collect(),
    )
    .await
}

/// Like `serve_files`, with per-path response delays.
pub async fn serve_entries(files: Vec<(&str, ServedFile)>) -> String {
    let map: Arc<HashMap<String, ServedFile>> = Arc::new(
        files
            .into_iter()
            .map(|(path, file)| (path.to_string(), file))
            .collect(),
    );
    let app = Router::new().fallback(serve_file).with_state(map);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind loopback");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    format!("http://{addr}")
}
