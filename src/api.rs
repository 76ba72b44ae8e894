//! HTTP surface.
//!
//! Four routes: batch processing of uploaded XML files, batch processing
//! of a ZIP of XML files, CSV export of a previous batch result, and a
//! health probe. Client mistakes (no files, bad ZIP, unknown expected
//! role) are 400s with a diagnostic body; anything unexpected is a 500.
//! Per-file processing failures are never HTTP errors — they land inside
//! the batch result.

use std::io::Read;
use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use serde_json::json;
use tracing::error;

use crate::batch::{BatchItem, BatchProcessor};
use crate::classify::Role;
use crate::export::{self, ExportSelection};
use crate::model::BatchResult;
use crate::registry::SchemaRegistry;

/// Uploads are whole fiscalization batches; keep the limit generous.
const MAX_UPLOAD_BYTES: usize = 100 * 1024 * 1024;

/// Upper bound on a single decompressed ZIP entry. Declared entry sizes
/// come from the archive and are not trustworthy.
const MAX_ZIP_ENTRY_BYTES: u64 = MAX_UPLOAD_BYTES as u64;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<SchemaRegistry>,
    pub processor: Arc<BatchProcessor>,
}

/// HTTP-level failures. Processing failures of individual files never
/// surface here.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            ApiError::Internal(message) => {
                error!(%message, "internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, message)
            }
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/healthz", get(healthz))
        .route("/api/process-files", post(process_files))
        .route("/api/process-zip", post(process_zip))
        .route("/api/export-csv", post(export_csv))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(state)
}

/// Liveness probe reporting which schema files this process compiled.
async fn healthz(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "schemas": {
            "fiscal": state.registry.fiscal_path().display().to_string(),
            "diploma": state.registry.diploma_path().display().to_string(),
        },
    }))
}

/// Parse the optional expected-role form field. An unknown value is the
/// caller's mistake, not an unknown classification.
fn parse_expected_role(raw: Option<String>) -> Result<Option<Role>, ApiError> {
    match raw {
        None => Ok(None),
        Some(value) => {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                return Ok(None);
            }
            trimmed
                .parse::<Role>()
                .map(Some)
                .map_err(ApiError::BadRequest)
        }
    }
}

async fn process_files(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<BatchResult>, ApiError> {
    let mut items: Vec<BatchItem> = Vec::new();
    let mut tipo: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("multipart inválido: {e}")))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("files") => {
                let filename = field
                    .file_name()
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("arquivo_{}.xml", items.len() + 1));
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("falha ao ler upload: {e}")))?;
                items.push(BatchItem {
                    filename,
                    data: data.to_vec(),
                });
            }
            Some("tipo") => {
                tipo = Some(
                    field
                        .text()
                        .await
                        .map_err(|e| ApiError::BadRequest(format!("falha ao ler upload: {e}")))?,
                );
            }
            _ => {}
        }
    }

    if items.is_empty() {
        return Err(ApiError::BadRequest(
            "Nenhum arquivo enviado".to_string(),
        ));
    }

    let expected = parse_expected_role(tipo)?;
    let result = state.processor.process_batch(items, expected).await;
    Ok(Json(result))
}

async fn process_zip(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<BatchResult>, ApiError> {
    let mut archive_data: Option<(String, Vec<u8>)> = None;
    let mut tipo: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("multipart inválido: {e}")))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("falha ao ler upload: {e}")))?;
                archive_data = Some((filename, data.to_vec()));
            }
            Some("tipo") => {
                tipo = Some(
                    field
                        .text()
                        .await
                        .map_err(|e| ApiError::BadRequest(format!("falha ao ler upload: {e}")))?,
                );
            }
            _ => {}
        }
    }

    let Some((filename, data)) = archive_data else {
        return Err(ApiError::BadRequest(
            "Nenhum arquivo enviado".to_string(),
        ));
    };
    if !filename.to_lowercase().ends_with(".zip") {
        return Err(ApiError::BadRequest(
            "Arquivo deve ser um .zip".to_string(),
        ));
    }

    let expected = parse_expected_role(tipo)?;
    let items = extract_zip_entries(&data)?;
    if items.is_empty() {
        return Err(ApiError::BadRequest(
            "Nenhum arquivo XML encontrado no ZIP".to_string(),
        ));
    }

    let result = state.processor.process_batch(items, expected).await;
    Ok(Json(result))
}

/// Pull every XML entry out of the archive, in archive order. macOS
/// resource-fork entries are skipped.
fn extract_zip_entries(data: &[u8]) -> Result<Vec<BatchItem>, ApiError> {
    let cursor = std::io::Cursor::new(data);
    let mut archive = zip::ZipArchive::new(cursor)
        .map_err(|e| ApiError::BadRequest(format!("Arquivo ZIP inválido ou corrompido: {e}")))?;

    let mut items = Vec::new();
    for index in 0..archive.len() {
        let mut entry = archive
            .by_index(index)
            .map_err(|e| ApiError::BadRequest(format!("Arquivo ZIP inválido ou corrompido: {e}")))?;
        if !entry.is_file() {
            continue;
        }

        let name = entry.name().to_string();
        if name.starts_with("__MACOSX") || !name.to_lowercase().ends_with(".xml") {
            continue;
        }

        // Never allocate from the declared size; a hostile archive can
        // declare gigabytes while shipping a handful of bytes, or the
        // reverse through high compression ratios.
        if entry.size() > MAX_ZIP_ENTRY_BYTES {
            return Err(ApiError::BadRequest(format!(
                "Entrada muito grande no ZIP: {name}"
            )));
        }
        let mut data = Vec::new();
        std::io::Read::take(&mut entry, MAX_ZIP_ENTRY_BYTES + 1)
            .read_to_end(&mut data)
            .map_err(|e| ApiError::Internal(format!("falha ao ler entrada do ZIP: {e}")))?;
        if data.len() as u64 > MAX_ZIP_ENTRY_BYTES {
            return Err(ApiError::BadRequest(format!(
                "Entrada muito grande no ZIP: {name}"
            )));
        }

        // Entries are addressed by base name, matching a flat upload.
        let filename = name.rsplit('/').next().unwrap_or(&name).to_string();
        items.push(BatchItem { filename, data });
    }

    Ok(items)
}

async fn export_csv(
    Json(selection): Json<ExportSelection>,
) -> Result<Response, ApiError> {
    let table = export::build_table(&selection);
    let body = export::to_csv_bytes(&table);

    let response = (
        [
            (
                header::CONTENT_TYPE,
                "text/csv; charset=utf-8".to_string(),
            ),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", export::EXPORT_FILENAME),
            ),
        ],
        body,
    )
        .into_response();
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expected_role_accepts_known_values() {
        assert_eq!(
            parse_expected_role(Some("emissora".to_string())).unwrap(),
            Some(Role::Emissora)
        );
        assert_eq!(
            parse_expected_role(Some("registradora".to_string())).unwrap(),
            Some(Role::Registradora)
        );
    }

    #[test]
    fn expected_role_treats_blank_as_absent() {
        assert_eq!(parse_expected_role(None).unwrap(), None);
        assert_eq!(parse_expected_role(Some("  ".to_string())).unwrap(), None);
    }

    #[test]
    fn expected_role_rejects_unknown_values() {
        assert!(parse_expected_role(Some("outro".to_string())).is_err());
        assert!(parse_expected_role(Some("desconhecido".to_string())).is_err());
    }

    #[test]
    fn zip_extraction_filters_non_xml_and_macosx_entries() {
        use std::io::Write;
        use zip::write::SimpleFileOptions;

        let mut buffer = std::io::Cursor::new(Vec::new());
        {
            let mut writer = zip::ZipWriter::new(&mut buffer);
            let options = SimpleFileOptions::default();
            writer.start_file("a.xml", options).unwrap();
            writer.write_all(b"<a/>").unwrap();
            writer.start_file("notas.txt", options).unwrap();
            writer.write_all(b"texto").unwrap();
            writer.start_file("__MACOSX/._a.xml", options).unwrap();
            writer.write_all(b"lixo").unwrap();
            writer.start_file("pasta/b.XML", options).unwrap();
            writer.write_all(b"<b/>").unwrap();
            writer.finish().unwrap();
        }

        let items = extract_zip_entries(buffer.get_ref()).unwrap();
        let names: Vec<&str> = items.iter().map(|i| i.filename.as_str()).collect();
        assert_eq!(names, vec!["a.xml", "b.XML"]);
        assert_eq!(items[0].data, b"<a/>");
    }

    #[test]
    fn corrupt_zip_is_a_bad_request() {
        let result = extract_zip_entries(b"definitely not a zip");
        assert!(matches!(result, Err(ApiError::BadRequest(_))));
    }

    fn push_u16(buf: &mut Vec<u8>, v: u16) {
        buf.extend_from_slice(&v.to_le_bytes());
    }

    fn push_u32(buf: &mut Vec<u8>, v: u32) {
        buf.extend_from_slice(&v.to_le_bytes());
    }

    fn crc32(data: &[u8]) -> u32 {
        let mut crc = 0xFFFF_FFFFu32;
        for &byte in data {
            crc ^= u32::from(byte);
            for _ in 0..8 {
                crc = if crc & 1 != 0 {
                    (crc >> 1) ^ 0xEDB8_8320
                } else {
                    crc >> 1
                };
            }
        }
        !crc
    }

    /// A minimal archive holding one stored entry whose headers declare
    /// `declared` decompressed bytes while carrying only `data`.
    fn zip_with_declared_size(name: &[u8], data: &[u8], declared: u32) -> Vec<u8> {
        let mut zip = Vec::new();

        // Local file header.
        zip.extend_from_slice(&[0x50, 0x4b, 0x03, 0x04]);
        push_u16(&mut zip, 20); // version needed
        push_u16(&mut zip, 0); // flags
        push_u16(&mut zip, 0); // method: stored
        push_u16(&mut zip, 0); // mod time
        push_u16(&mut zip, 0); // mod date
        push_u32(&mut zip, crc32(data));
        push_u32(&mut zip, data.len() as u32);
        push_u32(&mut zip, declared);
        push_u16(&mut zip, name.len() as u16);
        push_u16(&mut zip, 0); // extra len
        zip.extend_from_slice(name);
        zip.extend_from_slice(data);

        // Central directory.
        let cd_offset = zip.len() as u32;
        zip.extend_from_slice(&[0x50, 0x4b, 0x01, 0x02]);
        push_u16(&mut zip, 20); // version made by
        push_u16(&mut zip, 20); // version needed
        push_u16(&mut zip, 0); // flags
        push_u16(&mut zip, 0); // method
        push_u16(&mut zip, 0); // mod time
        push_u16(&mut zip, 0); // mod date
        push_u32(&mut zip, crc32(data));
        push_u32(&mut zip, data.len() as u32);
        push_u32(&mut zip, declared);
        push_u16(&mut zip, name.len() as u16);
        push_u16(&mut zip, 0); // extra len
        push_u16(&mut zip, 0); // comment len
        push_u16(&mut zip, 0); // disk start
        push_u16(&mut zip, 0); // internal attrs
        push_u32(&mut zip, 0); // external attrs
        push_u32(&mut zip, 0); // local header offset
        zip.extend_from_slice(name);
        let cd_size = zip.len() as u32 - cd_offset;

        // End of central directory.
        zip.extend_from_slice(&[0x50, 0x4b, 0x05, 0x06]);
        push_u16(&mut zip, 0); // disk
        push_u16(&mut zip, 0); // cd disk
        push_u16(&mut zip, 1); // entries this disk
        push_u16(&mut zip, 1); // entries total
        push_u32(&mut zip, cd_size);
        push_u32(&mut zip, cd_offset);
        push_u16(&mut zip, 0); // comment len

        zip
    }

    #[test]
    fn oversized_declared_entry_is_rejected_before_reading() {
        // 4 real bytes declaring ~4 GiB decompressed.
        let zip = zip_with_declared_size(b"a.xml", b"<a/>", 0xFFFF_0000);

        match extract_zip_entries(&zip) {
            Err(ApiError::BadRequest(message)) => {
                assert!(message.contains("muito grande"), "got: {message}");
            }
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[test]
    fn honest_declared_size_still_extracts() {
        let zip = zip_with_declared_size(b"a.xml", b"<a/>", 4);

        let items = extract_zip_entries(&zip).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].data, b"<a/>");
    }
}
