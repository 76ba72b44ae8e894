//! End-to-end pipeline behavior through the batch orchestrator.

mod common;

use diploma_fiscal::batch::{BatchConfig, BatchItem, BatchProcessor};
use diploma_fiscal::classify::Role;
use diploma_fiscal::model::BatchResult;

fn processor(registry: std::sync::Arc<diploma_fiscal::SchemaRegistry>) -> BatchProcessor {
    BatchProcessor::new(
        registry,
        BatchConfig {
            max_concurrent_files: 4,
            max_concurrent_fetches: 4,
            fetch_timeout_seconds: 5,
        },
    )
    .expect("build processor")
}

fn item(filename: &str, xml: String) -> BatchItem {
    BatchItem {
        filename: filename.to_string(),
        data: xml.into_bytes(),
    }
}

async fn run(items: Vec<BatchItem>, expected: Option<Role>) -> BatchResult {
    let (_dir, registry) = common::test_registry();
    processor(registry).process_batch(items, expected).await
}

#[tokio::test]
async fn registradora_filing_yields_inline_diplomas_in_document_order() {
    let result = run(
        vec![item("reg.xml", common::registradora_xml(&["D1", "D2", "D3"]))],
        None,
    )
    .await;

    assert_eq!(result.files.len(), 1);
    let file = &result.files[0];
    assert!(file.report.ok);
    assert_eq!(file.tipo, Role::Registradora);
    assert_eq!(file.diplomas.len(), 3);

    let codes: Vec<&str> = file
        .diplomas
        .iter()
        .map(|d| {
            d.flatten()
                .iter()
                .find(|(k, _)| k == "CodigoDiploma")
                .map(|(_, v)| v.as_str())
                .unwrap()
        })
        .collect();
    assert_eq!(codes, vec!["D1", "D2", "D3"]);

    let ies = file.ies_info.as_ref().unwrap();
    assert_eq!(ies.nome, "Universidade Registradora");
    assert_eq!(ies.uf, "RJ");
    let dates = file.dates_info.as_ref().unwrap();
    assert_eq!(dates.inicio, "2024-02-01");
}

#[tokio::test]
async fn emissora_filing_resolves_remote_diplomas_in_url_order() {
    let base = common::serve_files(vec![
        ("/d1.xml", common::diploma_xml("Ana")),
        ("/d2.xml", common::invalid_diploma_xml("Bruno")),
        ("/d3.xml", common::diploma_xml("Clara")),
    ])
    .await;

    let urls = vec![
        format!("{base}/d1.xml"),
        format!("{base}/d2.xml"),
        format!("{base}/missing.xml"),
        format!("{base}/d3.xml"),
    ];
    let result = run(vec![item("emi.xml", common::emissora_xml(&urls))], None).await;

    let file = &result.files[0];
    assert!(file.report.ok, "primary validation passed: {:?}", file.report.errors);
    assert_eq!(file.tipo, Role::Emissora);

    // The 404 URL produces no record; the invalid one produces a tagged
    // record. Order follows URL discovery order.
    assert_eq!(file.diplomas.len(), 3);
    assert!(file.diplomas[0].is_tagged_valid());
    assert!(file.diplomas[1].is_tagged_invalid());
    assert!(file.diplomas[2].is_tagged_valid());

    let names: Vec<&str> = file
        .diplomas
        .iter()
        .map(|d| {
            d.flatten()
                .iter()
                .find(|(k, _)| k == "Nome")
                .map(|(_, v)| v.as_str())
                .unwrap()
        })
        .collect();
    assert_eq!(names, vec!["Ana", "Bruno", "Clara"]);

    assert_eq!(file.report.fetch_errors.len(), 1);
    assert!(file.report.fetch_errors[0].url.ends_with("/missing.xml"));
    assert_eq!(file.report.validation_errors.len(), 1);
    assert!(file.report.validation_errors[0].url.ends_with("/d2.xml"));
}

#[tokio::test]
async fn failed_primary_validation_blocks_extraction() {
    let result = run(vec![item("bad.xml", common::invalid_fiscal_xml())], None).await;

    let file = &result.files[0];
    assert!(!file.report.ok);
    assert!(!file.report.errors.is_empty());
    assert_eq!(file.tipo, Role::Emissora);
    assert!(file.diplomas.is_empty());
    assert!(file.ies_info.is_none());
    assert!(file.dates_info.is_none());
}

#[tokio::test]
async fn malformed_item_does_not_affect_its_siblings() {
    let result = run(
        vec![
            item("broken.xml", "<<< not xml".to_string()),
            item("good.xml", common::registradora_xml(&["D1"])),
        ],
        None,
    )
    .await;

    assert_eq!(result.files.len(), 2);
    assert_eq!(result.files[0].filename, "broken.xml");
    assert!(!result.files[0].report.ok);
    assert!(
        result.files[0].report.errors[0].starts_with("Erro ao fazer parse do XML"),
        "got: {}",
        result.files[0].report.errors[0]
    );

    assert_eq!(result.files[1].filename, "good.xml");
    assert!(result.files[1].report.ok);
    assert_eq!(result.files[1].diplomas.len(), 1);
}

#[tokio::test]
async fn mismatched_expected_role_is_flagged_and_blocks_extraction() {
    let result = run(
        vec![item("reg.xml", common::registradora_xml(&["D1"]))],
        Some(Role::Emissora),
    )
    .await;

    let file = &result.files[0];
    assert!(file.report.wrong_type);
    assert!(!file.report.ok);
    assert!(file.diplomas.is_empty());
    assert!(
        file.report
            .errors
            .iter()
            .any(|e| e.starts_with("Tipo de arquivo incorreto")),
        "got: {:?}",
        file.report.errors
    );
}

#[tokio::test]
async fn unclassifiable_document_is_not_a_role_mismatch() {
    let xml = format!(
        r#"<ArquivoFiscalizacao xmlns="{}"><outro/></ArquivoFiscalizacao>"#,
        diploma_fiscal::document::MEC_NAMESPACE
    );
    let result = run(vec![item("x.xml", xml)], Some(Role::Emissora)).await;

    let file = &result.files[0];
    assert_eq!(file.tipo, Role::Desconhecido);
    assert!(!file.report.wrong_type);
    // Extraction is skipped entirely for unclassifiable documents.
    assert!(file.ies_info.is_none());
    assert!(file.dates_info.is_none());
    assert!(file.diplomas.is_empty());
}

#[tokio::test]
async fn timed_out_fetch_is_a_fetch_error_and_spares_siblings() {
    use std::time::Duration;

    let base = common::serve_entries(vec![
        ("/fast1.xml", common::ServedFile::immediate(common::diploma_xml("Ana"))),
        (
            "/slow.xml",
            common::ServedFile::delayed(common::diploma_xml("Bruno"), Duration::from_secs(5)),
        ),
        ("/fast2.xml", common::ServedFile::immediate(common::diploma_xml("Clara"))),
    ])
    .await;

    let urls = vec![
        format!("{base}/fast1.xml"),
        format!("{base}/slow.xml"),
        format!("{base}/fast2.xml"),
    ];

    let (_dir, registry) = common::test_registry();
    let processor = BatchProcessor::new(
        registry,
        BatchConfig {
            max_concurrent_files: 2,
            max_concurrent_fetches: 4,
            fetch_timeout_seconds: 1,
        },
    )
    .expect("build processor");

    let result = processor
        .process_batch(vec![item("emi.xml", common::emissora_xml(&urls))], None)
        .await;

    let file = &result.files[0];
    assert!(file.report.ok);

    // The timed-out link produces no record and never delays or cancels
    // its siblings.
    assert_eq!(file.diplomas.len(), 2);
    let names: Vec<&str> = file
        .diplomas
        .iter()
        .map(|d| {
            d.flatten()
                .iter()
                .find(|(k, _)| k == "Nome")
                .map(|(_, v)| v.as_str())
                .unwrap()
        })
        .collect();
    assert_eq!(names, vec!["Ana", "Clara"]);

    assert_eq!(file.report.fetch_errors.len(), 1);
    assert!(file.report.fetch_errors[0].url.ends_with("/slow.xml"));
    assert!(!file.report.fetch_errors[0].error.is_empty());
    assert!(file.report.validation_errors.is_empty());
}

#[tokio::test]
async fn mixed_batch_keeps_both_roles_and_the_catalog() {
    let base = common::serve_files(vec![
        ("/d1.xml", common::diploma_xml("Ana")),
        ("/d2.xml", common::diploma_xml("Bruno")),
    ])
    .await;
    let urls = vec![format!("{base}/d1.xml"), format!("{base}/d2.xml")];

    let result = run(
        vec![
            item("emissora.xml", common::emissora_xml(&urls)),
            item("registradora.xml", common::registradora_xml(&["D1", "D2", "D3"])),
        ],
        None,
    )
    .await;

    assert_eq!(result.files.len(), 2);

    let a = &result.files[0];
    assert_eq!(a.filename, "emissora.xml");
    assert!(a.report.ok);
    assert_eq!(a.diplomas.len(), 2);
    assert!(a.diplomas.iter().all(|d| d.is_tagged_valid()));

    let b = &result.files[1];
    assert_eq!(b.filename, "registradora.xml");
    assert!(b.report.ok);
    assert_eq!(b.diplomas.len(), 3);

    assert!(!result.available_fields.emissora.is_empty());
    assert!(!result.available_fields.registradora.is_empty());
}

#[tokio::test]
async fn output_order_matches_input_order() {
    let items: Vec<BatchItem> = (0..8)
        .map(|i| item(&format!("f{i}.xml"), common::registradora_xml(&["D"])))
        .collect();
    let result = run(items, None).await;

    let names: Vec<&str> = result.files.iter().map(|f| f.filename.as_str()).collect();
    let expected: Vec<String> = (0..8).map(|i| format!("f{i}.xml")).collect();
    assert_eq!(names, expected);
}

#[tokio::test]
async fn batch_processing_is_deterministic() {
    let (_dir, registry) = common::test_registry();
    let processor = processor(registry);

    let items = || {
        vec![
            item("a.xml", common::registradora_xml(&["D1", "D2"])),
            item("b.xml", "<<< not xml".to_string()),
            item("c.xml", common::invalid_fiscal_xml()),
        ]
    };

    let first = processor.process_batch(items(), None).await;
    let second = processor.process_batch(items(), None).await;

    assert_eq!(
        serde_json::to_value(&first).unwrap(),
        serde_json::to_value(&second).unwrap()
    );
}

#[tokio::test]
async fn result_carries_the_field_catalog() {
    let result = run(vec![item("a.xml", common::registradora_xml(&["D1"]))], None).await;
    let value = serde_json::to_value(&result).unwrap();
    let catalog = &value["available_fields"];
    assert!(catalog["emissora"].as_array().is_some_and(|v| !v.is_empty()));
    assert!(
        catalog["registradora"]
            .as_array()
            .is_some_and(|v| !v.is_empty())
    );
}
