use liquida_core::models::payslip::Category;
use liquida_core::payslip::rules::split_pages;
use liquida_core::{
    AnchorPayslipParser, ExtractionError, LiquidaConfig, PayPeriod, RecordStore, SectionKind,
    UnresolvedPolicy,
};
use pretty_assertions::assert_eq;
use rust_decimal::Decimal;

fn payslip(month: &str, year: i32, afp: &str, legal_total: &str, net: &str) -> String {
    format!(
        "EMPRESA DE SERVICIOS LTDA.  RUT 76.123.456-7
         LIQUIDACIÓN DE SUELDO {month} {year}
         Trabajador: María González
         Folio 20240001234
         HABERES AFECTOS
         Sueldo Base                      $ 1.100.000
         Gratificación Legal: $ 209.396
         Horas Extras                     $ 45.500
         Total Haberes Afectos: $ 1.354.896
         HABERES EXENTOS
         Asignación Movilización          $ 50.000
         Asignación Colación              $ 60.000
         Total Haberes Exentos: $ 110.000
         DESCUENTOS LEGALES
         AFP Modelo 10,58%                $ {afp}
         Cotización Salud Isapre Colmena  $ 120.000
         Seguro de Cesantía 0,6%          $ 8.129
         Impuesto Único                   $ 21.384
         TOTAL DESCUENTOS LEGALES         $ {legal_total}
         OTROS DESCUENTOS
         Cuota Caja de Compensación       $ 15.000
         Préstamo Caja                    $ 40.000
         TOTAL OTROS DESCUENTOS           $ 55.000
         Total Imponible: $ 1.354.896
         Total Tributable: $ 1.083.418
         Líquido a Pagar: $ 1.237.033"
    )
    .replace("$ 1.237.033", net)
}

#[test]
fn extracts_a_complete_payslip() {
    let text = payslip("Marzo", 2024, "143.348", "292.861", "$ 1.237.033");
    let record = AnchorPayslipParser::new().process_document(&text).unwrap();

    assert_eq!(record.period, PayPeriod::new(2024, 3).unwrap());
    assert_eq!(record.gross_amount, Decimal::from(1_464_896));
    assert_eq!(record.net_amount, Some(Decimal::from(1_237_033)));
    assert_eq!(record.total_imponible, Some(Decimal::from(1_354_896)));
    assert_eq!(record.total_tributable, Some(Decimal::from(1_083_418)));

    assert_eq!(record.items_in(SectionKind::EarningsTaxable).count(), 3);
    assert_eq!(record.items_in(SectionKind::EarningsExempt).count(), 2);
    assert_eq!(record.items_in(SectionKind::LegalDeduction).count(), 4);
    assert_eq!(record.items_in(SectionKind::OtherDeduction).count(), 2);

    let totals = record.category_totals();
    assert_eq!(totals[&Category::PensionFund], Decimal::from(143_348));
    assert_eq!(totals[&Category::Health], Decimal::from(120_000));
    assert_eq!(totals[&Category::Unemployment], Decimal::from(8_129));
    assert_eq!(totals[&Category::IncomeTax], Decimal::from(21_384));
    assert_eq!(totals[&Category::Other], Decimal::from(55_000));

    assert_eq!(record.findings.len(), 4);
    assert!(record.is_valid(), "{:?}", record.findings);
    assert!(record.warnings.is_empty(), "{:?}", record.warnings);
}

#[test]
fn reports_section_mismatch_without_blocking() {
    let text = payslip("Abril", 2024, "143.348", "302.861", "$ 1.237.033");
    let record = AnchorPayslipParser::new().process_document(&text).unwrap();

    assert!(!record.is_valid());
    let invalid: Vec<_> = record.findings.iter().filter(|f| !f.within_tolerance).collect();
    assert_eq!(invalid.len(), 1);
    assert_eq!(invalid[0].section, SectionKind::LegalDeduction);
    assert_eq!(invalid[0].difference(), Decimal::from(10_000));
}

#[test]
fn batch_skips_unresolved_documents_and_upserts() {
    let documents = vec![
        payslip("Enero", 2024, "143.348", "292.861", "$ 1.237.033"),
        "Documento sin fecha\nLíquido a pagar: $ 100.000".to_string(),
        payslip("Febrero", 2024, "143.348", "292.861", "$ 1.237.033"),
        // Corrected reissue of January.
        payslip("Enero", 2024, "143.348", "292.861", "$ 1.240.000"),
    ];

    let outcome = AnchorPayslipParser::new().process_batch(&documents);
    assert_eq!(outcome.records.len(), 3);
    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(outcome.failures[0].index, 1);
    assert!(matches!(outcome.failures[0].error, ExtractionError::PeriodUnresolved { .. }));

    let store: RecordStore = outcome.records.into_iter().collect();
    assert_eq!(store.len(), 2);

    let keys: Vec<String> = store.list_all().iter().map(|r| r.key()).collect();
    assert_eq!(keys, vec!["2024-01", "2024-02"]);

    let january = store.get(&PayPeriod::new(2024, 1).unwrap()).unwrap();
    assert_eq!(january.net_amount, Some(Decimal::from(1_240_000)));
}

#[test]
fn form_feed_separated_pages_are_separate_documents() {
    let blob = format!(
        "{}\u{000C}{}\u{000C}",
        payslip("Mayo", 2023, "143.348", "292.861", "$ 1.237.033"),
        payslip("Junio", 2023, "143.348", "292.861", "$ 1.237.033"),
    );

    let pages = split_pages(&blob);
    assert_eq!(pages.len(), 2);

    let outcome = AnchorPayslipParser::new().process_batch(pages);
    let keys: Vec<String> = outcome.records.iter().map(|r| r.key()).collect();
    assert_eq!(keys, vec!["2023-05", "2023-06"]);
}

#[test]
fn sentinel_policy_from_config() {
    let json = r#"{ "period": { "on_unresolved": "sentinel" } }"#;
    let config: LiquidaConfig = serde_json::from_str(json).unwrap();
    assert_eq!(config.period.on_unresolved, UnresolvedPolicy::Sentinel);

    let parser = AnchorPayslipParser::from_config(&config);
    let record = parser
        .process_document("Documento sin fecha\nLíquido a pagar: $ 100.000")
        .unwrap();

    assert!(record.period.is_unknown());
    assert_eq!(record.net_amount, Some(Decimal::from(100_000)));
    assert!(!record.warnings.is_empty());
}

#[test]
fn fallback_period_uses_nearest_year() {
    let text = "Remuneraciones correspondientes al mes de Octubre\nEmitido 2022\nLíquido a pagar: $ 500.000";
    let record = AnchorPayslipParser::new().process_document(text).unwrap();
    assert_eq!(record.key(), "2022-10");
}

#[test]
fn record_serializes_with_period_key() {
    let text = payslip("Marzo", 2024, "143.348", "292.861", "$ 1.237.033");
    let record = AnchorPayslipParser::new().process_document(&text).unwrap();

    let json = serde_json::to_value(&record).unwrap();
    assert_eq!(json["period"], "2024-03");
    assert_eq!(json["items"][0]["section"], "earnings_taxable");
    assert_eq!(json["items"][3]["section"], "earnings_exempt");
    assert!(json["items"][0].get("category").is_none());
    assert_eq!(json["items"][5]["category"], "pension_fund");
}
