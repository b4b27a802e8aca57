//! スプレッドシート読み込みテスト
//!
//! 実際のxlsx/csvファイルを作って読み込みを検証

use price_sync::sheet::{load_sheet, SheetSource};
use rust_xlsxwriter::Workbook;
use std::path::Path;
use tempfile::tempdir;

fn write_xlsx(path: &Path, sheet_name: &str, rows: &[Vec<&str>]) {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(sheet_name).unwrap();
    for (r, row) in rows.iter().enumerate() {
        for (c, value) in row.iter().enumerate() {
            if value.is_empty() {
                continue;
            }
            match value.parse::<f64>() {
                Ok(number) => worksheet.write_number(r as u32, c as u16, number).unwrap(),
                Err(_) => worksheet.write_string(r as u32, c as u16, *value).unwrap(),
            };
        }
    }
    workbook.save(path).unwrap();
}

/// ヘッダー付きのxlsx
#[tokio::test]
async fn test_load_xlsx_with_header() {
    let dir = tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("inventory.xlsx");
    write_xlsx(
        &path,
        "Inventory",
        &[
            vec!["Item Name", "SKU", "Brand", "Estimated Value", "Processed"],
            vec!["Organic Honey 500g", "HON-500", "BeeCo", "4.5", ""],
            vec!["Red Widget", "", "Acme", "", "yes"],
        ],
    );

    let items = load_sheet(&SheetSource::Local(path), None).await.unwrap();

    assert_eq!(items.len(), 2);
    assert_eq!(items[0].row, 2);
    assert_eq!(items[0].name, "Organic Honey 500g");
    assert_eq!(items[0].sku.as_deref(), Some("HON-500"));
    assert_eq!(items[0].estimated_value, Some(4.5));
    assert!(!items[0].processed);
    assert_eq!(items[1].sku, None);
    assert!(items[1].processed);
}

/// 18列レイアウトで列がヘッダー名で解決される
#[tokio::test]
async fn test_load_xlsx_wide_layout() {
    let dir = tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("wide.xlsx");
    let mut header = vec![""; 18];
    header[0] = "Date";
    header[3] = "Item Name";
    header[5] = "Manufacturer";
    header[7] = "SKU";
    header[9] = "Quantity";
    header[17] = "Processed";
    let mut data = vec![""; 18];
    data[0] = "2024-05-01";
    data[3] = "Pipette Tips 200uL";
    data[5] = "Eppendorf";
    data[7] = "EP-200";
    data[9] = "12";
    write_xlsx(&path, "Sheet1", &[header, data]);

    let items = load_sheet(&SheetSource::Local(path), None).await.unwrap();

    assert_eq!(items.len(), 1);
    assert_eq!(items[0].name, "Pipette Tips 200uL");
    assert_eq!(items[0].brand.as_deref(), Some("Eppendorf"));
    assert_eq!(items[0].sku.as_deref(), Some("EP-200"));
    assert_eq!(items[0].quantity, Some(12.0));
}

/// ワークシートを名前で指定
#[tokio::test]
async fn test_load_named_worksheet() {
    let dir = tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("named.xlsx");
    write_xlsx(&path, "Stock", &[vec!["Item Name"], vec!["Honey Jar"]]);

    let items = load_sheet(&SheetSource::Local(path.clone()), Some("Stock")).await.unwrap();
    assert_eq!(items[0].name, "Honey Jar");

    let missing = load_sheet(&SheetSource::Local(path), Some("Nope")).await;
    assert!(missing.is_err());
}

/// ローカルCSV
#[tokio::test]
async fn test_load_csv_file() {
    let dir = tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("inventory.csv");
    std::fs::write(
        &path,
        "Item Name,SKU,Brand,Estimated Value\n\"Widget, Large\",W-L,Acme,\"$1,250.00\"\n",
    )
    .unwrap();

    let items = load_sheet(&SheetSource::Local(path), None).await.unwrap();

    assert_eq!(items.len(), 1);
    assert_eq!(items[0].name, "Widget, Large");
    assert_eq!(items[0].estimated_value, Some(1250.0));
}
