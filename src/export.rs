//! Выгрузка очищенной таблицы в CSV

use std::fs::File;
use std::path::Path;

use polars::prelude::*;

use crate::error::Result;
use crate::types::CustomerTable;

/// Порядок колонок в выгрузке
pub const EXPORT_COLUMNS: [&str; 12] = [
    "id",
    "name",
    "age",
    "email",
    "purchase_amount",
    "purchase_date",
    "category",
    "satisfaction_score",
    "phone_number",
    "purchase_month",
    "purchase_category",
    "age_group",
];

pub fn to_dataframe(table: &CustomerTable) -> Result<DataFrame> {
    let records = &table.records;

    let ids: Vec<u32> = records.iter().map(|r| r.id).collect();
    let names: Vec<Option<String>> = records.iter().map(|r| r.name.clone()).collect();
    let ages: Vec<Option<f64>> = records.iter().map(|r| r.age).collect();
    let emails: Vec<Option<String>> = records.iter().map(|r| r.email.clone()).collect();
    let amounts: Vec<Option<f64>> = records.iter().map(|r| r.purchase_amount).collect();
    let dates: Vec<String> = records
        .iter()
        .map(|r| r.purchase_date.format("%Y-%m-%d").to_string())
        .collect();
    let categories: Vec<Option<String>> = records.iter().map(|r| r.category.clone()).collect();
    let scores: Vec<Option<f64>> = records.iter().map(|r| r.satisfaction_score).collect();
    let phones: Vec<Option<String>> = records.iter().map(|r| r.phone_number.clone()).collect();
    let months: Vec<Option<u32>> = records.iter().map(|r| r.purchase_month).collect();
    let purchase_categories: Vec<Option<&str>> = records
        .iter()
        .map(|r| r.purchase_category.map(|c| c.label()))
        .collect();
    let age_groups: Vec<Option<&str>> = records
        .iter()
        .map(|r| r.age_group.map(|g| g.label()))
        .collect();

    let df = DataFrame::new(vec![
        Series::new(EXPORT_COLUMNS[0].into(), ids).into(),
        Series::new(EXPORT_COLUMNS[1].into(), names).into(),
        Series::new(EXPORT_COLUMNS[2].into(), ages).into(),
        Series::new(EXPORT_COLUMNS[3].into(), emails).into(),
        Series::new(EXPORT_COLUMNS[4].into(), amounts).into(),
        Series::new(EXPORT_COLUMNS[5].into(), dates).into(),
        Series::new(EXPORT_COLUMNS[6].into(), categories).into(),
        Series::new(EXPORT_COLUMNS[7].into(), scores).into(),
        Series::new(EXPORT_COLUMNS[8].into(), phones).into(),
        Series::new(EXPORT_COLUMNS[9].into(), months).into(),
        Series::new(EXPORT_COLUMNS[10].into(), purchase_categories).into(),
        Series::new(EXPORT_COLUMNS[11].into(), age_groups).into(),
    ])?;

    Ok(df)
}

/// Запись таблицы целиком. Частичных выгрузок нет: любая ошибка возвращается вызывающему.
pub fn export_csv(table: &CustomerTable, path: &Path) -> Result<()> {
    let mut df = to_dataframe(table)?;
    let mut file = File::create(path)?;

    CsvWriter::new(&mut file)
        .include_header(true)
        .finish(&mut df)?;

    tracing::info!("Exported {} records to {}", df.height(), path.display());
    Ok(())
}
