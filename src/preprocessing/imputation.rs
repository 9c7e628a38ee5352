//! Заполнение пропусков и исправление недопустимых значений
//!
//! Порядок важен и повторяет исходный ноутбук:
//! 1. age/purchase_amount заполняются статистикой по исходной колонке;
//! 2. отрицательные значения обнуляются;
//! 3. колонка заполняется повторно статистикой, посчитанной уже после первого
//!    заполнения (без отрицательных значений).

use std::fmt;

use crate::config::Placeholders;
use crate::error::{PipelineError, Result};
use crate::preprocessing::statistics;
use crate::types::{CustomerRecord, CustomerTable};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillStatistic {
    Mean,
    Median,
}

impl FillStatistic {
    fn compute(&self, values: &[f64]) -> Option<f64> {
        match self {
            FillStatistic::Mean => statistics::mean(values),
            FillStatistic::Median => statistics::median(values),
        }
    }
}

impl fmt::Display for FillStatistic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FillStatistic::Mean => f.write_str("mean"),
            FillStatistic::Median => f.write_str("median"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FillValue {
    Statistic(FillStatistic, f64),
    Placeholder(String),
}

/// Что было сделано с одной колонкой за один проход
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnRepair {
    pub column: &'static str,
    pub filled: usize,
    pub invalidated: usize,
    pub value: FillValue,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RepairReport {
    pub columns: Vec<ColumnRepair>,
}

impl RepairReport {
    pub fn total_filled(&self) -> usize {
        self.columns.iter().map(|c| c.filled).sum()
    }

    pub fn total_invalidated(&self) -> usize {
        self.columns.iter().map(|c| c.invalidated).sum()
    }
}

/// Полный проход исправления пропусков по таблице
pub fn repair_missing_values(
    table: &mut CustomerTable,
    placeholders: &Placeholders,
) -> Result<RepairReport> {
    let records = &mut table.records;
    let mut report = RepairReport::default();

    normalize_text(records);

    // Текстовые колонки
    report.columns.push(fill_text(records, "name", &placeholders.name, |r| &mut r.name));
    report.columns.push(fill_text(records, "email", &placeholders.email, |r| &mut r.email));
    report.columns.push(fill_text(records, "category", &placeholders.category, |r| {
        &mut r.category
    }));
    report.columns.push(fill_text(
        records,
        "phone_number",
        &placeholders.phone_number,
        |r| &mut r.phone_number,
    ));

    // Числовые колонки: заполнение, затем исправление отрицательных и повторное заполнение
    report.columns.push(fill_numeric(records, "age", FillStatistic::Median, |r| &mut r.age)?);
    let invalid_ages = null_negatives(records, |r| &mut r.age);
    let mut refill = fill_numeric(records, "age", FillStatistic::Median, |r| &mut r.age)?;
    refill.invalidated = invalid_ages;
    report.columns.push(refill);

    report.columns.push(fill_numeric(
        records,
        "purchase_amount",
        FillStatistic::Mean,
        |r| &mut r.purchase_amount,
    )?);
    let invalid_amounts = null_negatives(records, |r| &mut r.purchase_amount);
    let mut refill = fill_numeric(
        records,
        "purchase_amount",
        FillStatistic::Mean,
        |r| &mut r.purchase_amount,
    )?;
    refill.invalidated = invalid_amounts;
    report.columns.push(refill);

    report.columns.push(fill_numeric(
        records,
        "satisfaction_score",
        FillStatistic::Median,
        |r| &mut r.satisfaction_score,
    )?);

    for column in &report.columns {
        tracing::debug!(
            "Repaired column {}: filled {}, invalidated {}, value {:?}",
            column.column,
            column.filled,
            column.invalidated,
            column.value
        );
    }

    Ok(report)
}

/// Удаление полных дубликатов строк (первое вхождение остается)
pub fn drop_duplicate_rows(table: &mut CustomerTable) -> usize {
    let before = table.records.len();
    let mut seen = std::collections::HashSet::new();
    table.records.retain(|record| seen.insert(row_key(record)));
    before - table.records.len()
}

/// Ключ строки для поиска дубликатов: все поля, включая производные
pub(crate) fn row_key(record: &CustomerRecord) -> String {
    serde_json::to_string(record).unwrap_or_else(|_| format!("{:?}", record))
}

fn normalize_text(records: &mut [CustomerRecord]) {
    for record in records.iter_mut() {
        for field in [
            &mut record.name,
            &mut record.email,
            &mut record.category,
            &mut record.phone_number,
        ] {
            let trimmed = field.as_deref().map(str::trim).filter(|s| !s.is_empty());
            *field = trimmed.map(str::to_string);
        }

        if let Some(email) = record.email.as_mut() {
            *email = email.to_lowercase();
        }
    }
}

fn fill_text<F>(
    records: &mut [CustomerRecord],
    column: &'static str,
    placeholder: &str,
    field: F,
) -> ColumnRepair
where
    F: Fn(&mut CustomerRecord) -> &mut Option<String>,
{
    let mut filled = 0;
    for record in records.iter_mut() {
        let slot = field(record);
        if slot.is_none() {
            *slot = Some(placeholder.to_string());
            filled += 1;
        }
    }

    ColumnRepair {
        column,
        filled,
        invalidated: 0,
        value: FillValue::Placeholder(placeholder.to_string()),
    }
}

fn fill_numeric<F>(
    records: &mut [CustomerRecord],
    column: &'static str,
    statistic: FillStatistic,
    field: F,
) -> Result<ColumnRepair>
where
    F: Fn(&mut CustomerRecord) -> &mut Option<f64>,
{
    let present: Vec<f64> = records.iter_mut().filter_map(|r| *field(r)).collect();
    let value = statistic.compute(&present).ok_or_else(|| {
        PipelineError::DataQuality(format!(
            "column '{}' has no values, {} is undefined",
            column, statistic
        ))
    })?;

    let mut filled = 0;
    for record in records.iter_mut() {
        let slot = field(record);
        if slot.is_none() {
            *slot = Some(value);
            filled += 1;
        }
    }

    Ok(ColumnRepair {
        column,
        filled,
        invalidated: 0,
        value: FillValue::Statistic(statistic, value),
    })
}

fn null_negatives<F>(records: &mut [CustomerRecord], field: F) -> usize
where
    F: Fn(&mut CustomerRecord) -> &mut Option<f64>,
{
    let mut count = 0;
    for record in records.iter_mut() {
        let slot = field(record);
        if matches!(*slot, Some(v) if v < 0.0) {
            *slot = None;
            count += 1;
        }
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn record(id: u32, age: Option<f64>, amount: Option<f64>) -> CustomerRecord {
        CustomerRecord {
            id,
            name: Some(format!("Customer {}", id)),
            age,
            email: Some(format!("customer{}@example.com", id)),
            purchase_amount: amount,
            purchase_date: NaiveDate::from_ymd_opt(2023, 3, 15).unwrap(),
            category: Some("Books".to_string()),
            satisfaction_score: Some(4.0),
            phone_number: Some("555-0100".to_string()),
            purchase_month: None,
            purchase_category: None,
            age_group: None,
        }
    }

    #[test]
    fn refill_uses_median_after_first_fill() {
        // Первая медиана по [20, 30, -5] = 20; после заполнения [20, 30, -5, 20]
        // отрицательное значение удаляется, вторая медиана по [20, 30, 20] = 20.
        let mut table = CustomerTable::new(vec![
            record(1, Some(20.0), Some(10.0)),
            record(2, Some(30.0), Some(10.0)),
            record(3, Some(-5.0), Some(10.0)),
            record(4, None, Some(10.0)),
        ]);

        let report = repair_missing_values(&mut table, &Placeholders::default()).unwrap();

        let ages: Vec<f64> = table.records.iter().map(|r| r.age.unwrap()).collect();
        assert_eq!(ages, vec![20.0, 30.0, 20.0, 20.0]);

        let age_passes: Vec<&ColumnRepair> =
            report.columns.iter().filter(|c| c.column == "age").collect();
        assert_eq!(age_passes.len(), 2);
        assert_eq!(age_passes[0].filled, 1);
        assert_eq!(age_passes[1].invalidated, 1);
        assert_eq!(age_passes[1].filled, 1);
    }

    #[test]
    fn purchase_amount_refilled_with_mean() {
        let mut table = CustomerTable::new(vec![
            record(1, Some(30.0), Some(100.0)),
            record(2, Some(30.0), Some(-40.0)),
            record(3, Some(30.0), None),
        ]);

        repair_missing_values(&mut table, &Placeholders::default()).unwrap();

        // mean([100, -40]) = 30 -> [100, -40, 30]; после удаления -40: mean([100, 30]) = 65
        let amounts: Vec<f64> = table
            .records
            .iter()
            .map(|r| r.purchase_amount.unwrap())
            .collect();
        assert_eq!(amounts, vec![100.0, 65.0, 30.0]);
    }

    #[test]
    fn no_nulls_or_negatives_after_repair() {
        let mut rows = Vec::new();
        for id in 0..50 {
            let age = match id % 7 {
                0 => None,
                1 => Some(-1.0),
                _ => Some(18.0 + id as f64),
            };
            let amount = match id % 5 {
                0 => None,
                1 => Some(-10.0),
                _ => Some(id as f64 * 3.5),
            };
            let mut row = record(id, age, amount);
            if id % 4 == 0 {
                row.name = None;
                row.category = Some("   ".to_string());
                row.satisfaction_score = None;
            }
            rows.push(row);
        }
        let mut table = CustomerTable::new(rows);

        repair_missing_values(&mut table, &Placeholders::default()).unwrap();

        for r in &table.records {
            assert!(r.name.is_some() && r.email.is_some() && r.category.is_some());
            assert!(r.phone_number.is_some() && r.satisfaction_score.is_some());
            assert!(r.age.unwrap() >= 0.0);
            assert!(r.purchase_amount.unwrap() >= 0.0);
        }
        assert_eq!(table.records[0].category.as_deref(), Some("Unknown"));
    }

    #[test]
    fn all_null_column_is_data_quality_error() {
        let mut table = CustomerTable::new(vec![record(1, None, Some(1.0)), record(2, None, Some(2.0))]);

        let err = repair_missing_values(&mut table, &Placeholders::default()).unwrap_err();
        assert!(matches!(err, PipelineError::DataQuality(ref msg) if msg.contains("age")));
    }

    #[test]
    fn all_negative_column_fails_on_second_pass() {
        let mut table = CustomerTable::new(vec![
            record(1, Some(40.0), Some(-1.0)),
            record(2, Some(41.0), Some(-2.0)),
        ]);

        let err = repair_missing_values(&mut table, &Placeholders::default()).unwrap_err();
        assert!(matches!(err, PipelineError::DataQuality(ref msg) if msg.contains("purchase_amount")));
    }

    #[test]
    fn emails_are_trimmed_and_lowercased() {
        let mut row = record(1, Some(30.0), Some(5.0));
        row.email = Some("  John.Doe@Example.COM ".to_string());
        let mut table = CustomerTable::new(vec![row]);

        repair_missing_values(&mut table, &Placeholders::default()).unwrap();
        assert_eq!(table.records[0].email.as_deref(), Some("john.doe@example.com"));
    }

    #[test]
    fn duplicates_dropped_keeping_first() {
        let a = record(1, Some(30.0), Some(5.0));
        let b = record(2, Some(31.0), Some(6.0));
        let mut table = CustomerTable::new(vec![a.clone(), b, a]);

        assert_eq!(drop_duplicate_rows(&mut table), 1);
        assert_eq!(table.len(), 2);
        assert_eq!(table.records[0].id, 1);
    }
}
