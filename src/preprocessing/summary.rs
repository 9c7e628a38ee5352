//! Итоговая статистика по таблице

use std::collections::HashSet;
use std::fmt;

use serde::Serialize;

use crate::error::{PipelineError, Result};
use crate::preprocessing::clipping::{MAX_AGE, MIN_AGE};
use crate::preprocessing::imputation::row_key;
use crate::preprocessing::statistics;
use crate::types::CustomerTable;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableSummary {
    pub total_records: usize,
    pub missing_values: usize,
    pub duplicate_records: usize,
    pub age_range: Option<(f64, f64)>,
    pub purchase_amount_range: Option<(f64, f64)>,
    pub unique_categories: usize,
    pub average_satisfaction: Option<f64>,
}

impl TableSummary {
    /// Статистика считается по непустым значениям, поэтому годится и для
    /// сырой таблицы до очистки.
    pub fn from_table(table: &CustomerTable) -> Self {
        let records = &table.records;

        let missing_values = records.iter().map(|r| r.null_count()).sum();

        let mut seen = HashSet::new();
        let duplicate_records = records.iter().filter(|r| !seen.insert(row_key(r))).count();

        let age_range = statistics::min_max(records.iter().filter_map(|r| r.age));
        let purchase_amount_range =
            statistics::min_max(records.iter().filter_map(|r| r.purchase_amount));

        let unique_categories = records
            .iter()
            .filter_map(|r| r.category.as_deref())
            .collect::<HashSet<_>>()
            .len();

        let scores: Vec<f64> = records.iter().filter_map(|r| r.satisfaction_score).collect();

        Self {
            total_records: records.len(),
            missing_values,
            duplicate_records,
            age_range,
            purchase_amount_range,
            unique_categories,
            average_satisfaction: statistics::mean(&scores),
        }
    }
}

impl fmt::Display for TableSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Data Cleaning Summary:")?;
        writeln!(f, "Total Records: {}", self.total_records)?;
        writeln!(f, "Missing Values: {}", self.missing_values)?;
        writeln!(f, "Duplicate Records: {}", self.duplicate_records)?;
        match self.age_range {
            Some((min, max)) => writeln!(f, "Age Range: {} - {}", min, max)?,
            None => writeln!(f, "Age Range: n/a")?,
        }
        match self.purchase_amount_range {
            Some((min, max)) => writeln!(f, "Purchase Amount Range: ${:.2} - ${:.2}", min, max)?,
            None => writeln!(f, "Purchase Amount Range: n/a")?,
        }
        writeln!(f, "Unique Categories: {}", self.unique_categories)?;
        match self.average_satisfaction {
            Some(avg) => write!(f, "Average Satisfaction: {:.2}", avg),
            None => write!(f, "Average Satisfaction: n/a"),
        }
    }
}

/// Проверка инвариантов очищенной таблицы
pub fn validate_cleaned(table: &CustomerTable) -> Result<()> {
    for record in &table.records {
        if record.null_count() > 0 {
            return Err(PipelineError::DataQuality(format!(
                "record {} still has {} empty fields after cleaning",
                record.id,
                record.null_count()
            )));
        }
        if let Some(age) = record.age {
            if !(MIN_AGE..=MAX_AGE).contains(&age) {
                return Err(PipelineError::DataQuality(format!(
                    "record {} has age {} outside of the valid range",
                    record.id, age
                )));
            }
        }
        if matches!(record.purchase_amount, Some(amount) if amount < 0.0) {
            return Err(PipelineError::DataQuality(format!(
                "record {} has a negative purchase_amount",
                record.id
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AgeGroup, CustomerRecord, PurchaseCategory};
    use chrono::NaiveDate;

    fn clean_row(id: u32, age: f64, amount: f64, category: &str, score: f64) -> CustomerRecord {
        CustomerRecord {
            id,
            name: Some("N".to_string()),
            age: Some(age),
            email: Some("n@example.com".to_string()),
            purchase_amount: Some(amount),
            purchase_date: NaiveDate::from_ymd_opt(2023, 6, 1).unwrap(),
            category: Some(category.to_string()),
            satisfaction_score: Some(score),
            phone_number: Some("0".to_string()),
            purchase_month: Some(6),
            purchase_category: Some(PurchaseCategory::Low),
            age_group: Some(AgeGroup::Adult),
        }
    }

    #[test]
    fn summary_of_clean_table() {
        let a = clean_row(1, 40.0, 10.5, "Books", 4.0);
        let table = CustomerTable::new(vec![
            a.clone(),
            clean_row(2, 20.0, 99.999, "Home", 2.0),
            a,
        ]);

        let summary = TableSummary::from_table(&table);
        assert_eq!(summary.total_records, 3);
        assert_eq!(summary.missing_values, 0);
        assert_eq!(summary.duplicate_records, 1);
        assert_eq!(summary.age_range, Some((20.0, 40.0)));
        assert_eq!(summary.unique_categories, 2);
        assert_eq!(summary.average_satisfaction, Some(10.0 / 3.0));

        let text = summary.to_string();
        assert!(text.contains("Age Range: 20 - 40"));
        assert!(text.contains("Purchase Amount Range: $10.50 - $100.00"));
        assert!(text.contains("Average Satisfaction: 3.33"));
    }

    #[test]
    fn raw_table_counts_nulls() {
        let mut row = clean_row(1, 40.0, 10.0, "Books", 4.0);
        row.category = None;
        row.age_group = None;
        let table = CustomerTable::new(vec![row]);

        let summary = TableSummary::from_table(&table);
        assert_eq!(summary.missing_values, 2);
        assert_eq!(summary.unique_categories, 0);
        assert!(validate_cleaned(&table).is_err());
    }

    #[test]
    fn validate_rejects_out_of_range_age() {
        let table = CustomerTable::new(vec![clean_row(1, 95.0, 10.0, "Books", 4.0)]);
        assert!(matches!(validate_cleaned(&table), Err(PipelineError::DataQuality(_))));
    }
}
