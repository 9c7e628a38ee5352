//! Feature engineering для таблицы покупателей

use chrono::{Datelike, NaiveDate};

use crate::error::{PipelineError, Result};
use crate::preprocessing::statistics;
use crate::types::{AgeGroup, CustomerTable, PurchaseCategory};

/// Границы возрастных групп: (17, 25], (25, 35], (35, 50], (50, 65], (65, 90]
pub const AGE_BIN_EDGES: [f64; 6] = [17.0, 25.0, 35.0, 50.0, 65.0, 90.0];

const AGE_GROUPS: [AgeGroup; 5] = [
    AgeGroup::Young,
    AgeGroup::YoungAdult,
    AgeGroup::Adult,
    AgeGroup::Senior,
    AgeGroup::Elder,
];

/// Квартильные границы суммы покупки: min, Q1, медиана, Q3, max
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuartileEdges(pub [f64; 5]);

impl QuartileEdges {
    /// Считает границы по текущему распределению. Повторяющиеся границы
    /// означают, что равночастотное разбиение невозможно.
    pub fn from_values(values: &[f64]) -> Result<Self> {
        let mut sorted = values.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));

        let mut edges = [0.0; 5];
        for (i, edge) in edges.iter_mut().enumerate() {
            *edge = statistics::quantile_sorted(&sorted, i as f64 / 4.0).ok_or_else(|| {
                PipelineError::DataQuality("purchase_amount is empty, quartiles are undefined".to_string())
            })?;
        }

        if edges.windows(2).any(|pair| pair[0] >= pair[1]) {
            return Err(PipelineError::DataQuality(format!(
                "purchase_amount quartile edges are not unique: {:?}",
                edges
            )));
        }

        Ok(Self(edges))
    }

    /// Интервалы закрыты справа, нижняя граница первого интервала включена.
    /// Значение на границе попадает в нижний интервал.
    pub fn bucket(&self, value: f64) -> Option<PurchaseCategory> {
        let edges = &self.0;
        if value < edges[0] || value > edges[4] {
            return None;
        }

        PurchaseCategory::ALL
            .iter()
            .zip(edges[1..].iter())
            .find(|(_, upper)| value <= **upper)
            .map(|(category, _)| *category)
    }
}

pub struct FeatureEngineer;

impl FeatureEngineer {
    pub fn purchase_month(date: NaiveDate) -> u32 {
        date.month()
    }

    /// Возрастная группа. Возраст вне (17, 90] не относится ни к одной группе.
    pub fn age_group(age: f64) -> Option<AgeGroup> {
        if age <= AGE_BIN_EDGES[0] {
            return None;
        }

        AGE_GROUPS
            .iter()
            .zip(AGE_BIN_EDGES[1..].iter())
            .find(|(_, upper)| age <= **upper)
            .map(|(group, _)| *group)
    }

    /// Заполняет purchase_month, purchase_category и age_group.
    /// Ожидает таблицу после заполнения пропусков.
    pub fn derive_features(table: &mut CustomerTable) -> Result<QuartileEdges> {
        let amounts: Vec<f64> = table
            .records
            .iter()
            .map(|r| {
                r.purchase_amount.ok_or_else(|| {
                    PipelineError::DataQuality(format!(
                        "record {} has no purchase_amount, repair missing values first",
                        r.id
                    ))
                })
            })
            .collect::<Result<_>>()?;

        let edges = QuartileEdges::from_values(&amounts)?;

        for record in table.records.iter_mut() {
            record.purchase_month = Some(Self::purchase_month(record.purchase_date));
            record.purchase_category = record.purchase_amount.and_then(|a| edges.bucket(a));

            let age = record.age.ok_or_else(|| {
                PipelineError::DataQuality(format!(
                    "record {} has no age, repair missing values first",
                    record.id
                ))
            })?;
            record.age_group = Some(Self::age_group(age).ok_or_else(|| {
                PipelineError::DataQuality(format!(
                    "record {} has age {} outside of ({}, {}]",
                    record.id, age, AGE_BIN_EDGES[0], AGE_BIN_EDGES[5]
                ))
            })?);
        }

        tracing::debug!("Purchase quartile edges: {:?}", edges.0);
        Ok(edges)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn age_group_total_over_domain() {
        let mut age = 18.0;
        while age <= 90.0 {
            assert!(FeatureEngineer::age_group(age).is_some(), "age {}", age);
            age += 0.5;
        }
    }

    #[test]
    fn age_group_edges_are_right_closed() {
        assert_eq!(FeatureEngineer::age_group(25.0), Some(AgeGroup::Young));
        assert_eq!(FeatureEngineer::age_group(25.5), Some(AgeGroup::YoungAdult));
        assert_eq!(FeatureEngineer::age_group(35.0), Some(AgeGroup::YoungAdult));
        assert_eq!(FeatureEngineer::age_group(50.0), Some(AgeGroup::Adult));
        assert_eq!(FeatureEngineer::age_group(65.0), Some(AgeGroup::Senior));
        assert_eq!(FeatureEngineer::age_group(66.0), Some(AgeGroup::Elder));
        assert_eq!(FeatureEngineer::age_group(90.0), Some(AgeGroup::Elder));
        assert_eq!(FeatureEngineer::age_group(17.0), None);
        assert_eq!(FeatureEngineer::age_group(90.5), None);
    }

    #[test]
    fn quartile_buckets_are_equal_frequency() {
        for n in [8usize, 10, 37, 100, 1001] {
            let values: Vec<f64> = (0..n).map(|i| (n - i) as f64 * 1.25 + 3.0).collect();
            let edges = QuartileEdges::from_values(&values).unwrap();

            let mut counts: HashMap<PurchaseCategory, usize> = HashMap::new();
            for v in &values {
                *counts.entry(edges.bucket(*v).unwrap()).or_default() += 1;
            }

            assert_eq!(counts.len(), 4, "n = {}", n);
            let max = counts.values().max().unwrap();
            let min = counts.values().min().unwrap();
            assert!(max - min <= 1, "n = {}: {:?}", n, counts);
        }
    }

    #[test]
    fn value_on_edge_goes_to_lower_bucket() {
        let edges = QuartileEdges::from_values(&[1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
        assert_eq!(edges.0, [1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!(edges.bucket(1.0), Some(PurchaseCategory::Low));
        assert_eq!(edges.bucket(2.0), Some(PurchaseCategory::Low));
        assert_eq!(edges.bucket(2.5), Some(PurchaseCategory::Medium));
        assert_eq!(edges.bucket(5.0), Some(PurchaseCategory::Premium));
        assert_eq!(edges.bucket(5.5), None);
    }

    #[test]
    fn constant_column_cannot_be_bucketed() {
        let err = QuartileEdges::from_values(&[7.0; 12]).unwrap_err();
        assert!(matches!(err, PipelineError::DataQuality(_)));
    }

    #[test]
    fn purchase_month_from_date() {
        let date = NaiveDate::from_ymd_opt(2023, 11, 30).unwrap();
        assert_eq!(FeatureEngineer::purchase_month(date), 11);
    }
}
