/// Типы данных для пайплайна очистки

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Строка таблицы покупателей.
///
/// Поля, которые могут отсутствовать в исходных данных, хранятся как `Option`.
/// Производные признаки заполняются на этапе feature engineering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerRecord {
    pub id: u32,
    pub name: Option<String>,
    pub age: Option<f64>, // годы, после заполнения медианой может быть дробным
    pub email: Option<String>,
    pub purchase_amount: Option<f64>,
    pub purchase_date: NaiveDate,
    pub category: Option<String>,
    pub satisfaction_score: Option<f64>, // 1-5
    pub phone_number: Option<String>,

    // Производные признаки
    #[serde(default)]
    pub purchase_month: Option<u32>,
    #[serde(default)]
    pub purchase_category: Option<PurchaseCategory>,
    #[serde(default)]
    pub age_group: Option<AgeGroup>,
}

impl CustomerRecord {
    /// Количество пустых полей в строке (включая производные)
    pub fn null_count(&self) -> usize {
        [
            self.name.is_none(),
            self.age.is_none(),
            self.email.is_none(),
            self.purchase_amount.is_none(),
            self.category.is_none(),
            self.satisfaction_score.is_none(),
            self.phone_number.is_none(),
            self.purchase_month.is_none(),
            self.purchase_category.is_none(),
            self.age_group.is_none(),
        ]
        .iter()
        .filter(|missing| **missing)
        .count()
    }
}

/// Таблица покупателей. Очищается на месте, шаг за шагом.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CustomerTable {
    pub records: Vec<CustomerRecord>,
}

impl CustomerTable {
    pub fn new(records: Vec<CustomerRecord>) -> Self {
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Квартильная категория суммы покупки
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PurchaseCategory {
    Low,
    Medium,
    High,
    Premium,
}

impl PurchaseCategory {
    pub const ALL: [PurchaseCategory; 4] = [
        PurchaseCategory::Low,
        PurchaseCategory::Medium,
        PurchaseCategory::High,
        PurchaseCategory::Premium,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            PurchaseCategory::Low => "Low",
            PurchaseCategory::Medium => "Medium",
            PurchaseCategory::High => "High",
            PurchaseCategory::Premium => "Premium",
        }
    }
}

impl fmt::Display for PurchaseCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Возрастная группа
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AgeGroup {
    #[serde(rename = "18-25")]
    Young,
    #[serde(rename = "26-35")]
    YoungAdult,
    #[serde(rename = "36-50")]
    Adult,
    #[serde(rename = "51-65")]
    Senior,
    #[serde(rename = "65+")]
    Elder,
}

impl AgeGroup {
    pub fn label(&self) -> &'static str {
        match self {
            AgeGroup::Young => "18-25",
            AgeGroup::YoungAdult => "26-35",
            AgeGroup::Adult => "36-50",
            AgeGroup::Senior => "51-65",
            AgeGroup::Elder => "65+",
        }
    }
}

impl fmt::Display for AgeGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
