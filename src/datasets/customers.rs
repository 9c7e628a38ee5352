//! Генерация синтетической таблицы покупателей с пропусками и выбросами

use chrono::{Duration, NaiveDate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::CleaningConfig;
use crate::types::{CustomerRecord, CustomerTable};

const FIRST_NAMES: [&str; 10] = [
    "John", "Jane", "Alice", "Bob", "Maria", "Ivan", "Olga", "Peter", "Anna", "David",
];
const LAST_NAMES: [&str; 8] = [
    "Smith", "Johnson", "Brown", "Petrov", "Garcia", "Miller", "Ivanova", "Wilson",
];
pub const CATEGORIES: [&str; 5] = ["Electronics", "Clothing", "Books", "Home", "Sports"];

/// Доля возрастов за пределами [18, 90], которые потом обрезаются
const AGE_OUTLIER_RATE: f64 = 0.01;

pub fn generate_customers(config: &CleaningConfig) -> CustomerTable {
    let mut rng = StdRng::seed_from_u64(config.seed);
    let start = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap_or_default();

    let records = (1..=config.records as u32)
        .map(|id| {
            let first = FIRST_NAMES[rng.gen_range(0..FIRST_NAMES.len())];
            let last = LAST_NAMES[rng.gen_range(0..LAST_NAMES.len())];
            let name = format!("{} {}", first, last);

            let age = if rng.gen_bool(config.invalid_rate) {
                -(rng.gen_range(1..=10) as f64)
            } else if rng.gen_bool(AGE_OUTLIER_RATE) {
                rng.gen_range(91..=120) as f64
            } else {
                rng.gen_range(18..=90) as f64
            };

            let purchase_amount = if rng.gen_bool(config.invalid_rate) {
                -rng.gen_range(1.0..100.0)
            } else {
                rng.gen_range(5.0..1000.0)
            };

            // Часть адресов с пробелами и в верхнем регистре, как в реальных выгрузках
            let mut email = format!("{}.{}{}@example.com", first.to_lowercase(), last.to_lowercase(), id);
            if rng.gen_bool(0.05) {
                email = format!("  {}  ", email.to_uppercase());
            }

            let phone_number = format!(
                "555-{:03}-{:04}",
                rng.gen_range(0..1000),
                rng.gen_range(0..10000)
            );

            let category = CATEGORIES[rng.gen_range(0..CATEGORIES.len())].to_string();
            let satisfaction_score = rng.gen_range(1..=5) as f64;
            let purchase_date = start + Duration::days(rng.gen_range(0..365));

            CustomerRecord {
                id,
                name: maybe(&mut rng, config.missing_rate, name),
                age: maybe(&mut rng, config.missing_rate, age),
                email: maybe(&mut rng, config.missing_rate, email),
                purchase_amount: maybe(&mut rng, config.missing_rate, purchase_amount),
                purchase_date,
                category: maybe(&mut rng, config.missing_rate, category),
                satisfaction_score: maybe(&mut rng, config.missing_rate, satisfaction_score),
                phone_number: maybe(&mut rng, config.missing_rate, phone_number),
                purchase_month: None,
                purchase_category: None,
                age_group: None,
            }
        })
        .collect();

    CustomerTable::new(records)
}

fn maybe<T>(rng: &mut StdRng, missing_rate: f64, value: T) -> Option<T> {
    if rng.gen_bool(missing_rate) {
        None
    } else {
        Some(value)
    }
}
