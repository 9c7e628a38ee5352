//! Ограничение диапазонов и округление

use crate::types::CustomerTable;

pub const MIN_AGE: f64 = 18.0;
pub const MAX_AGE: f64 = 90.0;

/// Округление до `decimals` знаков, половины к четному (как в numpy)
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round_ties_even() / factor
}

pub fn clamp_age(age: f64) -> f64 {
    age.clamp(MIN_AGE, MAX_AGE)
}

/// Применяет все правила к таблице: возраст в [18, 90], сумма до центов,
/// оценка до целого. Пустые значения не трогаются.
pub fn clip_and_round(table: &mut CustomerTable) {
    let mut clamped = 0usize;

    for record in table.records.iter_mut() {
        if let Some(age) = record.age.as_mut() {
            let bounded = clamp_age(*age);
            if bounded != *age {
                clamped += 1;
            }
            *age = bounded;
        }
        if let Some(amount) = record.purchase_amount.as_mut() {
            *amount = round_to(*amount, 2);
        }
        if let Some(score) = record.satisfaction_score.as_mut() {
            *score = score.round_ties_even();
        }
    }

    tracing::debug!("Clamped {} ages into [{}, {}]", clamped, MIN_AGE, MAX_AGE);
}
