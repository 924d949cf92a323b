use serde::{Deserialize, Serialize};

use crate::enums::Category;

/// Массовое изменение цены для одной категории
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscountRequest {
    pub category: Category,
    /// Множитель `price` (0.9 = скидка 10%)
    pub factor: f64,
}

impl DiscountRequest {
    pub fn new(category: Category, factor: f64) -> Self {
        Self { category, factor }
    }

    /// Множитель должен быть конечным и >= 0, чтобы цены не стали отрицательными
    pub fn validate(&self) -> Result<(), String> {
        if !self.factor.is_finite() || self.factor < 0.0 {
            return Err(format!(
                "discount factor must be a finite number >= 0, got {}",
                self.factor
            ));
        }
        Ok(())
    }
}
