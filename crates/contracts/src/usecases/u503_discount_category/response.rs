use serde::{Deserialize, Serialize};

/// Результат двухфазной скидки
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiscountReport {
    /// Документы, найденные массовым обновлением цены
    pub matched: u64,
    /// Документы, у которых цена реально изменилась
    pub modified: u64,
    /// Документы, у которых `total_revenue` пересчитан в фазе 2
    pub recomputed: u64,
    /// Документы с расхождением выручки после фазы 2
    pub drifted: u64,
}

impl DiscountReport {
    /// True when phase 2 covered every matched document and no drift remains
    pub fn is_consistent(&self) -> bool {
        self.drifted == 0 && self.recomputed >= self.matched
    }
}
