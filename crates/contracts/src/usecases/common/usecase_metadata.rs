/// Метаданные UseCase для идентификации в логах и консоли
pub trait UseCaseMetadata {
    /// Индекс UseCase (например, "u501")
    fn usecase_index() -> &'static str;

    /// Техническое имя (например, "seed_sample_data")
    fn usecase_name() -> &'static str;

    /// Отображаемое имя для консоли
    fn display_name() -> &'static str;

    fn description() -> &'static str {
        ""
    }

    /// Полное имя вида "u501_seed_sample_data"
    fn full_name() -> String {
        format!("{}_{}", Self::usecase_index(), Self::usecase_name())
    }
}
