use anyhow::{Context, Result};
use contracts::usecases::common::UseCaseMetadata;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::domain::a001_sales_record::{generator, repository};
use crate::domain::a001_sales_record::generator::SampleSpec;
use crate::shared::docstore::DocumentStore;

pub struct SeedSampleData;

impl UseCaseMetadata for SeedSampleData {
    fn usecase_index() -> &'static str {
        "u501"
    }

    fn usecase_name() -> &'static str {
        "seed_sample_data"
    }

    fn display_name() -> &'static str {
        "Seed sample data"
    }

    fn description() -> &'static str {
        "Fill an empty collection with synthetic sales records"
    }
}

/// Вставить `spec.count` сгенерированных записей, если коллекция пуста.
///
/// Непустую коллекцию не трогаем. Возвращает количество вставленных записей.
pub async fn seed_if_empty(
    store: &dyn DocumentStore,
    spec: &SampleSpec,
    seed: Option<u64>,
) -> Result<usize> {
    let existing = repository::count(store)
        .await
        .context("cannot count existing documents")?;
    if existing > 0 {
        tracing::warn!(
            "{}: collection {} already holds {} documents, skipping generation",
            SeedSampleData::full_name(),
            store.describe(),
            existing
        );
        return Ok(0);
    }

    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let records = generator::generate(spec, &mut rng);
    let ids = repository::insert_all(store, &records)
        .await
        .context("cannot insert sample records")?;

    tracing::info!(
        "{}: inserted {} sample records into {}",
        SeedSampleData::full_name(),
        ids.len(),
        store.describe()
    );
    Ok(ids.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::docstore::MemoryStore;

    #[tokio::test]
    async fn test_seed_only_when_empty() {
        let store = MemoryStore::new("sales_db", "sales_data");
        let spec = SampleSpec::with_count(25);

        assert_eq!(seed_if_empty(&store, &spec, Some(7)).await.unwrap(), 25);
        assert_eq!(seed_if_empty(&store, &spec, Some(7)).await.unwrap(), 0);
        assert_eq!(repository::count(&store).await.unwrap(), 25);

        let records = repository::list_all(&store).await.unwrap();
        assert!(records.iter().all(|r| r.has_consistent_revenue(1e-9)));
        assert!(records.iter().all(|r| r.id.is_some()));
    }

    #[test]
    fn test_metadata() {
        assert_eq!(SeedSampleData::full_name(), "u501_seed_sample_data");
    }
}
