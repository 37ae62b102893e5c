use crate::config::MarketSettings;
use crate::data::dataset::DataTable;
use crate::models::ColumnSchema;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};

/// Distribution parameters for the bundled example market. The first
/// characteristic spreads wide so it dominates raw payoffs; the secondary
/// ones stay narrow and matter through the MRS weights.
pub const PRIMARY_CHAR_MEAN: f64 = 1.0;
pub const PRIMARY_CHAR_STD: f64 = 100.0;
pub const SECONDARY_CHAR_MEAN: f64 = 1.0;
pub const SECONDARY_CHAR_STD: f64 = 5.0;

/// Default substitution rates, constant across each population
pub const DEFAULT_A_MRS: f64 = 5.25;
pub const DEFAULT_B_MRS: f64 = 7.75;

/// Bias-mode defaults: half the applicants carry the flagged attribute and
/// every reviewer applies the same perception penalty
pub const BIAS_ATTRIBUTE_SHARE: f64 = 0.5;
pub const DEFAULT_BIAS_WEIGHT: f64 = -25.0;

/// Generate the example input table under the given schema.
///
/// Fully deterministic for a fixed seed: columns are drawn in schema order
/// from a seeded generator, so the same seed always yields the same table
/// byte for byte.
pub fn example_table(market: &MarketSettings, schema: &ColumnSchema, seed: u64) -> DataTable {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let rows = market.market_size;
    let mut table = DataTable::new();

    for (k, name) in schema.a_chars.iter().enumerate() {
        table.insert(name.clone(), draw_characteristic(&mut rng, rows, k));
    }
    for name in &schema.a_mrs {
        table.insert(name.clone(), vec![DEFAULT_A_MRS; rows]);
    }
    for (k, name) in schema.b_chars.iter().enumerate() {
        table.insert(name.clone(), draw_characteristic(&mut rng, rows, k));
    }
    for name in &schema.b_mrs {
        table.insert(name.clone(), vec![DEFAULT_B_MRS; rows]);
    }

    if let Some(name) = &schema.a_bias_attribute {
        let flags = (0..rows)
            .map(|_| if rng.gen_bool(BIAS_ATTRIBUTE_SHARE) { 1.0 } else { 0.0 })
            .collect();
        table.insert(name.clone(), flags);
    }
    if let Some(name) = &schema.b_bias_weight {
        table.insert(name.clone(), vec![DEFAULT_BIAS_WEIGHT; rows]);
    }

    table
}

fn draw_characteristic(rng: &mut ChaCha8Rng, rows: usize, index: usize) -> Vec<f64> {
    let normal = if index == 0 {
        Normal::new(PRIMARY_CHAR_MEAN, PRIMARY_CHAR_STD)
    } else {
        Normal::new(SECONDARY_CHAR_MEAN, SECONDARY_CHAR_STD)
    }
    .expect("standard deviation is a positive constant");

    (0..rows).map(|_| normal.sample(rng)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ColumnSettings, MarketSettings};
    use crate::data::dataset::ingest;

    fn settings(size: usize, bias: bool) -> MarketSettings {
        MarketSettings {
            market_size: size,
            bias,
            ..MarketSettings::default()
        }
    }

    #[test]
    fn test_example_table_ingests_cleanly() {
        let market_settings = settings(50, false);
        let schema = ColumnSettings::default().resolve(2, 2, false);
        let table = example_table(&market_settings, &schema, 0);

        assert_eq!(table.rows(), 50);
        let market = ingest(&table, &schema).unwrap();
        assert_eq!(market.size(), 50);
        assert_eq!(market.applicants[0].mrs_weights, vec![DEFAULT_A_MRS]);
        assert_eq!(market.reviewers[0].mrs_weights, vec![DEFAULT_B_MRS]);
    }

    #[test]
    fn test_same_seed_same_table() {
        let market_settings = settings(20, true);
        let schema = ColumnSettings::default().resolve(2, 2, true);

        let first = example_table(&market_settings, &schema, 42);
        let second = example_table(&market_settings, &schema, 42);

        for name in ["A_char_1", "A_char_2", "B_char_1", "A_bias_char"] {
            assert_eq!(first.column(name).unwrap(), second.column(name).unwrap());
        }
    }

    #[test]
    fn test_different_seeds_differ() {
        let market_settings = settings(20, false);
        let schema = ColumnSettings::default().resolve(2, 2, false);

        let first = example_table(&market_settings, &schema, 1);
        let second = example_table(&market_settings, &schema, 2);
        assert_ne!(first.column("A_char_1"), second.column("A_char_1"));
    }

    #[test]
    fn test_bias_columns_are_binary_and_constant() {
        let market_settings = settings(100, true);
        let schema = ColumnSettings::default().resolve(2, 2, true);
        let table = example_table(&market_settings, &schema, 7);

        let attrs = table.column("A_bias_char").unwrap();
        assert!(attrs.iter().all(|&v| v == 0.0 || v == 1.0));
        // Seeded halves should produce a mix, not a constant column
        assert!(attrs.iter().any(|&v| v == 0.0));
        assert!(attrs.iter().any(|&v| v == 1.0));

        let weights = table.column("B_bias_mrs").unwrap();
        assert!(weights.iter().all(|&v| v == DEFAULT_BIAS_WEIGHT));
    }

    #[test]
    fn test_four_characteristic_table() {
        let mut market_settings = settings(10, false);
        market_settings.a_char_number = 4;
        market_settings.b_char_number = 3;
        let schema = ColumnSettings::default().resolve(4, 3, false);
        let table = example_table(&market_settings, &schema, 3);

        let market = ingest(&table, &schema).unwrap();
        assert_eq!(market.applicants[0].characteristics.len(), 4);
        assert_eq!(market.reviewers[0].characteristics.len(), 3);
        // Applicants rate three reviewer characteristics, reviewers four
        assert_eq!(market.applicants[0].mrs_weights.len(), 2);
        assert_eq!(market.reviewers[0].mrs_weights.len(), 3);
    }
}
