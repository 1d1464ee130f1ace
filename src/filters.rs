// ABOUTME: Central filtering logic for selecting databases to export
// ABOUTME: Skips reserved system databases and the configured exclusion set

use std::collections::BTreeSet;

/// Prefix the cluster reserves for its internal databases (`_users`, `_replicator`, ...)
pub const RESERVED_PREFIX: char = '_';

/// Represents database filtering rules
#[derive(Debug, Clone, Default)]
pub struct DatabaseFilter {
    exclude_databases: BTreeSet<String>,
}

impl DatabaseFilter {
    /// Creates a filter that skips reserved databases and everything in `exclude_databases`
    pub fn new<I, S>(exclude_databases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            exclude_databases: exclude_databases.into_iter().map(Into::into).collect(),
        }
    }

    /// Checks if the database is an internal system database
    pub fn is_reserved(db_name: &str) -> bool {
        db_name.starts_with(RESERVED_PREFIX)
    }

    /// Checks if the database is in the exclusion set
    pub fn is_excluded(&self, db_name: &str) -> bool {
        self.exclude_databases.contains(db_name)
    }

    /// Determines if a database should be migrated
    pub fn should_migrate_database(&self, db_name: &str) -> bool {
        !Self::is_reserved(db_name) && !self.is_excluded(db_name)
    }

    /// Applies the filter to a database listing, keeping the listing's order
    pub fn databases_to_migrate<'a>(&self, all_databases: &'a [String]) -> Vec<&'a str> {
        all_databases
            .iter()
            .map(String::as_str)
            .filter(|db| {
                let keep = self.should_migrate_database(db);
                if !keep {
                    tracing::debug!("Skipping {}", crate::utils::sanitize_identifier(db));
                }
                keep
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserved_databases_are_never_migrated() {
        let filter = DatabaseFilter::default();

        assert!(!filter.should_migrate_database("_replicator"));
        assert!(!filter.should_migrate_database("_users"));
        assert!(!filter.should_migrate_database("_global_changes"));
        assert!(filter.should_migrate_database("users"));
    }

    #[test]
    fn test_should_migrate_database_with_exclude_list() {
        let filter = DatabaseFilter::new(["metrics", "community_content"]);

        assert!(filter.should_migrate_database("orders"));
        assert!(!filter.should_migrate_database("metrics"));
        assert!(!filter.should_migrate_database("community_content"));
    }

    #[test]
    fn test_exclusion_is_exact_match() {
        let filter = DatabaseFilter::new(["metrics"]);

        assert!(filter.should_migrate_database("metrics2"));
        assert!(filter.should_migrate_database("app_metrics"));
    }

    #[test]
    fn test_databases_to_migrate_preserves_listing_order() {
        let filter = DatabaseFilter::new(["metrics"]);
        let listing = vec![
            "_replicator".to_string(),
            "metrics".to_string(),
            "users".to_string(),
            "orders".to_string(),
        ];

        assert_eq!(filter.databases_to_migrate(&listing), vec!["users", "orders"]);
    }

    #[test]
    fn test_empty_listing_yields_nothing() {
        let filter = DatabaseFilter::new(["metrics"]);
        assert!(filter.databases_to_migrate(&[]).is_empty());
    }
}
