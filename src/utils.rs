// ABOUTME: Utility functions for validation and log-safe display
// ABOUTME: Provides CouchDB database-name validation and identifier sanitizing

use anyhow::{bail, Result};

/// Maximum database name length accepted by CouchDB
const MAX_DATABASE_NAME_LENGTH: usize = 238;

/// Validate a CouchDB/Cloudant database name
///
/// CouchDB database names must:
/// - Be 1-238 characters long
/// - Start with a lowercase letter (a-z)
/// - Contain only lowercase letters, digits, and any of `_ $ ( ) + - /`
///
/// Names starting with `_` are reserved for system databases and are rejected
/// here because they are never migrated.
///
/// # Arguments
///
/// * `name` - The database name to validate
///
/// # Returns
///
/// Returns `Ok(())` if the name is valid.
///
/// # Errors
///
/// Returns an error if the name:
/// - Is empty or whitespace-only
/// - Exceeds 238 characters
/// - Starts with anything other than a lowercase letter
/// - Contains a character outside the allowed set
///
/// # Examples
///
/// ```
/// # use cloudant_migrator::utils::validate_database_name;
/// # use anyhow::Result;
/// # fn example() -> Result<()> {
/// validate_database_name("users")?;
/// validate_database_name("portal-common-api_wdp_private_cloud")?;
/// validate_database_name("tenant/orders")?;
///
/// assert!(validate_database_name("_replicator").is_err());
/// assert!(validate_database_name("Users").is_err());
/// assert!(validate_database_name("9lives").is_err());
/// # Ok(())
/// # }
/// ```
pub fn validate_database_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        bail!("Database name cannot be empty or whitespace-only");
    }

    if name.len() > MAX_DATABASE_NAME_LENGTH {
        bail!(
            "Database name '{}' exceeds maximum length of {} characters (got {})",
            sanitize_identifier(name),
            MAX_DATABASE_NAME_LENGTH,
            name.len()
        );
    }

    let mut chars = name.chars();
    if let Some(first_char) = chars.next() {
        if !first_char.is_ascii_lowercase() {
            bail!(
                "Database name '{}' must start with a lowercase letter, not '{}'",
                sanitize_identifier(name),
                first_char
            );
        }
    }

    for (i, c) in name.chars().enumerate() {
        let allowed = c.is_ascii_lowercase()
            || c.is_ascii_digit()
            || matches!(c, '_' | '$' | '(' | ')' | '+' | '-' | '/');
        if !allowed {
            bail!(
                "Database name '{}' contains invalid character '{}' at position {}",
                sanitize_identifier(name),
                if c.is_control() {
                    format!("\\x{:02x}", c as u32)
                } else {
                    c.to_string()
                },
                i
            );
        }
    }

    Ok(())
}

/// Sanitize a database or file name for display
///
/// Removes control characters and limits length so names taken from cluster
/// responses or archive entries cannot inject lines into the log.
///
/// # Examples
///
/// ```
/// # use cloudant_migrator::utils::sanitize_identifier;
/// assert_eq!(sanitize_identifier("users"), "users");
/// assert_eq!(sanitize_identifier("users\nINFO: forged"), "usersINFO: forged");
///
/// let long_name = "a".repeat(300);
/// assert_eq!(sanitize_identifier(&long_name).len(), 100);
/// ```
pub fn sanitize_identifier(identifier: &str) -> String {
    identifier
        .chars()
        .filter(|c| !c.is_control())
        .take(100)
        .collect()
}
