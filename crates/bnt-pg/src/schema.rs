use std::sync::Arc;
use tokio_postgres::Client;

/// Schema metadata for PostgreSQL tables.
///
/// Provides compile-time SQL generation for table creation and indexing.
/// All methods return `&'static str` to avoid runtime allocations and
/// enable compile-time string construction via [`const_format::concatcp!`].
///
/// # Design
///
/// This trait contains no I/O operations—it purely describes table
/// structure. Actual row traffic goes through the repository traits in the
/// domain crates.
pub trait Schema {
    /// Returns the table name in the database.
    fn name() -> &'static str;
    /// Returns `CREATE TABLE IF NOT EXISTS` DDL statement.
    fn creates() -> &'static str;
    /// Returns `CREATE INDEX IF NOT EXISTS` statements for all indices.
    fn indices() -> &'static str;
}

/// Creates a table and its indices if they do not already exist.
///
/// Idempotent; called once per [`Schema`] type at server startup.
pub async fn prepare<S>(client: &Arc<Client>) -> Result<(), super::PgErr>
where
    S: Schema,
{
    log::debug!("[schema] preparing table {}", S::name());
    client.batch_execute(S::creates()).await?;
    client.batch_execute(S::indices()).await?;
    Ok(())
}
