//! Database transaction utilities
//!
//! Domain functions use sqlx's generic Executor trait so they accept both
//! `&PgPool` and `&mut PgConnection` (transactions):
//!
//! ```ignore
//! use sqlx::{Executor, Postgres};
//!
//! pub async fn my_query<'e, E>(executor: E, id: i64) -> Result<MyType, sqlx::Error>
//! where
//!     E: Executor<'e, Database = Postgres>,
//! {
//!     sqlx::query_as("SELECT * FROM my_table WHERE id = $1")
//!         .bind(id)
//!         .fetch_one(executor)
//!         .await
//! }
//! ```
//!
//! Routes own transaction boundaries: begin on the pool, pass `&mut *tx` to
//! domain functions, commit at the end.

#[allow(unused_imports)]
pub use sqlx::{Executor, Postgres};
