// sqlx::Error -> AppError
//
// Constraint failures carry domain meaning: a UNIQUE hit is a duplicate
// email or connection, a FOREIGN KEY hit is a reference to a row that
// does not exist in the tenant.

use hireloop_core::error::AppError;

// https://www.sqlite.org/rescode.html
const SQLITE_CONSTRAINT_UNIQUE: &str = "2067";
const SQLITE_CONSTRAINT_PRIMARYKEY: &str = "1555";
const SQLITE_CONSTRAINT_FOREIGNKEY: &str = "787";
const SQLITE_BUSY: &str = "5";

pub(crate) fn map_sqlx_error(err: sqlx::Error) -> AppError {
    let sqlx::Error::Database(db_err) = &err else {
        return AppError::Database(err.to_string());
    };

    match db_err.code().as_deref() {
        Some(SQLITE_CONSTRAINT_UNIQUE) | Some(SQLITE_CONSTRAINT_PRIMARYKEY) => {
            AppError::Conflict(format!("Already exists: {}", db_err.message()))
        }
        Some(SQLITE_CONSTRAINT_FOREIGNKEY) => {
            AppError::NotFound(format!("Referenced row missing: {}", db_err.message()))
        }
        Some(SQLITE_BUSY) => AppError::Database(format!("Database locked: {}", db_err.message())),
        Some(code) => AppError::Database(format!("SQLite error [{}]: {}", code, db_err.message())),
        None => AppError::Database(db_err.message().to_string()),
    }
}

/// Parse a TEXT enum column, reporting corrupt rows instead of guessing
pub(crate) fn parse_column<T>(column: &str, value: &str) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .parse()
        .map_err(|e| AppError::Database(format!("Invalid {} value '{}': {}", column, value, e)))
}
