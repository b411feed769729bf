//! The application's PostgreSQL role and database.
//!
//! Everything runs as the `postgres` superuser through `psql`. Statements go on
//! stdin so the role's password never appears in argv.

use super::*;

/// Account that owns the cluster
const SUPERUSER: &str = "postgres";
/// Collation and ctype of created databases
const COLLATION: &str = "en_US.UTF-8";

/// Quote an SQL identifier.
pub fn quote_ident(name: &str) -> String { format!("\"{}\"", name.replace('"', "\"\"")) }

/// Quote an SQL string literal.
pub fn quote_literal(value: &str) -> String { format!("'{}'", value.replace('\'', "''")) }

/// `psql` as the superuser, stopping at the first error.
fn psql() -> Invocation { Invocation::new("psql").run_as(SUPERUSER).args(["-v", "ON_ERROR_STOP=1"]) }

/// Run a single query and return its unaligned, header-less output.
fn query(ctx: Context<'_>, sql: &str) -> Result<String, ProvisionError> {
  let out = ctx.exec.capture(&Invocation::new("psql").run_as(SUPERUSER).args(["-tAc", sql]))?;
  Ok(out.stdout.trim().to_owned())
}

/// The statements that create `role` and a UTF-8 database `name` owned by it.
pub fn creation_script(role: &str, password: &str, name: &str) -> String {
  format!(
    "CREATE ROLE {role} WITH LOGIN PASSWORD {password};\n\
     CREATE DATABASE {name} OWNER {role} ENCODING 'UTF8' LC_COLLATE '{COLLATION}' \
     LC_CTYPE '{COLLATION}' TEMPLATE template0;\n",
    role = quote_ident(role),
    password = quote_literal(password),
    name = quote_ident(name),
  )
}

/// Create the login role and its database.
pub fn create(ctx: Context<'_>, role: &str, password: &str, name: &str) -> Result<(), ProvisionError> {
  info!("Creating database role {role} and database {name}");
  ctx.exec.run(&psql().stdin(creation_script(role, password, name)).secret())
}

/// Drop the database and then the role, tolerating either being absent.
pub fn drop(ctx: Context<'_>, role: &str, name: &str) -> Result<(), ProvisionError> {
  info!("Dropping database {name} and role {role}");
  let script = format!(
    "DROP DATABASE IF EXISTS {};\nDROP ROLE IF EXISTS {};\n",
    quote_ident(name),
    quote_ident(role)
  );
  ctx.exec.run(&psql().stdin(script))
}

/// Whether a database called `name` exists.
pub fn exists(ctx: Context<'_>, name: &str) -> Result<bool, ProvisionError> {
  let sql = format!("SELECT 1 FROM pg_database WHERE datname = {}", quote_literal(name));
  Ok(query(ctx, &sql)? == "1")
}

/// Whether a role called `role` exists.
pub fn role_exists(ctx: Context<'_>, role: &str) -> Result<bool, ProvisionError> {
  let sql = format!("SELECT 1 FROM pg_roles WHERE rolname = {}", quote_literal(role));
  Ok(query(ctx, &sql)? == "1")
}
