//! physrestore - physical restore of MariaDB/InnoDB tables
//!
//! Transplants a database's tables from a backup data directory into a
//! running target server using InnoDB's transportable-tablespace
//! mechanism: a disposable source instance is booted against the backup,
//! each table is flushed for export, its `.ibd`/`.cfg` pair is copied
//! into the target's database directory, and the target adopts it with
//! `ALTER TABLE ... IMPORT TABLESPACE` — no row-by-row replay.

pub mod cli;
pub mod config;
pub mod connection;
pub mod export;
pub mod import;
pub mod observability;
pub mod orchestrator;
pub mod reset;
pub mod schema;
pub mod supervisor;
pub mod transplant;
