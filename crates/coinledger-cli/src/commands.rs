//! Command execution and output rendering.

use std::error::Error;
use std::fmt::Write as _;
use std::path::PathBuf;

use coinledger_core::{Field, Transaction};
use coinledger_store::{StoreConfig, TracingObserver, TransactionStore};
use serde::Serialize;

use crate::cli::{Cli, Command};
use crate::input;

/// What a command produced.
#[derive(Debug, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum Outcome {
    /// A completed action with nothing to list.
    Done {
        /// Human-readable summary.
        message: String,
    },
    /// Records to show.
    Records {
        /// The records, in ascending `TransactionID` order.
        records: Vec<Transaction>,
    },
    /// Records removed in bulk.
    Removed {
        /// How many records went.
        count: usize,
    },
    /// Rows written by an export.
    Exported {
        /// Destination file.
        path: PathBuf,
        /// Data rows, header excluded.
        rows: usize,
    },
}

/// Run one command against the configured store.
pub fn run(cli: &Cli) -> Result<Outcome, Box<dyn Error>> {
    let config = store_config(cli)?;
    tracing::debug!(
        data_path = %config.data_path.display(),
        format = %config.format,
        "Using store"
    );

    let outcome = match &cli.command {
        Command::Init => {
            let path = config.data_path.clone();
            unloaded(config)?.initialize()?;
            done(format!("initialized {}", path.display()))
        }
        Command::List => {
            let store = opened(config)?;
            records(store.records())
        }
        Command::Add(args) => {
            let record = input::transaction(args)?;
            let transaction_id = record.transaction_id;
            opened(config)?.create(record)?;
            done(format!("added transaction {transaction_id}"))
        }
        Command::Delete { id } => {
            let transaction_id = input::transaction_id(id)?;
            let removed = opened(config)?.delete(transaction_id)?;
            Outcome::Records {
                records: vec![removed],
            }
        }
        Command::DeleteBy { field, value } => {
            let (field, value) = input::field_value(field, value)?;
            let count = opened(config)?.delete_by_field(field, &value)?;
            Outcome::Removed { count }
        }
        Command::Update { id, changes } => {
            let transaction_id = input::transaction_id(id)?;
            let patch = input::patch(changes)?;
            let mut store = opened(config)?;
            store.update(transaction_id, &patch)?;
            records(store.get(transaction_id))
        }
        Command::Search { field, value } => {
            let (field, value) = input::field_value(field, value)?;
            let store = opened(config)?;
            let found = store.search_by_field(field, &value)?;
            records(found)
        }
        Command::Clear => {
            let mut store = opened(config)?;
            let count = store.len();
            store.clear()?;
            Outcome::Removed { count }
        }
        Command::Backup => {
            let path = config.backup_path.clone();
            unloaded(config)?.backup()?;
            done(format!("backed up to {}", path.display()))
        }
        Command::Restore => {
            let path = config.backup_path.clone();
            let mut store = unloaded(config)?;
            store.restore()?;
            done(format!(
                "restored {} transactions from {}",
                store.len(),
                path.display()
            ))
        }
        Command::Drop => {
            let path = config.data_path.clone();
            unloaded(config)?.delete_store()?;
            done(format!("deleted {}", path.display()))
        }
        Command::Export { path } => {
            let rows = opened(config)?.export_csv(path)?;
            Outcome::Exported {
                path: path.clone(),
                rows,
            }
        }
    };
    Ok(outcome)
}

/// Render an outcome as text or JSON.
pub fn render(outcome: &Outcome, json: bool) -> Result<String, serde_json::Error> {
    if json {
        return serde_json::to_string_pretty(outcome);
    }
    Ok(match outcome {
        Outcome::Done { message } => message.clone(),
        Outcome::Records { records } => table(records),
        Outcome::Removed { count } => format!("removed {count} transactions"),
        Outcome::Exported { path, rows } => {
            format!("exported {rows} transactions to {}", path.display())
        }
    })
}

/// Environment configuration with command-line overrides applied.
///
/// `--data-file` re-derives the backup path and format from the new path
/// unless they are given too.
fn store_config(cli: &Cli) -> coinledger_store::Result<StoreConfig> {
    let mut config = StoreConfig::from_env()?;
    if let Some(path) = &cli.data_file {
        let indexed = std::mem::take(&mut config.indexed_fields);
        config = StoreConfig::new(path).with_indexed_fields(indexed);
    }
    if let Some(path) = &cli.backup_file {
        config.backup_path.clone_from(path);
    }
    if let Some(format) = &cli.format {
        config.format = format.parse()?;
    }
    config.validate()?;
    Ok(config)
}

fn unloaded(config: StoreConfig) -> coinledger_store::Result<TransactionStore> {
    Ok(TransactionStore::new(config)?.with_observer(TracingObserver))
}

fn opened(config: StoreConfig) -> coinledger_store::Result<TransactionStore> {
    let mut store = unloaded(config)?;
    store.load()?;
    Ok(store)
}

fn done(message: String) -> Outcome {
    Outcome::Done { message }
}

fn records<'a>(found: impl IntoIterator<Item = &'a Transaction>) -> Outcome {
    Outcome::Records {
        records: found.into_iter().cloned().collect(),
    }
}

fn table(records: &[Transaction]) -> String {
    let mut out = Field::ALL
        .iter()
        .map(|field| field.name())
        .collect::<Vec<_>>()
        .join("\t");
    for record in records {
        let cells: Vec<String> = Field::ALL
            .iter()
            .map(|&field| {
                record
                    .get(field)
                    .map_or_else(|| "-".to_string(), |value| value.to_string())
            })
            .collect();
        let _ = write!(out, "\n{}", cells.join("\t"));
    }
    let _ = write!(out, "\n({} transactions)", records.len());
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use coinledger_core::{TransactionId, UserId};
    use tempfile::TempDir;

    fn invoke(dir: &TempDir, args: &[&str]) -> Result<Outcome, Box<dyn Error>> {
        let data = dir.path().join("ledger.csv");
        let mut argv = vec!["coinledger", "--data-file", data.to_str().unwrap()];
        argv.extend_from_slice(args);
        run(&Cli::try_parse_from(argv)?)
    }

    fn listed(outcome: Outcome) -> Vec<u64> {
        match outcome {
            Outcome::Records { records } => {
                records.iter().map(|r| r.transaction_id.get()).collect()
            }
            other => panic!("expected records, got {other:?}"),
        }
    }

    fn add(dir: &TempDir, id: &str, user: &str, symbol: &str) {
        invoke(
            dir,
            &[
                "add", "--id", id, "--user", user, "--symbol", symbol, "--type", "buy",
                "--amount", "1",
            ],
        )
        .unwrap();
    }

    #[test]
    fn full_session() {
        let dir = TempDir::new().unwrap();
        invoke(&dir, &["init"]).unwrap();
        add(&dir, "2", "10", "ETH");
        add(&dir, "1", "10", "BTC");
        add(&dir, "3", "11", "BTC");

        assert_eq!(listed(invoke(&dir, &["list"]).unwrap()), vec![1, 2, 3]);
        assert_eq!(
            listed(invoke(&dir, &["search", "CryptoSymbol", "BTC"]).unwrap()),
            vec![1, 3]
        );

        invoke(&dir, &["update", "3", "UserID=10"]).unwrap();
        assert_eq!(
            listed(invoke(&dir, &["search", "UserID", "10"]).unwrap()),
            vec![1, 2, 3]
        );

        invoke(&dir, &["backup"]).unwrap();
        let removed = invoke(&dir, &["delete-by", "UserID", "10"]).unwrap();
        assert!(matches!(removed, Outcome::Removed { count: 3 }));
        assert!(listed(invoke(&dir, &["list"]).unwrap()).is_empty());

        invoke(&dir, &["restore"]).unwrap();
        assert_eq!(listed(invoke(&dir, &["list"]).unwrap()), vec![1, 2, 3]);

        let export = dir.path().join("out.csv");
        let exported = invoke(&dir, &["export", export.to_str().unwrap()]).unwrap();
        assert!(matches!(exported, Outcome::Exported { rows: 3, .. }));

        assert_eq!(listed(invoke(&dir, &["delete", "2"]).unwrap()), vec![2]);
        invoke(&dir, &["clear"]).unwrap();
        invoke(&dir, &["drop"]).unwrap();
        assert!(invoke(&dir, &["list"]).is_err());
    }

    #[test]
    fn malformed_input_never_touches_the_store() {
        let dir = TempDir::new().unwrap();
        invoke(&dir, &["init"]).unwrap();
        let before = std::fs::read(dir.path().join("ledger.csv")).unwrap();

        assert!(invoke(
            &dir,
            &["add", "--id", "x", "--user", "1", "--symbol", "BTC", "--type", "buy", "--amount", "1"],
        )
        .is_err());
        assert!(invoke(&dir, &["search", "Nope", "1"]).is_err());
        assert!(invoke(&dir, &["update", "1", "TransactionID=9"]).is_err());

        assert_eq!(std::fs::read(dir.path().join("ledger.csv")).unwrap(), before);
    }

    #[test]
    fn duplicate_add_fails() {
        let dir = TempDir::new().unwrap();
        invoke(&dir, &["init"]).unwrap();
        add(&dir, "1", "10", "BTC");
        let err = invoke(
            &dir,
            &["add", "--id", "1", "--user", "5", "--symbol", "ETH", "--type", "buy", "--amount", "1"],
        )
        .unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn renders_text_and_json() {
        let record = Transaction::new(TransactionId::new(1), UserId::new(10), "BTC", "buy", 0.5);
        let outcome = Outcome::Records {
            records: vec![record],
        };

        let text = render(&outcome, false).unwrap();
        let mut lines = text.lines();
        assert!(lines.next().unwrap().starts_with("TransactionID\tUserID"));
        assert_eq!(lines.next().unwrap(), "1\t10\tBTC\tbuy\t0.5\t-\t-");

        let json: serde_json::Value = serde_json::from_str(&render(&outcome, true).unwrap()).unwrap();
        assert_eq!(json["result"], "records");
        assert_eq!(json["records"][0]["CryptoSymbol"], "BTC");
    }
}
