//! Property tests: indexes always agree with the primary collection, and
//! every record survives a reopen unchanged in both file formats.

mod common;

use coinledger_core::{Field, FieldValue, Transaction, TransactionId, TransactionPatch, UserId};
use coinledger_store::{FileFormat, TransactionStore};
use common::TestStore;
use proptest::prelude::*;

const SYMBOLS: [&str; 3] = ["BTC", "ETH", "SOL"];

#[derive(Debug, Clone)]
enum Step {
    Create { id: u64, user: u64, symbol: String, kind: String },
    Delete { id: u64 },
    DeleteByUser { user: u64 },
    Update { id: u64, user: Option<u64>, symbol: Option<String> },
}

/// Mostly common tickers, so buckets collide, plus text that needs quoting
/// or carries padding.
fn text() -> impl Strategy<Value = String> {
    prop_oneof![
        3 => prop::sample::select(SYMBOLS.to_vec()).prop_map(String::from),
        2 => "[ a-zA-Z0-9,;\"'\t\r\n]{0,8}",
        1 => any::<String>(),
    ]
}

fn step() -> impl Strategy<Value = Step> {
    prop_oneof![
        4 => (0..20u64, 0..4u64, text(), text())
            .prop_map(|(id, user, symbol, kind)| Step::Create { id, user, symbol, kind }),
        2 => (0..20u64).prop_map(|id| Step::Delete { id }),
        1 => (0..4u64).prop_map(|user| Step::DeleteByUser { user }),
        2 => (0..20u64, proptest::option::of(0..4u64), proptest::option::of(text()))
            .prop_map(|(id, user, symbol)| Step::Update { id, user, symbol }),
    ]
}

fn apply(store: &mut TransactionStore, step: &Step) {
    // Rejections (duplicate, not found) are expected; only consistency matters.
    match step {
        Step::Create { id, user, symbol, kind } => {
            let record = Transaction::new(
                TransactionId::new(*id),
                UserId::new(*user),
                symbol.as_str(),
                kind.as_str(),
                1.0,
            );
            let _ = store.create(record);
        }
        Step::Delete { id } => {
            let _ = store.delete(TransactionId::new(*id));
        }
        Step::DeleteByUser { user } => {
            let _ = store.delete_by_field(Field::UserId, &UserId::new(*user).into());
        }
        Step::Update { id, user, symbol } => {
            let mut patch = TransactionPatch::new();
            if let Some(user) = user {
                patch = patch.user_id(UserId::new(*user));
            }
            if let Some(symbol) = symbol {
                patch = patch.crypto_symbol(symbol.as_str());
            }
            let _ = store.update(TransactionId::new(*id), &patch);
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn indexes_match_rebuild_after_any_sequence(steps in prop::collection::vec(step(), 1..40)) {
        for format in [FileFormat::Csv, FileFormat::Cbor] {
            let mut t = TestStore::new(format);
            for step in &steps {
                apply(&mut t.store, step);
                prop_assert!(t.store.indexes_consistent(), "{} after {:?}", format, step);
            }

            let symbols: Vec<String> =
                t.store.records().map(|r| r.crypto_symbol.clone()).collect();
            for symbol in &symbols {
                let searched: Vec<_> = t
                    .store
                    .search_by_field(Field::CryptoSymbol, &symbol.as_str().into())
                    .unwrap()
                    .into_iter()
                    .map(|r| r.transaction_id)
                    .collect();
                let scanned: Vec<_> = t
                    .store
                    .records()
                    .filter(|r| &r.crypto_symbol == symbol)
                    .map(|r| r.transaction_id)
                    .collect();
                prop_assert_eq!(searched, scanned);
            }

            let reopened = t.reopen();
            prop_assert_eq!(
                reopened.records().cloned().collect::<Vec<_>>(),
                t.store.records().cloned().collect::<Vec<_>>(),
                "{}", format
            );
            prop_assert!(reopened.indexes_consistent());
            for symbol in &symbols {
                let value = FieldValue::from(symbol.as_str());
                prop_assert_eq!(
                    reopened.search_by_field(Field::CryptoSymbol, &value).unwrap().len(),
                    t.store.search_by_field(Field::CryptoSymbol, &value).unwrap().len()
                );
            }
        }
    }

    #[test]
    fn duplicate_create_never_changes_the_store(
        user in 0..4u64,
        symbol in 0..SYMBOLS.len(),
    ) {
        let mut t = TestStore::csv();
        t.store.create(common::trade(1, 10, "BTC")).unwrap();
        let before: Vec<_> = t.store.records().cloned().collect();

        let duplicate = Transaction::new(
            TransactionId::new(1),
            UserId::new(user),
            SYMBOLS[symbol],
            "sell",
            2.0,
        );
        prop_assert!(t.store.create(duplicate).is_err());
        prop_assert_eq!(t.store.records().cloned().collect::<Vec<_>>(), before);
        prop_assert!(t.store.indexes_consistent());
    }
}
