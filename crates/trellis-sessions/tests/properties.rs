//! Property tests for session data.

use std::collections::BTreeMap;
use std::sync::Arc;

use http::HeaderMap;
use proptest::prelude::*;
use trellis_sessions::{MemoryStore, Session, Value};

#[derive(Debug, Clone)]
enum Op {
    Set(String, i64),
    Delete(String),
}

fn key() -> impl Strategy<Value = String> {
    prop::sample::select(vec!["a", "b", "c", "d"]).prop_map(str::to_string)
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (key(), any::<i64>()).prop_map(|(k, v)| Op::Set(k, v)),
        key().prop_map(Op::Delete),
    ]
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread().build().unwrap()
}

proptest! {
    #[test]
    fn last_write_wins(ops in prop::collection::vec(op(), 0..40)) {
        let (expected, actual) = runtime().block_on(async {
            let session = Session::new("web", HeaderMap::new(), Arc::new(MemoryStore::new()));
            let mut model: BTreeMap<String, i64> = BTreeMap::new();

            for op in &ops {
                match op {
                    Op::Set(k, v) => {
                        session.set(k.clone(), *v).await.unwrap();
                        model.insert(k.clone(), *v);
                    }
                    Op::Delete(k) => {
                        session.delete(k).await.unwrap();
                        model.remove(k);
                    }
                }
            }

            let mut actual = BTreeMap::new();
            for k in ["a", "b", "c", "d"] {
                if let Some(value) = session.get(k).await.unwrap() {
                    actual.insert(k.to_string(), value);
                }
            }
            let expected: BTreeMap<String, Value> =
                model.into_iter().map(|(k, v)| (k, Value::from(v))).collect();
            (expected, actual)
        });

        prop_assert_eq!(expected, actual);
    }

    #[test]
    fn clear_empties_everything(keys in prop::collection::vec(key(), 1..10)) {
        let remaining = runtime().block_on(async {
            let session = Session::new("web", HeaderMap::new(), Arc::new(MemoryStore::new()));
            for (i, k) in keys.iter().enumerate() {
                session.set(k.clone(), i64::try_from(i).unwrap()).await.unwrap();
            }
            session.clear().await.unwrap();

            let mut remaining = Vec::new();
            for k in &keys {
                if session.get(k).await.unwrap().is_some() {
                    remaining.push(k.clone());
                }
            }
            remaining
        });

        prop_assert!(remaining.is_empty());
    }
}
