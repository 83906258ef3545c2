// tests/journal_walker_test.rs — Integration tests for the wallet journal walker

use std::cell::RefCell;
use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use pretty_assertions::assert_eq;

use eveapi::db::models::{CorporationDivision, DivisionType};
use eveapi::db::{self, Store};
use eveapi::infra::errors::EveApiError;
use eveapi::jobs::wallet::corporation::{
    walk, JournalEntry, JournalPage, JournalPages, JournalWalkReport,
};

const CORP: i64 = 98000001;

// ---------- Scripted page sources ----------

/// Serves a fixed ledger per division, newest first, `page_size` at a time.
struct ScriptedPages {
    ledger: HashMap<i64, Vec<i64>>,
    page_size: usize,
    cached_divisions: Vec<i64>,
    calls: RefCell<Vec<(i64, i64)>>,
}

impl ScriptedPages {
    fn new(page_size: usize) -> Self {
        Self {
            ledger: HashMap::new(),
            page_size,
            cached_divisions: Vec::new(),
            calls: RefCell::new(Vec::new()),
        }
    }

    fn with_division(mut self, division: i64, ids: impl IntoIterator<Item = i64>) -> Self {
        self.ledger.insert(division, ids.into_iter().collect());
        self
    }

    fn cached(mut self, division: i64) -> Self {
        self.cached_divisions.push(division);
        self
    }

    fn cursors_for(&self, division: i64) -> Vec<i64> {
        self.calls
            .borrow()
            .iter()
            .filter(|(d, _)| *d == division)
            .map(|(_, from_id)| *from_id)
            .collect()
    }
}

#[async_trait(?Send)]
impl JournalPages for ScriptedPages {
    async fn page(
        &self,
        corporation_id: i64,
        division: i64,
        from_id: i64,
    ) -> Result<JournalPage, EveApiError> {
        assert_eq!(corporation_id, CORP);
        self.calls.borrow_mut().push((division, from_id));

        let mut ids: Vec<i64> = self
            .ledger
            .get(&division)
            .map(|ids| ids.iter().copied().filter(|id| *id <= from_id).collect())
            .unwrap_or_default();
        ids.sort_unstable_by(|a, b| b.cmp(a));
        ids.truncate(self.page_size);

        Ok(JournalPage {
            cached: self.cached_divisions.contains(&division),
            entries: ids.into_iter().map(entry).collect(),
        })
    }
}

/// Returns the same single entry whatever the cursor.
struct StuckPages {
    calls: RefCell<usize>,
}

#[async_trait(?Send)]
impl JournalPages for StuckPages {
    async fn page(&self, _: i64, _: i64, _: i64) -> Result<JournalPage, EveApiError> {
        *self.calls.borrow_mut() += 1;
        Ok(JournalPage {
            cached: false,
            entries: vec![entry(100)],
        })
    }
}

struct FailingPages;

#[async_trait(?Send)]
impl JournalPages for FailingPages {
    async fn page(&self, _: i64, _: i64, _: i64) -> Result<JournalPage, EveApiError> {
        Err(EveApiError::Esi {
            status: 503,
            message: "service unavailable".into(),
            retriable: true,
        })
    }
}

// ---------- Helpers ----------

fn entry(id: i64) -> JournalEntry {
    JournalEntry {
        id,
        date: Utc.timestamp_opt(1_500_000_000 + id, 0).unwrap(),
        ref_type: "bounty_prizes".into(),
        first_party_id: Some(1000125),
        second_party_id: Some(90000001),
        amount: Some(id as f64 * 1000.0),
        balance: Some(1_000_000.0),
        reason: None,
        tax_receiver_id: None,
        tax: None,
        description: "from esi".into(),
        context_id: None,
        context_id_type: None,
    }
}

fn store_with_wallets(divisions: &[i64]) -> Store {
    let store = db::in_memory().unwrap();
    let mut rows: Vec<CorporationDivision> = divisions
        .iter()
        .map(|d| CorporationDivision {
            corporation_id: CORP,
            division_type: DivisionType::Wallet,
            division: *d,
            name: None,
        })
        .collect();
    // Hangar divisions share numbers with wallets but are never walked.
    rows.push(CorporationDivision {
        corporation_id: CORP,
        division_type: DivisionType::Hangar,
        division: 7,
        name: Some("Hangar".into()),
    });
    store.replace_corporation_divisions(CORP, &rows).unwrap();
    store
}

// ---------- Tests ----------

#[tokio::test]
async fn test_walks_back_until_empty_page() {
    let store = store_with_wallets(&[1]);
    let pages = ScriptedPages::new(10).with_division(1, 1..=25);

    let report = walk(&pages, &store, CORP).await.unwrap();

    assert_eq!(
        report,
        JournalWalkReport {
            divisions: 1,
            pages: 4,
            inserted: 25,
            skipped: 0,
        }
    );
    assert_eq!(pages.cursors_for(1), vec![i64::MAX, 15, 5, 0]);

    let stored = store.journal_entries(CORP, 1).unwrap();
    assert_eq!(stored.len(), 25);
    assert_eq!(stored[0].id, 25);
    assert_eq!(stored[24].id, 1);
    assert_eq!(stored[0].amount, Some(25_000.0));
}

#[tokio::test]
async fn test_sparse_ids_move_cursor_below_page_minimum() {
    let store = store_with_wallets(&[1]);
    let pages = ScriptedPages::new(2).with_division(1, [9000, 500, 42]);

    let report = walk(&pages, &store, CORP).await.unwrap();

    assert_eq!(report.inserted, 3);
    assert_eq!(pages.cursors_for(1), vec![i64::MAX, 499, 41]);
}

#[tokio::test]
async fn test_cursor_resets_for_every_division() {
    let store = store_with_wallets(&[1, 2, 3]);
    let pages = ScriptedPages::new(5)
        .with_division(1, 1..=7)
        .with_division(2, 100..=102)
        .with_division(3, []);

    let report = walk(&pages, &store, CORP).await.unwrap();

    assert_eq!(report.divisions, 3);
    assert_eq!(report.inserted, 10);
    assert_eq!(pages.cursors_for(1), vec![i64::MAX, 2, 0]);
    assert_eq!(pages.cursors_for(2), vec![i64::MAX, 99]);
    assert_eq!(pages.cursors_for(3), vec![i64::MAX]);
    assert!(pages.cursors_for(7).is_empty());

    assert_eq!(store.journal_entries(CORP, 1).unwrap().len(), 7);
    assert_eq!(store.journal_entries(CORP, 2).unwrap().len(), 3);
}

#[tokio::test]
async fn test_existing_entries_are_skipped_and_left_untouched() {
    let store = store_with_wallets(&[1]);

    let mut original = entry(20).into_row(CORP, 1);
    original.description = "stored earlier".into();
    original.amount = Some(1.0);
    assert!(store.insert_journal_entry(&original).unwrap());

    let pages = ScriptedPages::new(10).with_division(1, 1..=25);
    let report = walk(&pages, &store, CORP).await.unwrap();

    assert_eq!(report.inserted, 24);
    assert_eq!(report.skipped, 1);

    let kept = store
        .journal_entries(CORP, 1)
        .unwrap()
        .into_iter()
        .find(|e| e.id == 20)
        .unwrap();
    assert_eq!(kept.description, "stored earlier");
    assert_eq!(kept.amount, Some(1.0));
}

#[tokio::test]
async fn test_second_walk_inserts_nothing() {
    let store = store_with_wallets(&[1]);
    let pages = ScriptedPages::new(10).with_division(1, 1..=12);

    let first = walk(&pages, &store, CORP).await.unwrap();
    let second = walk(&pages, &store, CORP).await.unwrap();

    assert_eq!(first.inserted, 12);
    assert_eq!(second.inserted, 0);
    assert_eq!(second.skipped, 12);
    assert_eq!(first.pages, second.pages);
}

#[tokio::test]
async fn test_cached_load_stops_only_that_division() {
    let store = store_with_wallets(&[1, 2]);
    let pages = ScriptedPages::new(10)
        .with_division(1, 1..=5)
        .with_division(2, 1..=3)
        .cached(1);

    let report = walk(&pages, &store, CORP).await.unwrap();

    assert_eq!(pages.cursors_for(1), vec![i64::MAX]);
    assert_eq!(pages.cursors_for(2), vec![i64::MAX, 0]);
    assert_eq!(report.inserted, 3);
    assert!(store.journal_entries(CORP, 1).unwrap().is_empty());
    assert_eq!(store.journal_entries(CORP, 2).unwrap().len(), 3);
}

#[tokio::test]
async fn test_stops_when_cursor_does_not_advance() {
    let store = store_with_wallets(&[1]);
    let pages = StuckPages {
        calls: RefCell::new(0),
    };

    let report = walk(&pages, &store, CORP).await.unwrap();

    assert_eq!(*pages.calls.borrow(), 2);
    assert_eq!(report.inserted, 1);
    assert_eq!(report.skipped, 1);
}

#[tokio::test]
async fn test_no_wallet_divisions_means_no_requests() {
    let store = db::in_memory().unwrap();
    let pages = ScriptedPages::new(10).with_division(1, 1..=5);

    let report = walk(&pages, &store, CORP).await.unwrap();

    assert_eq!(report, JournalWalkReport::default());
    assert!(pages.calls.borrow().is_empty());
}

#[tokio::test]
async fn test_page_error_aborts_walk() {
    let store = store_with_wallets(&[1]);

    let err = walk(&FailingPages, &store, CORP).await.unwrap_err();

    let esi = err.downcast_ref::<EveApiError>().unwrap();
    assert!(esi.is_retriable());
    assert!(store.journal_entries(CORP, 1).unwrap().is_empty());
}
