#![cfg(feature = "sim")]

mod common;

use common::{n, sample_chart, sim_engine, store_uri, transfer};
use gnucash_bind::{
    BackendErrorKind, BindingError, CommitOutcome, Engine, ReconcileState, SessionOpenMode,
    SplitSpec, Time64,
};

#[test]
fn committed_transactions_move_balances() {
    let engine = Engine::simulated();
    let book = engine.new_book().unwrap();
    let chart = sample_chart(&book);

    let trans = transfer(&book, &chart.salary, &chart.checking, n(300_000, 100), "Payday");
    assert_eq!(trans.description().unwrap(), "Payday");
    assert_eq!(
        trans.date_posted().unwrap(),
        Time64::from_ymd_neutral(2024, 3, 15).unwrap()
    );
    assert_eq!(trans.split_count().unwrap(), 2);
    assert!(trans.is_balanced().unwrap());
    assert!(trans.imbalance_value().unwrap().is_zero());
    assert!(!trans.is_open().unwrap());

    assert_eq!(chart.checking.balance().unwrap(), n(300_000, 100));
    assert_eq!(chart.salary.balance().unwrap(), n(-300_000, 100));
    assert_eq!(chart.checking.split_count().unwrap(), 1);
    let split = chart.checking.splits().next().unwrap().unwrap();
    assert_eq!(split.transaction().unwrap(), Some(trans));
}

#[test]
fn reconcile_flags_drive_cleared_and_reconciled_balances() {
    let engine = Engine::simulated();
    let book = engine.new_book().unwrap();
    let chart = sample_chart(&book);

    let trans = book.create_transaction().unwrap();
    let edit = trans.edit().unwrap();
    edit.add_split(
        &SplitSpec::new(&chart.checking, n(10, 1))
            .reconcile(ReconcileState::Cleared)
            .memo("first"),
    )
    .unwrap();
    edit.add_split(
        &SplitSpec::new(&chart.checking, n(20, 1))
            .reconcile(ReconcileState::Reconciled)
            .action("Deposit"),
    )
    .unwrap();
    edit.add_split(&SplitSpec::new(&chart.checking, n(40, 1)))
        .unwrap();
    edit.add_split(&SplitSpec::new(&chart.salary, n(-70, 1)))
        .unwrap();
    edit.commit().unwrap();

    assert!(chart.checking.balance().unwrap().same_value(&n(70, 1)));
    assert!(chart.checking.cleared_balance().unwrap().same_value(&n(30, 1)));
    assert!(chart.checking.reconciled_balance().unwrap().same_value(&n(20, 1)));

    let splits: Vec<_> = chart
        .checking
        .splits()
        .collect::<gnucash_bind::Result<_>>()
        .unwrap();
    assert_eq!(splits[0].memo().unwrap(), "first");
    assert_eq!(splits[1].action().unwrap(), "Deposit");
    assert_eq!(splits[1].reconcile_state().unwrap(), ReconcileState::Reconciled);
    assert_eq!(splits[2].reconcile_state().unwrap(), ReconcileState::NotReconciled);
}

#[test]
fn second_edit_is_refused_until_the_first_ends() {
    let engine = Engine::simulated();
    let book = engine.new_book().unwrap();
    let chart = sample_chart(&book);
    let trans = transfer(&book, &chart.checking, &chart.groceries, n(12, 1), "Market");

    let edit = trans.edit().unwrap();
    assert!(trans.is_open().unwrap());
    assert!(matches!(
        trans.edit(),
        Err(BindingError::EditInProgress("transaction"))
    ));
    let same = trans.clone();
    assert!(matches!(same.edit(), Err(BindingError::EditInProgress(_))));
    assert_eq!(edit.commit().unwrap(), CommitOutcome::Kept);

    let again = trans.edit().unwrap();
    again.set_num("42").unwrap();
    again.commit().unwrap();
    assert_eq!(trans.num().unwrap(), "42");
}

#[test]
fn rollback_restores_fields_and_releases_new_splits() {
    let engine = Engine::simulated();
    let book = engine.new_book().unwrap();
    let chart = sample_chart(&book);
    let trans = transfer(&book, &chart.checking, &chart.groceries, n(1_999, 100), "Lunch");
    let kept = trans.nth_split(0).unwrap().unwrap();

    let edit = trans.edit().unwrap();
    edit.set_description("Dinner").unwrap();
    edit.set_notes("with friends").unwrap();
    edit.split(&kept).unwrap().set_memo("changed").unwrap();
    let extra = edit
        .add_split(&SplitSpec::new(&chart.groceries, n(500, 100)))
        .unwrap();
    assert_eq!(trans.split_count().unwrap(), 3);
    edit.rollback().unwrap();

    assert_eq!(trans.description().unwrap(), "Lunch");
    assert_eq!(trans.notes().unwrap(), "");
    assert_eq!(trans.split_count().unwrap(), 2);
    assert_eq!(kept.memo().unwrap(), "");
    assert!(matches!(extra.amount(), Err(BindingError::StaleHandle("split"))));
    assert!(chart.groceries.balance().unwrap().same_value(&n(1_999, 100)));
}

#[test]
fn dropped_edit_rolls_back() {
    let engine = Engine::simulated();
    let book = engine.new_book().unwrap();
    let trans = book.create_transaction().unwrap();
    {
        let edit = trans.edit().unwrap();
        edit.set_description("draft").unwrap();
    }
    assert_eq!(trans.description().unwrap(), "");
    assert!(!trans.is_open().unwrap());
    trans.edit().unwrap().rollback().unwrap();
}

#[test]
fn committing_without_splits_destroys_the_transaction() {
    let (sim, engine) = sim_engine();
    let book = engine.new_book().unwrap();
    let entities = sim.live_entities();
    let trans = book.create_transaction().unwrap();
    let guid = trans.guid().unwrap();

    let edit = trans.edit().unwrap();
    edit.set_description("nothing").unwrap();
    assert_eq!(edit.commit().unwrap(), CommitOutcome::Destroyed);

    assert!(matches!(trans.description(), Err(BindingError::StaleHandle("transaction"))));
    assert!(trans.edit().unwrap_err().is_stale());
    assert_eq!(book.transaction_by_guid(&guid).unwrap(), None);
    assert_eq!(book.transaction_count().unwrap(), 0);
    assert_eq!(sim.live_entities(), entities);
}

#[test]
fn removing_every_split_destroys_the_transaction_on_commit() {
    let engine = Engine::simulated();
    let book = engine.new_book().unwrap();
    let chart = sample_chart(&book);
    let trans = transfer(&book, &chart.checking, &chart.groceries, n(4, 1), "Refund");
    let splits: Vec<_> = trans.splits().collect::<Result<_, _>>().unwrap();

    let edit = trans.edit().unwrap();
    for split in &splits {
        edit.remove_split(split).unwrap();
    }
    edit.set_description("x").unwrap();
    assert_eq!(edit.commit().unwrap(), CommitOutcome::Destroyed);

    assert!(trans.description().unwrap_err().is_stale());
    assert!(splits.iter().all(|split| split.memo().unwrap_err().is_stale()));
    assert_eq!(book.transaction_count().unwrap(), 0);
    assert!(chart.checking.balance().unwrap().is_zero());
}

#[test]
fn read_only_books_keep_what_the_engine_refuses_to_destroy() {
    let engine = Engine::simulated();
    let uri = store_uri("frozen.gnucash");
    let guid = {
        let session = engine.open_session(&uri, SessionOpenMode::NewStore).unwrap();
        let book = session.book();
        let chart = sample_chart(&book);
        let trans = transfer(&book, &chart.checking, &chart.groceries, n(9, 1), "Books");
        session.save().unwrap();
        trans.guid().unwrap()
    };

    let session = engine.open_session(&uri, SessionOpenMode::ReadOnly).unwrap();
    let book = session.book();
    let trans = book.transaction_by_guid(&guid).unwrap().unwrap();
    let split = trans.nth_split(0).unwrap().unwrap();

    let edit = trans.edit().unwrap();
    let err = edit.remove_split(&split).unwrap_err();
    assert!(matches!(err, BindingError::NativeCallFailed { operation: "split destroy", .. }));
    assert_eq!(err.backend_kind(), Some(BackendErrorKind::ReadOnly));
    assert_eq!(split.memo().unwrap(), "");
    assert_eq!(trans.split_count().unwrap(), 2);

    let err = edit.destroy().unwrap_err();
    assert!(matches!(err, BindingError::NativeCallFailed { operation: "transaction destroy", .. }));
    assert_eq!(trans.description().unwrap(), "Books");
    assert_eq!(split.amount().unwrap(), n(9, 1));
    assert!(!trans.is_open().unwrap());
    assert_eq!(book.transaction_count().unwrap(), 1);
}

#[test]
fn removed_splits_go_stale() {
    let engine = Engine::simulated();
    let book = engine.new_book().unwrap();
    let chart = sample_chart(&book);
    let trans = transfer(&book, &chart.checking, &chart.groceries, n(8, 1), "Snacks");
    let first = trans.nth_split(0).unwrap().unwrap();
    let second = trans.nth_split(1).unwrap().unwrap();

    let edit = trans.edit().unwrap();
    edit.remove_split(&first).unwrap();
    let moved = edit.split(&second).unwrap();
    moved.set_account(&chart.groceries).unwrap();
    moved.set_amount("0").unwrap();
    moved.set_value((0, 1)).unwrap();
    drop(moved);
    edit.commit().unwrap();

    assert!(first.guid().unwrap_err().is_stale());
    assert_eq!(trans.split_count().unwrap(), 1);
    assert_eq!(second.account().unwrap(), Some(chart.groceries.clone()));
    assert!(chart.checking.balance().unwrap().is_zero());
}

#[test]
fn splits_of_other_transactions_cannot_be_edited() {
    let engine = Engine::simulated();
    let book = engine.new_book().unwrap();
    let chart = sample_chart(&book);
    let one = transfer(&book, &chart.checking, &chart.groceries, n(1, 1), "One");
    let two = transfer(&book, &chart.checking, &chart.groceries, n(2, 1), "Two");
    let foreign = two.nth_split(0).unwrap().unwrap();

    let edit = one.edit().unwrap();
    assert!(matches!(edit.split(&foreign), Err(BindingError::ForeignEntity(_))));
    assert!(matches!(
        edit.remove_split(&foreign),
        Err(BindingError::ForeignEntity(_))
    ));
    edit.commit().unwrap();
    assert_eq!(two.split_count().unwrap(), 2);
}

#[test]
fn destroyed_transactions_and_their_splits_go_stale() {
    let (sim, engine) = sim_engine();
    let book = engine.new_book().unwrap();
    let chart = sample_chart(&book);
    let trans = transfer(&book, &chart.checking, &chart.groceries, n(3, 1), "Oops");
    let split = trans.nth_split(0).unwrap().unwrap();
    let guid = trans.guid().unwrap();
    let entities = sim.live_entities();

    trans.edit().unwrap().destroy().unwrap();

    assert_eq!(sim.live_entities(), entities - 3);
    assert!(matches!(trans.description(), Err(BindingError::StaleHandle("transaction"))));
    assert!(split.value().unwrap_err().is_stale());
    assert_eq!(book.transaction_by_guid(&guid).unwrap(), None);
    assert_eq!(book.transaction_count().unwrap(), 0);
    assert!(chart.groceries.balance().unwrap().is_zero());
}

#[test]
fn posted_dates_use_the_neutral_time_of_day() {
    let engine = Engine::simulated();
    let book = engine.new_book().unwrap();
    let chart = sample_chart(&book);
    let trans = book.create_transaction().unwrap();
    let edit = trans.edit().unwrap();
    edit.add_split(&SplitSpec::new(&chart.groceries, n(30, 1))).unwrap();
    edit.add_split(&SplitSpec::new(&chart.checking, n(-30, 1))).unwrap();
    assert!(matches!(
        edit.set_posted_ymd(2024, 2, 30),
        Err(BindingError::InvalidArgument(_))
    ));
    let date = chrono::NaiveDate::from_ymd_opt(2023, 12, 31).unwrap();
    edit.set_posted_date(date).unwrap();
    edit.commit().unwrap();
    assert_eq!(trans.date_posted().unwrap().date(), Some(date));
}

#[test]
fn nul_bytes_in_text_are_rejected() {
    let engine = Engine::simulated();
    let book = engine.new_book().unwrap();
    let trans = book.create_transaction().unwrap();
    let edit = trans.edit().unwrap();
    assert!(matches!(
        edit.set_description("bad\0text"),
        Err(BindingError::InvalidArgument(_))
    ));
    edit.rollback().unwrap();
}
