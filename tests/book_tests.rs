#![cfg(feature = "sim")]

mod common;

use common::{n, sample_chart, sim_engine, store_uri, transfer};
use gnucash_bind::{
    AccountType, BindingError, Commodity, Engine, PriceQuote, Result, SessionOpenMode, SplitSpec,
    Time64,
};

#[test]
fn new_books_have_only_a_root() {
    let engine = Engine::simulated();
    let book = engine.new_book().unwrap();
    let root = book.root_account().unwrap();
    assert!(root.is_root().unwrap());
    assert_eq!(root.account_type().unwrap(), Some(AccountType::Root));
    assert_eq!(root.parent().unwrap(), None);
    assert!(book.is_empty().unwrap());
    assert!(!book.is_readonly().unwrap());
}

#[test]
fn views_go_stale_when_the_session_ends() {
    let engine = Engine::simulated();
    let session = engine
        .open_session(&store_uri("stale.gnucash"), SessionOpenMode::NewStore)
        .unwrap();
    let book = session.book();
    let chart = sample_chart(&book);
    let trans = transfer(&book, &chart.salary, &chart.checking, n(100, 1), "Gift");
    let split = trans.nth_split(0).unwrap().unwrap();

    session.end().unwrap();

    assert!(!book.is_open());
    assert!(book.as_raw().is_null());
    assert!(book.root_account().unwrap_err().is_stale());
    assert!(matches!(chart.checking.name(), Err(BindingError::StaleHandle("account"))));
    assert!(matches!(trans.description(), Err(BindingError::StaleHandle("transaction"))));
    assert!(matches!(split.amount(), Err(BindingError::StaleHandle("split"))));
    assert!(matches!(trans.edit(), Err(BindingError::StaleHandle(_))));
    let mut children = chart.assets.children();
    assert!(children.next().unwrap().unwrap_err().is_stale());
    assert!(children.next().is_none());
}

#[test]
fn children_are_listed_in_order_and_restartable() {
    let engine = Engine::simulated();
    let book = engine.new_book().unwrap();
    let chart = sample_chart(&book);
    let root = book.root_account().unwrap();

    let names = |iter: gnucash_bind::Children| -> Result<Vec<String>> {
        iter.map(|child| child?.name()).collect()
    };
    let expected = vec!["Assets", "Expenses", "Income"];
    assert_eq!(names(root.children()).unwrap(), expected);
    assert_eq!(names(root.children()).unwrap(), expected);

    let mut partial = root.children();
    assert_eq!(partial.next().unwrap().unwrap(), chart.assets);
    let resumed = partial.clone();
    assert_eq!(names(resumed).unwrap(), vec!["Expenses", "Income"]);
    assert_eq!(names(partial).unwrap(), vec!["Expenses", "Income"]);
}

#[test]
fn descendants_walk_depth_first() {
    let engine = Engine::simulated();
    let book = engine.new_book().unwrap();
    sample_chart(&book);
    let root = book.root_account().unwrap();

    let names: Vec<String> = root
        .descendants()
        .map(|account| account.and_then(|a| a.full_name()))
        .collect::<Result<_>>()
        .unwrap();
    assert_eq!(
        names,
        [
            "Assets",
            "Assets:Checking",
            "Expenses",
            "Expenses:Groceries",
            "Income",
            "Income:Salary",
        ]
    );
}

#[test]
fn accounts_can_be_renamed_and_moved() {
    let engine = Engine::simulated();
    let book = engine.new_book().unwrap();
    let chart = sample_chart(&book);

    let edit = chart.checking.edit().unwrap();
    edit.set_name("Current").unwrap();
    edit.set_code("1010").unwrap();
    edit.set_description("Everyday account").unwrap();
    assert!(matches!(
        chart.checking.edit(),
        Err(BindingError::EditInProgress("account"))
    ));
    edit.commit().unwrap();
    assert_eq!(chart.checking.full_name().unwrap(), "Assets:Current");
    assert_eq!(chart.checking.code().unwrap(), "1010");

    chart.expenses.append_child(&chart.checking).unwrap();
    assert_eq!(chart.checking.full_name().unwrap(), "Expenses:Current");
    assert_eq!(chart.assets.n_children().unwrap(), 0);

    let err = chart.groceries.append_child(&chart.expenses).unwrap_err();
    assert!(matches!(err, BindingError::InvalidArgument(_)));
    let root = book.root_account().unwrap();
    let err = chart.assets.append_child(&root).unwrap_err();
    assert!(matches!(err, BindingError::InvalidArgument(_)));

    let edit = chart.assets.edit().unwrap();
    assert!(matches!(
        edit.set_type(AccountType::Root),
        Err(BindingError::InvalidArgument(_))
    ));
    edit.set_type(AccountType::Cash).unwrap();
    drop(edit);
    assert_eq!(chart.assets.account_type().unwrap(), Some(AccountType::Cash));
}

#[test]
fn entities_from_another_book_are_refused() {
    let engine = Engine::simulated();
    let first = engine.new_book().unwrap();
    let second = engine.new_book().unwrap();
    let ours = sample_chart(&first);
    let theirs = sample_chart(&second);

    let err = first
        .create_account(&theirs.assets, "Savings", AccountType::Bank)
        .unwrap_err();
    assert!(matches!(err, BindingError::ForeignEntity(_)));
    assert!(matches!(
        ours.assets.append_child(&theirs.checking),
        Err(BindingError::ForeignEntity(_))
    ));

    let trans = first.create_transaction().unwrap();
    let edit = trans.edit().unwrap();
    let err = edit
        .add_split(&gnucash_bind::SplitSpec::new(&theirs.checking, n(1, 1)))
        .unwrap_err();
    assert!(matches!(err, BindingError::ForeignEntity(_)));
    edit.rollback().unwrap();
}

#[test]
fn null_entities_from_the_engine_are_invalid_handles() {
    let (sim, engine) = sim_engine();
    let book = engine.new_book().unwrap();
    let chart = sample_chart(&book);
    let trans = book.create_transaction().unwrap();
    let edit = trans.edit().unwrap();
    let entities = sim.live_entities();

    sim.set_out_of_memory(true);
    let root = book.root_account().unwrap();
    assert!(matches!(
        book.create_transaction(),
        Err(BindingError::InvalidHandle("transaction"))
    ));
    assert!(matches!(
        book.create_account(&root, "Savings", AccountType::Bank),
        Err(BindingError::InvalidHandle("account"))
    ));
    assert!(matches!(
        edit.add_split(&SplitSpec::new(&chart.checking, n(1, 1))),
        Err(BindingError::InvalidHandle("split"))
    ));
    let quote = PriceQuote::new(
        Commodity::new("NASDAQ", "ACME"),
        Commodity::currency("USD"),
        Time64::from_secs(1_700_000_000),
        n(5, 1),
    );
    let db = book.price_db().unwrap();
    assert!(matches!(db.create_price(&quote), Err(BindingError::InvalidHandle("price"))));
    assert_eq!(sim.live_entities(), entities);
    assert_eq!(root.n_children().unwrap(), 3);

    sim.set_out_of_memory(false);
    edit.add_split(&SplitSpec::new(&chart.checking, n(1, 1))).unwrap();
    edit.rollback().unwrap();
    assert_eq!(engine.live_books(), 1);
}

#[test]
fn lookups_by_guid_and_name() {
    let engine = Engine::simulated();
    let book = engine.new_book().unwrap();
    let chart = sample_chart(&book);
    let trans = transfer(&book, &chart.salary, &chart.checking, n(5, 1), "Bonus");
    let split = trans.nth_split(1).unwrap().unwrap();

    let guid = trans.guid().unwrap();
    assert_eq!(book.transaction_by_guid(&guid).unwrap(), Some(trans.clone()));
    assert_eq!(
        book.split_by_guid(&split.guid().unwrap()).unwrap(),
        Some(split.clone())
    );
    assert_eq!(book.account_by_guid(&gnucash_bind::Guid::new_random()).unwrap(), None);

    let root = book.root_account().unwrap();
    assert_eq!(root.lookup_by_name("Salary").unwrap(), Some(chart.salary.clone()));
    assert_eq!(root.lookup_by_name("Nowhere").unwrap(), None);
    assert_eq!(split.transaction().unwrap(), Some(trans));
    assert_eq!(split.account().unwrap(), Some(chart.salary));
}

#[test]
fn standalone_book_outlives_its_engine_handle() {
    let book = Engine::simulated().new_book().unwrap();
    let root = book.root_account().unwrap();
    assert_eq!(root.n_children().unwrap(), 0);
    drop(book);
    assert!(root.name().unwrap_err().is_stale());
}
