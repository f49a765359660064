#![cfg(feature = "sim")]

mod common;

use common::{n, sim_engine, store_uri};
use gnucash_bind::{
    BindingError, Commodity, Engine, PriceQuote, PriceSource, SessionOpenMode, Time64,
};

fn quote(day: u32, value: i64) -> PriceQuote {
    PriceQuote::new(
        Commodity::new("NASDAQ", "ACME"),
        Commodity::currency("USD"),
        Time64::from_ymd_neutral(2024, 5, day).unwrap(),
        n(value, 100),
    )
}

#[test]
fn latest_and_nearest_pick_the_right_quote() {
    let engine = Engine::simulated();
    let book = engine.new_book().unwrap();
    let db = book.price_db().unwrap();

    db.create_price(&quote(1, 10_000)).unwrap();
    db.create_price(&quote(10, 12_500)).unwrap();
    db.create_price(&quote(20, 11_000)).unwrap();
    assert_eq!(db.price_count().unwrap(), 3);

    let acme = Commodity::new("NASDAQ", "ACME");
    let usd = Commodity::currency("USD");
    let latest = db.latest(&acme, &usd).unwrap().unwrap();
    assert_eq!(latest.value().unwrap(), n(11_000, 100));
    assert_eq!(latest.commodity().unwrap(), Some(acme.clone()));
    assert_eq!(latest.currency().unwrap(), Some(usd.clone()));

    let near = db
        .nearest(&acme, &usd, Time64::from_ymd_neutral(2024, 5, 8).unwrap())
        .unwrap()
        .unwrap();
    assert_eq!(near.value().unwrap(), n(12_500, 100));
    assert_eq!(near.source().unwrap(), PriceSource::UserPrice);
    assert_eq!(near.type_string().unwrap(), "last");

    let eur = Commodity::currency("EUR");
    assert_eq!(db.latest(&acme, &eur).unwrap(), None);
}

#[test]
fn lookups_do_not_leak_references() {
    let (sim, engine) = sim_engine();
    let book = engine.new_book().unwrap();
    let db = book.price_db().unwrap();
    let base = sim.live_entities();

    let price = db.create_price(&quote(3, 9_900)).unwrap();
    assert_eq!(sim.live_entities(), base + 1);
    for _ in 0..5 {
        let acme = Commodity::new("NASDAQ", "ACME");
        let usd = Commodity::currency("USD");
        assert_eq!(db.latest(&acme, &usd).unwrap(), Some(price.clone()));
    }

    db.remove_price(&price).unwrap();
    assert_eq!(sim.live_entities(), base);
    assert_eq!(db.price_count().unwrap(), 0);
}

#[test]
fn removed_prices_go_stale() {
    let engine = Engine::simulated();
    let book = engine.new_book().unwrap();
    let db = book.price_db().unwrap();
    let price = db.create_price(&quote(2, 5_000)).unwrap();
    let guid = price.guid().unwrap();
    assert_eq!(db.price_by_guid(&guid).unwrap(), Some(price.clone()));

    db.remove_price(&price).unwrap();
    assert!(matches!(price.value(), Err(BindingError::StaleHandle("price"))));
    assert!(db.remove_price(&price).unwrap_err().is_stale());
    assert_eq!(db.price_by_guid(&guid).unwrap(), None);
}

#[test]
fn prices_can_be_edited() {
    let engine = Engine::simulated();
    let book = engine.new_book().unwrap();
    let db = book.price_db().unwrap();
    let price = db.create_price(&quote(4, 1_000)).unwrap();

    let edit = price.edit().unwrap();
    assert!(matches!(price.edit(), Err(BindingError::EditInProgress("price"))));
    edit.set_value("1250/100").unwrap();
    edit.set_source(PriceSource::FinanceQuote).unwrap();
    edit.set_type_string("nav").unwrap();
    edit.set_time(Time64::from_secs(1_700_000_000)).unwrap();
    assert!(edit.set_value((1, 0)).is_err());
    edit.commit().unwrap();

    assert_eq!(price.value().unwrap(), n(1_250, 100));
    assert_eq!(price.source().unwrap(), PriceSource::FinanceQuote);
    assert_eq!(price.type_string().unwrap(), "nav");
    assert_eq!(price.time().unwrap(), Time64::from_secs(1_700_000_000));
}

#[test]
fn sources_can_be_set_by_their_engine_spelling() {
    let engine = Engine::simulated();
    let book = engine.new_book().unwrap();
    let price = book.price_db().unwrap().create_price(&quote(7, 300)).unwrap();
    assert_eq!(price.source_string().unwrap(), "user:price");

    let edit = price.edit().unwrap();
    edit.set_source_string("Finance::Quote").unwrap();
    assert!(matches!(
        edit.set_source_string("somewhere"),
        Err(BindingError::InvalidArgument(_))
    ));
    edit.commit().unwrap();

    assert_eq!(price.source().unwrap(), PriceSource::FinanceQuote);
    assert_eq!(price.source_string().unwrap(), "Finance::Quote");
}

#[test]
fn inverted_quotes_swap_the_pair_without_touching_the_db() {
    let (sim, engine) = sim_engine();
    let book = engine.new_book().unwrap();
    let db = book.price_db().unwrap();
    let price = db.create_price(&quote(8, 12_500)).unwrap();
    let entities = sim.live_entities();

    let inverse = price.invert().unwrap();
    assert_eq!(inverse.commodity, Commodity::currency("USD"));
    assert_eq!(inverse.currency, Commodity::new("NASDAQ", "ACME"));
    assert!(inverse.value.same_value(&n(100, 12_500)));
    assert_eq!(inverse.time, price.time().unwrap());
    assert_eq!(inverse.source, PriceSource::Temporary);
    assert_eq!(inverse.type_string, "last");
    assert_eq!(sim.live_entities(), entities);
    assert_eq!(db.price_count().unwrap(), 1);

    let kept = db.create_price(&inverse).unwrap();
    assert_eq!(db.price_count().unwrap(), 2);
    let usd = Commodity::currency("USD");
    let acme = Commodity::new("NASDAQ", "ACME");
    assert_eq!(db.latest(&usd, &acme).unwrap(), Some(kept));
}

#[test]
fn prices_from_another_book_are_refused() {
    let engine = Engine::simulated();
    let first = engine.new_book().unwrap();
    let second = engine.new_book().unwrap();
    let price = second
        .price_db()
        .unwrap()
        .create_price(&quote(5, 100))
        .unwrap();
    let err = first.price_db().unwrap().remove_price(&price).unwrap_err();
    assert!(matches!(err, BindingError::ForeignEntity(_)));
}

#[test]
fn prices_survive_a_save_and_reload() {
    let engine = Engine::simulated();
    let uri = store_uri("prices.gnucash");
    {
        let session = engine
            .open_session(&uri, SessionOpenMode::NewStore)
            .unwrap();
        let db = session.book().price_db().unwrap();
        db.create_price(&quote(6, 4_200)).unwrap();
        session.save().unwrap();
    }

    let session = engine.open_session(&uri, SessionOpenMode::Normal).unwrap();
    let db = session.book().price_db().unwrap();
    assert_eq!(db.price_count().unwrap(), 1);
    let price = db
        .latest(&Commodity::new("NASDAQ", "ACME"), &Commodity::currency("USD"))
        .unwrap()
        .unwrap();
    assert_eq!(price.value().unwrap(), n(4_200, 100));
}
