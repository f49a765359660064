use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use gnucash_bind::{AccountType, Book, Engine, Guid, Numeric, SessionOpenMode, SplitSpec};
use tempfile::tempdir;

fn populate(book: &Book, txn_count: usize) {
    let root = book.root_account().expect("root");
    let checking = book
        .create_account(&root, "Checking", AccountType::Bank)
        .expect("checking");
    let groceries = book
        .create_account(&root, "Groceries", AccountType::Expense)
        .expect("groceries");

    for idx in 0..txn_count {
        let amount = Numeric::new(1_000 + (idx % 500) as i64, 100).expect("amount");
        let trans = book.create_transaction().expect("transaction");
        let edit = trans.edit().expect("edit");
        edit.add_split(&SplitSpec::new(&groceries, amount))
            .expect("debit");
        edit.add_split(&SplitSpec::new(&checking, -amount))
            .expect("credit");
        edit.commit().expect("commit");
    }
}

fn bench_values(c: &mut Criterion) {
    let text = Guid::new_random().to_string();
    c.bench_function("guid_parse", |b| {
        b.iter(|| black_box(Guid::parse(black_box(&text)).expect("guid")))
    });

    let lhs = Numeric::new(123_456, 100).expect("lhs");
    let rhs = Numeric::new(7, 3).expect("rhs");
    c.bench_function("numeric_add_mixed_denoms", |b| {
        b.iter(|| black_box(black_box(lhs).checked_add(&black_box(rhs)).expect("add")))
    });
    c.bench_function("numeric_cmp_value", |b| {
        b.iter(|| black_box(lhs.cmp_value(black_box(&rhs))))
    });
}

fn bench_book(c: &mut Criterion) {
    let engine = Engine::simulated();
    let book = engine.new_book().expect("book");
    populate(&book, black_box(1_000));
    let root = book.root_account().expect("root");

    c.bench_function("balance_1k_splits", |b| {
        let checking = root.lookup_by_name("Checking").expect("lookup").expect("checking");
        b.iter(|| black_box(checking.balance().expect("balance")))
    });

    c.bench_function("descendant_walk", |b| {
        b.iter(|| black_box(root.descendants().count()))
    });

    let dir = tempdir().expect("tempdir");
    let uri = format!("xml://{}", dir.path().join("bench.gnucash").display());
    c.bench_function("session_save_1k", |b| {
        b.iter_batched(
            || {
                let session = engine
                    .open_session(&uri, SessionOpenMode::NewOverwrite)
                    .expect("open");
                populate(&session.book(), 1_000);
                session
            },
            |session| {
                session.save().expect("save");
                black_box(session);
            },
            BatchSize::PerIteration,
        );
    });
}

criterion_group!(benches, bench_values, bench_book);
criterion_main!(benches);
