use super::*;
use crate::{
    db::{Dialect, predicate::col},
    error::ErrorClass,
    obs::{ExecKind, MetricsEvent, MetricsSink},
    test_support::{
        PAGING_DIALECTS,
        fixtures::{Book, FileEntry, FullName, Person, SEED_BOOKS, SEED_FILES, SEED_PEOPLE},
        session,
    },
};
use std::{cell::RefCell, rc::Rc};

fn ids(people: &[Person]) -> Vec<i64> {
    people.iter().map(|p| p.id).collect()
}

// ----- Selects -----

#[test]
fn range_returns_the_same_rows_in_every_paging_dialect() {
    for dialect in PAGING_DIALECTS {
        let (db, _) = session(dialect, SEED_PEOPLE);
        let rows = db
            .from::<Person>()
            .filter(col("Age").gt(21))
            .order_by_asc("Id")
            .range(3, 5)
            .select()
            .expect("range select should succeed");

        assert_eq!(ids(&rows), vec![4, 5, 6], "{dialect:?}");
    }
}

#[test]
fn range_past_the_end_is_empty() {
    for dialect in PAGING_DIALECTS {
        let (db, _) = session(dialect, SEED_PEOPLE);
        let rows = db
            .from::<Person>()
            .order_by_desc("Age")
            .range(9, 20)
            .select()
            .expect("range select should succeed");

        assert_eq!(ids(&rows), vec![2, 1], "{dialect:?}");
    }
}

#[test]
fn range_without_order_fails_before_io() {
    let (db, log) = session(Dialect::Sqlite, SEED_PEOPLE);
    let err = db
        .from::<Person>()
        .range(1, 3)
        .select()
        .expect_err("unordered range");

    assert_eq!(err.class, ErrorClass::Mapping);
    assert_eq!(log.len(), 0);

    let err = db
        .from::<Person>()
        .order_by_asc("Id")
        .range(0, 3)
        .select()
        .expect_err("zero start");
    assert!(matches!(
        err.mapping_detail(),
        Some(MappingError::InvalidRange { start: 0, end: 3 })
    ));
}

#[test]
fn filters_combine_with_and() {
    let (db, _) = session(Dialect::Sqlite, SEED_PEOPLE);
    let rows = db
        .from::<Person>()
        .filter(col("Age").gte(25))
        .filter(col("Age").lt(27))
        .order_by_asc("Id")
        .select()
        .expect("select should succeed");

    assert_eq!(ids(&rows), vec![5, 6]);
}

#[test]
fn null_and_list_conditions_run() {
    let (db, _) = session(Dialect::Sqlite, SEED_PEOPLE);
    let people = || db.from::<Person>();

    assert_eq!(people().filter(col("Nick").is_not_null()).count().expect("count"), 2);
    assert_eq!(people().filter(col("Nick").eq(None::<String>)).count().expect("count"), 8);
    assert_eq!(people().filter(col("Id").in_list([2, 4, 99])).count().expect("count"), 2);
    assert_eq!(people().filter(col("Id").in_list(Vec::<i64>::new())).count().expect("count"), 0);
    assert_eq!(people().filter(col("Age").gt(col("Id"))).count().expect("count"), 10);
}

#[test]
fn case_folded_conditions() {
    let (db, _) = session(Dialect::Sqlite, SEED_PEOPLE);

    let tom = db
        .from::<Person>()
        .filter(col("theName").lower().eq("tom"))
        .select()
        .expect("select should succeed");
    let jerry = db
        .from::<Person>()
        .filter(col("theName").upper().like("JER%"))
        .select()
        .expect("select should succeed");

    assert_eq!(ids(&tom), vec![1]);
    assert_eq!(ids(&jerry), vec![2]);
}

#[test]
fn first_defaults_to_key_order() {
    let (db, _) = session(Dialect::SqlServer2005, SEED_PEOPLE);

    let first = db.from::<Person>().first().expect("first").expect("row");
    let oldest = db
        .from::<Person>()
        .order_by_desc("Age")
        .first()
        .expect("first")
        .expect("row");
    let none = db
        .from::<Person>()
        .filter(col("Age").gt(100))
        .first()
        .expect("first");

    assert_eq!(first.name, "Tom");
    assert_eq!(oldest.name, "Gina");
    assert!(none.is_none());
}

#[test]
fn get_requires_a_single_key() {
    let (db, log) = session(Dialect::Sqlite, "");
    let err = db.get::<FullName>("Ada").expect_err("composite key");

    assert!(matches!(
        err.mapping_detail(),
        Some(MappingError::KeyArity { operation: "get", .. })
    ));
    assert_eq!(log.len(), 0);
}

#[test]
fn select_distinct_collapses_duplicate_rows() {
    let (db, _) = session(Dialect::Sqlite, SEED_FILES);
    let rows = db
        .from::<FileEntry>()
        .order_by_asc("BelongsToId")
        .select_distinct()
        .expect("select should succeed");
    let values = rows.iter().map(|r| r.belongs_to_id).collect::<Vec<_>>();

    assert_eq!(values, vec![0, 1, 2, 3, 4, 9, 11, 15, 16]);
    assert_eq!(db.from::<FileEntry>().count().expect("count"), 12);
    assert_eq!(db.from::<FileEntry>().count_distinct().expect("count"), 9);
}

// ----- Aggregates -----

#[test]
fn scalar_aggregates() {
    let (db, _) = session(Dialect::Sqlite, SEED_PEOPLE);
    let people = || db.from::<Person>();

    assert_eq!(people().count().expect("count"), 10);
    assert_eq!(people().filter(col("Age").gt(25)).count().expect("count"), 5);
    assert_eq!(people().max::<i64>("Age").expect("max"), Some(30));
    assert_eq!(people().min::<i64>("Id").expect("min"), Some(1));
    assert_eq!(people().sum::<i64>("Age").expect("sum"), Some(255));
    assert_eq!(
        people().filter(col("Age").gt(100)).max::<i64>("Age").expect("max"),
        None
    );
}

#[test]
fn group_by_counts_and_sums() {
    let (db, _) = session(Dialect::Sqlite, SEED_BOOKS);
    let books = || db.from::<Book>().order_by_asc("CategoryId");

    let counts = books().group_by::<i64>("CategoryId").expect("group");
    let sums = books()
        .group_by_sum::<i64, i64>("CategoryId", "Quantity")
        .expect("group");
    let maxes = books()
        .group_by_aggregate::<i64, i64>("CategoryId", &Aggregate::Max("Quantity".into()))
        .expect("group");

    assert_eq!(
        counts,
        vec![
            GroupCount { column: 2, count: 3 },
            GroupCount { column: 3, count: 2 },
        ]
    );
    assert_eq!(
        sums,
        vec![
            GroupValue { column: 2, value: 6 },
            GroupValue { column: 3, value: 10 },
        ]
    );
    assert_eq!(maxes[1], GroupValue { column: 3, value: 6 });
}

#[test]
fn group_by_orders_on_the_count_column() {
    let (db, _) = session(Dialect::Sqlite, SEED_BOOKS);
    let counts = db
        .from::<Book>()
        .order_by_asc(COUNT_COLUMN)
        .group_by::<i64>("CategoryId")
        .expect("group");

    assert_eq!(counts[0], GroupCount { column: 3, count: 2 });
}

// ----- Raw SQL -----

#[test]
fn raw_statements_hydrate_by_column_name() {
    let (db, _) = session(Dialect::Sqlite, SEED_PEOPLE);
    let statement = db
        .statement(
            "SELECT Name AS theName, Nick, Age, Id FROM People WHERE Age > ? AND Name <> 'x?' ORDER BY Id;",
            &[Value::Int(28)],
        )
        .expect("template should expand");

    let rows = db.execute_list::<Person>(&statement).expect("raw select");

    assert_eq!(ids(&rows), vec![9, 10]);
    assert_eq!(rows[0].name, "Finn");
}

#[test]
fn raw_scalar_and_write() {
    let (db, _) = session(Dialect::Sqlite, SEED_PEOPLE);
    let delete = db
        .statement("DELETE FROM People WHERE Age < ?;", &[Value::Int(23)])
        .expect("template should expand");

    assert_eq!(db.execute(&delete).expect("delete"), 2);
    let count = db
        .query_scalar(&SqlStatement::new("SELECT COUNT(*) FROM People;"))
        .expect("scalar");
    assert_eq!(count, Value::Int(8));

    let rows = db
        .query(&SqlStatement::new("SELECT Id FROM People ORDER BY Id LIMIT 1;"))
        .expect("query");
    assert_eq!(rows.first_value(), Value::Int(3));
}

// ----- Metrics -----

#[derive(Default)]
struct CaptureSink {
    events: RefCell<Vec<MetricsEvent>>,
}

impl MetricsSink for CaptureSink {
    fn record(&self, event: MetricsEvent) {
        self.events.borrow_mut().push(event);
    }
}

#[test]
fn session_sink_sees_statement_spans() {
    let (db, _) = session(Dialect::Sqlite, SEED_PEOPLE);
    let sink = Rc::new(CaptureSink::default());
    let db = db.metrics_sink(Rc::clone(&sink) as Rc<dyn MetricsSink>);

    db.from::<Person>().count().expect("count");
    let _ = db.from::<Person>().range(1, 2).select();

    assert_eq!(
        sink.events.borrow().as_slice(),
        &[
            MetricsEvent::ExecStart {
                kind: ExecKind::Scalar
            },
            MetricsEvent::ExecFinish {
                kind: ExecKind::Scalar,
                rows: 1
            },
        ]
    );
}
