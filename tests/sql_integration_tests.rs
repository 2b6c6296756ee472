// End-to-end tests driving the full pipeline through Database::execute:
// SQL text → lexer → parser → executor → storage/indexes.

use relicdb::{Database, QueryResult, RelicError, Value};

fn seeded_users() -> Database {
    let mut db = Database::new();
    db.execute("CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT NOT NULL);")
        .unwrap();
    db.execute("INSERT INTO users VALUES (1,'Alice'), (2,'Bob'), (3,'Carol');")
        .unwrap();
    db
}

fn with_orders(mut db: Database) -> Database {
    db.execute("CREATE TABLE orders (uid INTEGER, total REAL);")
        .unwrap();
    db.execute("INSERT INTO orders VALUES (1,10.0),(2,20.0),(2,30.0);")
        .unwrap();
    db
}

fn column(result: &QueryResult, name: &str) -> Vec<Value> {
    result
        .rows
        .iter()
        .map(|row| row.get(name).cloned().expect("column present"))
        .collect()
}

fn texts(result: &QueryResult, name: &str) -> Vec<String> {
    column(result, name)
        .into_iter()
        .map(|v| match v {
            Value::Text(s) => s,
            other => panic!("expected text, got {other:?}"),
        })
        .collect()
}

#[test]
fn create_insert_select_with_order() {
    let mut db = seeded_users();
    let result = db
        .execute("SELECT name FROM users WHERE id >= 2 ORDER BY name DESC;")
        .unwrap();
    assert_eq!(result.columns, vec!["name".to_string()]);
    assert_eq!(texts(&result, "name"), vec!["Carol", "Bob"]);
}

#[test]
fn select_star_yields_rows_in_insertion_order() {
    let mut db = seeded_users();
    let result = db.execute("SELECT * FROM users").unwrap();
    assert_eq!(
        result.columns,
        vec!["users.id".to_string(), "users.name".to_string()]
    );
    assert_eq!(texts(&result, "users.name"), vec!["Alice", "Bob", "Carol"]);
}

#[test]
fn duplicate_primary_key_leaves_table_unchanged() {
    let mut db = seeded_users();
    let err = db.execute("INSERT INTO users VALUES (1,'Dup');").unwrap_err();
    assert_eq!(
        err,
        RelicError::PrimaryKeyViolation {
            column: "id".to_string(),
            value: "1".to_string(),
        }
    );
    let result = db.execute("SELECT * FROM users").unwrap();
    assert_eq!(result.rows.len(), 3);
}

#[test]
fn null_into_not_null_column_is_rejected() {
    let mut db = seeded_users();
    let err = db.execute("INSERT INTO users (id) VALUES (4);").unwrap_err();
    assert_eq!(
        err,
        RelicError::NotNullViolation {
            column: "name".to_string()
        }
    );
}

#[test]
fn inner_join_with_aliases() {
    let mut db = with_orders(seeded_users());
    let result = db
        .execute(
            "SELECT u.name, o.total FROM users u INNER JOIN orders o \
             ON u.id = o.uid ORDER BY o.total;",
        )
        .unwrap();
    assert_eq!(
        result.columns,
        vec!["u.name".to_string(), "o.total".to_string()]
    );
    assert_eq!(texts(&result, "u.name"), vec!["Alice", "Bob", "Bob"]);
    assert_eq!(
        column(&result, "o.total"),
        vec![Value::Real(10.0), Value::Real(20.0), Value::Real(30.0)]
    );
}

#[test]
fn left_join_pads_unmatched_left_rows_with_null() {
    let mut db = with_orders(seeded_users());
    let result = db
        .execute(
            "SELECT u.name, o.total FROM users u LEFT JOIN orders o \
             ON u.id = o.uid ORDER BY u.id, o.total;",
        )
        .unwrap();
    assert_eq!(texts(&result, "u.name"), vec!["Alice", "Bob", "Bob", "Carol"]);
    assert_eq!(
        column(&result, "o.total"),
        vec![
            Value::Real(10.0),
            Value::Real(20.0),
            Value::Real(30.0),
            Value::Null,
        ]
    );
}

#[test]
fn right_join_appends_unmatched_right_rows() {
    let mut db = with_orders(seeded_users());
    db.execute("INSERT INTO orders VALUES (99, 40.0);").unwrap();
    let result = db
        .execute("SELECT u.name, o.total FROM users u RIGHT JOIN orders o ON u.id = o.uid;")
        .unwrap();
    // Matched pairs come first in left-major order, unmatched right rows
    // follow with a null left half.
    assert_eq!(
        column(&result, "u.name"),
        vec![
            Value::Text("Alice".into()),
            Value::Text("Bob".into()),
            Value::Text("Bob".into()),
            Value::Null,
        ]
    );
    assert_eq!(column(&result, "o.total")[3], Value::Real(40.0));
}

#[test]
fn cross_join_is_a_cartesian_product() {
    let mut db = with_orders(seeded_users());
    let result = db
        .execute("SELECT u.name, o.total FROM users u CROSS JOIN orders o;")
        .unwrap();
    assert_eq!(result.rows.len(), 9);
}

#[test]
fn update_maintains_indexes_and_frees_old_keys() {
    let mut db = seeded_users();
    let update = db
        .execute("UPDATE users SET id = 4 WHERE name = 'Carol';")
        .unwrap();
    assert_eq!(update.affected_rows, 1);

    let hit = db.execute("SELECT * FROM users WHERE id = 4;").unwrap();
    assert_eq!(texts(&hit, "users.name"), vec!["Carol"]);

    let miss = db.execute("SELECT * FROM users WHERE id = 3;").unwrap();
    assert!(miss.rows.is_empty());

    // The old key is freed for reuse.
    db.execute("INSERT INTO users VALUES (3,'Carol2');").unwrap();
    assert_eq!(db.execute("SELECT * FROM users").unwrap().rows.len(), 4);
}

#[test]
fn update_without_where_touches_every_row() {
    let mut db = seeded_users();
    let result = db.execute("UPDATE users SET name = 'x'").unwrap();
    assert_eq!(result.affected_rows, 3);
}

#[test]
fn delete_with_and_without_where() {
    let mut db = seeded_users();
    let one = db.execute("DELETE FROM users WHERE id = 2;").unwrap();
    assert_eq!(one.affected_rows, 1);
    let rest = db.execute("DELETE FROM users;").unwrap();
    assert_eq!(rest.affected_rows, 2);
    assert!(db.execute("SELECT * FROM users").unwrap().rows.is_empty());
}

#[test]
fn limit_and_offset_boundaries() {
    let mut db = seeded_users();
    assert!(db.execute("SELECT * FROM users LIMIT 0").unwrap().rows.is_empty());
    assert!(db.execute("SELECT * FROM users OFFSET 3").unwrap().rows.is_empty());
    assert!(db.execute("SELECT * FROM users OFFSET 99").unwrap().rows.is_empty());

    let page = db
        .execute("SELECT name FROM users ORDER BY id LIMIT 1 OFFSET 1")
        .unwrap();
    assert_eq!(texts(&page, "name"), vec!["Bob"]);

    let all = db.execute("SELECT * FROM users OFFSET 0").unwrap();
    assert_eq!(all.rows.len(), 3);
}

#[test]
fn where_eq_null_never_matches_but_is_null_does() {
    let mut db = Database::new();
    db.execute("CREATE TABLE t (id INTEGER PRIMARY KEY, note TEXT)")
        .unwrap();
    db.execute("INSERT INTO t (id, note) VALUES (1, 'a'), (2, NULL), (3, NULL)")
        .unwrap();

    assert!(db
        .execute("SELECT * FROM t WHERE note = NULL")
        .unwrap()
        .rows
        .is_empty());
    assert_eq!(
        db.execute("SELECT * FROM t WHERE note IS NULL").unwrap().rows.len(),
        2
    );
    assert_eq!(
        db.execute("SELECT * FROM t WHERE note IS NOT NULL")
            .unwrap()
            .rows
            .len(),
        1
    );
}

#[test]
fn order_by_places_nulls_last_asc_first_desc() {
    let mut db = Database::new();
    db.execute("CREATE TABLE t (id INTEGER PRIMARY KEY, score REAL)")
        .unwrap();
    db.execute("INSERT INTO t VALUES (1, 2.0), (2, NULL), (3, 1.0)")
        .unwrap();

    let asc = db.execute("SELECT id FROM t ORDER BY score").unwrap();
    assert_eq!(
        column(&asc, "id"),
        vec![Value::Integer(3), Value::Integer(1), Value::Integer(2)]
    );

    let desc = db.execute("SELECT id FROM t ORDER BY score DESC").unwrap();
    assert_eq!(
        column(&desc, "id"),
        vec![Value::Integer(2), Value::Integer(1), Value::Integer(3)]
    );
}

#[test]
fn order_by_is_stable_across_keys() {
    let mut db = Database::new();
    db.execute("CREATE TABLE t (id INTEGER PRIMARY KEY, grp INTEGER, rank INTEGER)")
        .unwrap();
    db.execute("INSERT INTO t VALUES (1, 1, 2), (2, 1, 1), (3, 2, 1), (4, 1, 1)")
        .unwrap();
    let result = db.execute("SELECT id FROM t ORDER BY grp, rank").unwrap();
    // Rows 2 and 4 tie on both keys and keep insertion order.
    assert_eq!(
        column(&result, "id"),
        vec![
            Value::Integer(2),
            Value::Integer(4),
            Value::Integer(1),
            Value::Integer(3),
        ]
    );
}

#[test]
fn like_is_case_insensitive_with_wildcards() {
    let mut db = Database::new();
    db.execute("CREATE TABLE t (id INTEGER PRIMARY KEY, s TEXT)")
        .unwrap();
    db.execute("INSERT INTO t VALUES (1, 'ABCxyz'), (2, 'abc'), (3, 'zbc'), (4, 'abc.def')")
        .unwrap();

    assert_eq!(db.execute("SELECT * FROM t WHERE s LIKE 'abc%'").unwrap().rows.len(), 3);
    assert_eq!(db.execute("SELECT * FROM t WHERE s LIKE '_bc'").unwrap().rows.len(), 2);
    assert_eq!(db.execute("SELECT * FROM t WHERE s LIKE '%xyz'").unwrap().rows.len(), 1);
    // A dot in the pattern is a literal dot, not a regex wildcard.
    assert_eq!(db.execute("SELECT * FROM t WHERE s LIKE 'abc.def'").unwrap().rows.len(), 1);
    assert_eq!(db.execute("SELECT * FROM t WHERE s LIKE 'abc_def'").unwrap().rows.len(), 1);
}

#[test]
fn constant_select_without_from() {
    let mut db = Database::new();
    let result = db.execute("SELECT 1, 'hi', TRUE").unwrap();
    assert_eq!(result.rows.len(), 1);
    assert_eq!(result.columns, vec!["1".to_string(), "'hi'".to_string(), "TRUE".to_string()]);
    assert_eq!(result.rows[0]["1"], Value::Integer(1));
    assert_eq!(result.rows[0]["'hi'"], Value::Text("hi".into()));
    assert_eq!(result.rows[0]["TRUE"], Value::Boolean(true));
}

#[test]
fn create_if_not_exists_is_idempotent() {
    let mut db = seeded_users();
    let result = db
        .execute("CREATE TABLE IF NOT EXISTS users (id INTEGER PRIMARY KEY, name TEXT)")
        .unwrap();
    assert_eq!(result.affected_rows, 0);
    assert!(result.message.contains("already exists"));
    // The original table and its rows are untouched.
    assert_eq!(db.execute("SELECT * FROM users").unwrap().rows.len(), 3);

    let err = db
        .execute("CREATE TABLE users (id INTEGER PRIMARY KEY)")
        .unwrap_err();
    assert_eq!(err, RelicError::TableExists("users".to_string()));
}

#[test]
fn drop_if_exists_twice_is_a_noop() {
    let mut db = seeded_users();
    db.execute("DROP TABLE IF EXISTS users").unwrap();
    let second = db.execute("DROP TABLE IF EXISTS users").unwrap();
    assert!(second.message.contains("does not exist"));

    let err = db.execute("DROP TABLE users").unwrap_err();
    assert_eq!(err, RelicError::TableNotFound("users".to_string()));
}

#[test]
fn insert_column_count_mismatch_is_semantic() {
    let mut db = seeded_users();
    let err = db
        .execute("INSERT INTO users (id, name) VALUES (7)")
        .unwrap_err();
    assert!(matches!(err, RelicError::Semantic(_)));
}

#[test]
fn unknown_column_and_ambiguous_column_errors() {
    let mut db = with_orders(seeded_users());
    assert!(matches!(
        db.execute("SELECT ghost FROM users").unwrap_err(),
        RelicError::ColumnNotFound { .. }
    ));

    db.execute("CREATE TABLE extras (id INTEGER, uid INTEGER)").unwrap();
    db.execute("INSERT INTO extras VALUES (1, 1)").unwrap();
    assert!(matches!(
        db.execute("SELECT uid FROM orders JOIN extras ON orders.uid = extras.uid")
            .unwrap_err(),
        RelicError::AmbiguousColumn(_)
    ));
}

#[test]
fn qualified_star_projects_one_table() {
    let mut db = with_orders(seeded_users());
    let result = db
        .execute("SELECT u.* FROM users u INNER JOIN orders o ON u.id = o.uid")
        .unwrap();
    assert_eq!(
        result.columns,
        vec!["u.id".to_string(), "u.name".to_string()]
    );
    assert_eq!(result.rows.len(), 3);
}

#[test]
fn identifiers_are_case_insensitive() {
    let mut db = Database::new();
    db.execute("CREATE TABLE People (Id INTEGER PRIMARY KEY, FullName TEXT)")
        .unwrap();
    db.execute("INSERT INTO people (ID, fullname) VALUES (1, 'Ada')")
        .unwrap();
    let result = db.execute("SELECT fullName FROM PEOPLE WHERE id = 1").unwrap();
    assert_eq!(texts(&result, "fullName"), vec!["Ada"]);
}

#[test]
fn unique_constraint_via_sql() {
    let mut db = Database::new();
    db.execute("CREATE TABLE t (id INTEGER PRIMARY KEY, email TEXT UNIQUE)")
        .unwrap();
    db.execute("INSERT INTO t VALUES (1, 'a@x')").unwrap();
    let err = db.execute("INSERT INTO t VALUES (2, 'a@x')").unwrap_err();
    assert_eq!(
        err,
        RelicError::UniqueViolation {
            column: "email".to_string(),
            value: "a@x".to_string(),
        }
    );
    // NULLs never collide.
    db.execute("INSERT INTO t (id) VALUES (2)").unwrap();
    db.execute("INSERT INTO t (id) VALUES (3)").unwrap();
}

#[test]
fn boolean_coercion_on_insert() {
    let mut db = Database::new();
    db.execute("CREATE TABLE flags (id INTEGER PRIMARY KEY, active BOOLEAN)")
        .unwrap();
    db.execute("INSERT INTO flags VALUES (1, TRUE), (2, 0), (3, 'yes'), (4, 'off')")
        .unwrap();
    let result = db
        .execute("SELECT id FROM flags WHERE active = TRUE ORDER BY id")
        .unwrap();
    assert_eq!(column(&result, "id"), vec![Value::Integer(1), Value::Integer(3)]);
}

#[test]
fn three_valued_logic_in_where() {
    let mut db = Database::new();
    db.execute("CREATE TABLE t (id INTEGER PRIMARY KEY, a BOOLEAN, b BOOLEAN)")
        .unwrap();
    db.execute("INSERT INTO t VALUES (1, TRUE, NULL), (2, FALSE, NULL), (3, NULL, NULL)")
        .unwrap();

    // a OR b: true over null survives, null otherwise.
    let or_rows = db.execute("SELECT id FROM t WHERE a OR b").unwrap();
    assert_eq!(column(&or_rows, "id"), vec![Value::Integer(1)]);

    // a AND b is never true here; NOT (a AND b) is true only where the
    // AND is definitively false.
    let not_and = db.execute("SELECT id FROM t WHERE NOT (a AND b)").unwrap();
    assert_eq!(column(&not_and, "id"), vec![Value::Integer(2)]);
}

#[test]
fn comments_and_whitespace_are_ignored() {
    let mut db = seeded_users();
    let result = db
        .execute("SELECT name -- pick the name\nFROM users /* all of them */ WHERE id = 1")
        .unwrap();
    assert_eq!(texts(&result, "name"), vec!["Alice"]);
}

#[test]
fn syntax_error_reports_position() {
    let mut db = Database::new();
    let err = db.execute("SELECT *\nFROM").unwrap_err();
    let RelicError::Syntax { line, .. } = err else {
        panic!("expected syntax error, got {err:?}");
    };
    assert_eq!(line, 2);
}

#[test]
fn query_result_serializes_to_json() {
    let mut db = seeded_users();
    let result = db
        .execute("SELECT name FROM users WHERE id = 1")
        .unwrap();
    let json = serde_json::to_string(&result).unwrap();
    assert!(json.contains("\"columns\":[\"name\"]"));
    assert!(json.contains("Alice"));

    let nullable = db.execute("SELECT * FROM users LIMIT 0").unwrap();
    let json = serde_json::to_string(&nullable).unwrap();
    assert!(json.contains("\"rows\":[]"));
}

#[test]
fn dml_results_carry_messages_and_counts() {
    let mut db = Database::new();
    let create = db.execute("CREATE TABLE t (id INT)").unwrap();
    assert!(create.columns.is_empty() && create.rows.is_empty());
    assert_eq!(create.message, "Table 't' created");

    let insert = db.execute("INSERT INTO t VALUES (1), (2)").unwrap();
    assert_eq!(insert.message, "Inserted 2 row(s)");
    assert_eq!(insert.affected_rows, 2);

    let update = db.execute("UPDATE t SET id = 9 WHERE id = 1").unwrap();
    assert_eq!(update.message, "Updated 1 row(s)");

    let delete = db.execute("DELETE FROM t WHERE id = 9").unwrap();
    assert_eq!(delete.message, "Deleted 1 row(s)");

    let drop = db.execute("DROP TABLE t").unwrap();
    assert_eq!(drop.message, "Table 't' dropped");
}
