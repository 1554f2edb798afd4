#![cfg(feature = "sqlite")]

use rust_decimal::Decimal;
use sql_helper::prelude::*;
use tempfile::tempdir;

fn seeded(
    options: ConnectionOptions,
) -> Result<Connection<SqliteDriver>, Box<dyn std::error::Error>> {
    let conn = Connection::sqlite_in_memory(options)?;
    conn.update(
        "create table accounts (
             id integer primary key, owner text not null, balance numeric(10,2)
         )",
    )?;
    conn.update("create table entries (account_id integer, memo text)")?;
    for (id, owner, balance) in [(1, "ann", "12.50"), (2, "bob", "-3.25"), (3, "cy", "0")] {
        let values = ColumnValues::new()
            .with("id", id)
            .with("owner", owner)
            .with("balance", Decimal::from_str_exact(balance)?);
        conn.update_with(&sql_prepared::insert("accounts", &values)?)?;
        for n in 0..id {
            let entry = ColumnValues::new()
                .with("account_id", id)
                .with("memo", format!("{owner}-{n}"));
            conn.update_with(&sql_prepared::insert("entries", &entry)?)?;
        }
    }
    Ok(conn)
}

#[test]
fn nested_queries_on_one_connection() -> Result<(), Box<dyn std::error::Error>> {
    let conn = seeded(ConnectionOptions::default())?;

    let accounts = SelectOptions::new().project(["id", "owner"]).order(["id"]);
    let mut seen = Vec::new();
    for account in conn.query_with(&sql_prepared::select("accounts", &accounts)?)? {
        let account = account?;
        let entries = SelectOptions::new()
            .project(["memo"])
            .filter(Condition::columns([("account_id", account.get("id")?.clone())]))
            .order(["memo"]);
        let memos: Vec<String> = conn
            .query_with(&sql_prepared::select("entries", &entries)?)?
            .map(|row| Ok(row?.get("memo")?.as_text().unwrap_or_default().to_string()))
            .collect::<Result<_, SqlHelperError>>()?;
        seen.push((account.get("owner")?.clone(), memos.len()));
    }
    assert_eq!(
        seen,
        [
            (RowValues::from("ann"), 1),
            (RowValues::from("bob"), 2),
            (RowValues::from("cy"), 3),
        ]
    );
    assert_eq!(conn.occupied_statements(), 0);
    Ok(())
}

#[test]
fn nesting_limit_applies() -> Result<(), Box<dyn std::error::Error>> {
    let conn = seeded(ConnectionOptions::default().with_max_nesting_depth(2))?;
    let _outer = conn.query("select id from accounts")?;
    let _inner = conn.query("select id from accounts")?;
    assert!(matches!(
        conn.query("select id from accounts"),
        Err(SqlHelperError::NestingTooDeep { max_depth: 2 })
    ));
    Ok(())
}

#[test]
fn numeric_columns_decode_to_decimal() -> Result<(), Box<dyn std::error::Error>> {
    let conn = seeded(ConnectionOptions::default())?;
    let rows = conn.query_rows(&sql_prepared::select(
        "accounts",
        &SelectOptions::new().project(["balance"]).order(["id"]),
    )?)?;
    let balances: Vec<Option<Decimal>> = rows
        .iter()
        .map(|row| row.get("balance").map(RowValues::as_decimal))
        .collect::<Result<_, _>>()?;
    assert_eq!(
        balances,
        [
            Some(Decimal::new(1250, 2)),
            Some(Decimal::new(-325, 2)),
            Some(Decimal::ZERO),
        ]
    );
    Ok(())
}

#[test]
fn file_database_survives_reopen() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let path = dir.path().join("ledger.db");

    let conn = Connection::open_sqlite(&path, ConnectionOptions::default())?;
    conn.update("create table t (id integer, name text)")?;
    let changed = conn.update_with(&sql_prepared::insert(
        "t",
        &ColumnValues::new().with("id", 1).with("name", "x's"),
    )?)?;
    assert_eq!(changed, 1);
    conn.close()?;
    assert!(conn.is_closed());

    let conn = Connection::open_sqlite(&path, ConnectionOptions::default())?;
    let count = conn.query(&sql::count("t", [Condition::columns([("name", "x's")])])?)?;
    let rows = count.collect_rows()?;
    assert_eq!(rows[0].get_by_index(0)?.as_int(), Some(1));
    Ok(())
}

#[test]
fn bad_sql_leaves_the_connection_usable() -> Result<(), Box<dyn std::error::Error>> {
    let conn = seeded(ConnectionOptions::default().with_max_nesting_depth(1))?;
    assert!(matches!(
        conn.query("select nope from accounts"),
        Err(SqlHelperError::SqliteError(_))
    ));
    assert_eq!(conn.query("select id from accounts")?.count(), 3);
    Ok(())
}

#[test]
fn unrecognised_declared_types_decode_from_storage() -> Result<(), Box<dyn std::error::Error>> {
    let conn = Connection::sqlite_in_memory(ConnectionOptions::default())?;
    conn.update("create table t (id uuid, doc json, amount money)")?;
    let row = ColumnValues::new()
        .with("id", "0b7e5c1a-9d3f-4c55-a1d2-6f0e8f3c2b11")
        .with("doc", r#"{"a": 1}"#)
        .with("amount", 12.5);
    conn.update_with(&sql_prepared::insert("t", &row)?)?;

    let rows = conn.query("select id, doc, amount from t")?.collect_rows()?;
    assert_eq!(
        rows[0].get("id")?,
        &RowValues::from("0b7e5c1a-9d3f-4c55-a1d2-6f0e8f3c2b11")
    );
    assert_eq!(rows[0].get("doc")?.as_text(), Some(r#"{"a": 1}"#));
    assert_eq!(rows[0].get("amount")?.as_float(), Some(12.5));
    Ok(())
}

#[test]
fn execute_returns_rows_or_a_count() -> Result<(), Box<dyn std::error::Error>> {
    let conn = seeded(ConnectionOptions::default())?;
    let deleted = conn.execute("delete from entries where account_id = 3")?;
    assert_eq!(deleted.update_count(), Some(3));

    let Some(cursor) = conn.execute("select memo from entries order by memo")?.into_rows() else {
        panic!("a select produces rows");
    };
    assert_eq!(conn.occupied_statements(), 1);
    assert_eq!(cursor.collect_rows()?.len(), 3);
    assert_eq!(conn.occupied_statements(), 0);
    Ok(())
}

#[test]
fn batches_and_prepared_statements() -> Result<(), Box<dyn std::error::Error>> {
    let conn = seeded(ConnectionOptions::default().with_max_nesting_depth(3))?;

    let add = conn.prepare("insert into entries (account_id, memo) values (?, ?)")?;
    assert_eq!(add.parameter_count(), 2);
    add.update(&[RowValues::Int(1), RowValues::from("direct")])?;
    for n in 0..4 {
        add.add_batch(&[RowValues::Int(2), RowValues::Text(format!("queued-{n}"))])?;
    }
    conn.add_batch("update accounts set owner = upper(owner)")?;
    assert_eq!(conn.occupied_statements(), 2);
    assert_eq!(conn.execute_batch()?, 7);
    assert_eq!(conn.occupied_statements(), 1);

    let memos = conn.prepare("select memo from entries where account_id = ? order by memo")?;
    let queued = memos.query(&[RowValues::Int(2)])?.collect_rows()?;
    assert_eq!(queued.len(), 6);
    assert_eq!(queued[2].get("memo")?, &RowValues::from("queued-0"));

    let owners = conn.query_rows(&QueryAndParams::new_without_params(
        "select owner from accounts order by id",
    ))?;
    assert_eq!(owners[0].get("owner")?, &RowValues::from("ANN"));

    // prepared statements keep their handles; the third takes the last one
    let _third = conn.prepare("select 2")?;
    assert!(matches!(
        conn.query("select 3"),
        Err(SqlHelperError::NestingTooDeep { max_depth: 3 })
    ));
    add.close()?;
    assert_eq!(conn.query("select 3")?.count(), 1);
    Ok(())
}
