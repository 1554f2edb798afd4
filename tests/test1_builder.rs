use sql_helper::prelude::*;

#[test]
fn literal_where_and_insert() -> Result<(), Box<dyn std::error::Error>> {
    let filter: ColumnConditions = ColumnMap::new().with("a", 1).with("b", "x's");
    assert_eq!(sql::where_clause([Condition::from(filter)])?, "where a = 1 and b = 'x''s'");

    let values = ColumnValues::new().with("a", 1).with("b", RowValues::Null);
    assert_eq!(sql::insert("t", &values)?, "insert into t (a, b) values (1, null)");
    Ok(())
}

#[test]
fn prepared_statements_keep_bind_order() -> Result<(), Box<dyn std::error::Error>> {
    let values = ColumnValues::new()
        .with("name", "n")
        .with("touched", Expression::expr("now()"));
    let filter: ColumnConditions = ColumnMap::new()
        .with("id", 3..=9)
        .with("kind", vec!["a", "b"]);
    let qp = sql_prepared::update("things", &values, [Condition::from(filter)])?;
    assert_eq!(
        qp.query,
        "update things set name = ?, touched = now() where id >= ? and id <= ? and kind in (?, ?)"
    );
    assert_eq!(
        qp.params,
        vec![
            RowValues::from("n"),
            RowValues::Int(3),
            RowValues::Int(9),
            RowValues::from("a"),
            RowValues::from("b"),
        ]
    );
    Ok(())
}

#[test]
fn select_count_delete_share_the_where_rules() -> Result<(), Box<dyn std::error::Error>> {
    let opts = SelectOptions::new()
        .project(["id"])
        .filter(Condition::template("created > ?", ["2024-01-01"]))
        .filter(Condition::columns([("deleted_at", RowValues::Null)]))
        .order(["id"]);
    assert_eq!(
        sql::select("events", &opts)?,
        "select id from events where (created > '2024-01-01') and deleted_at is null order by id"
    );
    assert_eq!(
        sql::count("events", [Condition::columns([("kind", Expression::ne("x"))])])?,
        "select count(*) from events where kind <> 'x'"
    );
    assert_eq!(
        sql::delete("events", [Condition::columns([("id", NOT_NULL)])])?,
        "delete from events where id is not null"
    );
    Ok(())
}

#[test]
fn injection_attempts_are_rejected() {
    let cases = [
        sql::where_clause([Condition::raw("a = 1; drop table t")]),
        sql::where_clause([Condition::raw("a = 1 -- trailing")]),
        sql::where_clause([Condition::raw("a = 'unterminated")]),
        sql::count("t /* c */", Vec::<Condition>::new()),
    ];
    for case in cases {
        let err = case.unwrap_err();
        assert!(err.is_safety_violation(), "{err}");
    }

    // quoted text may contain anything
    assert_eq!(
        sql::where_clause([Condition::columns([("a", "x; -- y")])]).unwrap(),
        "where a = 'x; -- y'"
    );
}

#[test]
fn order_is_the_same_in_both_front_ends() -> Result<(), Box<dyn std::error::Error>> {
    let fields = ["created desc", " ", "id"];
    assert_eq!(sql_prepared::order(fields)?, "order by created desc, id");
    assert_eq!(sql_prepared::order(fields)?, sql::order(fields)?);
    assert_eq!(sql_prepared::order(Vec::<String>::new())?, "");
    assert!(sql_prepared::order(["id; drop table t"]).unwrap_err().is_safety_violation());
    Ok(())
}

#[test]
fn like_takes_text_or_a_raw_expression() {
    let pattern = sql_prepared::where_clause([Condition::columns([(
        "name",
        Expression::like("a%"),
    )])])
    .unwrap();
    assert_eq!(pattern.query, "where name like ?");

    let numeric = Expression::Parameterized {
        op: Op::Like,
        value: Box::new(RowValues::Int(5)),
    };
    assert!(matches!(
        sql::where_clause([Condition::columns([("name", numeric)])]),
        Err(SqlHelperError::UnsupportedType(_))
    ));
}
