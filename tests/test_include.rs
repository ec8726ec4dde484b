use tally::{parse_file, Error, IncludeError, Parser, ParserOptions};

fn payees(parser: &Parser, path: &str) -> Vec<String> {
    parser
        .parse_file(path)
        .unwrap()
        .into_iter()
        .map(|t| t.payee)
        .collect()
}

#[test]
fn include_sequential() {
    let parser = Parser::new(ParserOptions {
        concurrent_includes: false,
        ..ParserOptions::default()
    });
    assert_eq!(
        payees(&parser, "tests/example_files/include.journal"),
        vec![
            "First of a",
            "Second of a",
            "Third of a",
            "First of b",
            "Second of b",
            "Main file"
        ]
    );
}

#[test]
fn include_concurrent() {
    let parser = Parser::default();
    assert_eq!(
        payees(&parser, "tests/example_files/include.journal"),
        vec![
            "First of a",
            "Second of a",
            "Third of a",
            "First of b",
            "Second of b",
            "Main file"
        ]
    );
}

#[test]
fn include_concurrent_first_error_in_file_order() {
    for capacity in &[1, 100] {
        let parser = Parser::new(ParserOptions {
            channel_capacity: *capacity,
            concurrent_includes: true,
        });
        for _ in 0..20 {
            let err = parser
                .parse_file("tests/example_files/include_errors.journal")
                .unwrap_err();
            assert_eq!(
                err.to_string(),
                "tests/example_files/errors/a.journal:163: unable to parse transaction: unable to balance transaction: no empty account to place extra balance"
            );
        }
    }
}

#[test]
fn include_errors_streamed() {
    let stream = Parser::default()
        .stream_file("tests/example_files/include_errors.journal")
        .unwrap();
    let (transactions, errors) = stream.collect();
    assert_eq!(transactions.len(), 46);
    assert_eq!(transactions.last().unwrap().payee, "After");
    let mut lines: Vec<usize> = errors.iter().map(Error::line).collect();
    lines.sort_unstable();
    assert_eq!(lines, vec![3, 163]);
}

#[test]
fn include_many_times() {
    let parser = Parser::new(ParserOptions {
        channel_capacity: 1,
        concurrent_includes: true,
    });
    for _ in 0..20 {
        assert_eq!(
            payees(&parser, "tests/example_files/include.journal").len(),
            6
        );
    }
}

#[test]
fn include_not_found() {
    let err = parse_file("tests/example_files/include_missing.journal").unwrap_err();
    assert!(err.is_fatal());
    assert_eq!(
        err.to_string(),
        "tests/example_files/include_missing.journal:5: unable to include file(does_not_exist/*.journal): not found"
    );
}

#[test]
fn include_not_found_stops_stream() {
    let stream = Parser::default()
        .stream_file("tests/example_files/include_missing.journal")
        .unwrap();
    let (transactions, errors) = stream.collect();
    assert_eq!(transactions.len(), 1);
    assert_eq!(errors.len(), 1);
    match &errors[0] {
        Error::Include { cause, line, .. } => {
            assert_eq!(*cause, IncludeError::NotFound);
            assert_eq!(*line, 5);
        }
        other => panic!("unexpected error {}", other),
    }
}

#[test]
fn include_loop() {
    let err = parse_file("tests/example_files/loop/first.journal").unwrap_err();
    match err {
        Error::Include { cause, .. } => {
            assert!(matches!(cause, IncludeError::Loop(_)), "{}", cause)
        }
        other => panic!("unexpected error {}", other),
    }
}

#[test]
fn include_bad_pattern() {
    let err = parse_file("tests/example_files/include_bad_pattern.journal").unwrap_err();
    assert!(err.is_fatal());
    assert!(err
        .to_string()
        .starts_with("tests/example_files/include_bad_pattern.journal:1: unable to include file([unclosed): "));
}

#[test]
fn include_from_anonymous_source() {
    let transactions = tally::parse_str(
        "include tests/example_files/included/b.journal

2021/03/01 After
	Expenses  1
	Assets
",
    )
    .unwrap();
    let payees: Vec<&str> = transactions.iter().map(|t| t.payee.as_str()).collect();
    assert_eq!(payees, vec!["First of b", "Second of b", "After"]);
}

#[test]
fn missing_top_level_file() {
    let err = Parser::default()
        .stream_file("tests/example_files/nothing_here.journal")
        .unwrap_err();
    match err {
        Error::CannotReadFile { path, .. } => {
            assert_eq!(path.to_str(), Some("tests/example_files/nothing_here.journal"))
        }
        other => panic!("unexpected error {}", other),
    }
}
